use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ItemRecord {
    pub subject: String,
    pub message_class: String,
    pub codec: u8,
    /// Absolute file offset of the (possibly compressed) body
    pub body_off: u64,
    pub c_len: u64,
    pub u_len: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FolderRecord {
    pub name: String,
    pub items: Vec<ItemRecord>,
    pub folders: Vec<FolderRecord>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Meta {
    pub created: i64,
    pub tool: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Manifest {
    pub root: FolderRecord,
    pub meta: Meta,
}

impl Manifest {
    /// Resolve a folder by its child-index path from the root.
    pub fn folder_at(&self, path: &[usize]) -> Option<&FolderRecord> {
        let mut cur = &self.root;
        for &i in path {
            cur = cur.folders.get(i)?;
        }
        Some(cur)
    }
}
