use super::writer::{FolderSpec, ItemSpec};
use crate::domain::CONTACT_CLASS;

fn note(subject: &str, from: &str, text: &str) -> ItemSpec {
    let body = format!(
        "From: {from}\r\nTo: me@example.com\r\nSubject: {subject}\r\n\
         MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{text}\r\n"
    );
    ItemSpec::new(subject, "IPM.Note", body)
}

fn contact(full_name: &str, email: &str) -> ItemSpec {
    let body = format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:{full_name}\r\nEMAIL;TYPE=INTERNET:{email}\r\nEND:VCARD\r\n"
    );
    ItemSpec::new(full_name, CONTACT_CLASS, body)
}

/// Small mailbox used by `pstviewdev sample` and the tests.
pub fn sample_mailbox() -> FolderSpec {
    FolderSpec::new("Personal Folders")
        .folder(
            FolderSpec::new("Inbox")
                .item(note(
                    "Lunch plans",
                    "ana@example.com",
                    "Noodles at noon? The usual place.",
                ))
                .item(note(
                    "Quarterly report",
                    "reports@example.com",
                    &"Revenue is up. Costs are flat.\r\n".repeat(40),
                ))
                .folder(FolderSpec::new("Receipts").item(note(
                    "Your order has shipped",
                    "shop@example.com",
                    "Tracking number 1Z999.",
                ))),
        )
        .folder(FolderSpec::new("Sent Items").item(note(
            "Re: Lunch plans",
            "me@example.com",
            "Sounds good.",
        )))
        .folder(
            FolderSpec::new("Contacts")
                .item(contact("Ana Lima", "ana@example.com"))
                .item(contact("Wei Chen", "wei@example.com")),
        )
        .folder(FolderSpec::new("Deleted Items"))
}
