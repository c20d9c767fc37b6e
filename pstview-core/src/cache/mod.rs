pub mod chunk;

pub use chunk::{Block, ChunkCache};
