pub mod random;

pub use random::{RandomAccessReader, group_thousands};
