pub mod arena;

pub use arena::{Arena, WORD_SIZE};
