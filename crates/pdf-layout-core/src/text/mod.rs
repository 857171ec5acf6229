//! Text cleanup, prose classification and chunking.

mod chunk;
mod normalize;

pub use chunk::{chunk_text, join_chunks};
pub use normalize::{normalize, should_translate};
