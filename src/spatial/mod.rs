//! Chunked spatial index of static tiles.

mod index;

pub use index::*;
