//! Retrieval pipeline: document loading, chunking and similarity search.

pub mod chunker;
pub mod index;
pub mod loader;

pub use chunker::Chunk;
pub use index::VectorIndex;
pub use loader::Document;
