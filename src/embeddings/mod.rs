pub mod provider;
pub mod storage;
pub mod table;

pub use provider::{EmbeddingProvider, ForwardMode, PrecomputedEmbeddings};
pub use storage::{embedding_blob, load_embedding_file, parse_embedding_blob};
pub use table::{EmbeddingBlock, EmbeddingTable};
