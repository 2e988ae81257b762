pub mod memory;
pub mod schema;
pub mod store;

pub use memory::{cosine_similarity, MemoryVectorIndex};
pub use store::LanceVectorIndex;
