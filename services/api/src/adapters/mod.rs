pub mod content_llm;
pub mod mem_store;
pub mod pg_store;

pub use content_llm::OpenAiContentAdapter;
pub use mem_store::MemStore;
pub use pg_store::PgStore;
