pub mod chat_store;
pub mod pg_store;
pub mod relay;
