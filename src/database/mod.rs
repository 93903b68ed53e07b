pub mod memory;
pub mod pg_catalog;
pub mod pg_store;
pub mod pool;
