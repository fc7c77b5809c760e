//! Resource Manager. Materializes large windows as NDJSON artifacts with a
//! TTL-bound lifecycle.

pub mod manager;

pub use manager::ResourceManager;
