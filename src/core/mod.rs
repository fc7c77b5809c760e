//! Core extraction engine (spec.md §2). No transport awareness — the Tool
//! Façade (`adapters::mcp`) is the only caller of these types.

pub mod cursor;
pub mod facade;
pub mod fetcher;
pub mod filter;
pub mod resolver;
pub mod wait;

pub use facade::{FetchHistoryParams, ToolFacade};
pub use fetcher::{FetcherConfig, HistoryFetcher};
pub use resolver::ChatResolver;
pub use wait::WaitConfig;
