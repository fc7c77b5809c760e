//! Cross-cutting concerns not owned by any one hexagon layer: configuration.

pub mod config;

pub use config::AppConfig;
