//! Archivo Core - Configuration, error types, and shared utilities
//!
//! This crate provides the foundational types used across all Archivo
//! crates: the [`Page`] value, the error taxonomy, the cancellation
//! [`Context`] every store call takes, and configuration loading.

pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use config::{Config, LoggingConfig, StorageConfig};
pub use context::{Context, DoneReason};
pub use error::{Error, Result};
pub use types::{Page, PageId, StoreStats};
