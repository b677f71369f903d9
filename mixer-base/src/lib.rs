//! This crate contains the shared agent plumbing: rocksdb storage, settings
//! loading, tracing setup and the prometheus registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Rocksdb-backed storage
pub mod db;

/// Settings loading and tracing configuration
pub mod settings;

mod metrics;
pub use metrics::*;
