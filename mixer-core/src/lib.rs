//! This crate contains the domain types and collaborator traits shared by the
//! mixer relayer agent and the chain-specific implementations.
//!
//! Nothing here talks to the network or to storage directly: the relayer is
//! written against the [`MixerChain`] and [`PriceFeed`] traits, and concrete
//! implementations live in their own crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use ethers_core::types::{Address, Bytes, H256, U256};

pub use error::*;
pub use traits::*;
pub use types::*;

mod error;
mod traits;
mod types;

/// Parsing helpers for numeric values received over the wire
pub mod utils;
