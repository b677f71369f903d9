//! Interfaces to the ethereum mixer contracts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use self::{config::*, error::*, mixer::*};

/// Generated contract bindings.
mod interfaces;

mod config;
mod error;
mod mixer;
