//! Relayer agent for a privacy mixer: accepts withdrawal proofs over HTTP,
//! checks that the stated fee pays for the transaction, and broadcasts the
//! withdrawal from the relayer's own account.

#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod fee;
pub mod metrics;
pub mod nonce;
pub mod prices;
pub mod queue;
pub mod server;
pub mod settings;
pub mod submitter;
pub mod validator;

mod relayer;

pub use relayer::*;
