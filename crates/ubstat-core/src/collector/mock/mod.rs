//! Mock implementations for testing collectors without a live resolver.
//!
//! - [`MockFs`]: in-memory filesystem holding native configuration files
//! - [`MockClient`]: scripted remote-control client
//! - `scenarios`: canned `stats_noreset` responses

mod client;
mod filesystem;
mod scenarios;

pub use client::{MockClient, SentCommands};
pub use filesystem::MockFs;
pub use scenarios::{basic_stats_response, extended_stats_response};
