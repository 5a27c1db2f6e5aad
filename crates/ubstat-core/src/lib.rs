//! Core of the resolver statistics collector.
//!
//! The host builds a [`module::ModuleRegistry`], registers the built-in
//! modules and creates one [`module::Module`] per job. Each poll cycle yields
//! an [`rates::EmittedMetrics`] mapping of integer values keyed by the raw
//! statistic names.

pub mod charts;
pub mod collector;
pub mod config;
pub mod module;
pub mod rates;
pub mod snapshot;
