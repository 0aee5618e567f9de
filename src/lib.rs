//! Reelcast - Scheduled slideshow publishing pipeline
//!
//! This library crate exposes the core functionality for integration testing.

pub mod acquire;
pub mod assemble;
pub mod browser;
pub mod config;
pub mod ledger;
pub mod paths;
pub mod pipeline;
pub mod publish;
pub mod schedule;
pub mod store;
