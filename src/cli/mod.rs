//! Support modules for the `view-map` binary.

pub mod config;
pub mod indexer;
pub mod logging;
