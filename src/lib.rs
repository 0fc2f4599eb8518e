//! LRC fetch library - shared modules for the fetcher and cache tool binaries.

pub mod aggregator;
pub mod cache;
pub mod client;
pub mod config;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod reporter;
pub mod resolver;
pub mod scan;
