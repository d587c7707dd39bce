//! Relay pipeline: per-URL processing, the worker pool and whole runs.

pub mod orchestrator;
pub mod processor;
pub mod worker_pool;
