//! Quorum - resilient multi-backend extraction orchestrator
//!
//! This library routes structured-fact extraction requests across a set of
//! language-model backends, surviving individual backend failures through
//! per-backend circuit breakers, classified retries, and a durable
//! dead-letter queue for work that exhausts every backend.

pub mod backend;
pub mod breaker;
pub mod cli;
pub mod config;
pub mod dlq;
pub mod logging;
pub mod orchestrator;
pub mod retry;
pub mod store;
pub mod tracking;
