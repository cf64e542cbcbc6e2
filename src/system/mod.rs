//! System utilities and monitoring
//!
//! Prometheus metrics recorded by the populator.

pub mod metrics;

pub use metrics::{render, PopulateMetrics};
