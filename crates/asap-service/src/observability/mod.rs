//! Observability for the ASAP Service.
//!
//! - `metrics` - Prometheus recorder setup and HTTP metric helpers

pub mod metrics;

pub use metrics::init_metrics_recorder;
