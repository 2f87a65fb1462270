//! Observability subsystem.
//!
//! Structured logging goes through `tracing` (initialized in `main`);
//! metrics are defined and recorded here and rendered on `GET /metrics`.

pub mod metrics;
