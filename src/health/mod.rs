//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → registry lookup per configured service
//!     → replica transform per template
//!     → GET /status, no retry
//!     → probe outcome counter
//! ```

pub mod monitor;

pub use monitor::HealthMonitor;
