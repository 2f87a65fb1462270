//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a backend:
//!     → executor.rs (resolve instance, enforce per-call timeout)
//!     → On failure: retry with backoff.rs, bounded per instance
//!     → circuit_breaker.rs (track failures, open circuit at the limit,
//!       eager reset once the window elapses)
//!     → On exhaustion across instances: Unavailable
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline
//! - Circuit state is per concrete address and only updated by real traffic
//! - Two states only: no half-open probe, the window reset is a full reset

pub mod backoff;
pub mod circuit_breaker;
pub mod executor;

pub use circuit_breaker::CircuitBreaker;
pub use executor::{RequestSpec, ResilienceExecutor, UpstreamResponse};
