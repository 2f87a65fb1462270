//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, route dispatch)
//!     → request.rs (request ID injection)
//!     → admission gate (429 over the limit)
//!     → dispatch.rs (action → backend endpoint, auth table)
//!     → resilience executor / transaction coordinator
//! ```

pub mod dispatch;
pub mod request;
pub mod server;
pub mod ws;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
