//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! POST /register → service.rs (validate, migrate legacy format)
//!     → store.rs (append to keyed list)
//!
//! resolve/lookup → service.rs → store.rs (full list range)
//! ```
//!
//! # Design Decisions
//! - The store is append/read-only from the gateway's perspective;
//!   deregistration is unsupported (lists only grow)
//! - Store access behind a trait so tests run against an in-memory map

pub mod service;
pub mod store;

pub use service::ServiceRegistry;
pub use store::{MemoryStore, RedisStore, RegistryStore};
