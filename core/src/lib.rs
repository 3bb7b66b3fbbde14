//! # Relay Core
//!
//! Shared building blocks for the Relay renderer: generation-checked handle
//! pools and pooled containers.

pub mod pool;

pub use pool::{Handle, HandlePool, Poolable, Pooled, SyncHandlePool};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
