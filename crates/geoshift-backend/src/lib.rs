//! Geodatabase backend contract and the in-memory snapshot backend.

pub mod adapter;
pub mod error;
pub mod memory;

pub use adapter::{Backend, UpdateCursor};
pub use error::{BackendError, BackendResult, SnapshotError};
pub use memory::MemoryBackend;
