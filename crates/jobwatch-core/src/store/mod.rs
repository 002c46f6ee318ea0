//! [`JobStore`](crate::traits::JobStore) implementations that live in core.

pub mod memory;

pub use memory::MemoryJobStore;
