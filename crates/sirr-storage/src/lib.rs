//! Storage abstraction for Sirr backends
//!
//! Backends never talk to the secret store directly; the host hands each
//! request a [`Storage`] view scoped to the mount.

pub mod engine;

pub use engine::{MemoryStorage, Storage, StorageEntry};
