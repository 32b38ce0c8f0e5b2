//! Registry implementations.

pub mod inmemory;

pub use inmemory::InMemorySessionRegistry;
