//! Infrastructure adapters for domain ports.

pub mod backend;

pub use backend::BackendEntityFetcher;
