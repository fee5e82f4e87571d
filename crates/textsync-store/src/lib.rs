//! Storage layer: embedded DuckDB store and an in-memory store for tests
//! and ephemeral runs. Both implement the core's `TextStore` collaborator
//! interface; timestamps are set here, never by the reconciler.

mod error;
pub use error::StoreError;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DuckStore, ListFilter};
