//! Concrete [`crate::Cache`] implementations.

mod cacache;

pub use cacache::CaCacheManager;
