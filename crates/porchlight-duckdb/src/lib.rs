pub mod backend;
pub mod schema;
pub mod store_impl;

pub use backend::DuckDbStore;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `porchlight_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
