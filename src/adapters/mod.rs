//! Concrete adapter implementations for ports.

pub mod cached_adapter;
pub mod csv_ledger;
pub mod file_config_adapter;
pub mod memory_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
