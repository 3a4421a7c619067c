// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod dry_run_valve;
pub mod memory_store;
pub mod npy;
pub mod npy_store;
pub mod serial_valve;
