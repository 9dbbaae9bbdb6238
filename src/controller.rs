//! Top-level orchestration.
//!
//! Re-exports:
//! - [`Controller`]: owns the connectivity monitor and runs fetch-and-archive operations.
//! - [`FetchOutcome`]: summary of one fetch.

pub mod controller_handler;

pub use controller_handler::{Controller, FetchOutcome};
