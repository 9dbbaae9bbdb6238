pub mod archive;
pub mod bridge;
pub mod configuration;
pub mod connectivity;
pub mod controller;
pub mod error_handling;
pub mod events;
pub mod transfer;

pub use controller::{Controller, FetchOutcome};
