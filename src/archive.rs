//! Remote-side archival of processed reports.
//!
//! After a transfer pass, each report left in the reports directory is moved into the archive
//! directory with a copy, verify, delete sequence, and the archive is then trimmed to its
//! configured size, oldest entries first.

pub mod engine;
pub mod types;

pub use engine::ArchiveEngine;
pub use types::{ArchiveReport, EntryOutcome};
