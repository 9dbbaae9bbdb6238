//! Device to host transfer of report files.

pub mod pipeline;
pub mod rename;
pub mod types;

pub use pipeline::TransferPipeline;
pub use rename::archived_file_name;
pub use types::{FileOutcome, TransferBatch, TransferReport};
