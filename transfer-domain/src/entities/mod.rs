//! Entities: mutable aggregates with identity, owned by the worker pools in
//! the `transfer` crate.

mod download_file;
mod upload_file;

pub use download_file::{DownloadFile, WriteOutcome};
pub use upload_file::{UploadFile, UploadStatus};
