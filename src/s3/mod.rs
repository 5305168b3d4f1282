//! S3 client wrapper module
//!
//! This module provides:
//! - [`credentials::Options`] - Connection options and environment fallback
//! - [`client::AwsManager`] - Upload/download facade over the S3 transfer manager
//! - [`types`] - Transfer inputs and their SDK request mapping

pub mod client;
pub mod credentials;
pub mod types;

// Re-export commonly used types
pub use client::{AwsManager, S3Transfer, Transfer, TransferBackend};
pub use credentials::{Options, ResolvedOptions};
pub use types::{DownloadInput, ObjectUrl, UploadInput, UploadOutput, UploadSource};
