//! AWS Manager library
//!
//! Resolves S3 connection settings from explicit options and the environment,
//! and forwards uploads and downloads to the S3 transfer manager with request
//! fields mapped one to one.

pub mod error;
pub mod s3;
pub mod settings;

pub use error::{Error, Result};
pub use s3::{AwsManager, DownloadInput, Options, Transfer, UploadInput, UploadOutput};
