//! Error types shared by the configuration resolver and the storage facade

use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`AwsManager`](crate::s3::AwsManager) and option resolution
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting was neither given explicitly nor found in the environment
    #[error("required key {var} missing value")]
    MissingSetting { var: &'static str },

    /// An environment variable was present but could not be parsed
    #[error("invalid value {value:?} for {var}")]
    InvalidSetting { var: &'static str, value: String },

    /// Opening an upload source or creating a download destination failed
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the downloaded body to its destination failed
    #[error("failed writing object body: {0}")]
    Write(#[source] std::io::Error),

    /// An upload named neither a body nor a source path
    #[error("upload has no body and no source path")]
    MissingBody,

    /// The transfer manager rejected or failed the request
    #[error("{operation} failed: {source}")]
    Transfer {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transfer<E>(operation: &'static str) -> impl FnOnce(E) -> Self
    where
        E: Into<BoxError>,
    {
        move |source| Error::Transfer {
            operation,
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
