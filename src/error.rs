//! Error type shared by the virtual file and its transports.

use std::io;
use thiserror::Error;

/// Errors surfaced by [`VirtualFile`](crate::VirtualFile).
///
/// Nothing here is retried or swallowed internally: every variant is
/// returned from the call that triggered it.
#[derive(Error, Debug)]
pub enum RangeFileError {
    /// The remote resource does not advertise `Accept-Ranges: bytes`.
    #[error("remote resource does not support byte range requests")]
    UnsupportedResource,

    /// A probe or range fetch did not satisfy the transport contract.
    #[error("transport error: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// A range fetch returned a byte count different from what the known
    /// resource size allows.
    #[error("inconsistent range response at offset {offset}: expected {expected} bytes, got {actual}")]
    Consistency {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// Operation attempted after [`VirtualFile::close`](crate::VirtualFile::close).
    #[error("I/O operation on closed virtual file")]
    Closed,

    /// Operation the virtual file never supports (writing, truncation, ...).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to build the runtime that drives the transport.
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, RangeFileError>;

impl From<RangeFileError> for io::Error {
    fn from(err: RangeFileError) -> Self {
        let kind = match &err {
            RangeFileError::UnsupportedResource | RangeFileError::UnsupportedOperation(_) => {
                io::ErrorKind::Unsupported
            }
            RangeFileError::Consistency { .. } => io::ErrorKind::InvalidData,
            RangeFileError::InvalidConfig(_) => io::ErrorKind::InvalidInput,
            RangeFileError::Closed | RangeFileError::Transport(_) | RangeFileError::Runtime(_) => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, err)
    }
}
