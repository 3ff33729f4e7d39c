//! # rangefile
//!
//! A remote HTTP resource exposed as a seekable byte stream.
//!
//! Only the bytes actually consumed are downloaded, using HTTP Range
//! requests. Latency is amortized by a single read-ahead block, which makes
//! it practical to hand a multi-gigabyte remote object to a decompressor or
//! a line reader as if it were a local file.
//!
//! ## Features
//!
//! - Blocking `read`/`peek`/`seek`/`tell` API on [`VirtualFile`]
//! - [`std::io::Read`], [`std::io::BufRead`] and [`std::io::Seek`] implementations
//! - Pluggable [`Transport`]: HTTP via [`HttpTransport`], local files via [`FileTransport`]
//! - Large reads bypass the cache; small reads share one read-ahead block
//!
//! ## Example
//!
//! ```no_run
//! use std::io::BufRead;
//! use rangefile::{HttpTransport, VirtualFile};
//!
//! fn main() -> anyhow::Result<()> {
//!     let transport = HttpTransport::new("https://example.com/access.log")?;
//!     let mut file = VirtualFile::open(transport)?;
//!
//!     println!("{} bytes of {}", file.total_size(), file.content_type());
//!     let lines = (&mut file).lines().count();
//!     println!("{} lines", lines);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod file;
pub mod io;

pub use cli::Cli;
pub use error::{RangeFileError, Result};
pub use file::{FetchStats, VirtualFile, VirtualFileOptions, Whence};
pub use io::{FileTransport, HttpTransport, HttpTransportOptions, ResourceMetadata, Transport};
