//! Seekable virtual file over a [`Transport`](crate::io::Transport).
//!
//! ## Read strategy
//!
//! A [`VirtualFile`] keeps one contiguous read-ahead block in memory:
//!
//! - Reads up to the bypass threshold (half the block by default) are
//!   served from the block. When the requested range is not fully inside
//!   it, the block is thrown away and refilled with `cache_capacity` bytes
//!   starting at the cursor.
//! - Larger reads would evict most of the block anyway, so they are fetched
//!   directly and the block is left as it was.
//!
//! Every fetch is clamped to the end of the resource and the returned
//! length is checked against the size learned from the probe.
//!
//! ## Cursor
//!
//! Seeks never fail on out-of-range targets: the cursor is clamped into
//! `[0, total_size]`. Reading at the end yields an empty result.

mod block;
mod options;
mod stream;
mod virtual_file;

pub use options::{DEFAULT_CACHE_CAPACITY, VirtualFileOptions};
pub use virtual_file::{FetchStats, VirtualFile, Whence};
