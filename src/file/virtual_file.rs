use log::{debug, trace};
use tokio::runtime::Runtime;

use super::block::CacheBlock;
use super::options::VirtualFileOptions;
use crate::error::{RangeFileError, Result};
use crate::io::{ResourceMetadata, Transport};

/// Anchor for [`VirtualFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Offset from the beginning of the resource
    Start,
    /// Offset from the current cursor
    Current,
    /// Offset from the total size
    End,
}

/// Counters describing the traffic a [`VirtualFile`] generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Range requests issued to the transport
    pub range_requests: u64,
    /// Bytes received from the transport
    pub bytes_fetched: u64,
    /// Times the cache block was replaced
    pub cache_refills: u64,
    /// Reads served by a direct fetch, skipping the cache
    pub bypass_reads: u64,
    /// Reads served from the cache block
    pub cached_reads: u64,
}

/// A remote resource presented as a seekable, readable byte stream.
///
/// Reads up to the bypass threshold go through a single read-ahead block
/// of `cache_capacity` bytes; any miss replaces the whole block with a new
/// one anchored at the cursor. Larger reads are fetched directly and leave
/// the block untouched.
///
/// All calls block until the transport completes. The instance drives its
/// transport on a private current-thread runtime, so it must not be used
/// or dropped from within an async context.
pub struct VirtualFile<T: Transport> {
    transport: T,
    runtime: Runtime,
    metadata: ResourceMetadata,
    position: u64,
    /// `None` once closed
    block: Option<CacheBlock>,
    cache_capacity: u64,
    bypass_threshold: u64,
    stats: FetchStats,
}

impl<T: Transport> VirtualFile<T> {
    /// Probe the resource with default options.
    pub fn open(transport: T) -> Result<Self> {
        Self::open_with(transport, VirtualFileOptions::default())
    }

    /// Probe the resource and set up an empty cache.
    ///
    /// # Errors
    ///
    /// - [`RangeFileError::InvalidConfig`] for a zero capacity or a bypass
    ///   threshold larger than the capacity
    /// - [`RangeFileError::Transport`] if the probe fails
    /// - [`RangeFileError::UnsupportedResource`] if the resource does not
    ///   accept byte ranges
    pub fn open_with(transport: T, options: VirtualFileOptions) -> Result<Self> {
        options.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RangeFileError::Runtime)?;

        let metadata = runtime
            .block_on(transport.probe())
            .map_err(RangeFileError::Transport)?;

        if !metadata.supports_ranges {
            return Err(RangeFileError::UnsupportedResource);
        }

        debug!(
            "Opened resource: {} bytes, {}, cache {} bytes",
            metadata.total_size, metadata.content_type, options.cache_capacity
        );

        Ok(Self {
            transport,
            runtime,
            metadata,
            position: 0,
            block: Some(CacheBlock::default()),
            cache_capacity: options.cache_capacity,
            bypass_threshold: options.bypass_threshold(),
            stats: FetchStats::default(),
        })
    }

    pub fn total_size(&self) -> u64 {
        self.metadata.total_size
    }

    pub fn content_type(&self) -> &str {
        &self.metadata.content_type
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    pub fn bypass_threshold(&self) -> u64 {
        self.bypass_threshold
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.block.is_none()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(RangeFileError::Closed);
        }
        Ok(())
    }

    /// Move the cursor to `anchor + offset`, clamped into `[0, total_size]`.
    ///
    /// Out-of-range targets are never an error. Returns the new position.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.ensure_open()?;

        let anchor = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.total_size(),
        };
        let target = anchor as i128 + offset as i128;
        self.position = target.clamp(0, self.total_size() as i128) as u64;
        Ok(self.position)
    }

    /// Current cursor position.
    pub fn tell(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    /// Fetch `[offset, offset + length)`, clamped to the end of the resource,
    /// and check the transport returned exactly that many bytes.
    fn fetch(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let expected = length.min(self.total_size().saturating_sub(offset));

        let data = self
            .runtime
            .block_on(self.transport.fetch_range(offset, expected))
            .map_err(RangeFileError::Transport)?;

        self.stats.range_requests += 1;
        self.stats.bytes_fetched += data.len() as u64;

        if data.len() as u64 != expected {
            return Err(RangeFileError::Consistency {
                offset,
                expected,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }

    /// Make the block cover `[position, position + count)`, refilling it
    /// from `position` on a miss.
    fn ensure_cached(&mut self, position: u64, count: u64) -> Result<()> {
        let block = self.block.as_ref().ok_or(RangeFileError::Closed)?;
        if block.covers(position, count) {
            trace!(
                "Block hit: {}+{} in [{}, {})",
                position,
                count,
                block.start(),
                block.end()
            );
            return Ok(());
        }

        debug!(
            "Refilling block at {} ({} bytes, previous block [{}, {}) of {} bytes)",
            position,
            self.cache_capacity,
            block.start(),
            block.end(),
            block.len()
        );
        let data = self.fetch(position, self.cache_capacity)?;

        let block = self.block.as_mut().ok_or(RangeFileError::Closed)?;
        block.replace(position, data);
        self.stats.cache_refills += 1;
        Ok(())
    }

    /// Cached bytes from the cursor on, without advancing it.
    ///
    /// `count` is clamped to at least 1, at most one block and at most the
    /// remaining bytes. The returned slice runs to the end of the block and
    /// may be longer than `count`; it is empty at end of stream.
    pub fn peek(&mut self, count: u64) -> Result<&[u8]> {
        self.ensure_open()?;

        let available = self.total_size().saturating_sub(self.position);
        if available == 0 {
            return Ok(&[]);
        }

        let count = count.max(1).min(self.cache_capacity).min(available);
        self.ensure_cached(self.position, count)?;

        let block = self.block.as_ref().ok_or(RangeFileError::Closed)?;
        Ok(block.tail_from(self.position))
    }

    /// Read up to `count` bytes and advance the cursor past them.
    ///
    /// Returns fewer bytes only near the end of the resource and an empty
    /// vector once the cursor reaches it.
    pub fn read_bytes(&mut self, count: u64) -> Result<Vec<u8>> {
        self.ensure_open()?;

        let available = self.total_size().saturating_sub(self.position);
        let count = count.min(available);
        if count == 0 {
            return Ok(Vec::new());
        }

        let data = if count > self.bypass_threshold {
            debug!("Bypassing cache for {} bytes at {}", count, self.position);
            self.stats.bypass_reads += 1;
            self.fetch(self.position, count)?
        } else {
            let data = self.peek(count)?[..count as usize].to_vec();
            self.stats.cached_reads += 1;
            data
        };

        self.position += data.len() as u64;
        Ok(data)
    }

    /// Read everything from the cursor to the end of the resource.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let available = self.total_size().saturating_sub(self.position);
        self.read_bytes(available)
    }

    /// Drop the cache block. Every later operation fails with
    /// [`RangeFileError::Closed`]. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.block.take().is_some() {
            debug!("Closed virtual file at position {}", self.position);
        }
    }

    pub fn readable(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(true)
    }

    pub fn seekable(&self) -> bool {
        true
    }

    pub fn writable(&self) -> bool {
        false
    }

    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(RangeFileError::UnsupportedOperation("write"))
    }

    pub fn truncate(&mut self, _size: u64) -> Result<u64> {
        Err(RangeFileError::UnsupportedOperation("truncate"))
    }

    /// There is no descriptor behind a remote resource.
    pub fn raw_fd(&self) -> Result<i32> {
        Err(RangeFileError::UnsupportedOperation(
            "not backed by a file descriptor",
        ))
    }

    /// Current cache window as `(start, len)`
    #[cfg(test)]
    pub(crate) fn block_window(&self) -> Option<(u64, usize)> {
        self.block.as_ref().map(|b| (b.start(), b.len()))
    }

    /// Cursor update used by `BufRead::consume`.
    pub(crate) fn advance(&mut self, amt: u64) {
        self.position = self.position.saturating_add(amt).min(self.total_size());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// In-memory resource recording every range request.
    struct RecordingTransport {
        data: Vec<u8>,
        accept_ranges: bool,
        /// Bytes dropped from the end of every range response
        short_by: usize,
        calls: Calls,
    }

    impl RecordingTransport {
        fn new(size: usize) -> (Self, Calls) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let transport = Self {
                data: (0..size).map(|i| (i % 251) as u8).collect(),
                accept_ranges: true,
                short_by: 0,
                calls: calls.clone(),
            };
            (transport, calls)
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn probe(&self) -> anyhow::Result<ResourceMetadata> {
            Ok(ResourceMetadata::new(
                self.data.len() as u64,
                "text/plain",
                self.accept_ranges,
            ))
        }

        async fn fetch_range(&self, offset: u64, length: u64) -> anyhow::Result<Vec<u8>> {
            self.calls.lock().unwrap().push((offset, length));
            let start = (offset as usize).min(self.data.len());
            let end = (start + length as usize).min(self.data.len());
            let end = end.saturating_sub(self.short_by).max(start);
            Ok(self.data[start..end].to_vec())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn probe(&self) -> anyhow::Result<ResourceMetadata> {
            Ok(ResourceMetadata::new(100, "text/plain", true))
        }

        async fn fetch_range(&self, _offset: u64, _length: u64) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("Range request failed with status: 500 Internal Server Error")
        }
    }

    type Calls = Arc<Mutex<Vec<(u64, u64)>>>;

    fn open(size: usize, capacity: u64) -> (VirtualFile<RecordingTransport>, Calls) {
        let (transport, calls) = RecordingTransport::new(size);
        let file = VirtualFile::open_with(
            transport,
            VirtualFileOptions::default().with_cache_capacity(capacity),
        )
        .unwrap();
        (file, calls)
    }

    fn expected(range: std::ops::Range<usize>) -> Vec<u8> {
        range.map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn open_reads_metadata() {
        let (file, calls) = open(1000, 100);
        assert_eq!(file.total_size(), 1000);
        assert_eq!(file.content_type(), "text/plain");
        assert_eq!(file.tell().unwrap(), 0);
        assert_eq!(file.bypass_threshold(), 50);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn open_rejects_resource_without_ranges() {
        let (mut transport, _) = RecordingTransport::new(10);
        transport.accept_ranges = false;
        let result = VirtualFile::open(transport);
        assert!(matches!(result, Err(RangeFileError::UnsupportedResource)));
    }

    #[test]
    fn seek_clamps() {
        let (mut file, _) = open(1000, 100);
        assert_eq!(file.seek(2000, Whence::Start).unwrap(), 1000);
        assert_eq!(file.seek(-1000, Whence::Start).unwrap(), 0);
        assert_eq!(file.seek(-10, Whence::End).unwrap(), 990);
        assert_eq!(file.seek(5, Whence::Current).unwrap(), 995);
        assert_eq!(file.seek(i64::MAX, Whence::Current).unwrap(), 1000);
        assert_eq!(file.seek(i64::MIN, Whence::End).unwrap(), 0);
        assert_eq!(file.tell().unwrap(), 0);
    }

    #[test]
    fn read_near_end_is_clamped() {
        let (mut file, calls) = open(1000, 100);
        file.seek(950, Whence::Start).unwrap();
        let data = file.read_bytes(100).unwrap();
        assert_eq!(data, expected(950..1000));
        assert_eq!(file.tell().unwrap(), 1000);
        // 50 is not above the threshold, so it went through the cache,
        // and the refill was clamped to the end of the resource.
        assert_eq!(*calls.lock().unwrap(), vec![(950, 50)]);
    }

    #[test]
    fn small_reads_share_one_block() {
        let (mut file, calls) = open(1000, 100);
        assert_eq!(file.read_bytes(40).unwrap(), expected(0..40));
        assert_eq!(file.read_bytes(40).unwrap(), expected(40..80));
        assert_eq!(*calls.lock().unwrap(), vec![(0, 100)]);
        assert_eq!(file.stats().cached_reads, 2);
        assert_eq!(file.stats().cache_refills, 1);
    }

    #[test]
    fn crossing_block_end_refetches_at_cursor() {
        let (mut file, calls) = open(1000, 100);
        file.read_bytes(40).unwrap();
        file.read_bytes(40).unwrap();
        assert_eq!(file.read_bytes(40).unwrap(), expected(80..120));
        assert_eq!(*calls.lock().unwrap(), vec![(0, 100), (80, 100)]);
        assert_eq!(file.block_window(), Some((80, 100)));
    }

    #[test]
    fn backward_seek_outside_block_refetches() {
        let (mut file, calls) = open(1000, 100);
        file.seek(500, Whence::Start).unwrap();
        file.read_bytes(10).unwrap();
        file.seek(499, Whence::Start).unwrap();
        assert_eq!(file.read_bytes(2).unwrap(), expected(499..501));
        assert_eq!(*calls.lock().unwrap(), vec![(500, 100), (499, 100)]);
    }

    #[test]
    fn large_read_bypasses_cache() {
        let (mut file, calls) = open(1000, 100);
        file.read_bytes(10).unwrap();
        let window = file.block_window();

        file.seek(0, Whence::Start).unwrap();
        assert_eq!(file.read_bytes(90).unwrap(), expected(0..90));
        assert_eq!(*calls.lock().unwrap(), vec![(0, 100), (0, 90)]);
        assert_eq!(file.block_window(), window);
        assert_eq!(file.stats().bypass_reads, 1);
        assert_eq!(file.tell().unwrap(), 90);
    }

    #[test]
    fn threshold_is_exclusive() {
        let (mut file, calls) = open(1000, 100);
        file.read_bytes(50).unwrap();
        assert_eq!(file.stats().bypass_reads, 0);
        file.read_bytes(51).unwrap();
        assert_eq!(file.stats().bypass_reads, 1);
        assert_eq!(*calls.lock().unwrap(), vec![(0, 100), (50, 51)]);
    }

    #[test]
    fn custom_bypass_threshold() {
        let (transport, calls) = RecordingTransport::new(1000);
        let mut file = VirtualFile::open_with(
            transport,
            VirtualFileOptions::default()
                .with_cache_capacity(100)
                .with_bypass_threshold(90),
        )
        .unwrap();
        file.read_bytes(90).unwrap();
        file.read_bytes(91).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![(0, 100), (90, 91)]);
    }

    #[test]
    fn read_at_end_returns_empty() {
        let (mut file, calls) = open(1000, 100);
        file.seek(0, Whence::End).unwrap();
        assert!(file.read_bytes(10).unwrap().is_empty());
        assert!(file.read_all().unwrap().is_empty());
        assert!(file.peek(10).unwrap().is_empty());
        assert_eq!(file.tell().unwrap(), 1000);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_count_read_is_empty() {
        let (mut file, calls) = open(1000, 100);
        assert!(file.read_bytes(0).unwrap().is_empty());
        assert_eq!(file.tell().unwrap(), 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn read_all_from_start() {
        let (mut file, calls) = open(1000, 100);
        assert_eq!(file.read_all().unwrap(), expected(0..1000));
        assert_eq!(*calls.lock().unwrap(), vec![(0, 1000)]);
        assert_eq!(file.tell().unwrap(), 1000);
    }

    #[test]
    fn read_all_small_remainder_uses_cache() {
        let (mut file, calls) = open(1000, 100);
        file.seek(-30, Whence::End).unwrap();
        assert_eq!(file.read_all().unwrap(), expected(970..1000));
        assert_eq!(*calls.lock().unwrap(), vec![(970, 30)]);
    }

    #[test]
    fn peek_does_not_advance() {
        let (mut file, calls) = open(1000, 100);
        file.seek(10, Whence::Start).unwrap();
        let peeked = file.peek(5).unwrap().to_vec();
        assert_eq!(peeked, expected(10..110));
        assert_eq!(file.tell().unwrap(), 10);

        // Zero is treated as one byte, oversized counts as one block.
        assert_eq!(file.peek(0).unwrap().len(), 100);
        assert_eq!(file.peek(10_000).unwrap().len(), 100);
        assert_eq!(*calls.lock().unwrap(), vec![(10, 100)]);
    }

    #[test]
    fn short_response_is_a_consistency_error() {
        let (mut transport, _) = RecordingTransport::new(1000);
        transport.short_by = 1;
        let mut file = VirtualFile::open_with(
            transport,
            VirtualFileOptions::default().with_cache_capacity(100),
        )
        .unwrap();

        match file.read_bytes(10) {
            Err(RangeFileError::Consistency {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!((offset, expected, actual), (0, 100, 99));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(file.tell().unwrap(), 0);
    }

    #[test]
    fn transport_errors_propagate() {
        let mut file = VirtualFile::open(FailingTransport).unwrap();
        let err = file.read_bytes(10).unwrap_err();
        assert!(matches!(err, RangeFileError::Transport(_)));
        assert!(err.to_string().contains("500"));
        assert_eq!(file.tell().unwrap(), 0);
    }

    #[test]
    fn closed_file_rejects_operations() {
        let (mut file, _) = open(1000, 100);
        file.read_bytes(10).unwrap();
        file.close();
        file.close();

        assert!(file.is_closed());
        assert!(matches!(file.read_bytes(1), Err(RangeFileError::Closed)));
        assert!(matches!(file.read_all(), Err(RangeFileError::Closed)));
        assert!(matches!(file.peek(1), Err(RangeFileError::Closed)));
        assert!(matches!(file.seek(0, Whence::Start), Err(RangeFileError::Closed)));
        assert!(matches!(file.tell(), Err(RangeFileError::Closed)));
        assert!(matches!(file.readable(), Err(RangeFileError::Closed)));
        assert_eq!(file.total_size(), 1000);
    }

    #[test]
    fn write_side_is_unsupported() {
        let (mut file, _) = open(10, 100);
        assert!(!file.writable());
        assert!(file.seekable());
        assert!(file.readable().unwrap());
        assert!(matches!(
            file.write(b"x"),
            Err(RangeFileError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            file.truncate(0),
            Err(RangeFileError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            file.raw_fd(),
            Err(RangeFileError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn empty_resource() {
        let (mut file, calls) = open(0, 100);
        assert!(file.read_all().unwrap().is_empty());
        assert_eq!(file.seek(10, Whence::Start).unwrap(), 0);
        assert!(calls.lock().unwrap().is_empty());
    }
}
