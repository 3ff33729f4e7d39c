//! `std::io` adapters so a [`VirtualFile`] can feed decoders and line readers.

use std::io::{self, BufRead, Read, Seek, SeekFrom};

use super::virtual_file::{VirtualFile, Whence};
use crate::io::Transport;

impl<T: Transport> Read for VirtualFile<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.read_bytes(buf.len() as u64)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

/// `fill_buf` exposes the cache block from the cursor on, so line-oriented
/// readers consume it in place without another copy.
impl<T: Transport> BufRead for VirtualFile<T> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.peek(1)?)
    }

    fn consume(&mut self, amt: usize) {
        self.advance(amt as u64);
    }
}

/// Targets outside the resource are clamped rather than rejected.
impl<T: Transport> Seek for VirtualFile<T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(n) => (i64::try_from(n).unwrap_or(i64::MAX), Whence::Start),
            SeekFrom::Current(n) => (n, Whence::Current),
            SeekFrom::End(n) => (n, Whence::End),
        };
        Ok(VirtualFile::seek(self, offset, whence)?)
    }
}
