/// Single contiguous window of the remote resource held in memory.
///
/// `data` always holds exactly the resource bytes in
/// `[start, start + data.len())`; an empty block caches nothing.
#[derive(Debug, Default)]
pub(crate) struct CacheBlock {
    start: u64,
    data: Vec<u8>,
}

impl CacheBlock {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Offset one past the last cached byte.
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    /// Whether `[position, position + count)` lies entirely inside the block.
    pub fn covers(&self, position: u64, count: u64) -> bool {
        position >= self.start && position + count <= self.end()
    }

    /// Swap in a freshly fetched window. The old contents are dropped whole,
    /// even where they overlap the new range.
    pub fn replace(&mut self, start: u64, data: Vec<u8>) {
        self.start = start;
        self.data = data;
    }

    /// Cached bytes from `position` to the end of the block.
    pub fn tail_from(&self, position: u64) -> &[u8] {
        if !self.covers(position, 0) {
            return &[];
        }
        &self.data[(position - self.start) as usize..]
    }
}
