use super::{DEFAULT_CONTENT_TYPE, ResourceMetadata, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local file exposed through the [`Transport`] interface
pub struct FileTransport {
    path: PathBuf,
    #[cfg(unix)]
    file: std::fs::File,
    #[cfg(not(unix))]
    file: std::sync::Mutex<std::fs::File>,
}

impl FileTransport {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            #[cfg(unix)]
            file,
            #[cfg(not(unix))]
            file: std::sync::Mutex::new(file),
        })
    }

    fn content_type(&self) -> &'static str {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => "application/gzip",
            _ => DEFAULT_CONTENT_TYPE,
        }
    }

    /// Fill as much of `buf` as the file holds from `offset` on.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            while filled < buf.len() {
                match self.file.read_at(&mut buf[filled..], offset + filled as u64)? {
                    0 => break,
                    n => filled += n,
                }
            }
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = self
                .file
                .lock()
                .map_err(|_| std::io::Error::other("file lock poisoned"))?;
            file.seek(SeekFrom::Start(offset))?;
            while filled < buf.len() {
                match file.read(&mut buf[filled..])? {
                    0 => break,
                    n => filled += n,
                }
            }
        }

        Ok(filled)
    }

    fn len(&self) -> std::io::Result<u64> {
        #[cfg(unix)]
        let meta = self.file.metadata()?;
        #[cfg(not(unix))]
        let meta = std::fs::metadata(&self.path)?;
        Ok(meta.len())
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn probe(&self) -> Result<ResourceMetadata> {
        let size = self
            .len()
            .with_context(|| format!("Failed to stat {}", self.path.display()))?;
        Ok(ResourceMetadata::new(size, self.content_type(), true))
    }

    async fn fetch_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let available = self.len()?.saturating_sub(offset);
        let mut buf = vec![0u8; length.min(available) as usize];
        let n = self.read_at(offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }
}
