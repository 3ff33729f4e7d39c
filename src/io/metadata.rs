use anyhow::{Result, anyhow};

/// Content type reported when the remote does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Immutable description of a remote resource, gathered by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// Total byte length of the resource
    pub total_size: u64,
    /// Informational only
    pub content_type: String,
    /// Whether `Accept-Ranges` advertises the `bytes` unit
    pub supports_ranges: bool,
}

impl ResourceMetadata {
    pub fn new(total_size: u64, content_type: impl Into<String>, supports_ranges: bool) -> Self {
        Self {
            total_size,
            content_type: content_type.into(),
            supports_ranges,
        }
    }

    /// Build metadata from the raw `Content-Length`, `Content-Type` and
    /// `Accept-Ranges` header values of a probe response.
    pub fn from_headers(
        content_length: Option<&str>,
        content_type: Option<&str>,
        accept_ranges: Option<&str>,
    ) -> Result<Self> {
        let content_length =
            content_length.ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;
        let total_size = content_length
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid Content-Length: {content_length:?}"))?;

        Ok(Self {
            total_size,
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
            supports_ranges: accept_ranges.is_some_and(advertises_bytes),
        })
    }
}

/// `bytes` must appear as a whole word, where word characters are ASCII
/// alphanumerics and `_`: `nobytes`, `bytesize` or `bytes_x` don't count.
/// Range units compare case-insensitively (RFC 9110 section 14.1), so
/// `Bytes` does.
fn advertises_bytes(accept_ranges: &str) -> bool {
    accept_ranges
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|token| token.eq_ignore_ascii_case("bytes"))
}
