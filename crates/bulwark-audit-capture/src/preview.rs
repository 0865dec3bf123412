//! Bounded previews of request and response bodies.

use std::io::Read;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

/// Read at most `limit` bytes from `reader` and decode them as UTF-8.
///
/// Invalid sequences become U+FFFD. A read error yields an empty string.
/// The reader is consumed and closed on every path.
pub fn read_bounded_preview<R: Read>(reader: R, limit: u64) -> String {
    let mut buf = Vec::new();
    match reader.take(limit).read_to_end(&mut buf) {
        Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => {
            warn!(limit, "Failed to read audit preview: {}", e);
            String::new()
        }
    }
}

/// Async counterpart of [`read_bounded_preview`].
pub async fn read_bounded_preview_async<R: AsyncRead + Unpin>(reader: R, limit: u64) -> String {
    let mut buf = Vec::new();
    match reader.take(limit).read_to_end(&mut buf).await {
        Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
        Err(e) => {
            warn!(limit, "Failed to read audit preview: {}", e);
            String::new()
        }
    }
}
