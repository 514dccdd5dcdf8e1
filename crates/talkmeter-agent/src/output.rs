//! Where spoken summaries go once rendered.

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes one summary followed by a newline and flushes, so a reader on the
/// other end of a pipe sees it immediately.
pub async fn write_summary<W: AsyncWrite + Unpin>(out: &mut W, summary: &str) -> std::io::Result<()> {
    out.write_all(summary.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
