//! Bounded capture of child output streams

use std::future::Future;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK: usize = 8 * 1024;

/// Bytes read from one stream
#[derive(Debug, Default, Clone)]
pub struct Captured {
    /// First `limit` bytes of the stream
    pub data: Vec<u8>,
    /// Bytes read past the limit and dropped
    pub discarded: usize,
}

impl Captured {
    /// Lossy UTF-8 view of the kept bytes
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Read `stream` to EOF, keeping at most `limit` bytes.
///
/// Reading continues past the limit so the writer never blocks on a full
/// pipe. A read error ends the capture with what was collected so far.
pub async fn read_bounded<R>(stream: R, limit: usize) -> Captured
where
    R: AsyncRead + Unpin,
{
    read_bounded_until(stream, limit, std::future::pending()).await
}

/// Like [`read_bounded`], but stops early once `stop` resolves.
///
/// Bytes read before the stop are kept. Used when a process outside our
/// control still holds the write end and EOF may never come.
pub async fn read_bounded_until<R, F>(mut stream: R, limit: usize, stop: F) -> Captured
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()>,
{
    let mut captured = Captured::default();
    let mut chunk = [0u8; CHUNK];
    tokio::pin!(stop);

    loop {
        let read = tokio::select! {
            read = stream.read(&mut chunk) => read,
            () = &mut stop => {
                tracing::debug!(kept = captured.data.len(), "stream capture cut off");
                break;
            }
        };
        let n = match read {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "stream read failed");
                break;
            }
        };

        let room = limit.saturating_sub(captured.data.len());
        let keep = n.min(room);
        captured.data.extend_from_slice(&chunk[..keep]);
        captured.discarded += n - keep;
    }

    if captured.discarded > 0 {
        tracing::debug!(
            kept = captured.data.len(),
            discarded = captured.discarded,
            "stream capture truncated"
        );
    }

    captured
}
