//! Capture of child stdout/stderr and delivery of stdin.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Default)]
struct Buffer {
    bytes: Vec<u8>,
    truncated: bool,
}

/// A bounded buffer collecting one output stream of the child.
///
/// Clones share the same buffer, so the executor can read whatever was
/// captured even after abandoning the task that pumps the pipe.
#[derive(Clone, Debug)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Buffer>>,
    cap: usize,
}

impl CapturedOutput {
    /// Create an empty buffer keeping at most `cap` bytes.
    pub fn new(cap: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Buffer::default())),
            cap,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes, dropping anything past the cap.
    pub fn push(&self, chunk: &[u8]) {
        let mut buffer = self.lock();
        let room = self.cap.saturating_sub(buffer.bytes.len());
        if chunk.len() > room {
            buffer.truncated = true;
        }
        let keep = chunk.len().min(room);
        buffer.bytes.extend_from_slice(&chunk[..keep]);
    }

    /// Read `reader` to EOF into the buffer.
    ///
    /// Keeps reading after the cap is hit so the child never blocks on a
    /// full pipe.
    pub async fn pump<R>(&self, mut reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            self.push(&chunk[..n]);
        }
    }

    /// Get the captured output as a string, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock().bytes).into_owned()
    }

    /// Whether output was discarded because the cap was reached.
    pub fn is_truncated(&self) -> bool {
        self.lock().truncated
    }

    /// Number of bytes kept.
    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write `input` to the child's stdin and close it.
///
/// A child that exits without reading everything is not an error.
pub async fn feed_stdin<W>(mut stdin: W, input: Vec<u8>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match stdin.write_all(&input).await {
        Ok(()) => stdin.shutdown().await,
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("child closed stdin before consuming all input");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_cap() {
        let output = CapturedOutput::new(64);
        output.push(b"hello ");
        output.push(b"world");
        assert_eq!(output.to_string_lossy(), "hello world");
        assert!(!output.is_truncated());
    }

    #[test]
    fn test_push_truncates_at_cap() {
        let output = CapturedOutput::new(4);
        output.push(b"ab");
        output.push(b"cdef");
        output.push(b"gh");
        assert_eq!(output.to_string_lossy(), "abcd");
        assert_eq!(output.len(), 4);
        assert!(output.is_truncated());
    }

    #[test]
    fn test_lossy_decoding() {
        let output = CapturedOutput::new(16);
        output.push(&[b'o', b'k', 0xff]);
        assert_eq!(output.to_string_lossy(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_pump_drains_past_cap() {
        let data = vec![b'x'; 100_000];
        let output = CapturedOutput::new(10);
        output.pump(&data[..]).await.unwrap();
        assert_eq!(output.len(), 10);
        assert!(output.is_truncated());
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let output = CapturedOutput::new(32);
        let writer = output.clone();
        writer.pump(&b"shared"[..]).await.unwrap();
        assert_eq!(output.to_string_lossy(), "shared");
    }

    #[tokio::test]
    async fn test_feed_stdin() {
        let (client, mut server) = tokio::io::duplex(64);
        feed_stdin(client, b"input data".to_vec()).await.unwrap();
        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "input data");
    }
}
