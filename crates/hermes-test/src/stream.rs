//! Streams that report when they are released.
//!
//! The provider takes request and response streams by value; dropping them is
//! the release. [`TrackedReader`] and [`TrackedWriter`] record their drops in
//! a shared [`StreamProbe`] so tests can assert "released exactly once" on
//! every exit path.

use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared view of what happened to tracked streams.
#[derive(Debug, Clone, Default)]
pub struct StreamProbe {
    drops: Arc<AtomicUsize>,
    bytes_read: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl StreamProbe {
    /// Creates a fresh probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader over `input` reporting to this probe.
    pub fn reader(&self, input: impl Into<Vec<u8>>) -> TrackedReader {
        TrackedReader {
            inner: io::Cursor::new(input.into()),
            probe: self.clone(),
            fail_after: None,
        }
    }

    /// Creates a writer reporting to this probe.
    pub fn writer(&self) -> TrackedWriter {
        TrackedWriter {
            probe: self.clone(),
            fail_after: None,
        }
    }

    /// Number of tracked streams dropped so far.
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    /// Bytes handed out by tracked readers.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read.load(Ordering::SeqCst)
    }

    /// Bytes accepted by tracked writers.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    /// Bytes accepted by tracked writers, as UTF-8.
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written.lock()).into_owned()
    }
}

/// In-memory reader that counts its drop.
#[derive(Debug)]
pub struct TrackedReader {
    inner: io::Cursor<Vec<u8>>,
    probe: StreamProbe,
    fail_after: Option<usize>,
}

impl TrackedReader {
    /// Fails with `ConnectionReset` once `n` bytes have been read.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut limit = buf.len();
        if let Some(n) = self.fail_after {
            let consumed = self.probe.bytes_read();
            if consumed >= n {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                ));
            }
            limit = limit.min(n - consumed);
        }

        let read = self.inner.read(&mut buf[..limit])?;
        self.probe.bytes_read.fetch_add(read, Ordering::SeqCst);
        Ok(read)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.probe.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory writer that counts its drop.
#[derive(Debug)]
pub struct TrackedWriter {
    probe: StreamProbe,
    fail_after: Option<usize>,
}

impl TrackedWriter {
    /// Fails with `BrokenPipe` once `n` bytes have been accepted.
    #[must_use]
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl Write for TrackedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = self.probe.written.lock();
        let mut accepted = buf.len();
        if let Some(n) = self.fail_after {
            if written.len() >= n {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
            }
            accepted = accepted.min(n - written.len());
        }
        written.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for TrackedWriter {
    fn drop(&mut self) {
        self.probe.drops.fetch_add(1, Ordering::SeqCst);
    }
}
