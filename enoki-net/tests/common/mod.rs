//! Instrumented test transport: records every byte written and counts
//! shutdowns, so tests can observe wire traffic and teardown behavior.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// A transport wrapper that mirrors writes and shutdowns into a [`Probe`].
pub struct Instrumented<S> {
    inner: S,
    written: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
}

/// The observer half of an [`Instrumented`] transport.
#[derive(Clone)]
pub struct Probe {
    written: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl Probe {
    /// All bytes the wrapped side has written so far.
    pub fn bytes_written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Number of complete length-prefixed frames among the written bytes.
    pub fn frames_written(&self) -> usize {
        let bytes = self.bytes_written();
        let mut rest = bytes.as_slice();
        let mut count = 0;
        while rest.len() >= 4 {
            let len = u32::from_be_bytes(rest[..4].try_into().unwrap()) as usize;
            if rest.len() < 4 + len {
                break;
            }
            rest = &rest[4 + len..];
            count += 1;
        }
        count
    }

    /// How many times the transport has been shut down.
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Wrap one end of a duplex pipe.
pub fn instrument(inner: DuplexStream) -> (Instrumented<DuplexStream>, Probe) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let probe = Probe {
        written: Arc::clone(&written),
        shutdowns: Arc::clone(&shutdowns),
    };
    (
        Instrumented {
            inner,
            written,
            shutdowns,
        },
        probe,
    )
}

impl<S: AsyncRead + Unpin> AsyncRead for Instrumented<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Instrumented<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.written.lock().unwrap().extend_from_slice(&buf[..n]);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(Ok(())) => {
                this.shutdowns.fetch_add(1, Ordering::SeqCst);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
