//! Response bodies fed by a blocking writer.
//!
//! The writer runs on the blocking pool and hands buffered chunks to the
//! response through a bounded channel, so a slow client applies
//! backpressure instead of the whole body piling up in memory.

use std::fmt::Display;
use std::io::{self, BufWriter, Write};

use axum::body::Body;
use futures_util::stream;
use tokio::sync::mpsc;
use tracing::warn;

/// Bytes buffered before a chunk is handed to the response.
const CHUNK_BYTES: usize = 64 * 1024;

/// Chunks in flight between the writer and the response.
const CHANNEL_DEPTH: usize = 8;

type Chunk = io::Result<Vec<u8>>;

/// The writing half of a streamed body. Fails with `BrokenPipe` once the
/// response is dropped.
pub struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `write` on the blocking pool and streams what it writes.
///
/// An error after the first chunk can no longer change the status, so it
/// is logged and ends the body abruptly.
pub fn streamed<F, E>(write: F) -> Body
where
    F: FnOnce(BufWriter<ChannelWriter>) -> Result<(), E> + Send + 'static,
    E: Display,
{
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);
    let errors = tx.clone();
    tokio::task::spawn_blocking(move || {
        let sink = BufWriter::with_capacity(CHUNK_BYTES, ChannelWriter { tx });
        if let Err(err) = write(sink) {
            warn!(error = %err, "Streamed body aborted");
            errors
                .blocking_send(Err(io::Error::other(err.to_string())))
                .ok();
        }
    });

    Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}
