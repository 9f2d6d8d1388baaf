//! Byte-for-byte relay of an upstream response body.
//!
//! The relay never looks inside the bytes. It stops at upstream
//! end-of-stream, or at the first read error, and in both cases ends the
//! downstream body cleanly: headers are already committed, so there is no
//! way to report the failure in-band.

use std::convert::Infallible;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Instant;

use axum::body::Bytes;
use futures::{Stream, StreamExt};

use crate::error::RelayError;

/// Owns the upstream body for the lifetime of one relay.
///
/// Dropping the reader releases the upstream connection. Ownership makes
/// that happen exactly once, whichever way the relay ends: upstream EOF, a
/// read error, or the downstream client going away.
struct UpstreamReader<S> {
    inner: Pin<Box<S>>,
    relay_id: String,
    forwarded: usize,
    started: Instant,
}

impl<S> UpstreamReader<S> {
    fn new(inner: S, relay_id: String) -> Self {
        Self {
            inner: Box::pin(inner),
            relay_id,
            forwarded: 0,
            started: Instant::now(),
        }
    }
}

impl<S> Drop for UpstreamReader<S> {
    fn drop(&mut self) {
        tracing::debug!(
            name: "relay.upstream.released",
            relay_id = %self.relay_id,
            bytes = self.forwarded,
            elapsed_ms = self.started.elapsed().as_millis(),
            "Upstream reader released"
        );
    }
}

fn read_failure(e: &impl Display) -> RelayError {
    RelayError::StreamRead(e.to_string())
}

/// Wrap an upstream byte stream into a downstream body stream.
///
/// Chunks are forwarded as they arrive, unmodified. A read error ends the
/// output without an error item.
pub fn relay_body<S, E>(
    upstream: S,
    relay_id: String,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let mut reader = UpstreamReader::new(upstream, relay_id);

    async_stream::stream! {
        while let Some(chunk) = reader.inner.next().await {
            match chunk {
                Ok(bytes) => {
                    reader.forwarded += bytes.len();
                    yield Ok(bytes);
                }
                Err(e) => {
                    let err = read_failure(&e);
                    tracing::warn!(
                        name: "relay.stream.read_failed",
                        relay_id = %reader.relay_id,
                        bytes = reader.forwarded,
                        error = %err,
                        "Upstream read failed mid-stream; closing downstream"
                    );
                    break;
                }
            }
        }
        tracing::debug!(
            name: "relay.stream.finished",
            relay_id = %reader.relay_id,
            bytes = reader.forwarded,
            "Relay finished"
        );
    }
}
