use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::ConfigSource;
use crate::errors::RelayError;
use crate::models::ChatRequest;
use crate::relay::sse::{self, LineBuffer, UpstreamLine};
use crate::relay::{RelayStats, StatsSnapshot, UpstreamClient};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct RelayService {
    upstream: UpstreamClient,
    config: ConfigSource,
    stats: Arc<RelayStats>,
}

impl RelayService {
    pub fn new(upstream: UpstreamClient, config: ConfigSource) -> Self {
        Self {
            upstream,
            config,
            stats: Arc::new(RelayStats::default()),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Opens the upstream stream for `request` and returns the re-framed
    /// downstream frames. Configuration is resolved per call.
    pub async fn relay(&self, request: ChatRequest) -> Result<ReceiverStream<Bytes>, RelayError> {
        self.stats.record_request();
        let config = self.config.resolve();

        let response = self
            .upstream
            .open_stream(&config, &request)
            .await
            .inspect_err(|e| {
                if e.is_upstream() {
                    self.stats.record_upstream_error();
                }
            })?;

        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let stats = self.stats.clone();
        tokio::spawn(forward_frames(response.bytes_stream(), tx, stats));

        Ok(ReceiverStream::new(rx))
    }
}

/// Reads `upstream` to its end, sending a downstream frame for every delta
/// and every `[DONE]` sentinel.
///
/// Stops early when the receiving side goes away; dropping `upstream` on
/// return releases the upstream connection.
pub async fn forward_frames<S, E>(upstream: S, tx: mpsc::Sender<Bytes>, stats: Arc<RelayStats>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut upstream = std::pin::pin!(upstream);
    let mut lines = LineBuffer::default();

    loop {
        let chunk = tokio::select! {
            chunk = upstream.next() => chunk,
            _ = tx.closed() => {
                info!("Client disconnected, releasing upstream stream");
                return;
            }
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                warn!("Upstream stream failed: {e}");
                stats.record_upstream_error();
                return;
            }
            None => break,
        };

        for line in lines.push(&chunk) {
            if !forward_line(&line, &tx, &stats).await {
                return;
            }
        }
        for _ in 0..lines.take_overflows() {
            warn!("Dropping upstream line longer than {} bytes", sse::MAX_LINE_BYTES);
            stats.record_malformed();
        }
    }

    if let Some(line) = lines.finish() {
        forward_line(&line, &tx, &stats).await;
    }
    debug!("Upstream stream finished");
}

/// Returns `false` once the downstream receiver is gone.
async fn forward_line(line: &str, tx: &mpsc::Sender<Bytes>, stats: &RelayStats) -> bool {
    let frame = match sse::classify(line) {
        UpstreamLine::Delta(content) => sse::delta_frame(&content),
        UpstreamLine::Done => sse::done_frame(),
        UpstreamLine::Empty | UpstreamLine::Ignored => return true,
        UpstreamLine::Malformed => {
            stats.record_malformed();
            debug!("Skipping malformed upstream line: {line}");
            return true;
        }
    };

    stats.record_frame();
    tx.send(frame).await.is_ok()
}
