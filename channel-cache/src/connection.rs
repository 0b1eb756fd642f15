//! Per-connection request/response state machine.
//!
//! Every connection walks `AwaitRequest -> ComputeSample -> SendResponse` and
//! is closed afterwards no matter which stage failed: the handler owns the
//! stream and drops it on return. Failures are reported to the caller and
//! never leave this connection; nothing is written to the peer on error.

use std::{fmt, future::Future, io, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    time,
};
use tracing::debug;

use crate::{
    cache::Cache,
    protocol::{CodecError, ProtocolError, encode_sample, read_request, write_response},
    sampler::{SampleError, Sampler},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitRequest,
    ComputeSample,
    SendResponse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitRequest => "await-request",
            Stage::ComputeSample => "compute-sample",
            Stage::SendResponse => "send-response",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Request(#[from] ProtocolError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to send response: {0}")]
    Send(#[source] io::Error),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },
}

impl ConnectionError {
    /// Stage the connection was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            ConnectionError::Request(_) => Stage::AwaitRequest,
            ConnectionError::Sample(_) | ConnectionError::Codec(_) => Stage::ComputeSample,
            ConnectionError::Send(_) => Stage::SendResponse,
            ConnectionError::Timeout { stage, .. } => *stage,
        }
    }
}

#[derive(Clone)]
pub struct ConnectionHandler {
    cache: Arc<Cache>,
    sampler: Sampler,
    io_timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(cache: Arc<Cache>, sampler: Sampler, io_timeout: Option<Duration>) -> Self {
        Self {
            cache,
            sampler,
            io_timeout,
        }
    }

    /// Serves one request on `stream` and returns the number of payload bytes
    /// sent. The stream is closed when this returns.
    pub async fn handle<S>(&self, mut stream: S) -> Result<usize, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let limit = self
            .bounded(Stage::AwaitRequest, async {
                read_request(&mut stream)
                    .await
                    .map_err(ConnectionError::from)
            })
            .await?;
        debug!(limit, "received request");

        let payload = self.compute_sample(limit)?;

        self.bounded(Stage::SendResponse, async {
            write_response(&mut stream, &payload)
                .await
                .map_err(ConnectionError::Send)
        })
        .await?;

        Ok(payload.len())
    }

    fn compute_sample(&self, limit: u32) -> Result<Vec<u8>, ConnectionError> {
        let snapshot = self.cache.snapshot();
        let sample = self
            .sampler
            .sample(&snapshot, limit, &mut rand::thread_rng())?;
        debug!(
            limit,
            generation = snapshot.generation(),
            drawn = sample.len(),
            "computed sample"
        );
        Ok(encode_sample(sample)?)
    }

    async fn bounded<T, F>(&self, stage: Stage, work: F) -> Result<T, ConnectionError>
    where
        F: Future<Output = Result<T, ConnectionError>>,
    {
        match self.io_timeout {
            Some(after) => time::timeout(after, work)
                .await
                .map_err(|_| ConnectionError::Timeout { stage, after })?,
            None => work.await,
        }
    }
}
