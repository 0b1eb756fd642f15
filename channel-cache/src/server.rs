use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{debug, info, warn};

use crate::{cache::Cache, connection::ConnectionHandler, sampler::Sampler};

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerConfig {
    pub sampler: Sampler,
    /// Upper bound on the request read and on the response write.
    pub io_timeout: Option<Duration>,
}

pub struct Server {
    listener: TcpListener,
    handler: ConnectionHandler,
}

impl Server {
    pub fn new(listener: TcpListener, cache: Arc<Cache>, config: ServerConfig) -> Self {
        Self {
            listener,
            handler: ConnectionHandler::new(cache, config.sampler, config.io_timeout),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves. A failing `accept` ends
    /// the loop with an error; connections already spawned keep running.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, handler } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    let (stream, peer) = accept_result.context("failed to accept connection")?;
                    spawn_connection_handler(stream, peer, &handler);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn spawn_connection_handler(stream: TcpStream, peer: SocketAddr, handler: &ConnectionHandler) {
    let handler = handler.clone();
    tokio::spawn(async move {
        debug!(peer = %peer, "connection accepted");
        match handler.handle(stream).await {
            Ok(bytes) => debug!(peer = %peer, bytes, "response sent"),
            Err(err) => warn!(
                peer = %peer,
                stage = %err.stage(),
                error = %err,
                "connection closed with error"
            ),
        }
    });
}
