use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{io::AsyncReadExt, net::TcpStream};
use tracing::info;

use crate::{
    cli::SampleArgs,
    protocol::{ChannelMessage, decode_sample, write_request},
};

pub async fn run(args: SampleArgs) -> Result<()> {
    let message = fetch_sample(args.server, args.limit).await?;
    info!("received {} channels", message.ids.len());

    for (id, serial) in message.ids.iter().zip(&message.serials) {
        println!("{id} {serial}");
    }

    Ok(())
}

/// Sends one request and returns the raw response bytes.
///
/// An empty buffer means the server closed the connection without replying,
/// which is also how an empty sample looks on the wire.
pub async fn fetch_raw(server: SocketAddr, limit: u32) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("failed to connect to {server}"))?;

    write_request(&mut stream, limit)
        .await
        .context("failed to send request")?;

    let mut payload = Vec::new();
    stream
        .read_to_end(&mut payload)
        .await
        .context("failed to read response")?;
    Ok(payload)
}

pub async fn fetch_sample(server: SocketAddr, limit: u32) -> Result<ChannelMessage> {
    let payload = fetch_raw(server, limit).await?;
    Ok(decode_sample(&payload)?)
}
