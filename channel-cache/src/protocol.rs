//! Wire format shared by the server and the sample client.
//!
//! A request is exactly four bytes: the client's limit as a little-endian
//! `u32`. The response is a single protobuf `ChannelMessage` with two repeated
//! fields and no outer length prefix; the server closes its write side once
//! the message is out, so readers consume until EOF.

use std::io;

use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::sampler::SampleResult;

pub const REQUEST_LEN: usize = 4;

/// Protobuf envelope sent back to clients.
#[derive(Clone, PartialEq, Message)]
pub struct ChannelMessage {
    #[prost(int32, repeated, tag = "1")]
    pub ids: Vec<i32>,
    #[prost(string, repeated, tag = "2")]
    pub serials: Vec<String>,
}

impl From<SampleResult> for ChannelMessage {
    fn from(sample: SampleResult) -> Self {
        Self {
            ids: sample.ids,
            serials: sample.serials,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected a 4-byte request, received {received} bytes")]
    ShortRequest { received: usize },
    #[error("failed to read request: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode sample: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("failed to decode sample: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Reads the 4-byte limit, tolerating a request split across several reads.
pub async fn read_request<R>(reader: &mut R) -> Result<u32, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; REQUEST_LEN];
    let mut received = 0;
    while received < REQUEST_LEN {
        let bytes = reader.read(&mut buf[received..]).await?;
        if bytes == 0 {
            return Err(ProtocolError::ShortRequest { received });
        }
        received += bytes;
    }
    Ok(u32::from_le_bytes(buf))
}

pub async fn write_request<W>(writer: &mut W, limit: u32) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&limit.to_le_bytes()).await?;
    writer.flush().await
}

pub fn encode_sample(sample: SampleResult) -> Result<Vec<u8>, CodecError> {
    let message = ChannelMessage::from(sample);
    let mut buf = Vec::with_capacity(message.encoded_len());
    message.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_sample(bytes: &[u8]) -> Result<ChannelMessage, CodecError> {
    Ok(ChannelMessage::decode(bytes)?)
}

/// Writes the encoded message and closes the write half so the peer sees EOF.
pub async fn write_response<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload).await?;
    writer.flush().await?;
    writer.shutdown().await
}
