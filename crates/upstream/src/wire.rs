//! Wire protocol for the managed-channel service.
//!
//! Every message is a 4-byte big-endian length prefix followed by a
//! bincode-encoded body. One request gets exactly one response, except
//! `Bye`, after which the peer just closes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use contracts::{BridgeError, ChannelFrame, ChannelName, FetchMode};

/// Upper bound on a single message body; larger prefixes are treated as a
/// corrupt stream.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// Client-to-server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Announce the client after connecting; must be the first message
    Hello { client: String },
    /// Request one record from `channel`
    Fetch { channel: ChannelName, mode: FetchMode },
    /// Push one frame onto its channel
    Publish { frame: ChannelFrame },
    /// Clean disconnect
    Bye,
}

/// Server-to-client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Request accepted, nothing to return
    Ok,
    /// One fetched record
    Record(ChannelFrame),
    /// The channel has nothing new for this client
    NoData,
    /// Request refused; `terminal` means the service will never serve this
    /// client again
    Rejected { terminal: bool, message: String },
}

/// Write one length-prefixed message.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message)
        .map_err(|e| BridgeError::ingest_io(format!("message encode error: {e}")))?;
    let len = u32::try_from(body.len())
        .map_err(|_| BridgeError::ingest_io("message body exceeds u32 length"))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T, BridgeError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(BridgeError::ingest_io(format!(
            "message length {len} exceeds limit of {MAX_MESSAGE_BYTES}"
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    bincode::deserialize(&body)
        .map_err(|e| BridgeError::ingest_io(format!("message decode error: {e}")))
}
