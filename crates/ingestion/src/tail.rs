//! TailReader - continuous ingestion from a growing byte stream

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use contracts::{BridgeError, ChannelFrame, ChannelName, TailEndpoint};

use crate::source::Cycle;

/// Read granularity while draining; mostly interesting to tests, which
/// shrink it to force multi-chunk drains.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

enum TailStream {
    Tcp(TcpStream),
    File { file: File, pos: u64 },
}

/// Continuously drains a growing byte stream and assembles each drain into
/// one frame.
///
/// Every poll takes all bytes currently available. When a drain needs more
/// than one read, the pieces are concatenated in the order they were read,
/// earliest first, so the frame payload is chronological.
pub struct TailReader {
    channel: ChannelName,
    endpoint: TailEndpoint,
    from_oldest: bool,
    idle_interval: Duration,
    chunk_size: usize,
    stream: Option<TailStream>,
}

impl TailReader {
    pub fn new(
        channel: impl Into<ChannelName>,
        endpoint: TailEndpoint,
        from_oldest: bool,
        idle_interval: Duration,
    ) -> Self {
        Self {
            channel: channel.into(),
            endpoint,
            from_oldest,
            idle_interval,
            chunk_size: DEFAULT_CHUNK_SIZE,
            stream: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Open or reopen the underlying stream.
    ///
    /// File endpoints start at the end of existing content unless the reader
    /// was built with `from_oldest`.
    pub async fn open(&mut self) -> Result<(), BridgeError> {
        let stream = match &self.endpoint {
            TailEndpoint::Tcp { addr } => {
                let stream = TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|e| BridgeError::upstream_connection(addr.clone(), e.to_string()))?;
                TailStream::Tcp(stream)
            }
            TailEndpoint::File { path } => {
                let mut file = File::open(path).await?;
                let pos = if self.from_oldest {
                    0
                } else {
                    file.seek(SeekFrom::End(0)).await?
                };
                TailStream::File { file, pos }
            }
        };
        self.stream = Some(stream);
        debug!(endpoint = %self.endpoint, "tail stream opened");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), BridgeError> {
        if let Some(stream) = self.stream.take() {
            if let TailStream::Tcp(mut tcp) = stream {
                let _ = tcp.shutdown().await;
            }
            debug!(endpoint = %self.endpoint, "tail stream closed");
        }
        Ok(())
    }

    /// Drain everything currently available into one frame, or report an
    /// idle cycle.
    pub async fn poll_cycle(&mut self) -> Result<Cycle, BridgeError> {
        let chunk_size = self.chunk_size;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BridgeError::ingest_io("tail stream is not open"))?;
        let drained = match stream {
            TailStream::Tcp(tcp) => drain_tcp(tcp, chunk_size).await?,
            TailStream::File { file, pos } => drain_file(file, pos, chunk_size).await?,
        };
        if drained.is_empty() {
            return Ok(Cycle::Idle);
        }
        let frame = ChannelFrame::stamped_now(self.channel.clone(), drained.freeze());
        Ok(Cycle::Data(frame))
    }
}

/// Wait until the socket is readable, then take every byte it has.
///
/// Waiting is the loop's one intentional blocking point; readiness can be
/// spurious, which surfaces as an idle cycle.
async fn drain_tcp(stream: &mut TcpStream, chunk_size: usize) -> Result<BytesMut, BridgeError> {
    let mut buffer = BytesMut::new();
    stream.readable().await?;
    let mut chunk = vec![0u8; chunk_size];
    loop {
        match stream.try_read(&mut chunk) {
            Ok(0) => {
                if buffer.is_empty() {
                    return Err(BridgeError::ingest_io("tail stream closed by peer"));
                }
                break;
            }
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(buffer)
}

/// Read from the tracked position to the current end of file.
///
/// A file that shrank was truncated or rotated underneath us; tailing
/// restarts from the top of the new content.
async fn drain_file(
    file: &mut File,
    pos: &mut u64,
    chunk_size: usize,
) -> Result<BytesMut, BridgeError> {
    let len = file.metadata().await?.len();
    if len < *pos {
        warn!(
            have = *pos,
            now = len,
            "tail file shrank, restarting from the beginning"
        );
        file.seek(SeekFrom::Start(0)).await?;
        *pos = 0;
    }
    let mut buffer = BytesMut::new();
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = file.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        *pos += n as u64;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tokio::io::AsyncWriteExt;

    fn file_reader(path: &Path, from_oldest: bool) -> TailReader {
        TailReader::new(
            "met/wind",
            TailEndpoint::File {
                path: path.to_path_buf(),
            },
            from_oldest,
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_file_tail_from_oldest() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"3.5,180").unwrap();

        let mut reader = file_reader(file.path(), true);
        reader.open().await.unwrap();

        let cycle = reader.poll_cycle().await.unwrap();
        match cycle {
            Cycle::Data(frame) => assert_eq!(&frame.payload[..], b"3.5,180"),
            Cycle::Idle => panic!("expected data"),
        }

        // Nothing new: idle
        assert!(matches!(reader.poll_cycle().await.unwrap(), Cycle::Idle));
    }

    #[tokio::test]
    async fn test_file_tail_from_newest_skips_history() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"old data\n").unwrap();

        let mut reader = file_reader(file.path(), false);
        reader.open().await.unwrap();
        assert!(matches!(reader.poll_cycle().await.unwrap(), Cycle::Idle));

        let mut handle = tokio::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .await
            .unwrap();
        handle.write_all(b"new data").await.unwrap();
        handle.flush().await.unwrap();

        match reader.poll_cycle().await.unwrap() {
            Cycle::Data(frame) => assert_eq!(&frame.payload[..], b"new data"),
            Cycle::Idle => panic!("expected appended data"),
        }
    }

    #[tokio::test]
    async fn test_multi_chunk_drain_is_chronological() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // 12 bytes, drained with 5-byte reads: 5 + 5 + 2
        std::fs::write(file.path(), b"hello, world").unwrap();

        let mut reader = file_reader(file.path(), true).with_chunk_size(5);
        reader.open().await.unwrap();

        match reader.poll_cycle().await.unwrap() {
            Cycle::Data(frame) => {
                assert_eq!(frame.len(), 12);
                assert_eq!(&frame.payload[..], b"hello, world");
            }
            Cycle::Idle => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn test_truncated_file_restarts_from_top() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"0123456789").unwrap();

        let mut reader = file_reader(file.path(), true);
        reader.open().await.unwrap();
        reader.poll_cycle().await.unwrap();

        // Rewrite with shorter content; the reader's position is now past EOF
        std::fs::write(file.path(), b"abc").unwrap();
        match reader.poll_cycle().await.unwrap() {
            Cycle::Data(frame) => assert_eq!(&frame.payload[..], b"abc"),
            Cycle::Idle => panic!("expected restarted data"),
        }
    }

    #[tokio::test]
    async fn test_tcp_tail_combines_available_segments() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let feeder = tokio::spawn(async move {
            let (mut peer, _) = listener.accept().await.unwrap();
            peer.write_all(b"hello").await.unwrap();
            peer.write_all(b", world").await.unwrap();
            peer.flush().await.unwrap();
            peer
        });

        let mut reader = TailReader::new(
            "met/wind",
            TailEndpoint::Tcp {
                addr: addr.to_string(),
            },
            false,
            Duration::from_millis(100),
        )
        .with_chunk_size(5);
        reader.open().await.unwrap();

        // Both writes have landed in our receive buffer once the feeder joins
        let _peer = feeder.await.unwrap();
        match reader.poll_cycle().await.unwrap() {
            Cycle::Data(frame) => assert_eq!(&frame.payload[..], b"hello, world"),
            Cycle::Idle => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn test_tcp_peer_hangup_is_recoverable_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut reader = TailReader::new(
            "met/wind",
            TailEndpoint::Tcp {
                addr: addr.to_string(),
            },
            false,
            Duration::from_millis(100),
        );
        reader.open().await.unwrap();

        let (peer, _) = listener.accept().await.unwrap();
        drop(peer);

        let err = reader.poll_cycle().await.unwrap_err();
        assert!(!err.is_fatal(), "got: {err}");
    }

    #[tokio::test]
    async fn test_missing_file_fails_open() {
        let mut reader = file_reader(Path::new("/nonexistent/stream.dat"), true);
        let err = reader.open().await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(!reader.is_open());
    }
}
