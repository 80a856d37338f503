//! TcpUpstreamClient - wire-protocol client over TCP

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use contracts::{
    BridgeError, ChannelFrame, ChannelName, FetchMode, FetchOutcome, ServerAddress,
    UpstreamClient,
};

use crate::wire::{self, Request, Response};

/// [`UpstreamClient`] talking the length-prefixed wire protocol to a remote
/// managed-channel service.
///
/// A transport failure mid-exchange drops the connection; the caller is
/// expected to `open` again before the next request.
pub struct TcpUpstreamClient {
    name: String,
    stream: Option<TcpStream>,
}

impl TcpUpstreamClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: None,
        }
    }

    fn rejection(terminal: bool, message: String) -> BridgeError {
        if terminal {
            BridgeError::fatal_upstream(message)
        } else {
            BridgeError::ingest_io(message)
        }
    }

    /// One request/response round trip. Any transport error poisons the
    /// connection.
    async fn exchange(&mut self, request: &Request) -> Result<Response, BridgeError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BridgeError::ingest_io("upstream connection is not open"))?;
        let result = async {
            wire::write_message(stream, request).await?;
            wire::read_message::<_, Response>(stream).await
        }
        .await;
        if result.is_err() {
            self.stream = None;
        }
        result
    }
}

impl UpstreamClient for TcpUpstreamClient {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    #[instrument(name = "upstream_open", skip(self, server), fields(client = %self.name, server = %server))]
    async fn open(&mut self, server: &ServerAddress) -> Result<(), BridgeError> {
        let mut stream = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|e| BridgeError::upstream_connection(server.to_string(), e.to_string()))?;

        let hello = Request::Hello {
            client: self.name.clone(),
        };
        wire::write_message(&mut stream, &hello).await?;
        match wire::read_message::<_, Response>(&mut stream).await? {
            Response::Ok => {
                self.stream = Some(stream);
                debug!(client = %self.name, "upstream connection established");
                Ok(())
            }
            Response::Rejected { terminal, message } => Err(Self::rejection(terminal, message)),
            other => Err(BridgeError::ingest_io(format!(
                "unexpected response to hello: {other:?}"
            ))),
        }
    }

    #[instrument(name = "upstream_publish", skip(self, frame), fields(client = %self.name, channel = %frame.channel))]
    async fn publish(&mut self, frame: ChannelFrame) -> Result<(), BridgeError> {
        match self.exchange(&Request::Publish { frame }).await? {
            Response::Ok => Ok(()),
            Response::Rejected { terminal, message } => Err(Self::rejection(terminal, message)),
            other => Err(BridgeError::ingest_io(format!(
                "unexpected response to publish: {other:?}"
            ))),
        }
    }

    #[instrument(name = "upstream_fetch", skip(self, channel), fields(client = %self.name, channel = %channel))]
    async fn fetch(
        &mut self,
        channel: &ChannelName,
        mode: FetchMode,
    ) -> Result<FetchOutcome, BridgeError> {
        let request = Request::Fetch {
            channel: channel.clone(),
            mode,
        };
        match self.exchange(&request).await? {
            Response::Record(frame) => Ok(FetchOutcome::Data(frame)),
            Response::NoData => Ok(FetchOutcome::NoData),
            Response::Rejected { terminal, message } => Err(Self::rejection(terminal, message)),
            Response::Ok => Err(BridgeError::ingest_io("unexpected bare ok to fetch")),
        }
    }

    #[instrument(name = "upstream_close", skip(self))]
    async fn close(&mut self) -> Result<(), BridgeError> {
        if let Some(mut stream) = self.stream.take() {
            // Best-effort goodbye; the connection is going away either way
            let _ = wire::write_message(&mut stream, &Request::Bye).await;
            let _ = stream.shutdown().await;
            debug!(client = %self.name, "upstream connection closed");
        }
        Ok(())
    }
}
