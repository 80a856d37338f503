//! UpstreamServer - a small wire-protocol server over a [`MemoryHub`]
//!
//! Stands in for the real managed-channel service in integration tests and
//! local demos.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use contracts::{BridgeError, FetchOutcome, ServerAddress};

use crate::memory::MemoryHub;
use crate::wire::{self, Request, Response};

/// Accepts wire-protocol clients and serves them from a shared [`MemoryHub`].
///
/// The accept loop is aborted when the server is dropped.
pub struct UpstreamServer {
    local_addr: SocketAddr,
    hub: MemoryHub,
    handle: JoinHandle<()>,
}

impl UpstreamServer {
    /// Bind `addr` (use port 0 for an ephemeral port) and start accepting.
    pub async fn bind(addr: &str, hub: MemoryHub) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "upstream server listening");

        let accept_hub = hub.clone();
        let handle = tokio::spawn(accept_loop(listener, accept_hub));

        Ok(Self {
            local_addr,
            hub,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The address clients should `open` against.
    pub fn server_address(&self) -> ServerAddress {
        ServerAddress::new(self.local_addr.ip().to_string(), self.local_addr.port())
    }

    pub fn hub(&self) -> &MemoryHub {
        &self.hub
    }
}

impl Drop for UpstreamServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn accept_loop(listener: TcpListener, hub: MemoryHub) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "client connected");
                let hub = hub.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, hub).await {
                        debug!(%peer, error = %e, "connection ended with error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn serve_connection(mut stream: TcpStream, hub: MemoryHub) -> Result<(), BridgeError> {
    // The first message must introduce the client; the name keys its
    // oldest-sequential cursor
    let client = match wire::read_message::<_, Request>(&mut stream).await? {
        Request::Hello { client } => client,
        _ => {
            let refusal = Response::Rejected {
                terminal: false,
                message: "expected hello".into(),
            };
            wire::write_message(&mut stream, &refusal).await?;
            return Ok(());
        }
    };
    if let Some(message) = hub.termination() {
        let refusal = Response::Rejected {
            terminal: true,
            message,
        };
        wire::write_message(&mut stream, &refusal).await?;
        return Ok(());
    }
    wire::write_message(&mut stream, &Response::Ok).await?;
    debug!(client, "client greeted");

    loop {
        // A failed read is an ordinary disconnect, not a server error
        let Ok(request) = wire::read_message::<_, Request>(&mut stream).await else {
            break;
        };
        let response = match request {
            Request::Bye => break,
            Request::Publish { frame } => match hub.publish(frame) {
                Ok(()) => Response::Ok,
                Err(e) => rejected(e),
            },
            Request::Fetch { channel, mode } => match hub.fetch(&client, &channel, mode) {
                Ok(FetchOutcome::Data(frame)) => Response::Record(frame),
                Ok(FetchOutcome::NoData) => Response::NoData,
                Err(e) => rejected(e),
            },
            Request::Hello { .. } => Response::Rejected {
                terminal: false,
                message: "already greeted".into(),
            },
        };
        wire::write_message(&mut stream, &response).await?;
    }
    debug!(client, "client disconnected");
    Ok(())
}

fn rejected(e: BridgeError) -> Response {
    Response::Rejected {
        terminal: e.is_fatal(),
        message: e.to_string(),
    }
}
