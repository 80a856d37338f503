//! Datagram delivery to the recipient registry.

use contracts::{BridgeError, ChannelFrame, Recipient};
use metrics::counter;
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, trace, warn};

use crate::registry::RecipientRegistry;

/// How many consecutive ports are tried when binding the send socket.
pub const BIND_ATTEMPTS: u16 = 100;

/// Outcome of one delivery cycle across the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Identities of recipients whose send failed this cycle.
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends each accepted frame to every recipient in the registry.
///
/// Delivery is fire-and-forget: each recipient is attempted exactly once
/// per frame, and a failure for one recipient never blocks or aborts the
/// others. The send socket binds to the first free port at or above the
/// configured one.
#[derive(Debug)]
pub struct Disseminator {
    registry: RecipientRegistry,
    socket: Option<UdpSocket>,
    bound_port: Option<u16>,
}

impl Disseminator {
    pub fn new(registry: RecipientRegistry) -> Self {
        Self {
            registry,
            socket: None,
            bound_port: None,
        }
    }

    pub fn registry(&self) -> &RecipientRegistry {
        &self.registry
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// The local port the send socket bound to, once open.
    pub fn bound_port(&self) -> Option<u16> {
        self.bound_port
    }

    /// Binds the send socket, walking up from `preferred_port`.
    ///
    /// Ports are tried one at a time, `preferred_port` first, until one
    /// binds or every attempt is used up. A `preferred_port` of zero
    /// lets the operating system pick.
    #[instrument(name = "dissemination_open", skip(self))]
    pub async fn open(&mut self, preferred_port: u16) -> Result<u16, BridgeError> {
        let mut port = preferred_port;
        for _ in 0..BIND_ATTEMPTS {
            match UdpSocket::bind(("0.0.0.0", port)).await {
                Ok(socket) => {
                    let bound = socket.local_addr()?.port();
                    info!(port = bound, recipients = self.registry.len(), "send socket bound");
                    self.socket = Some(socket);
                    self.bound_port = Some(bound);
                    return Ok(bound);
                }
                Err(error) => {
                    debug!(port, %error, "bind attempt failed, trying the next port");
                    port = port.wrapping_add(1);
                }
            }
        }
        Err(BridgeError::config_validation(
            "sender_port",
            format!(
                "could not bind a send socket on any port in {}..{}",
                preferred_port,
                u32::from(preferred_port) + u32::from(BIND_ATTEMPTS)
            ),
        ))
    }

    /// Sends the frame payload to every recipient, one datagram each.
    ///
    /// Failures are counted and logged per recipient; the report says how
    /// many deliveries succeeded. Only a closed socket is an error.
    #[instrument(
        name = "disseminate",
        skip(self, frame),
        fields(channel = %frame.channel, bytes = frame.len())
    )]
    pub async fn disseminate(&self, frame: &ChannelFrame) -> Result<DeliveryReport, BridgeError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| BridgeError::delivery("*", "send socket is not open"))?;

        let mut report = DeliveryReport::default();
        for recipient in self.registry.recipients() {
            match send_one(socket, frame, recipient).await {
                Ok(sent) => {
                    report.delivered += 1;
                    counter!("streamcast_datagrams_sent_total").increment(1);
                    trace!(recipient = %recipient, sent, "datagram delivered");
                }
                Err(error) => {
                    report.failed.push(recipient.identity());
                    counter!("streamcast_delivery_failures_total", "recipient" => recipient.identity())
                        .increment(1);
                    warn!(recipient = %recipient, %error, "delivery failed");
                }
            }
        }
        Ok(report)
    }

    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("send socket closed");
        }
        self.bound_port = None;
    }
}

async fn send_one(
    socket: &UdpSocket,
    frame: &ChannelFrame,
    recipient: &Recipient,
) -> Result<usize, BridgeError> {
    let address = recipient.resolve()?;
    socket
        .send_to(&frame.payload, address)
        .await
        .map_err(|error| BridgeError::delivery(recipient.identity(), error.to_string()))
}
