//! High-level TRELLIS client API.
//!
//! Provides [`TrellisClient`] for the initiator side of a connection:
//! TCP connect, three-way handshake, optional secure-session
//! establishment, reliable message delivery, and FIN/ACK teardown.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::{
    ChannelError, DeliveryError, ProtocolError, SecurityError, TrellisError,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
};
use crate::crypto::{SecureSession, SecurityConfig, SessionKey};
use crate::reliable::{send_reliable, Delivery, RetryPolicy};
use crate::transport::{
    ConnectionState, ControlFrame, FaultInjector, InitiatorHandshake, Phase, TrellisChannel,
};

/// Errors that can occur in the TRELLIS client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel failure while connecting, sending, or receiving.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The peer violated the control protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Reliable delivery exhausted its retry budget.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// A secure record failed verification.
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A secure operation was attempted without a secure session.
    #[error("no secure session established")]
    NoSecureSession,
}

impl From<TrellisError> for ClientError {
    fn from(err: TrellisError) -> Self {
        match err {
            TrellisError::Channel(e) => ClientError::Channel(e),
            TrellisError::Protocol(e) => ClientError::Protocol(e),
            TrellisError::Delivery(e) => ClientError::Delivery(e),
            TrellisError::Security(e) => ClientError::Security(e),
            TrellisError::Config(msg) => ClientError::Config(msg),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,

    /// Bound on the TCP connect and on each establishment-phase receive.
    pub connect_timeout: Duration,

    /// Retry policy for reliable deliveries (DATA and FIN).
    pub retry: RetryPolicy,

    /// Probability of silently dropping an outbound unit, in `[0, 1]`.
    /// Takes effect once the connection is established, so setup frames
    /// always reach the wire.
    pub loss_rate: f64,

    /// Security profile for the optional encrypted sub-channel. Both
    /// ends must agree out of band on whether one is configured.
    pub security: Option<SecurityConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_ENDPOINT.parse().expect("default endpoint is valid"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry: RetryPolicy::default(),
            loss_rate: 0.0,
            security: None,
        }
    }
}

/// Builder for creating a [`TrellisClient`] configuration.
#[derive(Debug)]
pub struct TrellisClientBuilder {
    config: ClientConfig,
}

impl TrellisClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the server address.
    pub fn server_addr(mut self, addr: SocketAddr) -> Self {
        self.config.server_addr = addr;
        self
    }

    /// Set the establishment timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the retry policy for reliable deliveries.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the outbound loss probability.
    pub fn loss_rate(mut self, loss_rate: f64) -> Self {
        self.config.loss_rate = loss_rate;
        self
    }

    /// Configure the secure sub-channel.
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = Some(security);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for TrellisClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A TRELLIS protocol client.
///
/// # Example
///
/// ```ignore
/// use trellis_protocol::client::{TrellisClient, TrellisClientBuilder};
///
/// let config = TrellisClientBuilder::new()
///     .server_addr("127.0.0.1:5555".parse()?)
///     .build();
///
/// let mut client = TrellisClient::connect(config).await?;
/// println!("server says: {}", client.greeting());
///
/// let delivery = client.send_message("Message 1").await?;
/// println!("echoed after {} attempt(s)", delivery.attempts);
///
/// client.close().await?;
/// ```
#[derive(Debug)]
pub struct TrellisClient {
    /// The unit channel to the server.
    channel: TrellisChannel,

    /// Connection lifecycle state.
    connection: ConnectionState,

    /// Secure sub-channel, when one was configured.
    session: Option<SecureSession>,

    /// Retry policy for deliveries on this connection.
    retry: RetryPolicy,

    /// Greeting text the server sent on establishment.
    greeting: String,
}

impl TrellisClient {
    /// Connect to a TRELLIS server and run the establishment sequence:
    /// TCP connect, SYN / SYN-ACK / ACK, read the greeting, and, if a
    /// security profile is configured, the key agreement.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        if !(0.0..=1.0).contains(&config.loss_rate) {
            return Err(ClientError::Config(format!(
                "loss_rate {} outside [0, 1]",
                config.loss_rate
            )));
        }

        let mut channel = TrellisChannel::connect(config.server_addr, config.connect_timeout).await?;
        let peer = channel.peer_addr();
        debug!(%peer, "connected, starting handshake");

        let mut handshake = InitiatorHandshake::new();
        let syn = handshake.start()?;
        channel.send(&syn.encode()).await?;

        let reply = receive_frame(&mut channel, config.connect_timeout).await?;
        let ack = handshake.on_reply(&reply)?;
        channel.send(&ack.encode()).await?;

        let greeting = match receive_frame(&mut channel, config.connect_timeout).await? {
            ControlFrame::Data(text) => text,
            other => {
                return Err(ProtocolError::UnexpectedFrame {
                    expected: "DATA",
                    got: other.tag().to_string(),
                }
                .into());
            }
        };
        let connection = handshake.into_connection(peer)?;
        info!(%peer, greeting = %greeting, "connection established");

        let session = match &config.security {
            Some(security) => Some(
                SecureSession::establish_initiator(&mut channel, security, config.connect_timeout)
                    .await?,
            ),
            None => None,
        };

        if config.loss_rate > 0.0 {
            channel.set_faults(Some(FaultInjector::new(config.loss_rate)));
        }

        Ok(Self {
            channel,
            connection,
            session,
            retry: config.retry,
            greeting,
        })
    }

    /// Send one application message reliably, returning the delivery
    /// outcome (the acknowledging echo and the attempt count).
    pub async fn send_message(&mut self, text: &str) -> Result<Delivery, ClientError> {
        let frame = ControlFrame::data(text);
        let delivery = send_reliable(&mut self.channel, &frame, &self.retry).await?;
        self.connection.frames_sent += u64::from(delivery.attempts);
        self.connection.record_received();
        Ok(delivery)
    }

    /// Seal `plaintext` into a secure record, transmit it, and wait for
    /// the server's confirming ACK.
    ///
    /// A record is sent once, not retried: silence within the attempt
    /// timeout surfaces as a channel timeout, and a server that rejects
    /// the record closes the connection instead of acknowledging.
    pub async fn send_secure(&mut self, plaintext: &[u8]) -> Result<(), ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NoSecureSession)?;
        session.send_record(&mut self.channel, plaintext).await?;
        self.connection.record_sent();

        match receive_frame(&mut self.channel, self.retry.attempt_timeout).await? {
            ControlFrame::Ack => {}
            other => {
                return Err(ProtocolError::UnexpectedFrame {
                    expected: "ACK",
                    got: other.tag().to_string(),
                }
                .into());
            }
        }
        self.connection.record_received();
        Ok(())
    }

    /// Tear the connection down: FIN through the reliable layer, then
    /// release everything. Consumes the client; after the acknowledging
    /// ACK no further frames are sent or accepted.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.connection.close();
        let delivery = send_reliable(&mut self.channel, &ControlFrame::Fin, &self.retry).await?;
        self.connection.frames_sent += u64::from(delivery.attempts);
        self.connection.mark_closed();
        info!(peer = %self.connection.remote_endpoint, "connection closed");
        Ok(())
    }

    /// The greeting the server sent when the handshake completed.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// The server's address.
    pub fn server_addr(&self) -> SocketAddr {
        self.connection.remote_endpoint
    }

    /// Current connection phase.
    pub fn phase(&self) -> Phase {
        self.connection.phase
    }

    /// Whether a secure sub-channel is established.
    pub fn is_secure(&self) -> bool {
        self.session.is_some()
    }

    /// The derived session key, when a secure sub-channel exists.
    ///
    /// Handle with care, this exposes sensitive key material.
    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session.as_ref().map(SecureSession::session_key)
    }

    /// Install or remove outbound loss injection on the live connection.
    pub fn set_faults(&mut self, faults: Option<FaultInjector>) {
        self.channel.set_faults(faults);
    }

    /// Read-only view of the connection state.
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }
}

async fn receive_frame(
    channel: &mut TrellisChannel,
    timeout: Duration,
) -> Result<ControlFrame, ClientError> {
    let unit = channel.receive(timeout).await?;
    Ok(ControlFrame::decode(unit)?)
}
