//! High-level TRELLIS server API.
//!
//! Provides [`TrellisServer`]: accepts TCP connections and serves each
//! one on its own task, driving the responder handshake, the optional
//! secure session, the echo loop, and FIN/ACK teardown.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::core::{
    ChannelError, ProtocolError, TrellisError, DEFAULT_ENDPOINT, DEFAULT_IDLE_TIMEOUT,
};
use crate::crypto::{SecureSession, SecurityConfig};
use crate::transport::{ControlFrame, ResponderHandshake, TrellisChannel};

/// Errors that can occur in the TRELLIS server.
///
/// Per-connection failures never surface here; they are logged and end
/// only the affected connection's task.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// I/O error while accepting connections.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    /// Bound on every per-connection receive. A connection that stays
    /// silent past this is dropped.
    pub idle_timeout: Duration,

    /// Security profile for the optional encrypted sub-channel. Both
    /// ends must agree out of band on whether one is configured.
    pub security: Option<SecurityConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ENDPOINT
                .parse()
                .expect("default bind address is valid"),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            security: None,
        }
    }
}

/// Builder for creating a [`TrellisServer`] configuration.
#[derive(Debug)]
pub struct TrellisServerBuilder {
    config: ServerConfig,
}

impl TrellisServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the per-receive idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Configure the secure sub-channel.
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = Some(security);
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for TrellisServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A TRELLIS protocol server.
///
/// # Example
///
/// ```ignore
/// use trellis_protocol::server::{TrellisServer, TrellisServerBuilder};
///
/// let config = TrellisServerBuilder::new()
///     .bind_addr("127.0.0.1:5555".parse()?)
///     .build();
///
/// let server = TrellisServer::bind(config).await?;
/// println!("listening on {}", server.local_addr());
/// server.run().await?;
/// ```
pub struct TrellisServer {
    /// Listener accepting new connections.
    listener: TcpListener,

    /// Configuration applied to every connection.
    config: ServerConfig,

    /// The bound address.
    local_addr: SocketAddr,
}

impl TrellisServer {
    /// Bind to the configured address.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| ServerError::BindFailed(e.to_string()))?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "server listening");

        Ok(Self {
            listener,
            config,
            local_addr,
        })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections until the future is dropped, serving each
    /// connection on its own task.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "accepted connection");

            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(stream, peer, config).await {
                    warn!(%peer, error = %err, "connection aborted");
                }
            });
        }
    }
}

/// Serve one accepted connection to completion: responder handshake,
/// optional secure session, then the echo loop until FIN or disconnect.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: ServerConfig,
) -> Result<(), TrellisError> {
    let mut channel = TrellisChannel::from_stream(stream)?;
    let mut handshake = ResponderHandshake::new();

    let syn = receive_frame(&mut channel, config.idle_timeout).await?;
    let syn_ack = handshake.on_frame(&syn)?;
    channel.send(&syn_ack.encode()).await?;

    let ack = receive_frame(&mut channel, config.idle_timeout).await?;
    let greeting = handshake.on_frame(&ack)?;
    channel.send(&greeting.encode()).await?;

    let mut connection = handshake.into_connection(peer)?;
    info!(%peer, "connection established");

    // The secure profile carries exactly one sealed record, straight
    // after key agreement and before any DATA traffic. The record is
    // confirmed with an ACK so the sender's next frame never rides the
    // same read as the record bytes.
    if let Some(security) = &config.security {
        let session =
            SecureSession::establish_responder(&mut channel, security, config.idle_timeout).await?;
        let plaintext = session
            .receive_record(&mut channel, config.idle_timeout)
            .await?;
        connection.record_received();
        info!(
            %peer,
            message = %String::from_utf8_lossy(&plaintext),
            "secure record opened"
        );
        channel.send(&ControlFrame::Ack.encode()).await?;
        connection.record_sent();
    }

    loop {
        let frame = match channel.receive(config.idle_timeout).await {
            Ok(unit) => ControlFrame::decode(unit)?,
            Err(ChannelError::Closed) => {
                debug!(%peer, "peer disconnected without FIN");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        connection.record_received();

        match frame {
            ControlFrame::Data(text) => {
                debug!(%peer, message = %text, "echoing");
                channel.send(&ControlFrame::echo_of(&text).encode()).await?;
                connection.record_sent();
            }
            ControlFrame::Fin => {
                connection.close();
                channel.send(&ControlFrame::Ack.encode()).await?;
                connection.mark_closed();
                info!(
                    %peer,
                    received = connection.frames_received,
                    sent = connection.frames_sent,
                    "connection closed"
                );
                return Ok(());
            }
            other => {
                return Err(ProtocolError::UnexpectedFrame {
                    expected: "DATA or FIN",
                    got: other.tag().to_string(),
                }
                .into());
            }
        }
    }
}

async fn receive_frame(
    channel: &mut TrellisChannel,
    timeout: Duration,
) -> Result<ControlFrame, TrellisError> {
    let unit = channel.receive(timeout).await?;
    Ok(ControlFrame::decode(unit)?)
}
