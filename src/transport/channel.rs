//! Byte-stream channel for TRELLIS sessions.
//!
//! Wraps a TCP stream into the unit-oriented contract the upper layers
//! consume: one frame per `send`, one frame per `receive`, every receive
//! bounded by an explicit timeout. Units are at most [`MAX_FRAME_SIZE`]
//! bytes; the protocol's frames are small enough that one write surfaces
//! as one read on the peer (Nagle is disabled to keep it that way).
//!
//! An optional [`FaultInjector`] sits on the outbound path. When it
//! decides to drop a unit, `send` still returns `Ok(())` and nothing
//! reaches the wire - loss the sender cannot observe directly.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

use super::faults::FaultInjector;
use crate::core::{ChannelError, MAX_FRAME_SIZE};

/// A bidirectional unit channel over one TCP connection.
#[derive(Debug)]
pub struct TrellisChannel {
    /// The underlying stream.
    stream: TcpStream,
    /// Receive buffer, one unit deep.
    recv_buffer: Vec<u8>,
    /// Outbound fault injection, when configured.
    faults: Option<FaultInjector>,
    /// Peer address, captured at construction.
    peer: SocketAddr,
}

impl TrellisChannel {
    /// Open a channel to a remote endpoint, bounding the TCP connect.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, ChannelError> {
        let stream = time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ChannelError::Timeout)??;
        Self::from_stream(stream)
    }

    /// Wrap an already-connected stream (the accept path).
    pub fn from_stream(stream: TcpStream) -> Result<Self, ChannelError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            recv_buffer: vec![0u8; MAX_FRAME_SIZE],
            faults: None,
            peer,
        })
    }

    /// Attach a fault injector at construction time.
    pub fn with_faults(mut self, faults: FaultInjector) -> Self {
        self.faults = Some(faults);
        self
    }

    /// Install or remove the fault injector on a live channel.
    ///
    /// Lets a session establish cleanly and only then start dropping, or
    /// stop dropping once an experiment is done.
    pub fn set_faults(&mut self, faults: Option<FaultInjector>) {
        self.faults = faults;
    }

    /// The peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The local address of the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Transmit one unit.
    ///
    /// Returns `Ok(())` even when the fault injector discards the unit;
    /// the caller cannot distinguish a drop from a delivered send.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(ChannelError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "unit of {} bytes exceeds the {MAX_FRAME_SIZE}-byte maximum",
                    bytes.len()
                ),
            )));
        }

        if let Some(faults) = &mut self.faults {
            if faults.should_drop() {
                debug!(peer = %self.peer, len = bytes.len(), "dropped outbound unit (loss simulation)");
                return Ok(());
            }
        }

        self.stream.write_all(bytes).await?;
        debug!(peer = %self.peer, len = bytes.len(), "sent unit");
        Ok(())
    }

    /// Wait up to `timeout` for one unit.
    ///
    /// `Timeout` if nothing arrives in time, `Closed` if the peer has
    /// shut the stream down. The returned slice borrows the internal
    /// buffer and is valid until the next receive.
    pub async fn receive(&mut self, timeout: Duration) -> Result<&[u8], ChannelError> {
        let n = time::timeout(timeout, self.stream.read(&mut self.recv_buffer))
            .await
            .map_err(|_| ChannelError::Timeout)??;

        if n == 0 {
            return Err(ChannelError::Closed);
        }
        debug!(peer = %self.peer, len = n, "received unit");
        Ok(&self.recv_buffer[..n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn channel_pair() -> (TrellisChannel, TrellisChannel) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_stream = TcpStream::connect(addr).await.unwrap();
        let (server_stream, _) = listener.accept().await.unwrap();

        (
            TrellisChannel::from_stream(client_stream).unwrap(),
            TrellisChannel::from_stream(server_stream).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_channel_roundtrip() {
        let (mut client, mut server) = channel_pair().await;

        client.send(b"SYN").await.unwrap();
        assert_eq!(server.receive(Duration::from_secs(1)).await.unwrap(), b"SYN");

        server.send(b"SYN-ACK").await.unwrap();
        assert_eq!(
            client.receive(Duration::from_secs(1)).await.unwrap(),
            b"SYN-ACK"
        );
    }

    #[tokio::test]
    async fn test_connect_helper() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let channel = TrellisChannel::connect(addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(channel.peer_addr(), addr);
    }

    #[tokio::test]
    async fn test_receive_times_out_on_silence() {
        let (mut client, _server) = channel_pair().await;

        let err = client.receive(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout));
    }

    #[tokio::test]
    async fn test_receive_detects_closed_peer() {
        let (mut client, server) = channel_pair().await;
        drop(server);

        let err = client.receive(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[tokio::test]
    async fn test_dropped_unit_is_invisible_to_sender() {
        let (client, mut server) = channel_pair().await;
        let mut client = client.with_faults(FaultInjector::seeded(1.0, 7));

        // The send reports success even though nothing was transmitted.
        client.send(b"Message 1").await.unwrap();

        let err = server.receive(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout));
    }

    #[tokio::test]
    async fn test_faults_can_be_enabled_mid_session() {
        let (mut client, mut server) = channel_pair().await;

        client.send(b"before").await.unwrap();
        assert_eq!(
            server.receive(Duration::from_secs(1)).await.unwrap(),
            b"before"
        );

        client.set_faults(Some(FaultInjector::seeded(1.0, 7)));
        client.send(b"after").await.unwrap();
        let err = server.receive(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout));
    }

    #[tokio::test]
    async fn test_oversized_unit_is_rejected() {
        let (mut client, _server) = channel_pair().await;

        let big = vec![b'a'; MAX_FRAME_SIZE + 1];
        let err = client.send(&big).await.unwrap_err();
        assert!(matches!(err, ChannelError::Io(_)));
    }
}
