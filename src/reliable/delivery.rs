//! Reliable delivery over a lossy channel.
//!
//! [`send_reliable`] transmits one frame and waits for the reply that
//! acknowledges it, resending on every timeout or non-matching reply
//! until the [`RetryPolicy`] is exhausted. Acknowledgement matching is
//! by kind, not content, so a duplicate echo from an earlier attempt
//! still completes the delivery.

use tracing::{debug, warn};

use super::retry::{RetryPolicy, RetryState};
use crate::core::DeliveryError;
use crate::transport::{ControlFrame, TrellisChannel};

/// A completed delivery: the acknowledging reply and how many sends it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The frame that satisfied the acknowledgement pattern.
    pub reply: ControlFrame,
    /// Sends made, including the one that was finally acknowledged.
    pub attempts: u32,
}

/// Send `frame` until the peer's acknowledgement arrives.
///
/// Each attempt transmits the frame and waits `policy.attempt_timeout`
/// for a reply. A timeout, a malformed unit, or a reply of the wrong
/// kind consumes the attempt and triggers a resend. After
/// `policy.max_attempts` unacknowledged sends the delivery fails with
/// [`DeliveryError::Exhausted`]; a closed channel or I/O failure aborts
/// it immediately.
///
/// Frames that have no acknowledgement pattern (ACK, SYN-ACK, ECHO)
/// are rejected up front with [`DeliveryError::NoAckPattern`].
pub async fn send_reliable(
    channel: &mut TrellisChannel,
    frame: &ControlFrame,
    policy: &RetryPolicy,
) -> Result<Delivery, DeliveryError> {
    let expected = frame
        .expected_ack_tag()
        .ok_or(DeliveryError::NoAckPattern(frame.tag()))?;

    let bytes = frame.encode();
    let mut state = RetryState::new();

    while !state.exhausted(policy) {
        let attempt = state.begin_attempt();
        channel.send(&bytes).await?;
        debug!(
            attempt,
            max = policy.max_attempts,
            kind = frame.tag(),
            "delivery attempt sent"
        );

        match channel.receive(policy.attempt_timeout).await {
            Ok(unit) => match ControlFrame::decode(unit) {
                Ok(reply) if frame.is_acknowledged_by(&reply) => {
                    debug!(attempt, kind = frame.tag(), "delivery acknowledged");
                    return Ok(Delivery { reply, attempts: attempt });
                }
                Ok(reply) => {
                    warn!(
                        attempt,
                        expected,
                        got = reply.tag(),
                        "reply does not acknowledge, resending"
                    );
                    state.note_reply(reply.to_string());
                }
                Err(err) => {
                    warn!(attempt, %err, "malformed reply, resending");
                }
            },
            Err(err) if err.is_retryable() => {
                debug!(attempt, "no acknowledgement before timeout");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(
        attempts = state.attempts(),
        kind = frame.tag(),
        "delivery exhausted"
    );
    Err(state.into_failure())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChannelError;
    use crate::transport::FaultInjector;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};

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

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(100))
    }

    async fn echo_once(channel: &mut TrellisChannel) {
        let unit = channel.receive(Duration::from_secs(1)).await.unwrap();
        let frame = ControlFrame::decode(unit).unwrap();
        match frame {
            ControlFrame::Data(text) => {
                let echo = ControlFrame::echo_of(&text);
                channel.send(&echo.encode()).await.unwrap();
            }
            other => panic!("peer expected DATA, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delivery_succeeds_on_first_attempt() {
        let (mut client, mut server) = channel_pair().await;
        let peer = tokio::spawn(async move {
            echo_once(&mut server).await;
            server
        });

        let delivery = send_reliable(
            &mut client,
            &ControlFrame::data("Message 1"),
            &fast_policy(5),
        )
        .await
        .unwrap();

        assert_eq!(delivery.attempts, 1);
        assert_eq!(delivery.reply, ControlFrame::echo_of("Message 1"));
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_retries_after_swallowed_attempt() {
        let (mut client, mut server) = channel_pair().await;
        let peer = tokio::spawn(async move {
            // Swallow the first attempt, acknowledge the second.
            let _ = server.receive(Duration::from_secs(1)).await.unwrap();
            echo_once(&mut server).await;
            server
        });

        let delivery = send_reliable(
            &mut client,
            &ControlFrame::data("Message 2"),
            &fast_policy(5),
        )
        .await
        .unwrap();

        assert_eq!(delivery.attempts, 2);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_retries_on_non_matching_reply() {
        let (mut client, mut server) = channel_pair().await;
        let peer = tokio::spawn(async move {
            // A DATA reply does not acknowledge a DATA send.
            let _ = server.receive(Duration::from_secs(1)).await.unwrap();
            server
                .send(&ControlFrame::data("not an echo").encode())
                .await
                .unwrap();
            echo_once(&mut server).await;
            server
        });

        let delivery = send_reliable(
            &mut client,
            &ControlFrame::data("Message 3"),
            &fast_policy(5),
        )
        .await
        .unwrap();

        assert_eq!(delivery.attempts, 2);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_exhausts_after_exactly_max_attempts() {
        let (client, _server) = channel_pair().await;
        // Every outbound unit is dropped before the wire; the peer never
        // sees anything and never replies.
        let mut client = client.with_faults(FaultInjector::seeded(1.0, 3));

        let err = send_reliable(
            &mut client,
            &ControlFrame::data("Message 4"),
            &fast_policy(3),
        )
        .await
        .unwrap_err();

        match err {
            DeliveryError::Exhausted {
                attempts,
                last_reply,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_reply.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fin_is_acknowledged_by_ack() {
        let (mut client, mut server) = channel_pair().await;
        let peer = tokio::spawn(async move {
            let unit = server.receive(Duration::from_secs(1)).await.unwrap();
            assert_eq!(ControlFrame::decode(unit).unwrap(), ControlFrame::Fin);
            server.send(&ControlFrame::Ack.encode()).await.unwrap();
            server
        });

        let delivery = send_reliable(&mut client, &ControlFrame::Fin, &fast_policy(5))
            .await
            .unwrap();

        assert_eq!(delivery.reply, ControlFrame::Ack);
        assert_eq!(delivery.attempts, 1);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn test_pure_acks_cannot_be_sent_reliably() {
        let (mut client, _server) = channel_pair().await;

        let err = send_reliable(&mut client, &ControlFrame::Ack, &fast_policy(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::NoAckPattern("ACK")));
    }

    #[tokio::test]
    async fn test_closed_channel_aborts_delivery() {
        let (mut client, server) = channel_pair().await;
        drop(server);

        let err = send_reliable(
            &mut client,
            &ControlFrame::data("Message 5"),
            &fast_policy(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DeliveryError::Channel(ChannelError::Closed)
        ));
    }
}
