//! # TRELLIS Protocol
//!
//! **T**hree-way **R**endezvous, **E**cho-acknowledged **L**oss-tolerant
//! **L**inks, **I**ntegrity-**S**ecured Sessions
//!
//! TRELLIS is a connection-oriented transport protocol built in user space
//! on top of TCP byte streams. It provides:
//!
//! - **Rendezvous**: Explicit SYN / SYN-ACK / ACK connection establishment
//! - **Reliability**: Retry-with-timeout delivery over a lossy channel
//! - **Security**: Diffie-Hellman key agreement, AES-CBC + HMAC sealed records
//! - **Teardown**: Explicit FIN / ACK connection release
//! - **Fault injection**: Reproducible outbound loss for protocol testing
//!
//! ## Feature Flags
//!
//! - `transport` (default): Channel, control frames, handshake, fault injection
//! - `reliable` (default): Retry-with-timeout delivery
//! - `crypto` (default): Key agreement and sealed records
//! - `client` / `server` (default): High-level endpoint APIs
//!
//! ## Modules
//!
//! - [`core`]: Constants and error types (always included)
//! - [`transport`]: Channel abstraction and connection machinery
//! - [`reliable`]: Acknowledgment-driven redelivery
//! - [`crypto`]: Secure session layer
//! - [`client`] / [`server`]: Endpoint APIs
//!
//! ## Example Usage
//!
//! ```rust
//! use std::time::Duration;
//! use trellis_protocol::client::TrellisClientBuilder;
//! use trellis_protocol::reliable::RetryPolicy;
//!
//! let config = TrellisClientBuilder::new()
//!     .retry(RetryPolicy::new(5, Duration::from_secs(1)))
//!     .loss_rate(0.2)
//!     .build();
//!
//! assert_eq!(config.retry.max_attempts, 5);
//! ```
//!
//! Driving a full session is async end to end:
//!
//! ```ignore
//! let mut client = TrellisClient::connect(config).await?;
//! println!("server says: {}", client.greeting());
//!
//! let delivery = client.send_message("Message 1").await?;
//! println!("echoed after {} attempt(s)", delivery.attempts);
//!
//! client.close().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Reliable delivery layer (feature-gated)
#[cfg(feature = "reliable")]
#[cfg_attr(docsrs, doc(cfg(feature = "reliable")))]
pub mod reliable;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::*;

    #[cfg(feature = "reliable")]
    pub use crate::reliable::*;

    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;

    #[cfg(feature = "client")]
    pub use crate::client::*;

    #[cfg(feature = "server")]
    pub use crate::server::*;
}

// Re-export commonly used items at crate root
pub use crate::core::{ChannelError, DeliveryError, ProtocolError, SecurityError, TrellisError};

#[cfg(feature = "transport")]
pub use crate::transport::{ControlFrame, FaultInjector, Phase, Role, TrellisChannel};

#[cfg(feature = "client")]
pub use crate::client::{TrellisClient, TrellisClientBuilder};

#[cfg(feature = "server")]
pub use crate::server::{TrellisServer, TrellisServerBuilder};
