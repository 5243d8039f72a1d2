//! TRELLIS Protocol - Reliable Delivery Layer
//!
//! Retry-until-acknowledged delivery on top of the transport layer:
//!
//! - **Retry policy**: [`RetryPolicy`] bounds attempts and per-attempt waits
//! - **Delivery loop**: [`send_reliable`] resends until the acknowledging
//!   reply arrives, reporting the attempt count in [`Delivery`]
//!
//! The loop treats a timeout, a malformed unit, and a reply of the wrong
//! kind identically: the attempt is spent and the frame goes out again.
//! Only channel death cuts a delivery short.

mod delivery;
mod retry;

pub use delivery::*;
pub use retry::*;
