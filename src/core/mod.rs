//! TRELLIS Protocol - Core Types
//!
//! Constants and error types shared by every layer. Always compiled,
//! regardless of feature selection.

mod constants;
mod error;

pub use constants::*;
pub use error::*;
