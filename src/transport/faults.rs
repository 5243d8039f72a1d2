//! Probabilistic fault injection for the channel's outbound path.
//!
//! Loss is modeled as a channel-level side effect invisible to the sender:
//! the dropped unit never reaches the wire, yet `send` still reports
//! success. Upper layers can only detect the loss through the absence of
//! an expected reply, which is exactly what the delivery layer's retry
//! loop keys on.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws a uniform value per outbound unit and decides whether to drop it.
#[derive(Debug)]
pub struct FaultInjector {
    /// Probability in `[0, 1]` of silently discarding an outbound unit.
    loss_rate: f64,
    rng: StdRng,
}

impl FaultInjector {
    /// Create an injector with the given loss probability.
    ///
    /// The rate is clamped to `[0, 1]`. A rate of `0.0` never drops and
    /// `1.0` always drops.
    pub fn new(loss_rate: f64) -> Self {
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
        }
    }

    /// Create an injector with a fixed seed for reproducible drop patterns.
    pub fn seeded(loss_rate: f64, seed: u64) -> Self {
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The configured loss probability.
    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    /// Decide the fate of the next outbound unit.
    ///
    /// Returns `true` if the unit must be dropped. Each call consumes one
    /// draw, so decisions are independent per unit.
    pub fn should_drop(&mut self) -> bool {
        self.rng.gen_range(0.0..1.0) < self.loss_rate
    }
}
