//! Request pacing policies.
//!
//! The search surface and article origins throttle clients that hit them at a
//! steady rate, so discovery waits a random interval between queries and
//! extraction occasionally takes a long pause. Both decisions go through
//! [`PacingPolicy`] so tests and local runs can switch them off.

use rand::{Rng, rng};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub trait PacingPolicy {
    /// Delay inserted between two discovery queries.
    fn between_queries(&self) -> Duration;

    /// Optional pause taken before an extraction attempt.
    fn before_extraction(&self) -> Option<Duration>;
}

/// Randomized pacing that mimics a person clicking through results.
#[derive(Debug, Clone)]
pub struct HumanPacing {
    /// Seconds to wait between queries, drawn uniformly.
    pub query_delay_secs: RangeInclusive<f64>,
    /// Chance of pausing before an extraction attempt.
    pub pause_probability: f64,
    pub pause: Duration,
}

impl HumanPacing {
    /// Pacing that never waits.
    pub fn disabled() -> Self {
        Self {
            query_delay_secs: 0.0..=0.0,
            pause_probability: 0.0,
            pause: Duration::ZERO,
        }
    }
}

impl Default for HumanPacing {
    fn default() -> Self {
        Self {
            query_delay_secs: 1.0..=3.0,
            pause_probability: 0.1,
            pause: Duration::from_secs(10),
        }
    }
}

impl PacingPolicy for HumanPacing {
    fn between_queries(&self) -> Duration {
        Duration::from_secs_f64(rng().random_range(self.query_delay_secs.clone()))
    }

    fn before_extraction(&self) -> Option<Duration> {
        let p = self.pause_probability.clamp(0.0, 1.0);
        rng().random_bool(p).then_some(self.pause)
    }
}

/// Sleep for `delay` unless it is zero.
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        info!(?delay, "Pacing pause");
        sleep(delay).await;
    }
}
