//! Response delay.
//!
//! A delay is written either as one number of seconds (`0.5`) or as a
//! `[min, max]` pair, in which case every response waits a uniformly random
//! time in that range. `null` or a missing field means no delay.

use crate::error::{EngineError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed or ranged pause applied before a response is sent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "DelayRepr", into = "DelayRepr")]
pub struct Delay {
    min_seconds: f64,
    max_seconds: f64,
}

impl Delay {
    /// No delay at all.
    pub const NONE: Delay = Delay {
        min_seconds: 0.0,
        max_seconds: 0.0,
    };

    /// Create a delay range.
    ///
    /// # Errors
    ///
    /// [`EngineError::DelayRange`] if a bound is negative, not finite or too
    /// large for a [`Duration`], or if `min > max`.
    pub fn new(min_seconds: f64, max_seconds: f64) -> Result<Self> {
        for bound in [min_seconds, max_seconds] {
            if !bound.is_finite() || bound < 0.0 {
                return Err(EngineError::DelayRange(format!(
                    "delay bounds must be finite and non-negative, got {bound}"
                )));
            }
            if Duration::try_from_secs_f64(bound).is_err() {
                return Err(EngineError::DelayRange(format!(
                    "delay of {bound}s is too large"
                )));
            }
        }
        if min_seconds > max_seconds {
            return Err(EngineError::DelayRange(format!(
                "maximum delay ({max_seconds}s) must be greater than minimum delay ({min_seconds}s)"
            )));
        }
        Ok(Self {
            min_seconds,
            max_seconds,
        })
    }

    /// Constant delay.
    ///
    /// # Errors
    ///
    /// [`EngineError::DelayRange`] if `seconds` is negative or not finite.
    pub fn fixed(seconds: f64) -> Result<Self> {
        Self::new(seconds, seconds)
    }

    /// Lower bound in seconds.
    #[must_use]
    pub fn min_seconds(&self) -> f64 {
        self.min_seconds
    }

    /// Upper bound in seconds.
    #[must_use]
    pub fn max_seconds(&self) -> f64 {
        self.max_seconds
    }

    /// Whether the delay is always zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.max_seconds == 0.0
    }

    /// Pick the number of seconds to wait for one response.
    #[must_use]
    pub fn resolve(&self) -> f64 {
        if self.min_seconds == self.max_seconds {
            self.min_seconds
        } else {
            rand::thread_rng().gen_range(self.min_seconds..=self.max_seconds)
        }
    }

    /// Suspend the current task for [`Delay::resolve`] seconds.
    ///
    /// Uses the tokio timer, so only the calling task waits; other in-flight
    /// requests keep running on the same worker threads.
    pub async fn apply(&self) {
        if self.is_zero() {
            return;
        }
        let seconds = self.resolve();
        let Ok(duration) = Duration::try_from_secs_f64(seconds) else {
            warn!(delay_seconds = seconds, "Delay out of range, sending immediately");
            return;
        };
        debug!(delay_ms = duration.as_millis() as u64, "Delaying response");
        tokio::time::sleep(duration).await;
    }
}

/// Deserialize a delay field where `null` means no delay.
pub(crate) fn deserialize_nullable<'de, D>(deserializer: D) -> std::result::Result<Delay, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Delay>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepted (de)serialized shapes of a delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DelayRepr {
    Fixed(f64),
    Range([f64; 2]),
    Named {
        #[serde(default)]
        min_delay: f64,
        #[serde(default)]
        max_delay: Option<f64>,
    },
}

impl TryFrom<DelayRepr> for Delay {
    type Error = EngineError;

    fn try_from(repr: DelayRepr) -> Result<Self> {
        match repr {
            DelayRepr::Fixed(seconds) => Delay::fixed(seconds),
            DelayRepr::Range([min, max]) => Delay::new(min, max),
            DelayRepr::Named {
                min_delay,
                max_delay,
            } => Delay::new(min_delay, max_delay.unwrap_or(min_delay)),
        }
    }
}

impl From<Delay> for DelayRepr {
    fn from(delay: Delay) -> Self {
        if delay.min_seconds == delay.max_seconds {
            DelayRepr::Fixed(delay.min_seconds)
        } else {
            DelayRepr::Range([delay.min_seconds, delay.max_seconds])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_min_greater_than_max_rejected() {
        assert!(matches!(
            Delay::new(2.0, 1.0),
            Err(EngineError::DelayRange(_))
        ));
        assert!(Delay::new(-1.0, 1.0).is_err());
        assert!(Delay::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_bounds_beyond_duration_range_rejected() {
        assert!(matches!(
            Delay::fixed(1e20),
            Err(EngineError::DelayRange(_))
        ));
        assert!(Delay::new(0.0, 1e20).is_err());
        assert!(serde_json::from_value::<Delay>(serde_json::json!(1e20)).is_err());
        assert!(serde_json::from_value::<Delay>(serde_json::json!([0.0, 1e30])).is_err());
        // a long but representable delay is still accepted
        assert!(Delay::fixed(86_400.0 * 365.0).is_ok());
    }

    #[test]
    fn test_resolve_fixed_and_range() {
        assert_eq!(Delay::fixed(0.25).unwrap().resolve(), 0.25);
        let range = Delay::new(0.1, 0.2).unwrap();
        for _ in 0..100 {
            let s = range.resolve();
            assert!((0.1..=0.2).contains(&s), "{s} out of range");
        }
    }

    #[test]
    fn test_deserialize_shapes() {
        let d: Delay = serde_json::from_str("1.5").unwrap();
        assert_eq!((d.min_seconds(), d.max_seconds()), (1.5, 1.5));
        let d: Delay = serde_json::from_str("[0.5, 2]").unwrap();
        assert_eq!((d.min_seconds(), d.max_seconds()), (0.5, 2.0));
        let d: Delay = serde_json::from_str(r#"{"min_delay": 1}"#).unwrap();
        assert_eq!((d.min_seconds(), d.max_seconds()), (1.0, 1.0));
        assert!(serde_json::from_str::<Delay>("[3, 1]").is_err());
        assert!(serde_json::from_str::<Delay>("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_serialize_collapses_fixed_delay() {
        assert_eq!(serde_json::to_string(&Delay::fixed(1.0).unwrap()).unwrap(), "1.0");
        assert_eq!(
            serde_json::to_string(&Delay::new(1.0, 2.0).unwrap()).unwrap(),
            "[1.0,2.0]"
        );
    }

    #[tokio::test]
    async fn test_apply_waits_without_blocking_other_tasks() {
        let delay = Delay::fixed(0.2).unwrap();
        let start = Instant::now();
        let slow = tokio::spawn(async move { delay.apply().await });
        let fast = tokio::spawn(async { Instant::now() });
        let fast_done = fast.await.unwrap();
        slow.await.unwrap();
        assert!(fast_done.duration_since(start) < Duration::from_millis(150));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
