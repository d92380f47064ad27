//! Delay callers so that at most `max_calls` weighted units run within any trailing `period`.

mod clock;
mod error;
mod future;
pub mod internal_event;
pub mod layer;
mod limiter;
mod notifier;
mod permit;
pub mod service;

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Deserializer, de::Error as _};

pub use clock::{Clock, SystemClock, TokioClock};
pub use error::LimiterError;
pub use future::ResponseFuture;
pub use layer::SlidingWindowLayer;
pub use limiter::SlidingWindowLimiter;
pub use notifier::Notifier;
pub use permit::Permit;
pub use service::SlidingWindow;

/// Configuration of a sliding-window limiter.
///
/// Values are only checked when a [`SlidingWindowLimiter`] is built from them, so a settings
/// value can be assembled (or deserialized) first and rejected later with a
/// [`LimiterError::Configuration`].
///
/// | Parameter | Default | Description |
/// |-----------|---------|-------------|
/// | `max_calls` | required | Weighted units allowed inside any window of `period` |
/// | `period` | 1s | Width of the trailing window. Deserialized from float seconds |
/// | `consume` | 1 | Units charged per acquisition. Can be changed later with `set_consume` |
/// | `notifier` | none | Called with the instant admission becomes possible, on every wait |
///
/// # Example
///
/// ```rust
/// use rate_limiter_window::sliding_window::{Notifier, SlidingWindowSettings};
/// use std::time::Duration;
///
/// let settings = SlidingWindowSettings::builder()
///     .max_calls(10)
///     .period(Duration::from_millis(500))
///     .consume(2)
///     .notifier(Notifier::new(|at| println!("throttled until {:?}", at)))
///     .build();
/// assert_eq!(settings.get_consume(), 2);
/// ```
#[derive(Clone, Debug, Builder, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlidingWindowSettings {
    /// Maximum number of weighted units permitted inside any window of length `period`.
    ///
    /// **Range**: > 0
    pub(super) max_calls: u64,

    /// Width of the trailing window.
    ///
    /// **Default**: 1 second
    /// **Range**: > 0
    #[builder(default = default_period())]
    #[serde(default = "default_period", deserialize_with = "deserialize_period")]
    pub(super) period: Duration,

    /// Units charged for every acquisition.
    ///
    /// **Default**: 1
    /// **Range**: >= 1
    #[builder(default = default_consume())]
    #[serde(default = "default_consume")]
    pub(super) consume: u64,

    #[serde(skip)]
    pub(super) notifier: Option<Notifier>,
}

const fn default_period() -> Duration {
    Duration::from_secs(1)
}

const fn default_consume() -> u64 {
    1
}

fn deserialize_period<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        D::Error::custom(format!("period must be a positive number of seconds, got {secs}"))
    })
}

impl SlidingWindowSettings {
    pub fn get_max_calls(&self) -> u64 {
        self.max_calls
    }
    pub fn get_period(&self) -> Duration {
        self.period
    }
    pub fn get_consume(&self) -> u64 {
        self.consume
    }

    /// Attach a notifier to settings that were deserialized without one.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub(super) fn validate(&self) -> Result<(), LimiterError> {
        if self.period.is_zero() {
            return error::ConfigurationSnafu {
                field: "period",
                requirement: "> 0",
            }
            .fail();
        }
        if self.max_calls == 0 {
            return error::ConfigurationSnafu {
                field: "number of calls",
                requirement: "> 0",
            }
            .fail();
        }
        validate_consume(self.consume)
    }
}

pub(super) fn validate_consume(consume: u64) -> Result<(), LimiterError> {
    if consume < 1 {
        return error::ConfigurationSnafu {
            field: "number of calls to consume",
            requirement: ">= 1",
        }
        .fail();
    }
    if usize::try_from(consume).is_err() {
        return error::ConfigurationSnafu {
            field: "number of calls to consume",
            requirement: "addressable on this platform",
        }
        .fail();
    }
    Ok(())
}
