use snafu::Snafu;

/// Errors raised while configuring a [`SlidingWindowLimiter`](super::SlidingWindowLimiter).
///
/// Both variants are programmer errors: they surface synchronously and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LimiterError {
    /// A setting is out of range. Raised by construction and by `set_consume`.
    #[snafu(display("Invalid rate limiting {}: should be {}", field, requirement))]
    Configuration {
        field: &'static str,
        requirement: &'static str,
    },

    /// An attribute that must always hold a value was asked to be cleared.
    #[snafu(display("The `{}` attribute cannot be removed", attribute))]
    ImmutableAttribute { attribute: &'static str },
}

impl LimiterError {
    pub const fn is_configuration(&self) -> bool {
        matches!(self, LimiterError::Configuration { .. })
    }

    pub const fn is_immutable_attribute(&self) -> bool {
        matches!(self, LimiterError::ImmutableAttribute { .. })
    }
}
