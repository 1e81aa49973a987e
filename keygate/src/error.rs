use std::time::Duration;

/// Errors produced when a limiter is constructed with invalid parameters.
///
/// Construction either succeeds with a fully usable limiter or fails with one of
/// these; there is no partially built state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A count, rate or duration that must be strictly positive was zero.
    #[error("`{field}` must be greater than zero")]
    NotPositive {
        /// The name of the offending parameter.
        field: &'static str,
    },

    /// A floating point rate was negative, infinite or NaN.
    #[error("`{field}` must be a finite, non-negative number, got {value}")]
    Invalid {
        /// The name of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

pub(crate) fn positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::NotPositive { field })
    } else {
        Ok(())
    }
}

pub(crate) fn positive_duration(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        Err(ConfigError::NotPositive { field })
    } else {
        Ok(())
    }
}
