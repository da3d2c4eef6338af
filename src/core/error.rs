use chrono::{DateTime, Utc};

/// Failures of the simulation core.
///
/// The computation is deterministic and offline, so none of these are retryable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("expected 8760 or 8784 hourly points, got {0}")]
    InvalidProfileLength(usize),

    #[error("misaligned series at point #{index}: expected {expected}, got {actual}")]
    MisalignedSeries { index: usize, expected: DateTime<Utc>, actual: DateTime<Utc> },

    #[error("invalid parameter `{name}` = {value}, expected {expected}")]
    InvalidParameter { name: &'static str, value: f64, expected: &'static str },

    /// Dispatch engine bug: the state of charge left its physical bounds.
    #[error("state of charge {state_of_charge} MWh outside 0..={capacity} MWh after hour #{hour}")]
    StateInvariantViolation { hour: usize, state_of_charge: f64, capacity: f64 },
}

impl Error {
    /// Ensure that the parameter value lies within the inclusive range.
    pub fn ensure_within(
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
        expected: &'static str,
    ) -> Result<(), Self> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::InvalidParameter { name, value, expected })
        }
    }
}
