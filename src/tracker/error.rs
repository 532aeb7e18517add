use thiserror::Error;

use crate::predict::PredictError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("session state lock poisoned")]
    Poisoned,
    #[error("predict error: {0}")]
    Predict(#[from] PredictError),
}

impl<T> From<std::sync::PoisonError<T>> for TrackerError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        TrackerError::Poisoned
    }
}

/// A clock shift that would leave the supported time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("time shift out of range")]
pub struct ShiftOutOfRange;
