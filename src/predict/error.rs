use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoPassReason {
    NeverRises,
    AlwaysUp,
}

impl fmt::Display for NoPassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoPassReason::NeverRises => f.write_str("never rises above the horizon"),
            NoPassReason::AlwaysUp => f.write_str("never sets below the horizon"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid {field}: {value}")]
    Validation { field: &'static str, value: f64 },
    #[error("object {0}")]
    NoPass(NoPassReason),
    #[error("the sun does not rise or set on {0}")]
    NoSunEvent(NaiveDate),
    #[error("invalid TLE for {name}: {message}")]
    InvalidTle { name: String, message: String },
    #[error("propagation error: {0}")]
    Propagation(String),
}
