use thiserror::Error;

use crate::catalog::CatalogError;
use crate::predict::PredictError;
use crate::store::StoreError;
use crate::tracker::{ShiftOutOfRange, TrackerError};

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("console error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Tracker(#[from] TrackerError),
    #[error("{0}")]
    Predict(#[from] PredictError),
    #[error("{0}")]
    Usage(String),
    #[error("input ended")]
    Aborted,
    #[error("installation declined")]
    Declined,
}

impl From<ShiftOutOfRange> for ReplError {
    fn from(e: ShiftOutOfRange) -> Self {
        ReplError::Usage(e.to_string())
    }
}
