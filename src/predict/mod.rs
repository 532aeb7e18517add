pub mod daylight;
mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod types;

pub use error::{NoPassReason, PredictError};
pub use ground_station::GroundStation;
pub use propagation::{Ephemeris, PassPredictor, Propagator, Satellite, Sgp4Ephemeris};
pub use types::{PassWindow, Position};

#[cfg(test)]
pub(crate) use propagation::tests::iss_record;
