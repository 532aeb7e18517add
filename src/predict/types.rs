use chrono::{DateTime, Utc};

/// Topocentric look angles plus the sub-satellite point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
    pub range_km: f64,
    pub sublat_deg: f64,
    pub sublong_deg: f64,
    pub height_km: f64,
}

/// Rise, culmination and set of a pass.
///
/// While the object is above the horizon, `set` belongs to the current pass and
/// `rise` to the following one, so `rise > set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassWindow {
    pub rise: DateTime<Utc>,
    pub transit: DateTime<Utc>,
    pub set: DateTime<Utc>,
}

impl PassWindow {
    pub fn in_progress(&self) -> bool {
        self.rise > self.set
    }
}
