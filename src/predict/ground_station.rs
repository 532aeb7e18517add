use std::f64::consts::{FRAC_PI_2, PI};

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::predict::daylight;
use crate::predict::{PassPredictor, PassWindow, PredictError, Satellite};

/// Height of Mt. Everest.
pub const MAX_ELEVATION_M: f64 = 8848.0;
pub const MAX_UTC_OFFSET_HOURS: f64 = 14.0;

// WGS-84
pub const WGS84_A_KM: f64 = 6378.137;
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

/// A validated observer location. Never mutated after construction; a change
/// of location builds a new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundStation {
    latitude_rad: f64,
    longitude_rad: f64,
    elevation_m: f64,
    utc_offset_hours: f64,
}

impl GroundStation {
    pub fn new(
        latitude_rad: f64,
        longitude_rad: f64,
        elevation_m: f64,
        utc_offset_hours: f64,
    ) -> Result<Self, PredictError> {
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&latitude_rad) {
            return Err(PredictError::Validation {
                field: "latitude",
                value: latitude_rad,
            });
        }
        if !(-PI..=PI).contains(&longitude_rad) {
            return Err(PredictError::Validation {
                field: "longitude",
                value: longitude_rad,
            });
        }
        if !(0.0..=MAX_ELEVATION_M).contains(&elevation_m) {
            return Err(PredictError::Validation {
                field: "elevation",
                value: elevation_m,
            });
        }
        if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&utc_offset_hours) {
            return Err(PredictError::Validation {
                field: "UTC offset",
                value: utc_offset_hours,
            });
        }

        Ok(Self {
            latitude_rad,
            longitude_rad,
            elevation_m,
            utc_offset_hours,
        })
    }

    pub fn from_degrees(
        latitude_deg: f64,
        longitude_deg: f64,
        elevation_m: f64,
        utc_offset_hours: f64,
    ) -> Result<Self, PredictError> {
        Self::new(
            latitude_deg.to_radians(),
            longitude_deg.to_radians(),
            elevation_m,
            utc_offset_hours,
        )
    }

    pub fn latitude_rad(&self) -> f64 {
        self.latitude_rad
    }

    pub fn longitude_rad(&self) -> f64 {
        self.longitude_rad
    }

    pub fn elevation_m(&self) -> f64 {
        self.elevation_m
    }

    pub fn utc_offset_hours(&self) -> f64 {
        self.utc_offset_hours
    }

    pub fn latitude_deg(&self) -> f64 {
        self.latitude_rad.to_degrees()
    }

    pub fn longitude_deg(&self) -> f64 {
        self.longitude_rad.to_degrees()
    }

    pub fn offset(&self) -> FixedOffset {
        let seconds = (self.utc_offset_hours * 3600.0).round() as i32;
        // Bounded by MAX_UTC_OFFSET_HOURS, well inside FixedOffset's range.
        FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
    }

    pub fn local_time(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset())
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.latitude_rad;
        let lon = self.longitude_rad;
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.elevation_m / 1000.0;
        let x = (n + alt_km) * cos_lat * lon.cos();
        let y = (n + alt_km) * cos_lat * lon.sin();
        let z = (n * (1.0 - WGS84_E2) + alt_km) * sin_lat;
        [x, y, z]
    }

    /// Next pass of `satellite` as seen from here, starting at `at`.
    pub fn next_pass_for(
        &self,
        predictor: &dyn PassPredictor,
        satellite: &Satellite,
        at: DateTime<Utc>,
    ) -> Result<PassWindow, PredictError> {
        predictor.next_pass(satellite, self, at)
    }

    /// Whether `at` falls outside sunrise..sunset of its local calendar day.
    pub fn is_night(&self, at: DateTime<Utc>) -> Result<bool, PredictError> {
        let (sunrise, sunset) = daylight::sunrise_sunset(self, self.local_time(at).date_naive())?;
        Ok(at < sunrise || at > sunset)
    }
}
