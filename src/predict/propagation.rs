use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use crate::catalog::OrbitalRecord;
use crate::predict::ground_station::{WGS84_A_KM, WGS84_E2};
use crate::predict::pass_finder;
use crate::predict::{GroundStation, PassWindow, Position, PredictError};

const DEFAULT_SEARCH_WINDOW: Duration = Duration::days(2);

/// Propagation handle built from one orbital element record.
pub struct Satellite {
    name: String,
    elements: Elements,
    constants: Constants,
}

impl Satellite {
    pub fn from_record(record: &OrbitalRecord) -> Result<Self, PredictError> {
        let invalid = |message: String| PredictError::InvalidTle {
            name: record.name.clone(),
            message,
        };

        let elements = Elements::from_tle(
            Some(record.name.clone()),
            record.line1.as_bytes(),
            record.line2.as_bytes(),
        )
        .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: record.name.clone(),
            elements,
            constants,
        })
    }

    pub fn norad_id(&self) -> u64 {
        self.elements.norad_id
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }

    /// Satellite position in Earth-fixed coordinates (km).
    fn position_ecef_km(&self, timestamp: DateTime<Utc>) -> Result<[f64; 3], PredictError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));

        Ok(teme_to_ecef_position(prediction.position, sidereal))
    }
}

impl std::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("norad_id", &self.elements.norad_id)
            .finish()
    }
}

pub trait Propagator: Send + Sync {
    fn position(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        at: DateTime<Utc>,
    ) -> Result<Position, PredictError>;
}

pub trait PassPredictor: Send + Sync {
    fn next_pass(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        at: DateTime<Utc>,
    ) -> Result<PassWindow, PredictError>;
}

/// Everything the refresh loop needs from an ephemeris engine.
pub trait Ephemeris: Propagator + PassPredictor {
    fn as_predictor(&self) -> &dyn PassPredictor;
}

impl<T: Propagator + PassPredictor> Ephemeris for T {
    fn as_predictor(&self) -> &dyn PassPredictor {
        self
    }
}

/// SGP4 backed engine.
pub struct Sgp4Ephemeris {
    search_window: Duration,
}

impl Default for Sgp4Ephemeris {
    fn default() -> Self {
        Self {
            search_window: DEFAULT_SEARCH_WINDOW,
        }
    }
}

impl Sgp4Ephemeris {
    pub fn new(search_window: Duration) -> Self {
        Self { search_window }
    }
}

impl Propagator for Sgp4Ephemeris {
    fn position(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        at: DateTime<Utc>,
    ) -> Result<Position, PredictError> {
        look_angles(satellite, station, at)
    }
}

impl PassPredictor for Sgp4Ephemeris {
    fn next_pass(
        &self,
        satellite: &Satellite,
        station: &GroundStation,
        at: DateTime<Utc>,
    ) -> Result<PassWindow, PredictError> {
        pass_finder::next_pass(station, satellite, at, self.search_window)
    }
}

pub fn look_angles(
    satellite: &Satellite,
    station: &GroundStation,
    timestamp: DateTime<Utc>,
) -> Result<Position, PredictError> {
    let sat_ecef = satellite.position_ecef_km(timestamp)?;
    let sta_ecef = station.position_ecef_km();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, station.latitude_rad(), station.longitude_rad());
    let azimuth = east.atan2(north).to_degrees().rem_euclid(360.0);
    let altitude = if range_km > 0.0 {
        (up / range_km).asin().to_degrees()
    } else {
        0.0
    };

    let (sublat, sublong, height_km) = ecef_to_geodetic(sat_ecef);

    Ok(Position {
        azimuth_deg: azimuth,
        altitude_deg: altitude,
        range_km,
        sublat_deg: sublat.to_degrees(),
        sublong_deg: sublong.to_degrees(),
        height_km,
    })
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

/// Geodetic latitude, longitude (rad) and height (km) of an Earth-fixed point.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = ecef;
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut height = 0.0;
    for _ in 0..5 {
        let sin_lat = lat.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        height = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
    }

    (lat, lon, height)
}
