//! Sunrise and sunset from the standard sunrise equation.
//!
//! Accurate to a minute or two, which is plenty for labelling a pass as a day
//! or night pass.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::predict::{GroundStation, PredictError};

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;
const OBLIQUITY_DEG: f64 = 23.4397;
/// Refraction plus the solar semi-diameter.
const SUN_HORIZON_DEG: f64 = -0.833;

/// Sunrise and sunset (UTC) of the station's local calendar day `date`.
pub fn sunrise_sunset(
    station: &GroundStation,
    date: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), PredictError> {
    let local_noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
    let noon_utc = station
        .offset()
        .from_local_datetime(&local_noon)
        .single()
        .ok_or(PredictError::NoSunEvent(date))?
        .with_timezone(&Utc);

    let n = (to_julian(noon_utc) - J2000 + 0.0008).round();
    let mean_noon = n - station.longitude_deg() / 360.0;

    let m = (357.5291 + 0.985_600_28 * mean_noon).rem_euclid(360.0);
    let m_rad = m.to_radians();
    let center = 1.9148 * m_rad.sin() + 0.02 * (2.0 * m_rad).sin() + 0.0003 * (3.0 * m_rad).sin();
    let lambda = (m + center + 180.0 + 102.9372).rem_euclid(360.0).to_radians();

    let transit = J2000 + mean_noon + 0.0053 * m_rad.sin() - 0.0069 * (2.0 * lambda).sin();
    let declination = (lambda.sin() * OBLIQUITY_DEG.to_radians().sin()).asin();

    let lat = station.latitude_rad();
    let cos_hour_angle = (SUN_HORIZON_DEG.to_radians().sin() - lat.sin() * declination.sin())
        / (lat.cos() * declination.cos());
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return Err(PredictError::NoSunEvent(date));
    }

    let half_day = cos_hour_angle.acos().to_degrees() / 360.0;
    let sunrise = from_julian(transit - half_day).ok_or(PredictError::NoSunEvent(date))?;
    let sunset = from_julian(transit + half_day).ok_or(PredictError::NoSunEvent(date))?;
    Ok((sunrise, sunset))
}

fn to_julian(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 / SECONDS_PER_DAY + UNIX_EPOCH_JD
}

fn from_julian(jd: f64) -> Option<DateTime<Utc>> {
    let seconds = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY).round() as i64;
    DateTime::from_timestamp(seconds, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn equinox_on_equator_is_about_twelve_hours() {
        let station = GroundStation::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let (rise, set) = sunrise_sunset(&station, date).unwrap();
        let minutes = (set - rise).num_minutes();
        assert!((725..=735).contains(&minutes), "day length {minutes} min");
        assert!((5..=6).contains(&rise.hour()));
        assert!((17..=18).contains(&set.hour()));
    }

    #[test]
    fn local_offset_selects_local_day() {
        let station = GroundStation::from_degrees(34.0, -118.0, 0.0, -8.0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();
        let (rise, set) = sunrise_sunset(&station, date).unwrap();
        assert_eq!(station.local_time(rise).date_naive(), date);
        assert_eq!(station.local_time(set).date_naive(), date);
        assert!(rise < set);
    }

    #[test]
    fn polar_night() {
        let station = GroundStation::from_degrees(80.0, 0.0, 0.0, 0.0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        assert!(matches!(
            sunrise_sunset(&station, date),
            Err(PredictError::NoSunEvent(d)) if d == date
        ));
    }
}
