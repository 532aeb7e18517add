use chrono::{DateTime, Duration, Utc};

use crate::predict::propagation::look_angles;
use crate::predict::{GroundStation, NoPassReason, PassWindow, PredictError, Satellite};

const COARSE_STEP_SECONDS: i64 = 60;
const FINE_STEP_SECONDS: i64 = 1;
const HORIZON_ELEVATION: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    Rise,
    Set,
}

/// Next rise/transit/set of `satellite` as seen from `station`.
///
/// When the satellite is already up at `start`, the set and transit are those
/// of the current pass and the rise is that of the following pass.
pub fn next_pass(
    station: &GroundStation,
    satellite: &Satellite,
    start: DateTime<Utc>,
    window: Duration,
) -> Result<PassWindow, PredictError> {
    if is_up(station, satellite, start)? {
        let set = find_crossing(station, satellite, start, start + window, Crossing::Set)?
            .ok_or(PredictError::NoPass(NoPassReason::AlwaysUp))?;
        let transit = culmination(station, satellite, start, set)?;
        let rise = find_crossing(station, satellite, set, set + window, Crossing::Rise)?
            .ok_or(PredictError::NoPass(NoPassReason::NeverRises))?;
        Ok(PassWindow { rise, transit, set })
    } else {
        let rise = find_crossing(station, satellite, start, start + window, Crossing::Rise)?
            .ok_or(PredictError::NoPass(NoPassReason::NeverRises))?;
        let set = find_crossing(station, satellite, rise, rise + window, Crossing::Set)?
            .ok_or(PredictError::NoPass(NoPassReason::AlwaysUp))?;
        let transit = culmination(station, satellite, rise, set)?;
        Ok(PassWindow { rise, transit, set })
    }
}

fn elevation(
    station: &GroundStation,
    satellite: &Satellite,
    at: DateTime<Utc>,
) -> Result<f64, PredictError> {
    Ok(look_angles(satellite, station, at)?.altitude_deg)
}

fn is_up(
    station: &GroundStation,
    satellite: &Satellite,
    at: DateTime<Utc>,
) -> Result<bool, PredictError> {
    Ok(elevation(station, satellite, at)? >= HORIZON_ELEVATION)
}

/// Coarse scan for the first crossing of the given kind after `from`.
fn find_crossing(
    station: &GroundStation,
    satellite: &Satellite,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    kind: Crossing,
) -> Result<Option<DateTime<Utc>>, PredictError> {
    let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
    let mut prev_up = is_up(station, satellite, from)?;
    let mut cursor = from;

    while cursor < until {
        let next = cursor + coarse_step;
        let up = is_up(station, satellite, next)?;

        let crossed = match kind {
            Crossing::Rise => up && !prev_up,
            Crossing::Set => !up && prev_up,
        };
        if crossed {
            return refine_crossing(station, satellite, cursor, next, kind).map(Some);
        }

        prev_up = up;
        cursor = next;
    }

    Ok(None)
}

/// Binary search to find exact horizon crossing time
fn refine_crossing(
    station: &GroundStation,
    satellite: &Satellite,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    kind: Crossing,
) -> Result<DateTime<Utc>, PredictError> {
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = is_up(station, satellite, mid)?;

        // Keep `high` on the far side of the crossing.
        match (kind, above) {
            (Crossing::Rise, true) | (Crossing::Set, false) => high = mid,
            _ => low = mid,
        }
    }

    Ok(high)
}

/// Time of maximum elevation between `from` and `to`.
fn culmination(
    station: &GroundStation,
    satellite: &Satellite,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<DateTime<Utc>, PredictError> {
    let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
    let mut best = from;
    let mut best_el = elevation(station, satellite, from)?;
    let mut cursor = from;

    while cursor < to {
        cursor = (cursor + coarse_step).min(to);
        let el = elevation(station, satellite, cursor)?;
        if el > best_el {
            best_el = el;
            best = cursor;
        }
    }

    // Ternary search around the coarse maximum.
    let mut low = (best - coarse_step).max(from);
    let mut high = (best + coarse_step).min(to);
    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let third = (high - low) / 3;
        let m1 = low + third;
        let m2 = high - third;
        if elevation(station, satellite, m1)? < elevation(station, satellite, m2)? {
            low = m1;
        } else {
            high = m2;
        }
    }

    Ok(low + (high - low) / 2)
}
