use chrono::{DateTime, Duration, Utc};
use strum_macros::{EnumIter, IntoStaticStr};

use super::error::ShiftOutOfRange;

/// Largest displacement, either way, the clock accepts.
const MAX_DISPLACEMENT: Duration = Duration::days(100 * 366);

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    /// `amount` of this unit, or `None` when it does not fit a `Duration`.
    pub fn duration(self, amount: i64) -> Option<Duration> {
        match self {
            TimeUnit::Day => Duration::try_days(amount),
            TimeUnit::Hour => Duration::try_hours(amount),
            TimeUnit::Minute => Duration::try_minutes(amount),
            TimeUnit::Second => Duration::try_seconds(amount),
        }
    }
}

/// Session time: the wall clock shifted by an accumulated displacement, or a
/// frozen instant.
///
/// Not internally synchronized; the session keeps it behind its state lock.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    displacement: Duration,
    frozen_at: Option<DateTime<Utc>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now_at(Utc::now())
    }

    /// Session time for a given wall-clock reading.
    pub fn now_at(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        self.frozen_at.unwrap_or_else(|| self.shifted(wall))
    }

    pub fn displacement(&self) -> Duration {
        self.displacement
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    /// Adds to the displacement. While frozen this only shows after `unfreeze`.
    ///
    /// A displacement that would leave the supported range is refused and the
    /// clock keeps its previous value.
    pub fn adjust(&mut self, by: Duration) -> Result<(), ShiftOutOfRange> {
        let displacement = self
            .displacement
            .checked_add(&by)
            .filter(|d| d.abs() <= MAX_DISPLACEMENT)
            .ok_or(ShiftOutOfRange)?;
        Utc::now()
            .checked_add_signed(displacement)
            .ok_or(ShiftOutOfRange)?;

        self.displacement = displacement;
        Ok(())
    }

    /// Like `adjust`, in whole units. Returns the applied shift.
    pub fn adjust_units(
        &mut self,
        unit: TimeUnit,
        amount: i64,
    ) -> Result<Duration, ShiftOutOfRange> {
        let by = unit.duration(amount).ok_or(ShiftOutOfRange)?;
        self.adjust(by)?;
        Ok(by)
    }

    pub fn freeze(&mut self) {
        self.freeze_at(Utc::now());
    }

    pub fn freeze_at(&mut self, wall: DateTime<Utc>) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(self.shifted(wall));
        }
    }

    pub fn unfreeze(&mut self) {
        self.frozen_at = None;
    }

    pub fn reset(&mut self) {
        self.displacement = Duration::zero();
        self.frozen_at = None;
    }

    // Saturates at the ends of the calendar.
    fn shifted(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        wall.checked_add_signed(self.displacement).unwrap_or(
            if self.displacement < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            },
        )
    }
}
