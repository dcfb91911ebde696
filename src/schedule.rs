use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{LightingError, Result};

/// Highest duty value a channel accepts, in percent.
pub const MAX_VALUE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleValuePoint {
    pub time: NaiveTime,
    pub value: u8,
}

impl ScheduleValuePoint {
    pub fn new(time: NaiveTime, value: u8) -> ScheduleValuePoint {
        ScheduleValuePoint { time, value }
    }
}

/// Breakpoints of a daily step function, sorted by time of day.
///
/// Only constructible through [`Schedule::new`], so every instance is sorted and has no two
/// points at the same time. Deserialization goes through the same check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<ScheduleValuePoint>",
    into = "Vec<ScheduleValuePoint>"
)]
pub struct Schedule {
    points: Vec<ScheduleValuePoint>,
}

impl Schedule {
    pub fn new(mut points: Vec<ScheduleValuePoint>) -> Result<Schedule> {
        points.sort_by_key(|p| p.time);
        if let Some(pair) = points.windows(2).find(|pair| pair[0].time == pair[1].time) {
            return Err(LightingError::DuplicateTime(pair[0].time));
        }

        Ok(Schedule { points })
    }

    pub fn points(&self) -> &[ScheduleValuePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn check_values(&self) -> Result<()> {
        for point in &self.points {
            check_value(point.value)?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<ScheduleValuePoint>> for Schedule {
    type Error = LightingError;

    fn try_from(points: Vec<ScheduleValuePoint>) -> Result<Schedule> {
        Schedule::new(points)
    }
}

impl From<Schedule> for Vec<ScheduleValuePoint> {
    fn from(schedule: Schedule) -> Self {
        schedule.points
    }
}

pub(crate) fn check_value(value: u8) -> Result<()> {
    if value > MAX_VALUE {
        return Err(LightingError::ValueOutOfRange {
            value,
            max: MAX_VALUE,
        });
    }
    Ok(())
}

/// Value that is active at `now` on the daily step function described by `schedule`.
///
/// Picks the last point at or before `now`. Before the first point of the day the last point
/// of the previous day is still active. Returns `None` only for an empty schedule.
pub fn current_value(now: NaiveTime, schedule: &Schedule) -> Option<u8> {
    let points = schedule.points();
    let idx = points.partition_point(|p| p.time <= now);
    if idx == 0 {
        points.last().map(|p| p.value)
    } else {
        Some(points[idx - 1].value)
    }
}

/// Source of the current time of day for the cycle loop.
pub trait Clock: Send + Sync {
    fn time_of_day(&self) -> NaiveTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn time_of_day(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub NaiveTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn time_of_day(&self) -> NaiveTime {
        self.0
    }
}

#[cfg(test)]
pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time of day")
}
