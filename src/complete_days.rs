//! # Complete-Day Accounting
//!
//! Summarizes a user's finished trips into one record per local calendar day.
//!
//! ## Day states
//! - `NoData`: no trip starts on this date
//! - `Incomplete`: trips start on this date and at least one is a missing trip
//! - `Complete`: trips start on this date and none is missing
//!
//! ## Passes
//! 1. Bucket trips by the local date they start on
//! 2. Forward: count consecutive inactive days, resetting on any active day
//! 3. Backward: give every day of an inactive run the run's full length and
//!    flag whether the neighboring days are complete
//! 4. Short inactive runs between two complete days whose boundary points are
//!    close together are treated as a stay at one place and marked complete

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TripError};
use crate::geo_utils::haversine_distance;
use crate::trips::{Trip, TripPoint};

/// Configuration for complete-day accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompleteDaysConfig {
    /// Trips starting on or before this date are treated as clock skew and
    /// never open the participation window. Default: 2010-01-01
    pub participation_floor: NaiveDate,
    /// Largest move between the days around an inactive run that still
    /// counts as staying put. Default: 750.0 meters
    pub inactivity_distance_meters: f64,
    /// Longest inactive run that can be explained. Default: 2 days
    pub max_explained_inactive_days: u32,
}

impl Default for CompleteDaysConfig {
    fn default() -> Self {
        Self {
            participation_floor: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN),
            inactivity_distance_meters: 750.0,
            max_explained_inactive_days: 2,
        }
    }
}

/// Participation state of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    NoData,
    Incomplete,
    Complete,
}

/// Summary of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub timezone: String,
    pub status: DayStatus,
    pub has_trips: bool,
    pub is_complete: bool,
    /// First point of the day's first trip
    pub start_point: Option<TripPoint>,
    /// Last point of the day's last trip
    pub end_point: Option<TripPoint>,
    /// Days in the inactive run so far, as of this date
    pub consecutive_inactive_days: Option<u32>,
    /// Full length of the inactive run containing this date
    pub inactivity_streak: Option<u32>,
    pub before_is_complete: bool,
    pub after_is_complete: bool,
}

/// Build day summaries for a user's trips in the named IANA timezone.
pub fn summarize_complete_days(
    trips: &[Trip],
    timezone: &str,
    config: &CompleteDaysConfig,
) -> Result<Vec<DaySummary>> {
    let tz: Tz = timezone.parse().map_err(|_| TripError::UnknownTimezone {
        name: timezone.to_string(),
    })?;
    Ok(summarize_complete_days_tz(trips, tz, config))
}

/// Build day summaries for a user's trips, localized to `tz`.
///
/// Returns one summary per date from the first trip start after the
/// participation floor to the last trip's end, or nothing when no trip
/// qualifies.
pub fn summarize_complete_days_tz(
    trips: &[Trip],
    tz: Tz,
    config: &CompleteDaysConfig,
) -> Vec<DaySummary> {
    let local_date = |ts: NaiveDateTime| tz.from_utc_datetime(&ts).date_naive();

    let Some(first_trip) = trips
        .iter()
        .find(|t| local_date(t.start().timestamp) > config.participation_floor)
    else {
        return Vec::new();
    };
    let Some(last_trip) = trips.last() else {
        return Vec::new();
    };
    let first_date = local_date(first_trip.start().timestamp);
    let last_date = local_date(last_trip.end().timestamp);
    if last_date < first_date {
        return Vec::new();
    }

    let mut buckets: BTreeMap<NaiveDate, Vec<&Trip>> = BTreeMap::new();
    for trip in trips {
        let date = local_date(trip.start().timestamp);
        if date >= first_date && date <= last_date {
            buckets.entry(date).or_default().push(trip);
        }
    }

    let dates: Vec<NaiveDate> = first_date
        .iter_days()
        .take_while(|d| *d <= last_date)
        .collect();
    let day_trips: Vec<&[&Trip]> = dates
        .iter()
        .map(|d| buckets.get(d).map(Vec::as_slice).unwrap_or(&[]))
        .collect();

    let mut days: Vec<DaySummary> = dates
        .iter()
        .zip(&day_trips)
        .map(|(date, trips)| day_summary(*date, tz, trips))
        .collect();

    count_inactive_days(&mut days);
    mark_inactivity_streaks(&mut days);
    let upgraded = explain_inactivity(&mut days, &day_trips, config);

    debug!(
        "[CompleteDays] {} days from {} to {}, {} inactive days explained",
        days.len(),
        first_date,
        last_date,
        upgraded
    );
    days
}

fn day_summary(date: NaiveDate, tz: Tz, trips: &[&Trip]) -> DaySummary {
    let status = if trips.is_empty() {
        DayStatus::NoData
    } else if trips.iter().any(|t| t.code.is_missing()) {
        DayStatus::Incomplete
    } else {
        DayStatus::Complete
    };
    DaySummary {
        date,
        timezone: tz.name().to_string(),
        status,
        has_trips: !trips.is_empty(),
        is_complete: status == DayStatus::Complete,
        start_point: trips.first().map(|t| t.start().clone()),
        end_point: trips.last().map(|t| t.end().clone()),
        consecutive_inactive_days: None,
        inactivity_streak: None,
        before_is_complete: false,
        after_is_complete: false,
    }
}

/// Forward pass: running count of the currently open inactive run.
fn count_inactive_days(days: &mut [DaySummary]) {
    let mut run = 0u32;
    for day in days.iter_mut() {
        if day.status == DayStatus::NoData {
            run += 1;
            day.consecutive_inactive_days = Some(run);
        } else {
            run = 0;
            day.consecutive_inactive_days = None;
        }
    }
}

/// Backward pass: full run length and neighboring-complete flags.
fn mark_inactivity_streaks(days: &mut [DaySummary]) {
    let statuses: Vec<DayStatus> = days.iter().map(|d| d.status).collect();
    let mut streak: Option<u32> = None;
    for i in (0..days.len()).rev() {
        if statuses[i] == DayStatus::NoData {
            // The run's last day holds its full length
            if streak.is_none() {
                streak = days[i].consecutive_inactive_days;
            }
            days[i].inactivity_streak = streak;
        } else {
            streak = None;
        }
        days[i].before_is_complete = i > 0 && statuses[i - 1] == DayStatus::Complete;
        days[i].after_is_complete = statuses.get(i + 1) == Some(&DayStatus::Complete);
    }
}

/// Mark short inactive runs between nearby complete days as complete.
///
/// The run's preceding complete day is compared by its last point against
/// the second point of the following complete day; the first point after a
/// gap already belongs to the movement being explained. Returns the number
/// of days upgraded.
fn explain_inactivity(
    days: &mut [DaySummary],
    day_trips: &[&[&Trip]],
    config: &CompleteDaysConfig,
) -> usize {
    let mut upgraded = 0;
    let mut i = 0;
    while i < days.len() {
        if days[i].status != DayStatus::NoData {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < days.len() && days[i].status == DayStatus::NoData {
            i += 1;
        }
        let run_end = i; // exclusive
        let run_len = (run_end - run_start) as u32;

        if run_len > config.max_explained_inactive_days
            || run_start == 0
            || run_end >= days.len()
            || days[run_start - 1].status != DayStatus::Complete
            || days[run_end].status != DayStatus::Complete
        {
            continue;
        }

        let Some(prior_end) = days[run_start - 1].end_point.as_ref() else {
            continue;
        };
        let Some(next_second) = day_trips[run_end]
            .iter()
            .flat_map(|t| t.points.iter())
            .nth(1)
        else {
            continue;
        };

        let distance = haversine_distance(&prior_end.coord(), &next_second.coord());
        if distance < config.inactivity_distance_meters {
            for day in &mut days[run_start..run_end] {
                day.is_complete = true;
            }
            upgraded += run_end - run_start;
        }
    }
    upgraded
}
