//! Compliance status and trip planning on top of the rolling-window counter.
//!
//! Every function here is a pure function of the history it is handed. A planned
//! trip is simulated by counting it alongside the history, never by writing it
//! into the history.
//!
//! A restricted trip `[start, start + D - 1]` is feasible only if the window
//! ending on *each* of its days stays within `limit - buffer`. The window ending
//! on trip day `w` never sees trip days after `w`, so a day's usage does not
//! depend on how much longer the trip runs. Extending a trip therefore only adds
//! one new day to check, and the first failing day bounds the maximum duration.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ResidencyError, Result};
use crate::interval::{consecutive_days, Country, Interval, PlannedTrip};
use crate::window::{days_in_window, location_on, restricted_days_in_window, WINDOW_DAYS};

/// Maximum restricted days allowed in any rolling window.
pub const RULE_LIMIT: u32 = 183;

/// Longest trip the planner will recommend.
pub const MAX_TRIP_DAYS: u32 = 365;

/// Safety margin kept below the rule limit when recommending trips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferPolicy {
    pub buffer_days: u32,
}

impl BufferPolicy {
    pub fn new(buffer_days: u32) -> Self {
        Self { buffer_days }
    }

    /// The highest window usage a recommended trip may reach: `limit - buffer_days`.
    ///
    /// # Errors
    /// Returns `ResidencyError::InvalidDateRange` when the buffer swallows the
    /// whole limit, since no trip could ever be recommended.
    pub fn threshold(&self, limit: u32) -> Result<u32> {
        if self.buffer_days >= limit {
            return Err(ResidencyError::InvalidDateRange(format!(
                "buffer of {} days leaves no room under a limit of {limit} days",
                self.buffer_days
            )));
        }
        Ok(limit - self.buffer_days)
    }
}

/// Compliance on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStatus {
    pub date: NaiveDate,
    pub location: Country,
    pub used: u32,
    /// `limit - used`, reported unclamped so a breach shows as negative.
    pub remaining: i64,
    pub limit: u32,
    pub compliant: bool,
}

impl ComplianceStatus {
    /// Whether at least `buffer_days` restricted days are still available.
    pub fn within_buffer(&self, policy: BufferPolicy) -> bool {
        self.remaining >= i64::from(policy.buffer_days)
    }
}

/// Compliance status for the window ending on `today`.
pub fn current_status(history: &[Interval], today: NaiveDate, limit: u32) -> ComplianceStatus {
    let used = days_in_window(history, today);
    ComplianceStatus {
        date: today,
        location: location_on(history, today),
        used,
        remaining: i64::from(limit) - i64::from(used),
        limit,
        compliant: used <= limit,
    }
}

/// Longest safe restricted trip starting on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecommendation {
    pub trip_start: NaiveDate,
    /// Maximum number of trip days; zero when even one day would cross the threshold.
    pub duration: u32,
    /// Last day of the recommended trip, absent when `duration` is zero.
    pub recommended_return: Option<NaiveDate>,
    /// Highest window usage reached during the recommended trip. For a zero-day
    /// result, the usage on `trip_start` without any trip.
    pub peak_usage: u32,
    /// `limit - peak_usage`.
    pub margin_to_limit: i64,
}

/// Find the longest trip from `trip_start` whose every day keeps the window
/// usage at or below `limit - policy.buffer_days`.
///
/// The search stops at the first infeasible day and never looks past
/// [`MAX_TRIP_DAYS`].
///
/// # Errors
/// Returns `ResidencyError::InvalidDateRange` if the buffer is not below the
/// limit, or if the trip's lookback window or search horizon falls outside the
/// representable date range.
pub fn recommend_trip(
    history: &[Interval],
    trip_start: NaiveDate,
    limit: u32,
    policy: BufferPolicy,
) -> Result<TripRecommendation> {
    let threshold = policy.threshold(limit)?;
    check_lookback(trip_start)?;
    // Counting the whole horizon as one trip is exact for every day `w`: trip
    // days after `w` fall outside the window ending on `w`.
    let horizon = PlannedTrip::starting(trip_start, MAX_TRIP_DAYS)?;
    let trip = horizon.as_interval();

    let mut duration = 0;
    let mut peak_usage = None;

    for day in consecutive_days(trip_start, MAX_TRIP_DAYS) {
        let used = usage_with_trip(history, &trip, day);
        if used > threshold {
            tracing::debug!(%trip_start, %day, used, threshold, "trip day crosses threshold");
            break;
        }
        duration += 1;
        peak_usage = peak_usage.max(Some(used));
    }

    let recommended_return = match duration {
        0 => None,
        n => trip_start.checked_add_days(Days::new(u64::from(n) - 1)),
    };
    let peak_usage = peak_usage.unwrap_or_else(|| days_in_window(history, trip_start));

    tracing::debug!(%trip_start, duration, peak_usage, threshold, "trip search finished");

    Ok(TripRecommendation {
        trip_start,
        duration,
        recommended_return,
        peak_usage,
        margin_to_limit: i64::from(limit) - i64::from(peak_usage),
    })
}

/// Maximum number of days a restricted trip starting on `trip_start` can last.
///
/// See [`recommend_trip`] for the search and its errors. A zero result is a
/// normal answer meaning the history is already at the buffered limit.
pub fn max_trip_duration(
    history: &[Interval],
    trip_start: NaiveDate,
    limit: u32,
    policy: BufferPolicy,
) -> Result<u32> {
    recommend_trip(history, trip_start, limit, policy).map(|rec| rec.duration)
}

/// Outcome of a what-if trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripEvaluation {
    pub feasible: bool,
    /// Earliest trip day with the highest window usage.
    pub worst_day: NaiveDate,
    pub worst_day_usage: u32,
    /// `limit - buffer - worst_day_usage`; negative when infeasible.
    pub margin: i64,
}

/// Evaluate a candidate trip against the buffered limit.
///
/// Every day of the candidate is checked on its own window, because the binding
/// day can be anywhere in the trip: old restricted days may still weigh on an
/// early trip day yet have aged out by a later one.
///
/// # Errors
/// Returns `ResidencyError::InvalidDateRange` if the buffer is not below the
/// limit or the candidate's lookback window is not representable.
pub fn evaluate_alternative(
    history: &[Interval],
    candidate: &PlannedTrip,
    limit: u32,
    policy: BufferPolicy,
) -> Result<TripEvaluation> {
    let threshold = policy.threshold(limit)?;
    check_lookback(candidate.start())?;

    let trip = candidate.as_interval();
    let mut worst_day = candidate.start();
    let mut worst_day_usage = 0;

    for day in trip_days(candidate) {
        let used = usage_with_trip(history, &trip, day);
        if used > worst_day_usage {
            worst_day = day;
            worst_day_usage = used;
        }
    }

    let margin = i64::from(threshold) - i64::from(worst_day_usage);
    tracing::debug!(%worst_day, worst_day_usage, margin, "evaluated candidate trip");

    Ok(TripEvaluation {
        feasible: worst_day_usage <= threshold,
        worst_day,
        worst_day_usage,
        margin,
    })
}

/// Window usage on one day of a simulated trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub used: u32,
    pub compliant: bool,
}

/// Day-by-day effect of a trip against the raw limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripSimulation {
    pub trip: PlannedTrip,
    pub daily: Vec<DailyUsage>,
    pub peak_usage: u32,
    pub first_violation: Option<NaiveDate>,
    /// Window usage on the last day of the trip.
    pub usage_on_return: u32,
}

impl TripSimulation {
    pub fn compliant(&self) -> bool {
        self.first_violation.is_none()
    }
}

/// Simulate `trip` on top of `history`, reporting usage for each trip day.
///
/// # Errors
/// Returns `ResidencyError::InvalidDateRange` if the trip's lookback window is
/// not representable.
pub fn simulate_trip(
    history: &[Interval],
    trip: &PlannedTrip,
    limit: u32,
) -> Result<TripSimulation> {
    check_lookback(trip.start())?;

    let interval = trip.as_interval();
    let daily: Vec<DailyUsage> = trip_days(trip)
        .map(|date| {
            let used = usage_with_trip(history, &interval, date);
            DailyUsage {
                date,
                used,
                compliant: used <= limit,
            }
        })
        .collect();

    let peak_usage = daily.iter().map(|day| day.used).max().unwrap_or(0);
    let first_violation = daily.iter().find(|day| !day.compliant).map(|day| day.date);
    let usage_on_return = daily.last().map_or(0, |day| day.used);

    Ok(TripSimulation {
        trip: *trip,
        daily,
        peak_usage,
        first_violation,
        usage_on_return,
    })
}

fn usage_with_trip(history: &[Interval], trip: &Interval, day: NaiveDate) -> u32 {
    restricted_days_in_window(history.iter().chain(std::iter::once(trip)), day)
}

fn trip_days(trip: &PlannedTrip) -> impl Iterator<Item = NaiveDate> {
    consecutive_days(trip.start(), trip.days())
}

fn check_lookback(trip_start: NaiveDate) -> Result<()> {
    trip_start
        .checked_sub_days(Days::new(u64::from(WINDOW_DAYS - 1)))
        .map(|_| ())
        .ok_or_else(|| {
            ResidencyError::InvalidDateRange(format!(
                "the window ending {trip_start} starts before the earliest representable date"
            ))
        })
}
