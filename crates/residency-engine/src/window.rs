//! Rolling-window day counting.
//!
//! The rolling window for a reference date `w` is the inclusive range
//! `[w - 364, w]`: 365 calendar days ending on (and including) `w`. Only days
//! inside restricted-country intervals count; gap days count as zero.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ResidencyError, Result};
use crate::interval::{consecutive_days, inclusive_days, Country, Interval};

/// Length of the rolling window in days.
pub const WINDOW_DAYS: u32 = 365;

/// First day of the rolling window ending on `window_end`.
///
/// Windows reaching before the earliest representable date start there instead.
pub fn window_start(window_end: NaiveDate) -> NaiveDate {
    window_end
        .checked_sub_days(Days::new(u64::from(WINDOW_DAYS - 1)))
        .unwrap_or(NaiveDate::MIN)
}

/// Count restricted-country days in the 365-day window ending on `window_end`.
///
/// Each restricted interval is clipped to the window, so intervals straddling
/// either boundary contribute only their inside days. The history is assumed to
/// hold no overlapping intervals; overlapping restricted days are counted once
/// per interval.
pub fn days_in_window(history: &[Interval], window_end: NaiveDate) -> u32 {
    restricted_days_in_window(history, window_end)
}

pub(crate) fn restricted_days_in_window<'a>(
    intervals: impl IntoIterator<Item = &'a Interval>,
    window_end: NaiveDate,
) -> u32 {
    let from = window_start(window_end);
    intervals
        .into_iter()
        .filter(|interval| interval.is_restricted())
        .map(|interval| interval.days_within(from, window_end))
        .sum()
}

/// Where the history places the person on `date`.
///
/// The earliest-starting interval containing `date` wins; a gap day is
/// [`Country::Other`].
pub fn location_on(history: &[Interval], date: NaiveDate) -> Country {
    history
        .iter()
        .filter(|interval| interval.contains(date))
        .min_by_key(|interval| interval.start())
        .map_or(Country::Other, Interval::country)
}

/// Days recorded per country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryTotals {
    pub restricted: u32,
    pub other: u32,
}

/// Sum interval days per country, optionally clipped to `[from, to]`.
///
/// Only recorded intervals are summed; gap days appear in neither total.
pub fn totals_by_country(
    history: &[Interval],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> CountryTotals {
    let from = from.unwrap_or(NaiveDate::MIN);
    let to = to.unwrap_or(NaiveDate::MAX);

    history
        .iter()
        .fold(CountryTotals::default(), |mut totals, interval| {
            let days = interval.days_within(from, to);
            match interval.country() {
                Country::Restricted => totals.restricted += days,
                Country::Other => totals.other += days,
            }
            totals
        })
}

/// Window usage on a single day of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub location: Country,
    /// Restricted days in the window ending on `date`.
    pub used: u32,
    /// `limit - used`; negative once the limit is exceeded.
    pub remaining: i64,
    pub compliant: bool,
}

/// Evaluate the rolling window for every day in `[from, to]`.
///
/// # Errors
/// Returns `ResidencyError::InvalidDateRange` if `from` is after `to`.
pub fn timeline(
    history: &[Interval],
    from: NaiveDate,
    to: NaiveDate,
    limit: u32,
) -> Result<Vec<TimelinePoint>> {
    if from > to {
        return Err(ResidencyError::InvalidDateRange(format!(
            "timeline start {from} is after its end {to}"
        )));
    }

    let points = consecutive_days(from, inclusive_days(from, to))
        .map(|date| {
            let used = days_in_window(history, date);
            TimelinePoint {
                date,
                location: location_on(history, date),
                used,
                remaining: i64::from(limit) - i64::from(used),
                compliant: used <= limit,
            }
        })
        .collect();

    Ok(points)
}
