//! Labeled date intervals and the travel history built from them.
//!
//! An [`Interval`] is validated when it is constructed (or deserialized), so every
//! interval that exists in memory satisfies `start <= end`. A [`History`] keeps its
//! intervals ordered by start date. Days no interval covers are gap days and are
//! attributed to [`Country::Other`] by every counting operation.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ResidencyError, Result};

/// Which side of the residency rule a day falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    /// The country whose days are capped by the rolling-window rule.
    Restricted,
    /// Anywhere else, including days not covered by any interval.
    Other,
}

/// An inclusive `[start, end]` stay in one country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    country: Country,
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawInterval {
    country: Country,
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawInterval> for Interval {
    type Error = ResidencyError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        Interval::new(raw.country, raw.start, raw.end)
    }
}

impl Interval {
    /// Build an interval, rejecting `start > end` with
    /// [`ResidencyError::InvalidInterval`].
    pub fn new(country: Country, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ResidencyError::InvalidInterval { start, end });
        }
        Ok(Self {
            country,
            start,
            end,
        })
    }

    pub fn country(&self) -> Country {
        self.country
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn is_restricted(&self) -> bool {
        self.country == Country::Restricted
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> u32 {
        inclusive_days(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Days of this interval that fall inside `[from, to]`.
    ///
    /// Partial overlaps on either side are clipped; an interval entirely
    /// outside the range contributes zero.
    pub fn days_within(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        let start = self.start.max(from);
        let end = self.end.min(to);
        if start <= end {
            inclusive_days(start, end)
        } else {
            0
        }
    }
}

/// A hypothetical restricted-country trip used for what-if planning.
///
/// A planned trip never becomes part of a [`History`] unless the caller passes
/// it to [`History::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrip")]
pub struct PlannedTrip {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawTrip {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawTrip> for PlannedTrip {
    type Error = ResidencyError;

    fn try_from(raw: RawTrip) -> Result<Self> {
        PlannedTrip::new(raw.start, raw.end)
    }
}

impl PlannedTrip {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ResidencyError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// A trip of `days` days starting on `start` (so ending on `start + days - 1`).
    pub fn starting(start: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(ResidencyError::InvalidDateRange(format!(
                "trip starting {start} must last at least one day"
            )));
        }
        let end = start
            .checked_add_days(Days::new(u64::from(days) - 1))
            .ok_or_else(|| {
                ResidencyError::InvalidDateRange(format!(
                    "a {days}-day trip from {start} ends past the latest representable date"
                ))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> u32 {
        inclusive_days(self.start, self.end)
    }

    /// The trip as a restricted-country interval.
    pub fn as_interval(&self) -> Interval {
        Interval {
            country: Country::Restricted,
            start: self.start,
            end: self.end,
        }
    }
}

/// Travel history ordered by interval start date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct History {
    intervals: Vec<Interval>,
}

impl History {
    /// Build a history, sorting the intervals by start date.
    ///
    /// Intervals sharing a start date keep their input order.
    pub fn new(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by_key(Interval::start);
        Self { intervals }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Record a planned trip as a restricted interval, keeping start order.
    pub fn commit(&mut self, trip: PlannedTrip) {
        let interval = trip.as_interval();
        let at = self
            .intervals
            .partition_point(|existing| existing.start <= interval.start);
        self.intervals.insert(at, interval);
    }
}

impl std::ops::Deref for History {
    type Target = [Interval];

    fn deref(&self) -> &[Interval] {
        &self.intervals
    }
}

impl From<Vec<Interval>> for History {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::new(intervals)
    }
}

impl From<History> for Vec<Interval> {
    fn from(history: History) -> Self {
        history.intervals
    }
}

impl FromIterator<Interval> for History {
    fn from_iter<I: IntoIterator<Item = Interval>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A consistency problem between intervals of a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryIssue {
    /// Calendar days `[from, to]` are covered by no interval.
    Gap {
        from: NaiveDate,
        to: NaiveDate,
        days: u32,
    },
    /// Two intervals claim the same `days` calendar days.
    Overlap {
        first: Interval,
        second: Interval,
        days: u32,
    },
}

/// Report gaps and overlaps in a history.
///
/// Intervals are examined in start order against the furthest-reaching interval
/// seen so far, so an interval nested inside a long one is still reported. The
/// audit is advisory: counting operations apply the gap policy regardless.
pub fn audit_history(history: &[Interval]) -> Vec<HistoryIssue> {
    let mut sorted: Vec<&Interval> = history.iter().collect();
    sorted.sort_by_key(|interval| interval.start);

    let mut issues = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(mut reach) = iter.next() else {
        return issues;
    };

    for next in iter {
        if next.start <= reach.end {
            issues.push(HistoryIssue::Overlap {
                first: *reach,
                second: *next,
                days: next.days_within(reach.start, reach.end),
            });
        } else if let Some(after_reach) = reach.end.succ_opt() {
            if next.start > after_reach {
                // `next.start` is after `after_reach`, so it has a predecessor.
                let to = next.start.pred_opt().unwrap_or(next.start);
                issues.push(HistoryIssue::Gap {
                    from: after_reach,
                    to,
                    days: inclusive_days(after_reach, to),
                });
            }
        }

        if next.end > reach.end {
            reach = next;
        }
    }

    issues
}

/// `count` consecutive calendar days starting on `start`.
///
/// `NaiveDate::iter_days` never yields `NaiveDate::MAX`; this does when the range
/// ends there.
pub(crate) fn consecutive_days(start: NaiveDate, count: u32) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), NaiveDate::succ_opt).take(count as usize)
}

pub(crate) fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}
