//! # residency-engine
//!
//! Rolling-window day counting and trip planning for "at most 183 days in any
//! 365-day window" residency rules.
//!
//! The engine is a set of pure functions over an in-memory travel history: it
//! never reads the clock, the filesystem or any global state. Callers pass the
//! history, the reference date and the buffer policy explicitly on every call.
//!
//! ## Modules
//!
//! - [`interval`] — Validated country intervals, planned trips, history audit
//! - [`window`] — Restricted days in the 365-day window ending on a date
//! - [`planner`] — Compliance status, maximum trip search, what-if evaluation
//! - [`error`] — Error types

pub mod error;
pub mod interval;
pub mod planner;
pub mod window;

pub use error::{ResidencyError, Result};
pub use interval::{audit_history, Country, History, HistoryIssue, Interval, PlannedTrip};
pub use planner::{
    current_status, evaluate_alternative, max_trip_duration, recommend_trip, simulate_trip,
    BufferPolicy, ComplianceStatus, TripEvaluation, TripRecommendation, TripSimulation,
    MAX_TRIP_DAYS, RULE_LIMIT,
};
pub use window::{
    days_in_window, location_on, timeline, totals_by_country, CountryTotals, TimelinePoint,
    WINDOW_DAYS,
};
