//! Tests for compliance status and trip planning.

use chrono::{Days, NaiveDate};
use residency_engine::{
    current_status, evaluate_alternative, max_trip_duration, recommend_trip, simulate_trip,
    BufferPolicy, Country, History, Interval, PlannedTrip, ResidencyError, MAX_TRIP_DAYS,
    RULE_LIMIT,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn restricted(start: &str, end: &str) -> Interval {
    Interval::new(Country::Restricted, date(start), date(end)).unwrap()
}

fn other(start: &str, end: &str) -> Interval {
    Interval::new(Country::Other, date(start), date(end)).unwrap()
}

fn trip(start: &str, end: &str) -> PlannedTrip {
    PlannedTrip::new(date(start), date(end)).unwrap()
}

/// One restricted stay of 166 days: 2025-01-01..=2025-06-15.
fn spring_stay() -> Vec<Interval> {
    vec![restricted("2025-01-01", "2025-06-15")]
}

// ── current_status ──────────────────────────────────────────────────────────

#[test]
fn status_within_limit() {
    let status = current_status(&spring_stay(), date("2025-06-16"), RULE_LIMIT);

    assert_eq!(status.used, 166);
    assert_eq!(status.remaining, 17);
    assert!(status.compliant);
    assert_eq!(status.limit, 183);
    assert_eq!(status.date, date("2025-06-16"));
    assert_eq!(status.location, Country::Other);
}

#[test]
fn status_reports_current_location() {
    let status = current_status(&spring_stay(), date("2025-06-15"), RULE_LIMIT);
    assert_eq!(status.location, Country::Restricted);
    assert_eq!(status.used, 166);
}

#[test]
fn status_exactly_at_limit_is_compliant() {
    let history = vec![restricted("2025-01-01", "2025-07-02")];
    let status = current_status(&history, date("2025-07-02"), RULE_LIMIT);
    assert_eq!(status.used, 183);
    assert_eq!(status.remaining, 0);
    assert!(status.compliant);
}

#[test]
fn status_in_breach_reports_negative_remaining() {
    let history = vec![restricted("2025-01-01", "2025-07-12")];
    let status = current_status(&history, date("2025-07-12"), RULE_LIMIT);
    assert_eq!(status.used, 193);
    assert_eq!(status.remaining, -10);
    assert!(!status.compliant);
}

#[test]
fn status_below_buffer_is_still_compliant() {
    let status = current_status(&spring_stay(), date("2025-06-16"), RULE_LIMIT);
    assert!(status.within_buffer(BufferPolicy::new(17)));
    assert!(!status.within_buffer(BufferPolicy::new(18)));
    assert!(status.compliant);
}

// ── max_trip_duration ───────────────────────────────────────────────────────

#[test]
fn max_trip_checks_every_day_against_buffered_limit() {
    // Window on 2025-12-20 starts 2024-12-21, so the whole spring stay still
    // counts: 166 + 1 = 167 on day one, 171 on day five, 172 on day six.
    let policy = BufferPolicy::new(12);
    let duration =
        max_trip_duration(&spring_stay(), date("2025-12-20"), RULE_LIMIT, policy).unwrap();
    assert_eq!(duration, 5);

    let rec = recommend_trip(&spring_stay(), date("2025-12-20"), RULE_LIMIT, policy).unwrap();
    assert_eq!(rec.recommended_return, Some(date("2025-12-24")));
    assert_eq!(rec.peak_usage, 171);
    assert_eq!(rec.margin_to_limit, 12);
}

#[test]
fn max_trip_benefits_from_old_days_aging_out() {
    // 181 restricted days in the first half of 2025. Starting 2025-12-31 each trip
    // day adds one while one old day leaves the window, so usage holds at 182
    // until the old stay is gone, then the trip alone grows to the limit.
    let history = vec![
        restricted("2025-01-01", "2025-06-30"),
        other("2025-07-01", "2025-12-30"),
    ];
    let start = date("2025-12-31");

    let status = current_status(&history, start, RULE_LIMIT);
    assert_eq!(status.remaining, 2);

    let rec = recommend_trip(&history, start, RULE_LIMIT, BufferPolicy::new(0)).unwrap();
    assert_eq!(rec.duration, 183);
    assert_eq!(rec.recommended_return, Some(date("2026-07-01")));
    assert_eq!(rec.peak_usage, 183);
    assert_eq!(rec.margin_to_limit, 0);
}

#[test]
fn max_trip_with_empty_history_is_limit_minus_buffer() {
    let start = date("2026-03-01");
    assert_eq!(
        max_trip_duration(&[], start, RULE_LIMIT, BufferPolicy::new(12)).unwrap(),
        171
    );
    assert_eq!(
        max_trip_duration(&[], start, RULE_LIMIT, BufferPolicy::new(0)).unwrap(),
        183
    );
}

#[test]
fn max_trip_is_capped_at_a_year() {
    let duration = max_trip_duration(&[], date("2026-03-01"), 400, BufferPolicy::new(0)).unwrap();
    assert_eq!(duration, MAX_TRIP_DAYS);
}

#[test]
fn max_trip_is_zero_when_already_at_buffered_limit() {
    let history = vec![restricted("2025-01-01", "2025-12-31")];
    let start = date("2026-01-01");

    let rec = recommend_trip(&history, start, RULE_LIMIT, BufferPolicy::new(12)).unwrap();
    assert_eq!(rec.duration, 0);
    assert_eq!(rec.recommended_return, None);
    assert_eq!(rec.peak_usage, 364);
    assert_eq!(rec.margin_to_limit, 183 - 364);

    let duration = max_trip_duration(&history, start, RULE_LIMIT, BufferPolicy::new(12));
    assert_eq!(duration, Ok(0));
}

#[test]
fn buffer_equal_to_limit_is_invalid_date_range() {
    let policy = BufferPolicy::new(183);
    let err = max_trip_duration(&spring_stay(), date("2025-12-20"), 183, policy).unwrap_err();
    assert!(matches!(err, ResidencyError::InvalidDateRange(_)));
}

#[test]
fn buffer_above_limit_is_invalid_date_range() {
    let err = max_trip_duration(&[], date("2025-12-20"), 183, BufferPolicy::new(200)).unwrap_err();
    assert!(matches!(err, ResidencyError::InvalidDateRange(_)));
}

#[test]
fn trip_start_without_representable_lookback_is_rejected() {
    let policy = BufferPolicy::new(12);
    let err = max_trip_duration(&[], NaiveDate::MIN, RULE_LIMIT, policy).unwrap_err();
    assert!(matches!(err, ResidencyError::InvalidDateRange(_)));
}

#[test]
fn trip_start_without_representable_horizon_is_rejected() {
    let policy = BufferPolicy::new(12);
    let err = max_trip_duration(&[], NaiveDate::MAX, RULE_LIMIT, policy).unwrap_err();
    assert!(matches!(err, ResidencyError::InvalidDateRange(_)));
}

#[test]
fn search_horizon_may_end_on_latest_date() {
    let trip_start = NaiveDate::MAX.checked_sub_days(Days::new(364)).unwrap();
    let rec = recommend_trip(&[], trip_start, 400, BufferPolicy::new(0)).unwrap();

    assert_eq!(rec.duration, MAX_TRIP_DAYS);
    assert_eq!(rec.recommended_return, Some(NaiveDate::MAX));
    assert_eq!(rec.peak_usage, 365);
}

#[test]
fn planning_does_not_touch_the_history() {
    let history = History::new(spring_stay());
    let snapshot = history.clone();

    let policy = BufferPolicy::new(12);
    recommend_trip(&history, date("2025-12-20"), RULE_LIMIT, policy).unwrap();
    evaluate_alternative(&history, &trip("2025-12-20", "2026-01-10"), RULE_LIMIT, policy).unwrap();

    assert_eq!(history, snapshot);
}

// ── evaluate_alternative ────────────────────────────────────────────────────

#[test]
fn worst_day_can_fall_mid_trip() {
    // 90 restricted days in Q1 2025. Usage climbs until 2025-12-31, when the
    // window starts on 2025-01-01, then holds as Q1 days age out one per day.
    let history = vec![restricted("2025-01-01", "2025-03-31")];
    let candidate = trip("2025-12-20", "2026-02-28");

    let policy = BufferPolicy::new(12);
    let eval = evaluate_alternative(&history, &candidate, RULE_LIMIT, policy).unwrap();

    assert!(eval.feasible);
    assert_eq!(eval.worst_day, date("2025-12-31"));
    assert_eq!(eval.worst_day_usage, 102);
    assert_eq!(eval.margin, 69);
}

#[test]
fn infeasible_candidate_reports_negative_margin() {
    let eval = evaluate_alternative(
        &spring_stay(),
        &trip("2025-12-20", "2025-12-31"),
        RULE_LIMIT,
        BufferPolicy::new(12),
    )
    .unwrap();

    assert!(!eval.feasible);
    assert_eq!(eval.worst_day, date("2025-12-31"));
    assert_eq!(eval.worst_day_usage, 178);
    assert_eq!(eval.margin, -7);
}

#[test]
fn evaluation_agrees_with_max_trip_duration() {
    let policy = BufferPolicy::new(12);
    let start = date("2025-12-20");
    let max = max_trip_duration(&spring_stay(), start, RULE_LIMIT, policy).unwrap();

    let longest = PlannedTrip::starting(start, max).unwrap();
    let one_more = PlannedTrip::starting(start, max + 1).unwrap();

    let ok = evaluate_alternative(&spring_stay(), &longest, RULE_LIMIT, policy).unwrap();
    let too_long = evaluate_alternative(&spring_stay(), &one_more, RULE_LIMIT, policy).unwrap();

    assert!(ok.feasible);
    assert_eq!(ok.margin, 0);
    assert!(!too_long.feasible);
    assert_eq!(too_long.worst_day_usage, 172);
}

#[test]
fn evaluation_rejects_impossible_buffer() {
    let candidate = trip("2026-01-01", "2026-01-05");
    let err = evaluate_alternative(&[], &candidate, 10, BufferPolicy::new(10)).unwrap_err();
    assert!(matches!(err, ResidencyError::InvalidDateRange(_)));
}

// ── simulate_trip ───────────────────────────────────────────────────────────

#[test]
fn simulation_tracks_each_day() {
    let sim = simulate_trip(&spring_stay(), &trip("2025-12-20", "2026-01-08"), RULE_LIMIT).unwrap();

    assert_eq!(sim.daily.len(), 20);
    assert_eq!(sim.daily[0].date, date("2025-12-20"));
    assert_eq!(sim.daily[0].used, 167);
    assert_eq!(sim.peak_usage, 178);
    assert_eq!(sim.usage_on_return, 178);
    assert_eq!(sim.first_violation, None);
    assert!(sim.compliant());
}

#[test]
fn simulation_finds_first_violation() {
    let history = vec![restricted("2025-01-01", "2025-06-30")];
    let sim = simulate_trip(&history, &trip("2025-07-01", "2025-07-05"), RULE_LIMIT).unwrap();

    assert_eq!(sim.daily[0].used, 182);
    assert_eq!(sim.daily[1].used, 183);
    assert!(sim.daily[1].compliant);
    assert_eq!(sim.first_violation, Some(date("2025-07-03")));
    assert_eq!(sim.peak_usage, 186);
    assert_eq!(sim.usage_on_return, 186);
    assert!(!sim.compliant());
}

#[test]
fn trip_ending_on_latest_date_checks_every_day() {
    let start = NaiveDate::MAX.checked_sub_days(Days::new(2)).unwrap();
    let last_trip = PlannedTrip::new(start, NaiveDate::MAX).unwrap();

    let sim = simulate_trip(&[], &last_trip, RULE_LIMIT).unwrap();
    assert_eq!(sim.daily.len(), 3);
    assert_eq!(sim.daily[2].date, NaiveDate::MAX);
    assert_eq!(sim.usage_on_return, 3);

    let eval = evaluate_alternative(&[], &last_trip, RULE_LIMIT, BufferPolicy::new(0)).unwrap();
    assert_eq!(eval.worst_day, NaiveDate::MAX);
    assert_eq!(eval.worst_day_usage, 3);
}
