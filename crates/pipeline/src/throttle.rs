//! Cost throttle.
//!
//! When the current month's spend exceeds the cap, runs on odd calendar days
//! are skipped. Posting cadence halves instead of stopping, and resumes fully
//! at the next month. A skip is an outcome, not an error.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{CostRecord, MonthlyCap, UsdAmount, YearMonth};

/// Result of [`evaluate`], kept for the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThrottleDecision {
    pub month: YearMonth,
    pub month_total: UsdAmount,
    pub cap: MonthlyCap,
    pub skip: bool,
}

impl ThrottleDecision {
    /// Machine-readable reason recorded when the run is skipped.
    pub const SKIP_REASON: &'static str = "budget_limit_even_day_only";
}

/// Returns `true` on odd days of the month (1st, 3rd, …, 31st).
pub fn is_odd_day(day: NaiveDate) -> bool {
    day.day() % 2 == 1
}

/// Total spend recorded for `month`. Several rows for one month are summed.
pub fn month_total(costs: &[CostRecord], month: YearMonth) -> UsdAmount {
    costs
        .iter()
        .filter(|c| c.month == month)
        .map(|c| c.total_usd)
        .sum()
}

/// Evaluates the throttle for `today`.
pub fn evaluate(today: NaiveDate, costs: &[CostRecord], cap: MonthlyCap) -> ThrottleDecision {
    let month = YearMonth::of(today);
    let total = month_total(costs, month);
    ThrottleDecision {
        month,
        month_total: total,
        cap,
        skip: cap.is_exceeded_by(total) && is_odd_day(today),
    }
}

/// Returns `true` if today's run must be skipped for cost reasons.
pub fn should_skip(today: NaiveDate, costs: &[CostRecord], cap: MonthlyCap) -> bool {
    evaluate(today, costs, cap).skip
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(month: &str, usd: f64) -> CostRecord {
        CostRecord {
            month: YearMonth::parse(month).unwrap(),
            total_usd: UsdAmount::new(usd).unwrap(),
        }
    }

    fn cap() -> MonthlyCap {
        MonthlyCap::new(100.0).unwrap()
    }

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn overspent_month_skips_odd_days_only() {
        let costs = vec![cost("2024-05", 120.0)];
        assert!(should_skip(may(15), &costs, cap()));
        assert!(!should_skip(may(16), &costs, cap()));
        assert!(should_skip(may(31), &costs, cap()));
    }

    #[test]
    fn spend_within_cap_never_skips() {
        let costs = vec![cost("2024-05", 100.0)];
        for day in 1..=31 {
            assert!(!should_skip(may(day), &costs, cap()), "day {day}");
        }
    }

    #[test]
    fn rows_for_the_month_are_summed_and_other_months_ignored() {
        let costs = vec![
            cost("2024-05", 60.0),
            cost("2024-05", 45.0),
            cost("2024-04", 500.0),
        ];
        let decision = evaluate(may(3), &costs, cap());
        assert!(decision.skip);
        assert!((decision.month_total.as_f64() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn previous_month_overspend_does_not_carry_over() {
        let costs = vec![cost("2024-04", 500.0)];
        assert!(!should_skip(may(1), &costs, cap()));
    }

    #[test]
    fn empty_ledger_never_skips() {
        assert!(!should_skip(may(1), &[], cap()));
    }
}
