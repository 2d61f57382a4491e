//! Shared value types for the affipress domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. amounts are finite and non-negative,
//! windows are inclusive and non-empty) and participate in domain computations.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A monetary amount in US dollars.
///
/// Used for monthly spend, ad revenue, and estimated affiliate revenue.
/// Callers are responsible for rounding to display precision; [`Display`]
/// renders two decimals.
///
/// [`Display`]: std::fmt::Display
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct UsdAmount(f64);

impl UsdAmount {
    /// Creates a [`UsdAmount`] from a raw float value.
    ///
    /// Returns `None` if `value` is negative, infinite, or NaN.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates a [`UsdAmount`] of exactly zero.
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Returns the underlying `f64` value.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns `true` if this amount is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl std::fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::ops::Add for UsdAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for UsdAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for UsdAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, v| acc + v)
    }
}

// ---------------------------------------------------------------------------

/// Maximum spend permitted for one calendar month before the cost throttle
/// engages.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MonthlyCap(f64);

impl MonthlyCap {
    /// Creates a [`MonthlyCap`] (USD).
    ///
    /// Returns `None` if `limit` is not strictly positive, infinite, or NaN.
    #[must_use]
    pub fn new(limit: f64) -> Option<Self> {
        if limit.is_finite() && limit > 0.0 {
            Some(Self(limit))
        } else {
            None
        }
    }

    /// Returns the cap as a `f64` (USD).
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns `true` if `spent` is strictly greater than this cap.
    ///
    /// Spending exactly the cap does not count as an overrun.
    pub fn is_exceeded_by(self, spent: UsdAmount) -> bool {
        spent.as_f64() > self.0
    }
}

impl std::fmt::Display for MonthlyCap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// A calendar month, written `YYYY-MM` in the cost ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a [`YearMonth`], returning `None` if `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `day`.
    pub fn of(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    /// Parses `YYYY-MM` (surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ---------------------------------------------------------------------------

/// An inclusive range of calendar days `[start, end]`.
///
/// Rolling report windows are built with [`DateWindow::ending`], so a 7-day
/// window ending on the 10th covers the 4th through the 10th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days`-long window whose last day is `end`. `days` of zero is
    /// treated as one.
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        let start = end - chrono::Duration::days(span);
        Self { start, end }
    }

    /// Returns `true` if `day` falls inside the window (both ends inclusive).
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days covered by the window.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Identifies one of the five ledgers (plus the persisted article set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Tools,
    Keywords,
    Costs,
    AdRevenue,
    Metrics,
}

impl LedgerKind {
    /// Returns the ledger name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Keywords => "keywords",
            Self::Costs => "costs",
            Self::AdRevenue => "ad_revenue",
            Self::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// A malformed ledger row that was skipped during parsing.
///
/// Diagnostics are accumulated next to the rows that did parse; business
/// logic only ever sees the valid rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Ledger the row belongs to.
    pub ledger: LedgerKind,

    /// 1-based physical line of the row (the header is line 1).
    ///
    /// `None` when the problem is not tied to one row.
    pub line: Option<usize>,

    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} line {}: {}", self.ledger, line, self.message),
            None => write!(f, "{}: {}", self.ledger, self.message),
        }
    }
}

/// Typed rows parsed from a ledger plus the diagnostics for rows that were
/// rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Parsed<T> {
    /// A parse result with rows and no diagnostics.
    pub fn clean(rows: Vec<T>) -> Self {
        Self {
            rows,
            diagnostics: Vec::new(),
        }
    }

    /// Returns `true` if every row parsed.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self::clean(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn usd_amount_rejects_negative_and_nan() {
        assert!(UsdAmount::new(-0.01).is_none());
        assert!(UsdAmount::new(f64::NAN).is_none());
        assert_eq!(UsdAmount::new(1.5).unwrap().to_string(), "$1.50");
    }

    #[test]
    fn cap_is_exceeded_only_strictly_above() {
        let cap = MonthlyCap::new(100.0).unwrap();
        assert!(!cap.is_exceeded_by(UsdAmount::new(100.0).unwrap()));
        assert!(cap.is_exceeded_by(UsdAmount::new(100.01).unwrap()));
        assert!(MonthlyCap::new(0.0).is_none());
    }

    #[test]
    fn year_month_parses_ledger_format() {
        let ym = YearMonth::parse("2024-03").unwrap();
        assert_eq!(ym, YearMonth::of(day(2024, 3, 31)));
        assert_eq!(ym.to_string(), "2024-03");
        assert!(YearMonth::parse("2024-13").is_none());
        assert!(YearMonth::parse("march").is_none());
    }

    #[test]
    fn window_is_inclusive() {
        let w = DateWindow::ending(day(2024, 5, 10), 7);
        assert_eq!(w.start, day(2024, 5, 4));
        assert_eq!(w.days(), 7);
        assert!(w.contains(day(2024, 5, 4)));
        assert!(w.contains(day(2024, 5, 10)));
        assert!(!w.contains(day(2024, 5, 3)));
        assert!(!w.contains(day(2024, 5, 11)));
    }
}
