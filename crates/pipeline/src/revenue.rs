//! Rolling-window revenue aggregation.
//!
//! Combines traffic metrics (turned into an *estimated* affiliate figure by the
//! configured [`EstimationModel`]) with the manually curated ad revenue rows.
//! A window without rows is all zeros.

use serde::Serialize;

use crate::config::EstimationModel;
use crate::{AdRevenueRecord, DateWindow, MetricsRecord, UsdAmount};

/// Revenue figures for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub window: DateWindow,
    pub pageviews: u64,
    pub clicks: u64,
    pub estimated: UsdAmount,
    pub actual: UsdAmount,
    pub total: UsdAmount,
}

impl RevenueSummary {
    /// Click-through rate as a fraction; zero without pageviews.
    pub fn ctr(&self) -> f64 {
        if self.pageviews == 0 {
            0.0
        } else {
            self.clicks as f64 / self.pageviews as f64
        }
    }

    /// Share of `target` reached by the total, as a percentage capped at 999.
    pub fn attainment_percent(&self, target: UsdAmount) -> f64 {
        attainment_percent(self.total, target)
    }
}

/// `value / target` as a percentage, capped at 999. A zero target counts as
/// fully attained.
pub fn attainment_percent(value: UsdAmount, target: UsdAmount) -> f64 {
    if target.is_zero() {
        return 100.0;
    }
    (value.as_f64() / target.as_f64() * 100.0).min(999.0)
}

/// Sums metrics and ad revenue falling inside `window`.
pub fn summarize(
    window: DateWindow,
    metrics: &[MetricsRecord],
    ad_revenue: &[AdRevenueRecord],
    model: EstimationModel,
) -> RevenueSummary {
    let (pageviews, clicks) = metrics
        .iter()
        .filter(|m| window.contains(m.date))
        .fold((0u64, 0u64), |(pv, c), m| {
            (pv.saturating_add(m.pageviews), c.saturating_add(m.clicks))
        });
    let actual: UsdAmount = ad_revenue
        .iter()
        .filter(|r| window.contains(r.date))
        .map(|r| r.adsense_revenue_usd)
        .sum();
    let estimated = model.estimate(clicks);
    RevenueSummary {
        window,
        pageviews,
        clicks,
        estimated,
        actual,
        total: estimated + actual,
    }
}

/// Daily traffic needed to earn `target_daily` under `model`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrafficNeed {
    /// `None` when a click is worth nothing under the model.
    pub clicks_per_day: Option<f64>,
    /// `None` when the click-through rate is unknown (no pageviews yet).
    pub pageviews_per_day: Option<f64>,
}

/// Works back from a daily revenue target to the clicks and pageviews that
/// would reach it at the observed click-through rate.
pub fn traffic_needed(target_daily: UsdAmount, model: EstimationModel, ctr: f64) -> TrafficNeed {
    let per_click = model.value_per_click();
    let clicks_per_day = (per_click > 0.0).then(|| target_daily.as_f64() / per_click);
    let pageviews_per_day = clicks_per_day.and_then(|c| (ctr > 0.0).then(|| c / ctr));
    TrafficNeed {
        clicks_per_day,
        pageviews_per_day,
    }
}
