//! The monetization and setup aggregator.
//!
//! Every computation here is read-only over the ledgers. Missing data never
//! drops a period from a report: an unavailable metrics source or an unreadable
//! ad-revenue ledger contributes zeros and a warning.
//!
//! | Operation | Window |
//! |-----------|--------|
//! | [`MonetizationRun::dashboard`] | 7 and 28 days ending today |
//! | [`MonetizationRun::weekly`] | 7 days ending yesterday |
//! | [`MonetizationRun::audit`] | 28 days ending today |
//! | [`MonetizationRun::checklist`] | none |

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use pipeline::links;
use pipeline::revenue::{self, attainment_percent, traffic_needed};
use pipeline::setup;
use pipeline::{
    AdRevenueRecord, DateWindow, LedgerStore, MetricsRecord, MetricsSource, PipelineError,
    Reachability, ReachabilityProbe, RevenueSummary, RunId, SetupScore, SiteInspector,
    SystemConfig, ToolStatus, TrafficNeed, UsdAmount,
};

pub const SHORT_WINDOW_DAYS: u32 = 7;
pub const LONG_WINDOW_DAYS: u32 = 28;

// ---------------------------------------------------------------------------
// Report values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub run_id: RunId,
    pub generated_on: NaiveDate,
    pub base_url: String,
    pub target_daily_usd: UsdAmount,
    /// 7-day total against `target_daily_usd × 7`, in percent.
    pub progress_percent: f64,
    pub short: RevenueSummary,
    pub long: RevenueSummary,
    pub monetizable_tools: usize,
    pub total_tools: usize,
    pub setup: SetupScore,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReport {
    pub run_id: RunId,
    pub iso_year: i32,
    pub iso_week: u32,
    pub summary: RevenueSummary,
    pub target_usd: UsdAmount,
    pub attainment_percent: f64,
    pub target_reached: bool,
    pub warnings: Vec<String>,
}

impl WeeklyReport {
    /// `weekly-2024-20.md`.
    pub fn file_name(&self) -> String {
        format!("weekly-{}-{:02}.md", self.iso_year, self.iso_week)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistReport {
    pub run_id: RunId,
    pub generated_on: NaiveDate,
    pub base_url: String,
    pub live_checked: bool,
    pub setup: SetupScore,
}

/// A tool whose CTA currently points at its official page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingTool {
    pub name: String,
    pub status: ToolStatus,
    pub affiliate_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub run_id: RunId,
    pub window_days: u32,
    pub ready_tools: Vec<String>,
    pub pending_tools: Vec<PendingTool>,
    pub recent: RevenueSummary,
    /// Click-through rate in percent.
    pub recent_ctr_percent: f64,
    pub target_daily_usd: UsdAmount,
    pub needed: TrafficNeed,
    pub actions: Vec<String>,
    pub warnings: Vec<String>,
}

/// Outcome of validating the ad-revenue ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueValidation {
    pub valid_rows: usize,
    pub total_usd: UsdAmount,
    pub rejected: Vec<String>,
}

impl RevenueValidation {
    pub fn is_valid(&self) -> bool {
        self.rejected.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Dependencies of the aggregator. `probe` is `None` when live checks are
/// disabled.
pub struct MonetizationRun<'a> {
    config: &'a SystemConfig,
    store: &'a dyn LedgerStore,
    metrics: &'a dyn MetricsSource,
    inspector: &'a dyn SiteInspector,
    probe: Option<&'a dyn ReachabilityProbe>,
}

impl<'a> MonetizationRun<'a> {
    pub fn new(
        config: &'a SystemConfig,
        store: &'a dyn LedgerStore,
        metrics: &'a dyn MetricsSource,
        inspector: &'a dyn SiteInspector,
    ) -> Self {
        Self {
            config,
            store,
            metrics,
            inspector,
            probe: None,
        }
    }

    pub fn with_probe(mut self, probe: Option<&'a dyn ReachabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub async fn dashboard(&self, today: NaiveDate) -> Result<Dashboard, PipelineError> {
        let run_id = RunId::new_random();
        let span = info_span!("dashboard", %run_id, %today);
        async {
            let mut warnings = Vec::new();
            let long_window = DateWindow::ending(today, LONG_WINDOW_DAYS);
            let (metrics, ad_revenue) = self.inputs(long_window, &mut warnings).await;
            let model = self.config.revenue.model;
            let short = revenue::summarize(
                DateWindow::ending(today, SHORT_WINDOW_DAYS),
                &metrics,
                &ad_revenue,
                model,
            );
            let long = revenue::summarize(long_window, &metrics, &ad_revenue, model);

            let setup = self.setup_score().await?;
            let (monetizable_tools, total_tools) = self.tool_counts(&mut warnings);
            let target = self.config.revenue.target_daily_usd;
            let weekly_target =
                UsdAmount::new(target.as_f64() * f64::from(SHORT_WINDOW_DAYS)).unwrap_or_default();

            info!(
                passed = setup.passed(),
                total = setup.total(),
                short_total = %short.total,
                "Dashboard computed"
            );
            Ok::<_, PipelineError>(Dashboard {
                run_id,
                generated_on: today,
                base_url: self.config.site.base_url.clone(),
                target_daily_usd: target,
                progress_percent: attainment_percent(short.total, weekly_target),
                short,
                long,
                monetizable_tools,
                total_tools,
                setup,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    /// Report for the seven days ending the day before `today`.
    pub async fn weekly(&self, today: NaiveDate) -> Result<WeeklyReport, PipelineError> {
        let run_id = RunId::new_random();
        let end = today - Duration::days(1);
        let span = info_span!("weekly_report", %run_id, %end);
        async {
            let mut warnings = Vec::new();
            let window = DateWindow::ending(end, SHORT_WINDOW_DAYS);
            let (metrics, ad_revenue) = self.inputs(window, &mut warnings).await;
            let summary = revenue::summarize(window, &metrics, &ad_revenue, self.config.revenue.model);
            let target_usd = UsdAmount::new(
                self.config.revenue.target_daily_usd.as_f64() * f64::from(SHORT_WINDOW_DAYS),
            )
            .unwrap_or_default();
            let iso = end.iso_week();

            info!(total = %summary.total, target = %target_usd, "Weekly report computed");
            Ok::<_, PipelineError>(WeeklyReport {
                run_id,
                iso_year: iso.year(),
                iso_week: iso.week(),
                attainment_percent: summary.attainment_percent(target_usd),
                target_reached: summary.total.as_f64() >= target_usd.as_f64(),
                summary,
                target_usd,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn checklist(&self, today: NaiveDate) -> Result<ChecklistReport, PipelineError> {
        let run_id = RunId::new_random();
        let span = info_span!("checklist", %run_id);
        async {
            let setup = self.setup_score().await?;
            info!(passed = setup.passed(), total = setup.total(), "Checklist scored");
            Ok::<_, PipelineError>(ChecklistReport {
                run_id,
                generated_on: today,
                base_url: self.config.site.base_url.clone(),
                live_checked: self.probe.is_some(),
                setup,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn audit(&self, today: NaiveDate) -> Result<AuditReport, PipelineError> {
        let run_id = RunId::new_random();
        let span = info_span!("monetization_audit", %run_id, %today);
        async {
            let mut warnings = Vec::new();
            let tools = self.store.load_tools()?;
            for d in &tools.diagnostics {
                warnings.push(d.to_string());
            }
            let (ready, pending): (Vec<_>, Vec<_>) =
                tools.rows.iter().partition(|t| links::is_monetizable(t));

            let window = DateWindow::ending(today, LONG_WINDOW_DAYS);
            let (metrics, _) = self.inputs(window, &mut warnings).await;
            let model = self.config.revenue.model;
            let recent = revenue::summarize(window, &metrics, &[], model);
            let target = self.config.revenue.target_daily_usd;

            let mut actions = Vec::new();
            if !pending.is_empty() {
                actions.push("Replace placeholder affiliate_url values in the tool ledger with real links".to_string());
                actions.push("Set the status of approved programs to approved or active".to_string());
            }
            actions.push("Run the daily publish job every day to grow the article count".to_string());

            Ok::<_, PipelineError>(AuditReport {
                run_id,
                window_days: LONG_WINDOW_DAYS,
                ready_tools: ready.iter().map(|t| t.name.clone()).collect(),
                pending_tools: pending
                    .iter()
                    .map(|t| PendingTool {
                        name: t.name.clone(),
                        status: t.status,
                        affiliate_url: t.affiliate_url.clone().unwrap_or_default(),
                    })
                    .collect(),
                recent_ctr_percent: recent.ctr() * 100.0,
                needed: traffic_needed(target, model, recent.ctr()),
                recent,
                target_daily_usd: target,
                actions,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    /// Checks every ad-revenue row. Unlike the reports, a ledger that cannot
    /// be read at all is an error here.
    pub fn validate_ad_revenue(&self) -> Result<RevenueValidation, PipelineError> {
        let parsed = self.store.load_ad_revenue()?;
        let rejected: Vec<String> = parsed.diagnostics.iter().map(ToString::to_string).collect();
        for d in &parsed.diagnostics {
            warn!(line = ?d.line, "Rejected ad revenue row: {}", d.message);
        }
        Ok(RevenueValidation {
            valid_rows: parsed.rows.len(),
            total_usd: parsed.rows.iter().map(|r| r.adsense_revenue_usd).sum(),
            rejected,
        })
    }

    // -----------------------------------------------------------------------

    /// Metrics and ad revenue for `window`; each source degrades to empty.
    async fn inputs(
        &self,
        window: DateWindow,
        warnings: &mut Vec<String>,
    ) -> (Vec<MetricsRecord>, Vec<AdRevenueRecord>) {
        let metrics = match self.metrics.metrics(window).await {
            Ok(parsed) => {
                warnings.extend(parsed.diagnostics.iter().map(ToString::to_string));
                parsed.rows
            }
            Err(err) => {
                warn!(error = %err, "Metrics unavailable; reporting zero traffic");
                warnings.push(format!("metrics unavailable: {err}"));
                Vec::new()
            }
        };
        let ad_revenue = match self.store.load_ad_revenue() {
            Ok(parsed) => {
                warnings.extend(parsed.diagnostics.iter().map(ToString::to_string));
                parsed.rows
            }
            Err(err) => {
                warn!(error = %err, "Ad revenue ledger unreadable; reporting zero revenue");
                warnings.push(format!("ad revenue unavailable: {err}"));
                Vec::new()
            }
        };
        (metrics, ad_revenue)
    }

    fn tool_counts(&self, warnings: &mut Vec<String>) -> (usize, usize) {
        match self.store.load_tools() {
            Ok(parsed) => (
                parsed.rows.iter().filter(|t| links::is_monetizable(t)).count(),
                parsed.rows.len(),
            ),
            Err(err) => {
                warnings.push(format!("tools unavailable: {err}"));
                (0, 0)
            }
        }
    }

    async fn setup_score(&self) -> Result<SetupScore, PipelineError> {
        let base_url = &self.config.site.base_url;
        let snapshot = self.inspector.snapshot(base_url)?;
        let reachability = match self.probe {
            Some(probe) => {
                let sitemap = format!("{base_url}/sitemap.xml");
                let robots = format!("{base_url}/robots.txt");
                let (site, sitemap, robots) = tokio::join!(
                    probe.check(base_url),
                    probe.check(&sitemap),
                    probe.check(&robots)
                );
                Some(Reachability {
                    site,
                    sitemap,
                    robots,
                })
            }
            None => None,
        };
        Ok(setup::score(&snapshot, reachability.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{empty_snapshot, FakeInspector, FakeMetrics, FakeProbe, FakeStore};
    use pipeline::{Diagnostic, LedgerKind, RawConfig, ToolId, ToolRecord};

    fn config() -> SystemConfig {
        let yaml = r#"
site: { base_url: "https://auto.example-site.dev" }
content: { posts_per_run: 1 }
affiliate: { disclosure_text: "Contains affiliate links." }
cost: { max_monthly_usd: 100 }
revenue: { epc_usd: 0.05, target_daily_usd: 1.0 }
"#;
        serde_yaml::from_str::<RawConfig>(yaml)
            .unwrap()
            .validate()
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn metric(d: u32, pageviews: u64, clicks: u64) -> MetricsRecord {
        MetricsRecord {
            date: day(d),
            pageviews,
            clicks,
        }
    }

    fn ad(d: u32, usd: f64) -> AdRevenueRecord {
        AdRevenueRecord {
            date: day(d),
            adsense_revenue_usd: UsdAmount::new(usd).unwrap(),
            source: "adsense".to_string(),
            note: String::new(),
        }
    }

    fn tool(name: &str, status: ToolStatus, affiliate: Option<&str>) -> ToolRecord {
        ToolRecord {
            id: ToolId::new(name.to_lowercase()).unwrap(),
            name: name.to_string(),
            category: None,
            status,
            official_url: format!("https://{}.test", name.to_lowercase()),
            affiliate_url: affiliate.map(str::to_string),
        }
    }

    fn store() -> FakeStore {
        let mut store = FakeStore::new(
            vec![
                tool("Notion", ToolStatus::Approved, Some("https://aff.partner.io/notion")),
                tool("Canva", ToolStatus::Pending, Some("https://example.com/canva")),
            ],
            Vec::new(),
        );
        store.ad_revenue = vec![ad(10, 0.40), ad(19, 0.25)];
        store
    }

    #[tokio::test]
    async fn dashboard_sums_both_windows() {
        let cfg = config();
        let store = store();
        let metrics = FakeMetrics {
            rows: vec![metric(1, 400, 10), metric(18, 100, 4)],
            available: true,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };

        let dash = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .dashboard(day(20))
            .await
            .unwrap();

        assert_eq!(dash.short.pageviews, 100);
        assert_eq!(dash.short.clicks, 4);
        assert!((dash.short.actual.as_f64() - 0.25).abs() < 1e-9);
        assert!((dash.short.total.as_f64() - 0.45).abs() < 1e-9);
        assert_eq!(dash.long.pageviews, 500);
        assert!((dash.long.actual.as_f64() - 0.65).abs() < 1e-9);
        assert_eq!((dash.monetizable_tools, dash.total_tools), (1, 2));
        assert_eq!(dash.setup.total(), 14);
        assert!(dash.warnings.is_empty());
    }

    #[tokio::test]
    async fn unavailable_metrics_report_zeros_with_a_warning() {
        let cfg = config();
        let store = FakeStore::new(Vec::new(), Vec::new());
        let metrics = FakeMetrics {
            rows: Vec::new(),
            available: false,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };

        let dash = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .dashboard(day(20))
            .await
            .unwrap();

        assert_eq!(dash.short.pageviews, 0);
        assert_eq!(dash.short.total.to_string(), "$0.00");
        assert_eq!(dash.long.total.to_string(), "$0.00");
        assert_eq!(dash.warnings.len(), 1);
    }

    #[tokio::test]
    async fn weekly_window_ends_yesterday() {
        let cfg = config();
        let store = store();
        let metrics = FakeMetrics {
            rows: vec![metric(13, 50, 2), metric(19, 50, 2), metric(20, 999, 99)],
            available: true,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };

        let weekly = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .weekly(day(20))
            .await
            .unwrap();

        assert_eq!(weekly.summary.window, DateWindow::ending(day(19), 7));
        assert_eq!(weekly.summary.pageviews, 100);
        assert_eq!(weekly.summary.clicks, 4);
        assert!((weekly.target_usd.as_f64() - 7.0).abs() < 1e-9);
        assert!(!weekly.target_reached);
        assert_eq!(weekly.file_name(), "weekly-2024-20.md");
    }

    #[tokio::test]
    async fn live_checks_append_reachability_items() {
        let cfg = config();
        let store = store();
        let metrics = FakeMetrics {
            rows: Vec::new(),
            available: true,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };
        let probe = FakeProbe { reachable: false };

        let report = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .with_probe(Some(&probe))
            .checklist(day(20))
            .await
            .unwrap();

        assert!(report.live_checked);
        assert_eq!(report.setup.total(), 17);
        let sitemap = report.setup.item(setup::CHECK_SITEMAP_REACHABLE).unwrap();
        assert!(!sitemap.passed);
        assert_eq!(sitemap.detail, "HTTP 503");
        assert!(report.setup.items[0].passed);
    }

    #[tokio::test]
    async fn audit_splits_tools_and_works_back_from_target() {
        let cfg = config();
        let store = store();
        let metrics = FakeMetrics {
            rows: vec![metric(10, 1000, 20)],
            available: true,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };

        let audit = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .audit(day(20))
            .await
            .unwrap();

        assert_eq!(audit.ready_tools, vec!["Notion".to_string()]);
        assert_eq!(audit.pending_tools.len(), 1);
        assert_eq!(audit.pending_tools[0].affiliate_url, "https://example.com/canva");
        assert!((audit.recent_ctr_percent - 2.0).abs() < 1e-9);
        assert!((audit.needed.clicks_per_day.unwrap() - 20.0).abs() < 1e-9);
        assert!((audit.needed.pageviews_per_day.unwrap() - 1000.0).abs() < 1e-6);
        assert_eq!(audit.actions.len(), 3);
    }

    #[test]
    fn rejected_ad_revenue_rows_are_listed() {
        let cfg = config();
        let mut store = store();
        store.ad_revenue_diagnostics = vec![Diagnostic {
            ledger: LedgerKind::AdRevenue,
            line: Some(4),
            message: "adsense_revenue_usd must be a non-negative number".to_string(),
        }];
        let metrics = FakeMetrics {
            rows: Vec::new(),
            available: true,
        };
        let inspector = FakeInspector {
            snapshot: empty_snapshot(),
        };

        let result = MonetizationRun::new(&cfg, &store, &metrics, &inspector)
            .validate_ad_revenue()
            .unwrap();

        assert!(!result.is_valid());
        assert_eq!(result.valid_rows, 2);
        assert!((result.total_usd.as_f64() - 0.65).abs() < 1e-9);
        assert!(result.rejected[0].starts_with("ad_revenue line 4"));
    }
}
