//! Markdown rendering of aggregator reports.
//!
//! Rendering is pure: callers decide where the documents are written.

use std::fmt::Write as _;

use pipeline::setup::{CHECK_ADSENSE, CHECK_GA4};
use pipeline::{RevenueSummary, SetupScore};

use crate::aggregate::{ChecklistReport, Dashboard, WeeklyReport};

fn mark(passed: bool) -> char {
    if passed {
        'x'
    } else {
        ' '
    }
}

fn push_revenue(out: &mut String, heading: &str, s: &RevenueSummary) {
    let _ = writeln!(out, "## {heading}");
    let _ = writeln!(out, "- Window: {} to {}", s.window.start, s.window.end);
    let _ = writeln!(out, "- PV: {}", s.pageviews);
    let _ = writeln!(out, "- Clicks: {}", s.clicks);
    let _ = writeln!(out, "- Affiliate (estimated): {}", s.estimated);
    let _ = writeln!(out, "- AdSense (actual): {}", s.actual);
    let _ = writeln!(out, "- Total: {}", s.total);
    out.push('\n');
}

fn push_items(out: &mut String, setup: &SetupScore) {
    for item in &setup.items {
        let _ = writeln!(out, "- [{}] {} ({})", mark(item.passed), item.name, item.detail);
    }
}

fn push_warnings(out: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    out.push_str("\n## Data warnings\n");
    for w in warnings {
        let _ = writeln!(out, "- {w}");
    }
}

/// Repository copy of the dashboard (`reports/monetization-dashboard.md`).
pub fn dashboard_report(d: &Dashboard) -> String {
    let mut out = String::from("# Monetization Dashboard\n\n");
    let _ = writeln!(out, "- Generated: {}", d.generated_on);
    let _ = writeln!(out, "- Site: {}", d.base_url);
    let _ = writeln!(
        out,
        "- Target progress ({}/day): {:.1}%",
        d.target_daily_usd, d.progress_percent
    );
    out.push('\n');
    push_revenue(&mut out, "Revenue (7 days)", &d.short);
    push_revenue(&mut out, "Revenue (28 days)", &d.long);

    out.push_str("## Setup Status\n");
    let _ = writeln!(out, "- Done: {}/{}", d.setup.passed(), d.setup.total());
    let _ = writeln!(out, "- Monetized tools: {}/{}", d.monetizable_tools, d.total_tools);
    push_items(&mut out, &d.setup);

    out.push_str("\n## Next\n");
    out.push_str("- Configure the GA4 measurement ID and AdSense publisher ID to enable tracking.\n");
    out.push_str("- Submit the sitemap in Search Console and keep improving inbound traffic.\n");
    out.push_str("- Update the ad revenue ledger once a week.\n");
    push_warnings(&mut out, &d.warnings);
    out
}

/// Public dashboard page rendered by the site (`/dashboard/`).
pub fn dashboard_page(d: &Dashboard) -> String {
    let mut out = String::from(
        "---\nlayout: default\ntitle: \"Revenue Dashboard\"\npermalink: /dashboard/\n---\n\n# Revenue Dashboard\n\n",
    );
    let _ = writeln!(out, "- Updated: {}", d.generated_on);
    let _ = writeln!(out, "- 7-day revenue: {}", d.short.total);
    let _ = writeln!(out, "- 28-day revenue: {}", d.long.total);
    let _ = writeln!(out, "- Setup progress: {}/{}", d.setup.passed(), d.setup.total());
    out.push_str("\n## Current state\n");
    for item in &d.setup.items {
        let label = if item.passed { "done" } else { "open" };
        let _ = writeln!(out, "- {}: {} ({})", item.name, label, item.detail);
    }
    out.push_str("\n## Notes\n");
    out.push_str("- This page is updated automatically.\n");
    out.push_str("- Detailed figures live in `reports/monetization-dashboard.md`.\n");
    let _ = writeln!(out, "- Site URL: {}", d.base_url);
    out
}

pub fn weekly_report(w: &WeeklyReport) -> String {
    let s = &w.summary;
    let mut out = format!("# Weekly Report {}-W{:02}\n\n", w.iso_year, w.iso_week);
    let _ = writeln!(out, "- Period: {} to {}", s.window.start, s.window.end);
    let _ = writeln!(
        out,
        "- Target ({} total): {}",
        w.target_usd,
        if w.target_reached { "reached" } else { "not reached" }
    );
    let _ = writeln!(out, "- Target progress: {:.1}%", w.attainment_percent);
    out.push_str("\n## Metrics\n");
    let _ = writeln!(out, "- PV: {}", s.pageviews);
    let _ = writeln!(out, "- Affiliate clicks: {}", s.clicks);
    let _ = writeln!(out, "- CTR: {:.2}%", s.ctr() * 100.0);
    let _ = writeln!(out, "- Affiliate revenue (estimated): {}", s.estimated);
    let _ = writeln!(out, "- AdSense revenue: {}", s.actual);
    let _ = writeln!(out, "- Total revenue: {}", s.total);
    out.push_str("\n## Notes\n");
    out.push_str("- Estimated revenue uses the configured per-click or per-conversion rate.\n");
    out.push_str("- AdSense figures come from the manually curated ad revenue ledger.\n");
    push_warnings(&mut out, &w.warnings);
    out
}

/// Setup checklist with the follow-up steps that cannot be automated.
pub fn checklist_report(c: &ChecklistReport) -> String {
    let base = &c.base_url;
    let mut out = String::from("# Search Console / Monetization Checklist\n\n");
    let _ = writeln!(out, "- Generated: {}", c.generated_on);
    let _ = writeln!(out, "- Site: {base}");
    let _ = writeln!(out, "- Automatic checks: {}/{} PASS", c.setup.passed(), c.setup.total());
    if !c.live_checked {
        out.push_str("- Live reachability checks: skipped\n");
    }
    out.push_str("\n## Automatic checks\n");
    push_items(&mut out, &c.setup);

    let done = |name: &str| c.setup.item(name).is_some_and(|i| i.passed);
    out.push_str("\n## Manual steps\n");
    out.push_str("- [ ] Add a URL-prefix property in Search Console\n");
    let _ = writeln!(out, "- [ ] Complete ownership verification (target: {base})");
    let _ = writeln!(out, "- [ ] Submit `sitemap.xml` ({base}/sitemap.xml)");
    if done(CHECK_ADSENSE) {
        out.push_str("- [x] AdSense review and publisher ID configured\n");
    } else {
        out.push_str("- [ ] Pass AdSense review and set the publisher ID in `_config.yml`\n");
    }
    if done(CHECK_GA4) {
        out.push_str("- [x] GA4 measurement ID configured\n");
    } else {
        out.push_str("- [ ] Set the GA4 measurement ID in `_config.yml`\n");
    }
    out.push_str("- [ ] Investigate any pages reported as not indexed\n");
    out.push_str("- [ ] Request indexing for the main articles with URL inspection\n");
    out.push_str("\n## Operation\n");
    out.push_str("- Review this checklist weekly and fix only the failing items.\n");
    out.push_str("- Fix a failing public sitemap.xml or robots.txt check first.\n");
    out
}
