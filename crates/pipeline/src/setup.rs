//! Operational-readiness checklist.
//!
//! [`score`] evaluates a fixed, ordered list of checks against a
//! [`SetupSnapshot`] (collected by a [`crate::SiteInspector`]) and, when live
//! checks are enabled, three reachability results. The checklist is recomputed
//! on every run and never persisted as state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::ProbeResult;

static GA4_MEASUREMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G-[A-Z0-9]+$").expect("GA4 pattern should compile"));
static ADSENSE_PUBLISHER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ca-pub-\d{16}$").expect("AdSense pattern should compile"));

/// Marker in the layout that must guard analytics and ads.
const CONSENT_GUARD: &str = "if (hasConsent())";

/// Returns `true` for a GA4 measurement ID such as `G-ABC123`.
pub fn is_valid_ga4_id(value: &str) -> bool {
    GA4_MEASUREMENT_ID.is_match(value.trim())
}

/// Returns `true` for an AdSense publisher ID such as `ca-pub-0123456789012345`.
pub fn is_valid_adsense_id(value: &str) -> bool {
    ADSENSE_PUBLISHER_ID.is_match(value.trim())
}

/// Returns `true` if the layout renders a consent banner with an accept action
/// and guards tracking behind consent.
pub fn layout_has_consent_banner(layout: &str) -> bool {
    layout.contains("cookie-consent-banner")
        && layout.contains("data-cookie-action=\"accept\"")
        && layout.contains(CONSENT_GUARD)
}

/// Returns `true` if the layout defines an ad loader and only calls it under
/// the consent guard.
pub fn layout_loads_ads_after_consent(layout: &str) -> bool {
    layout.contains("function loadAdsense()")
        && layout.contains("loadAdsense();")
        && layout.contains(CONSENT_GUARD)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Whether a repository file exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePresence {
    pub path: String,
    pub present: bool,
}

/// State of the ad-revenue ledger as seen by the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueLedgerHealth {
    pub valid: bool,
    /// Path plus `(valid)` or the first problem found.
    pub detail: String,
}

/// Everything the checklist needs from the site workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupSnapshot {
    pub base_url: String,
    pub ga4_measurement_id: String,
    pub adsense_publisher_id: String,
    pub robots_txt: FilePresence,
    pub sitemap_xml: FilePresence,
    pub disclosure_page: FilePresence,
    pub privacy_page: FilePresence,
    pub terms_page: FilePresence,
    pub layout_path: String,
    /// Layout contents; `None` when the layout file is missing.
    pub layout: Option<String>,
    pub revenue_ledger: RevenueLedgerHealth,
    pub monetizable_tools: usize,
    pub total_tools: usize,
    pub publish_workflow: FilePresence,
    pub weekly_report_workflow: FilePresence,
}

/// Live reachability of the published site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reachability {
    pub site: ProbeResult,
    pub sitemap: ProbeResult,
    pub robots: ProbeResult,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// One checklist line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl ChecklistItem {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail: detail.into(),
        }
    }

    fn file(name: &str, file: &FilePresence) -> Self {
        Self::new(name, file.present, file.path.clone())
    }
}

/// Scored checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupScore {
    pub items: Vec<ChecklistItem>,
}

impl SetupScore {
    pub fn passed(&self) -> usize {
        self.items.iter().filter(|i| i.passed).count()
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, name: &str) -> Option<&ChecklistItem> {
        self.items.iter().find(|i| i.name == name)
    }
}

pub const CHECK_HTTPS: &str = "Site URL uses https";
pub const CHECK_GA4: &str = "GA4 measurement ID configured";
pub const CHECK_ADSENSE: &str = "AdSense publisher ID configured";
pub const CHECK_SITE_REACHABLE: &str = "Public site reachable";
pub const CHECK_SITEMAP_REACHABLE: &str = "Public sitemap.xml reachable";
pub const CHECK_ROBOTS_REACHABLE: &str = "Public robots.txt reachable";

fn configured(value: &str) -> String {
    if value.trim().is_empty() {
        "not set".to_string()
    } else {
        value.trim().to_string()
    }
}

/// Evaluates every checklist item in fixed order. Reachability items are
/// appended only when `reachability` is given.
pub fn score(snapshot: &SetupSnapshot, reachability: Option<&Reachability>) -> SetupScore {
    let layout = snapshot.layout.as_deref().unwrap_or_default();
    let layout_detail = if snapshot.layout.is_some() {
        snapshot.layout_path.clone()
    } else {
        format!("{} (missing)", snapshot.layout_path)
    };

    let mut items = vec![
        ChecklistItem::new(
            CHECK_HTTPS,
            snapshot.base_url.starts_with("https://"),
            snapshot.base_url.clone(),
        ),
        ChecklistItem::new(
            CHECK_GA4,
            is_valid_ga4_id(&snapshot.ga4_measurement_id),
            configured(&snapshot.ga4_measurement_id),
        ),
        ChecklistItem::new(
            CHECK_ADSENSE,
            is_valid_adsense_id(&snapshot.adsense_publisher_id),
            configured(&snapshot.adsense_publisher_id),
        ),
        ChecklistItem::file("robots.txt present", &snapshot.robots_txt),
        ChecklistItem::file("sitemap.xml present", &snapshot.sitemap_xml),
        ChecklistItem::file("Affiliate disclosure page present", &snapshot.disclosure_page),
        ChecklistItem::file("Privacy policy present", &snapshot.privacy_page),
        ChecklistItem::file("Terms page present", &snapshot.terms_page),
        ChecklistItem::new(
            "Cookie consent banner present",
            layout_has_consent_banner(layout),
            layout_detail.clone(),
        ),
        ChecklistItem::new(
            "Ads load only after consent",
            layout_loads_ads_after_consent(layout),
            layout_detail,
        ),
        ChecklistItem::new(
            "Ad revenue ledger valid",
            snapshot.revenue_ledger.valid,
            snapshot.revenue_ledger.detail.clone(),
        ),
        ChecklistItem::new(
            "At least one real monetization link",
            snapshot.monetizable_tools > 0,
            format!("{}/{}", snapshot.monetizable_tools, snapshot.total_tools),
        ),
        ChecklistItem::file("Publish workflow present", &snapshot.publish_workflow),
        ChecklistItem::file("Weekly report workflow present", &snapshot.weekly_report_workflow),
    ];

    if let Some(live) = reachability {
        for (name, probe) in [
            (CHECK_SITE_REACHABLE, &live.site),
            (CHECK_SITEMAP_REACHABLE, &live.sitemap),
            (CHECK_ROBOTS_REACHABLE, &live.robots),
        ] {
            items.push(ChecklistItem::new(name, probe.reachable, probe.detail.clone()));
        }
    }

    SetupScore { items }
}
