//! [`SiteInspector`] over the site workspace on disk.
//!
//! Collects the files, tracking IDs, layout and ledger health that the setup
//! checklist scores. Scoring itself lives in `pipeline::setup`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use pipeline::links;
use pipeline::setup::{FilePresence, RevenueLedgerHealth, SetupSnapshot};
use pipeline::{LedgerKind, PipelineError, SiteInspector};

use crate::error::LedgerError;
use crate::store::{columns, parse_ad_revenue, parse_rows, parse_tool};
use crate::table::read_table;
use crate::tracking::read_tracking_ids;

pub const ROBOTS_TXT: &str = "robots.txt";
pub const SITEMAP_XML: &str = "sitemap.xml";
pub const DISCLOSURE_PAGE: &str = "content/legal/disclosure.md";
pub const PRIVACY_PAGE: &str = "content/legal/privacy.md";
pub const TERMS_PAGE: &str = "content/legal/terms.md";
pub const DEFAULT_LAYOUT: &str = "_layouts/default.html";
pub const PUBLISH_WORKFLOW: &str = ".github/workflows/publish.yml";
pub const WEEKLY_REPORT_WORKFLOW: &str = ".github/workflows/weekly_report.yml";

/// The site repository rooted at `root`.
#[derive(Debug, Clone)]
pub struct SiteWorkspace {
    root: PathBuf,
    site_config: PathBuf,
    tools: PathBuf,
    ad_revenue: PathBuf,
}

impl SiteWorkspace {
    pub fn new(
        root: impl Into<PathBuf>,
        site_config: impl Into<PathBuf>,
        tools: impl Into<PathBuf>,
        ad_revenue: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            site_config: site_config.into(),
            tools: tools.into(),
            ad_revenue: ad_revenue.into(),
        }
    }

    fn presence(&self, relative: &str) -> FilePresence {
        let path = self.root.join(relative);
        FilePresence {
            present: path.is_file(),
            path: path.display().to_string(),
        }
    }

    fn revenue_health(&self) -> RevenueLedgerHealth {
        let shown = self.ad_revenue.display();
        match read_table(&self.ad_revenue, columns::AD_REVENUE) {
            Ok(table) => {
                let parsed = parse_rows(&table, LedgerKind::AdRevenue, parse_ad_revenue);
                match parsed.diagnostics.first() {
                    None => RevenueLedgerHealth {
                        valid: true,
                        detail: format!("{shown} (valid, {} rows)", parsed.rows.len()),
                    },
                    Some(first) => RevenueLedgerHealth {
                        valid: false,
                        detail: format!("{shown} ({first})"),
                    },
                }
            }
            Err(LedgerError::NotFound { .. }) => RevenueLedgerHealth {
                valid: false,
                detail: format!("{shown} (missing)"),
            },
            Err(err) => RevenueLedgerHealth {
                valid: false,
                detail: err.to_string(),
            },
        }
    }

    fn tool_counts(&self) -> (usize, usize) {
        match read_table(&self.tools, columns::TOOLS) {
            Ok(table) => {
                let parsed = parse_rows(&table, LedgerKind::Tools, parse_tool);
                let monetizable = parsed
                    .rows
                    .iter()
                    .filter(|t| links::is_monetizable(t))
                    .count();
                (monetizable, parsed.rows.len())
            }
            Err(err) => {
                warn!(error = %err, "Tool ledger unreadable for setup check");
                (0, 0)
            }
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, LedgerError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(LedgerError::io(path, e)),
    }
}

impl SiteInspector for SiteWorkspace {
    fn snapshot(&self, base_url: &str) -> Result<SetupSnapshot, PipelineError> {
        let ids = read_tracking_ids(&self.site_config)?;
        let layout_path = self.root.join(DEFAULT_LAYOUT);
        let layout = read_optional(&layout_path)?;
        let (monetizable_tools, total_tools) = self.tool_counts();

        Ok(SetupSnapshot {
            base_url: base_url.to_string(),
            ga4_measurement_id: ids.ga4_measurement_id,
            adsense_publisher_id: ids.adsense_publisher_id,
            robots_txt: self.presence(ROBOTS_TXT),
            sitemap_xml: self.presence(SITEMAP_XML),
            disclosure_page: self.presence(DISCLOSURE_PAGE),
            privacy_page: self.presence(PRIVACY_PAGE),
            terms_page: self.presence(TERMS_PAGE),
            layout_path: layout_path.display().to_string(),
            layout,
            revenue_ledger: self.revenue_health(),
            monetizable_tools,
            total_tools,
            publish_workflow: self.presence(PUBLISH_WORKFLOW),
            weekly_report_workflow: self.presence(WEEKLY_REPORT_WORKFLOW),
        })
    }
}
