//! Command-line surface.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "affipress")]
#[command(about = "Affiliate content publication and monetization pipeline")]
#[command(version)]
pub struct Cli {
    /// Site repository root; relative paths below resolve against it
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// System configuration document
    #[arg(long, global = true, default_value = "config/system.yaml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub ledgers: LedgerArgs,

    /// Use the template producer and skip every network call
    #[arg(long, global = true)]
    pub mock: bool,

    /// Skip live reachability checks of the public site
    #[arg(long, global = true)]
    pub no_live_check: bool,

    /// Run as if the local date were DATE (YYYY-MM-DD)
    #[arg(long, global = true, env = "AFFIPRESS_DATE")]
    pub date: Option<NaiveDate>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Overrides for ledger and site file locations.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LedgerArgs {
    /// Tool ledger [default: data/tools.csv]
    #[arg(long, global = true)]
    pub tools: Option<PathBuf>,

    /// Keyword ledger [default: data/keywords.csv]
    #[arg(long, global = true)]
    pub keywords: Option<PathBuf>,

    /// Monthly cost ledger [default: data/costs.csv]
    #[arg(long, global = true)]
    pub costs: Option<PathBuf>,

    /// Analytics metrics ledger [default: data/analytics_metrics.csv]
    #[arg(long, global = true)]
    pub metrics: Option<PathBuf>,

    /// Ad revenue ledger [default: reporting.ad_revenue_csv]
    #[arg(long, global = true)]
    pub ad_revenue: Option<PathBuf>,

    /// Article directory
    #[arg(long, global = true, default_value = "content/posts")]
    pub posts_dir: PathBuf,

    /// Site configuration holding the tracking IDs
    #[arg(long, global = true, default_value = "_config.yml")]
    pub site_config: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daily publication
    Publish {
        /// Report what would be published without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Top the keyword pool up from the tool ledger
    Refill {
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the monetization dashboard (repository report and site page)
    Dashboard {
        #[arg(long, default_value = "reports/monetization-dashboard.md")]
        output_report: PathBuf,
        #[arg(long, default_value = "content/dashboard.md")]
        output_site: PathBuf,
    },

    /// Write the report for the 7 days ending yesterday
    WeeklyReport {
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
    },

    /// Write the setup checklist report
    Checklist {
        #[arg(long, default_value = "reports/search-console-checklist.md")]
        output: PathBuf,
    },

    /// Print the monetization audit
    Audit,

    /// Validate the ad revenue ledger; exits non-zero when a row is rejected
    ValidateRevenue,

    /// Run the quality gate over an existing article; exits non-zero on rejection
    Gate {
        /// Article file, relative to --root unless absolute
        path: PathBuf,
    },

    /// Set the analytics and ad-network IDs in the site configuration
    SetTrackingIds {
        /// GA4 measurement ID (G-XXXX)
        #[arg(long)]
        ga4: Option<String>,
        /// AdSense publisher ID (ca-pub-<16 digits>)
        #[arg(long)]
        adsense: Option<String>,
    },
}

/// Resolves `path` against `root` unless it is absolute.
pub fn under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
