//! Command handlers: each one builds the concrete adapters it needs, runs one
//! orchestrator operation and prints a JSON summary on stdout.

use anyhow::{bail, Context};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use ledger::{
    read_article, write_report, write_tracking_ids, CsvLedgerStore, LedgerMetricsSource,
    LedgerPaths, MarkdownPostSink, SiteWorkspace,
};
use llm::HuggingFaceProducer;
use orchestrator::render;
use orchestrator::{refill_keywords, MonetizationRun, PublicationRun};
use pipeline::setup::{is_valid_adsense_id, is_valid_ga4_id};
use pipeline::{
    ArticleSink, DraftProducer, ProviderKind, QualityGate, RawConfig, ReachabilityProbe,
    SystemConfig, TemplateProducer, Verdict,
};
use probe::HttpProbe;

use crate::args::{under, Cli, Command};

/// Reads and validates the system configuration.
pub fn load_config(path: &Path) -> anyhow::Result<SystemConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let raw: RawConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    raw.validate()
        .with_context(|| format!("invalid config {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialise summary")?
    );
    Ok(())
}

/// Everything resolved from the global flags and the configuration.
struct Invocation {
    root: PathBuf,
    config: SystemConfig,
    paths: LedgerPaths,
    posts_dir: PathBuf,
    site_config: PathBuf,
    mock: bool,
    live_check: bool,
    now: DateTime<FixedOffset>,
}

impl Invocation {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let root = cli.root.clone();
        let config = load_config(&under(&root, &cli.config))?;

        let defaults = LedgerPaths::under(&root);
        let pick = |given: &Option<PathBuf>, default: PathBuf| match given {
            Some(path) => under(&root, path),
            None => default,
        };
        let ledgers = &cli.ledgers;
        let paths = LedgerPaths {
            tools: pick(&ledgers.tools, defaults.tools),
            keywords: pick(&ledgers.keywords, defaults.keywords),
            costs: pick(&ledgers.costs, defaults.costs),
            metrics: pick(&ledgers.metrics, defaults.metrics),
            ad_revenue: pick(
                &ledgers.ad_revenue,
                under(&root, Path::new(&config.reporting.ad_revenue_csv)),
            ),
        };

        let offset = FixedOffset::east_opt(config.site.utc_offset_hours * 3600)
            .context("site.utc_offset_hours is out of range")?;
        let mut now = Utc::now().with_timezone(&offset);
        if let Some(date) = cli.date {
            now = date
                .and_time(now.time())
                .and_local_timezone(offset)
                .single()
                .context("--date cannot be represented in the site time zone")?;
        }

        Ok(Self {
            posts_dir: under(&root, &ledgers.posts_dir),
            site_config: under(&root, &ledgers.site_config),
            mock: cli.mock,
            live_check: !cli.mock && !cli.no_live_check,
            root,
            config,
            paths,
            now,
        })
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn store(&self) -> CsvLedgerStore {
        CsvLedgerStore::new(self.paths.clone())
    }

    fn workspace(&self) -> SiteWorkspace {
        SiteWorkspace::new(
            &self.root,
            &self.site_config,
            &self.paths.tools,
            &self.paths.ad_revenue,
        )
    }

    /// The configured producer; the template producer in mock mode or when the
    /// model cannot be set up.
    fn producer(&self) -> Box<dyn DraftProducer> {
        if self.mock || self.config.generation.provider == ProviderKind::Template {
            return Box::new(TemplateProducer::new());
        }
        let generation = &self.config.generation;
        match HuggingFaceProducer::from_env(
            generation.endpoint.as_str(),
            generation.model.as_str(),
            generation.timeout_secs,
        ) {
            Ok(producer) => Box::new(producer),
            Err(err) => {
                warn!(error = %err, "Text model unavailable; using template producer");
                Box::new(TemplateProducer::new())
            }
        }
    }

    fn probe(&self) -> anyhow::Result<Option<HttpProbe>> {
        if !self.live_check {
            return Ok(None);
        }
        let probe = HttpProbe::new(self.config.reporting.live_check_timeout_secs)?;
        Ok(Some(probe))
    }
}

/// Runs the selected command. The system configuration is loaded only for
/// commands that need it; setting tracking IDs touches the site config alone.
pub async fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let ctx = || Invocation::new(cli);
    match &cli.command {
        Command::Publish { dry_run } => publish(&ctx()?, *dry_run).await?,
        Command::Refill { dry_run } => {
            let ctx = ctx()?;
            let report = refill_keywords(&ctx.config, &ctx.store(), *dry_run)?;
            print_json(&report)?;
        }
        Command::Dashboard {
            output_report,
            output_site,
        } => dashboard(&ctx()?, output_report, output_site).await?,
        Command::WeeklyReport { reports_dir } => weekly_report(&ctx()?, reports_dir).await?,
        Command::Checklist { output } => checklist(&ctx()?, output).await?,
        Command::Audit => audit(&ctx()?).await?,
        Command::ValidateRevenue => return validate_revenue(&ctx()?),
        Command::Gate { path } => return gate(&ctx()?, path),
        Command::SetTrackingIds { ga4, adsense } => {
            let path = under(&cli.root, &cli.ledgers.site_config);
            set_tracking_ids(&path, ga4.as_deref(), adsense.as_deref())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn publish(ctx: &Invocation, dry_run: bool) -> anyhow::Result<()> {
    let store = ctx.store();
    let sink = MarkdownPostSink::new(&ctx.posts_dir);
    let producer = ctx.producer();
    info!(producer = producer.name(), dry_run, "Starting publication run");
    let report = PublicationRun::new(&ctx.config, &store, &sink, producer.as_ref())
        .dry_run(dry_run)
        .execute(ctx.now)
        .await
        .context("publication run failed")?;
    print_json(&report)
}

async fn dashboard(ctx: &Invocation, output_report: &Path, output_site: &Path) -> anyhow::Result<()> {
    let store = ctx.store();
    let metrics = LedgerMetricsSource::new(&ctx.paths.metrics);
    let workspace = ctx.workspace();
    let probe = ctx.probe()?;
    let dashboard = MonetizationRun::new(&ctx.config, &store, &metrics, &workspace)
        .with_probe(probe.as_ref().map(|p| p as &dyn ReachabilityProbe))
        .dashboard(ctx.today())
        .await?;

    let report_path = under(&ctx.root, output_report);
    let site_path = under(&ctx.root, output_site);
    write_report(&report_path, &render::dashboard_report(&dashboard))?;
    write_report(&site_path, &render::dashboard_page(&dashboard))?;

    print_json(&json!({
        "report": report_path.display().to_string(),
        "site_page": site_path.display().to_string(),
        "total_7d_usd": dashboard.short.total.as_f64(),
        "total_28d_usd": dashboard.long.total.as_f64(),
        "progress_percent": dashboard.progress_percent,
        "setup_passed": dashboard.setup.passed(),
        "setup_total": dashboard.setup.total(),
        "warnings": dashboard.warnings,
    }))
}

async fn weekly_report(ctx: &Invocation, reports_dir: &Path) -> anyhow::Result<()> {
    let store = ctx.store();
    let metrics = LedgerMetricsSource::new(&ctx.paths.metrics);
    let workspace = ctx.workspace();
    let weekly = MonetizationRun::new(&ctx.config, &store, &metrics, &workspace)
        .weekly(ctx.today())
        .await?;

    let path = under(&ctx.root, reports_dir).join(weekly.file_name());
    write_report(&path, &render::weekly_report(&weekly))?;

    print_json(&json!({
        "report": path.display().to_string(),
        "pageviews": weekly.summary.pageviews,
        "clicks": weekly.summary.clicks,
        "total_usd": weekly.summary.total.as_f64(),
        "target_usd": weekly.target_usd.as_f64(),
        "target_reached": weekly.target_reached,
        "warnings": weekly.warnings,
    }))
}

async fn checklist(ctx: &Invocation, output: &Path) -> anyhow::Result<()> {
    let store = ctx.store();
    let metrics = LedgerMetricsSource::new(&ctx.paths.metrics);
    let workspace = ctx.workspace();
    let probe = ctx.probe()?;
    let report = MonetizationRun::new(&ctx.config, &store, &metrics, &workspace)
        .with_probe(probe.as_ref().map(|p| p as &dyn ReachabilityProbe))
        .checklist(ctx.today())
        .await?;

    let path = under(&ctx.root, output);
    write_report(&path, &render::checklist_report(&report))?;

    print_json(&json!({
        "report": path.display().to_string(),
        "passed": report.setup.passed(),
        "total": report.setup.total(),
        "live_checked": report.live_checked,
    }))
}

async fn audit(ctx: &Invocation) -> anyhow::Result<()> {
    let store = ctx.store();
    let metrics = LedgerMetricsSource::new(&ctx.paths.metrics);
    let workspace = ctx.workspace();
    let report = MonetizationRun::new(&ctx.config, &store, &metrics, &workspace)
        .audit(ctx.today())
        .await?;
    print_json(&report)
}

fn validate_revenue(ctx: &Invocation) -> anyhow::Result<ExitCode> {
    let path = &ctx.paths.ad_revenue;
    if !path.is_file() {
        bail!("{} does not exist", path.display());
    }
    let store = ctx.store();
    let metrics = LedgerMetricsSource::new(&ctx.paths.metrics);
    let workspace = ctx.workspace();
    let validation =
        MonetizationRun::new(&ctx.config, &store, &metrics, &workspace).validate_ad_revenue()?;
    print_json(&json!({
        "file": path.display().to_string(),
        "valid": validation.is_valid(),
        "rows": validation.valid_rows,
        "total_usd": validation.total_usd.as_f64(),
        "rejected": validation.rejected,
    }))?;
    Ok(if validation.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Re-runs the quality gate over an article already on disk. Its own slug
/// does not count as a duplicate.
fn gate(ctx: &Invocation, path: &Path) -> anyhow::Result<ExitCode> {
    let path = under(&ctx.root, path);
    let draft = read_article(&path)?;
    let mut existing = MarkdownPostSink::new(&ctx.posts_dir).existing_slugs()?;
    existing.remove(&draft.slug);

    let verdict = QualityGate::from_config(&ctx.config).validate(&draft, &existing);
    let issues: Vec<String> = match &verdict {
        Verdict::Accept => Vec::new(),
        Verdict::Reject { issues } => issues.iter().map(ToString::to_string).collect(),
    };
    print_json(&json!({
        "file": path.display().to_string(),
        "slug": draft.slug,
        "accepted": verdict.is_accept(),
        "issues": issues,
    }))?;
    Ok(if verdict.is_accept() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn set_tracking_ids(path: &Path, ga4: Option<&str>, adsense: Option<&str>) -> anyhow::Result<()> {
    let ga4 = ga4.map(str::trim).filter(|v| !v.is_empty());
    let adsense = adsense.map(str::trim).filter(|v| !v.is_empty());
    if ga4.is_none() && adsense.is_none() {
        bail!("nothing to set: pass --ga4 and/or --adsense");
    }
    if let Some(id) = ga4 {
        if !is_valid_ga4_id(id) {
            bail!("invalid GA4 measurement ID '{id}' (expected G-XXXX)");
        }
    }
    if let Some(id) = adsense {
        if !is_valid_adsense_id(id) {
            bail!("invalid AdSense publisher ID '{id}' (expected ca-pub-<16 digits>)");
        }
    }
    let ids = write_tracking_ids(path, ga4, adsense)?;
    print_json(&json!({
        "config": path.display().to_string(),
        "ga4_measurement_id": ids.ga4_measurement_id,
        "adsense_publisher_id": ids.adsense_publisher_id,
    }))
}
