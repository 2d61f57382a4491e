//! Port traits implemented by infrastructure crates.
//!
//! | Trait | Implemented by |
//! |-------|----------------|
//! | [`LedgerStore`] | `ledger::CsvLedgerStore` |
//! | [`ArticleSink`] | `ledger::MarkdownPostSink` |
//! | [`MetricsSource`] | `ledger::LedgerMetricsSource` |
//! | [`SiteInspector`] | `ledger::SiteWorkspace` |
//! | [`DraftProducer`] | `llm::HuggingFaceProducer`, [`crate::TemplateProducer`] |
//! | [`ReachabilityProbe`] | `probe::HttpProbe` |
//!
//! Ledger and article I/O is synchronous: runs are batch jobs over small local
//! files. Network-facing ports are async.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::setup::SetupSnapshot;
use crate::{
    AdRevenueRecord, Article, CostRecord, DateWindow, GeneratedText, KeywordRecord,
    MetricsRecord, Parsed, PipelineError, Recommendation, Slug, ToolRecord,
};

// ---------------------------------------------------------------------------
// Ledgers and articles
// ---------------------------------------------------------------------------

/// Typed access to the tabular ledgers.
///
/// Every `load_*` validates rows at the boundary: malformed rows become
/// [`crate::Diagnostic`]s, a missing file or missing required column is a
/// [`PipelineError::Ledger`]. The cost and ad-revenue ledgers are optional
/// inputs; a missing file loads as empty.
pub trait LedgerStore: Send + Sync {
    fn load_tools(&self) -> Result<Parsed<ToolRecord>, PipelineError>;

    fn load_keywords(&self) -> Result<Parsed<KeywordRecord>, PipelineError>;

    /// Replaces the keyword ledger with `rows`. Rows that failed to parse on
    /// load are preserved, not dropped.
    fn save_keywords(&self, rows: &[KeywordRecord]) -> Result<(), PipelineError>;

    fn load_costs(&self) -> Result<Parsed<CostRecord>, PipelineError>;

    fn load_ad_revenue(&self) -> Result<Parsed<AdRevenueRecord>, PipelineError>;
}

/// Destination for accepted articles.
pub trait ArticleSink: Send + Sync {
    /// Slugs of every article already persisted.
    fn existing_slugs(&self) -> Result<HashSet<Slug>, PipelineError>;

    /// Writes one article and returns where it went.
    fn persist(&self, article: &Article) -> Result<String, PipelineError>;
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Everything a producer needs to write one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub keyword: String,
    pub intent: Option<String>,
    /// Tools to recommend, each with its resolved CTA URL.
    pub recommendations: Vec<Recommendation>,
    pub disclosure_text: String,
    pub min_chars: usize,
    /// Publication date; the template producer uses its year in titles.
    pub date: NaiveDate,
}

/// Opaque text producer.
///
/// Implementations return [`PipelineError::ExternalServiceUnavailable`] when
/// they cannot produce text; the caller falls back to the deterministic
/// producer.
#[async_trait]
pub trait DraftProducer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn produce(&self, request: &DraftRequest) -> Result<GeneratedText, PipelineError>;
}

// ---------------------------------------------------------------------------
// Analytics and site state
// ---------------------------------------------------------------------------

/// Supplies traffic metrics for a window.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn metrics(&self, window: DateWindow) -> Result<Parsed<MetricsRecord>, PipelineError>;
}

/// Collects the repository state the setup checklist is scored against.
pub trait SiteInspector: Send + Sync {
    fn snapshot(&self, base_url: &str) -> Result<SetupSnapshot, PipelineError>;
}

/// Observed result of fetching one public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub reachable: bool,
    /// `HTTP 200`, `error: timeout`, …
    pub detail: String,
}

/// Best-effort HTTP reachability check. Never fails: problems are reported in
/// the [`ProbeResult`].
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self, url: &str) -> ProbeResult;
}
