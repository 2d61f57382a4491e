//! Hand-written fakes for the port traits, shared by this crate's tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use pipeline::setup::{FilePresence, RevenueLedgerHealth};
use pipeline::{
    AdRevenueRecord, Article, ArticleSink, CostRecord, DateWindow, Diagnostic, DraftProducer,
    DraftRequest, GeneratedText, KeywordRecord, LedgerStore, MetricsRecord, MetricsSource,
    Parsed, PipelineError, ProbeResult, ReachabilityProbe, SetupSnapshot, SiteInspector, Slug,
    ToolRecord,
};

// ---------------------------------------------------------------------------
// Ledgers
// ---------------------------------------------------------------------------

pub struct FakeStore {
    pub tools: Vec<ToolRecord>,
    pub keywords: Vec<KeywordRecord>,
    pub costs: Vec<CostRecord>,
    pub ad_revenue: Vec<AdRevenueRecord>,
    pub ad_revenue_diagnostics: Vec<Diagnostic>,
    saved: Mutex<Option<Vec<KeywordRecord>>>,
}

impl FakeStore {
    pub fn new(tools: Vec<ToolRecord>, keywords: Vec<KeywordRecord>) -> Self {
        Self {
            tools,
            keywords,
            costs: Vec::new(),
            ad_revenue: Vec::new(),
            ad_revenue_diagnostics: Vec::new(),
            saved: Mutex::new(None),
        }
    }

    /// The rows passed to the last `save_keywords`, if any.
    pub fn saved_keywords(&self) -> Option<Vec<KeywordRecord>> {
        self.saved.lock().unwrap().clone()
    }
}

impl LedgerStore for FakeStore {
    fn load_tools(&self) -> Result<Parsed<ToolRecord>, PipelineError> {
        Ok(Parsed::clean(self.tools.clone()))
    }

    fn load_keywords(&self) -> Result<Parsed<KeywordRecord>, PipelineError> {
        Ok(Parsed::clean(self.keywords.clone()))
    }

    fn save_keywords(&self, rows: &[KeywordRecord]) -> Result<(), PipelineError> {
        *self.saved.lock().unwrap() = Some(rows.to_vec());
        Ok(())
    }

    fn load_costs(&self) -> Result<Parsed<CostRecord>, PipelineError> {
        Ok(Parsed::clean(self.costs.clone()))
    }

    fn load_ad_revenue(&self) -> Result<Parsed<AdRevenueRecord>, PipelineError> {
        Ok(Parsed {
            rows: self.ad_revenue.clone(),
            diagnostics: self.ad_revenue_diagnostics.clone(),
        })
    }
}

#[derive(Default)]
pub struct FakeSink {
    existing: HashSet<Slug>,
    persisted: Mutex<Vec<Article>>,
}

impl FakeSink {
    pub fn persisted(&self) -> Vec<Article> {
        self.persisted.lock().unwrap().clone()
    }
}

impl ArticleSink for FakeSink {
    fn existing_slugs(&self) -> Result<HashSet<Slug>, PipelineError> {
        Ok(self.existing.clone())
    }

    fn persist(&self, article: &Article) -> Result<String, PipelineError> {
        self.persisted.lock().unwrap().push(article.clone());
        Ok(format!("posts/{}.md", article.slug()))
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Returns the same model-generated text for every request.
pub struct ScriptedProducer {
    title: String,
    body: String,
}

impl ScriptedProducer {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl DraftProducer for ScriptedProducer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn produce(&self, _request: &DraftRequest) -> Result<GeneratedText, PipelineError> {
        Ok(GeneratedText {
            title: self.title.clone(),
            body: self.body.clone(),
            used_model: true,
        })
    }
}

/// Always unavailable.
pub struct FailingProducer;

#[async_trait]
impl DraftProducer for FailingProducer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn produce(&self, _request: &DraftRequest) -> Result<GeneratedText, PipelineError> {
        Err(PipelineError::unavailable("huggingface", "connection refused"))
    }
}

// ---------------------------------------------------------------------------
// Analytics and site
// ---------------------------------------------------------------------------

pub struct FakeMetrics {
    pub rows: Vec<MetricsRecord>,
    pub available: bool,
}

#[async_trait]
impl MetricsSource for FakeMetrics {
    async fn metrics(&self, window: DateWindow) -> Result<Parsed<MetricsRecord>, PipelineError> {
        if !self.available {
            return Err(PipelineError::unavailable("metrics", "offline"));
        }
        Ok(Parsed::clean(
            self.rows
                .iter()
                .copied()
                .filter(|m| window.contains(m.date))
                .collect(),
        ))
    }
}

pub struct FakeInspector {
    pub snapshot: SetupSnapshot,
}

impl SiteInspector for FakeInspector {
    fn snapshot(&self, base_url: &str) -> Result<SetupSnapshot, PipelineError> {
        let mut snapshot = self.snapshot.clone();
        snapshot.base_url = base_url.to_string();
        Ok(snapshot)
    }
}

/// Reports every URL with the same result.
pub struct FakeProbe {
    pub reachable: bool,
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn check(&self, url: &str) -> ProbeResult {
        ProbeResult {
            url: url.to_string(),
            reachable: self.reachable,
            detail: if self.reachable { "HTTP 200" } else { "HTTP 503" }.to_string(),
        }
    }
}

fn absent(path: &str) -> FilePresence {
    FilePresence {
        path: path.to_string(),
        present: false,
    }
}

/// A workspace with nothing set up.
pub fn empty_snapshot() -> SetupSnapshot {
    SetupSnapshot {
        base_url: String::new(),
        ga4_measurement_id: String::new(),
        adsense_publisher_id: String::new(),
        robots_txt: absent("robots.txt"),
        sitemap_xml: absent("sitemap.xml"),
        disclosure_page: absent("content/legal/disclosure.md"),
        privacy_page: absent("content/legal/privacy.md"),
        terms_page: absent("content/legal/terms.md"),
        layout_path: "_layouts/default.html".to_string(),
        layout: None,
        revenue_ledger: RevenueLedgerHealth {
            valid: false,
            detail: "data/ad_revenue.csv (missing)".to_string(),
        },
        monetizable_tools: 0,
        total_tools: 0,
        publish_workflow: absent(".github/workflows/publish.yml"),
        weekly_report_workflow: absent(".github/workflows/weekly_report.yml"),
    }
}
