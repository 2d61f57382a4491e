//! The daily publication run.
//!
//! Sequence:
//!
//! 1. evaluate the cost throttle; a skip ends the run with no ledger changes;
//! 2. refill the keyword pool, select `posts_per_run` keywords and write the
//!    keyword ledger back immediately, so an aborted run never reselects them;
//! 3. per keyword: pick recommendations, request a draft, run the quality gate,
//!    regenerate once with the template producer on rejection, persist on
//!    acceptance.
//!
//! A rejected keyword is reported and stays `used`; it never fails the run.

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, info_span, warn, Instrument};

use pipeline::gate::extract_cta_urls;
use pipeline::slug::allocate_slug;
use pipeline::throttle;
use pipeline::{
    candidates_from_tools, AcquirePlan, Article, ArticleSink, Diagnostic, Draft, DraftProducer,
    DraftRequest, GeneratedText, KeywordInventory, KeywordRecord, LedgerStore, PipelineError,
    QualityGate, RunId, Slug, SystemConfig, TemplateProducer, ThrottleDecision, ToolRecord,
    Verdict,
};

use crate::recommend::recommend;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What happened to one selected keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum KeywordOutcome {
    Published {
        slug: Slug,
        title: String,
        /// Where the sink wrote the article; `None` in dry-run mode.
        location: Option<String>,
        used_model: bool,
        /// `true` when the template producer replaced the configured one.
        fallback_used: bool,
        cta_urls: Vec<String>,
    },
    Rejected {
        reasons: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordReport {
    pub keyword: String,
    #[serde(flatten)]
    pub outcome: KeywordOutcome,
}

/// Overall result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublicationOutcome {
    /// The cost throttle skipped today's run.
    Throttled { reason: String },
    /// No keyword could be selected.
    NoKeywords,
    /// Every selected keyword was processed.
    Completed,
}

/// Summary of a publication run, printed as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub date: String,
    pub dry_run: bool,
    pub throttle: ThrottleDecision,
    pub outcome: PublicationOutcome,
    pub keywords_added: usize,
    pub keywords_recycled: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<KeywordReport>,
    /// Ledger rows skipped while loading.
    pub diagnostics: Vec<String>,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Dependencies of one publication run.
pub struct PublicationRun<'a> {
    config: &'a SystemConfig,
    store: &'a dyn LedgerStore,
    sink: &'a dyn ArticleSink,
    producer: &'a dyn DraftProducer,
    fallback: TemplateProducer,
    gate: QualityGate,
    dry_run: bool,
}

impl<'a> PublicationRun<'a> {
    pub fn new(
        config: &'a SystemConfig,
        store: &'a dyn LedgerStore,
        sink: &'a dyn ArticleSink,
        producer: &'a dyn DraftProducer,
    ) -> Self {
        Self {
            config,
            store,
            sink,
            producer,
            fallback: TemplateProducer::new(),
            gate: QualityGate::from_config(config),
            dry_run: false,
        }
    }

    /// When set, nothing is written: neither the keyword ledger nor articles.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Executes the run for the local time `now`.
    pub async fn execute(&self, now: DateTime<FixedOffset>) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new_random();
        let span = info_span!("publication_run", %run_id, date = %now.date_naive());
        self.execute_inner(run_id, now).instrument(span).await
    }

    async fn execute_inner(
        &self,
        run_id: RunId,
        now: DateTime<FixedOffset>,
    ) -> Result<RunReport, PipelineError> {
        let today = now.date_naive();
        let mut diagnostics = Vec::new();

        let costs = self.store.load_costs()?;
        note_diagnostics(&mut diagnostics, &costs.diagnostics);
        let decision = throttle::evaluate(today, &costs.rows, self.config.max_monthly_usd);

        let mut report = RunReport {
            run_id,
            date: today.to_string(),
            dry_run: self.dry_run,
            throttle: decision,
            outcome: PublicationOutcome::Completed,
            keywords_added: 0,
            keywords_recycled: 0,
            accepted: 0,
            rejected: 0,
            results: Vec::new(),
            diagnostics: Vec::new(),
        };

        if decision.skip {
            info!(
                month = %decision.month,
                month_total = %decision.month_total,
                cap = %decision.cap,
                "Monthly spend over cap on an odd day; skipping run"
            );
            report.outcome = PublicationOutcome::Throttled {
                reason: ThrottleDecision::SKIP_REASON.to_string(),
            };
            report.diagnostics = diagnostics;
            return Ok(report);
        }

        let tools = self.store.load_tools()?;
        note_diagnostics(&mut diagnostics, &tools.diagnostics);
        let keywords = self.store.load_keywords()?;
        note_diagnostics(&mut diagnostics, &keywords.diagnostics);

        let mut inventory = KeywordInventory::new(keywords.rows);
        let plan = AcquirePlan {
            count: self.config.content.posts_per_run,
            pool_min: self.config.growth.min_keyword_pool,
            add_limit: self.config.growth.keyword_add_limit,
            recycle: self.config.growth.recycle,
            shortfall: self.config.content.shortfall,
        };
        let acquisition =
            inventory.acquire(plan, &candidates_from_tools(&tools.rows), today)?;
        report.keywords_added = acquisition.added;
        report.keywords_recycled = acquisition.recycled;

        if !self.dry_run {
            self.store.save_keywords(inventory.rows())?;
        }

        if acquisition.selected.is_empty() {
            warn!("No pending keywords available");
            report.outcome = PublicationOutcome::NoKeywords;
            report.diagnostics = diagnostics;
            return Ok(report);
        }

        let mut taken = self.sink.existing_slugs()?;
        for (index, keyword) in acquisition.selected.iter().enumerate() {
            let published_at = now + Duration::minutes(index as i64);
            let outcome = self
                .process_keyword(keyword, &tools.rows, &mut taken, published_at)
                .await?;
            match &outcome {
                KeywordOutcome::Published { .. } => report.accepted += 1,
                KeywordOutcome::Rejected { .. } => report.rejected += 1,
            }
            report.results.push(KeywordReport {
                keyword: keyword.keyword.clone(),
                outcome,
            });
        }

        info!(
            accepted = report.accepted,
            rejected = report.rejected,
            "Publication run finished"
        );
        report.diagnostics = diagnostics;
        Ok(report)
    }

    async fn process_keyword(
        &self,
        keyword: &KeywordRecord,
        tools: &[ToolRecord],
        taken: &mut HashSet<Slug>,
        published_at: DateTime<FixedOffset>,
    ) -> Result<KeywordOutcome, PipelineError> {
        let recommendations = recommend(
            &keyword.keyword,
            tools,
            self.config.content.max_recommendations,
        );
        let request = DraftRequest {
            keyword: keyword.keyword.clone(),
            intent: keyword.intent.clone(),
            recommendations,
            disclosure_text: self.config.disclosure_text.clone(),
            min_chars: self.config.content.min_chars,
            date: published_at.date_naive(),
        };
        let slug = allocate_slug(published_at.date_naive(), &keyword.keyword, taken);

        let (text, mut fallback_used) = match self.producer.produce(&request).await {
            Ok(text) => (text, false),
            Err(err) => {
                warn!(
                    keyword = %keyword.keyword,
                    producer = self.producer.name(),
                    error = %err,
                    "Draft producer failed; using template"
                );
                (self.fallback.compose(&request), true)
            }
        };

        let mut draft = build_draft(&request, slug.clone(), text);
        let mut verdict = self.gate.validate(&draft, taken);

        if let Verdict::Reject { issues } = &verdict {
            if draft.used_model {
                warn!(
                    keyword = %keyword.keyword,
                    reason = %issues[0],
                    "Draft rejected; regenerating with template"
                );
                draft = build_draft(&request, slug, self.fallback.compose(&request));
                verdict = self.gate.validate(&draft, taken);
                fallback_used = true;
            }
        }

        if let Some(PipelineError::QualityGateRejected { reasons, .. }) =
            verdict.into_error(&keyword.keyword)
        {
            warn!(keyword = %keyword.keyword, reasons = ?reasons, "Keyword given up");
            return Ok(KeywordOutcome::Rejected { reasons });
        }

        let article = Article {
            draft,
            published_at,
        };
        let location = if self.dry_run {
            None
        } else {
            Some(self.sink.persist(&article)?)
        };
        taken.insert(article.slug().clone());
        info!(
            keyword = %keyword.keyword,
            slug = %article.slug(),
            used_model = article.draft.used_model,
            fallback_used,
            "Article accepted"
        );

        Ok(KeywordOutcome::Published {
            slug: article.draft.slug,
            title: article.draft.title,
            location,
            used_model: article.draft.used_model,
            fallback_used,
            cta_urls: article.draft.cta_urls,
        })
    }
}

fn build_draft(request: &DraftRequest, slug: Slug, text: GeneratedText) -> Draft {
    Draft {
        keyword: request.keyword.clone(),
        intent: request.intent.clone(),
        title: text.title.trim().to_string(),
        slug,
        cta_urls: extract_cta_urls(&text.body),
        body: text.body,
        recommendations: request.recommendations.clone(),
        used_model: text.used_model,
    }
}

fn note_diagnostics(into: &mut Vec<String>, found: &[Diagnostic]) {
    for d in found {
        warn!(ledger = %d.ledger, line = ?d.line, "Skipped ledger row: {}", d.message);
        into.push(d.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingProducer, FakeSink, FakeStore, ScriptedProducer};
    use chrono::TimeZone;
    use pipeline::{
        CostRecord, KeywordStatus, RawConfig, ToolId, ToolStatus, UsdAmount, YearMonth,
    };

    const DISCLOSURE: &str = "This article contains affiliate links.";

    fn config(posts_per_run: usize) -> SystemConfig {
        let yaml = format!(
            r#"
site: {{ base_url: "https://auto.example-site.dev" }}
content: {{ posts_per_run: {posts_per_run}, min_chars: 600 }}
affiliate: {{ disclosure_text: "{DISCLOSURE}", default_epc_usd: 0.01 }}
cost: {{ max_monthly_usd: 100 }}
growth: {{ min_keyword_pool: 1, keyword_add_limit: 5 }}
"#
        );
        serde_yaml::from_str::<RawConfig>(&yaml)
            .unwrap()
            .validate()
            .unwrap()
    }

    fn tool(name: &str, status: ToolStatus, affiliate: Option<&str>) -> ToolRecord {
        ToolRecord {
            id: ToolId::new(name.to_lowercase()).unwrap(),
            name: name.to_string(),
            category: Some("notes".to_string()),
            status,
            official_url: format!("https://{}.test", name.to_lowercase()),
            affiliate_url: affiliate.map(str::to_string),
        }
    }

    fn tools() -> Vec<ToolRecord> {
        vec![
            tool("Notion", ToolStatus::Approved, Some("https://aff.partner.io/notion")),
            tool("Obsidian", ToolStatus::Pending, None),
        ]
    }

    fn now(day: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, day, 7, 0, 0)
            .unwrap()
    }

    fn store_with(keywords: &[&str]) -> FakeStore {
        FakeStore::new(
            tools(),
            keywords
                .iter()
                .enumerate()
                .map(|(i, k)| KeywordRecord::pending(*k, None, i as i64))
                .collect(),
        )
    }

    #[tokio::test]
    async fn overspent_odd_day_is_throttled_without_side_effects() {
        let cfg = config(1);
        let mut store = store_with(&["notion setup guide"]);
        store.costs = vec![CostRecord {
            month: YearMonth::new(2024, 5).unwrap(),
            total_usd: UsdAmount::new(120.0).unwrap(),
        }];
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(15))
            .await
            .unwrap();

        assert!(matches!(report.outcome, PublicationOutcome::Throttled { .. }));
        assert_eq!(report.accepted, 0);
        assert!(sink.persisted().is_empty());
        assert!(store.saved_keywords().is_none());
    }

    #[tokio::test]
    async fn template_run_publishes_and_marks_keyword_used() {
        let cfg = config(1);
        let store = store_with(&["notion setup guide"]);
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();

        assert_eq!(report.outcome, PublicationOutcome::Completed);
        assert_eq!(report.accepted, 1);
        let persisted = sink.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].slug().as_str(), "2024-05-16-notion-setup-guide");
        assert!(persisted[0].draft.cta_urls.len() >= 2);

        let saved = store.saved_keywords().unwrap();
        let row = saved.iter().find(|k| k.keyword == "notion setup guide").unwrap();
        assert_eq!(row.status, KeywordStatus::Used);
    }

    #[tokio::test]
    async fn single_cta_model_draft_falls_back_to_template() {
        let cfg = config(1);
        let store = store_with(&["notion setup guide"]);
        let sink = FakeSink::default();
        let body = format!(
            "{DISCLOSURE}\n\n{}\n\n<p><a href=\"https://aff.partner.io/notion\" rel=\"sponsored nofollow\">Notion</a></p>",
            "Notion keeps every note in one searchable place for the whole team. ".repeat(12)
        );
        let producer = ScriptedProducer::new("Notion setup guide", &body);

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();

        let KeywordOutcome::Published {
            used_model,
            fallback_used,
            cta_urls,
            ..
        } = &report.results[0].outcome
        else {
            panic!("expected published outcome");
        };
        assert!(!used_model);
        assert!(fallback_used);
        assert!(cta_urls.len() >= 2);
    }

    #[tokio::test]
    async fn unavailable_producer_degrades_to_template() {
        let cfg = config(1);
        let store = store_with(&["notion setup guide"]);
        let sink = FakeSink::default();
        let producer = FailingProducer;

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert!(matches!(
            report.results[0].outcome,
            KeywordOutcome::Published { fallback_used: true, .. }
        ));
    }

    #[tokio::test]
    async fn keyword_that_cannot_reach_two_ctas_is_rejected_but_stays_used() {
        let cfg = config(1);
        let mut store = store_with(&["notion setup guide"]);
        store.tools = vec![tool("Notion", ToolStatus::Pending, None)];
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();

        assert_eq!(report.rejected, 1);
        let KeywordOutcome::Rejected { reasons } = &report.results[0].outcome else {
            panic!("expected rejection");
        };
        assert!(reasons[0].contains("distinct CTA"));
        assert!(sink.persisted().is_empty());
        let saved = store.saved_keywords().unwrap();
        assert_eq!(saved[0].status, KeywordStatus::Used);
    }

    #[tokio::test]
    async fn same_keyword_twice_in_one_run_gets_suffixed_slug() {
        let cfg = config(2);
        let store = store_with(&["Notion setup guide", "notion  setup guide"]);
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();

        let slugs: Vec<String> = sink
            .persisted()
            .iter()
            .map(|a| a.slug().to_string())
            .collect();
        assert_eq!(
            slugs,
            vec![
                "2024-05-16-notion-setup-guide".to_string(),
                "2024-05-16-notion-setup-guide-2".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let cfg = config(1);
        let store = store_with(&["notion setup guide"]);
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .dry_run(true)
            .execute(now(16))
            .await
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert!(sink.persisted().is_empty());
        assert!(store.saved_keywords().is_none());
    }

    #[tokio::test]
    async fn empty_inventory_is_a_clean_outcome() {
        let cfg = config(1);
        let mut store = store_with(&[]);
        store.tools = Vec::new();
        let sink = FakeSink::default();
        let producer = TemplateProducer::new();

        let report = PublicationRun::new(&cfg, &store, &sink, &producer)
            .execute(now(16))
            .await
            .unwrap();
        assert_eq!(report.outcome, PublicationOutcome::NoKeywords);
    }
}
