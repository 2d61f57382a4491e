//! Content quality gate.
//!
//! [`QualityGate::validate`] runs every check against a [`Draft`] and returns a
//! [`Verdict`]. All violated checks are collected; the first one in check order
//! is the reported reason.
//!
//! Check order:
//!
//! | # | Check |
//! |---|-------|
//! | 1 | title and body non-empty |
//! | 2 | visible body length ≥ `min_chars` |
//! | 3 | slug not already persisted |
//! | 4 | ≥ 2 distinct recommended URLs embedded as CTAs |
//! | 5 | no unresolved template tokens |
//! | 6 | disclosure text present |
//! | 7 | no banned phrases |
//! | 8 | no Markdown external links |
//! | 9 | every external anchor has `rel="sponsored nofollow"` |
//! | 10 | duplicated-sentence ratio ≤ limit |

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::SystemConfig;
use crate::{Draft, PipelineError, Slug};

/// Minimum number of distinct CTA URLs an accepted article carries.
pub const MIN_DISTINCT_CTAS: usize = 2;

/// Default ceiling for the share of repeated sentences.
pub const DEFAULT_MAX_DUPLICATE_RATIO: f64 = 0.35;

/// Phrases rejected in every article regardless of configuration.
pub const DEFAULT_BANNED_PHRASES: &[&str] = &[
    "guaranteed cure",
    "guaranteed profit",
    "100% profit",
    "risk-free returns",
    "guaranteed to win",
    "no side effects",
    "guaranteed income",
];

/// Leftovers of unfilled prompt or template variables.
const PLACEHOLDER_TOKENS: &[&str] = &["{{", "}}", "{keyword}", "{tool}", "{cta_url}", "lorem ipsum"];

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<a\s+([^>]*)>").expect("anchor pattern should compile"));
static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href="([^"]+)""#).expect("href pattern should compile"));
static REL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)rel="([^"]+)""#).expect("rel pattern should compile"));
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]+\]\(https?://[^)]+\)").expect("markdown link pattern should compile")
});
static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---[\s\S]*?---\n").expect("front matter pattern should compile")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern should compile"));
static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[。\n]|[.!?](?:\s|$)").expect("sentence pattern should compile")
});

// ---------------------------------------------------------------------------
// Text measurements
// ---------------------------------------------------------------------------

/// An `<a>` tag with an absolute http(s) `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAnchor {
    pub href: String,
    pub sponsored_nofollow: bool,
}

/// Every external anchor in `text`, in document order.
pub fn external_anchors(text: &str) -> Vec<ExternalAnchor> {
    ANCHOR
        .captures_iter(text)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let href = HREF.captures(attrs)?.get(1)?.as_str().trim().to_string();
            let lower = href.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return None;
            }
            let rel: HashSet<String> = REL
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| {
                    m.as_str()
                        .split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect()
                })
                .unwrap_or_default();
            Some(ExternalAnchor {
                href,
                sponsored_nofollow: rel.contains("sponsored") && rel.contains("nofollow"),
            })
        })
        .collect()
}

/// Distinct hrefs of the call-to-action anchors in `body`, in body order.
///
/// A call-to-action is an external anchor carrying `rel="sponsored nofollow"`.
pub fn extract_cta_urls(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    external_anchors(body)
        .into_iter()
        .filter(|a| a.sponsored_nofollow)
        .filter_map(|a| seen.insert(a.href.clone()).then_some(a.href))
        .collect()
}

/// Removes a leading front-matter block and every tag.
fn strip_markup(text: &str) -> String {
    let without_front_matter = FRONT_MATTER.replace(text, "");
    TAG.replace_all(&without_front_matter, "").into_owned()
}

/// Number of characters a reader sees: front matter, tags and whitespace are
/// not counted.
pub fn visible_char_count(text: &str) -> usize {
    strip_markup(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .count()
}

/// Share of sentences that repeat an earlier sentence verbatim.
///
/// Returns `0.0` for text without sentences.
pub fn duplicate_ratio(text: &str) -> f64 {
    let visible = strip_markup(text);
    let sentences: Vec<&str> = SENTENCE_BREAK
        .split(&visible)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let mut seen = HashSet::new();
    let duplicates = sentences.iter().filter(|s| !seen.insert(**s)).count();
    duplicates as f64 / sentences.len() as f64
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// One failed gate check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum GateIssue {
    EmptyTitle,
    EmptyBody,
    TooShort { chars: usize, min_chars: usize },
    DuplicateSlug { slug: Slug },
    TooFewCtas { distinct: usize },
    PlaceholderToken { token: String },
    MissingDisclosure,
    BannedPhrase { phrase: String },
    MarkdownExternalLink,
    MissingSponsoredRel { href: String },
    RepetitiveContent { ratio: f64, max: f64 },
}

impl std::fmt::Display for GateIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => f.write_str("title is empty"),
            Self::EmptyBody => f.write_str("body is empty"),
            Self::TooShort { chars, min_chars } => {
                write!(f, "body too short: {chars} < {min_chars} characters")
            }
            Self::DuplicateSlug { slug } => write!(f, "slug '{slug}' already exists"),
            Self::TooFewCtas { distinct } => write!(
                f,
                "only {distinct} distinct CTA URL(s); at least {MIN_DISTINCT_CTAS} required"
            ),
            Self::PlaceholderToken { token } => write!(f, "unresolved placeholder '{token}'"),
            Self::MissingDisclosure => f.write_str("affiliate disclosure missing"),
            Self::BannedPhrase { phrase } => write!(f, "banned phrase '{phrase}'"),
            Self::MarkdownExternalLink => {
                f.write_str("Markdown external link found; CTAs must be HTML anchors")
            }
            Self::MissingSponsoredRel { href } => {
                write!(f, "external link {href} lacks rel=\"sponsored nofollow\"")
            }
            Self::RepetitiveContent { ratio, max } => write!(
                f,
                "duplicate sentence ratio {:.0}% exceeds {:.0}%",
                ratio * 100.0,
                max * 100.0
            ),
        }
    }
}

/// Outcome of [`QualityGate::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    /// `issues` is never empty; the first entry is the reason.
    Reject { issues: Vec<GateIssue> },
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// The first failing check, if any.
    pub fn reason(&self) -> Option<&GateIssue> {
        match self {
            Self::Accept => None,
            Self::Reject { issues } => issues.first(),
        }
    }

    /// Converts a rejection into [`PipelineError::QualityGateRejected`].
    pub fn into_error(self, keyword: &str) -> Option<PipelineError> {
        match self {
            Self::Accept => None,
            Self::Reject { issues } => Some(PipelineError::QualityGateRejected {
                keyword: keyword.to_string(),
                reasons: issues.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Validation rules applied to every draft.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityGate {
    pub min_chars: usize,
    pub disclosure_text: String,
    /// Compared case-insensitively.
    pub banned_phrases: Vec<String>,
    pub max_duplicate_ratio: f64,
}

impl QualityGate {
    /// Builds the gate from configuration. Configured banned phrases extend
    /// [`DEFAULT_BANNED_PHRASES`].
    pub fn from_config(config: &SystemConfig) -> Self {
        let mut banned_phrases: Vec<String> = DEFAULT_BANNED_PHRASES
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        banned_phrases.extend(
            config
                .content
                .banned_phrases
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
        );
        Self {
            min_chars: config.content.min_chars,
            disclosure_text: config.disclosure_text.clone(),
            banned_phrases,
            max_duplicate_ratio: DEFAULT_MAX_DUPLICATE_RATIO,
        }
    }

    /// Runs every check against `draft`.
    ///
    /// `existing_slugs` holds the slugs already persisted (and those accepted
    /// earlier in the same run).
    pub fn validate(&self, draft: &Draft, existing_slugs: &HashSet<Slug>) -> Verdict {
        let mut issues = Vec::new();

        if draft.title.trim().is_empty() {
            issues.push(GateIssue::EmptyTitle);
        }
        if draft.body.trim().is_empty() {
            issues.push(GateIssue::EmptyBody);
        }

        let chars = visible_char_count(&draft.body);
        if chars < self.min_chars {
            issues.push(GateIssue::TooShort {
                chars,
                min_chars: self.min_chars,
            });
        }

        if existing_slugs.contains(&draft.slug) {
            issues.push(GateIssue::DuplicateSlug {
                slug: draft.slug.clone(),
            });
        }

        let distinct = distinct_recommended_ctas(draft);
        if distinct < MIN_DISTINCT_CTAS {
            issues.push(GateIssue::TooFewCtas { distinct });
        }

        let lower_title = draft.title.to_lowercase();
        let lower_body = draft.body.to_lowercase();
        for token in PLACEHOLDER_TOKENS {
            if lower_title.contains(token) || lower_body.contains(token) {
                issues.push(GateIssue::PlaceholderToken {
                    token: (*token).to_string(),
                });
            }
        }

        if !draft.body.contains(self.disclosure_text.as_str()) {
            issues.push(GateIssue::MissingDisclosure);
        }

        for phrase in &self.banned_phrases {
            if lower_body.contains(&phrase.to_lowercase()) {
                issues.push(GateIssue::BannedPhrase {
                    phrase: phrase.clone(),
                });
            }
        }

        if MARKDOWN_LINK.is_match(&draft.body) {
            issues.push(GateIssue::MarkdownExternalLink);
        }

        for anchor in external_anchors(&draft.body) {
            if !anchor.sponsored_nofollow {
                issues.push(GateIssue::MissingSponsoredRel { href: anchor.href });
            }
        }

        let ratio = duplicate_ratio(&draft.body);
        if ratio > self.max_duplicate_ratio {
            issues.push(GateIssue::RepetitiveContent {
                ratio,
                max: self.max_duplicate_ratio,
            });
        }

        if issues.is_empty() {
            Verdict::Accept
        } else {
            Verdict::Reject { issues }
        }
    }
}

/// Distinct CTA URLs in the body that point at a recommended tool's resolved
/// URL. Without recommendations every CTA counts.
fn distinct_recommended_ctas(draft: &Draft) -> usize {
    let ctas = extract_cta_urls(&draft.body);
    if draft.recommendations.is_empty() {
        return ctas.len();
    }
    let resolved: HashSet<&str> = draft
        .recommendations
        .iter()
        .map(|r| r.url.as_str())
        .collect();
    ctas.iter().filter(|u| resolved.contains(u.as_str())).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Recommendation, ToolId};

    const DISCLOSURE: &str = "This article contains affiliate links.";

    fn gate(min_chars: usize) -> QualityGate {
        QualityGate {
            min_chars,
            disclosure_text: DISCLOSURE.to_string(),
            banned_phrases: DEFAULT_BANNED_PHRASES.iter().map(|p| p.to_string()).collect(),
            max_duplicate_ratio: DEFAULT_MAX_DUPLICATE_RATIO,
        }
    }

    fn cta(url: &str, name: &str) -> String {
        format!(r#"<p><a href="{url}" rel="sponsored nofollow" target="_blank">Visit {name}</a></p>"#)
    }

    fn rec(id: &str, url: &str) -> Recommendation {
        Recommendation {
            tool_id: ToolId::new(id).unwrap(),
            name: id.to_string(),
            url: url.to_string(),
        }
    }

    fn draft(body: String) -> Draft {
        Draft {
            keyword: "notion setup guide".to_string(),
            intent: None,
            title: "Notion setup guide".to_string(),
            slug: Slug::new("2024-05-15-notion-setup-guide").unwrap(),
            cta_urls: extract_cta_urls(&body),
            body,
            recommendations: vec![rec("notion", "https://aff.notion.test/r"), rec("canva", "https://canva.com")],
            used_model: false,
        }
    }

    fn good_body() -> String {
        format!(
            "{DISCLOSURE}\n\nNotion keeps meeting notes in one place.\n\n{}\n\nCanva turns those notes into slides.\n\n{}\n\nStart with a single team and measure the hours saved.",
            cta("https://aff.notion.test/r", "Notion"),
            cta("https://canva.com", "Canva"),
        )
    }

    #[test]
    fn compliant_draft_is_accepted() {
        let verdict = gate(50).validate(&draft(good_body()), &HashSet::new());
        assert_eq!(verdict, Verdict::Accept);
    }

    #[test]
    fn single_cta_is_rejected_with_cta_reason() {
        let body = format!(
            "{DISCLOSURE}\n\nOnly one link here.\n\n{}\n\nNothing else follows.",
            cta("https://aff.notion.test/r", "Notion")
        );
        let verdict = gate(10).validate(&draft(body), &HashSet::new());
        assert_eq!(verdict.reason(), Some(&GateIssue::TooFewCtas { distinct: 1 }));
    }

    #[test]
    fn repeated_cta_url_counts_once() {
        let body = format!(
            "{DISCLOSURE}\n\n{}\n\nSome text.\n\n{}",
            cta("https://canva.com", "Canva"),
            cta("https://canva.com", "Canva again")
        );
        assert_eq!(extract_cta_urls(&body), vec!["https://canva.com".to_string()]);
        let verdict = gate(10).validate(&draft(body), &HashSet::new());
        assert!(matches!(verdict.reason(), Some(GateIssue::TooFewCtas { distinct: 1 })));
    }

    #[test]
    fn ctas_to_unrecommended_urls_do_not_count() {
        let body = format!(
            "{DISCLOSURE}\n\n{}\n\n{}",
            cta("https://aff.notion.test/r", "Notion"),
            cta("https://unrelated.io", "Other")
        );
        let verdict = gate(10).validate(&draft(body), &HashSet::new());
        assert_eq!(verdict.reason(), Some(&GateIssue::TooFewCtas { distinct: 1 }));
    }

    #[test]
    fn all_failures_are_collected_in_check_order() {
        let mut d = draft("[Notion](https://notion.so) {{ cta }} guaranteed income".to_string());
        d.title = String::new();
        let mut existing = HashSet::new();
        existing.insert(d.slug.clone());

        let Verdict::Reject { issues } = gate(5000).validate(&d, &existing) else {
            panic!("expected rejection");
        };
        assert_eq!(issues[0], GateIssue::EmptyTitle);
        assert!(matches!(issues[1], GateIssue::TooShort { .. }));
        assert!(matches!(issues[2], GateIssue::DuplicateSlug { .. }));
        assert!(matches!(issues[3], GateIssue::TooFewCtas { distinct: 0 }));
        assert!(issues.contains(&GateIssue::PlaceholderToken { token: "{{".to_string() }));
        assert!(issues.contains(&GateIssue::MissingDisclosure));
        assert!(issues.contains(&GateIssue::BannedPhrase { phrase: "guaranteed income".to_string() }));
        assert!(issues.contains(&GateIssue::MarkdownExternalLink));
    }

    #[test]
    fn external_anchor_without_sponsored_rel_is_flagged() {
        let body = format!(
            "{}\n\n<a href=\"https://plain.example-shop.io\">plain</a>",
            good_body()
        );
        let Verdict::Reject { issues } = gate(10).validate(&draft(body), &HashSet::new()) else {
            panic!("expected rejection");
        };
        assert_eq!(
            issues,
            vec![GateIssue::MissingSponsoredRel {
                href: "https://plain.example-shop.io".to_string()
            }]
        );
    }

    #[test]
    fn repetitive_body_is_rejected() {
        let repeated = "Same sentence here.\n".repeat(10);
        let body = format!("{}\n\n{repeated}", good_body());
        let verdict = gate(10).validate(&draft(body), &HashSet::new());
        assert!(matches!(
            verdict.reason(),
            Some(GateIssue::RepetitiveContent { .. })
        ));
    }

    #[test]
    fn visible_count_ignores_markup_and_whitespace() {
        let text = "---\ntitle: x\n---\n<p>ab c</p>\n\n<a href=\"https://x.io\">d</a>";
        assert_eq!(visible_char_count(text), 4);
    }

    #[test]
    fn duplicate_ratio_of_empty_text_is_zero() {
        assert_eq!(duplicate_ratio(""), 0.0);
        assert!((duplicate_ratio("a.\na.\nb.\nc.") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn rejection_converts_to_pipeline_error() {
        let verdict = Verdict::Reject {
            issues: vec![GateIssue::MissingDisclosure],
        };
        let err = verdict.into_error("kw").unwrap();
        assert_eq!(
            err,
            PipelineError::QualityGateRejected {
                keyword: "kw".to_string(),
                reasons: vec!["affiliate disclosure missing".to_string()],
            }
        );
    }
}
