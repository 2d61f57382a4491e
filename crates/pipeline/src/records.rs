//! Typed ledger records and article values.
//!
//! One struct per ledger row. Rows are parsed and validated at the store
//! boundary (see the `ledger` crate); everything in this crate operates on
//! these typed values only.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Slug, ToolId, UsdAmount, YearMonth};

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Partnership status of a tool in the tool ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Approved,
    Active,
    AffiliateReady,
    Pending,
    Rejected,
}

impl ToolStatus {
    /// Parses a ledger value (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "active" => Some(Self::Active),
            "affiliate_ready" => Some(Self::AffiliateReady),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns `true` for the statuses under which an affiliate link may be
    /// presented.
    pub fn permits_affiliate(self) -> bool {
        matches!(self, Self::Approved | Self::Active | Self::AffiliateReady)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Active => "active",
            Self::AffiliateReady => "affiliate_ready",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the tool ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: ToolId,
    pub name: String,
    /// Niche the tool belongs to; tools sharing a category are recommended
    /// together.
    pub category: Option<String>,
    pub status: ToolStatus,
    pub official_url: String,
    /// Raw affiliate link as written in the ledger. Whether it counts as a
    /// real monetization link is decided by [`crate::links`].
    pub affiliate_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// Lifecycle state of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordStatus {
    /// Waiting to be turned into an article.
    Pending,
    /// Already selected by a run.
    Used,
    /// Held back by an operator; never selected.
    Reserved,
}

impl KeywordStatus {
    /// Parses a ledger value. Blank and the legacy values `new` / `ready`
    /// mean [`KeywordStatus::Pending`].
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "pending" | "new" | "ready" => Some(Self::Pending),
            "used" => Some(Self::Used),
            "reserved" => Some(Self::Reserved),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Used => "used",
            Self::Reserved => "reserved",
        }
    }
}

impl std::fmt::Display for KeywordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the keyword ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub keyword: String,
    /// Search intent the article should answer.
    pub intent: Option<String>,
    pub status: KeywordStatus,
    /// Ordinal; lower is selected sooner.
    pub priority: i64,
    pub last_used_date: Option<NaiveDate>,
}

impl KeywordRecord {
    /// A fresh `pending` keyword.
    pub fn pending(keyword: impl Into<String>, intent: Option<String>, priority: i64) -> Self {
        Self {
            keyword: keyword.into(),
            intent,
            status: KeywordStatus::Pending,
            priority,
            last_used_date: None,
        }
    }

    /// Key used for case- and whitespace-insensitive deduplication.
    pub fn normalized_key(&self) -> String {
        normalize_keyword(&self.keyword)
    }
}

/// Lower-cases `value` and strips every whitespace character.
pub fn normalize_keyword(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Costs, revenue, metrics
// ---------------------------------------------------------------------------

/// One row of the monthly cost ledger. Several rows may share a month; they
/// are summed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub month: YearMonth,
    pub total_usd: UsdAmount,
}

/// One manually curated row of the ad-revenue ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRevenueRecord {
    pub date: NaiveDate,
    pub adsense_revenue_usd: UsdAmount,
    pub source: String,
    pub note: String,
}

/// One row of the analytics metrics ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub date: NaiveDate,
    pub pageviews: u64,
    pub clicks: u64,
}

// ---------------------------------------------------------------------------
// Drafts and articles
// ---------------------------------------------------------------------------

/// A tool recommended in an article, with the URL its call-to-action links to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub tool_id: ToolId,
    pub name: String,
    /// Output of [`crate::links::resolve`] for the tool.
    pub url: String,
}

/// Raw text returned by a [`crate::DraftProducer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub title: String,
    pub body: String,
    /// `true` when the text came from a language model rather than the
    /// deterministic template.
    pub used_model: bool,
}

/// A candidate article awaiting the quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub keyword: String,
    pub intent: Option<String>,
    pub title: String,
    pub slug: Slug,
    pub body: String,
    /// Distinct call-to-action hrefs found in the body, in body order.
    pub cta_urls: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub used_model: bool,
}

/// A draft that passed the gate and is ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub draft: Draft,
    pub published_at: DateTime<FixedOffset>,
}

impl Article {
    pub fn slug(&self) -> &Slug {
        &self.draft.slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keyword_statuses_mean_pending() {
        assert_eq!(KeywordStatus::parse("new"), Some(KeywordStatus::Pending));
        assert_eq!(KeywordStatus::parse(" Ready "), Some(KeywordStatus::Pending));
        assert_eq!(KeywordStatus::parse(""), Some(KeywordStatus::Pending));
        assert_eq!(KeywordStatus::parse("USED"), Some(KeywordStatus::Used));
        assert_eq!(KeywordStatus::parse("archived"), None);
    }

    #[test]
    fn only_partnered_statuses_permit_affiliate_links() {
        for status in ["approved", "active", "affiliate_ready"] {
            assert!(ToolStatus::parse(status).unwrap().permits_affiliate());
        }
        for status in ["pending", "rejected"] {
            assert!(!ToolStatus::parse(status).unwrap().permits_affiliate());
        }
    }

    #[test]
    fn normalization_ignores_case_and_spacing() {
        assert_eq!(normalize_keyword("Notion  AI Pricing"), "notionaipricing");
        assert_eq!(
            normalize_keyword("notion ai pricing"),
            normalize_keyword("NotionAI\tPricing")
        );
    }
}
