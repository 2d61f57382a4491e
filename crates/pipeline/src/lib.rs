//! Core publication domain for affipress.
//!
//! This crate contains every domain concept, newtype identifier, ledger record,
//! decision rule, and port trait used by the publication and monetization
//! runs. Infrastructure crates implement the traits defined here; they never
//! add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunId`, `ToolId`, `Slug`) |
//! | [`types`] | Shared value types (`UsdAmount`, `DateWindow`, `Diagnostic`, etc.) |
//! | [`errors`] | Top-level error type |
//! | [`records`] | Typed ledger rows, drafts and articles |
//! | [`config`] | Configuration document and validation |
//! | [`links`] | Monetization link resolution |
//! | [`inventory`] | Keyword selection, refill and recycling |
//! | [`gate`] | Content quality gate |
//! | [`throttle`] | Cost throttle |
//! | [`slug`] | Slug derivation and collision handling |
//! | [`template`] | Deterministic draft producer |
//! | [`revenue`] | Rolling-window revenue aggregation |
//! | [`setup`] | Operational-readiness checklist |
//! | [`ports`] | Traits implemented by infrastructure crates |

pub mod config;
pub mod errors;
pub mod gate;
pub mod identifiers;
pub mod inventory;
pub mod links;
pub mod ports;
pub mod records;
pub mod revenue;
pub mod setup;
pub mod slug;
pub mod template;
pub mod throttle;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    EstimationModel, ProviderKind, RawConfig, SystemConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
pub use errors::PipelineError;
pub use gate::{GateIssue, QualityGate, Verdict};
pub use identifiers::{RunId, Slug, ToolId};
pub use inventory::{
    candidates_from_tools, AcquirePlan, Acquisition, KeywordCandidate, KeywordInventory,
    RecyclePolicy, ShortfallPolicy,
};
pub use ports::{
    ArticleSink, DraftProducer, DraftRequest, LedgerStore, MetricsSource, ProbeResult,
    ReachabilityProbe, SiteInspector,
};
pub use records::{
    AdRevenueRecord, Article, CostRecord, Draft, GeneratedText, KeywordRecord, KeywordStatus,
    MetricsRecord, Recommendation, ToolRecord, ToolStatus,
};
pub use revenue::{RevenueSummary, TrafficNeed};
pub use setup::{ChecklistItem, Reachability, SetupScore, SetupSnapshot};
pub use template::TemplateProducer;
pub use throttle::ThrottleDecision;
pub use types::{
    DateWindow, Diagnostic, LedgerKind, MonthlyCap, Parsed, UsdAmount, YearMonth,
};
