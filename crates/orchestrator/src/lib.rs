//! Orchestration of affipress runs.
//!
//! Composes the pure rules of the `pipeline` crate with the port traits it
//! defines. Concrete adapters are injected by the CLI.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Depends on `pipeline` only; never on an infrastructure
//! crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`publish`] | The daily publication run |
//! | [`recommend`] | Recommendation selection per keyword |
//! | [`refill`] | Stand-alone keyword pool refill |
//! | [`aggregate`] | Revenue windows, setup scoring, audit, ad-revenue validation |
//! | [`render`] | Markdown rendering of aggregator reports |

pub mod aggregate;
pub mod publish;
pub mod recommend;
pub mod refill;
pub mod render;

#[cfg(test)]
mod testing;

pub use aggregate::{
    AuditReport, ChecklistReport, Dashboard, MonetizationRun, RevenueValidation, WeeklyReport,
};
pub use publish::{KeywordOutcome, KeywordReport, PublicationOutcome, PublicationRun, RunReport};
pub use recommend::recommend;
pub use refill::{refill_keywords, RefillReport};
