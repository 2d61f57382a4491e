//! affipress file infrastructure adapter.
//!
//! Implements the storage-facing traits defined in the [`pipeline`] crate
//! over the files of the site repository: CSV ledgers, Markdown articles,
//! the site configuration and the workspace layout.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Rows are
//! parsed and validated here; every decision about them is made in
//! [`pipeline`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`store`] | [`CsvLedgerStore`] (`LedgerStore`) |
//! | [`sink`] | [`MarkdownPostSink`] (`ArticleSink`), [`read_article`] |
//! | [`metrics`] | [`LedgerMetricsSource`] (`MetricsSource`) |
//! | [`site`] | [`SiteWorkspace`] (`SiteInspector`) |
//! | [`tracking`] | GA4 / AdSense IDs in `_config.yml` |
//! | [`table`] | CSV tables and atomic writes |
//! | [`error`] | [`LedgerError`] |

pub mod error;
pub mod metrics;
pub mod site;
pub mod sink;
pub mod store;
pub mod table;
pub mod tracking;

pub use error::LedgerError;
pub use metrics::LedgerMetricsSource;
pub use site::SiteWorkspace;
pub use sink::{read_article, MarkdownPostSink};
pub use store::{CsvLedgerStore, LedgerPaths};
pub use table::write_atomic as write_report;
pub use tracking::{read_tracking_ids, write_tracking_ids, TrackingIds};
