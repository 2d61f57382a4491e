//! [`MetricsSource`] backed by the analytics metrics ledger.
//!
//! The ledger is filled by an external sync job. A missing file means no sync
//! has happened yet and is reported as an unavailable source, which the
//! aggregator turns into zeros.

use async_trait::async_trait;
use std::path::PathBuf;

use pipeline::{DateWindow, LedgerKind, MetricsRecord, MetricsSource, Parsed, PipelineError};

use crate::error::LedgerError;
use crate::store::{columns, parse_metrics, parse_rows};
use crate::table::read_table;

#[derive(Debug, Clone)]
pub struct LedgerMetricsSource {
    path: PathBuf,
}

impl LedgerMetricsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MetricsSource for LedgerMetricsSource {
    async fn metrics(&self, window: DateWindow) -> Result<Parsed<MetricsRecord>, PipelineError> {
        let table = match read_table(&self.path, columns::METRICS) {
            Ok(table) => table,
            Err(LedgerError::NotFound { path }) => {
                return Err(PipelineError::unavailable(
                    "metrics ledger",
                    format!("{} not found", path.display()),
                ))
            }
            Err(err) => return Err(err.into()),
        };
        let mut parsed = parse_rows(&table, LedgerKind::Metrics, parse_metrics);
        parsed.rows.retain(|m| window.contains(m.date));
        Ok(parsed)
    }
}
