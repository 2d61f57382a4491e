//! Stand-alone keyword pool refill.

use serde::Serialize;
use tracing::{info, info_span};

use pipeline::{candidates_from_tools, KeywordInventory, LedgerStore, PipelineError, SystemConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefillReport {
    pub dry_run: bool,
    pub pending_before: usize,
    pub added: usize,
    pub pending_after: usize,
    pub added_keywords: Vec<String>,
}

/// Tops the pending pool up to `growth.min_keyword_pool` and writes the ledger
/// back unless `dry_run` is set. Nothing is written when no row was added.
pub fn refill_keywords(
    config: &SystemConfig,
    store: &dyn LedgerStore,
    dry_run: bool,
) -> Result<RefillReport, PipelineError> {
    let _span = info_span!("keyword_refill", dry_run).entered();

    let tools = store.load_tools()?;
    let keywords = store.load_keywords()?;
    let existing = keywords.rows.len();

    let mut inventory = KeywordInventory::new(keywords.rows);
    let pending_before = inventory.pending_count();
    let added = inventory.refill(
        config.growth.min_keyword_pool,
        config.growth.keyword_add_limit,
        &candidates_from_tools(&tools.rows),
    );

    if added > 0 && !dry_run {
        store.save_keywords(inventory.rows())?;
    }
    info!(pending_before, added, "Keyword refill finished");

    Ok(RefillReport {
        dry_run,
        pending_before,
        added,
        pending_after: inventory.pending_count(),
        added_keywords: inventory.rows()[existing..]
            .iter()
            .map(|k| k.keyword.clone())
            .collect(),
    })
}
