//! Keyword inventory management.
//!
//! [`KeywordInventory`] owns a snapshot of the keyword ledger for the duration
//! of a run. It selects the next keywords, keeps the `pending` pool above a
//! configured floor by generating new rows from tool names, and optionally
//! recycles old `used` rows when nothing else is left. The caller writes the
//! mutated snapshot back through the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::records::normalize_keyword;
use crate::{KeywordRecord, KeywordStatus, PipelineError, ToolRecord};

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What happens to `used` keywords once no `pending` keyword remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecyclePolicy {
    /// `used` keywords are never selected again.
    #[default]
    Never,
    /// The oldest `used` keywords (by `last_used_date`, undated first) are
    /// returned to `pending`, up to the shortfall.
    OldestUsed,
}

/// What happens when fewer keywords are available than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Accept a shorter selection.
    #[default]
    Degrade,
    /// Fail with [`PipelineError::InventoryExhausted`].
    Strict,
}

// ---------------------------------------------------------------------------
// Candidate generation
// ---------------------------------------------------------------------------

/// A keyword that refill may append as a new `pending` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCandidate {
    pub keyword: String,
    pub intent: String,
    pub priority: i64,
}

/// Modifier templates combined with every tool name: `(pattern, intent, priority)`.
const MODIFIER_TEMPLATES: &[(&str, &str, i64)] = &[
    ("{tool} setup guide", "wants a step-by-step rollout that avoids common mistakes", 1),
    ("{tool} pricing comparison", "wants to judge cost against value", 2),
    ("{tool} use cases", "wants concrete examples of the tool in practice", 2),
    ("{tool} for beginners", "wants to know where to start", 3),
    ("{tool} workflow automation", "wants to save time in day-to-day work", 3),
];

/// Builds refill candidates: every named tool crossed with every modifier
/// template, tool-major, in ledger order.
pub fn candidates_from_tools(tools: &[ToolRecord]) -> Vec<KeywordCandidate> {
    tools
        .iter()
        .map(|t| t.name.trim())
        .filter(|name| !name.is_empty())
        .flat_map(|name| {
            MODIFIER_TEMPLATES
                .iter()
                .map(move |(pattern, intent, priority)| KeywordCandidate {
                    keyword: pattern.replace("{tool}", name),
                    intent: (*intent).to_string(),
                    priority: *priority,
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// Parameters for [`KeywordInventory::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePlan {
    pub count: usize,
    pub pool_min: usize,
    pub add_limit: usize,
    pub recycle: RecyclePolicy,
    pub shortfall: ShortfallPolicy,
}

/// What [`KeywordInventory::acquire`] did, for logging and run summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acquisition {
    pub selected: Vec<KeywordRecord>,
    pub added: usize,
    pub recycled: usize,
    pub pending_after: usize,
}

/// In-memory snapshot of the keyword ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordInventory {
    rows: Vec<KeywordRecord>,
}

impl KeywordInventory {
    pub fn new(rows: Vec<KeywordRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[KeywordRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<KeywordRecord> {
        self.rows
    }

    /// Number of rows currently `pending`.
    pub fn pending_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status == KeywordStatus::Pending)
            .count()
    }

    /// Selects up to `n` pending keywords ordered by `(priority ascending,
    /// insertion order)`, marks them `used` and stamps `last_used_date`.
    ///
    /// Returns the selected rows as they are after the update.
    pub fn select(&mut self, n: usize, today: NaiveDate) -> Vec<KeywordRecord> {
        let mut pending: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == KeywordStatus::Pending)
            .map(|(i, _)| i)
            .collect();
        // Stable sort keeps insertion order among equal priorities.
        pending.sort_by_key(|&i| self.rows[i].priority);

        pending
            .into_iter()
            .take(n)
            .map(|i| {
                let row = &mut self.rows[i];
                row.status = KeywordStatus::Used;
                row.last_used_date = Some(today);
                debug!(keyword = %row.keyword, priority = row.priority, "Selected keyword");
                row.clone()
            })
            .collect()
    }

    /// Tops the pending pool up towards `pool_min`.
    ///
    /// Appends at most `min(pool_min - pending, add_limit)` new `pending` rows
    /// drawn from `candidates`, skipping any keyword that already exists in
    /// the ledger (any status) case- and whitespace-insensitively. Returns the
    /// number of rows added; zero when the pool is already at the floor.
    pub fn refill(
        &mut self,
        pool_min: usize,
        add_limit: usize,
        candidates: &[KeywordCandidate],
    ) -> usize {
        let pending = self.pending_count();
        let needed = pool_min.saturating_sub(pending).min(add_limit);
        if needed == 0 {
            debug!(pending, pool_min, "Keyword pool sufficient");
            return 0;
        }

        let mut existing: HashSet<String> =
            self.rows.iter().map(KeywordRecord::normalized_key).collect();
        let mut added = 0;
        for candidate in candidates {
            if added >= needed {
                break;
            }
            let key = normalize_keyword(&candidate.keyword);
            if key.is_empty() || !existing.insert(key) {
                continue;
            }
            self.rows.push(KeywordRecord::pending(
                candidate.keyword.clone(),
                Some(candidate.intent.clone()),
                candidate.priority,
            ));
            added += 1;
        }

        info!(added, pending_before = pending, pool_min, "Refilled keyword pool");
        added
    }

    /// Applies `policy` to return up to `wanted` `used` rows to `pending`.
    /// Returns the number of rows recycled.
    pub fn recycle(&mut self, policy: RecyclePolicy, wanted: usize) -> usize {
        if policy == RecyclePolicy::Never || wanted == 0 {
            return 0;
        }

        let mut used: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == KeywordStatus::Used)
            .map(|(i, _)| i)
            .collect();
        // `None` sorts before any date, so never-dated rows are oldest.
        used.sort_by_key(|&i| self.rows[i].last_used_date);

        let recycled = used.len().min(wanted);
        for &i in used.iter().take(recycled) {
            self.rows[i].status = KeywordStatus::Pending;
        }
        if recycled > 0 {
            info!(recycled, "Recycled used keywords");
        }
        recycled
    }

    /// Refills, recycles when nothing is pending, then selects.
    ///
    /// Under [`ShortfallPolicy::Strict`] the inventory is left unchanged by the
    /// selection step when fewer than `plan.count` keywords are available.
    pub fn acquire(
        &mut self,
        plan: AcquirePlan,
        candidates: &[KeywordCandidate],
        today: NaiveDate,
    ) -> Result<Acquisition, PipelineError> {
        let added = self.refill(plan.pool_min, plan.add_limit, candidates);

        let mut recycled = 0;
        if self.pending_count() == 0 {
            recycled = self.recycle(plan.recycle, plan.count);
        }

        let available = self.pending_count();
        if available < plan.count && plan.shortfall == ShortfallPolicy::Strict {
            return Err(PipelineError::InventoryExhausted {
                requested: plan.count,
                available,
            });
        }

        let selected = self.select(plan.count, today);
        Ok(Acquisition {
            selected,
            added,
            recycled,
            pending_after: self.pending_count(),
        })
    }
}
