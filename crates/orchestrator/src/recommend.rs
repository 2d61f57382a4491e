//! Recommendation selection.
//!
//! Picks the tools an article recommends and resolves each one's CTA URL. The
//! niche of a keyword is the category of the first tool named in it; tools of
//! that niche are preferred, and the selection widens to the whole ledger when
//! the niche cannot supply two distinct URLs.

use std::collections::HashSet;

use pipeline::gate::MIN_DISTINCT_CTAS;
use pipeline::links;
use pipeline::{Recommendation, ToolRecord};

/// The first tool whose name occurs in `keyword` (case-insensitive).
pub fn mentioned_tool<'a>(keyword: &str, tools: &'a [ToolRecord]) -> Option<&'a ToolRecord> {
    let keyword = keyword.to_lowercase();
    tools.iter().find(|t| {
        let name = t.name.trim().to_lowercase();
        !name.is_empty() && keyword.contains(&name)
    })
}

fn same_category(a: &ToolRecord, category: &str) -> bool {
    a.category
        .as_deref()
        .map(str::trim)
        .is_some_and(|c| c.eq_ignore_ascii_case(category))
}

/// Mentioned tool first, then monetizable tools, then ledger order.
fn ordered<'a>(tools: Vec<&'a ToolRecord>, mentioned: Option<&ToolRecord>) -> Vec<&'a ToolRecord> {
    let mut tools = tools;
    tools.sort_by_key(|t| {
        let is_mentioned = mentioned.is_some_and(|m| m.id == t.id);
        (!is_mentioned, !links::is_monetizable(t))
    });
    tools
}

fn distinct_urls(tools: &[&ToolRecord]) -> usize {
    tools
        .iter()
        .map(|t| links::resolve(t))
        .filter(|u| !u.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Selects at most `max` tools to recommend for `keyword`, each with a
/// distinct resolved URL.
pub fn recommend(keyword: &str, tools: &[ToolRecord], max: usize) -> Vec<Recommendation> {
    let mentioned = mentioned_tool(keyword, tools);
    let niche = mentioned
        .and_then(|t| t.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let (in_niche, rest): (Vec<&ToolRecord>, Vec<&ToolRecord>) = match niche {
        Some(category) => tools.iter().partition(|t| same_category(t, category)),
        None => (tools.iter().collect(), Vec::new()),
    };

    let mut candidates = ordered(in_niche, mentioned);
    if distinct_urls(&candidates) < MIN_DISTINCT_CTAS {
        candidates.extend(ordered(rest, mentioned));
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|t| {
            let url = links::resolve(t);
            (!url.is_empty() && seen.insert(url.to_string())).then(|| Recommendation {
                tool_id: t.id.clone(),
                name: t.name.clone(),
                url: url.to_string(),
            })
        })
        .take(max)
        .collect()
}
