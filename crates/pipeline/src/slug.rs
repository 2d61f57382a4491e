//! Article slug derivation.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::Slug;

/// Fallback used when a keyword has no ASCII alphanumeric content.
const EMPTY_SLUG: &str = "post";

/// Lower-cases `text` and reduces it to ASCII alphanumerics separated by
/// single hyphens. Returns `"post"` when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Allocates `YYYY-MM-DD-<slugified keyword>`, appending `-2`, `-3`, … until
/// the result is not in `taken`.
///
/// The caller adds the returned slug to `taken` once the article is accepted
/// so later drafts of the same run cannot reuse it.
pub fn allocate_slug(date: NaiveDate, keyword: &str, taken: &HashSet<Slug>) -> Slug {
    let base = format!("{}-{}", date.format("%Y-%m-%d"), slugify(keyword));
    let mut candidate = Slug::from_generated(base.clone());
    let mut suffix = 2u32;
    while taken.contains(&candidate) {
        candidate = Slug::from_generated(format!("{base}-{suffix}"));
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Notion AI -- Pricing!  "), "notion-ai-pricing");
        assert_eq!(slugify("ChatGPT_for Teams"), "chatgpt-for-teams");
    }

    #[test]
    fn slugify_falls_back_for_non_ascii_keywords() {
        assert_eq!(slugify("料金 比較"), "post");
        assert_eq!(slugify(""), "post");
    }

    #[test]
    fn collisions_get_numeric_suffixes() {
        let mut taken = HashSet::new();
        let first = allocate_slug(day(), "Notion setup guide", &taken);
        assert_eq!(first.as_str(), "2024-05-15-notion-setup-guide");
        taken.insert(first);

        let second = allocate_slug(day(), "notion  setup guide", &taken);
        assert_eq!(second.as_str(), "2024-05-15-notion-setup-guide-2");
        taken.insert(second);

        let third = allocate_slug(day(), "Notion Setup Guide", &taken);
        assert_eq!(third.as_str(), "2024-05-15-notion-setup-guide-3");
    }
}
