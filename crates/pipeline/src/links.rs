//! Monetization link resolution.
//!
//! Decides, per tool, which URL a call-to-action presents. Pure functions; no
//! side effects.

use url::Url;

use crate::ToolRecord;

/// Hosts that are never production monetization links. Subdomains match too.
const PLACEHOLDER_HOSTS: &[&str] = &["example.com", "example.org", "example.net", "localhost"];

/// Substrings left behind by unfilled ledger templates.
const PLACEHOLDER_MARKERS: &[&str] = &["replace-me", "your-affiliate-link", "<", ">"];

/// Returns `true` if `url` cannot be a real monetization link.
///
/// Blank values, unparseable URLs, URLs without a host, placeholder hosts and
/// values still carrying template markers all count as placeholders.
pub fn is_placeholder_url(url: &str) -> bool {
    let value = url.trim().to_ascii_lowercase();
    if value.is_empty() {
        return true;
    }
    if PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m)) {
        return true;
    }
    let Ok(parsed) = Url::parse(&value) else {
        return true;
    };
    let Some(host) = parsed.host_str() else {
        return true;
    };
    PLACEHOLDER_HOSTS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")))
}

/// The tool's affiliate link if it counts as a real monetization link.
///
/// Status is not considered here: a real link on a `pending` tool is still
/// real, it just may not be presented yet.
pub fn real_affiliate_url(tool: &ToolRecord) -> Option<&str> {
    tool.affiliate_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !is_placeholder_url(u))
}

/// Returns `true` if the tool's CTA resolves to its affiliate link.
pub fn is_monetizable(tool: &ToolRecord) -> bool {
    tool.status.permits_affiliate() && real_affiliate_url(tool).is_some()
}

/// Resolves the URL a call-to-action for `tool` must link to.
///
/// 1. affiliate link, when the status is `approved`, `active` or
///    `affiliate_ready` and the link is real;
/// 2. otherwise the official URL.
pub fn resolve(tool: &ToolRecord) -> &str {
    if tool.status.permits_affiliate() {
        if let Some(affiliate) = real_affiliate_url(tool) {
            return affiliate;
        }
    }
    tool.official_url.trim()
}
