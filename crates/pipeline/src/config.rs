//! System configuration model.
//!
//! The configuration document is deserialised into [`RawConfig`], where every
//! key is optional, and then checked by [`RawConfig::validate`], which reports
//! every missing or invalid key at once. Only a validated [`SystemConfig`]
//! reaches the rest of the crate.

use serde::{Deserialize, Serialize};

use crate::{MonthlyCap, PipelineError, RecyclePolicy, ShortfallPolicy, UsdAmount};

// ---------------------------------------------------------------------------
// Raw document (as written)
// ---------------------------------------------------------------------------

/// The configuration document exactly as written; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub site: RawSite,
    pub content: RawContent,
    pub generation: RawGeneration,
    pub affiliate: RawAffiliate,
    pub cost: RawCost,
    pub growth: RawGrowth,
    pub revenue: RawRevenue,
    pub reporting: RawReporting,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSite {
    pub base_url: Option<String>,
    pub title: Option<String>,
    pub utc_offset_hours: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawContent {
    pub posts_per_run: Option<i64>,
    pub min_chars: Option<i64>,
    pub max_recommendations: Option<i64>,
    pub require_full_batch: Option<bool>,
    pub banned_phrases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGeneration {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAffiliate {
    pub disclosure_text: Option<String>,
    /// Legacy location of the per-click rate.
    pub default_epc_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCost {
    pub max_monthly_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGrowth {
    pub min_keyword_pool: Option<i64>,
    pub keyword_add_limit: Option<i64>,
    pub recycle_used: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRevenue {
    pub model: Option<String>,
    pub epc_usd: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub payout_usd: Option<f64>,
    pub target_daily_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReporting {
    pub ad_revenue_csv: Option<String>,
    pub live_check_timeout_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Validated system configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemConfig {
    pub site: SiteSettings,
    pub content: ContentSettings,
    pub generation: GenerationSettings,
    pub disclosure_text: String,
    pub max_monthly_usd: MonthlyCap,
    pub growth: GrowthSettings,
    pub revenue: RevenueSettings,
    pub reporting: ReportingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSettings {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub title: String,
    /// Offset of the operator's local time zone; "today" is computed in it.
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSettings {
    pub posts_per_run: usize,
    pub min_chars: usize,
    pub max_recommendations: usize,
    pub shortfall: ShortfallPolicy,
    pub banned_phrases: Vec<String>,
}

/// Which text producer a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    HuggingFace,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSettings {
    pub min_keyword_pool: usize,
    pub keyword_add_limit: usize,
    pub recycle: RecyclePolicy,
}

/// How estimated affiliate revenue is derived from traffic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EstimationModel {
    /// `clicks × epc`.
    PerClick { epc: UsdAmount },
    /// `clicks × conversion_rate × payout`.
    PerConversion {
        conversion_rate: f64,
        payout: UsdAmount,
    },
}

impl EstimationModel {
    /// Estimated revenue for `clicks` affiliate clicks.
    pub fn estimate(self, clicks: u64) -> UsdAmount {
        let value = match self {
            Self::PerClick { epc } => clicks as f64 * epc.as_f64(),
            Self::PerConversion {
                conversion_rate,
                payout,
            } => clicks as f64 * conversion_rate * payout.as_f64(),
        };
        UsdAmount::new(value).unwrap_or_default()
    }

    /// Expected revenue of a single click.
    pub fn value_per_click(self) -> f64 {
        self.estimate(1).as_f64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSettings {
    pub model: EstimationModel,
    pub target_daily_usd: UsdAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportingSettings {
    pub ad_revenue_csv: String,
    pub live_check_timeout_secs: u64,
}

pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

impl RawConfig {
    /// Validates the document, collecting every problem before failing.
    pub fn validate(self) -> Result<SystemConfig, PipelineError> {
        let mut problems: Vec<String> = Vec::new();

        let base_url = match non_blank(self.site.base_url) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                problems.push("site.base_url is required".to_string());
                String::new()
            }
        };

        let utc_offset_hours = match self.site.utc_offset_hours {
            Some(h) if (-12..=14).contains(&h) => h,
            Some(h) => {
                problems.push(format!(
                    "site.utc_offset_hours must be between -12 and 14 (got {h})"
                ));
                9
            }
            None => 9,
        };

        let posts_per_run = match self.content.posts_per_run {
            Some(n) if n >= 1 => n as usize,
            Some(n) => {
                problems.push(format!("content.posts_per_run must be >= 1 (got {n})"));
                1
            }
            None => {
                problems.push("content.posts_per_run is required".to_string());
                1
            }
        };

        let min_chars = positive(&mut problems, "content.min_chars", self.content.min_chars, 1400);
        let max_recommendations = positive(
            &mut problems,
            "content.max_recommendations",
            self.content.max_recommendations,
            3,
        )
        .max(2);

        let provider = match self.generation.provider.as_deref().map(str::trim) {
            None | Some("huggingface") | Some("huggingface_free") => ProviderKind::HuggingFace,
            Some("template") => ProviderKind::Template,
            Some(other) => {
                problems.push(format!("generation.provider '{other}' is not supported"));
                ProviderKind::Template
            }
        };

        let disclosure_text = match non_blank(self.affiliate.disclosure_text) {
            Some(text) => text,
            None => {
                problems.push("affiliate.disclosure_text is required".to_string());
                String::new()
            }
        };

        let max_monthly_usd = match self.cost.max_monthly_usd {
            Some(v) => {
                let cap = MonthlyCap::new(v);
                if cap.is_none() {
                    problems.push(format!("cost.max_monthly_usd must be > 0 (got {v})"));
                }
                cap
            }
            None => {
                problems.push("cost.max_monthly_usd is required".to_string());
                None
            }
        };

        let min_keyword_pool = positive(
            &mut problems,
            "growth.min_keyword_pool",
            self.growth.min_keyword_pool,
            80,
        );
        let keyword_add_limit = positive(
            &mut problems,
            "growth.keyword_add_limit",
            self.growth.keyword_add_limit,
            40,
        );

        let model = validate_revenue(&mut problems, &self.revenue, self.affiliate.default_epc_usd);
        let target_daily_usd = match self.revenue.target_daily_usd {
            None => UsdAmount::new(1.0).unwrap_or_default(),
            Some(v) => UsdAmount::new(v).unwrap_or_else(|| {
                problems.push(format!("revenue.target_daily_usd must be >= 0 (got {v})"));
                UsdAmount::zero()
            }),
        };

        let max_monthly_usd = match max_monthly_usd {
            Some(cap) if problems.is_empty() => cap,
            _ => return Err(PipelineError::config(problems.join("; "))),
        };

        Ok(SystemConfig {
            site: SiteSettings {
                base_url,
                title: non_blank(self.site.title).unwrap_or_default(),
                utc_offset_hours,
            },
            content: ContentSettings {
                posts_per_run,
                min_chars,
                max_recommendations,
                shortfall: if self.content.require_full_batch.unwrap_or(false) {
                    ShortfallPolicy::Strict
                } else {
                    ShortfallPolicy::Degrade
                },
                banned_phrases: self.content.banned_phrases.unwrap_or_default(),
            },
            generation: GenerationSettings {
                provider,
                model: non_blank(self.generation.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                endpoint: non_blank(self.generation.endpoint)
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                timeout_secs: self.generation.timeout_secs.unwrap_or(60),
            },
            disclosure_text,
            max_monthly_usd,
            growth: GrowthSettings {
                min_keyword_pool,
                keyword_add_limit,
                recycle: if self.growth.recycle_used.unwrap_or(false) {
                    RecyclePolicy::OldestUsed
                } else {
                    RecyclePolicy::Never
                },
            },
            revenue: RevenueSettings {
                model,
                target_daily_usd,
            },
            reporting: ReportingSettings {
                ad_revenue_csv: non_blank(self.reporting.ad_revenue_csv)
                    .unwrap_or_else(|| "data/ad_revenue.csv".to_string()),
                live_check_timeout_secs: self.reporting.live_check_timeout_secs.unwrap_or(8),
            },
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn positive(problems: &mut Vec<String>, key: &str, value: Option<i64>, default: usize) -> usize {
    match value {
        None => default,
        Some(v) if v >= 1 => v as usize,
        Some(v) => {
            problems.push(format!("{key} must be >= 1 (got {v})"));
            default
        }
    }
}

fn validate_revenue(
    problems: &mut Vec<String>,
    revenue: &RawRevenue,
    legacy_epc: Option<f64>,
) -> EstimationModel {
    let zero = EstimationModel::PerClick {
        epc: UsdAmount::zero(),
    };
    match revenue.model.as_deref().map(str::trim).unwrap_or("per_click") {
        "per_click" => match revenue.epc_usd.or(legacy_epc) {
            Some(v) => match UsdAmount::new(v) {
                Some(epc) => EstimationModel::PerClick { epc },
                None => {
                    problems.push(format!("revenue.epc_usd must be >= 0 (got {v})"));
                    zero
                }
            },
            None => {
                problems.push("revenue.epc_usd (or affiliate.default_epc_usd) is required".to_string());
                zero
            }
        },
        "per_conversion" => {
            let rate = revenue.conversion_rate;
            let payout = revenue.payout_usd.and_then(UsdAmount::new);
            match (rate, payout) {
                (Some(r), Some(payout)) if (0.0..=1.0).contains(&r) => EstimationModel::PerConversion {
                    conversion_rate: r,
                    payout,
                },
                _ => {
                    problems.push(
                        "revenue.conversion_rate in [0, 1] and revenue.payout_usd >= 0 are required for per_conversion"
                            .to_string(),
                    );
                    zero
                }
            }
        }
        other => {
            problems.push(format!("revenue.model '{other}' is not supported"));
            zero
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
site:
  base_url: "https://auto.example-site.dev/"
  title: "Auto Lab"
content:
  posts_per_run: 2
  min_chars: 800
generation:
  provider: "template"
affiliate:
  disclosure_text: "This article contains affiliate links"
  default_epc_usd: 0.01
cost:
  max_monthly_usd: 100
growth:
  min_keyword_pool: 5
  keyword_add_limit: 10
"#;

    fn parse(yaml: &str) -> Result<SystemConfig, PipelineError> {
        serde_yaml::from_str::<RawConfig>(yaml).unwrap().validate()
    }

    #[test]
    fn full_document_validates_with_defaults() {
        let cfg = parse(FULL).unwrap();
        assert_eq!(cfg.site.base_url, "https://auto.example-site.dev");
        assert_eq!(cfg.site.utc_offset_hours, 9);
        assert_eq!(cfg.content.posts_per_run, 2);
        assert_eq!(cfg.content.max_recommendations, 3);
        assert_eq!(cfg.content.shortfall, ShortfallPolicy::Degrade);
        assert_eq!(cfg.generation.provider, ProviderKind::Template);
        assert_eq!(cfg.growth.min_keyword_pool, 5);
        assert_eq!(cfg.growth.recycle, RecyclePolicy::Never);
        assert!((cfg.revenue.model.value_per_click() - 0.01).abs() < 1e-12);
        assert_eq!(cfg.reporting.ad_revenue_csv, "data/ad_revenue.csv");
    }

    #[test]
    fn every_missing_key_is_reported() {
        let err = parse("site: {}\n").unwrap_err();
        let PipelineError::Config { message } = err else {
            panic!("expected config error");
        };
        for key in [
            "site.base_url",
            "content.posts_per_run",
            "affiliate.disclosure_text",
            "cost.max_monthly_usd",
            "revenue.epc_usd",
        ] {
            assert!(message.contains(key), "{key} missing from: {message}");
        }
    }

    #[test]
    fn utc_offset_outside_real_zones_is_invalid() {
        let yaml = FULL.replace("  title: \"Auto Lab\"", "  title: \"Auto Lab\"\n  utc_offset_hours: 700000");
        let Err(PipelineError::Config { message }) = parse(&yaml) else {
            panic!("expected a config error");
        };
        assert!(message.contains("site.utc_offset_hours"));

        let yaml = FULL.replace("  title: \"Auto Lab\"", "  title: \"Auto Lab\"\n  utc_offset_hours: -5");
        assert_eq!(parse(&yaml).unwrap().site.utc_offset_hours, -5);
    }

    #[test]
    fn zero_posts_per_run_is_invalid() {
        let yaml = FULL.replace("posts_per_run: 2", "posts_per_run: 0");
        assert!(matches!(parse(&yaml), Err(PipelineError::Config { .. })));
    }

    #[test]
    fn per_conversion_model_estimates_from_rate_and_payout() {
        let yaml = format!(
            "{FULL}\nrevenue:\n  model: per_conversion\n  conversion_rate: 0.02\n  payout_usd: 5.0\n"
        );
        let cfg = parse(&yaml).unwrap();
        let estimate = cfg.revenue.model.estimate(100);
        assert!((estimate.as_f64() - 10.0).abs() < 1e-9);
    }
}
