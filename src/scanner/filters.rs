/// Filter predicate and filter spec
///
/// A filter spec is what a list asks the snapshot API for, and the same spec is
/// re-applied locally whenever records arrive from the live stream. Every rule
/// must hold for a record to pass; an absent constraint always passes.
///
/// Debug logging: enable with `--debug-filtering` to log each rejection reason.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::sort::SortDirection;
use super::types::{AssetRecord, Chain};
use crate::arguments::is_debug_filtering_enabled;
use crate::logger::{self, LogTag};

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Server-side ranking field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankBy {
    #[default]
    Volume,
    Age,
    Trending,
    Buys,
    Sells,
    Txns,
    Mcap,
    Liquidity,
    #[serde(rename = "price5M")]
    Price5M,
    #[serde(rename = "price1H")]
    Price1H,
    #[serde(rename = "price6H")]
    Price6H,
    #[serde(rename = "price24H")]
    Price24H,
}

impl RankBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankBy::Volume => "volume",
            RankBy::Age => "age",
            RankBy::Trending => "trending",
            RankBy::Buys => "buys",
            RankBy::Sells => "sells",
            RankBy::Txns => "txns",
            RankBy::Mcap => "mcap",
            RankBy::Liquidity => "liquidity",
            RankBy::Price5M => "price5M",
            RankBy::Price1H => "price1H",
            RankBy::Price6H => "price6H",
            RankBy::Price24H => "price24H",
        }
    }
}

/// Per-list filter configuration, replaced wholesale on change
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(rename = "rankBy")]
    pub rank_by: RankBy,
    #[serde(rename = "orderBy")]
    pub order_by: SortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
    #[serde(rename = "minVol24H", skip_serializing_if = "Option::is_none")]
    pub min_vol_24h: Option<f64>,
    #[serde(rename = "maxVol24H", skip_serializing_if = "Option::is_none")]
    pub max_vol_24h: Option<f64>,
    /// Seconds
    #[serde(rename = "maxAge", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    /// Seconds
    #[serde(rename = "minAge", skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u64>,
    #[serde(rename = "isNotHP", skip_serializing_if = "Option::is_none")]
    pub exclude_honeypots: Option<bool>,
    #[serde(rename = "isVerified", skip_serializing_if = "Option::is_none")]
    pub verified_only: Option<bool>,
    #[serde(rename = "minLiq", skip_serializing_if = "Option::is_none")]
    pub min_liq: Option<f64>,
    #[serde(rename = "maxLiq", skip_serializing_if = "Option::is_none")]
    pub max_liq: Option<f64>,
    #[serde(rename = "minBuys24H", skip_serializing_if = "Option::is_none")]
    pub min_buys_24h: Option<u64>,
    #[serde(rename = "minSells24H", skip_serializing_if = "Option::is_none")]
    pub min_sells_24h: Option<u64>,
    #[serde(rename = "minTxns24H", skip_serializing_if = "Option::is_none")]
    pub min_txns_24h: Option<u64>,
}

impl FilterSpec {
    /// Default filter of the trending list
    pub fn trending() -> Self {
        Self {
            rank_by: RankBy::Volume,
            order_by: SortDirection::Desc,
            min_vol_24h: Some(1000.0),
            exclude_honeypots: Some(true),
            max_age: Some(7 * SECONDS_PER_DAY),
            ..Default::default()
        }
    }

    /// Default filter of the new pairs list
    pub fn new_pairs() -> Self {
        Self {
            rank_by: RankBy::Age,
            order_by: SortDirection::Desc,
            max_age: Some(SECONDS_PER_DAY),
            exclude_honeypots: Some(true),
            ..Default::default()
        }
    }

    /// Query parameters for the snapshot endpoint, absent constraints omitted
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("rankBy".to_string(), self.rank_by.as_str().to_string()),
            ("orderBy".to_string(), self.order_by.as_str().to_string()),
        ];

        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                params.push((key.to_string(), value));
            }
        };

        push("chain", self.chain.map(|c| c.as_str().to_string()));
        push("minVol24H", self.min_vol_24h.map(|v| v.to_string()));
        push("maxVol24H", self.max_vol_24h.map(|v| v.to_string()));
        push("maxAge", self.max_age.map(|v| v.to_string()));
        push("minAge", self.min_age.map(|v| v.to_string()));
        push("isNotHP", self.exclude_honeypots.map(|v| v.to_string()));
        push("isVerified", self.verified_only.map(|v| v.to_string()));
        push("minLiq", self.min_liq.map(|v| v.to_string()));
        push("maxLiq", self.max_liq.map(|v| v.to_string()));
        push("minBuys24H", self.min_buys_24h.map(|v| v.to_string()));
        push("minSells24H", self.min_sells_24h.map(|v| v.to_string()));
        push("minTxns24H", self.min_txns_24h.map(|v| v.to_string()));

        params
    }

    /// Short one-line description for logs
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("rankBy={} {}", self.rank_by.as_str(), self.order_by)];
        if let Some(chain) = self.chain {
            parts.push(format!("chain={}", chain));
        }
        if let Some(v) = self.min_vol_24h {
            parts.push(format!("minVol={}", v));
        }
        if let Some(v) = self.max_age {
            parts.push(format!("maxAge={}s", v));
        }
        if let Some(v) = self.min_liq {
            parts.push(format!("minLiq={}", v));
        }
        if self.exclude_honeypots == Some(true) {
            parts.push("noHP".to_string());
        }
        if self.verified_only == Some(true) {
            parts.push("verified".to_string());
        }
        parts.join(" ")
    }
}

/// First rule a record failed
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRejection {
    ChainMismatch { expected: Chain, actual: Chain },
    VolumeBelowMin { volume: f64, min: f64 },
    VolumeAboveMax { volume: f64, max: f64 },
    TooOld { age_secs: f64, max: u64 },
    TooYoung { age_secs: f64, min: u64 },
    Honeypot,
    NotVerified,
    LiquidityBelowMin { liquidity: f64, min: f64 },
    LiquidityAboveMax { liquidity: f64, max: f64 },
    TooFewBuys { buys: u64, min: u64 },
    TooFewSells { sells: u64, min: u64 },
    TooFewTransactions { total: u64, min: u64 },
}

impl FilterRejection {
    pub fn label(&self) -> &'static str {
        match self {
            FilterRejection::ChainMismatch { .. } => "chain",
            FilterRejection::VolumeBelowMin { .. } => "min_volume",
            FilterRejection::VolumeAboveMax { .. } => "max_volume",
            FilterRejection::TooOld { .. } => "max_age",
            FilterRejection::TooYoung { .. } => "min_age",
            FilterRejection::Honeypot => "honeypot",
            FilterRejection::NotVerified => "not_verified",
            FilterRejection::LiquidityBelowMin { .. } => "min_liquidity",
            FilterRejection::LiquidityAboveMax { .. } => "max_liquidity",
            FilterRejection::TooFewBuys { .. } => "min_buys",
            FilterRejection::TooFewSells { .. } => "min_sells",
            FilterRejection::TooFewTransactions { .. } => "min_txns",
        }
    }
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRejection::ChainMismatch { expected, actual } => {
                write!(f, "chain {} != {}", actual, expected)
            }
            FilterRejection::VolumeBelowMin { volume, min } => {
                write!(f, "volume {:.2} < {:.2}", volume, min)
            }
            FilterRejection::VolumeAboveMax { volume, max } => {
                write!(f, "volume {:.2} > {:.2}", volume, max)
            }
            FilterRejection::TooOld { age_secs, max } => write!(f, "age {:.0}s > {}s", age_secs, max),
            FilterRejection::TooYoung { age_secs, min } => {
                write!(f, "age {:.0}s < {}s", age_secs, min)
            }
            FilterRejection::Honeypot => write!(f, "flagged as honeypot"),
            FilterRejection::NotVerified => write!(f, "contract not verified"),
            FilterRejection::LiquidityBelowMin { liquidity, min } => {
                write!(f, "liquidity {:.2} < {:.2}", liquidity, min)
            }
            FilterRejection::LiquidityAboveMax { liquidity, max } => {
                write!(f, "liquidity {:.2} > {:.2}", liquidity, max)
            }
            FilterRejection::TooFewBuys { buys, min } => write!(f, "buys {} < {}", buys, min),
            FilterRejection::TooFewSells { sells, min } => write!(f, "sells {} < {}", sells, min),
            FilterRejection::TooFewTransactions { total, min } => {
                write!(f, "txns {} < {}", total, min)
            }
        }
    }
}

/// Evaluate every rule against `now`, returning the first failure
pub fn evaluate(
    record: &AssetRecord,
    spec: &FilterSpec,
    now: DateTime<Utc>,
) -> Result<(), FilterRejection> {
    if let Some(expected) = spec.chain {
        if record.chain != expected {
            return Err(FilterRejection::ChainMismatch {
                expected,
                actual: record.chain,
            });
        }
    }

    let volume = record.volume_or_zero();
    if let Some(min) = spec.min_vol_24h {
        if volume < min {
            return Err(FilterRejection::VolumeBelowMin { volume, min });
        }
    }
    if let Some(max) = spec.max_vol_24h {
        if volume > max {
            return Err(FilterRejection::VolumeAboveMax { volume, max });
        }
    }

    if spec.max_age.is_some() || spec.min_age.is_some() {
        let age_secs = now.signed_duration_since(record.created_at).num_milliseconds() as f64 / 1000.0;
        if let Some(max) = spec.max_age {
            if age_secs > max as f64 {
                return Err(FilterRejection::TooOld { age_secs, max });
            }
        }
        if let Some(min) = spec.min_age {
            if age_secs < min as f64 {
                return Err(FilterRejection::TooYoung { age_secs, min });
            }
        }
    }

    if spec.exclude_honeypots == Some(true) && record.audit.is_honeypot() {
        return Err(FilterRejection::Honeypot);
    }

    if spec.verified_only == Some(true) && !record.audit.is_verified() {
        return Err(FilterRejection::NotVerified);
    }

    let liquidity = record.liquidity.current;
    if let Some(min) = spec.min_liq {
        if liquidity < min {
            return Err(FilterRejection::LiquidityBelowMin { liquidity, min });
        }
    }
    if let Some(max) = spec.max_liq {
        if liquidity > max {
            return Err(FilterRejection::LiquidityAboveMax { liquidity, max });
        }
    }

    let counts = record.transactions;
    if let Some(min) = spec.min_buys_24h {
        if counts.buys < min {
            return Err(FilterRejection::TooFewBuys {
                buys: counts.buys,
                min,
            });
        }
    }
    if let Some(min) = spec.min_sells_24h {
        if counts.sells < min {
            return Err(FilterRejection::TooFewSells {
                sells: counts.sells,
                min,
            });
        }
    }
    if let Some(min) = spec.min_txns_24h {
        if counts.total() < min {
            return Err(FilterRejection::TooFewTransactions {
                total: counts.total(),
                min,
            });
        }
    }

    Ok(())
}

/// Deterministic predicate against an explicit `now`
pub fn passes_at(record: &AssetRecord, spec: &FilterSpec, now: DateTime<Utc>) -> bool {
    match evaluate(record, spec, now) {
        Ok(()) => true,
        Err(reason) => {
            if is_debug_filtering_enabled() {
                logger::debug(
                    LogTag::Filtering,
                    &format!(
                        "Rejected {} ({}) [{}]: {}",
                        record.token_symbol,
                        record.id,
                        reason.label(),
                        reason
                    ),
                );
            }
            false
        }
    }
}

/// Predicate against the wall clock
pub fn passes(record: &AssetRecord, spec: &FilterSpec) -> bool {
    passes_at(record, spec, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::types::fixtures::record;

    #[test]
    fn test_max_age_window() {
        let now = Utc::now();
        let spec = FilterSpec {
            max_age: Some(86_400),
            ..Default::default()
        };
        let two_days = record("old", now, 2 * 86_400);
        let one_hour = record("fresh", now, 3_600);

        assert!(matches!(
            evaluate(&two_days, &spec, now),
            Err(FilterRejection::TooOld { .. })
        ));
        assert!(passes_at(&one_hour, &spec, now));
    }

    #[test]
    fn test_empty_spec_passes_everything() {
        let now = Utc::now();
        let mut r = record("a", now, 10);
        r.volume_usd = None;
        r.audit.honeypot = Some(true);
        assert!(passes_at(&r, &FilterSpec::default(), now));
    }

    #[test]
    fn test_volume_bounds_treat_unknown_as_zero() {
        let now = Utc::now();
        let spec = FilterSpec {
            min_vol_24h: Some(1000.0),
            max_vol_24h: Some(5000.0),
            ..Default::default()
        };
        let mut r = record("a", now, 10);
        r.volume_usd = None;
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "min_volume");

        r.volume_usd = Some(1000.0);
        assert!(passes_at(&r, &spec, now));

        r.volume_usd = Some(5000.5);
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "max_volume");
    }

    #[test]
    fn test_honeypot_and_verified_flags() {
        let now = Utc::now();
        let spec = FilterSpec {
            exclude_honeypots: Some(true),
            verified_only: Some(true),
            ..Default::default()
        };
        let mut r = record("a", now, 10);

        // Unknown honeypot passes, unknown verification does not
        assert_eq!(evaluate(&r, &spec, now), Err(FilterRejection::NotVerified));

        r.audit.contract_verified = Some(true);
        assert!(passes_at(&r, &spec, now));

        r.audit.honeypot = Some(true);
        assert_eq!(evaluate(&r, &spec, now), Err(FilterRejection::Honeypot));

        let relaxed = FilterSpec {
            exclude_honeypots: Some(false),
            ..Default::default()
        };
        assert!(passes_at(&r, &relaxed, now));
    }

    #[test]
    fn test_chain_and_transaction_thresholds() {
        let now = Utc::now();
        let spec = FilterSpec {
            chain: Some(Chain::Sol),
            min_buys_24h: Some(2),
            min_sells_24h: Some(1),
            min_txns_24h: Some(5),
            ..Default::default()
        };
        let mut r = record("a", now, 10);
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "chain");

        r.chain = Chain::Sol;
        r.transactions.buys = 2;
        r.transactions.sells = 1;
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "min_txns");

        r.transactions.sells = 3;
        assert!(passes_at(&r, &spec, now));
    }

    #[test]
    fn test_liquidity_and_min_age() {
        let now = Utc::now();
        let spec = FilterSpec {
            min_liq: Some(10_000.0),
            max_liq: Some(50_000.0),
            min_age: Some(600),
            ..Default::default()
        };
        let mut r = record("a", now, 60);
        r.liquidity.current = 20_000.0;
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "min_age");

        let mut r = record("b", now, 3_600);
        r.liquidity.current = 60_000.0;
        assert_eq!(evaluate(&r, &spec, now).unwrap_err().label(), "max_liquidity");
        r.liquidity.current = 20_000.0;
        assert!(passes_at(&r, &spec, now));
    }

    #[test]
    fn test_default_list_filters() {
        let trending = FilterSpec::trending();
        assert_eq!(trending.rank_by, RankBy::Volume);
        assert_eq!(trending.min_vol_24h, Some(1000.0));
        assert_eq!(trending.max_age, Some(604_800));

        let new_pairs = FilterSpec::new_pairs();
        assert_eq!(new_pairs.rank_by, RankBy::Age);
        assert_eq!(new_pairs.max_age, Some(86_400));
        assert_eq!(new_pairs.exclude_honeypots, Some(true));
    }

    #[test]
    fn test_query_params_omit_absent() {
        let params = FilterSpec::trending().to_query_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["rankBy", "orderBy", "minVol24H", "maxAge", "isNotHP"]);
        assert!(params.contains(&("minVol24H".to_string(), "1000".to_string())));
        assert!(params.contains(&("isNotHP".to_string(), "true".to_string())));
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(FilterSpec::new_pairs()).unwrap();
        assert_eq!(json["rankBy"], "age");
        assert_eq!(json["orderBy"], "desc");
        assert_eq!(json["maxAge"], 86_400);
        assert_eq!(json["isNotHP"], true);
        assert!(json.get("minVol24H").is_none());

        let parsed: FilterSpec =
            serde_json::from_str(r#"{"rankBy":"price5M","chain":"BASE","minTxns24H":10}"#).unwrap();
        assert_eq!(parsed.rank_by, RankBy::Price5M);
        assert_eq!(parsed.chain, Some(Chain::Base));
        assert_eq!(parsed.min_txns_24h, Some(10));
        assert_eq!(parsed.order_by, SortDirection::Desc);
    }
}
