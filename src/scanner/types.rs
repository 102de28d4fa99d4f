/// Core record types shared by every scanner component
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Eth,
    Bsc,
    Base,
    Sol,
}

impl Chain {
    /// Map a numeric chain id to a chain; unknown ids fall back to ETH
    pub fn from_chain_id(chain_id: i64) -> Self {
        match chain_id {
            1 => Chain::Eth,
            56 => Chain::Bsc,
            8453 => Chain::Base,
            900 => Chain::Sol,
            _ => Chain::Eth,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Bsc => "BSC",
            Chain::Base => "BASE",
            Chain::Sol => "SOL",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ETH" => Ok(Chain::Eth),
            "BSC" => Ok(Chain::Bsc),
            "BASE" => Ok(Chain::Base),
            "SOL" => Ok(Chain::Sol),
            other => Err(format!("Unknown chain '{}' (expected ETH, BSC, BASE or SOL)", other)),
        }
    }
}

/// Percent price change buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: f64,
    pub h1: f64,
    pub h6: f64,
    pub h24: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCounts {
    pub buys: u64,
    pub sells: u64,
}

impl TradeCounts {
    pub fn total(&self) -> u64 {
        self.buys + self.sells
    }
}

/// Token audit flags, `None` = not known yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFlags {
    pub mint_authority_disabled: Option<bool>,
    pub freeze_authority_disabled: Option<bool>,
    pub honeypot: Option<bool>,
    pub contract_verified: Option<bool>,
}

impl AuditFlags {
    /// True when no flag is known
    pub fn is_empty(&self) -> bool {
        self.mint_authority_disabled.is_none()
            && self.freeze_authority_disabled.is_none()
            && self.honeypot.is_none()
            && self.contract_verified.is_none()
    }

    pub fn is_honeypot(&self) -> bool {
        self.honeypot == Some(true)
    }

    pub fn is_verified(&self) -> bool {
        self.contract_verified == Some(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Liquidity {
    pub current: f64,
    pub change_pct: f64,
}

/// One tradable pair as tracked by a list
///
/// `id` is the pair address and is unique within a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_address: String,
    pub chain: Chain,
    pub exchange: String,
    pub price_usd: f64,
    /// `None` when the source reported something unparseable
    pub volume_usd: Option<f64>,
    pub mcap: f64,
    pub price_change: PriceChange,
    pub transactions: TradeCounts,
    pub audit: AuditFlags,
    pub created_at: DateTime<Utc>,
    pub liquidity: Liquidity,
}

impl AssetRecord {
    pub fn pair_address(&self) -> &str {
        &self.id
    }

    /// Volume with unknown treated as zero
    pub fn volume_or_zero(&self) -> f64 {
        self.volume_usd.unwrap_or(0.0)
    }

    /// Age in whole seconds relative to `now` (negative if created in the future)
    pub fn age_secs_at(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_seconds()
    }
}
