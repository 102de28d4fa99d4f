/// Sort engine: stable ordering over an enumerated set of record fields
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::types::AssetRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Unknown sort direction '{}'", other)),
        }
    }
}

/// Sortable columns, keyed by the same names the table columns use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "tokenName")]
    TokenName,
    #[serde(rename = "priceUsd")]
    PriceUsd,
    #[serde(rename = "tokenCreatedTimestamp")]
    CreatedAt,
    #[serde(rename = "volumeUsd")]
    VolumeUsd,
    #[serde(rename = "transactions")]
    Transactions,
    #[serde(rename = "mcap")]
    Mcap,
    #[serde(rename = "liquidity.current")]
    Liquidity,
    #[serde(rename = "priceChangePcs.5m")]
    PriceChange5m,
    #[serde(rename = "priceChangePcs.1h")]
    PriceChange1h,
    #[serde(rename = "priceChangePcs.6h")]
    PriceChange6h,
    #[serde(rename = "priceChangePcs.24h")]
    PriceChange24h,
    #[serde(rename = "audit")]
    Audit,
}

impl SortField {
    pub const ALL: [SortField; 12] = [
        SortField::TokenName,
        SortField::PriceUsd,
        SortField::CreatedAt,
        SortField::VolumeUsd,
        SortField::Transactions,
        SortField::Mcap,
        SortField::Liquidity,
        SortField::PriceChange5m,
        SortField::PriceChange1h,
        SortField::PriceChange6h,
        SortField::PriceChange24h,
        SortField::Audit,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SortField::TokenName => "tokenName",
            SortField::PriceUsd => "priceUsd",
            SortField::CreatedAt => "tokenCreatedTimestamp",
            SortField::VolumeUsd => "volumeUsd",
            SortField::Transactions => "transactions",
            SortField::Mcap => "mcap",
            SortField::Liquidity => "liquidity.current",
            SortField::PriceChange5m => "priceChangePcs.5m",
            SortField::PriceChange1h => "priceChangePcs.1h",
            SortField::PriceChange6h => "priceChangePcs.6h",
            SortField::PriceChange24h => "priceChangePcs.24h",
            SortField::Audit => "audit",
        }
    }

    pub fn from_key(key: &str) -> Result<Self, String> {
        SortField::ALL
            .iter()
            .copied()
            .find(|field| field.key() == key)
            .ok_or_else(|| {
                format!(
                    "Unknown sort key '{}' (valid: {})",
                    key,
                    SortField::ALL
                        .iter()
                        .map(|f| f.key())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }

    /// Ascending comparison of two records on this field
    pub fn compare(&self, a: &AssetRecord, b: &AssetRecord) -> Ordering {
        match self {
            SortField::TokenName => a
                .token_name
                .to_lowercase()
                .cmp(&b.token_name.to_lowercase()),
            SortField::PriceUsd => a.price_usd.total_cmp(&b.price_usd),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::VolumeUsd => a.volume_or_zero().total_cmp(&b.volume_or_zero()),
            SortField::Transactions => a.transactions.total().cmp(&b.transactions.total()),
            SortField::Mcap => a.mcap.total_cmp(&b.mcap),
            SortField::Liquidity => a.liquidity.current.total_cmp(&b.liquidity.current),
            SortField::PriceChange5m => a.price_change.m5.total_cmp(&b.price_change.m5),
            SortField::PriceChange1h => a.price_change.h1.total_cmp(&b.price_change.h1),
            SortField::PriceChange6h => a.price_change.h6.total_cmp(&b.price_change.h6),
            SortField::PriceChange24h => a.price_change.h24.total_cmp(&b.price_change.h24),
            SortField::Audit => audit_score(a).cmp(&audit_score(b)),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::from_key(s.trim())
    }
}

/// Number of audit flags known to be in the safe state
fn audit_score(record: &AssetRecord) -> u8 {
    let audit = &record.audit;
    [
        audit.mint_authority_disabled == Some(true),
        audit.freeze_authority_disabled == Some(true),
        audit.honeypot == Some(false),
        audit.contract_verified == Some(true),
    ]
    .iter()
    .filter(|safe| **safe)
    .count() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortField,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortField, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn trending_default() -> Self {
        Self::new(SortField::VolumeUsd, SortDirection::Desc)
    }

    pub fn new_pairs_default() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Desc)
    }

    /// Column header click: same key flips, a different key starts ascending
    pub fn toggle(&mut self, key: SortField) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Asc;
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self::trending_default()
    }
}

/// Stable in-place sort
pub fn sort_records(records: &mut [AssetRecord], config: &SortConfig) {
    match config.direction {
        SortDirection::Asc => records.sort_by(|a, b| config.key.compare(a, b)),
        SortDirection::Desc => records.sort_by(|a, b| config.key.compare(b, a)),
    }
}

/// Sorted copy, leaving the source untouched
pub fn sorted(records: &[AssetRecord], config: &SortConfig) -> Vec<AssetRecord> {
    let mut out = records.to_vec();
    sort_records(&mut out, config);
    out
}
