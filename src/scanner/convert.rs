/// Raw snapshot rows and their conversion into `AssetRecord`s
///
/// The snapshot API and the `scanner-pairs` live event share one row shape.
/// Numeric fields arrive as strings most of the time, but plain numbers are
/// accepted too.
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::types::{AssetRecord, AuditFlags, Chain, Liquidity, PriceChange, TradeCounts};
use crate::arguments::is_debug_api_enabled;
use crate::logger::{self, LogTag};

/// Epoch values above this are treated as milliseconds
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Custom deserializer for optional fields that can be either string or number
pub(crate) fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct OptionalStringOrNumber;

    impl<'de> Visitor<'de> for OptionalStringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an optional string or number")
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<String>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<String>, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(OptionalStringOrNumber)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<String>, E> {
            Ok(Some(value.to_owned()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<String>, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<String>, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Option<String>, E> {
            Ok(Some(value.to_string()))
        }
    }

    deserializer.deserialize_any(OptionalStringOrNumber)
}

/// One row of the scanner API (`pairs[]`) or of a `scanner-pairs` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerPairRaw {
    #[serde(default)]
    pub pair_address: String,
    #[serde(default)]
    pub token1_name: String,
    #[serde(default)]
    pub token1_symbol: String,
    #[serde(default)]
    pub token1_address: String,
    #[serde(default)]
    pub chain_id: i64,
    #[serde(default)]
    pub router_address: String,

    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub volume: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub current_mcap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub initial_mcap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub pair_mcap_usd: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub pair_mcap_usd_initial: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub token1_total_supply_formatted: Option<String>,

    #[serde(
        rename = "diff5M",
        default,
        deserialize_with = "deserialize_optional_string_or_number"
    )]
    pub diff_5m: Option<String>,
    #[serde(
        rename = "diff1H",
        default,
        deserialize_with = "deserialize_optional_string_or_number"
    )]
    pub diff_1h: Option<String>,
    #[serde(
        rename = "diff6H",
        default,
        deserialize_with = "deserialize_optional_string_or_number"
    )]
    pub diff_6h: Option<String>,
    #[serde(
        rename = "diff24H",
        default,
        deserialize_with = "deserialize_optional_string_or_number"
    )]
    pub diff_24h: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub buys: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub sells: Option<String>,

    #[serde(default)]
    pub is_mint_auth_disabled: Option<bool>,
    #[serde(default)]
    pub is_freeze_auth_disabled: Option<bool>,
    #[serde(rename = "honeyPot", default)]
    pub honey_pot: Option<bool>,
    #[serde(default)]
    pub contract_verified: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub liquidity: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub percent_change_in_liquidity: Option<String>,
}

/// Snapshot API response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScannerApiResponse {
    #[serde(default)]
    pub pairs: Vec<ScannerPairRaw>,
}

/// Finite number from a numeric string; `NaN` and `inf` parse but are rejected
fn parse_finite(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a numeric string, absent or garbage = 0
fn parse_or_zero(value: &Option<String>) -> f64 {
    value.as_deref().and_then(parse_finite).unwrap_or(0.0)
}

/// Parse a positive numeric string
fn positive(value: &Option<String>) -> Option<f64> {
    value.as_deref().and_then(parse_finite).filter(|v| *v > 0.0)
}

/// Trade count; fractional values truncate, negative or garbage = 0
fn parse_count(value: &Option<String>) -> u64 {
    value
        .as_deref()
        .and_then(parse_finite)
        .filter(|v| *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0)
}

/// Parse a creation timestamp: RFC 3339 or epoch seconds/milliseconds
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let epoch = value
        .parse::<i64>()
        .ok()
        .or_else(|| parse_finite(value).map(|v| v as i64))?;

    if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(epoch).single()
    } else {
        Utc.timestamp_opt(epoch, 0).single()
    }
}

impl ScannerPairRaw {
    /// First positive market cap field, else supply x price
    pub fn market_cap(&self) -> f64 {
        positive(&self.current_mcap)
            .or_else(|| positive(&self.initial_mcap))
            .or_else(|| positive(&self.pair_mcap_usd))
            .or_else(|| positive(&self.pair_mcap_usd_initial))
            .unwrap_or_else(|| {
                parse_or_zero(&self.token1_total_supply_formatted) * parse_or_zero(&self.price)
            })
    }

    /// Absent volume is zero, unparseable volume is unknown
    fn volume_usd(&self) -> Option<f64> {
        match self.volume.as_deref() {
            None => Some(0.0),
            Some(v) => parse_finite(v),
        }
    }

    fn created_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.age.as_deref().and_then(parse_timestamp) {
            Some(ts) => ts,
            None => {
                if is_debug_api_enabled() {
                    logger::debug(
                        LogTag::Api,
                        &format!(
                            "Pair {} has unparseable age {:?}, using current time",
                            self.pair_address, self.age
                        ),
                    );
                }
                now
            }
        }
    }

    /// Convert into the internal record; `now` backs unparseable timestamps
    pub fn to_record_at(&self, now: DateTime<Utc>) -> AssetRecord {
        AssetRecord {
            id: self.pair_address.clone(),
            token_name: self.token1_name.clone(),
            token_symbol: self.token1_symbol.clone(),
            token_address: self.token1_address.clone(),
            chain: Chain::from_chain_id(self.chain_id),
            exchange: self.router_address.clone(),
            price_usd: parse_or_zero(&self.price),
            volume_usd: self.volume_usd(),
            mcap: self.market_cap(),
            price_change: PriceChange {
                m5: parse_or_zero(&self.diff_5m),
                h1: parse_or_zero(&self.diff_1h),
                h6: parse_or_zero(&self.diff_6h),
                h24: parse_or_zero(&self.diff_24h),
            },
            transactions: TradeCounts {
                buys: parse_count(&self.buys),
                sells: parse_count(&self.sells),
            },
            audit: AuditFlags {
                mint_authority_disabled: self.is_mint_auth_disabled,
                freeze_authority_disabled: self.is_freeze_auth_disabled,
                honeypot: self.honey_pot,
                contract_verified: self.contract_verified,
            },
            created_at: self.created_at(now),
            liquidity: Liquidity {
                current: parse_or_zero(&self.liquidity),
                change_pct: parse_or_zero(&self.percent_change_in_liquidity),
            },
        }
    }

    pub fn to_record(&self) -> AssetRecord {
        self.to_record_at(Utc::now())
    }
}

/// Convert a batch, skipping rows without a pair address
pub fn convert_rows(rows: &[ScannerPairRaw]) -> Vec<AssetRecord> {
    let now = Utc::now();
    rows.iter()
        .filter(|row| !row.pair_address.is_empty())
        .map(|row| row.to_record_at(now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(json: &str) -> ScannerPairRaw {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_row_conversion() {
        let raw = row(
            r#"{
                "pairAddress": "0xpair",
                "token1Name": "Pepe",
                "token1Symbol": "PEPE",
                "token1Address": "0xtoken",
                "chainId": 8453,
                "routerAddress": "0xrouter",
                "price": "0.0012",
                "volume": "15000.5",
                "currentMcap": "0",
                "initialMcap": "250000",
                "diff5M": "1.5",
                "diff24H": -12,
                "buys": 40,
                "sells": 12,
                "isMintAuthDisabled": true,
                "honeyPot": false,
                "age": "2024-05-01T12:00:00Z",
                "liquidity": "32000",
                "percentChangeInLiquidity": "-3.2"
            }"#,
        );
        let record = raw.to_record();

        assert_eq!(record.id, "0xpair");
        assert_eq!(record.chain, Chain::Base);
        assert_eq!(record.price_usd, 0.0012);
        assert_eq!(record.volume_usd, Some(15000.5));
        assert_eq!(record.mcap, 250000.0);
        assert_eq!(record.price_change.m5, 1.5);
        assert_eq!(record.price_change.h1, 0.0);
        assert_eq!(record.price_change.h24, -12.0);
        assert_eq!(record.transactions.total(), 52);
        assert_eq!(record.audit.mint_authority_disabled, Some(true));
        assert_eq!(record.audit.freeze_authority_disabled, None);
        assert_eq!(record.audit.honeypot, Some(false));
        assert_eq!(record.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert_eq!(record.liquidity.change_pct, -3.2);
    }

    #[test]
    fn test_market_cap_falls_back_to_supply_times_price() {
        let raw = row(
            r#"{"pairAddress":"p","price":"2","token1TotalSupplyFormatted":"1000",
                "currentMcap":"-5","pairMcapUsd":"0"}"#,
        );
        assert_eq!(raw.market_cap(), 2000.0);

        let raw = row(r#"{"pairAddress":"p","pairMcapUsdInitial":"77"}"#);
        assert_eq!(raw.market_cap(), 77.0);
    }

    #[test]
    fn test_volume_absent_vs_garbage() {
        assert_eq!(row(r#"{"pairAddress":"p"}"#).to_record().volume_usd, Some(0.0));
        assert_eq!(
            row(r#"{"pairAddress":"p","volume":"n/a"}"#).to_record().volume_usd,
            None
        );
        assert_eq!(
            row(r#"{"pairAddress":"p","volume":null}"#).to_record().volume_usd,
            Some(0.0)
        );
    }

    #[test]
    fn test_timestamp_formats() {
        let secs = parse_timestamp("1714564800").unwrap();
        let millis = parse_timestamp("1714564800000").unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_unparseable_age_uses_now() {
        let now = Utc::now();
        let record = row(r#"{"pairAddress":"p","age":"soon"}"#).to_record_at(now);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn test_numeric_age_and_response_envelope() {
        let response: ScannerApiResponse = serde_json::from_str(
            r#"{"pairs":[{"pairAddress":"a","age":1714564800000},{"pairAddress":""}]}"#,
        )
        .unwrap();
        let records = convert_rows(&response.pairs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].created_at.timestamp(), 1714564800);
    }

    #[test]
    fn test_counts_accept_strings_and_numbers_in_one_page() {
        let response: ScannerApiResponse = serde_json::from_str(
            r#"{"pairs":[
                {"pairAddress":"a","buys":3,"sells":1},
                {"pairAddress":"b","buys":"12","sells":4.0},
                {"pairAddress":"c","buys":"lots","sells":-2}
            ]}"#,
        )
        .unwrap();
        let records = convert_rows(&response.pairs);

        assert_eq!(records.len(), 3);
        assert_eq!((records[0].transactions.buys, records[0].transactions.sells), (3, 1));
        assert_eq!((records[1].transactions.buys, records[1].transactions.sells), (12, 4));
        assert_eq!((records[2].transactions.buys, records[2].transactions.sells), (0, 0));
    }

    #[test]
    fn test_non_finite_age_uses_now() {
        let now = Utc::now();
        assert!(parse_timestamp("NaN").is_none());
        assert!(parse_timestamp("inf").is_none());

        let record = row(r#"{"pairAddress":"p","age":"NaN","price":"NaN"}"#).to_record_at(now);
        assert_eq!(record.created_at, now);
        assert_eq!(record.price_usd, 0.0);
    }
}
