/// Live stream message contract
///
/// Inbound frames are `{"event": ..., "data": ...}` JSON objects. Only three
/// events matter to the lists; everything else is ignored.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::convert::{deserialize_optional_string_or_number, ScannerPairRaw};
use super::filters::FilterSpec;
use super::merge::{PairStatsUpdate, TradeTick};
use super::types::{AssetRecord, AuditFlags, Chain};
use crate::errors::ScannerError;

pub const EVENT_TICK: &str = "tick";
pub const EVENT_PAIR_STATS: &str = "pair-stats";
pub const EVENT_SCANNER_PAIRS: &str = "scanner-pairs";

#[derive(Debug, Clone, Deserialize)]
pub struct TickPair {
    pub pair: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRaw {
    #[serde(default)]
    pub is_outlier: bool,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub price_token1_usd: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string_or_number")]
    pub amount_token1: Option<String>,
    #[serde(default)]
    pub token_in_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickPayload {
    pub pair: TickPair,
    #[serde(default)]
    pub swaps: Vec<SwapRaw>,
}

impl TickPayload {
    /// Last non-outlier swap as a trade; `None` when there is nothing usable
    pub fn latest_trade(&self) -> Option<TradeTick> {
        let swap = self.swaps.iter().rev().find(|swap| !swap.is_outlier)?;
        let price = swap.price_token1_usd.as_deref()?.trim().parse::<f64>().ok()?;
        let amount = swap.amount_token1.as_deref()?.trim().parse::<f64>().ok()?;

        Some(TradeTick {
            pair_id: self.pair.pair.clone(),
            price_usd: price,
            notional_usd: amount * price,
            is_buy: swap.token_in_address == self.pair.token,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairStatsRaw {
    pub pair_address: String,
    #[serde(default)]
    pub mint_authority_renounced: Option<bool>,
    #[serde(default)]
    pub freeze_authority_renounced: Option<bool>,
    #[serde(default)]
    pub token1_is_honeypot: Option<bool>,
    #[serde(default)]
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairStatsPayload {
    pub pair: PairStatsRaw,
}

impl PairStatsPayload {
    pub fn to_update(&self) -> PairStatsUpdate {
        PairStatsUpdate {
            pair_id: self.pair.pair_address.clone(),
            audit: AuditFlags {
                mint_authority_disabled: self.pair.mint_authority_renounced,
                freeze_authority_disabled: self.pair.freeze_authority_renounced,
                honeypot: self.pair.token1_is_honeypot,
                contract_verified: self.pair.is_verified,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScannerPairsResults {
    #[serde(default)]
    pairs: Vec<ScannerPairRaw>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScannerPairsPayload {
    #[serde(default)]
    results: ScannerPairsResults,
}

#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Tick(TickPayload),
    PairStats(PairStatsPayload),
    ScannerPairs(Vec<ScannerPairRaw>),
}

impl IncomingMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            IncomingMessage::Tick(_) => EVENT_TICK,
            IncomingMessage::PairStats(_) => EVENT_PAIR_STATS,
            IncomingMessage::ScannerPairs(_) => EVENT_SCANNER_PAIRS,
        }
    }

    /// Decode one text frame
    ///
    /// `Ok(None)` for well-formed frames with an event name nobody consumes.
    pub fn parse(text: &str) -> Result<Option<Self>, ScannerError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ScannerError::message_parse("<frame>", e))?;

        let event = value
            .get("event")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScannerError::message_parse("<frame>", "missing 'event' field"))?
            .to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);

        let message = match event.as_str() {
            EVENT_TICK => IncomingMessage::Tick(
                serde_json::from_value(data).map_err(|e| ScannerError::message_parse(&event, e))?,
            ),
            EVENT_PAIR_STATS => IncomingMessage::PairStats(
                serde_json::from_value(data).map_err(|e| ScannerError::message_parse(&event, e))?,
            ),
            EVENT_SCANNER_PAIRS => {
                let payload: ScannerPairsPayload = serde_json::from_value(data)
                    .map_err(|e| ScannerError::message_parse(&event, e))?;
                IncomingMessage::ScannerPairs(payload.results.pairs)
            }
            _ => return Ok(None),
        };

        Ok(Some(message))
    }
}

/// Per-pair subscription body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PairSubscription {
    pub pair: String,
    pub token: String,
    pub chain: Chain,
}

impl PairSubscription {
    pub fn for_record(record: &AssetRecord) -> Self {
        Self {
            pair: record.id.clone(),
            token: record.token_address.clone(),
            chain: record.chain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutgoingMessage {
    #[serde(rename = "subscribe-pair")]
    SubscribePair(PairSubscription),
    #[serde(rename = "subscribe-pair-stats")]
    SubscribePairStats(PairSubscription),
    #[serde(rename = "scanner-filter")]
    ScannerFilter(FilterSpec),
}

impl OutgoingMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            OutgoingMessage::SubscribePair(_) => "subscribe-pair",
            OutgoingMessage::SubscribePairStats(_) => "subscribe-pair-stats",
            OutgoingMessage::ScannerFilter(_) => "scanner-filter",
        }
    }

    pub fn to_json(&self) -> Result<String, ScannerError> {
        serde_json::to_string(self)
            .map_err(|e| ScannerError::message_parse(self.event_name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::merge::apply_tick;
    use crate::scanner::types::fixtures::record;
    use chrono::Utc;

    #[test]
    fn test_tick_skips_outliers_and_applies() {
        let frame = r#"{"event":"tick","data":{
            "pair":{"pair":"P","token":"T","chain":"ETH"},
            "swaps":[
                {"isOutlier":false,"priceToken1Usd":"9.0","amountToken1":"1","tokenInAddress":"X"},
                {"isOutlier":false,"priceToken1Usd":"2.0","amountToken1":"10","tokenInAddress":"T"},
                {"isOutlier":true,"priceToken1Usd":"999","amountToken1":"1","tokenInAddress":"X"}
            ]}}"#;
        let Some(IncomingMessage::Tick(payload)) = IncomingMessage::parse(frame).unwrap() else {
            panic!("expected tick");
        };
        let trade = payload.latest_trade().unwrap();
        assert_eq!(trade.price_usd, 2.0);
        assert!(trade.is_buy);

        let now = Utc::now();
        let mut r = record("P", now, 60);
        r.price_usd = 1.5;
        r.volume_usd = Some(50.0);
        let mut records = vec![r];
        assert!(apply_tick(&mut records, &trade));
        assert_eq!(records[0].price_usd, 2.0);
        assert_eq!(records[0].volume_usd, Some(70.0));
        assert_eq!(records[0].transactions.buys, 1);
        assert_eq!(records[0].transactions.sells, 0);
    }

    #[test]
    fn test_tick_with_only_outliers_has_no_trade() {
        let frame = r#"{"event":"tick","data":{"pair":{"pair":"P","token":"T"},
            "swaps":[{"isOutlier":true,"priceToken1Usd":"1","amountToken1":"1","tokenInAddress":"T"}]}}"#;
        let Some(IncomingMessage::Tick(payload)) = IncomingMessage::parse(frame).unwrap() else {
            panic!("expected tick");
        };
        assert!(payload.latest_trade().is_none());
    }

    #[test]
    fn test_pair_stats_maps_flags_directly() {
        let frame = r#"{"event":"pair-stats","data":{"pair":{"pairAddress":"P",
            "mintAuthorityRenounced":true,"freezeAuthorityRenounced":false,
            "token1IsHoneypot":true,"isVerified":true}}}"#;
        let Some(IncomingMessage::PairStats(payload)) = IncomingMessage::parse(frame).unwrap()
        else {
            panic!("expected pair-stats");
        };
        let update = payload.to_update();
        assert_eq!(update.pair_id, "P");
        assert_eq!(update.audit.honeypot, Some(true));
        assert_eq!(update.audit.freeze_authority_disabled, Some(false));
        assert_eq!(update.audit.contract_verified, Some(true));
    }

    #[test]
    fn test_scanner_pairs_and_unknown_events() {
        let frame = r#"{"event":"scanner-pairs","data":{"results":{"pairs":[
            {"pairAddress":"A","volume":"10"},{"pairAddress":"B"}]}}}"#;
        match IncomingMessage::parse(frame).unwrap() {
            Some(IncomingMessage::ScannerPairs(rows)) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        assert!(IncomingMessage::parse(r#"{"event":"heartbeat","data":{}}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(IncomingMessage::parse("not json").is_err());
        assert!(IncomingMessage::parse(r#"{"data":{}}"#).is_err());
        match IncomingMessage::parse(r#"{"event":"tick","data":{"swaps":[]}}"#) {
            Err(ScannerError::MessageParse { event, .. }) => assert_eq!(event, "tick"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_outgoing_shapes() {
        let sub = PairSubscription {
            pair: "P".to_string(),
            token: "T".to_string(),
            chain: Chain::Sol,
        };
        let json: Value =
            serde_json::from_str(&OutgoingMessage::SubscribePairStats(sub).to_json().unwrap())
                .unwrap();
        assert_eq!(json["event"], "subscribe-pair-stats");
        assert_eq!(json["data"]["pair"], "P");
        assert_eq!(json["data"]["chain"], "SOL");

        let json: Value = serde_json::from_str(
            &OutgoingMessage::ScannerFilter(FilterSpec::trending())
                .to_json()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["event"], "scanner-filter");
        assert_eq!(json["data"]["rankBy"], "volume");
        assert_eq!(json["data"]["minVol24H"], 1000.0);
    }
}
