//! Dual-format frame decoder
//!
//! Every frame is tried as JSON first and, on structural failure, as the
//! protobuf schema. Both paths funnel through the same normalization so the
//! resulting [`Tick`] never depends on the wire format.

use super::proto;
use super::types::{FeedMessage, Tick, TickBatch, WireFormat};
use chrono::{DateTime, TimeZone, Utc};
use prost::Message;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Frame decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Zero-length frame
    #[error("empty frame")]
    Empty,
    /// Neither JSON nor the binary schema could make sense of the frame
    #[error("unrecognized frame (json: {json}; binary: {binary})")]
    Unrecognized { json: String, binary: String },
}

/// Stateless decoder for raw feed frames
#[derive(Debug, Clone, Default)]
pub struct MessageDecoder;

impl MessageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a frame into ticks, treating control frames as empty batches
    pub fn decode(&self, frame: &[u8]) -> Result<TickBatch, DecodeError> {
        match self.decode_message(frame)? {
            FeedMessage::Ticks(batch) => Ok(batch),
            _ => Ok(TickBatch::empty(WireFormat::Json)),
        }
    }

    /// Decode and classify a frame
    pub fn decode_message(&self, frame: &[u8]) -> Result<FeedMessage, DecodeError> {
        if frame.is_empty() {
            return Err(DecodeError::Empty);
        }

        let json_err = match decode_json(frame) {
            Ok(msg) => return Ok(msg),
            Err(e) => e,
        };

        match decode_binary(frame) {
            Ok(batch) => Ok(FeedMessage::Ticks(batch)),
            Err(binary_err) => Err(DecodeError::Unrecognized {
                json: json_err,
                binary: binary_err,
            }),
        }
    }
}

/// Format-neutral view of one feed entry, before validation
#[derive(Debug, Default)]
struct RawFeed {
    symbol: String,
    instrument_token: String,
    trading_symbol: String,
    exchange: String,
    ltp: Option<f64>,
    close: f64,
    ltq: i64,
    high: f64,
    low: f64,
    open: f64,
    volume: i64,
    bid: f64,
    ask: f64,
    bid_size: i64,
    ask_size: i64,
    timestamp: String,
}

impl From<proto::Feed> for RawFeed {
    fn from(feed: proto::Feed) -> Self {
        Self {
            symbol: feed.symbol,
            instrument_token: feed.instrument_token,
            trading_symbol: feed.trading_symbol,
            exchange: feed.exchange,
            ltp: Some(feed.ltp),
            close: feed.close,
            ltq: feed.ltq,
            high: feed.high,
            low: feed.low,
            open: feed.open,
            volume: feed.volume,
            bid: feed.bid,
            ask: feed.ask,
            bid_size: feed.bid_size,
            ask_size: feed.ask_size,
            timestamp: feed.timestamp,
        }
    }
}

/// JSON rendition of the feed schema; numbers may arrive as strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JsonFeed {
    symbol: Option<String>,
    instrument_token: Option<String>,
    trading_symbol: Option<String>,
    exchange: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    ltp: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    close: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    ltq: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    high: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    low: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    open: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    volume: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    bid: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    ask: Option<f64>,
    #[serde(deserialize_with = "lenient_i64")]
    bid_size: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    ask_size: Option<i64>,
    timestamp: Option<Value>,
}

impl From<JsonFeed> for RawFeed {
    fn from(feed: JsonFeed) -> Self {
        let timestamp = match feed.timestamp {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            symbol: feed.symbol.unwrap_or_default(),
            instrument_token: feed.instrument_token.unwrap_or_default(),
            trading_symbol: feed.trading_symbol.unwrap_or_default(),
            exchange: feed.exchange.unwrap_or_default(),
            ltp: feed.ltp,
            close: feed.close.unwrap_or_default(),
            ltq: feed.ltq.unwrap_or_default(),
            high: feed.high.unwrap_or_default(),
            low: feed.low.unwrap_or_default(),
            open: feed.open.unwrap_or_default(),
            volume: feed.volume.unwrap_or_default(),
            bid: feed.bid.unwrap_or_default(),
            ask: feed.ask.unwrap_or_default(),
            bid_size: feed.bid_size.unwrap_or_default(),
            ask_size: feed.ask_size.unwrap_or_default(),
            timestamp,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept a number, a numeric string or null; anything unparseable is `None`
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<LenientNumber>::deserialize(d).unwrap_or(None) {
        Some(LenientNumber::Int(v)) => Some(v as f64),
        Some(LenientNumber::Float(v)) => Some(v),
        Some(LenientNumber::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<LenientNumber>::deserialize(d).unwrap_or(None) {
        Some(LenientNumber::Int(v)) => Some(v),
        Some(LenientNumber::Float(v)) if v.is_finite() => Some(v as i64),
        Some(LenientNumber::Float(_)) => None,
        Some(LenientNumber::Text(s)) => s.trim().parse::<i64>().ok(),
        None => None,
    })
}

fn decode_json(frame: &[u8]) -> Result<FeedMessage, String> {
    let value: Value = serde_json::from_slice(frame).map_err(|e| e.to_string())?;
    let Value::Object(obj) = value else {
        return Err("top-level JSON value is not an object".to_string());
    };

    if let Some(method) = obj.get("method") {
        let method = method.as_str().map(str::to_string);
        if method.as_deref() == Some("heartbeat") {
            return Ok(FeedMessage::Heartbeat);
        }
        return Ok(FeedMessage::Ack { method });
    }

    if let Some(feeds) = obj.get("feeds") {
        return match feeds {
            Value::Array(list) => Ok(FeedMessage::Ticks(collect_list(list))),
            Value::Object(map) => Ok(FeedMessage::Ticks(collect_map(map))),
            _ => Err("\"feeds\" is neither a list nor a map".to_string()),
        };
    }

    if let Some(Value::Array(list)) = obj.get("data") {
        return Ok(FeedMessage::Ticks(collect_list(list)));
    }

    if let Some(status) = obj.get("status") {
        if status.as_str() == Some("error") {
            let message = obj
                .get("message")
                .or_else(|| obj.get("errors"))
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .unwrap_or_else(|| "unspecified error".to_string());
            return Ok(FeedMessage::StatusError { message });
        }
        return Ok(FeedMessage::Ack { method: None });
    }

    if obj.contains_key("symbol") || obj.contains_key("instrumentToken") || obj.contains_key("ltp") {
        return Ok(FeedMessage::Ticks(collect_list(std::slice::from_ref(
            &Value::Object(obj),
        ))));
    }

    Err("JSON object has no recognized fields".to_string())
}

fn collect_list(list: &[Value]) -> TickBatch {
    let mut batch = TickBatch::empty(WireFormat::Json);
    for item in list {
        push_json_feed(&mut batch, item, None);
    }
    batch
}

fn collect_map(map: &Map<String, Value>) -> TickBatch {
    let mut batch = TickBatch::empty(WireFormat::Json);
    for (key, item) in map {
        push_json_feed(&mut batch, item, Some(key));
    }
    batch
}

fn push_json_feed(batch: &mut TickBatch, item: &Value, fallback_key: Option<&str>) {
    let tick = JsonFeed::deserialize(item)
        .ok()
        .and_then(|feed| normalize(RawFeed::from(feed), fallback_key));
    match tick {
        Some(tick) => batch.ticks.push(tick),
        None => batch.discarded += 1,
    }
}

fn decode_binary(frame: &[u8]) -> Result<TickBatch, String> {
    let response = proto::FeedResponse::decode(frame).map_err(|e| e.to_string())?;
    if response.r#type.is_empty() && response.feeds.is_empty() {
        return Err("binary envelope carries no type and no feeds".to_string());
    }

    let mut batch = TickBatch::empty(WireFormat::Binary);
    for feed in response.feeds {
        match normalize(RawFeed::from(feed), None) {
            Some(tick) => batch.ticks.push(tick),
            None => batch.discarded += 1,
        }
    }
    Ok(batch)
}

/// Validate and normalize a raw feed entry. Returns `None` for feeds with no
/// instrument key or no usable last traded price. A zero price counts as
/// absent in both formats, since proto3 cannot tell the two apart.
fn normalize(raw: RawFeed, fallback_key: Option<&str>) -> Option<Tick> {
    let key = [&raw.symbol, &raw.instrument_token, &raw.trading_symbol]
        .into_iter()
        .find(|s| !s.is_empty())
        .cloned()
        .or_else(|| fallback_key.map(str::to_string))?;

    let ltp = raw.ltp.filter(|v| v.is_finite() && *v > 0.0)?;
    let last_traded_price = Decimal::from_f64(ltp)?;

    Some(Tick {
        instrument_key: key,
        last_traded_price,
        last_traded_qty: non_zero(raw.ltq),
        high: price(raw.high),
        low: price(raw.low),
        open: price(raw.open),
        close: price(raw.close),
        volume: non_zero(raw.volume),
        bid: price(raw.bid),
        ask: price(raw.ask),
        bid_size: non_zero(raw.bid_size),
        ask_size: non_zero(raw.ask_size),
        exchange: non_empty(raw.exchange),
        trading_symbol: non_empty(raw.trading_symbol),
        timestamp: parse_timestamp(&raw.timestamp),
    })
}

fn price(v: f64) -> Option<Decimal> {
    if v == 0.0 || !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v)
}

fn non_zero(v: i64) -> Option<i64> {
    (v != 0).then_some(v)
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Epoch milliseconds (all digits) or RFC 3339
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn binary_frame(feeds: Vec<proto::Feed>) -> Vec<u8> {
        proto::FeedResponse {
            r#type: "live_feed".to_string(),
            feeds,
        }
        .encode_to_vec()
    }

    #[test]
    fn test_decode_json_envelope() {
        let frame = br#"{"type":"live_feed","feeds":[{"symbol":"NSE_EQ|TCS","ltp":3500.5,"volume":"1200"}]}"#;
        let batch = MessageDecoder::new().decode(frame).unwrap();

        assert_eq!(batch.format, WireFormat::Json);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.ticks[0].instrument_key, "NSE_EQ|TCS");
        assert_eq!(batch.ticks[0].last_traded_price, dec!(3500.5));
        assert_eq!(batch.ticks[0].volume, Some(1200));
    }

    #[test]
    fn test_decode_json_feed_map_uses_key() {
        let frame = br#"{"feeds":{"NSE_INDEX|Nifty 50":{"ltp":"22000.15"}}}"#;
        let batch = MessageDecoder::new().decode(frame).unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.ticks[0].instrument_key, "NSE_INDEX|Nifty 50");
        assert_eq!(batch.ticks[0].last_traded_price, dec!(22000.15));
    }

    #[test]
    fn test_decode_json_data_list() {
        let frame = br#"{"data":[{"symbol":"A","ltp":10},{"symbol":"B","ltp":20.5}]}"#;
        let batch = MessageDecoder::new().decode(frame).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ticks[1].last_traded_price, dec!(20.5));
    }

    #[test]
    fn test_decode_single_json_tick() {
        let frame = br#"{"symbol":"NSE:SBIN-EQ","ltp":612.4,"timestamp":"1704067200123"}"#;
        let batch = MessageDecoder::new().decode(frame).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.ticks[0].timestamp,
            Utc.timestamp_millis_opt(1704067200123).single()
        );
    }

    #[test]
    fn test_heartbeat_is_classified() {
        let frame = br#"{"method":"heartbeat","guid":"abc"}"#;
        let msg = MessageDecoder::new().decode_message(frame).unwrap();
        assert_eq!(msg, FeedMessage::Heartbeat);
    }

    #[test]
    fn test_ack_and_status_error() {
        let decoder = MessageDecoder::new();
        let ack = decoder
            .decode_message(br#"{"method":"sub","data":{"status":"OK"}}"#)
            .unwrap();
        assert_eq!(
            ack,
            FeedMessage::Ack {
                method: Some("sub".to_string())
            }
        );

        let err = decoder
            .decode_message(br#"{"status":"error","message":"invalid token"}"#)
            .unwrap();
        assert_eq!(
            err,
            FeedMessage::StatusError {
                message: "invalid token".to_string()
            }
        );
    }

    #[test]
    fn test_control_frame_decodes_as_empty_batch() {
        let batch = MessageDecoder::new()
            .decode(br#"{"method":"heartbeat"}"#)
            .unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_decode_binary_frame() {
        let frame = binary_frame(vec![proto::Feed {
            symbol: "NSE_EQ|RELIANCE".to_string(),
            ltp: 2950.75,
            volume: 42,
            ..Default::default()
        }]);

        let batch = MessageDecoder::new().decode(&frame).unwrap();
        assert_eq!(batch.format, WireFormat::Binary);
        assert_eq!(batch.ticks[0].last_traded_price, dec!(2950.75));
        assert_eq!(batch.ticks[0].volume, Some(42));
        assert!(batch.ticks[0].high.is_none());
    }

    #[test]
    fn test_formats_yield_identical_ticks() {
        let json = br#"{"type":"live_feed","feeds":[{
            "symbol":"NSE_EQ|HDFCBANK","ltp":1650.3,"close":1640.0,"ltq":"5",
            "exchange":"NSE","tradingSymbol":"HDFCBANK","high":1660.1,"low":1630.2,
            "open":1641.5,"volume":"98000","bid":1650.25,"ask":1650.35,
            "bidSize":"100","askSize":"75","timestamp":"2024-01-01T09:15:00Z"}]}"#;
        let binary = binary_frame(vec![proto::Feed {
            symbol: "NSE_EQ|HDFCBANK".to_string(),
            ltp: 1650.3,
            close: 1640.0,
            ltq: 5,
            exchange: "NSE".to_string(),
            trading_symbol: "HDFCBANK".to_string(),
            instrument_token: String::new(),
            high: 1660.1,
            low: 1630.2,
            open: 1641.5,
            volume: 98000,
            bid: 1650.25,
            ask: 1650.35,
            bid_size: 100,
            ask_size: 75,
            timestamp: "2024-01-01T09:15:00Z".to_string(),
        }]);

        let decoder = MessageDecoder::new();
        let from_json = decoder.decode(json).unwrap();
        let from_binary = decoder.decode(&binary).unwrap();

        assert_eq!(from_json.format, WireFormat::Json);
        assert_eq!(from_binary.format, WireFormat::Binary);
        assert_eq!(from_json.ticks, from_binary.ticks);
        assert_eq!(
            serde_json::to_vec(&from_json.ticks).unwrap(),
            serde_json::to_vec(&from_binary.ticks).unwrap()
        );
    }

    #[test]
    fn test_tick_without_price_is_discarded() {
        let frame = br#"{"data":[{"symbol":"A"},{"symbol":"B","ltp":null},{"symbol":"C","ltp":-1},{"symbol":"D","ltp":5}]}"#;
        let batch = MessageDecoder::new().decode(frame).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.discarded, 3);
        assert_eq!(batch.ticks[0].instrument_key, "D");
    }

    #[test]
    fn test_zero_ltp_is_discarded_in_both_formats() {
        let decoder = MessageDecoder::new();
        let json = decoder
            .decode(br#"{"feeds":[{"symbol":"A","ltp":0},{"symbol":"B","ltp":"0.0"}]}"#)
            .unwrap();
        let binary = decoder
            .decode(&binary_frame(vec![
                proto::Feed {
                    symbol: "A".to_string(),
                    ..Default::default()
                },
                proto::Feed {
                    symbol: "B".to_string(),
                    ltp: 0.0,
                    ..Default::default()
                },
            ]))
            .unwrap();

        assert!(json.is_empty());
        assert!(binary.is_empty());
        assert_eq!(json.discarded, 2);
        assert_eq!(binary.discarded, 2);
    }

    #[test]
    fn test_tick_without_key_is_discarded() {
        let batch = MessageDecoder::new()
            .decode(br#"{"data":[{"ltp":10.0}]}"#)
            .unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.discarded, 1);
    }

    #[test]
    fn test_instrument_token_fallback() {
        let frame = binary_frame(vec![proto::Feed {
            instrument_token: "NSE_EQ|INE002A01018".to_string(),
            ltp: 1.5,
            ..Default::default()
        }]);
        let batch = MessageDecoder::new().decode(&frame).unwrap();
        assert_eq!(batch.ticks[0].instrument_key, "NSE_EQ|INE002A01018");
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        let err = MessageDecoder::new().decode(b"not a frame").unwrap_err();
        assert!(matches!(err, DecodeError::Unrecognized { .. }));
    }

    #[test]
    fn test_unknown_json_shape_is_unrecognized() {
        let err = MessageDecoder::new().decode(br#"{"foo":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Unrecognized { .. }));
    }

    #[test]
    fn test_empty_frame() {
        assert_eq!(MessageDecoder::new().decode(b""), Err(DecodeError::Empty));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-01-01T09:15:00+05:30").is_some());
        assert_eq!(
            parse_timestamp("0"),
            Utc.timestamp_millis_opt(0).single()
        );
    }
}
