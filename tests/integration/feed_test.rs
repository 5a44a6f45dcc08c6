//! Integration tests for feed decoding and configuration

use prost::Message;
use rust_decimal_macros::dec;
use tick_alert::config::Config;
use tick_alert::feed::proto::{Feed, FeedResponse};
use tick_alert::feed::{FeedMessage, MessageDecoder, WireFormat};

#[test]
fn test_config_example_loads_and_validates() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    assert!(config.validate().is_ok());
    assert!(!config.feed.instruments.is_empty());
}

#[test]
fn test_json_and_binary_frames_normalize_identically() {
    let decoder = MessageDecoder::new();

    let json = br#"{"type":"live_feed","feeds":[
        {"symbol":"NSE_EQ|RELIANCE","ltp":2958.5,"close":2900,"ltq":"25",
         "exchange":"NSE","volume":"120000","bid":2958.45,"ask":2958.55}]}"#;
    let binary = FeedResponse {
        r#type: "live_feed".to_string(),
        feeds: vec![Feed {
            symbol: "NSE_EQ|RELIANCE".to_string(),
            ltp: 2958.5,
            close: 2900.0,
            ltq: 25,
            exchange: "NSE".to_string(),
            volume: 120_000,
            bid: 2958.45,
            ask: 2958.55,
            ..Default::default()
        }],
    }
    .encode_to_vec();

    let from_json = decoder.decode(json).unwrap();
    let from_binary = decoder.decode(&binary).unwrap();

    assert_eq!(from_json.format, WireFormat::Json);
    assert_eq!(from_binary.format, WireFormat::Binary);
    assert_eq!(from_json.ticks, from_binary.ticks);
    assert_eq!(from_json.ticks[0].last_traded_price, dec!(2958.5));
    assert_eq!(from_json.ticks[0].high, None);
}

#[test]
fn test_control_frames_are_classified() {
    let decoder = MessageDecoder::new();
    assert_eq!(
        decoder.decode_message(br#"{"method":"heartbeat"}"#).unwrap(),
        FeedMessage::Heartbeat
    );
    assert!(decoder.decode(br#"{"method":"heartbeat"}"#).unwrap().is_empty());
    assert!(decoder.decode(b"\xff\xfe\xfd").is_err());
}
