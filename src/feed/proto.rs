//! Compact binary tick schema (protobuf)
//!
//! ```text
//! message FeedResponse { string type = 1; repeated Feed feeds = 2; }
//! message Feed {
//!     string symbol = 1;  double ltp = 2;  double close = 3;  int64 ltq = 4;
//!     string exchange = 5;  string tradingSymbol = 6;  string instrumentToken = 7;
//!     double high = 8;  double low = 9;  double open = 10;  int64 volume = 11;
//!     double bid = 12;  double ask = 13;  int64 bidSize = 14;  int64 askSize = 15;
//!     string timestamp = 16;
//! }
//! ```
//!
//! proto3 semantics: absent numerics decode as zero and absent strings as empty.

/// Outer envelope
#[derive(Clone, PartialEq, prost::Message)]
pub struct FeedResponse {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(message, repeated, tag = "2")]
    pub feeds: Vec<Feed>,
}

/// One instrument update
#[derive(Clone, PartialEq, prost::Message)]
pub struct Feed {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(double, tag = "2")]
    pub ltp: f64,
    #[prost(double, tag = "3")]
    pub close: f64,
    #[prost(int64, tag = "4")]
    pub ltq: i64,
    #[prost(string, tag = "5")]
    pub exchange: String,
    #[prost(string, tag = "6")]
    pub trading_symbol: String,
    #[prost(string, tag = "7")]
    pub instrument_token: String,
    #[prost(double, tag = "8")]
    pub high: f64,
    #[prost(double, tag = "9")]
    pub low: f64,
    #[prost(double, tag = "10")]
    pub open: f64,
    #[prost(int64, tag = "11")]
    pub volume: i64,
    #[prost(double, tag = "12")]
    pub bid: f64,
    #[prost(double, tag = "13")]
    pub ask: f64,
    #[prost(int64, tag = "14")]
    pub bid_size: i64,
    #[prost(int64, tag = "15")]
    pub ask_size: i64,
    #[prost(string, tag = "16")]
    pub timestamp: String,
}
