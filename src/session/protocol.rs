//! Outbound application-level payloads

use serde::Serialize;

#[derive(Serialize)]
struct Request<'a, T> {
    session_id: &'a str,
    method: &'static str,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HandshakeData<'a> {
    auth_token: &'a str,
    api_key: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeData<'a> {
    mode: &'static str,
    instrument_keys: &'a [String],
}

#[derive(Serialize)]
struct HeartbeatData {
    status: &'static str,
}

fn encode<T: Serialize>(request: &Request<'_, T>) -> String {
    // Plain structs of strings always serialize
    serde_json::to_string(request).unwrap_or_default()
}

/// `{session_id, method:"handshake", data:{authToken, apiKey, source}}`
pub fn handshake(session_id: &str, auth_token: &str, api_key: &str, source: &str) -> String {
    encode(&Request {
        session_id,
        method: "handshake",
        data: HandshakeData {
            auth_token,
            api_key,
            source,
        },
    })
}

/// `{session_id, method:"sub", data:{mode:"full", instrumentKeys}}`
pub fn subscribe(session_id: &str, instrument_keys: &[String]) -> String {
    encode(&Request {
        session_id,
        method: "sub",
        data: SubscribeData {
            mode: "full",
            instrument_keys,
        },
    })
}

/// `{session_id, method:"heartbeat", data:{status:"OK"}}`
pub fn heartbeat_ack(session_id: &str) -> String {
    encode(&Request {
        session_id,
        method: "heartbeat",
        data: HeartbeatData { status: "OK" },
    })
}
