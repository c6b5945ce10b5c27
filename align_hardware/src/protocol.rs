//! ubus JSON-RPC envelopes and `koruza get_status` parsing.
//!
//! Transport-free so the wire format can be tested without a device.

use align_traits::UnitStatus;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Result, UnitError};

/// Anonymous ubus session; sufficient for status and motor calls.
pub const SESSION_NULL: &str = "00000000000000000000000000000000";

/// State reported when the unit does not publish one (never busy).
pub const UNKNOWN_STATE: i32 = -1;

/// JSON-RPC 2.0 `call` request for `object.method(params)`.
pub fn request(session: &str, object: &str, method: &str, params: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "id": 1,
        "params": [session, object, method, params],
    })
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
}

#[derive(Debug, Deserialize)]
struct Reply {
    result: Option<Vec<Value>>,
    error: Option<RpcError>,
}

/// Unwrap a JSON-RPC reply: `{"result": [status, data?]}` or
/// `{"error": {"code": n}}`. A non-zero status becomes `UnitError::Status`.
pub fn parse_reply(reply: Value) -> Result<Value> {
    let reply: Reply =
        serde_json::from_value(reply).map_err(|e| UnitError::Parse(e.to_string()))?;
    if let Some(err) = reply.error {
        return Err(UnitError::Status(err.code));
    }
    let mut result = reply
        .result
        .ok_or_else(|| UnitError::Parse("reply has neither result nor error".into()))?
        .into_iter();
    let code = result
        .next()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| UnitError::Parse("missing status code".into()))?;
    if code != 0 {
        return Err(UnitError::Status(i32::try_from(code).unwrap_or(i32::MAX)));
    }
    Ok(result.next().unwrap_or_else(|| json!({})))
}

#[derive(Debug, Default, Deserialize)]
struct Motors {
    x: i32,
    y: i32,
}

#[derive(Debug, Default, Deserialize)]
struct Sfp {
    #[serde(default)]
    rx_power: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Network {
    peer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Alignment {
    state: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Status {
    motors: Motors,
    #[serde(default)]
    sfp: Sfp,
    #[serde(default)]
    network: Network,
    #[serde(default)]
    alignment: Alignment,
}

/// Parse the `koruza get_status` payload.
pub fn parse_status(data: Value) -> Result<UnitStatus> {
    let s: Status = serde_json::from_value(data).map_err(|e| UnitError::Parse(e.to_string()))?;
    Ok(UnitStatus {
        x: s.motors.x,
        y: s.motors.y,
        rx_power_raw: u32::try_from(s.sfp.rx_power).unwrap_or(u32::MAX),
        peer_address: s.network.peer.filter(|p| !p.is_empty()),
        alignment_state: s.alignment.state.unwrap_or(UNKNOWN_STATE),
    })
}

pub fn move_params(x: i32, y: i32) -> Value {
    json!({ "x": x, "y": y, "z": 0 })
}

pub fn alignment_params(state: i32, variables: &[(&str, f64)]) -> Value {
    let vars: serde_json::Map<String, Value> = variables
        .iter()
        .map(|(k, v)| ((*k).to_string(), json!(v)))
        .collect();
    json!({ "state": state, "variables": vars })
}
