//! KORUZA unit over its device-local RPC interface.
//!
//! The unit the daemon runs on is reached by shelling out to `ubus call`;
//! the peer is reached over HTTP JSON-RPC at `http://host:port/ubus`.

use std::process::Command;
use std::time::Duration;

use align_traits::{Unit, UnitResult, UnitStatus};
use serde_json::Value;

use crate::error::{Result, UnitError};
use crate::protocol;

enum Endpoint {
    Local,
    Remote {
        agent: ureq::Agent,
        url: String,
        session: String,
    },
}

pub struct KoruzaUnit {
    endpoint: Endpoint,
    label: String,
}

impl core::fmt::Debug for KoruzaUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KoruzaUnit")
            .field("endpoint", &self.label)
            .finish()
    }
}

impl KoruzaUnit {
    /// The unit this process runs on.
    pub fn local() -> Self {
        Self {
            endpoint: Endpoint::Local,
            label: "ubus".to_string(),
        }
    }

    /// A peer unit reachable over HTTP.
    pub fn remote(host: &str, port: u16, path: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let url = format!("http://{host}:{port}{path}");
        Self {
            endpoint: Endpoint::Remote {
                agent,
                url: url.clone(),
                session: protocol::SESSION_NULL.to_string(),
            },
            label: url,
        }
    }

    fn call(&self, object: &str, method: &str, params: Value) -> Result<Value> {
        match &self.endpoint {
            Endpoint::Local => call_ubus(object, method, &params),
            Endpoint::Remote {
                agent,
                url,
                session,
            } => {
                let body = protocol::request(session, object, method, &params);
                let mut resp = agent.post(url.as_str()).send_json(&body).map_err(map_http_error)?;
                let reply: Value = resp
                    .body_mut()
                    .read_json()
                    .map_err(|e| UnitError::Parse(e.to_string()))?;
                protocol::parse_reply(reply)
            }
        }
    }
}

fn call_ubus(object: &str, method: &str, params: &Value) -> Result<Value> {
    let out = Command::new("ubus")
        .args(["call", object, method, &params.to_string()])
        .output()?;
    if !out.status.success() {
        return Err(UnitError::Status(out.status.code().unwrap_or(-1)));
    }
    let text = String::from_utf8_lossy(&out.stdout);
    let text = text.trim();
    if text.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text).map_err(|e| UnitError::Parse(e.to_string()))
}

fn map_http_error(e: ureq::Error) -> UnitError {
    match e {
        ureq::Error::Timeout(_) => UnitError::Timeout,
        ureq::Error::Io(io) => UnitError::Io(io),
        other => UnitError::Transport(other.to_string()),
    }
}

impl Unit for KoruzaUnit {
    fn status(&mut self) -> UnitResult<UnitStatus> {
        let data = self.call("koruza", "get_status", serde_json::json!({}))?;
        Ok(protocol::parse_status(data)?)
    }

    fn move_motor(&mut self, x: i32, y: i32) -> UnitResult<()> {
        self.call("koruza", "move_motor", protocol::move_params(x, y))?;
        Ok(())
    }

    fn set_alignment_state(&mut self, state: i32, variables: &[(&str, f64)]) -> UnitResult<()> {
        self.call(
            "koruza",
            "set_alignment",
            protocol::alignment_params(state, variables),
        )?;
        Ok(())
    }
}
