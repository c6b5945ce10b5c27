//! Human-readable error descriptions and structured JSON error formatting.

use align_core::error::{BuildError, LinkError};

/// Exit code for configuration problems (bad TOML, invalid values, missing backend).
pub const EXIT_CONFIG: i32 = 3;
/// Exit code for unit transport/protocol failures.
pub const EXIT_DEVICE: i32 = 4;

fn find<'a, E: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(BuildError::InvalidConfig(msg)) = find::<BuildError>(err) {
        return format!(
            "What happened: Invalid controller configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `align self-check`."
        );
    }

    if let Some(le) = find::<LinkError>(err) {
        return match le {
            LinkError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing or out-of-range values in the TOML, or a backend this build does not include.\nHow to fix: Edit the config file (or pass --sim), then rerun."
            ),
            LinkError::Timeout => {
                "What happened: A unit did not answer in time.\nLikely causes: Peer unreachable over the network, wrong [device] remote_host/port, or the local ubus daemon is down.\nHow to fix: Check connectivity to the peer and raise device.timeout_ms if the link is slow.".to_string()
            }
            LinkError::Transport(msg) => format!(
                "What happened: Could not reach a unit ({msg}).\nLikely causes: Network down, peer powered off, or wrong [device] settings.\nHow to fix: Verify the peer answers on http://remote_host:port/path and retry."
            ),
            LinkError::Protocol(msg) => format!(
                "What happened: A unit rejected the request ({msg}).\nLikely causes: Firmware without the koruza ubus object, or access denied for the anonymous session.\nHow to fix: Check the unit's firmware and ubus ACLs."
            ),
            LinkError::Io(msg) => format!(
                "What happened: I/O error talking to a unit ({msg}).\nLikely causes: `ubus` not installed or not on PATH.\nHow to fix: Run on the unit itself, or use --sim for a dry run."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("scan record") {
        return format!(
            "What happened: Could not read the scan record ({msg}).\nLikely causes: Wrong path or a file not written by `align run --record`.\nHow to fix: Point scan-report at a record file."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 3, device 4, everything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if find::<BuildError>(err).is_some() {
        return EXIT_CONFIG;
    }
    match find::<LinkError>(err) {
        Some(LinkError::Config(_)) => EXIT_CONFIG,
        Some(_) => EXIT_DEVICE,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if find::<BuildError>(err).is_some() {
        return "InvalidConfig";
    }
    match find::<LinkError>(err) {
        Some(LinkError::Config(_)) => "Config",
        Some(LinkError::Timeout) => "Timeout",
        Some(LinkError::Transport(_)) => "Transport",
        Some(LinkError::Protocol(_)) => "Protocol",
        Some(LinkError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn codes_follow_error_class() {
        let cfg = eyre::Report::new(LinkError::Config("x".into()));
        assert_eq!(exit_code_for_error(&cfg), EXIT_CONFIG);
        let build = eyre::Report::new(BuildError::InvalidConfig("y"));
        assert_eq!(exit_code_for_error(&build), EXIT_CONFIG);
        let dev: eyre::Result<()> = Err(LinkError::Timeout).wrap_err("poll peer");
        let dev = dev.unwrap_err();
        assert_eq!(exit_code_for_error(&dev), EXIT_DEVICE);
        assert!(humanize(&dev).starts_with("What happened: A unit did not answer"));
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_carries_reason_and_code() {
        let err = eyre::Report::new(LinkError::Protocol("status code 6".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Protocol");
        assert_eq!(v["exit_code"], 4);
        assert!(v["message"].as_str().unwrap().contains("status code 6"));
    }
}
