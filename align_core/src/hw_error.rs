//! Maps `Box<dyn Error>` from the `Unit` trait boundary to typed `LinkError`.
//!
//! With the `hardware-errors` feature, `align_hardware::UnitError` is
//! downcast precisely; otherwise the message is inspected.

use crate::error::LinkError;

/// Map a trait-boundary error to a typed `LinkError`.
pub fn map_unit_error(e: &(dyn std::error::Error + 'static)) -> LinkError {
    #[cfg(feature = "hardware-errors")]
    {
        use align_hardware::error::UnitError;
        if let Some(unit) = e.downcast_ref::<UnitError>() {
            return match unit {
                UnitError::Timeout => LinkError::Timeout,
                UnitError::Transport(m) => LinkError::Transport(m.clone()),
                UnitError::Status(code) => LinkError::Protocol(format!("status code {code}")),
                UnitError::Parse(m) => LinkError::Protocol(m.clone()),
                UnitError::Io(io) => LinkError::Io(io.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return match io.kind() {
            std::io::ErrorKind::TimedOut => LinkError::Timeout,
            _ => LinkError::Io(io.to_string()),
        };
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        LinkError::Timeout
    } else if lower.contains("status") {
        LinkError::Protocol(s)
    } else {
        LinkError::Transport(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Msg(&'static str);
    impl std::fmt::Display for Msg {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }
    impl std::error::Error for Msg {}

    #[test]
    fn message_heuristics() {
        assert_eq!(map_unit_error(&Msg("request Timeout")), LinkError::Timeout);
        assert!(matches!(
            map_unit_error(&Msg("bad status 4")),
            LinkError::Protocol(_)
        ));
        assert!(matches!(
            map_unit_error(&Msg("connection refused")),
            LinkError::Transport(_)
        ));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert_eq!(map_unit_error(&timed_out), LinkError::Timeout);
        let other = std::io::Error::other("pipe closed");
        assert!(matches!(map_unit_error(&other), LinkError::Io(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn unit_errors_downcast_precisely() {
        use align_hardware::error::UnitError;
        assert_eq!(
            map_unit_error(&UnitError::Status(4)),
            LinkError::Protocol("status code 4".into())
        );
        assert_eq!(map_unit_error(&UnitError::Timeout), LinkError::Timeout);
    }
}
