use align_core::LinkError;
use align_core::hw_error::map_unit_error;
use align_hardware::{SimulatedLink, UnitError};
use align_traits::Unit;
use rstest::rstest;

#[test]
fn simulated_failures_map_to_link_errors() {
    let link = SimulatedLink::default();
    link.fail_remote_status(1);
    link.fail_local_moves(1);

    let err = link.remote().status().expect_err("injected timeout");
    let mapped = map_unit_error(&*err);
    assert_eq!(mapped, LinkError::Timeout);
    assert!(mapped.is_transient());

    let err = link.local().move_motor(5, 5).expect_err("injected transport error");
    match map_unit_error(&*err) {
        LinkError::Transport(msg) => assert!(msg.contains("connection refused")),
        other => panic!("unexpected error variant: {other:?}"),
    }
}

#[rstest]
#[case(UnitError::Status(6), "status code 6")]
#[case(UnitError::Parse("missing field `motors`".into()), "missing field `motors`")]
fn unit_replies_map_to_protocol_errors(#[case] unit: UnitError, #[case] msg: &str) {
    assert_eq!(map_unit_error(&unit), LinkError::Protocol(msg.to_string()));
}

#[test]
fn io_errors_keep_their_kind() {
    let timed_out = UnitError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut));
    assert!(matches!(map_unit_error(&timed_out), LinkError::Io(_)));

    let raw = std::io::Error::from(std::io::ErrorKind::TimedOut);
    assert_eq!(map_unit_error(&raw), LinkError::Timeout);
    let raw = std::io::Error::from(std::io::ErrorKind::NotFound);
    assert!(matches!(map_unit_error(&raw), LinkError::Io(_)));
    assert!(!LinkError::Io(String::new()).is_transient());
}
