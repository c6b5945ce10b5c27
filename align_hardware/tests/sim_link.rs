use align_hardware::error::UnitError;
use align_hardware::{SimConfig, SimulatedLink};
use align_traits::Unit;
use rstest::rstest;

#[test]
fn handles_share_one_model() {
    let link = SimulatedLink::default();
    let mut local = link.local();
    let mut remote = link.remote();

    local.move_motor(40, -20).unwrap();
    assert_eq!(local.status().unwrap().x, 40);
    assert_eq!(link.local_motor(), (40, -20));

    // remote handle reads the peer's own head and state
    let r = remote.status().unwrap();
    assert_eq!((r.x, r.y), (0, 0));
    assert_eq!(r.alignment_state, 5);

    link.set_peer_state(3);
    assert_eq!(remote.status().unwrap().alignment_state, 3);

    local.set_alignment_state(-1, &[]).unwrap();
    assert_eq!(link.local_state(), -1);
}

#[test]
fn jammed_head_accepts_but_ignores_moves() {
    let link = SimulatedLink::default();
    let mut local = link.local();
    link.jam_local(true);
    local.move_motor(500, 500).unwrap();
    assert_eq!(link.local_motor(), (0, 0));
    link.jam_local(false);
    local.move_motor(500, 500).unwrap();
    assert_eq!(link.local_motor(), (500, 500));
}

#[test]
fn injected_failures_are_typed() {
    let link = SimulatedLink::default();
    link.fail_local_moves(1);
    link.fail_remote_status(1);

    let err = link.local().move_motor(1, 1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<UnitError>(),
        Some(UnitError::Transport(_))
    ));
    assert!(link.local().move_motor(1, 1).is_ok());

    let err = link.remote().status().unwrap_err();
    assert!(matches!(err.downcast_ref::<UnitError>(), Some(UnitError::Timeout)));
    assert!(link.remote().status().is_ok());
}

#[rstest]
#[case(0, 0)]
#[case(600, -400)]
fn power_is_reciprocal_without_offset(#[case] x: i32, #[case] y: i32) {
    let link = SimulatedLink::default();
    link.local().move_motor(x, y).unwrap();
    let l = link.local().status().unwrap().rx_power_raw;
    let r = link.remote().status().unwrap().rx_power_raw;
    assert_eq!(l, r);
}

#[test]
fn closer_to_optimum_reads_more_power() {
    let link = SimulatedLink::new(SimConfig {
        local_optimum: (300, 300),
        ..SimConfig::default()
    });
    let mut local = link.local();
    let before = local.status().unwrap().rx_power_raw;
    local.move_motor(300, 300).unwrap();
    let after = local.status().unwrap().rx_power_raw;
    assert!(after > before);
    // -6 dBm peak: 0.251 mW = 2512 raw units
    assert_eq!(after, 2512);
}

#[test]
fn reversal_leaves_load_behind_motor() {
    let link = SimulatedLink::default();
    let mut local = link.local();
    local.move_motor(130, 130).unwrap();
    local.move_motor(-50, 130).unwrap();
    assert_eq!(link.local_motor(), (-50, 130));
    assert_eq!(link.local_load(), (80, 130));
}
