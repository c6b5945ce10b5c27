use align_core::error::BuildError;
use align_core::{
    AlignmentController, ConvergenceCfg, IdleCfg, PeerCfg, SafetyCfg, ScanCfg,
};
use rstest::rstest;

fn expect_invalid(result: align_core::error::Result<AlignmentController>) -> &'static str {
    let err = result.expect_err("should fail validation");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => msg,
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
#[case(ScanCfg { backlash_steps: -1, ..ScanCfg::default() }, "backlash_steps")]
#[case(ScanCfg { fine_step: 0, ..ScanCfg::default() }, "scan steps")]
#[case(ScanCfg { coarse_step: -100, ..ScanCfg::default() }, "scan steps")]
#[case(ScanCfg { samples_per_point: 0, ..ScanCfg::default() }, "samples_per_point")]
#[case(ScanCfg { weak_signal_dbm: f64::NAN, ..ScanCfg::default() }, "weak_signal_dbm")]
fn invalid_scan_sections(#[case] scan: ScanCfg, #[case] field: &str) {
    let msg = expect_invalid(AlignmentController::builder().with_scan(scan).build());
    assert!(msg.contains(field), "{msg}");
}

#[rstest]
#[case(ConvergenceCfg { spread_db: 0.0, ..ConvergenceCfg::default() })]
#[case(ConvergenceCfg { floor_dbm: f64::INFINITY, ..ConvergenceCfg::default() })]
fn invalid_convergence_sections(#[case] convergence: ConvergenceCfg) {
    expect_invalid(
        AlignmentController::builder()
            .with_convergence(convergence)
            .build(),
    );
}

#[rstest]
#[case(IdleCfg { samples: 0, ..IdleCfg::default() })]
#[case(IdleCfg { regression_db: -3.0, ..IdleCfg::default() })]
fn invalid_idle_sections(#[case] idle: IdleCfg) {
    expect_invalid(AlignmentController::builder().with_idle(idle).build());
}

#[rstest]
#[case(SafetyCfg { stuck_timeout_ms: 0, ..SafetyCfg::default() })]
#[case(SafetyCfg { cycle_timeout_ms: 0, ..SafetyCfg::default() })]
fn invalid_safety_sections(#[case] safety: SafetyCfg) {
    expect_invalid(AlignmentController::builder().with_safety(safety).build());
}

#[test]
fn inverted_busy_range_is_rejected() {
    let msg = expect_invalid(
        AlignmentController::builder()
            .with_peer(PeerCfg {
                busy_min: 4,
                busy_max: 0,
                motion_check: false,
            })
            .build(),
    );
    assert_eq!(msg, "busy_min must be <= busy_max");
}

#[test]
fn zero_backlash_is_allowed() {
    let c = AlignmentController::builder()
        .with_scan(ScanCfg {
            backlash_steps: 0,
            ..ScanCfg::default()
        })
        .build()
        .unwrap();
    assert_eq!(c.backlash().backlash(), 0);
}
