#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing, validation and controller construction must reject bad input
    // with an error, never a panic.
    let Ok(cfg) = align_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let _ = align_core::controller_from_config(&cfg);
    }
});
