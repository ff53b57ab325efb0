//! Fuzz target: `ConfigPatch::parse` and `parse_control`
//!
//! Feeds arbitrary request bodies to the control surface parsers and
//! asserts that they never panic and that any accepted patch applies
//! into range:
//! - `cycles` always lands in 1..=65535
//! - stop voltages are only changed when the key is present
//!
//! cargo fuzz run fuzz_config_patch

#![no_main]

use battcycler::api::{self, ConfigPatch};
use battcycler::phase::PhaseConfig;
use battcycler::program::Program;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = api::parse_control(data);

    let Ok(patch) = ConfigPatch::parse(data) else {
        return;
    };

    let program = patch.apply_program(Program::default());
    assert!(program.cycles >= 1);

    let defaults = PhaseConfig::default();
    let phase = patch.apply_phase(defaults);
    if patch.charge_stop_voltage_v.is_none() {
        assert_eq!(
            phase.charge_stop_voltage_v.to_bits(),
            defaults.charge_stop_voltage_v.to_bits()
        );
    }
    if !patch.touches_phase() {
        assert_eq!(phase, defaults);
    }
});
