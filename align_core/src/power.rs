//! Optical power conversions.

/// Lowest power the SFP receiver reports (dBm).
pub const NOISE_FLOOR_DBM: f64 = -40.0;

/// Device power readings are integers in units of 0.1 uW.
const RAW_UNITS_PER_MW: f64 = 10_000.0;

/// Convert linear power in milliwatts to dBm, clamped at the noise floor.
///
/// Non-positive and non-finite inputs read as the floor; `+inf` stays `+inf`.
pub fn mw_to_dbm(mw: f64) -> f64 {
    let dbm = if mw > 0.0 {
        10.0 * mw.log10()
    } else {
        NOISE_FLOOR_DBM
    };
    dbm.max(NOISE_FLOOR_DBM)
}

/// Convert a raw SFP reading (0.1 uW units) to dBm.
#[inline]
pub fn rx_power_to_dbm(raw: u32) -> f64 {
    mw_to_dbm(f64::from(raw) / RAW_UNITS_PER_MW)
}

/// True when a reading sits at the noise floor (no light detected).
#[inline]
pub fn is_dark(dbm: f64) -> bool {
    dbm <= NOISE_FLOOR_DBM
}
