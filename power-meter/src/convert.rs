//! Power unit conversion.

/// Substitute for negative readings, in watts.
///
/// Zero-offset drift can make thermal sensors report slightly negative power
/// at very low levels; such readings are clamped here before conversion.
pub const NOISE_FLOOR_W: f64 = 1e-12;

/// Reference power for dBm.
const ONE_MILLIWATT: f64 = 1e-3;

/// Convert power in watts to dBm.
///
/// Negative inputs clamp to [`NOISE_FLOOR_W`] (-90 dBm). Zero is not clamped
/// and yields negative infinity, and NaN stays NaN; callers reject
/// non-finite results instead of reporting them.
///
/// # Example
///
/// ```
/// use power_meter::convert::watts_to_dbm;
///
/// assert_eq!(watts_to_dbm(1e-3), 0.0);
/// assert!((watts_to_dbm(-5e-9) + 90.0).abs() < 1e-9);
/// ```
pub fn watts_to_dbm(power_w: f64) -> f64 {
    let power_w = if power_w < 0.0 { NOISE_FLOOR_W } else { power_w };
    10.0 * (power_w / ONE_MILLIWATT).log10()
}
