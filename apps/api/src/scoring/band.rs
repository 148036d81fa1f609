//! IELTS band arithmetic: half-band rounding and overall-from-criteria.

pub const MIN_BAND: f64 = 0.0;
pub const MAX_BAND: f64 = 9.0;

/// Rounds to the nearest 0.5 (halves round up, as bands are never negative).
pub fn round_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

pub fn clamp_band(value: f64) -> f64 {
    value.clamp(MIN_BAND, MAX_BAND)
}

pub fn in_band_range(value: f64) -> bool {
    value.is_finite() && (MIN_BAND..=MAX_BAND).contains(&value)
}

/// Arithmetic mean of the criterion bands, rounded to the nearest 0.5.
/// Returns `None` when there are no bands to average.
pub fn overall_from_bands(bands: &[f64]) -> Option<f64> {
    if bands.is_empty() {
        return None;
    }
    let mean = bands.iter().sum::<f64>() / bands.len() as f64;
    Some(clamp_band(round_half(mean)))
}
