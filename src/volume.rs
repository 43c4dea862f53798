//! Volume normalisation for pallet items.
//!
//! Upstream data is inconsistent about volume units: some sources send cubic
//! metres, others cubic centimetres, and some send values unrelated to the
//! item dimensions. The allocator runs every volume through
//! [`normalize_volume`] before it touches capacity accounting.

use tracing::debug;

use crate::types::{CM3_PER_M3, Dims3};

/// Largest volume in cubic metres accepted for a single item.
pub const MAX_PLAUSIBLE_VOLUME_M3: f64 = 100.0;

/// Volumes above this without dimensions are taken to be cubic centimetres.
pub const CUBIC_CM_THRESHOLD: f64 = 1000.0;

/// Ratio between supplied and calculated volume beyond which the supplied value is distrusted.
pub const MAX_DEVIATION_FACTOR: f64 = 10.0;

/// Returns a volume in cubic metres that is safe to use for capacity checks.
///
/// # Parameters
/// * `volume` - The supplied volume, nominally in cubic metres
/// * `dims` - Item dimensions, when known
///
/// # Returns
/// The supplied volume, the volume calculated from the dimensions, a value
/// converted from cubic centimetres, or `0.0` when nothing plausible remains.
///
/// # Examples
/// ```
/// use haulage_engine::types::Dims3;
/// use haulage_engine::volume::normalize_volume;
///
/// let dims = Dims3::from_cm(120.0, 100.0, 150.0);
/// assert!((normalize_volume(1800.0, Some(dims)) - 1.8).abs() < 1e-9);
/// ```
pub fn normalize_volume(volume: f64, dims: Option<Dims3>) -> f64 {
    let supplied = if volume.is_finite() { volume } else { 0.0 };

    let mut normalized = match dims {
        Some(dims) => {
            let calculated = dims.volume_m3();
            if distrust_supplied(supplied, calculated) {
                debug!(supplied, calculated, "Replacing supplied volume with calculated volume");
                calculated
            } else {
                supplied
            }
        }
        None if supplied > CUBIC_CM_THRESHOLD => {
            debug!(supplied, "Treating volume without dimensions as cubic centimetres");
            supplied / CM3_PER_M3
        }
        None => supplied,
    };

    if normalized > MAX_PLAUSIBLE_VOLUME_M3 || normalized < 0.0 {
        debug!(normalized, "Discarding implausible volume");
        normalized = 0.0;
    }
    normalized
}

fn distrust_supplied(supplied: f64, calculated: f64) -> bool {
    if supplied <= 0.0 || supplied > MAX_PLAUSIBLE_VOLUME_M3 {
        return true;
    }
    if calculated <= 0.0 {
        return false;
    }
    let ratio = supplied / calculated;
    ratio > MAX_DEVIATION_FACTOR || ratio < 1.0 / MAX_DEVIATION_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pallet() -> Option<Dims3> {
        Some(Dims3::from_cm(120.0, 100.0, 150.0))
    }

    #[test]
    fn cubic_centimetre_style_volume_is_replaced_by_calculated() {
        assert!((normalize_volume(1800.0, pallet()) - 1.8).abs() < EPS);
    }

    #[test]
    fn plausible_volume_is_kept() {
        assert!((normalize_volume(2.0, pallet()) - 2.0).abs() < EPS);
        assert!((normalize_volume(0.5, pallet()) - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_volume_with_dimensions_uses_calculated() {
        assert!((normalize_volume(0.0, pallet()) - 1.8).abs() < EPS);
    }

    #[test]
    fn far_too_small_volume_is_replaced() {
        assert!((normalize_volume(0.01, pallet()) - 1.8).abs() < EPS);
    }

    #[test]
    fn large_volume_without_dimensions_is_converted_from_cubic_centimetres() {
        assert!((normalize_volume(1_800_000.0, None) - 1.8).abs() < EPS);
    }

    #[test]
    fn moderate_volume_without_dimensions_is_kept() {
        assert!((normalize_volume(3.5, None) - 3.5).abs() < EPS);
    }

    #[test]
    fn implausible_result_is_clamped_to_zero() {
        // 500 m³ is under the cubic-centimetre threshold but still not credible.
        assert_eq!(normalize_volume(500.0, None), 0.0);
        // Calculated volume itself exceeds the plausible maximum.
        let huge = Some(Dims3::from_cm(1000.0, 1000.0, 1000.0));
        assert_eq!(normalize_volume(5.0, huge), 0.0);
    }

    #[test]
    fn non_finite_volume_is_treated_as_missing() {
        assert!((normalize_volume(f64::NAN, pallet()) - 1.8).abs() < EPS);
        assert_eq!(normalize_volume(f64::INFINITY, None), 0.0);
    }
}
