//! Shared unit types and traits.
//!
//! Plot specifications and load assessments are quoted in millimetres, while
//! trailers and allocation positions are quoted in centimetres. Instead of
//! carrying two silent conventions through the engine, every length is held as
//! a [`Length`] (millimetres internally) and converted only at the boundary.

use serde::{Deserialize, Serialize};

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for capacity checks on weight, volume and dimensions.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Millimetres per centimetre.
pub const MM_PER_CM: f64 = 10.0;

/// Cubic centimetres per cubic metre.
pub const CM3_PER_M3: f64 = 1_000_000.0;

/// A linear length, stored in millimetres.
///
/// # Examples
/// ```
/// use haulage_engine::types::Length;
///
/// let pallet = Length::from_cm(120.0);
/// assert_eq!(pallet.mm(), 1200.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Length(f64);

impl Length {
    /// Creates a length from millimetres.
    #[inline]
    pub const fn from_mm(mm: f64) -> Self {
        Self(mm)
    }

    /// Creates a length from centimetres.
    #[inline]
    pub fn from_cm(cm: f64) -> Self {
        Self(cm * MM_PER_CM)
    }

    /// Value in millimetres.
    #[inline]
    pub const fn mm(self) -> f64 {
        self.0
    }

    /// Value in centimetres.
    #[inline]
    pub fn cm(self) -> f64 {
        self.0 / MM_PER_CM
    }
}

/// Length, width and height of a box-shaped object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dims3 {
    pub length: Length,
    pub width: Length,
    pub height: Length,
}

impl Dims3 {
    /// Creates dimensions from millimetre values.
    pub fn from_mm(length: f64, width: f64, height: f64) -> Self {
        Self {
            length: Length::from_mm(length),
            width: Length::from_mm(width),
            height: Length::from_mm(height),
        }
    }

    /// Creates dimensions from centimetre values.
    pub fn from_cm(length: f64, width: f64, height: f64) -> Self {
        Self {
            length: Length::from_cm(length),
            width: Length::from_cm(width),
            height: Length::from_cm(height),
        }
    }

    /// Volume in cubic metres.
    #[inline]
    pub fn volume_m3(&self) -> f64 {
        self.length.cm() * self.width.cm() * self.height.cm() / CM3_PER_M3
    }

    /// Checks if these dimensions fit within another box (component-wise <=).
    ///
    /// # Parameters
    /// * `outer` - The enclosing dimensions
    /// * `tolerance` - Numerical tolerance in millimetres
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.length.mm() <= outer.length.mm() + tolerance
            && self.width.mm() <= outer.width.mm() + tolerance
            && self.height.mm() <= outer.height.mm() + tolerance
    }
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Dims3;
}

/// Validation functions shared by the request models.
pub mod validation {
    use crate::model::ValidationError;

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
        if value <= 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidDimension(format!(
                "{} must be positive, got: {}",
                name, value
            )));
        }
        Ok(())
    }

    /// Validates a weight.
    pub fn validate_weight(value: f64, name: &str) -> Result<(), ValidationError> {
        if value <= 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidWeight(format!(
                "{} must be positive, got: {}",
                name, value
            )));
        }
        Ok(())
    }

    /// Validates a value that may be zero but never negative or non-finite.
    pub fn validate_non_negative(value: f64, name: &str) -> Result<(), ValidationError> {
        if value < 0.0 || !value.is_finite() {
            return Err(ValidationError::InvalidValue(format!(
                "{} must not be negative, got: {}",
                name, value
            )));
        }
        Ok(())
    }
}
