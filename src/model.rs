//! Data models for load classification and trailer allocation.
//!
//! This module defines the records that flow through the engine:
//! - `PlotSpecification`: a standard unit of trailer floor space with a base price
//! - `LoadDimensions` / `LoadAssessment`: input and output of a pricing call
//! - `PalletItem`: a consignment line to be placed on a trailer
//! - `TrailerCapacity`: limits of a trailer for one allocation run
//! - `PlotAllocation`: an accepted placement with its 3D position
//!
//! Plot specifications and load dimensions are in millimetres; pallet items,
//! trailers and positions are in centimetres. Conversions go through
//! [`crate::types::Length`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dims3, validation};

/// Validation error for caller-supplied data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// A standard plot size with its capacity limits and base price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlotSpecification {
    pub name: String,
    pub weight_capacity_kg: f64,
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    #[schema(value_type = String, example = "57.50")]
    pub base_cost_gbp: Decimal,
    pub description: String,
}

impl PlotSpecification {
    /// Checks whether a load fits this plot in every dimension and by weight.
    pub fn accommodates(&self, load: &LoadDimensions) -> bool {
        load.dimensions().fits_within(&self.dimensions(), 0.0)
            && load.weight_kg <= self.weight_capacity_kg
    }

    /// Floor footprint and height of the plot in centimetres (length, width, height).
    pub fn footprint_cm(&self) -> (f64, f64, f64) {
        let dims = self.dimensions();
        (dims.length.cm(), dims.width.cm(), dims.height.cm())
    }
}

impl Dimensional for PlotSpecification {
    fn dimensions(&self) -> Dims3 {
        Dims3::from_mm(self.length_mm, self.width_mm, self.height_mm)
    }
}

/// Physical dimensions of a consignment to be classified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "length_mm": 1200.0,
    "width_mm": 1000.0,
    "height_mm": 1100.0,
    "weight_kg": 450.0,
    "notes": "Boxed machine parts"
}))]
pub struct LoadDimensions {
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LoadDimensions {
    /// Creates validated load dimensions (millimetres, kilograms).
    ///
    /// # Examples
    /// ```
    /// use haulage_engine::model::LoadDimensions;
    ///
    /// assert!(LoadDimensions::new(1200.0, 1000.0, 800.0, 300.0).is_ok());
    /// assert!(LoadDimensions::new(0.0, 1000.0, 800.0, 300.0).is_err());
    /// ```
    pub fn new(
        length_mm: f64,
        width_mm: f64,
        height_mm: f64,
        weight_kg: f64,
    ) -> Result<Self, ValidationError> {
        let load = Self {
            length_mm,
            width_mm,
            height_mm,
            weight_kg,
            notes: None,
        };
        load.validate()?;
        Ok(load)
    }

    /// Builds load dimensions from unit-typed dimensions.
    pub fn from_dims(dims: Dims3, weight_kg: f64) -> Self {
        Self {
            length_mm: dims.length.mm(),
            width_mm: dims.width.mm(),
            height_mm: dims.height.mm(),
            weight_kg,
            notes: None,
        }
    }

    /// Checks all dimensions and the weight.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_dimension(self.length_mm, "Length")?;
        validation::validate_dimension(self.width_mm, "Width")?;
        validation::validate_dimension(self.height_mm, "Height")?;
        validation::validate_weight(self.weight_kg, "Weight")?;
        Ok(())
    }
}

impl Dimensional for LoadDimensions {
    fn dimensions(&self) -> Dims3 {
        Dims3::from_mm(self.length_mm, self.width_mm, self.height_mm)
    }
}

/// Result of classifying and pricing a single load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadAssessment {
    pub is_oversized: bool,
    pub is_protruding: bool,
    pub is_balanced: bool,
    pub is_fragile: bool,
    pub recommended_plot_name: String,
    /// Plot cost, or the per-kilogram cost for oversized loads, before surcharges.
    #[schema(value_type = String, example = "57.50")]
    pub calculated_cost_gbp: Decimal,
    pub additional_charges: Vec<String>,
    #[schema(value_type = String, example = "65.00")]
    pub total_cost_gbp: Decimal,
}

/// A consignment line to be placed on a trailer.
///
/// `weight_kg` and `volume_m3` describe the whole line; `quantity` is the number
/// of pallets stacked on one plot. Upstream sources are inconsistent about the
/// volume unit, so the allocator normalises it before any capacity check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "item_id": "PAL-17",
    "length_cm": 120.0,
    "width_cm": 100.0,
    "height_cm": 150.0,
    "weight_kg": 420.0,
    "volume_m3": 1.8,
    "quantity": 1,
    "job_id": "JOB-2041",
    "job_title": "Leeds → Bristol"
}))]
pub struct PalletItem {
    #[serde(default)]
    pub item_id: Option<String>,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(default)]
    pub volume_m3: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub job_id: String,
    #[serde(default)]
    pub job_title: String,
}

fn default_quantity() -> u32 {
    1
}

impl PalletItem {
    /// Checks the dimensions, weight, volume and quantity of the line.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_dimension(self.length_cm, "Item length")?;
        validation::validate_dimension(self.width_cm, "Item width")?;
        validation::validate_dimension(self.height_cm, "Item height")?;
        validation::validate_weight(self.weight_kg, "Item weight")?;
        validation::validate_non_negative(self.volume_m3, "Item volume")?;
        if self.quantity == 0 {
            return Err(ValidationError::InvalidValue(
                "Item quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Height of the pallets stacked on one plot, in centimetres.
    pub fn stacked_height_cm(&self) -> f64 {
        self.height_cm * f64::from(self.quantity)
    }

    /// Label used in logs and rejection reports.
    pub fn label(&self) -> &str {
        self.item_id.as_deref().unwrap_or(&self.job_id)
    }
}

impl Dimensional for PalletItem {
    fn dimensions(&self) -> Dims3 {
        Dims3::from_cm(self.length_cm, self.width_cm, self.height_cm)
    }
}

/// Capacity limits of a trailer for one allocation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "length_cm": 1360.0,
    "width_cm": 248.0,
    "height_cm": 270.0,
    "max_weight_kg": 24000.0,
    "max_volume_m3": 90.0
}))]
pub struct TrailerCapacity {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub max_weight_kg: f64,
    pub max_volume_m3: f64,
}

impl TrailerCapacity {
    /// Creates a validated trailer capacity.
    pub fn new(
        length_cm: f64,
        width_cm: f64,
        height_cm: f64,
        max_weight_kg: f64,
        max_volume_m3: f64,
    ) -> Result<Self, ValidationError> {
        let capacity = Self {
            length_cm,
            width_cm,
            height_cm,
            max_weight_kg,
            max_volume_m3,
        };
        capacity.validate()?;
        Ok(capacity)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_dimension(self.length_cm, "Trailer length")?;
        validation::validate_dimension(self.width_cm, "Trailer width")?;
        validation::validate_dimension(self.height_cm, "Trailer height")?;
        validation::validate_weight(self.max_weight_kg, "Trailer max weight")?;
        validation::validate_dimension(self.max_volume_m3, "Trailer max volume")?;
        Ok(())
    }
}

/// Position and extent of an allocated plot inside the trailer (centimetres).
///
/// `x` runs along the trailer length, `y` across its width, `z` upwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlotPosition {
    pub x_cm: f64,
    pub y_cm: f64,
    pub z_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    pub length_cm: f64,
}

impl PlotPosition {
    /// Far end of the plot along the trailer length.
    #[inline]
    pub fn end_x_cm(&self) -> f64 {
        self.x_cm + self.length_cm
    }
}

/// A placed plot produced by one allocation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlotAllocation {
    pub plot_id: String,
    pub plot_type: String,
    pub position: PlotPosition,
    pub pallet_items: Vec<PalletItem>,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    pub job_id: String,
    pub job_title: String,
}

impl PlotAllocation {
    /// Checks the totals and the position of an allocation carried into a run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_non_negative(self.total_weight_kg, "Allocation weight")?;
        validation::validate_non_negative(self.total_volume_m3, "Allocation volume")?;
        let position = &self.position;
        validation::validate_non_negative(position.x_cm, "Allocation x")?;
        validation::validate_non_negative(position.y_cm, "Allocation y")?;
        validation::validate_non_negative(position.z_cm, "Allocation z")?;
        validation::validate_dimension(position.length_cm, "Allocation length")?;
        validation::validate_dimension(position.width_cm, "Allocation width")?;
        validation::validate_dimension(position.height_cm, "Allocation height")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: u32) -> PalletItem {
        PalletItem {
            item_id: None,
            length_cm: 120.0,
            width_cm: 100.0,
            height_cm: 40.0,
            weight_kg: 200.0,
            volume_m3: 0.48,
            quantity,
            job_id: "JOB-1".to_string(),
            job_title: "Test".to_string(),
        }
    }

    #[test]
    fn load_dimensions_reject_non_positive_values() {
        assert!(LoadDimensions::new(1200.0, 1000.0, 800.0, 100.0).is_ok());
        assert!(matches!(
            LoadDimensions::new(1200.0, -1.0, 800.0, 100.0),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            LoadDimensions::new(1200.0, 1000.0, 800.0, 0.0),
            Err(ValidationError::InvalidWeight(_))
        ));
    }

    #[test]
    fn plot_accommodates_inclusive_bounds() {
        let plot = PlotSpecification {
            name: "Test Plot".to_string(),
            weight_capacity_kg: 500.0,
            length_mm: 1200.0,
            width_mm: 1000.0,
            height_mm: 1100.0,
            base_cost_gbp: dec!(36.50),
            description: String::new(),
        };
        let exact = LoadDimensions::new(1200.0, 1000.0, 1100.0, 500.0).unwrap();
        let heavy = LoadDimensions::new(1200.0, 1000.0, 1100.0, 500.1).unwrap();

        assert!(plot.accommodates(&exact));
        assert!(!plot.accommodates(&heavy));
        for (length, width, height) in [
            (1200.1, 1000.0, 1100.0),
            (1200.0, 1000.1, 1100.0),
            (1200.0, 1000.0, 1100.1),
        ] {
            let load = LoadDimensions::new(length, width, height, 100.0).unwrap();
            assert!(!plot.accommodates(&load));
        }
        assert_eq!(plot.footprint_cm(), (120.0, 100.0, 110.0));
    }

    #[test]
    fn pallet_item_stacks_by_quantity() {
        assert_eq!(item(3).stacked_height_cm(), 120.0);
        assert!(item(1).validate().is_ok());
        assert!(item(0).validate().is_err());
    }

    #[test]
    fn pallet_item_quantity_defaults_to_one() {
        let json = r#"{
            "length_cm": 120.0, "width_cm": 100.0, "height_cm": 80.0,
            "weight_kg": 300.0, "job_id": "JOB-9"
        }"#;
        let parsed: PalletItem = serde_json::from_str(json).expect("Should parse pallet item");
        assert_eq!(parsed.quantity, 1);
        assert_eq!(parsed.volume_m3, 0.0);
        assert_eq!(parsed.label(), "JOB-9");
    }

    fn allocation(total_weight_kg: f64) -> PlotAllocation {
        PlotAllocation {
            plot_id: "PLOT-001".to_string(),
            plot_type: "Full Plot".to_string(),
            position: PlotPosition {
                x_cm: 0.0,
                y_cm: 0.0,
                z_cm: 0.0,
                width_cm: 100.0,
                height_cm: 40.0,
                length_cm: 120.0,
            },
            pallet_items: vec![item(1)],
            total_weight_kg,
            total_volume_m3: 0.48,
            job_id: "JOB-1".to_string(),
            job_title: "Test".to_string(),
        }
    }

    #[test]
    fn plot_allocation_rejects_negative_totals_and_positions() {
        assert!(allocation(200.0).validate().is_ok());
        assert!(allocation(0.0).validate().is_ok());
        assert!(allocation(-5000.0).validate().is_err());
        assert!(allocation(f64::NAN).validate().is_err());

        let mut shifted = allocation(200.0);
        shifted.position.x_cm = -10.0;
        assert!(shifted.validate().is_err());

        let mut flat = allocation(200.0);
        flat.position.height_cm = 0.0;
        assert!(flat.validate().is_err());
    }

    #[test]
    fn trailer_capacity_validation() {
        assert!(TrailerCapacity::new(1360.0, 248.0, 270.0, 24000.0, 90.0).is_ok());
        assert!(TrailerCapacity::new(1360.0, 248.0, 0.0, 24000.0, 90.0).is_err());
    }
}
