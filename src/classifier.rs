//! Load classification and pricing.
//!
//! A load is matched against the plot table (cheapest feasible plot wins) and
//! priced from the matched plot's effective base cost. Oversized loads are
//! billed per kilogram instead, and tall loads attract a tail-lift surcharge.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::model::{LoadAssessment, LoadDimensions, PlotSpecification};
use crate::rates::{OverrideSet, RateTable, decimal_from_f64, round_money};

/// Thresholds and surcharges used by [`assess_load_with_rules`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricingRules {
    /// Loads longer than this are oversized.
    pub oversized_length_mm: f64,
    /// Loads wider than this are oversized.
    pub oversized_width_mm: f64,
    /// Loads taller than this protrude above a standard plot.
    pub protruding_height_mm: f64,
    /// Loads taller than this need a tail-lift.
    pub tail_lift_height_mm: f64,
    pub oversized_rate_per_kg_gbp: Decimal,
    pub tail_lift_surcharge_gbp: Decimal,
}

impl PricingRules {
    pub const DEFAULT_OVERSIZED_LENGTH_MM: f64 = 1200.0;
    pub const DEFAULT_OVERSIZED_WIDTH_MM: f64 = 1000.0;
    pub const DEFAULT_PROTRUDING_HEIGHT_MM: f64 = 800.0;
    pub const DEFAULT_TAIL_LIFT_HEIGHT_MM: f64 = 1500.0;
    pub const DEFAULT_OVERSIZED_RATE_PER_KG_GBP: Decimal = dec!(18.46);
    pub const DEFAULT_TAIL_LIFT_SURCHARGE_GBP: Decimal = dec!(7.50);
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            oversized_length_mm: Self::DEFAULT_OVERSIZED_LENGTH_MM,
            oversized_width_mm: Self::DEFAULT_OVERSIZED_WIDTH_MM,
            protruding_height_mm: Self::DEFAULT_PROTRUDING_HEIGHT_MM,
            tail_lift_height_mm: Self::DEFAULT_TAIL_LIFT_HEIGHT_MM,
            oversized_rate_per_kg_gbp: Self::DEFAULT_OVERSIZED_RATE_PER_KG_GBP,
            tail_lift_surcharge_gbp: Self::DEFAULT_TAIL_LIFT_SURCHARGE_GBP,
        }
    }
}

/// Finds the cheapest plot that accommodates the load.
///
/// Plots are considered in ascending order of effective base cost. When no plot
/// fits, the most expensive plot is returned so classification never fails;
/// callers learn about an inexact match from the oversized flag of
/// [`assess_load`].
///
/// # Parameters
/// * `dims` - Load dimensions in millimetres and weight in kg
/// * `table` - Default plot table
/// * `overrides` - Active administrator overrides
///
/// # Returns
/// The matched plot with its effective base cost
pub fn best_fit_plot(
    dims: &LoadDimensions,
    table: &RateTable,
    overrides: &OverrideSet,
) -> PlotSpecification {
    let plots = table.effective_plots(overrides);
    if let Some(plot) = plots.iter().find(|plot| plot.accommodates(dims)) {
        return plot.clone();
    }

    let fallback = plots
        .last()
        .cloned()
        .expect("rate table always holds at least one plot");
    debug!(
        length_mm = dims.length_mm,
        width_mm = dims.width_mm,
        height_mm = dims.height_mm,
        weight_kg = dims.weight_kg,
        plot = %fallback.name,
        "No plot accommodates load, using largest plot"
    );
    fallback
}

/// Classifies and prices a load with the default [`PricingRules`].
pub fn assess_load(
    dims: &LoadDimensions,
    table: &RateTable,
    overrides: &OverrideSet,
) -> LoadAssessment {
    assess_load_with_rules(dims, table, overrides, &PricingRules::default())
}

/// Classifies and prices a load.
///
/// Oversized loads discard the matched plot's cost and are billed per kilogram;
/// the tail-lift surcharge is added on top of either price.
pub fn assess_load_with_rules(
    dims: &LoadDimensions,
    table: &RateTable,
    overrides: &OverrideSet,
    rules: &PricingRules,
) -> LoadAssessment {
    let is_oversized =
        dims.length_mm > rules.oversized_length_mm || dims.width_mm > rules.oversized_width_mm;
    let is_protruding = dims.height_mm > rules.protruding_height_mm;

    let matched = best_fit_plot(dims, table, overrides);
    let mut cost = matched.base_cost_gbp;
    let mut additional_charges = Vec::new();

    if is_oversized {
        let weight = decimal_from_f64(dims.weight_kg);
        cost = round_money(weight * rules.oversized_rate_per_kg_gbp);
        additional_charges.push(format!(
            "Oversized load: {} kg at £{}/kg = £{}",
            weight, rules.oversized_rate_per_kg_gbp, cost
        ));
    }

    let mut total = cost;
    if dims.height_mm > rules.tail_lift_height_mm {
        total += rules.tail_lift_surcharge_gbp;
        additional_charges.push(format!(
            "Tail-lift surcharge: £{}",
            round_money(rules.tail_lift_surcharge_gbp)
        ));
    }

    LoadAssessment {
        is_oversized,
        is_protruding,
        is_balanced: !is_oversized && !is_protruding,
        is_fragile: false,
        recommended_plot_name: matched.name,
        calculated_cost_gbp: cost,
        additional_charges,
        total_cost_gbp: round_money(total),
    }
}
