//! Rate tables, administrator overrides and tiered pricing lookups.
//!
//! The default tables are fixed at process start. Overrides are layered on
//! top of them by key (plot name or tier number) and never mutate the defaults;
//! an override whose key matches no default entry is inert.
//!
//! All money values and multipliers are [`Decimal`]; rounding to pence happens
//! only when a value is presented.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{LoadAssessment, PlotSpecification, ValidationError};
use crate::types::validation;

/// A distance band with its per-mile, per-pallet rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DistanceTier {
    pub tier_number: u8,
    pub range_label: String,
    #[schema(value_type = String, example = "1.20")]
    pub rate_per_mile_per_pallet_gbp: Decimal,
    pub min_distance_miles: f64,
    pub max_distance_miles: Option<f64>,
}

/// A band of actual-vs-standard weight ratio with its price multiplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightRatioTier {
    pub tier_number: u8,
    pub range_label: String,
    #[schema(value_type = String, example = "0.85")]
    pub multiplier: Decimal,
    pub percentage_label: String,
    pub min_ratio: f64,
    pub max_ratio: Option<f64>,
}

/// Common shape of the range-bucketed tables.
pub trait Tiered {
    fn tier_number(&self) -> u8;

    /// Lower bound (inclusive).
    fn lower_bound(&self) -> f64;

    /// Upper bound (inclusive), `None` for an open-ended last tier.
    fn upper_bound(&self) -> Option<f64>;

    fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound() && self.upper_bound().is_none_or(|max| value <= max)
    }
}

impl Tiered for DistanceTier {
    fn tier_number(&self) -> u8 {
        self.tier_number
    }

    fn lower_bound(&self) -> f64 {
        self.min_distance_miles
    }

    fn upper_bound(&self) -> Option<f64> {
        self.max_distance_miles
    }
}

impl Tiered for WeightRatioTier {
    fn tier_number(&self) -> u8 {
        self.tier_number
    }

    fn lower_bound(&self) -> f64 {
        self.min_ratio
    }

    fn upper_bound(&self) -> Option<f64> {
        self.max_ratio
    }
}

/// Returns the tier whose range contains `value`.
///
/// Tiers are scanned in ascending order of their lower bound; when two ranges
/// share a boundary the first matching tier wins.
pub fn range_for<T: Tiered>(value: f64, tiers: &[T]) -> Option<&T> {
    let mut ordered: Vec<&T> = tiers.iter().collect();
    ordered.sort_by(|a, b| a.lower_bound().total_cmp(&b.lower_bound()));
    ordered.into_iter().find(|tier| tier.contains(value))
}

/// Formats a multiplier as a percentage label.
///
/// # Examples
/// ```
/// use haulage_engine::rates::percentage_label;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(percentage_label(dec!(0.85)), "15% discount");
/// assert_eq!(percentage_label(dec!(1.25)), "25% surcharge");
/// assert_eq!(percentage_label(dec!(1.00)), "0%");
/// ```
pub fn percentage_label(multiplier: Decimal) -> String {
    let percent = ((multiplier - Decimal::ONE) * dec!(100)).normalize();
    if multiplier < Decimal::ONE {
        format!("{}% discount", percent.abs())
    } else if multiplier > Decimal::ONE {
        format!("{}% surcharge", percent)
    } else {
        format!("{}%", percent)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlotOverride {
    pub name: String,
    #[schema(value_type = String, example = "60.00")]
    pub base_cost_gbp: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DistanceTierOverride {
    pub tier: u8,
    #[schema(value_type = String, example = "1.10")]
    pub rate_gbp: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeightRatioTierOverride {
    pub tier: u8,
    #[schema(value_type = String, example = "0.90")]
    pub multiplier: Decimal,
}

/// Administrator replacements for individual default values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverrideSet {
    #[serde(default)]
    pub plot_overrides: Vec<PlotOverride>,
    #[serde(default)]
    pub distance_tier_overrides: Vec<DistanceTierOverride>,
    #[serde(default)]
    pub weight_ratio_tier_overrides: Vec<WeightRatioTierOverride>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        self.plot_overrides.is_empty()
            && self.distance_tier_overrides.is_empty()
            && self.weight_ratio_tier_overrides.is_empty()
    }

    /// Sets the base cost of a plot, replacing any earlier override for it.
    pub fn set_plot_cost(&mut self, name: &str, base_cost_gbp: Decimal) {
        self.reset_plot(name);
        self.plot_overrides.push(PlotOverride {
            name: name.to_string(),
            base_cost_gbp,
        });
    }

    pub fn set_distance_rate(&mut self, tier: u8, rate_gbp: Decimal) {
        self.reset_distance_tier(tier);
        self.distance_tier_overrides
            .push(DistanceTierOverride { tier, rate_gbp });
    }

    pub fn set_weight_multiplier(&mut self, tier: u8, multiplier: Decimal) {
        self.reset_weight_ratio_tier(tier);
        self.weight_ratio_tier_overrides
            .push(WeightRatioTierOverride { tier, multiplier });
    }

    pub fn reset_plot(&mut self, name: &str) {
        self.plot_overrides.retain(|o| o.name != name);
    }

    pub fn reset_distance_tier(&mut self, tier: u8) {
        self.distance_tier_overrides.retain(|o| o.tier != tier);
    }

    pub fn reset_weight_ratio_tier(&mut self, tier: u8) {
        self.weight_ratio_tier_overrides.retain(|o| o.tier != tier);
    }

    /// Drops every override.
    pub fn clear(&mut self) {
        self.plot_overrides.clear();
        self.distance_tier_overrides.clear();
        self.weight_ratio_tier_overrides.clear();
    }

    /// Rejects negative costs and rates and non-positive multipliers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for o in &self.plot_overrides {
            if o.base_cost_gbp.is_sign_negative() {
                return Err(ValidationError::InvalidValue(format!(
                    "Base cost for '{}' must not be negative",
                    o.name
                )));
            }
        }
        for o in &self.distance_tier_overrides {
            if o.rate_gbp.is_sign_negative() {
                return Err(ValidationError::InvalidValue(format!(
                    "Rate for distance tier {} must not be negative",
                    o.tier
                )));
            }
        }
        for o in &self.weight_ratio_tier_overrides {
            if o.multiplier <= Decimal::ZERO {
                return Err(ValidationError::InvalidValue(format!(
                    "Multiplier for weight ratio tier {} must be positive",
                    o.tier
                )));
            }
        }
        Ok(())
    }

    /// Keys that match no entry of the default tables.
    pub fn inert_keys(&self, table: &RateTable) -> Vec<String> {
        let plots = self
            .plot_overrides
            .iter()
            .filter(|o| !table.plots.iter().any(|p| p.name == o.name))
            .map(|o| format!("plot:{}", o.name));
        let distance = self
            .distance_tier_overrides
            .iter()
            .filter(|o| !table.distance_tiers.iter().any(|t| t.tier_number == o.tier))
            .map(|o| format!("distance_tier:{}", o.tier));
        let weight = self
            .weight_ratio_tier_overrides
            .iter()
            .filter(|o| {
                !table
                    .weight_ratio_tiers
                    .iter()
                    .any(|t| t.tier_number == o.tier)
            })
            .map(|o| format!("weight_ratio_tier:{}", o.tier));
        plots.chain(distance).chain(weight).collect()
    }
}

/// The default plot, distance and weight-ratio tables.
///
/// Accessors return copies so callers never mutate the shared defaults.
/// Tables are only built by [`RateTable::standard`], so every table holds at
/// least one plot and one tier of each kind. Overrides reprice entries but
/// never remove them.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    plots: Vec<PlotSpecification>,
    distance_tiers: Vec<DistanceTier>,
    weight_ratio_tiers: Vec<WeightRatioTier>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateTable {
    /// The standard tables used by the haulage network.
    pub fn standard() -> Self {
        Self {
            plots: standard_plots(),
            distance_tiers: standard_distance_tiers(),
            weight_ratio_tiers: standard_weight_ratio_tiers(),
        }
    }

    pub fn default_plots(&self) -> Vec<PlotSpecification> {
        self.plots.clone()
    }

    pub fn default_distance_tiers(&self) -> Vec<DistanceTier> {
        self.distance_tiers.clone()
    }

    pub fn default_weight_ratio_tiers(&self) -> Vec<WeightRatioTier> {
        self.weight_ratio_tiers.clone()
    }

    /// Base cost of the named plot with overrides applied.
    ///
    /// Unknown names yield `None`; overrides for them are inert.
    pub fn effective_cost(&self, name: &str, overrides: &OverrideSet) -> Option<Decimal> {
        let plot = self.plots.iter().find(|p| p.name == name)?;
        Some(
            overrides
                .plot_overrides
                .iter()
                .find(|o| o.name == name)
                .map_or(plot.base_cost_gbp, |o| o.base_cost_gbp),
        )
    }

    pub fn effective_rate(&self, tier: u8, overrides: &OverrideSet) -> Option<Decimal> {
        let default = self.distance_tiers.iter().find(|t| t.tier_number == tier)?;
        Some(
            overrides
                .distance_tier_overrides
                .iter()
                .find(|o| o.tier == tier)
                .map_or(default.rate_per_mile_per_pallet_gbp, |o| o.rate_gbp),
        )
    }

    pub fn effective_multiplier(&self, tier: u8, overrides: &OverrideSet) -> Option<Decimal> {
        let default = self
            .weight_ratio_tiers
            .iter()
            .find(|t| t.tier_number == tier)?;
        Some(
            overrides
                .weight_ratio_tier_overrides
                .iter()
                .find(|o| o.tier == tier)
                .map_or(default.multiplier, |o| o.multiplier),
        )
    }

    /// Plot specifications with overridden costs, sorted ascending by cost.
    ///
    /// Ties keep the order of the default table.
    pub fn effective_plots(&self, overrides: &OverrideSet) -> Vec<PlotSpecification> {
        let mut plots: Vec<PlotSpecification> = self
            .plots
            .iter()
            .map(|plot| PlotSpecification {
                base_cost_gbp: self
                    .effective_cost(&plot.name, overrides)
                    .unwrap_or(plot.base_cost_gbp),
                ..plot.clone()
            })
            .collect();
        plots.sort_by(|a, b| a.base_cost_gbp.cmp(&b.base_cost_gbp));
        plots
    }

    /// Distance tiers with overridden rates. Range boundaries are never overridden.
    pub fn effective_distance_tiers(&self, overrides: &OverrideSet) -> Vec<DistanceTier> {
        self.distance_tiers
            .iter()
            .map(|tier| DistanceTier {
                rate_per_mile_per_pallet_gbp: self
                    .effective_rate(tier.tier_number, overrides)
                    .unwrap_or(tier.rate_per_mile_per_pallet_gbp),
                ..tier.clone()
            })
            .collect()
    }

    /// Weight-ratio tiers with overridden multipliers and recomputed labels.
    pub fn effective_weight_ratio_tiers(&self, overrides: &OverrideSet) -> Vec<WeightRatioTier> {
        self.weight_ratio_tiers
            .iter()
            .map(|tier| {
                let multiplier = self
                    .effective_multiplier(tier.tier_number, overrides)
                    .unwrap_or(tier.multiplier);
                WeightRatioTier {
                    multiplier,
                    percentage_label: percentage_label(multiplier),
                    ..tier.clone()
                }
            })
            .collect()
    }
}

fn plot(
    name: &str,
    weight_capacity_kg: f64,
    (length_mm, width_mm, height_mm): (f64, f64, f64),
    base_cost_gbp: Decimal,
    description: &str,
) -> PlotSpecification {
    PlotSpecification {
        name: name.to_string(),
        weight_capacity_kg,
        length_mm,
        width_mm,
        height_mm,
        base_cost_gbp,
        description: description.to_string(),
    }
}

fn standard_plots() -> Vec<PlotSpecification> {
    vec![
        plot(
            "Mini Plot",
            150.0,
            (1200.0, 1000.0, 600.0),
            dec!(22.50),
            "Low single pallet, up to 0.6 m high",
        ),
        plot(
            "Quarter Plot",
            250.0,
            (1200.0, 1000.0, 800.0),
            dec!(28.00),
            "Quarter-height pallet, up to 0.8 m high",
        ),
        plot(
            "Half Plot",
            500.0,
            (1200.0, 1000.0, 1100.0),
            dec!(36.50),
            "Half-height pallet, up to 1.1 m high",
        ),
        plot(
            "Light Plot",
            750.0,
            (1200.0, 1000.0, 2200.0),
            dec!(45.00),
            "Full-height pallet with a reduced weight limit",
        ),
        plot(
            "Full Plot",
            1200.0,
            (1200.0, 1200.0, 2200.0),
            dec!(57.50),
            "Full-height, full-weight pallet space",
        ),
        plot(
            "Double Plot",
            2000.0,
            (2400.0, 1200.0, 2200.0),
            dec!(95.00),
            "Two adjoining pallet spaces for long loads",
        ),
    ]
}

fn standard_distance_tiers() -> Vec<DistanceTier> {
    let tier = |tier_number, range_label: &str, rate, min, max| DistanceTier {
        tier_number,
        range_label: range_label.to_string(),
        rate_per_mile_per_pallet_gbp: rate,
        min_distance_miles: min,
        max_distance_miles: max,
    };
    vec![
        tier(1, "0-50 miles", dec!(1.20), 0.0, Some(50.0)),
        tier(2, "51-150 miles", dec!(0.95), 50.0, Some(150.0)),
        tier(3, "151-300 miles", dec!(0.80), 150.0, Some(300.0)),
        tier(4, "300+ miles", dec!(0.70), 300.0, None),
    ]
}

fn standard_weight_ratio_tiers() -> Vec<WeightRatioTier> {
    let tier = |tier_number, range_label: &str, multiplier, min, max| WeightRatioTier {
        tier_number,
        range_label: range_label.to_string(),
        multiplier,
        percentage_label: percentage_label(multiplier),
        min_ratio: min,
        max_ratio: max,
    };
    vec![
        tier(1, "Up to 50%", dec!(0.85), 0.0, Some(0.5)),
        tier(2, "51-100%", dec!(1.00), 0.5, Some(1.0)),
        tier(3, "101-150%", dec!(1.15), 1.0, Some(1.5)),
        tier(4, "Over 150%", dec!(1.30), 1.5, None),
    ]
}

/// Converts a measured quantity into a decimal for pricing.
pub(crate) fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(4))
        .unwrap_or(Decimal::ZERO)
}

/// Rounds a money value to pence, halves away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price of a classified load carried over a distance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JourneyQuote {
    #[schema(value_type = String)]
    pub load_cost_gbp: Decimal,
    pub distance_tier: u8,
    #[schema(value_type = String)]
    pub rate_per_mile_per_pallet_gbp: Decimal,
    #[schema(value_type = String)]
    pub distance_charge_gbp: Decimal,
    pub weight_ratio_tier: u8,
    #[schema(value_type = String)]
    pub multiplier: Decimal,
    pub percentage_label: String,
    #[schema(value_type = String, example = "123.45")]
    pub total_gbp: Decimal,
}

/// Scales an assessed load price by haul distance and weight ratio.
///
/// `distance_charge = rate * miles * pallets`, then the load cost plus the
/// distance charge is multiplied by the weight-ratio multiplier. Values outside
/// every tier fall back to the last tier.
///
/// # Parameters
/// * `assessment` - Result of [`crate::classifier::assess_load`]
/// * `distance_miles` - Haul distance
/// * `pallets` - Number of pallets charged per mile
/// * `weight_ratio` - Actual weight divided by the standard plot weight
pub fn quote_journey(
    assessment: &LoadAssessment,
    distance_miles: f64,
    pallets: u32,
    weight_ratio: f64,
    table: &RateTable,
    overrides: &OverrideSet,
) -> Result<JourneyQuote, ValidationError> {
    validation::validate_non_negative(distance_miles, "Distance")?;
    validation::validate_non_negative(weight_ratio, "Weight ratio")?;
    if pallets == 0 {
        return Err(ValidationError::InvalidValue(
            "Pallet count must be at least 1".to_string(),
        ));
    }

    let distance_tiers = table.effective_distance_tiers(overrides);
    let distance_tier = range_for(distance_miles, &distance_tiers)
        .or(distance_tiers.last())
        .ok_or_else(|| {
            ValidationError::InvalidConfiguration("No distance tiers defined".to_string())
        })?;

    let ratio_tiers = table.effective_weight_ratio_tiers(overrides);
    let ratio_tier = range_for(weight_ratio, &ratio_tiers)
        .or(ratio_tiers.last())
        .ok_or_else(|| {
            ValidationError::InvalidConfiguration("No weight ratio tiers defined".to_string())
        })?;

    let distance_charge = distance_tier.rate_per_mile_per_pallet_gbp
        * decimal_from_f64(distance_miles)
        * Decimal::from(pallets);
    let total = (assessment.total_cost_gbp + distance_charge) * ratio_tier.multiplier;

    Ok(JourneyQuote {
        load_cost_gbp: assessment.total_cost_gbp,
        distance_tier: distance_tier.tier_number,
        rate_per_mile_per_pallet_gbp: distance_tier.rate_per_mile_per_pallet_gbp,
        distance_charge_gbp: round_money(distance_charge),
        weight_ratio_tier: ratio_tier.tier_number,
        multiplier: ratio_tier.multiplier,
        percentage_label: ratio_tier.percentage_label.clone(),
        total_gbp: round_money(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(total: Decimal) -> LoadAssessment {
        LoadAssessment {
            is_oversized: false,
            is_protruding: false,
            is_balanced: true,
            is_fragile: false,
            recommended_plot_name: "Half Plot".to_string(),
            calculated_cost_gbp: total,
            additional_charges: Vec::new(),
            total_cost_gbp: total,
        }
    }

    #[test]
    fn default_tables_have_expected_shape() {
        let table = RateTable::standard();
        let plots = table.default_plots();
        assert_eq!(plots.len(), 6);
        assert!(
            plots
                .windows(2)
                .all(|w| w[0].base_cost_gbp <= w[1].base_cost_gbp)
        );
        assert_eq!(table.default_distance_tiers().len(), 4);
        assert_eq!(table.default_weight_ratio_tiers().len(), 4);
    }

    #[test]
    fn default_accessors_return_copies() {
        let table = RateTable::standard();
        let mut plots = table.default_plots();
        plots[0].base_cost_gbp = dec!(999);
        assert_eq!(
            table.effective_cost("Mini Plot", &OverrideSet::default()),
            Some(dec!(22.50))
        );
    }

    #[test]
    fn plot_override_round_trip_restores_default() {
        let table = RateTable::standard();
        let mut overrides = OverrideSet::default();
        let original = table.effective_cost("Full Plot", &overrides);

        overrides.set_plot_cost("Full Plot", dec!(70.00));
        assert_eq!(table.effective_cost("Full Plot", &overrides), Some(dec!(70.00)));

        overrides.reset_plot("Full Plot");
        assert_eq!(table.effective_cost("Full Plot", &overrides), original);
        assert_eq!(original, Some(dec!(57.50)));
    }

    #[test]
    fn setting_an_override_twice_keeps_one_entry() {
        let mut overrides = OverrideSet::default();
        overrides.set_distance_rate(2, dec!(1.00));
        overrides.set_distance_rate(2, dec!(1.05));
        assert_eq!(overrides.distance_tier_overrides.len(), 1);
        assert_eq!(
            RateTable::standard().effective_rate(2, &overrides),
            Some(dec!(1.05))
        );
    }

    #[test]
    fn unmatched_override_keys_are_inert() {
        let table = RateTable::standard();
        let mut overrides = OverrideSet::default();
        overrides.set_plot_cost("Ghost Plot", dec!(1.00));
        overrides.set_weight_multiplier(9, dec!(2.0));

        assert_eq!(table.effective_cost("Ghost Plot", &overrides), None);
        assert_eq!(table.effective_plots(&overrides), table.effective_plots(&OverrideSet::default()));
        assert_eq!(
            overrides.inert_keys(&table),
            vec!["plot:Ghost Plot".to_string(), "weight_ratio_tier:9".to_string()]
        );
    }

    #[test]
    fn effective_plots_resort_after_override() {
        let table = RateTable::standard();
        let mut overrides = OverrideSet::default();
        overrides.set_plot_cost("Double Plot", dec!(10.00));

        let plots = table.effective_plots(&overrides);
        assert_eq!(plots[0].name, "Double Plot");
        assert_eq!(plots[0].base_cost_gbp, dec!(10.00));
    }

    #[test]
    fn range_for_prefers_first_tier_on_shared_boundary() {
        let tiers = RateTable::standard().default_distance_tiers();
        assert_eq!(range_for(0.0, &tiers).map(|t| t.tier_number), Some(1));
        assert_eq!(range_for(50.0, &tiers).map(|t| t.tier_number), Some(1));
        assert_eq!(range_for(50.5, &tiers).map(|t| t.tier_number), Some(2));
        assert_eq!(range_for(1000.0, &tiers).map(|t| t.tier_number), Some(4));
        assert!(range_for(-1.0, &tiers).is_none());
    }

    #[test]
    fn percentage_label_is_recomputed_for_overrides_and_reset() {
        let table = RateTable::standard();
        let mut overrides = OverrideSet::default();
        overrides.set_weight_multiplier(1, dec!(0.80));
        let tiers = table.effective_weight_ratio_tiers(&overrides);
        assert_eq!(tiers[0].percentage_label, "20% discount");

        overrides.set_weight_multiplier(1, dec!(1.10));
        let tiers = table.effective_weight_ratio_tiers(&overrides);
        assert_eq!(tiers[0].percentage_label, "10% surcharge");

        overrides.reset_weight_ratio_tier(1);
        let tiers = table.effective_weight_ratio_tiers(&overrides);
        assert_eq!(tiers[0].percentage_label, "15% discount");
        assert_eq!(tiers[1].percentage_label, "0%");
    }

    #[test]
    fn override_validation_rejects_negative_values() {
        let mut overrides = OverrideSet::default();
        overrides.set_plot_cost("Full Plot", dec!(-1));
        assert!(overrides.validate().is_err());

        let mut overrides = OverrideSet::default();
        overrides.set_weight_multiplier(2, Decimal::ZERO);
        assert!(overrides.validate().is_err());
    }

    #[test]
    fn journey_quote_combines_distance_and_weight_ratio() {
        let table = RateTable::standard();
        let quote = quote_journey(
            &assessment(dec!(36.50)),
            100.0,
            2,
            0.4,
            &table,
            &OverrideSet::default(),
        )
        .expect("quote should succeed");

        // 0.95 * 100 * 2 = 190.00; (36.50 + 190.00) * 0.85 = 192.525, rounded half up
        assert_eq!(quote.distance_tier, 2);
        assert_eq!(quote.distance_charge_gbp, dec!(190.00));
        assert_eq!(quote.weight_ratio_tier, 1);
        assert_eq!(quote.total_gbp, dec!(192.53));
    }

    #[test]
    fn journey_quote_uses_overridden_rate() {
        let table = RateTable::standard();
        let mut overrides = OverrideSet::default();
        overrides.set_distance_rate(1, dec!(2.00));
        let quote = quote_journey(&assessment(dec!(10)), 10.0, 1, 0.75, &table, &overrides)
            .expect("quote should succeed");
        assert_eq!(quote.distance_charge_gbp, dec!(20.00));
        assert_eq!(quote.total_gbp, dec!(30.00));
    }

    #[test]
    fn journey_quote_rejects_zero_pallets() {
        let table = RateTable::standard();
        let result = quote_journey(
            &assessment(dec!(10)),
            10.0,
            0,
            1.0,
            &table,
            &OverrideSet::default(),
        );
        assert!(result.is_err());
    }
}
