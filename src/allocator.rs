//! Greedy trailer allocation.
//!
//! Pallet items are placed one after another, in input order, on plots laid
//! out along the trailer:
//! - each item is classified to its best-fit plot, whose footprint it occupies
//! - stacks grow upwards, then across the trailer width, then along its length
//! - length, weight and volume limits stop the run; the items that did not fit
//!   are reported back with a reason instead of being dropped silently
//!
//! There is no backtracking and no optimality guarantee.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::classifier::best_fit_plot;
use crate::model::{LoadDimensions, PalletItem, PlotAllocation, PlotPosition, TrailerCapacity};
use crate::rates::{OverrideSet, RateTable};
use crate::types::{Dimensional, EPSILON_GENERAL};
use crate::volume::normalize_volume;

/// Tuning parameters for the placement heuristic.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AllocatorConfig {
    /// Gap left between stacks and between rows, in centimetres
    pub gap_cm: f64,
    /// Number of recently placed plots considered when advancing to a new row
    pub row_lookback: usize,
}

impl AllocatorConfig {
    pub const DEFAULT_GAP_CM: f64 = 10.0;
    pub const DEFAULT_ROW_LOOKBACK: usize = 3;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> AllocatorConfigBuilder {
        AllocatorConfigBuilder::default()
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            gap_cm: Self::DEFAULT_GAP_CM,
            row_lookback: Self::DEFAULT_ROW_LOOKBACK,
        }
    }
}

/// Builder for [`AllocatorConfig`].
#[derive(Clone, Debug, Default)]
pub struct AllocatorConfigBuilder {
    config: AllocatorConfig,
}

impl AllocatorConfigBuilder {
    /// Sets the gap between stacks and rows.
    pub fn gap_cm(mut self, gap: f64) -> Self {
        self.config.gap_cm = gap;
        self
    }

    /// Sets how many recent plots decide the row advance.
    pub fn row_lookback(mut self, lookback: usize) -> Self {
        self.config.row_lookback = lookback;
        self
    }

    pub fn build(self) -> AllocatorConfig {
        self.config
    }
}

/// Reasons why an item was not allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    TrailerLengthExceeded,
    WeightCapacityExceeded,
    VolumeCapacityExceeded,
    StackTooTall,
    AllocationHalted,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::TrailerLengthExceeded => "trailer_length_exceeded",
            RejectionReason::WeightCapacityExceeded => "weight_capacity_exceeded",
            RejectionReason::VolumeCapacityExceeded => "volume_capacity_exceeded",
            RejectionReason::StackTooTall => "stack_too_tall",
            RejectionReason::AllocationHalted => "allocation_halted",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::TrailerLengthExceeded => {
                write!(f, "No trailer length left for the item's plot")
            }
            RejectionReason::WeightCapacityExceeded => {
                write!(f, "Item would exceed the trailer's weight capacity")
            }
            RejectionReason::VolumeCapacityExceeded => {
                write!(f, "Item would exceed the trailer's volume capacity")
            }
            RejectionReason::StackTooTall => {
                write!(f, "Stacked item is taller than the trailer")
            }
            RejectionReason::AllocationHalted => {
                write!(f, "Not attempted because allocation stopped at an earlier item")
            }
        }
    }
}

/// Item that could not be allocated.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedItem {
    pub item: PalletItem,
    pub reason: RejectionReason,
}

/// Outcome of one allocation run.
///
/// `accepted` holds only the allocations made by this run; the caller appends
/// them to the existing layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AllocationResult {
    pub accepted: Vec<PlotAllocation>,
    pub rejected: Vec<RejectedItem>,
    /// Limit that stopped the run early, if any.
    pub halted_by: Option<RejectionReason>,
}

impl AllocationResult {
    /// Indicates whether every item was allocated.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.accepted.iter().map(|a| a.total_weight_kg).sum()
    }

    pub fn total_volume_m3(&self) -> f64 {
        self.accepted.iter().map(|a| a.total_volume_m3).sum()
    }
}

/// Events emitted during allocation for live visualisation.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum AllocationEvent {
    /// An item was placed on a new plot.
    ItemPlaced {
        plot_id: String,
        plot_type: String,
        item: String,
        position: PlotPosition,
        cumulative_weight_kg: f64,
        cumulative_volume_m3: f64,
    },
    /// An item was not allocated.
    ItemRejected {
        item: String,
        reason_code: String,
        reason_text: String,
    },
    /// Allocation finished.
    Finished { accepted: usize, rejected: usize },
}

/// Result of the capacity pre-check.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct AllocationCheck {
    pub can_allocate: bool,
    pub reason: Option<String>,
}

/// Placement cursor inside the trailer.
struct Cursor {
    x: f64,
    y: f64,
    z: f64,
    recent_lengths: VecDeque<f64>,
    lookback: usize,
}

impl Cursor {
    /// Starts behind the furthest existing plot.
    fn after(existing: &[PlotAllocation], lookback: usize) -> Self {
        let x = existing
            .iter()
            .map(|a| a.position.end_x_cm())
            .fold(0.0, f64::max);
        Self {
            x,
            y: 0.0,
            z: 0.0,
            recent_lengths: VecDeque::with_capacity(lookback.max(1)),
            lookback: lookback.max(1),
        }
    }

    fn remember(&mut self, plot_length: f64) {
        if self.recent_lengths.len() == self.lookback {
            self.recent_lengths.pop_front();
        }
        self.recent_lengths.push_back(plot_length);
    }

    /// Starts a new row further along the trailer.
    fn next_row(&mut self, plot_length: f64) {
        let advance = self
            .recent_lengths
            .iter()
            .copied()
            .fold(plot_length, f64::max);
        self.x += advance;
        self.y = 0.0;
        self.z = 0.0;
    }

    /// Starts a new stack beside the current one, wrapping to a new row when needed.
    fn next_stack(&mut self, plot_width: f64, plot_length: f64, capacity: &TrailerCapacity, gap: f64) {
        self.z = 0.0;
        self.y += plot_width + gap;
        if self.y + plot_width > capacity.width_cm + EPSILON_GENERAL {
            self.next_row(plot_length);
        }
    }
}

/// Weight and volume already on the trailer. Negative or non-finite entries count as zero.
fn existing_totals(existing: &[PlotAllocation]) -> (f64, f64) {
    existing.iter().fold((0.0, 0.0), |(weight, volume), a| {
        (
            weight + a.total_weight_kg.max(0.0),
            volume + a.total_volume_m3.max(0.0),
        )
    })
}

/// Allocates items with the default [`AllocatorConfig`].
///
/// # Parameters
/// * `items` - Items to place, in placement order
/// * `capacity` - Trailer limits
/// * `existing` - Allocations already on the trailer
/// * `table` / `overrides` - Plot table used to classify each item
pub fn allocate(
    items: Vec<PalletItem>,
    capacity: &TrailerCapacity,
    existing: &[PlotAllocation],
    table: &RateTable,
    overrides: &OverrideSet,
) -> AllocationResult {
    allocate_with_config(
        items,
        capacity,
        existing,
        table,
        overrides,
        AllocatorConfig::default(),
    )
}

/// Allocation with a custom configuration.
pub fn allocate_with_config(
    items: Vec<PalletItem>,
    capacity: &TrailerCapacity,
    existing: &[PlotAllocation],
    table: &RateTable,
    overrides: &OverrideSet,
    config: AllocatorConfig,
) -> AllocationResult {
    allocate_with_progress(items, capacity, existing, table, overrides, config, |_| {})
}

/// Allocation with a live progress callback.
///
/// Calls `on_event` for each placement and rejection (suitable for SSE).
pub fn allocate_with_progress(
    items: Vec<PalletItem>,
    capacity: &TrailerCapacity,
    existing: &[PlotAllocation],
    table: &RateTable,
    overrides: &OverrideSet,
    config: AllocatorConfig,
    mut on_event: impl FnMut(&AllocationEvent),
) -> AllocationResult {
    let mut cursor = Cursor::after(existing, config.row_lookback);
    let (mut total_weight, mut total_volume) = existing_totals(existing);
    let mut counter = existing.len() + 1;

    let mut result = AllocationResult::default();

    for item in items {
        if result.halted_by.is_some() {
            reject(&mut result, item, RejectionReason::AllocationHalted, &mut on_event);
            continue;
        }

        let dims = item.dimensions();
        let volume = normalize_volume(item.volume_m3, Some(dims));
        let plot = best_fit_plot(
            &LoadDimensions::from_dims(dims, item.weight_kg),
            table,
            overrides,
        );
        let (plot_length, plot_width, _) = plot.footprint_cm();
        let stacked_height = item.stacked_height_cm();

        if stacked_height > capacity.height_cm + EPSILON_GENERAL {
            debug!(item = item.label(), stacked_height, "Stack taller than trailer");
            reject(&mut result, item, RejectionReason::StackTooTall, &mut on_event);
            continue;
        }

        if cursor.y + plot_width > capacity.width_cm + EPSILON_GENERAL {
            cursor.next_row(plot_length);
        }
        if cursor.z + stacked_height > capacity.height_cm + EPSILON_GENERAL {
            cursor.next_stack(plot_width, plot_length, capacity, config.gap_cm);
        }

        let limit = if cursor.x + plot_length > capacity.length_cm + EPSILON_GENERAL {
            Some(RejectionReason::TrailerLengthExceeded)
        } else if total_weight + item.weight_kg > capacity.max_weight_kg + EPSILON_GENERAL {
            Some(RejectionReason::WeightCapacityExceeded)
        } else if total_volume + volume > capacity.max_volume_m3 + EPSILON_GENERAL {
            Some(RejectionReason::VolumeCapacityExceeded)
        } else {
            None
        };
        if let Some(reason) = limit {
            warn!(
                item = item.label(),
                reason = reason.code(),
                placed = result.accepted.len(),
                "Trailer limit reached, stopping allocation"
            );
            result.halted_by = Some(reason);
            reject(&mut result, item, reason, &mut on_event);
            continue;
        }

        let position = PlotPosition {
            x_cm: cursor.x,
            y_cm: cursor.y,
            z_cm: cursor.z,
            width_cm: plot_width,
            height_cm: stacked_height,
            length_cm: plot_length,
        };
        total_weight += item.weight_kg;
        total_volume += volume;

        let allocation = PlotAllocation {
            plot_id: format!("PLOT-{:03}", counter),
            plot_type: plot.name.clone(),
            position,
            total_weight_kg: item.weight_kg,
            total_volume_m3: volume,
            job_id: item.job_id.clone(),
            job_title: item.job_title.clone(),
            pallet_items: vec![item],
        };
        on_event(&AllocationEvent::ItemPlaced {
            plot_id: allocation.plot_id.clone(),
            plot_type: allocation.plot_type.clone(),
            item: allocation.pallet_items[0].label().to_string(),
            position,
            cumulative_weight_kg: total_weight,
            cumulative_volume_m3: total_volume,
        });
        result.accepted.push(allocation);
        counter += 1;

        cursor.remember(plot_length);
        cursor.z += stacked_height + config.gap_cm;
        if cursor.z >= capacity.height_cm {
            cursor.next_stack(plot_width, plot_length, capacity, config.gap_cm);
        }
    }

    on_event(&AllocationEvent::Finished {
        accepted: result.accepted.len(),
        rejected: result.rejected.len(),
    });
    result
}

fn reject(
    result: &mut AllocationResult,
    item: PalletItem,
    reason: RejectionReason,
    on_event: &mut impl FnMut(&AllocationEvent),
) {
    on_event(&AllocationEvent::ItemRejected {
        item: item.label().to_string(),
        reason_code: reason.code().to_string(),
        reason_text: reason.to_string(),
    });
    result.rejected.push(RejectedItem { item, reason });
}

/// Checks whether the items fit by total weight and volume, without placing them.
pub fn can_allocate(
    items: &[PalletItem],
    capacity: &TrailerCapacity,
    existing: &[PlotAllocation],
) -> AllocationCheck {
    let (existing_weight, existing_volume) = existing_totals(existing);
    let item_weight: f64 = items.iter().map(|i| i.weight_kg).sum();
    let item_volume: f64 = items
        .iter()
        .map(|i| normalize_volume(i.volume_m3, Some(i.dimensions())))
        .sum();

    let total_weight = existing_weight + item_weight;
    if total_weight > capacity.max_weight_kg + EPSILON_GENERAL {
        return AllocationCheck {
            can_allocate: false,
            reason: Some(format!(
                "Total weight {:.1} kg exceeds trailer capacity of {:.1} kg",
                total_weight, capacity.max_weight_kg
            )),
        };
    }

    let total_volume = existing_volume + item_volume;
    if total_volume > capacity.max_volume_m3 + EPSILON_GENERAL {
        return AllocationCheck {
            can_allocate: false,
            reason: Some(format!(
                "Total volume {:.2} m³ exceeds trailer capacity of {:.2} m³",
                total_volume, capacity.max_volume_m3
            )),
        };
    }

    AllocationCheck {
        can_allocate: true,
        reason: None,
    }
}
