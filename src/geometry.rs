//! Axis-aligned bounding-box checks for allocated plots.
//!
//! The allocator does not search for collision-free positions; these helpers
//! only report where a finished layout has overlapping plots.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{PlotAllocation, PlotPosition};

/// Checks whether two plot positions overlap in space.
///
/// Two boxes do NOT overlap when they are separated on at least one axis;
/// touching faces do not count as overlap.
pub fn intersects(a: &PlotPosition, b: &PlotPosition) -> bool {
    !(a.x_cm + a.length_cm <= b.x_cm
        || b.x_cm + b.length_cm <= a.x_cm
        || a.y_cm + a.width_cm <= b.y_cm
        || b.y_cm + b.width_cm <= a.y_cm
        || a.z_cm + a.height_cm <= b.z_cm
        || b.z_cm + b.height_cm <= a.z_cm)
}

/// Length of the overlap of two intervals, at least 0.0.
///
/// # Example
/// ```
/// use haulage_engine::geometry::overlap_1d;
///
/// assert_eq!(overlap_1d(0.0, 5.0, 3.0, 8.0), 2.0);
/// ```
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Overlapping floor area of two plots (length × width plane), in cm².
pub fn overlap_floor_area(a: &PlotPosition, b: &PlotPosition) -> f64 {
    let overlap_x = overlap_1d(a.x_cm, a.x_cm + a.length_cm, b.x_cm, b.x_cm + b.length_cm);
    let overlap_y = overlap_1d(a.y_cm, a.y_cm + a.width_cm, b.y_cm, b.y_cm + b.width_cm);
    overlap_x * overlap_y
}

/// Two allocated plots whose bounding boxes overlap.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LayoutConflict {
    pub first_plot_id: String,
    pub second_plot_id: String,
    pub floor_overlap_cm2: f64,
}

/// Lists every pair of overlapping plots in a layout.
pub fn layout_conflicts(allocations: &[PlotAllocation]) -> Vec<LayoutConflict> {
    let mut conflicts = Vec::new();
    for (i, a) in allocations.iter().enumerate() {
        for b in &allocations[i + 1..] {
            if intersects(&a.position, &b.position) {
                conflicts.push(LayoutConflict {
                    first_plot_id: a.plot_id.clone(),
                    second_plot_id: b.plot_id.clone(),
                    floor_overlap_cm2: overlap_floor_area(&a.position, &b.position),
                });
            }
        }
    }
    conflicts
}
