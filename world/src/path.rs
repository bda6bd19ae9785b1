//! Polyline form of the enemy path.

use std::collections::BTreeSet;

use glam::Vec2;
use pipeline_defence_core::{CellCoord, GridSize};

/// Distance from the path end within which an enemy counts as arrived.
pub(crate) const ARRIVAL_EPSILON: f32 = 1e-3;

/// Enemy path expressed both as grid cells and as a world-space polyline.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    cells: Vec<CellCoord>,
    occupied: BTreeSet<CellCoord>,
    points: Vec<Vec2>,
    segment_lengths: Vec<f32>,
    cumulative: Vec<f32>,
    total_length: f32,
}

impl Path {
    /// Builds the polyline for `cells`, or `None` when the cells do not form a
    /// usable path: empty, outside `grid`, or repeating a cell.
    pub(crate) fn from_cells(cells: Vec<CellCoord>, grid: GridSize, tile_length: f32) -> Option<Self> {
        if cells.is_empty() || !(tile_length.is_finite() && tile_length > 0.0) {
            return None;
        }

        let mut occupied = BTreeSet::new();
        for cell in &cells {
            if !grid.contains(*cell) || !occupied.insert(*cell) {
                return None;
            }
        }

        let points: Vec<Vec2> = cells.iter().map(|cell| cell.center(tile_length)).collect();
        let segment_lengths: Vec<f32> = points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .collect();

        let mut cumulative = Vec::with_capacity(points.len());
        let mut travelled = 0.0;
        cumulative.push(travelled);
        for length in &segment_lengths {
            travelled += length;
            cumulative.push(travelled);
        }

        Some(Self {
            cells,
            occupied,
            points,
            segment_lengths,
            cumulative,
            total_length: travelled,
        })
    }

    /// Ordered waypoint cells from entry to exit.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Total arc length from the first to the last waypoint.
    #[must_use]
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Reports whether the path runs through `cell`.
    #[must_use]
    pub fn contains_cell(&self, cell: CellCoord) -> bool {
        self.occupied.contains(&cell)
    }

    /// Position reached after travelling `distance` along the path.
    ///
    /// Distances outside `[0, total_length]` clamp to the path ends.
    #[must_use]
    pub fn point_at(&self, distance: f32) -> Vec2 {
        let Some(first) = self.points.first() else {
            return Vec2::ZERO;
        };
        if self.segment_lengths.is_empty() || distance <= 0.0 {
            return *first;
        }

        let distance = distance.min(self.total_length);
        let after = self.cumulative.partition_point(|travelled| *travelled <= distance);
        let segment = after
            .saturating_sub(1)
            .min(self.segment_lengths.len() - 1);

        let length = self.segment_lengths[segment];
        if length <= 0.0 {
            return self.points[segment];
        }
        let t = (distance - self.cumulative[segment]) / length;
        self.points[segment].lerp(self.points[segment + 1], t.clamp(0.0, 1.0))
    }

    /// Reports whether `distance` reaches the end of the path.
    pub(crate) fn is_arrival(&self, distance: f32) -> bool {
        distance >= self.total_length - ARRIVAL_EPSILON
    }
}
