#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic generator for the enemy path.
//!
//! The path meanders from column zero to the last column. Each step either
//! moves right or moves vertically toward a target row that is periodically
//! re-drawn, which produces sweeping vertical excursions rather than jitter.
//! A visited grid forbids revisiting a cell: whenever a vertical move would be
//! clamped in place or land on a visited cell, the walker steps right instead.
//! Because every step either advances a column or claims a fresh cell in the
//! current column, the walk finishes in fewer than `columns * rows` steps.

use std::cmp::Ordering;

use pipeline_defence_core::{rng::Mulberry32, tuning::PathTuning, CellCoord, GridSize, Seed};
use thiserror::Error;

/// Reasons a path cannot be generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The grid has no cells to route through.
    #[error("grid of {columns}x{rows} tiles cannot hold a path")]
    EmptyGrid {
        /// Number of columns requested.
        columns: u32,
        /// Number of rows requested.
        rows: u32,
    },
}

/// Generates the ordered waypoints of the enemy path for `seed`.
///
/// The first waypoint lies in column zero and the last in column
/// `columns - 1`. Column indices never decrease, no waypoint repeats, and every
/// waypoint lies inside `grid`.
pub fn generate(
    seed: Seed,
    grid: GridSize,
    tuning: &PathTuning,
) -> Result<Vec<CellCoord>, PathError> {
    if grid.columns() == 0 || grid.rows() == 0 {
        return Err(PathError::EmptyGrid {
            columns: grid.columns(),
            rows: grid.rows(),
        });
    }

    let mut walker = Walker::new(seed, grid, tuning);
    Ok(walker.walk())
}

#[derive(Clone, Copy, Debug)]
struct RowBand {
    low: u32,
    high: u32,
}

impl RowBand {
    fn for_rows(rows: u32) -> Self {
        if rows >= 3 {
            Self {
                low: 1,
                high: rows - 2,
            }
        } else {
            Self {
                low: 0,
                high: rows.saturating_sub(1),
            }
        }
    }

    fn clamp(self, row: i64) -> u32 {
        let clamped = row.clamp(i64::from(self.low), i64::from(self.high));
        u32::try_from(clamped).unwrap_or(self.low)
    }
}

struct Walker<'a> {
    rng: Mulberry32,
    grid: GridSize,
    band: RowBand,
    tuning: &'a PathTuning,
    visited: Vec<bool>,
}

impl<'a> Walker<'a> {
    fn new(seed: Seed, grid: GridSize, tuning: &'a PathTuning) -> Self {
        let capacity_u64 = u64::from(grid.columns()) * u64::from(grid.rows());
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            rng: Mulberry32::new(seed.get()),
            grid,
            band: RowBand::for_rows(grid.rows()),
            tuning,
            visited: vec![false; capacity],
        }
    }

    fn walk(&mut self) -> Vec<CellCoord> {
        let columns = self.grid.columns();
        let mut cells = Vec::with_capacity(usize::try_from(columns).unwrap_or(0));

        let mut current = CellCoord::new(0, self.sample_row());
        self.visit(current);
        cells.push(current);

        let mut target_row = self.sample_row();
        let budget = u64::from(columns) * u64::from(self.grid.rows());
        let mut steps = 0u64;

        while current.column() + 1 < columns {
            if steps >= budget {
                pad_to_right_edge(current, columns, &mut cells);
                break;
            }
            steps += 1;

            current = if self.rng.next_f64() < self.tuning.right_bias {
                CellCoord::new(current.column() + 1, current.row())
            } else {
                self.vertical_step(current, target_row)
            };
            self.visit(current);
            cells.push(current);

            if self.rng.next_f64() < self.tuning.retarget_chance {
                target_row = self.sample_row();
            }
        }

        cells
    }

    fn vertical_step(&mut self, from: CellCoord, target_row: u32) -> CellCoord {
        let delta: i64 = match from.row().cmp(&target_row) {
            Ordering::Less => 1,
            Ordering::Greater => -1,
            Ordering::Equal => {
                if self.rng.next_f64() < 0.5 {
                    1
                } else {
                    -1
                }
            }
        };

        let row = self.band.clamp(i64::from(from.row()) + delta);
        let candidate = CellCoord::new(from.column(), row);
        if row == from.row() || self.is_visited(candidate) {
            // Stalled: the column to the right is always unvisited.
            return CellCoord::new(from.column() + 1, from.row());
        }
        candidate
    }

    fn sample_row(&mut self) -> u32 {
        let fraction = self.tuning.band_low + self.rng.next_f64() * self.tuning.band_span;
        let row = (f64::from(self.grid.rows()) * fraction).floor();
        self.band.clamp(row as i64)
    }

    fn visit(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            self.visited[index] = true;
        }
    }

    fn is_visited(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(true, |index| self.visited.get(index).copied().unwrap_or(true))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.grid.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.grid.columns()).ok()?;
        Some(row * width + column)
    }
}

fn pad_to_right_edge(from: CellCoord, columns: u32, cells: &mut Vec<CellCoord>) {
    for column in from.column() + 1..columns {
        cells.push(CellCoord::new(column, from.row()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_keeps_one_row_margin_on_tall_grids() {
        let band = RowBand::for_rows(18);
        assert_eq!(band.clamp(-4), 1);
        assert_eq!(band.clamp(40), 16);
        assert_eq!(band.clamp(7), 7);
    }

    #[test]
    fn band_uses_every_row_on_short_grids() {
        let band = RowBand::for_rows(2);
        assert_eq!(band.clamp(-1), 0);
        assert_eq!(band.clamp(5), 1);
    }

    #[test]
    fn padding_reaches_last_column() {
        let mut cells = vec![CellCoord::new(3, 2)];
        pad_to_right_edge(CellCoord::new(3, 2), 6, &mut cells);
        assert_eq!(
            cells,
            vec![
                CellCoord::new(3, 2),
                CellCoord::new(4, 2),
                CellCoord::new(5, 2)
            ]
        );
    }

    #[test]
    fn stalled_vertical_step_moves_right() {
        let tuning = PathTuning::default();
        let mut walker = Walker::new(Seed::new(9), GridSize::new(4, 5), &tuning);
        walker.visit(CellCoord::new(1, 2));
        walker.visit(CellCoord::new(1, 3));
        let next = walker.vertical_step(CellCoord::new(1, 3), 1);
        assert_eq!(next, CellCoord::new(2, 3));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let result = generate(Seed::new(1), GridSize::new(0, 10), &PathTuning::default());
        assert_eq!(
            result,
            Err(PathError::EmptyGrid {
                columns: 0,
                rows: 10
            })
        );
    }
}
