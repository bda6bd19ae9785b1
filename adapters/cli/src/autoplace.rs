use std::collections::BTreeSet;

use pipeline_defence_core::{CellCoord, GridSize, Seed};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cells touching the path (including diagonals) that are inside the grid and off the path.
pub(crate) fn candidate_cells(path: &[CellCoord], grid: GridSize) -> Vec<CellCoord> {
    let on_path: BTreeSet<CellCoord> = path.iter().copied().collect();
    let mut candidates = BTreeSet::new();

    for cell in path {
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let column = i64::from(cell.column()) + dx;
                let row = i64::from(cell.row()) + dy;
                let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
                    continue;
                };
                let neighbour = CellCoord::new(column, row);
                if grid.contains(neighbour) && !on_path.contains(&neighbour) {
                    let _ = candidates.insert(neighbour);
                }
            }
        }
    }

    candidates.into_iter().collect()
}

/// Picks as many affordable cells as the credits allow, shuffled by the run seed.
pub(crate) fn auto_layout(
    seed: Seed,
    path: &[CellCoord],
    grid: GridSize,
    credits: u32,
    placement_cost: u32,
) -> Vec<CellCoord> {
    let mut cells = candidate_cells(path, grid);
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed.get()));
    cells.shuffle(&mut rng);

    let affordable = credits.checked_div(placement_cost).unwrap_or(u32::MAX) as usize;
    cells.truncate(affordable);
    cells
}
