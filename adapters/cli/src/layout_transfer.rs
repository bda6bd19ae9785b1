use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use pipeline_defence_core::{CellCoord, GridSize, TowerKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LAYOUT_DOMAIN: &str = "pd";
const LAYOUT_VERSION: &str = "v1";
const FIELD_DELIMITER: char = ':';

/// Prefix written before the grid dimensions and payload.
pub(crate) const LAYOUT_HEADER: &str = "pd:v1";

/// Tower placements for one grid, shareable as a single line of text.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TowerLayout {
    pub(crate) grid: GridSize,
    pub(crate) tile_length: f32,
    pub(crate) towers: Vec<LayoutTower>,
}

/// One placed tower.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutTower {
    pub(crate) kind: TowerKind,
    pub(crate) cell: CellCoord,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    tile_length: f32,
    towers: Vec<LayoutTower>,
}

/// Failures while reading or writing layout strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    #[error("layout string was empty")]
    Empty,
    #[error("layout string is missing the {0} field")]
    MissingField(&'static str),
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    #[error("could not decode layout payload")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("could not read layout payload")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("tower at ({column}, {row}) lies outside the {columns}x{rows} grid")]
    TowerOutOfBounds {
        column: u32,
        row: u32,
        columns: u32,
        rows: u32,
    },
}

impl TowerLayout {
    /// Encodes the layout as `pd:v1:{cols}x{rows}:{base64(json)}`.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = Payload {
            tile_length: self.tile_length,
            towers: self.towers.clone(),
        };
        let encoded = STANDARD_NO_PAD.encode(serde_json::to_vec(&payload)?);
        Ok(format!(
            "{LAYOUT_HEADER}:{}x{}:{encoded}",
            self.grid.columns(),
            self.grid.rows()
        ))
    }

    /// Parses a layout string produced by [`TowerLayout::encode`].
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::Empty);
        }

        let mut parts = trimmed.splitn(4, FIELD_DELIMITER);
        let mut next = |field| parts.next().ok_or(LayoutTransferError::MissingField(field));
        let domain = next("prefix")?;
        let version = next("version")?;
        let dimensions = next("dimensions")?;
        let payload = next("payload")?;

        if domain != LAYOUT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != LAYOUT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let grid = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
        let decoded: Payload = serde_json::from_slice(&bytes)?;

        if let Some(tower) = decoded.towers.iter().find(|tower| !grid.contains(tower.cell)) {
            return Err(LayoutTransferError::TowerOutOfBounds {
                column: tower.cell.column(),
                row: tower.cell.row(),
                columns: grid.columns(),
                rows: grid.rows(),
            });
        }

        Ok(Self {
            grid,
            tile_length: decoded.tile_length,
            towers: decoded.towers,
        })
    }
}

fn parse_dimensions(dimensions: &str) -> Result<GridSize, LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;
    if columns == 0 || rows == 0 {
        return Err(invalid());
    }
    Ok(GridSize::new(columns, rows))
}
