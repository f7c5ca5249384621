use serde::{Deserialize, Serialize};

use crate::constants::{BOTTOM_PLATE_THICKNESS, GRID_CELL_SIZE, GRID_TOLERANCE};
use crate::outline::Point2;

/// Grid-aligned footprint of a bin in the editor frame.
///
/// Each side sits on a whole grid-cell multiple pulled in by half of
/// [`GRID_TOLERANCE`], so `width() + GRID_TOLERANCE` is always an exact
/// multiple of [`GRID_CELL_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridArea {
    pub min: Point2,
    pub max: Point2,
}

impl GridArea {
    /// The single cell used when there is nothing to enclose.
    pub fn default_cell() -> Self {
        let half_tol = GRID_TOLERANCE / 2.0;
        Self {
            min: Point2::new(half_tol, half_tol),
            max: Point2::new(GRID_CELL_SIZE - half_tol, GRID_CELL_SIZE - half_tol),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Number of grid cells spanned along X.
    pub fn cells_x(&self) -> usize {
        (self.width() / GRID_CELL_SIZE).round() as usize
    }

    /// Number of grid cells spanned along Y.
    pub fn cells_y(&self) -> usize {
        (self.height() / GRID_CELL_SIZE).round() as usize
    }
}

/// Bin-level parameters supplied with every build request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinParameters {
    /// Overall bin height, bottom of the base to the wall top.
    pub total_height: f64,
    /// Height of the lofted base section.
    pub base_height: f64,
}

impl BinParameters {
    pub fn new(total_height: f64, base_height: f64) -> Self {
        Self {
            total_height,
            base_height,
        }
    }

    /// Height of the wall block that sits on the bottom plate.
    pub fn wall_height(&self) -> f64 {
        self.total_height - self.base_height - BOTTOM_PLATE_THICKNESS
    }

    /// Z of the wall's bottom face in the bin frame.
    pub fn wall_floor(&self) -> f64 {
        self.base_height + BOTTOM_PLATE_THICKNESS
    }
}
