//! Process-wide dimensions of the bin system. All values in millimeters.

/// Pitch of the base grid.
pub const GRID_CELL_SIZE: f64 = 42.0;

/// Clearance between neighbouring bins. Half of it is taken off each side
/// of the snapped grid area so adjacent bins interlock.
pub const GRID_TOLERANCE: f64 = 0.5;

/// Outer size of one base tile.
pub const BASE_TILE_SIZE: f64 = GRID_CELL_SIZE - GRID_TOLERANCE;

/// Corner radius of the wall blank and of the outer base tile section.
pub const BIN_CORNER_RADIUS: f64 = 3.75;

/// Flat plate between the base tiles and the walls.
pub const BOTTOM_PLATE_THICKNESS: f64 = 1.0;

/// First 45° inset, measured down from the top of the base.
pub const BASE_TOP_BEVEL: f64 = 2.15;

/// Last 45° inset at the very bottom of the base.
pub const BASE_BOTTOM_BEVEL: f64 = 0.8;

pub const DEFAULT_BASE_HEIGHT: f64 = 4.75;

pub const DEFAULT_TOTAL_HEIGHT: f64 = 20.0;

/// Overlap applied between stacked or cutting solids so the kernel never
/// has to resolve coplanar contact. Must stay well above the kernel's
/// boolean tolerance.
pub const FUSE_OVERLAP: f64 = 0.1;

/// The bottom plate is this much smaller than the grid area on every side,
/// so its side faces never line up with the outer faces of the edge tiles
/// or the wall.
pub const PLATE_INSET: f64 = 0.5;
