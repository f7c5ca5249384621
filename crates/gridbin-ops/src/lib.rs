pub mod base_grid;
pub mod base_unit;
pub mod bezier;
pub mod cutout;
pub mod grid_area;
pub mod profile;
pub mod types;
pub mod wall;

pub use base_grid::{build_base_grid, plate_size, tile_centers};
pub use base_unit::{base_sections, build_base_unit, BaseSection};
pub use bezier::{fit_closed_spline, segment_extrema};
pub use cutout::build_cutout;
pub use grid_area::{grid_area, outline_bounds, snap_to_grid};
pub use profile::build_profile;
pub use types::*;
pub use wall::{build_wall, build_wall_with_cutouts, overlapping_cutouts};
