use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_types::{
    GridArea, BIN_CORNER_RADIUS, BOTTOM_PLATE_THICKNESS, FUSE_OVERLAP, GRID_CELL_SIZE,
    PLATE_INSET,
};
use tracing::debug;

use crate::types::OpError;

/// Tile centers in the bin frame (grid area centered on the origin), row by
/// row along X.
pub fn tile_centers(area: &GridArea, tile_size: f64) -> Vec<[f64; 2]> {
    let (nx, ny) = (area.cells_x(), area.cells_y());
    let x0 = -area.width() / 2.0 + tile_size / 2.0;
    let y0 = -area.height() / 2.0 + tile_size / 2.0;
    (0..ny)
        .flat_map(|j| {
            (0..nx).map(move |i| {
                [
                    x0 + i as f64 * GRID_CELL_SIZE,
                    y0 + j as f64 * GRID_CELL_SIZE,
                ]
            })
        })
        .collect()
}

/// Width, depth and corner radius of the bottom plate for `area`.
pub fn plate_size(area: &GridArea) -> (f64, f64, f64) {
    (
        area.width() - 2.0 * PLATE_INSET,
        area.height() - 2.0 * PLATE_INSET,
        BIN_CORNER_RADIUS - PLATE_INSET,
    )
}

/// Fuse a copy of `unit` under every grid cell onto the bottom plate.
///
/// The plate's top sits at `base_height + BOTTOM_PLATE_THICKNESS`; its
/// underside sinks `FUSE_OVERLAP` into the tiles and its sides stay
/// `PLATE_INSET` inside the outer tile faces. `unit` is borrowed and left
/// alive.
pub fn build_base_grid(
    kernel: &mut dyn Kernel,
    area: &GridArea,
    base_height: f64,
    tile_size: f64,
    unit: &KernelSolidHandle,
) -> Result<KernelSolidHandle, OpError> {
    let (width, depth, radius) = plate_size(area);
    let profile = kernel.rounded_rect_profile(width, depth, radius)?;
    let mut acc = kernel.extrude_profile(
        profile,
        base_height - FUSE_OVERLAP,
        BOTTOM_PLATE_THICKNESS + FUSE_OVERLAP,
    )?;

    let centers = tile_centers(area, tile_size);
    for c in &centers {
        let step = kernel
            .translate_solid(unit, [c[0], c[1], 0.0])
            .and_then(|tile| {
                let fused = kernel.boolean_union(&acc, &tile);
                kernel.release(&tile);
                fused
            });
        kernel.release(&acc);
        acc = step?;
    }
    debug!(tiles = centers.len(), "base grid assembled");
    Ok(acc)
}
