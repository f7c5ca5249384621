use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_types::{GridArea, Outline, BIN_CORNER_RADIUS, FUSE_OVERLAP};
use tracing::{debug, warn};

use crate::cutout::{build_cutout, clamped_depth};
use crate::grid_area::outline_bounds;
use crate::types::OpError;

/// Index pairs of outlines whose world footprints overlap, judged by their
/// axis-aligned bounds. Outlines that cut nothing are skipped.
pub fn overlapping_cutouts(
    outlines: &[Outline],
    wall_height: f64,
) -> Result<Vec<(usize, usize)>, OpError> {
    let mut footprints = Vec::with_capacity(outlines.len());
    for (i, outline) in outlines.iter().enumerate() {
        if clamped_depth(outline, wall_height) > 0.0 {
            footprints.push((i, outline_bounds(outline)?));
        }
    }
    let mut pairs = Vec::new();
    for (k, (i, (a_min, a_max))) in footprints.iter().enumerate() {
        for (j, (b_min, b_max)) in &footprints[k + 1..] {
            let disjoint = a_max.x <= b_min.x
                || b_max.x <= a_min.x
                || a_max.y <= b_min.y
                || b_max.y <= a_min.y;
            if !disjoint {
                pairs.push((*i, *j));
            }
        }
    }
    Ok(pairs)
}

/// Extrude the wall blank over the grid area and subtract `cutouts` in
/// order. The wall frame floor is z = 0; the blank starts `FUSE_OVERLAP`
/// below it so it can sink into the bottom plate.
///
/// The cutout handles are borrowed and left alive.
pub fn build_wall(
    kernel: &mut dyn Kernel,
    area: &GridArea,
    wall_height: f64,
    cutouts: &[KernelSolidHandle],
) -> Result<KernelSolidHandle, OpError> {
    if !(wall_height > 0.0) || !wall_height.is_finite() {
        return Err(OpError::InvalidParameter {
            reason: format!("wall height must be positive, got {wall_height}"),
        });
    }
    let profile = kernel.rounded_rect_profile(area.width(), area.height(), BIN_CORNER_RADIUS)?;
    let mut wall = kernel.extrude_profile(profile, -FUSE_OVERLAP, wall_height + FUSE_OVERLAP)?;

    for tool in cutouts {
        match kernel.boolean_subtract(&wall, tool) {
            Ok(next) => {
                kernel.release(&wall);
                wall = next;
            }
            Err(e) => {
                kernel.release(&wall);
                return Err(e.into());
            }
        }
    }
    debug!(cutouts = cutouts.len(), wall_height, "wall built");
    Ok(wall)
}

/// Build every outline's cutout and the wall they carve, without caching.
/// The cutout tools are released before returning.
pub fn build_wall_with_cutouts(
    kernel: &mut dyn Kernel,
    area: &GridArea,
    wall_height: f64,
    outlines: &[Outline],
) -> Result<KernelSolidHandle, OpError> {
    for (i, j) in overlapping_cutouts(outlines, wall_height)? {
        warn!(
            first = %outlines[i].id,
            second = %outlines[j].id,
            "cutout footprints overlap"
        );
    }

    let center = area.center();
    let mut tools = Vec::with_capacity(outlines.len());
    let mut result = Ok(());
    for outline in outlines {
        match build_cutout(kernel, outline, center, wall_height) {
            Ok(Some(tool)) => tools.push(tool),
            Ok(None) => {}
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    let wall = result.and_then(|()| build_wall(kernel, area, wall_height, &tools));
    for tool in &tools {
        kernel.release(tool);
    }
    wall
}
