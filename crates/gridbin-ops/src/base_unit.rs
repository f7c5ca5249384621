use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_types::{BASE_BOTTOM_BEVEL, BASE_TOP_BEVEL};
use tracing::debug;

use crate::types::OpError;

/// One horizontal cross-section of a base tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseSection {
    pub z: f64,
    pub size: f64,
    pub radius: f64,
}

/// The four stacked sections of a base tile, top first. The corner radius
/// shrinks in proportion to the section size.
pub fn base_sections(
    base_height: f64,
    tile_size: f64,
    corner_radius: f64,
) -> Result<[BaseSection; 4], OpError> {
    if !base_height.is_finite() || base_height <= BASE_TOP_BEVEL + BASE_BOTTOM_BEVEL {
        return Err(OpError::InvalidParameter {
            reason: format!(
                "base height must exceed {}, got {base_height}",
                BASE_TOP_BEVEL + BASE_BOTTOM_BEVEL
            ),
        });
    }
    let bottom_size = tile_size - 2.0 * (BASE_TOP_BEVEL + BASE_BOTTOM_BEVEL);
    if bottom_size <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: format!("tile size {tile_size} leaves no room for the base bevels"),
        });
    }

    let section = |z: f64, size: f64| BaseSection {
        z,
        size,
        radius: corner_radius * size / tile_size,
    };
    let waist = tile_size - 2.0 * BASE_TOP_BEVEL;
    Ok([
        section(base_height, tile_size),
        section(base_height - BASE_TOP_BEVEL, waist),
        section(BASE_BOTTOM_BEVEL, waist),
        section(0.0, bottom_size),
    ])
}

/// Loft one base tile, centered on the origin with its foot at z = 0.
pub fn build_base_unit(
    kernel: &mut dyn Kernel,
    base_height: f64,
    tile_size: f64,
    corner_radius: f64,
) -> Result<KernelSolidHandle, OpError> {
    let sections = base_sections(base_height, tile_size, corner_radius)?;
    let mut profiles = Vec::with_capacity(sections.len());
    for s in &sections {
        profiles.push((kernel.rounded_rect_profile(s.size, s.size, s.radius)?, s.z));
    }
    let unit = kernel.loft_profiles(profiles)?;
    debug!(base_height, tile_size, "base unit lofted");
    Ok(unit)
}
