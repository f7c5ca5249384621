use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_types::{Outline, Point2, FUSE_OVERLAP};
use tracing::debug;

use crate::profile::build_profile;
use crate::types::OpError;

/// Pocket depth actually cut into a wall of `wall_height`.
pub fn clamped_depth(outline: &Outline, wall_height: f64) -> f64 {
    outline.depth.clamp(0.0, wall_height)
}

/// Build the cutting tool for one outline in the wall frame.
///
/// The wall frame has its floor at z = 0, its top at `wall_height`, and is
/// centered on `center` (the grid area center, editor frame) with X
/// mirrored. The tool reaches from `wall_height - depth` to just above the
/// wall top. A pocket whose floor would end within `FUSE_OVERLAP` of the
/// wall floor is cut through, below the blank. Returns `None` when the
/// clamped depth is zero.
pub fn build_cutout(
    kernel: &mut dyn Kernel,
    outline: &Outline,
    center: Point2,
    wall_height: f64,
) -> Result<Option<KernelSolidHandle>, OpError> {
    if !(wall_height > 0.0) || !wall_height.is_finite() {
        return Err(OpError::InvalidParameter {
            reason: format!("wall height must be positive, got {wall_height}"),
        });
    }
    if !outline.depth.is_finite() || !outline.rotation.is_finite() {
        return Err(OpError::InvalidParameter {
            reason: format!("outline '{}' has a non-finite depth or rotation", outline.id),
        });
    }

    let depth = clamped_depth(outline, wall_height);
    if depth <= 0.0 {
        debug!(id = %outline.id, "zero depth, no cutout");
        return Ok(None);
    }
    if outline.depth > wall_height {
        debug!(
            id = %outline.id,
            requested = outline.depth,
            depth,
            "cutout depth clamped to wall height"
        );
    }

    let profile = build_profile(kernel, outline)?;
    let offset = [
        -(outline.position.x - center.x),
        outline.position.y - center.y,
    ];
    let placed = kernel.place_profile(profile, -outline.rotation, offset)?;
    let floor = wall_height - depth;
    let bottom = if floor < FUSE_OVERLAP {
        -2.0 * FUSE_OVERLAP
    } else {
        floor
    };
    let tool = kernel.extrude_profile(placed, bottom, wall_height + FUSE_OVERLAP - bottom)?;
    debug!(id = %outline.id, depth, through = bottom < 0.0, "cutout built");
    Ok(Some(tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gridbin_kernel::MockKernel;

    #[test]
    fn test_cutout_spans_from_depth_to_above_top() {
        let mut kernel = MockKernel::new();
        let outline =
            Outline::rounded_rect("r", Point2::new(30.0, 10.0), 10.0, 4.0, 0.0).with_depth(5.0);
        let tool = build_cutout(&mut kernel, &outline, Point2::new(20.0, 20.0), 14.25)
            .unwrap()
            .unwrap();
        let bbox = kernel.bounding_box(&tool).unwrap();
        assert_relative_eq!(bbox.min[2], 9.25, epsilon = 1e-9);
        assert_relative_eq!(bbox.max[2], 14.25 + FUSE_OVERLAP, epsilon = 1e-9);
        // Center mirrored: x = -(30 - 20), y = 10 - 20.
        assert_relative_eq!(bbox.min[0], -15.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max[1], -8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_depth_clamped_to_wall() {
        let mut kernel = MockKernel::new();
        let outline =
            Outline::rounded_rect("r", Point2::new(0.0, 0.0), 4.0, 4.0, 1.0).with_depth(100.0);
        let tool = build_cutout(&mut kernel, &outline, Point2::new(0.0, 0.0), 10.0)
            .unwrap()
            .unwrap();
        assert_relative_eq!(
            kernel.bounding_box(&tool).unwrap().min[2],
            -2.0 * FUSE_OVERLAP,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_paper_thin_floor_is_cut_through() {
        let mut kernel = MockKernel::new();
        let center = Point2::new(0.0, 0.0);
        let thin = Outline::rounded_rect("r", center, 4.0, 4.0, 1.0)
            .with_depth(10.0 - FUSE_OVERLAP / 2.0);
        let tool = build_cutout(&mut kernel, &thin, center, 10.0).unwrap().unwrap();
        assert!(kernel.bounding_box(&tool).unwrap().min[2] < -FUSE_OVERLAP);

        let floored = thin.clone().with_depth(10.0 - 2.0 * FUSE_OVERLAP);
        let tool = build_cutout(&mut kernel, &floored, center, 10.0).unwrap().unwrap();
        assert_relative_eq!(
            kernel.bounding_box(&tool).unwrap().min[2],
            2.0 * FUSE_OVERLAP,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_depth_yields_none() {
        let mut kernel = MockKernel::new();
        let outline =
            Outline::rounded_rect("r", Point2::new(0.0, 0.0), 4.0, 4.0, 1.0).with_depth(-3.0);
        assert!(build_cutout(&mut kernel, &outline, Point2::new(0.0, 0.0), 10.0)
            .unwrap()
            .is_none());
        assert_eq!(kernel.live_solids(), 0);
    }
}
