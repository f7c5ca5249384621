use gridbin_types::{GridArea, Outline, OutlineShape, Point2, GRID_CELL_SIZE, GRID_TOLERANCE};
use tracing::debug;

use crate::bezier::{fit_closed_spline, segment_extrema};
use crate::types::OpError;

/// World-space axis-aligned bounds `(min, max)` of one outline's silhouette,
/// in the editor frame.
pub fn outline_bounds(outline: &Outline) -> Result<(Point2, Point2), OpError> {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut include = |lo: Point2, hi: Point2| {
        min = Point2::new(min.x.min(lo.x), min.y.min(lo.y));
        max = Point2::new(max.x.max(hi.x), max.y.max(hi.y));
    };

    match &outline.shape {
        OutlineShape::Spline { points } => {
            let segments =
                fit_closed_spline(points).ok_or_else(|| OpError::DegenerateSpline {
                    id: outline.id.clone(),
                    points: crate::bezier::distinct_points(points).len(),
                })?;
            let n = segments.len();
            let world = |p: [f64; 2]| outline.to_world(Point2::new(p[0], p[1]));
            for i in 0..n {
                let (lo, hi) = segment_extrema(
                    world(segments[i].start),
                    world(segments[i].control1),
                    world(segments[i].control2),
                    world(segments[(i + 1) % n].start),
                );
                include(lo, hi);
            }
        }
        OutlineShape::RoundedRect {
            width,
            height,
            radius,
        } => {
            let r = radius.max(0.0);
            let cx = (width / 2.0 - r).max(0.0);
            let cy = (height / 2.0 - r).max(0.0);
            for (sx, sy) in [(1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
                let c = outline.to_world(Point2::new(sx * cx, sy * cy));
                include(
                    Point2::new(c.x - r, c.y - r),
                    Point2::new(c.x + r, c.y + r),
                );
            }
        }
    }

    if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
        return Err(OpError::InvalidParameter {
            reason: format!("outline '{}' has non-finite geometry", outline.id),
        });
    }
    Ok((min, max))
}

/// Snap raw bounds outward to whole grid cells, then pull each side in by
/// half the tolerance. At least one cell is kept along each axis.
pub fn snap_to_grid(min: Point2, max: Point2) -> GridArea {
    let half_tol = GRID_TOLERANCE / 2.0;
    let snap_axis = |lo: f64, hi: f64| {
        let first = (lo / GRID_CELL_SIZE).floor();
        let last = (hi / GRID_CELL_SIZE).ceil().max(first + 1.0);
        (
            first * GRID_CELL_SIZE + half_tol,
            last * GRID_CELL_SIZE - half_tol,
        )
    };
    let (min_x, max_x) = snap_axis(min.x, max.x);
    let (min_y, max_y) = snap_axis(min.y, max.y);
    GridArea {
        min: Point2::new(min_x, min_y),
        max: Point2::new(max_x, max_y),
    }
}

/// Smallest grid-aligned area enclosing every outline.
pub fn grid_area(outlines: &[Outline]) -> Result<GridArea, OpError> {
    if outlines.is_empty() {
        return Ok(GridArea::default_cell());
    }
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for outline in outlines {
        let (lo, hi) = outline_bounds(outline)?;
        min = Point2::new(min.x.min(lo.x), min.y.min(lo.y));
        max = Point2::new(max.x.max(hi.x), max.y.max(hi.y));
    }
    let area = snap_to_grid(min, max);
    debug!(
        cells_x = area.cells_x(),
        cells_y = area.cells_y(),
        "grid area computed"
    );
    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rounded_rect_bounds_follow_rotation() {
        let outline = Outline::rounded_rect("r", Point2::new(0.0, 0.0), 20.0, 10.0, 0.0)
            .with_rotation(90.0);
        let (min, max) = outline_bounds(&outline).unwrap();
        assert_relative_eq!(min.x, -5.0, epsilon = 1e-9);
        assert_relative_eq!(max.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_rounded_corners_stay_tight() {
        // A circle's bounds do not grow with rotation.
        let outline = Outline::rounded_rect("c", Point2::new(5.0, 5.0), 10.0, 10.0, 5.0)
            .with_rotation(37.0);
        let (min, max) = outline_bounds(&outline).unwrap();
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(max.y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_snap_exact_cell_boundary() {
        let area = snap_to_grid(Point2::new(0.0, 0.0), Point2::new(42.0, 84.0));
        assert_eq!(area.cells_x(), 1);
        assert_eq!(area.cells_y(), 2);
        assert_relative_eq!(area.min.x, 0.25);
        assert_relative_eq!(area.max.y, 83.75);
    }

    #[test]
    fn test_zero_width_keeps_one_cell() {
        let area = snap_to_grid(Point2::new(42.0, 10.0), Point2::new(42.0, 20.0));
        assert_eq!(area.cells_x(), 1);
        assert_relative_eq!(area.width(), GRID_CELL_SIZE - GRID_TOLERANCE);
    }

    #[test]
    fn test_empty_is_default_cell() {
        assert_eq!(grid_area(&[]).unwrap(), GridArea::default_cell());
    }

    #[test]
    fn test_degenerate_spline_is_named() {
        let outline = Outline::spline(
            "bad",
            Point2::new(0.0, 0.0),
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
        );
        match grid_area(&[outline]) {
            Err(OpError::DegenerateSpline { id, points }) => {
                assert_eq!(id, "bad");
                assert_eq!(points, 2);
            }
            other => panic!("expected DegenerateSpline, got {:?}", other),
        }
    }
}
