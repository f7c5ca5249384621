//! Planar wire builders on top of truck's builder API.
//!
//! truck has no rounded-rectangle or spline-loop primitive: every profile is
//! assembled edge by edge from shared vertices so the wire closes exactly.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use truck_modeling::builder;
use truck_modeling::topology::{Edge, Wire};
use truck_modeling::{InnerSpace, Point3};

use crate::types::{CubicSegment, KernelError};

/// Points closer than this are treated as one vertex.
const MERGE_EPS: f64 = 1e-9;

/// Closed counter-clockwise wire of straight edges through `points` (z = 0).
pub fn polygon_wire(points: &[[f64; 2]]) -> Result<Wire, KernelError> {
    if points.len() < 3 {
        return Err(KernelError::ProfileFailed {
            reason: format!("polygon needs at least 3 points, got {}", points.len()),
        });
    }
    let vertices: Vec<_> = points
        .iter()
        .map(|p| builder::vertex(Point3::new(p[0], p[1], 0.0)))
        .collect();
    let n = vertices.len();
    let edges: Vec<Edge> = (0..n)
        .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
        .collect();
    Ok(Wire::from_iter(edges))
}

/// Counter-clockwise rounded rectangle centered on the origin (z = 0).
///
/// Straight sides of zero length are dropped, so `radius == width / 2 ==
/// height / 2` produces a four-arc circle and a stadium keeps only its two
/// long sides.
pub fn rounded_rect_wire(width: f64, height: f64, radius: f64) -> Result<Wire, KernelError> {
    if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
        return Err(KernelError::ProfileFailed {
            reason: format!("rectangle size must be positive, got {width} x {height}"),
        });
    }
    let hw = width / 2.0;
    let hh = height / 2.0;
    let r = radius.max(0.0).min(hw.min(hh));

    if r < MERGE_EPS {
        return polygon_wire(&[[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]]);
    }

    // Corner arcs in CCW order: bottom-right, top-right, top-left, bottom-left.
    let corners = [
        (hw - r, -hh + r, -FRAC_PI_2),
        (hw - r, hh - r, 0.0),
        (-hw + r, hh - r, FRAC_PI_2),
        (-hw + r, -hh + r, PI),
    ];
    let arcs: Vec<(Point3, Point3, Point3)> = corners
        .iter()
        .map(|&(cx, cy, a0)| {
            let at = |a: f64| Point3::new(cx + r * a.cos(), cy + r * a.sin(), 0.0);
            (at(a0), at(a0 + FRAC_PI_4), at(a0 + FRAC_PI_2))
        })
        .collect();

    let first = builder::vertex(arcs[0].0);
    let mut current = first.clone();
    let mut edges: Vec<Edge> = Vec::with_capacity(8);
    for k in 0..4 {
        let (_, transit, end) = arcs[k];
        let next_start = arcs[(k + 1) % 4].0;
        let side_is_degenerate = (next_start - end).magnitude() < MERGE_EPS;

        let end_vertex = if k == 3 && side_is_degenerate {
            first.clone()
        } else {
            builder::vertex(end)
        };
        edges.push(builder::circle_arc(&current, &end_vertex, transit));
        current = end_vertex;

        if side_is_degenerate {
            continue;
        }
        let next_vertex = if k == 3 {
            first.clone()
        } else {
            builder::vertex(next_start)
        };
        edges.push(builder::line(&current, &next_vertex));
        current = next_vertex;
    }
    Ok(Wire::from_iter(edges))
}

/// Twice the signed area of the polygon through every segment's start and
/// control points. Positive for counter-clockwise curves.
pub fn segments_signed_area(segments: &[CubicSegment]) -> f64 {
    let pts: Vec<[f64; 2]> = segments
        .iter()
        .flat_map(|s| [s.start, s.control1, s.control2])
        .collect();
    let n = pts.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            pts[i][0] * pts[j][1] - pts[j][0] * pts[i][1]
        })
        .sum()
}

/// The same closed curve traversed in the opposite direction.
pub fn reversed_segments(segments: &[CubicSegment]) -> Vec<CubicSegment> {
    let n = segments.len();
    (0..n)
        .rev()
        .map(|i| CubicSegment {
            start: segments[(i + 1) % n].start,
            control1: segments[i].control2,
            control2: segments[i].control1,
        })
        .collect()
}

/// Closed wire of cubic Bezier edges (z = 0), wound counter-clockwise.
pub fn bezier_wire(segments: &[CubicSegment]) -> Result<Wire, KernelError> {
    if segments.len() < 2 {
        return Err(KernelError::ProfileFailed {
            reason: format!(
                "closed bezier curve needs at least 2 segments, got {}",
                segments.len()
            ),
        });
    }
    let ccw;
    let segments = if segments_signed_area(segments) < 0.0 {
        ccw = reversed_segments(segments);
        &ccw
    } else {
        segments
    };

    let to_point = |p: [f64; 2]| Point3::new(p[0], p[1], 0.0);
    let vertices: Vec<_> = segments
        .iter()
        .map(|s| builder::vertex(to_point(s.start)))
        .collect();
    let n = vertices.len();
    let mut edges: Vec<Edge> = Vec::with_capacity(n);
    for i in 0..n {
        let j = (i + 1) % n;
        if (to_point(segments[j].start) - to_point(segments[i].start)).magnitude() < MERGE_EPS {
            return Err(KernelError::ProfileFailed {
                reason: format!("bezier segment {i} has zero length"),
            });
        }
        edges.push(builder::bezier(
            &vertices[i],
            &vertices[j],
            vec![to_point(segments[i].control1), to_point(segments[i].control2)],
        ));
    }
    Ok(Wire::from_iter(edges))
}

/// Create a box solid via successive translational sweeps.
/// Origin at (0,0,0), extends to (w,h,d).
#[cfg(test)]
pub(crate) fn make_box(w: f64, h: f64, d: f64) -> truck_modeling::Solid {
    use truck_modeling::Vector3;

    let v = builder::vertex(Point3::new(0.0, 0.0, 0.0));
    let edge = builder::tsweep(&v, Vector3::new(w, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, h, 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, d))
}
