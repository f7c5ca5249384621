use gridbin_kernel::{CubicSegment, Kernel, ProfileHandle};
use gridbin_types::{Outline, OutlineShape};
use tracing::debug;

use crate::bezier::{distinct_points, fit_closed_spline};
use crate::types::OpError;

/// Radius within this distance of both half-sides builds a circle.
const CIRCLE_EPS: f64 = 1e-9;

/// Mirror a curve across the Y axis. The editor's X axis runs opposite to
/// the bin frame's.
fn mirrored(segments: Vec<CubicSegment>) -> Vec<CubicSegment> {
    let flip = |p: [f64; 2]| [-p[0], p[1]];
    segments
        .into_iter()
        .map(|s| CubicSegment {
            start: flip(s.start),
            control1: flip(s.control1),
            control2: flip(s.control2),
        })
        .collect()
}

/// Build the closed planar profile of one outline in its local frame,
/// centered on the kernel origin with X mirrored.
pub fn build_profile(kernel: &mut dyn Kernel, outline: &Outline) -> Result<ProfileHandle, OpError> {
    match &outline.shape {
        OutlineShape::RoundedRect {
            width,
            height,
            radius,
        } => {
            let is_circle = (radius - width / 2.0).abs() < CIRCLE_EPS
                && (radius - height / 2.0).abs() < CIRCLE_EPS;
            if is_circle {
                debug!(id = %outline.id, radius, "circle profile");
                Ok(kernel.circle_profile(*radius)?)
            } else {
                debug!(id = %outline.id, width, height, radius, "rounded rectangle profile");
                Ok(kernel.rounded_rect_profile(*width, *height, *radius)?)
            }
        }
        OutlineShape::Spline { points } => {
            let segments =
                fit_closed_spline(points).ok_or_else(|| OpError::DegenerateSpline {
                    id: outline.id.clone(),
                    points: distinct_points(points).len(),
                })?;
            debug!(id = %outline.id, segments = segments.len(), "spline profile");
            Ok(kernel.bezier_profile(&mirrored(segments))?)
        }
    }
}
