//! Closed centripetal Catmull-Rom fitting and cubic Bezier bounds.

use gridbin_kernel::CubicSegment;
use gridbin_types::Point2;

/// Centripetal parameterization exponent.
const ALPHA: f64 = 0.5;

/// Consecutive points closer than this collapse into one knot.
const COINCIDENT_EPS: f64 = 1e-9;

/// Drop consecutive duplicates, including a closing point equal to the first.
pub fn distinct_points(points: &[Point2]) -> Vec<Point2> {
    let mut out: Vec<Point2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |&q| q.distance(p) > COINCIDENT_EPS) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance(out[out.len() - 1]) <= COINCIDENT_EPS {
        out.pop();
    }
    out
}

/// Fit a closed curve through `points`, returning one cubic segment per
/// input knot. Segment `i` runs from knot `i` to knot `i + 1` (wrapping).
///
/// Returns `None` when fewer than 3 distinct knots remain.
pub fn fit_closed_spline(points: &[Point2]) -> Option<Vec<CubicSegment>> {
    let pts = distinct_points(points);
    let n = pts.len();
    if n < 3 {
        return None;
    }

    let segments = (0..n)
        .map(|i| {
            let p0 = pts[(i + n - 1) % n];
            let p1 = pts[i];
            let p2 = pts[(i + 1) % n];
            let p3 = pts[(i + 2) % n];

            let d1 = p0.distance(p1).powf(ALPHA);
            let d2 = p1.distance(p2).powf(ALPHA);
            let d3 = p2.distance(p3).powf(ALPHA);

            let c1 = if d1 > COINCIDENT_EPS {
                let k = 2.0 * d1 * d1 + 3.0 * d1 * d2 + d2 * d2;
                let den = 3.0 * d1 * (d1 + d2);
                Point2::new(
                    (d1 * d1 * p2.x - d2 * d2 * p0.x + k * p1.x) / den,
                    (d1 * d1 * p2.y - d2 * d2 * p0.y + k * p1.y) / den,
                )
            } else {
                p1
            };
            let c2 = if d3 > COINCIDENT_EPS {
                let k = 2.0 * d3 * d3 + 3.0 * d3 * d2 + d2 * d2;
                let den = 3.0 * d3 * (d3 + d2);
                Point2::new(
                    (d3 * d3 * p1.x - d2 * d2 * p3.x + k * p2.x) / den,
                    (d3 * d3 * p1.y - d2 * d2 * p3.y + k * p2.y) / den,
                )
            } else {
                p2
            };

            CubicSegment {
                start: [p1.x, p1.y],
                control1: [c1.x, c1.y],
                control2: [c2.x, c2.y],
            }
        })
        .collect();
    Some(segments)
}

/// Parameters in (0, 1) where one coordinate of a cubic Bezier is stationary.
fn stationary_params(v0: f64, v1: f64, v2: f64, v3: f64) -> Vec<f64> {
    // B'(t) / 3 = a t² + b t + c
    let a = -v0 + 3.0 * v1 - 3.0 * v2 + v3;
    let b = 2.0 * (v0 - 2.0 * v1 + v2);
    let c = v1 - v0;

    let mut roots = Vec::with_capacity(2);
    if a.abs() < 1e-12 {
        if b.abs() > 1e-12 {
            roots.push(-c / b);
        }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let sq = disc.sqrt();
            roots.push((-b + sq) / (2.0 * a));
            roots.push((-b - sq) / (2.0 * a));
        }
    }
    roots.retain(|t| *t > 0.0 && *t < 1.0);
    roots
}

fn eval(v0: f64, v1: f64, v2: f64, v3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * v0 + 3.0 * u * u * t * v1 + 3.0 * u * t * t * v2 + t * t * t * v3
}

/// Tight axis-aligned bounds `(min, max)` of the cubic Bezier with control
/// points `p0..p3`.
pub fn segment_extrema(p0: Point2, p1: Point2, p2: Point2, p3: Point2) -> (Point2, Point2) {
    let axis = |v0: f64, v1: f64, v2: f64, v3: f64| {
        let mut lo = v0.min(v3);
        let mut hi = v0.max(v3);
        for t in stationary_params(v0, v1, v2, v3) {
            let v = eval(v0, v1, v2, v3, t);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        (lo, hi)
    };
    let (min_x, max_x) = axis(p0.x, p1.x, p2.x, p3.x);
    let (min_y, max_y) = axis(p0.y, p1.y, p2.y, p3.y);
    (Point2::new(min_x, min_y), Point2::new(max_x, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_knots_are_input_points() {
        let segments = fit_closed_spline(&square()).unwrap();
        assert_eq!(segments.len(), 4);
        for (seg, p) in segments.iter().zip(square()) {
            assert_eq!(seg.start, [p.x, p.y]);
        }
    }

    #[test]
    fn test_uniform_square_controls() {
        // Equal chords reduce to the uniform tangent (p2 - p0) / 6.
        let segments = fit_closed_spline(&square()).unwrap();
        let first = segments[0];
        assert_relative_eq!(first.control1[0], 0.0 + (10.0 - 0.0) / 6.0, epsilon = 1e-12);
        assert_relative_eq!(first.control1[1], 0.0 + (0.0 - 10.0) / 6.0, epsilon = 1e-12);
        assert_relative_eq!(first.control2[0], 10.0 - (10.0 - 0.0) / 6.0, epsilon = 1e-12);
        assert_relative_eq!(first.control2[1], 0.0 - (10.0 - 0.0) / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut pts = square();
        pts.insert(1, Point2::new(0.0, 0.0));
        pts.push(Point2::new(0.0, 0.0));
        assert_eq!(distinct_points(&pts).len(), 4);
        assert_eq!(fit_closed_spline(&pts).unwrap().len(), 4);
    }

    #[test]
    fn test_two_distinct_points_rejected() {
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 0.0),
        ];
        assert!(fit_closed_spline(&pts).is_none());
    }

    #[test]
    fn test_extrema_bulge_past_endpoints() {
        let (min, max) = segment_extrema(
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 4.0),
            Point2::new(10.0, 4.0),
            Point2::new(10.0, 0.0),
        );
        // Peak at t = 0.5: 3 * 0.25 * 0.5 * 4 * 2 = 3
        assert_relative_eq!(max.y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(min.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(max.x, 10.0, epsilon = 1e-12);
    }
}
