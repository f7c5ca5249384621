use serde::{Deserialize, Serialize};

/// A point in the 2D editing frame, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Rotate counter-clockwise about the origin by `degrees`.
    pub fn rotated(self, degrees: f64) -> Point2 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn translated(self, by: Point2) -> Point2 {
        Point2::new(self.x + by.x, self.y + by.y)
    }

    /// Mirror across the Y axis. Applied once when a shape enters the 3D frame.
    pub fn mirrored_x(self) -> Point2 {
        Point2::new(-self.x, self.y)
    }
}

/// A user-authored shape placed on the grid.
///
/// `position` is the shape's local origin in the editor frame; `rotation`
/// turns the local frame counter-clockwise about it. Fields the editor uses
/// only for display (name, color, selection state, ...) are accepted on
/// input and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    /// Stable identifier assigned by the editor.
    pub id: String,
    /// Local origin of the shape in the editor frame.
    pub position: Point2,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Requested pocket depth, measured down from the wall top.
    pub depth: f64,
    /// Shape-specific geometry.
    #[serde(flatten)]
    pub shape: OutlineShape,
}

/// Shape-specific geometry of an [`Outline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutlineShape {
    /// Closed free-form curve through `points` (local coordinates). The
    /// closing segment back to the first point is implied.
    Spline { points: Vec<Point2> },
    /// Rectangle centered on the local origin with rounded corners.
    /// `radius <= min(width, height) / 2` is guaranteed by the editor.
    RoundedRect { width: f64, height: f64, radius: f64 },
}

impl Outline {
    pub fn spline(id: impl Into<String>, position: Point2, points: Vec<Point2>) -> Self {
        Self {
            id: id.into(),
            position,
            rotation: 0.0,
            depth: 0.0,
            shape: OutlineShape::Spline { points },
        }
    }

    pub fn rounded_rect(
        id: impl Into<String>,
        position: Point2,
        width: f64,
        height: f64,
        radius: f64,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            rotation: 0.0,
            depth: 0.0,
            shape: OutlineShape::RoundedRect {
                width,
                height,
                radius,
            },
        }
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    /// Map a point from the local shape frame into the editor's world frame.
    pub fn to_world(&self, local: Point2) -> Point2 {
        local.rotated(self.rotation).translated(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_rounded_rect_ignores_display_fields() {
        let json = r##"{
            "id": "r1",
            "type": "RoundedRect",
            "position": {"x": 10.0, "y": -5.0},
            "rotation": 30.0,
            "depth": 12.0,
            "width": 80.0,
            "height": 60.0,
            "radius": 15.0,
            "name": "Caliper",
            "color": "#ff0000"
        }"##;
        let outline: Outline = serde_json::from_str(json).unwrap();
        assert_eq!(outline.id, "r1");
        assert_eq!(outline.rotation, 30.0);
        assert_eq!(
            outline.shape,
            OutlineShape::RoundedRect {
                width: 80.0,
                height: 60.0,
                radius: 15.0
            }
        );
    }

    #[test]
    fn test_deserialize_spline_defaults_rotation() {
        let json = r#"{
            "id": "s1",
            "type": "Spline",
            "position": {"x": 0.0, "y": 0.0},
            "depth": 5.0,
            "points": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}, {"x": 0.0, "y": 1.0}]
        }"#;
        let outline: Outline = serde_json::from_str(json).unwrap();
        assert_eq!(outline.rotation, 0.0);
        match outline.shape {
            OutlineShape::Spline { points } => assert_eq!(points.len(), 3),
            other => panic!("expected spline, got {:?}", other),
        }
    }

    #[test]
    fn test_to_world_rotates_then_translates() {
        let outline = Outline::rounded_rect("r", Point2::new(10.0, 20.0), 4.0, 2.0, 0.5)
            .with_rotation(90.0);
        let p = outline.to_world(Point2::new(1.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.y - 21.0).abs() < 1e-12);
    }
}
