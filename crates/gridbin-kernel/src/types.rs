use serde::{Deserialize, Serialize};

/// Opaque handle to a solid in the geometry kernel.
/// NEVER persisted. Valid only for the current kernel session and only until
/// it is passed to [`crate::Kernel::release`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Handle to a closed planar profile lying in a plane parallel to XY.
///
/// Move-only: extrude, loft and placement consume the profile they are given.
#[derive(Debug, PartialEq, Eq)]
pub struct ProfileHandle(pub(crate) u64);

impl ProfileHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal entity identifier (faces and edges of a mesh).
/// Assigned by position within a solid, so repeated tessellation of the same
/// solid yields the same IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("profile construction failed: {reason}")]
    ProfileFailed { reason: String },

    #[error("extrusion failed: {reason}")]
    ExtrudeFailed { reason: String },

    #[error("loft failed: {reason}")]
    LoftFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("STEP export failed: {reason}")]
    ExportFailed { reason: String },

    #[error("solid not found: {id}")]
    SolidNotFound { id: u64 },

    #[error("profile not found: {id}")]
    ProfileNotFound { id: u64 },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// One cubic Bezier segment of a closed 2D curve.
///
/// The segment ends where the next segment of the curve starts; the last
/// segment ends at the first segment's `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub start: [f64; 2],
    pub control1: [f64; 2],
    pub control2: [f64; 2],
}

/// Tessellation quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshOptions {
    /// Maximum chord deviation from the exact surface, in mm.
    pub tolerance: f64,
    /// Maximum angle between adjacent facets along a curved feature, in radians.
    pub angular_tolerance: f64,
}

impl MeshOptions {
    /// Fold the angular tolerance into the chord tolerance for curved features
    /// of radius `feature_radius`: a circular arc split into steps of angle
    /// `a` deviates from its chords by `r * (1 - cos(a / 2))`.
    pub fn resolved(&self, feature_radius: f64) -> MeshOptions {
        let sag = feature_radius * (1.0 - (self.angular_tolerance / 2.0).cos());
        let tolerance = if sag > 0.0 {
            self.tolerance.min(sag)
        } else {
            self.tolerance
        };
        MeshOptions {
            tolerance,
            angular_tolerance: self.angular_tolerance,
        }
    }
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            angular_tolerance: 0.5,
        }
    }
}

/// Axis-aligned bounds of a solid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn include(&mut self, p: [f64; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    pub fn size(&self) -> [f64; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Volume of the overlap between two boxes (zero when disjoint).
    pub fn overlap_volume(&self, other: &BoundingBox) -> f64 {
        (0..3)
            .map(|i| (self.max[i].min(other.max[i]) - self.min[i].max(other.min[i])).max(0.0))
            .product()
    }

    pub fn volume(&self) -> f64 {
        self.size().iter().product()
    }
}

/// Tessellated triangle mesh for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, nx1, ny1, nz1, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Mapping from triangle ranges to logical faces.
    pub face_ranges: Vec<FaceRange>,
}

/// Maps a contiguous range of triangles to a logical face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRange {
    /// Position of the face within its solid.
    pub face_id: KernelId,
    /// Start index in the indices array (inclusive).
    pub start_index: u32,
    /// End index in the indices array (exclusive).
    pub end_index: u32,
}

/// Sampled edge polylines for rendering edge overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRenderData {
    /// Flat array of edge vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Line-segment index pairs into the vertex array.
    pub lines: Vec<u32>,
    /// Mapping from line index ranges to logical edges.
    pub edge_ranges: Vec<EdgeRange>,
}

/// Maps a contiguous range of the `lines` array to a logical edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRange {
    /// Position of the edge within its solid.
    pub edge_id: KernelId,
    /// Start index in the lines array (inclusive).
    pub start_index: u32,
    /// End index in the lines array (exclusive).
    pub end_index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_union_and_size() {
        let a = BoundingBox {
            min: [0.0, 0.0, 0.0],
            max: [1.0, 2.0, 3.0],
        };
        let b = BoundingBox {
            min: [-1.0, 1.0, 1.0],
            max: [0.5, 4.0, 2.0],
        };
        let u = a.union(&b);
        assert_eq!(u.min, [-1.0, 0.0, 0.0]);
        assert_eq!(u.size(), [2.0, 4.0, 3.0]);
        assert!((a.overlap_volume(&b) - 0.5 * 1.0 * 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_box_has_zero_size() {
        assert!(BoundingBox::empty().is_empty());
        assert_eq!(BoundingBox::empty().size(), [0.0; 3]);
    }

    #[test]
    fn test_angular_tolerance_tightens_chord_tolerance() {
        let options = MeshOptions {
            tolerance: 0.5,
            angular_tolerance: 0.2,
        };
        let resolved = options.resolved(4.0);
        let expected = 4.0 * (1.0 - 0.1f64.cos());
        assert!((resolved.tolerance - expected).abs() < 1e-12);

        let loose = MeshOptions {
            tolerance: 0.001,
            angular_tolerance: 0.5,
        };
        assert_eq!(loose.resolved(4.0).tolerance, 0.001);
    }
}
