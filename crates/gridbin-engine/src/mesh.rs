//! Preview buffers handed to the renderer.

use gridbin_kernel::{EdgeRenderData, RenderMesh};
use serde::{Deserialize, Serialize};

/// Triangle and edge buffers of one bin solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMesh {
    pub faces: FaceBuffers,
    pub edges: EdgeBuffers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceBuffers {
    /// Flat `[x, y, z, ...]` positions.
    pub vertices: Vec<f32>,
    /// Three vertex indices per triangle.
    pub triangles: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_groups: Option<Vec<FaceGroup>>,
}

/// A run of `count` entries of `triangles`, starting at `start`, that
/// belongs to one kernel face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceGroup {
    pub start: u32,
    pub count: u32,
    pub face_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeBuffers {
    pub vertices: Vec<f32>,
    /// Two vertex indices per line segment.
    pub lines: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_groups: Option<Vec<EdgeGroup>>,
}

/// A run of `count` entries of `lines` that belongs to one kernel edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGroup {
    pub start: u32,
    pub count: u32,
    pub edge_id: u64,
}

impl ModelMesh {
    pub fn from_kernel(mesh: RenderMesh, edges: EdgeRenderData) -> Self {
        let face_groups = mesh
            .face_ranges
            .iter()
            .map(|r| FaceGroup {
                start: r.start_index,
                count: r.end_index - r.start_index,
                face_id: r.face_id.0,
            })
            .collect();
        let edge_groups = edges
            .edge_ranges
            .iter()
            .map(|r| EdgeGroup {
                start: r.start_index,
                count: r.end_index - r.start_index,
                edge_id: r.edge_id.0,
            })
            .collect();
        Self {
            faces: FaceBuffers {
                vertices: mesh.vertices,
                triangles: mesh.indices,
                normals: Some(mesh.normals),
                face_groups: Some(face_groups),
            },
            edges: EdgeBuffers {
                vertices: edges.vertices,
                lines: edges.lines,
                edge_groups: Some(edge_groups),
            },
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.triangles.len() / 3
    }

    /// Axis-aligned bounds of the face vertices, `None` when empty.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut chunks = self.faces.vertices.chunks_exact(3);
        let first = chunks.next()?;
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for p in chunks {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }
}
