//! Tessellation wrapper with face-range metadata.
//!
//! Wraps truck-meshalgo to produce RenderMesh with FaceRange entries
//! that map triangle index ranges to logical faces for picking, plus the
//! merged-mesh measurements (bounds, volume) the pipeline checks against.

use crate::types::*;
// Both globs export a `BoundingBox`; ours wins.
use crate::types::BoundingBox;
use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};

type TruckSolid = truck_modeling::Solid;

/// Tessellate a truck Solid into a RenderMesh with per-face tracking.
///
/// Face ids are the face's position in the boundary iteration order, so the
/// same solid always yields the same ids.
pub fn tessellate_solid(
    solid: &TruckSolid,
    tolerance: f64,
) -> std::result::Result<RenderMesh, KernelError> {
    if !(tolerance > 0.0) {
        return Err(KernelError::TessellationFailed {
            reason: format!("tolerance must be positive, got {tolerance}"),
        });
    }
    let meshed_solid = solid.triangulation(tolerance);

    let mut all_vertices: Vec<f32> = Vec::new();
    let mut all_normals: Vec<f32> = Vec::new();
    let mut all_indices: Vec<u32> = Vec::new();
    let mut face_ranges: Vec<FaceRange> = Vec::new();

    let mut face_index = 0u64;
    for shell in meshed_solid.boundaries().iter() {
        for face in shell.face_iter() {
            let face_id = KernelId(face_index);
            face_index += 1;

            let maybe_mesh: Option<PolygonMesh> = face.surface();
            let Some(face_mesh) = maybe_mesh else {
                continue;
            };

            let face_mesh = if !face.orientation() {
                let mut m = face_mesh;
                m.invert();
                m
            } else {
                face_mesh
            };

            let start_index = all_indices.len() as u32;
            let base_vertex = (all_vertices.len() / 3) as u32;

            let positions = face_mesh.positions();
            let normals = face_mesh.normals();

            for pos in positions {
                all_vertices.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
            }

            if normals.len() == positions.len() {
                for norm in normals {
                    all_normals.extend([norm[0] as f32, norm[1] as f32, norm[2] as f32]);
                }
            } else {
                for _ in 0..positions.len() {
                    all_normals.extend([0.0, 0.0, 1.0]);
                }
            }

            for tri in face_mesh.tri_faces() {
                for v in tri.iter() {
                    all_indices.push(v.pos as u32 + base_vertex);
                }
            }

            let end_index = all_indices.len() as u32;
            if end_index > start_index {
                face_ranges.push(FaceRange {
                    face_id,
                    start_index,
                    end_index,
                });
            }
        }
    }

    if all_vertices.is_empty() {
        return tessellate_solid_merged(solid, tolerance);
    }

    Ok(RenderMesh {
        vertices: all_vertices,
        normals: all_normals,
        indices: all_indices,
        face_ranges,
    })
}

/// Extract edge polylines from a solid for rendering edge overlays.
///
/// Each edge curve is sampled at the given tolerance and emitted as line
/// segments between consecutive samples.
pub fn extract_edges(solid: &TruckSolid, tolerance: f64) -> EdgeRenderData {
    use std::collections::HashSet;
    use truck_modeling::{BoundedCurve, ParameterDivision1D};

    let mut vertices: Vec<f32> = Vec::new();
    let mut lines: Vec<u32> = Vec::new();
    let mut edge_ranges: Vec<EdgeRange> = Vec::new();
    let mut seen_edges = HashSet::new();

    let mut edge_index = 0u64;
    for shell in solid.boundaries().iter() {
        for edge in shell.edge_iter() {
            // Each edge is shared by two faces.
            if !seen_edges.insert(edge.id()) {
                continue;
            }
            let edge_id = KernelId(edge_index);
            edge_index += 1;

            let curve = edge.oriented_curve();
            let range = curve.range_tuple();
            let (_params, points) = curve.parameter_division(range, tolerance);

            let first_vertex = (vertices.len() / 3) as u32;
            for pt in &points {
                vertices.extend([pt[0] as f32, pt[1] as f32, pt[2] as f32]);
            }

            let start_index = lines.len() as u32;
            for k in 1..points.len() as u32 {
                lines.push(first_vertex + k - 1);
                lines.push(first_vertex + k);
            }
            let end_index = lines.len() as u32;

            if end_index > start_index {
                edge_ranges.push(EdgeRange {
                    edge_id,
                    start_index,
                    end_index,
                });
            }
        }
    }

    EdgeRenderData {
        vertices,
        lines,
        edge_ranges,
    }
}

/// Merge the whole solid into one polygon mesh.
fn merged_polygon(solid: &TruckSolid, tolerance: f64) -> PolygonMesh {
    solid.triangulation(tolerance).to_polygon()
}

/// Fallback tessellation: merge everything into a single face range.
fn tessellate_solid_merged(
    solid: &TruckSolid,
    tolerance: f64,
) -> std::result::Result<RenderMesh, KernelError> {
    let mesh = merged_polygon(solid, tolerance);

    let positions = mesh.positions();
    let normals = mesh.normals();

    let mut vertices = Vec::with_capacity(positions.len() * 3);
    let mut norms = Vec::with_capacity(positions.len() * 3);
    let mut indices = Vec::new();

    for pos in positions {
        vertices.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
    }
    if normals.len() == positions.len() {
        for norm in normals {
            norms.extend([norm[0] as f32, norm[1] as f32, norm[2] as f32]);
        }
    } else {
        for _ in 0..positions.len() {
            norms.extend([0.0, 0.0, 1.0]);
        }
    }
    for tri in mesh.tri_faces() {
        for v in tri.iter() {
            indices.push(v.pos as u32);
        }
    }

    if indices.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "solid produced no triangles".to_string(),
        });
    }

    let face_ranges = vec![FaceRange {
        face_id: KernelId(0),
        start_index: 0,
        end_index: indices.len() as u32,
    }];

    Ok(RenderMesh {
        vertices,
        normals: norms,
        indices,
        face_ranges,
    })
}

/// Axis-aligned bounds of the tessellated solid.
pub fn mesh_bounding_box(solid: &TruckSolid, tolerance: f64) -> BoundingBox {
    let mesh = merged_polygon(solid, tolerance);
    let mut bbox = BoundingBox::empty();
    for p in mesh.positions() {
        bbox.include([p[0], p[1], p[2]]);
    }
    bbox
}

/// Enclosed volume of the tessellated solid, by the divergence theorem over
/// its outward-facing triangles.
pub fn mesh_volume(solid: &TruckSolid, tolerance: f64) -> f64 {
    let mesh = merged_polygon(solid, tolerance);
    let positions = mesh.positions();
    let signed: f64 = mesh
        .tri_faces()
        .iter()
        .map(|tri| {
            let a = positions[tri[0].pos];
            let b = positions[tri[1].pos];
            let c = positions[tri[2].pos];
            let cross = [
                b[1] * c[2] - b[2] * c[1],
                b[2] * c[0] - b[0] * c[2],
                b[0] * c[1] - b[1] * c[0],
            ];
            (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
        })
        .sum();
    signed.abs()
}
