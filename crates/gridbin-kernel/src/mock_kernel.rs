//! MockKernel: deterministic analytic test double implementing Kernel.
//!
//! Profiles are sampled polygons and solids are reduced to their bounding box
//! and an analytic volume, which is enough to check placement, heights and
//! volume bookkeeping without a BREP library. Every operation can be made to
//! fail on demand, and call counts are recorded so callers can verify cache
//! reuse.

use crate::traits::Kernel;
use crate::types::*;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Samples per quarter-circle corner of a rounded rectangle.
const ARC_SAMPLES: usize = 8;
/// Samples per cubic Bezier segment.
const BEZIER_SAMPLES: usize = 16;

/// Kernel operations that can be counted and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Profile,
    Extrude,
    Loft,
    Translate,
    Union,
    Subtract,
    Tessellate,
    Export,
}

#[derive(Debug, Clone)]
struct MockProfile {
    points: Vec<[f64; 2]>,
}

impl MockProfile {
    fn area(&self) -> f64 {
        let n = self.points.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a[0] * b[1] - b[0] * a[1]
            })
            .sum();
        twice.abs() / 2.0
    }

    fn bounds_at(&self, z0: f64, z1: f64) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for p in &self.points {
            bbox.include([p[0], p[1], z0]);
            bbox.include([p[0], p[1], z1]);
        }
        bbox
    }
}

#[derive(Debug, Clone, Copy)]
struct MockSolid {
    bbox: BoundingBox,
    volume: f64,
}

/// Deterministic test double for the geometry kernel.
#[derive(Default)]
pub struct MockKernel {
    next_handle: u64,
    solids: HashMap<u64, MockSolid>,
    profiles: HashMap<u64, MockProfile>,
    failing: HashSet<MockOp>,
    calls: RefCell<HashMap<MockOp, usize>>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Default::default()
        }
    }

    /// Make every following call of `op` fail until [`Self::clear_failures`].
    pub fn fail_on(&mut self, op: MockOp) {
        self.failing.insert(op);
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// Number of times `op` has been invoked, including failed calls.
    pub fn calls(&self, op: MockOp) -> usize {
        self.calls.borrow().get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: MockOp) -> Result<(), KernelError> {
        *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
        if !self.failing.contains(&op) {
            return Ok(());
        }
        let reason = format!("injected {op:?} failure");
        Err(match op {
            MockOp::Profile => KernelError::ProfileFailed { reason },
            MockOp::Extrude => KernelError::ExtrudeFailed { reason },
            MockOp::Loft => KernelError::LoftFailed { reason },
            MockOp::Translate => KernelError::Other { message: reason },
            MockOp::Union | MockOp::Subtract => KernelError::BooleanFailed { reason },
            MockOp::Tessellate => KernelError::TessellationFailed { reason },
            MockOp::Export => KernelError::ExportFailed { reason },
        })
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_handle.max(1);
        self.next_handle = id + 1;
        id
    }

    fn store_solid(&mut self, solid: MockSolid) -> KernelSolidHandle {
        let handle = KernelSolidHandle(self.alloc_id());
        self.solids.insert(handle.id(), solid);
        handle
    }

    fn solid(&self, handle: &KernelSolidHandle) -> Result<MockSolid, KernelError> {
        self.solids
            .get(&handle.id())
            .copied()
            .ok_or(KernelError::SolidNotFound { id: handle.id() })
    }

    fn store_profile(&mut self, profile: MockProfile) -> ProfileHandle {
        let handle = ProfileHandle(self.alloc_id());
        self.profiles.insert(handle.id(), profile);
        handle
    }

    fn take_profile(&mut self, profile: ProfileHandle) -> Result<MockProfile, KernelError> {
        self.profiles
            .remove(&profile.id())
            .ok_or(KernelError::ProfileNotFound { id: profile.id() })
    }
}

fn sample_rounded_rect(width: f64, height: f64, radius: f64) -> Vec<[f64; 2]> {
    let hw = width / 2.0;
    let hh = height / 2.0;
    let r = radius.max(0.0).min(hw.min(hh));
    if r <= 1e-9 {
        return vec![[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]];
    }
    let corners = [
        (hw - r, -hh + r, -std::f64::consts::FRAC_PI_2),
        (hw - r, hh - r, 0.0),
        (-hw + r, hh - r, std::f64::consts::FRAC_PI_2),
        (-hw + r, -hh + r, std::f64::consts::PI),
    ];
    let mut points = Vec::with_capacity(4 * (ARC_SAMPLES + 1));
    for (cx, cy, a0) in corners {
        for k in 0..=ARC_SAMPLES {
            let a = a0 + std::f64::consts::FRAC_PI_2 * k as f64 / ARC_SAMPLES as f64;
            points.push([cx + r * a.cos(), cy + r * a.sin()]);
        }
    }
    points
}

fn sample_bezier(segments: &[CubicSegment]) -> Vec<[f64; 2]> {
    let n = segments.len();
    let mut points = Vec::with_capacity(n * BEZIER_SAMPLES);
    for i in 0..n {
        let p0 = segments[i].start;
        let p1 = segments[i].control1;
        let p2 = segments[i].control2;
        let p3 = segments[(i + 1) % n].start;
        for k in 0..BEZIER_SAMPLES {
            let t = k as f64 / BEZIER_SAMPLES as f64;
            let u = 1.0 - t;
            let w = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
            points.push([
                w[0] * p0[0] + w[1] * p1[0] + w[2] * p2[0] + w[3] * p3[0],
                w[0] * p0[1] + w[1] * p1[1] + w[2] * p2[1] + w[3] * p3[1],
            ]);
        }
    }
    points
}

/// The 8 corners of a box, indexed by bit pattern (x, y, z).
fn box_corners(bbox: &BoundingBox) -> [[f64; 3]; 8] {
    let mut corners = [[0.0; 3]; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        for axis in 0..3 {
            corner[axis] = if i & (1 << axis) != 0 {
                bbox.max[axis]
            } else {
                bbox.min[axis]
            };
        }
    }
    corners
}

impl Kernel for MockKernel {
    fn rounded_rect_profile(
        &mut self,
        width: f64,
        height: f64,
        radius: f64,
    ) -> Result<ProfileHandle, KernelError> {
        self.enter(MockOp::Profile)?;
        if !(width > 0.0 && height > 0.0) {
            return Err(KernelError::ProfileFailed {
                reason: format!("rectangle size must be positive, got {width} x {height}"),
            });
        }
        let points = sample_rounded_rect(width, height, radius);
        Ok(self.store_profile(MockProfile { points }))
    }

    fn circle_profile(&mut self, radius: f64) -> Result<ProfileHandle, KernelError> {
        if !(radius > 0.0) {
            self.enter(MockOp::Profile)?;
            return Err(KernelError::ProfileFailed {
                reason: format!("circle radius must be positive, got {radius}"),
            });
        }
        self.rounded_rect_profile(2.0 * radius, 2.0 * radius, radius)
    }

    fn bezier_profile(&mut self, segments: &[CubicSegment]) -> Result<ProfileHandle, KernelError> {
        self.enter(MockOp::Profile)?;
        if segments.len() < 2 {
            return Err(KernelError::ProfileFailed {
                reason: format!(
                    "closed bezier curve needs at least 2 segments, got {}",
                    segments.len()
                ),
            });
        }
        let points = sample_bezier(segments);
        Ok(self.store_profile(MockProfile { points }))
    }

    fn place_profile(
        &mut self,
        profile: ProfileHandle,
        rotation_degrees: f64,
        offset: [f64; 2],
    ) -> Result<ProfileHandle, KernelError> {
        let mut placed = self.take_profile(profile)?;
        let (sin, cos) = rotation_degrees.to_radians().sin_cos();
        for p in &mut placed.points {
            *p = [
                p[0] * cos - p[1] * sin + offset[0],
                p[0] * sin + p[1] * cos + offset[1],
            ];
        }
        Ok(self.store_profile(placed))
    }

    fn extrude_profile(
        &mut self,
        profile: ProfileHandle,
        z: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.enter(MockOp::Extrude)?;
        let profile = self.take_profile(profile)?;
        if !(height > 0.0) || !height.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("extrusion height must be positive, got {height}"),
            });
        }
        Ok(self.store_solid(MockSolid {
            bbox: profile.bounds_at(z, z + height),
            volume: profile.area() * height,
        }))
    }

    fn loft_profiles(
        &mut self,
        sections: Vec<(ProfileHandle, f64)>,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.enter(MockOp::Loft)?;
        if sections.len() < 2 {
            return Err(KernelError::LoftFailed {
                reason: format!("loft needs at least 2 sections, got {}", sections.len()),
            });
        }
        let mut placed = Vec::with_capacity(sections.len());
        for (profile, z) in sections {
            placed.push((z, self.take_profile(profile)?));
        }
        placed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut bbox = BoundingBox::empty();
        let mut volume = 0.0;
        for pair in placed.windows(2) {
            let (z0, lower) = &pair[0];
            let (z1, upper) = &pair[1];
            let h = z1 - z0;
            if h < 1e-9 {
                return Err(KernelError::LoftFailed {
                    reason: "two loft sections share the same height".to_string(),
                });
            }
            let (a0, a1) = (lower.area(), upper.area());
            volume += h / 3.0 * (a0 + a1 + (a0 * a1).sqrt());
            bbox = bbox
                .union(&lower.bounds_at(*z0, *z0))
                .union(&upper.bounds_at(*z1, *z1));
        }
        Ok(self.store_solid(MockSolid { bbox, volume }))
    }

    fn translate_solid(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.enter(MockOp::Translate)?;
        let mut moved = self.solid(solid)?;
        for i in 0..3 {
            moved.bbox.min[i] += offset[i];
            moved.bbox.max[i] += offset[i];
        }
        Ok(self.store_solid(moved))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.enter(MockOp::Union)?;
        let sa = self.solid(a)?;
        let sb = self.solid(b)?;
        Ok(self.store_solid(MockSolid {
            bbox: sa.bbox.union(&sb.bbox),
            volume: sa.volume + sb.volume,
        }))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.enter(MockOp::Subtract)?;
        let sa = self.solid(a)?;
        let sb = self.solid(b)?;
        let tool_box = sb.bbox.volume();
        let fraction = if tool_box > 0.0 {
            sa.bbox.overlap_volume(&sb.bbox) / tool_box
        } else {
            0.0
        };
        Ok(self.store_solid(MockSolid {
            bbox: sa.bbox,
            volume: (sa.volume - sb.volume * fraction).max(0.0),
        }))
    }

    fn tessellate(
        &self,
        solid: &KernelSolidHandle,
        _options: &MeshOptions,
    ) -> Result<RenderMesh, KernelError> {
        self.enter(MockOp::Tessellate)?;
        let s = self.solid(solid)?;
        let c = box_corners(&s.bbox);
        // Each face: outward normal and its corners in CCW order seen from outside.
        let faces: [([f32; 3], [usize; 4]); 6] = [
            ([-1.0, 0.0, 0.0], [0, 4, 6, 2]),
            ([1.0, 0.0, 0.0], [1, 3, 7, 5]),
            ([0.0, -1.0, 0.0], [0, 1, 5, 4]),
            ([0.0, 1.0, 0.0], [2, 6, 7, 3]),
            ([0.0, 0.0, -1.0], [0, 2, 3, 1]),
            ([0.0, 0.0, 1.0], [4, 5, 7, 6]),
        ];

        let mut mesh = RenderMesh {
            vertices: Vec::with_capacity(72),
            normals: Vec::with_capacity(72),
            indices: Vec::with_capacity(36),
            face_ranges: Vec::with_capacity(6),
        };
        for (face_index, (normal, quad)) in faces.iter().enumerate() {
            let base = (mesh.vertices.len() / 3) as u32;
            for &corner in quad {
                let p = c[corner];
                mesh.vertices.extend([p[0] as f32, p[1] as f32, p[2] as f32]);
                mesh.normals.extend(normal);
            }
            let start_index = mesh.indices.len() as u32;
            mesh.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
            mesh.face_ranges.push(FaceRange {
                face_id: KernelId(face_index as u64),
                start_index,
                end_index: mesh.indices.len() as u32,
            });
        }
        Ok(mesh)
    }

    fn extract_edges(
        &self,
        solid: &KernelSolidHandle,
        _tolerance: f64,
    ) -> Result<EdgeRenderData, KernelError> {
        self.enter(MockOp::Tessellate)?;
        let s = self.solid(solid)?;
        let corners = box_corners(&s.bbox);

        let mut data = EdgeRenderData {
            vertices: Vec::with_capacity(24),
            lines: Vec::with_capacity(24),
            edge_ranges: Vec::with_capacity(12),
        };
        for p in &corners {
            data.vertices.extend([p[0] as f32, p[1] as f32, p[2] as f32]);
        }
        // Box edges join corners that differ in exactly one bit.
        let mut edge_index = 0u64;
        for i in 0..8u32 {
            for axis in 0..3 {
                let j = i | (1 << axis);
                if j == i {
                    continue;
                }
                let start_index = data.lines.len() as u32;
                data.lines.extend([i, j]);
                data.edge_ranges.push(EdgeRange {
                    edge_id: KernelId(edge_index),
                    start_index,
                    end_index: start_index + 2,
                });
                edge_index += 1;
            }
        }
        Ok(data)
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        Ok(self.solid(solid)?.bbox)
    }

    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError> {
        Ok(self.solid(solid)?.volume)
    }

    fn export_step(&self, solid: &KernelSolidHandle) -> Result<Vec<u8>, KernelError> {
        self.enter(MockOp::Export)?;
        let s = self.solid(solid)?;
        let text = format!(
            "ISO-10303-21;\nHEADER;\nFILE_NAME('mock','',(''),(''),'','gridbin','');\nENDSEC;\nDATA;\n/* bbox {:?} {:?} volume {:.6} */\nENDSEC;\nEND-ISO-10303-21;\n",
            s.bbox.min, s.bbox.max, s.volume
        );
        Ok(text.into_bytes())
    }

    fn release(&mut self, solid: &KernelSolidHandle) {
        self.solids.remove(&solid.id());
    }

    fn live_solids(&self) -> usize {
        self.solids.len()
    }
}
