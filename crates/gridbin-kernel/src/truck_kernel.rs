//! TruckKernel: real geometry kernel wrapping truck's API.

use crate::primitives;
use crate::tessellation;
use crate::traits::Kernel;
use crate::types::*;
use std::collections::HashMap;

use tracing::debug;
use truck_modeling::builder;
use truck_modeling::topology::{Face, Shell, Solid, Wire};
use truck_modeling::{Point3, Rad, Vector3};
use truck_stepio::out::{CompleteStepDisplay, StepHeaderDescriptor, StepModel};

/// Tolerance passed to truck's boolean operations.
pub const BOOLEAN_TOLERANCE: f64 = 0.05;

/// Chord tolerance used when measuring bounds and volume.
const MEASURE_TOLERANCE: f64 = 0.05;

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    solids: HashMap<u64, Solid>,
    /// Closed planar wires awaiting placement, extrusion or lofting.
    profiles: HashMap<u64, Wire>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            solids: HashMap::new(),
            profiles: HashMap::new(),
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    pub(crate) fn store_solid(&mut self, solid: Solid) -> KernelSolidHandle {
        let handle = KernelSolidHandle(self.alloc_id());
        self.solids.insert(handle.id(), solid);
        handle
    }

    pub(crate) fn get_solid(&self, handle: &KernelSolidHandle) -> Result<&Solid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::SolidNotFound { id: handle.id() })
    }

    fn store_profile(&mut self, wire: Wire) -> ProfileHandle {
        let handle = ProfileHandle(self.alloc_id());
        self.profiles.insert(handle.id(), wire);
        handle
    }

    fn take_profile(&mut self, profile: ProfileHandle) -> Result<Wire, KernelError> {
        self.profiles
            .remove(&profile.id())
            .ok_or(KernelError::ProfileNotFound { id: profile.id() })
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Close a stack of wires (highest first) into a solid, trying both
/// orientations of the ruled side faces.
fn close_loft(wires: &[Wire]) -> Result<Solid, KernelError> {
    let top = builder::try_attach_plane(&[wires[0].clone()]).map_err(|e| {
        KernelError::LoftFailed {
            reason: format!("top cap: {e}"),
        }
    })?;
    let bottom_wire = wires[wires.len() - 1].clone();
    let bottom = builder::try_attach_plane(&[bottom_wire])
        .map_err(|e| KernelError::LoftFailed {
            reason: format!("bottom cap: {e}"),
        })?
        .inverse();

    let mut sides: Vec<Face> = Vec::new();
    for pair in wires.windows(2) {
        let band: Shell = builder::try_wire_homotopy(&pair[0], &pair[1]).map_err(|e| {
            KernelError::LoftFailed {
                reason: format!("side band: {e}"),
            }
        })?;
        sides.extend(band.face_iter().cloned());
    }

    for invert_sides in [true, false] {
        let mut shell = Shell::new();
        shell.push(top.clone());
        for face in &sides {
            shell.push(if invert_sides {
                face.inverse()
            } else {
                face.clone()
            });
        }
        shell.push(bottom.clone());
        if let Ok(solid) = Solid::try_new(vec![shell]) {
            return Ok(solid);
        }
    }
    Err(KernelError::LoftFailed {
        reason: "loft shell is not a closed oriented manifold".to_string(),
    })
}

impl Kernel for TruckKernel {
    fn rounded_rect_profile(
        &mut self,
        width: f64,
        height: f64,
        radius: f64,
    ) -> Result<ProfileHandle, KernelError> {
        let wire = primitives::rounded_rect_wire(width, height, radius)?;
        Ok(self.store_profile(wire))
    }

    fn circle_profile(&mut self, radius: f64) -> Result<ProfileHandle, KernelError> {
        if !(radius > 0.0) {
            return Err(KernelError::ProfileFailed {
                reason: format!("circle radius must be positive, got {radius}"),
            });
        }
        let wire = primitives::rounded_rect_wire(2.0 * radius, 2.0 * radius, radius)?;
        Ok(self.store_profile(wire))
    }

    fn bezier_profile(&mut self, segments: &[CubicSegment]) -> Result<ProfileHandle, KernelError> {
        let wire = primitives::bezier_wire(segments)?;
        Ok(self.store_profile(wire))
    }

    fn place_profile(
        &mut self,
        profile: ProfileHandle,
        rotation_degrees: f64,
        offset: [f64; 2],
    ) -> Result<ProfileHandle, KernelError> {
        let wire = self.take_profile(profile)?;
        let rotated = builder::rotated(
            &wire,
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Rad(rotation_degrees.to_radians()),
        );
        let placed = builder::translated(&rotated, Vector3::new(offset[0], offset[1], 0.0));
        Ok(self.store_profile(placed))
    }

    fn extrude_profile(
        &mut self,
        profile: ProfileHandle,
        z: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let wire = self.take_profile(profile)?;
        if !(height > 0.0) || !height.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("extrusion height must be positive, got {height}"),
            });
        }
        let wire = builder::translated(&wire, Vector3::new(0.0, 0.0, z));
        let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::ExtrudeFailed {
            reason: format!("failed to create planar face: {e}"),
        })?;
        let solid = builder::tsweep(&face, Vector3::new(0.0, 0.0, height));
        Ok(self.store_solid(solid))
    }

    fn loft_profiles(
        &mut self,
        sections: Vec<(ProfileHandle, f64)>,
    ) -> Result<KernelSolidHandle, KernelError> {
        if sections.len() < 2 {
            return Err(KernelError::LoftFailed {
                reason: format!("loft needs at least 2 sections, got {}", sections.len()),
            });
        }
        let mut placed: Vec<(f64, Wire)> = Vec::with_capacity(sections.len());
        for (profile, z) in sections {
            let wire = self.take_profile(profile)?;
            placed.push((z, builder::translated(&wire, Vector3::new(0.0, 0.0, z))));
        }
        placed.sort_by(|a, b| b.0.total_cmp(&a.0));

        if placed.windows(2).any(|w| (w[0].0 - w[1].0).abs() < 1e-9) {
            return Err(KernelError::LoftFailed {
                reason: "two loft sections share the same height".to_string(),
            });
        }
        let edge_count = placed[0].1.len();
        if placed.iter().any(|(_, w)| w.len() != edge_count) {
            return Err(KernelError::LoftFailed {
                reason: "loft sections have different edge counts".to_string(),
            });
        }

        let wires: Vec<Wire> = placed.into_iter().map(|(_, w)| w).collect();
        let solid = close_loft(&wires)?;
        debug!(sections = wires.len(), edges = edge_count, "lofted solid");
        Ok(self.store_solid(solid))
    }

    fn translate_solid(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        let source = self.get_solid(solid)?;
        let moved = builder::translated(source, Vector3::new(offset[0], offset[1], offset[2]));
        Ok(self.store_solid(moved))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.get_solid(a)?;
        let solid_b = self.get_solid(b)?;

        let result = truck_shapeops::or(solid_a, solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck or() returned None".to_string(),
            }
        })?;
        Ok(self.store_solid(result))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.get_solid(a)?;
        let mut solid_b = self.get_solid(b)?.clone();

        // Subtraction = A ∩ ¬B. not() mutates in place.
        solid_b.not();
        let result = truck_shapeops::and(solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None for subtraction".to_string(),
            }
        })?;
        Ok(self.store_solid(result))
    }

    fn tessellate(
        &self,
        solid: &KernelSolidHandle,
        options: &MeshOptions,
    ) -> Result<RenderMesh, KernelError> {
        let truck_solid = self.get_solid(solid)?;
        tessellation::tessellate_solid(truck_solid, options.tolerance)
    }

    fn extract_edges(
        &self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<EdgeRenderData, KernelError> {
        if !(tolerance > 0.0) {
            return Err(KernelError::TessellationFailed {
                reason: format!("edge tolerance must be positive, got {tolerance}"),
            });
        }
        let truck_solid = self.get_solid(solid)?;
        Ok(tessellation::extract_edges(truck_solid, tolerance))
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        let truck_solid = self.get_solid(solid)?;
        Ok(tessellation::mesh_bounding_box(truck_solid, MEASURE_TOLERANCE))
    }

    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError> {
        let truck_solid = self.get_solid(solid)?;
        Ok(tessellation::mesh_volume(truck_solid, MEASURE_TOLERANCE))
    }

    fn export_step(&self, solid: &KernelSolidHandle) -> Result<Vec<u8>, KernelError> {
        let truck_solid = self.get_solid(solid)?;
        let compressed = truck_solid.compress();
        let step_string = CompleteStepDisplay::new(
            StepModel::from(&compressed),
            StepHeaderDescriptor {
                organization_system: "gridbin".to_owned(),
                ..Default::default()
            },
        )
        .to_string();
        if step_string.is_empty() {
            return Err(KernelError::ExportFailed {
                reason: "STEP writer produced no output".to_string(),
            });
        }
        Ok(step_string.into_bytes())
    }

    fn release(&mut self, solid: &KernelSolidHandle) {
        self.solids.remove(&solid.id());
    }

    fn live_solids(&self) -> usize {
        self.solids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_extrude_rounded_rect() {
        let mut kernel = TruckKernel::new();
        let profile = kernel.rounded_rect_profile(10.0, 6.0, 0.0).unwrap();
        let handle = kernel.extrude_profile(profile, 1.0, 2.0).unwrap();

        let solid = kernel.get_solid(&handle).unwrap();
        let faces: Vec<_> = solid.boundaries()[0].face_iter().collect();
        assert_eq!(faces.len(), 6, "Extruded rectangle should have 6 faces");

        let bbox = kernel.bounding_box(&handle).unwrap();
        assert_relative_eq!(bbox.min[2], 1.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max[2], 3.0, epsilon = 1e-9);
        assert_relative_eq!(kernel.volume(&handle).unwrap(), 120.0, epsilon = 1e-6);
    }

    #[test]
    fn test_profile_is_consumed() {
        let mut kernel = TruckKernel::new();
        let profile = kernel.circle_profile(5.0).unwrap();
        let id = profile.id();
        kernel.extrude_profile(profile, 0.0, 1.0).unwrap();
        assert!(matches!(
            kernel.extrude_profile(ProfileHandle(id), 0.0, 1.0),
            Err(KernelError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn test_placed_profile_moves_bounds() {
        let mut kernel = TruckKernel::new();
        let profile = kernel.rounded_rect_profile(4.0, 2.0, 0.0).unwrap();
        let placed = kernel.place_profile(profile, 90.0, [10.0, 0.0]).unwrap();
        let handle = kernel.extrude_profile(placed, 0.0, 1.0).unwrap();
        let bbox = kernel.bounding_box(&handle).unwrap();
        assert_relative_eq!(bbox.min[0], 9.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max[0], 11.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.min[1], -2.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_height_extrude_is_rejected() {
        let mut kernel = TruckKernel::new();
        let profile = kernel.rounded_rect_profile(4.0, 2.0, 0.5).unwrap();
        assert!(matches!(
            kernel.extrude_profile(profile, 0.0, 0.0),
            Err(KernelError::ExtrudeFailed { .. })
        ));
    }

    #[test]
    fn test_loft_square_frustum() {
        let mut kernel = TruckKernel::new();
        let top = kernel.rounded_rect_profile(4.0, 4.0, 0.0).unwrap();
        let bottom = kernel.rounded_rect_profile(2.0, 2.0, 0.0).unwrap();
        let handle = kernel.loft_profiles(vec![(bottom, 0.0), (top, 3.0)]).unwrap();

        let bbox = kernel.bounding_box(&handle).unwrap();
        assert_relative_eq!(bbox.size()[0], 4.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.size()[2], 3.0, epsilon = 1e-6);
        // Frustum: h/3 * (A1 + A2 + sqrt(A1 * A2)) = 1 * (16 + 4 + 8)
        assert_relative_eq!(kernel.volume(&handle).unwrap(), 28.0, epsilon = 1e-3);
    }

    #[test]
    fn test_loft_rejects_mismatched_sections() {
        let mut kernel = TruckKernel::new();
        let a = kernel.rounded_rect_profile(4.0, 4.0, 0.0).unwrap();
        let b = kernel.rounded_rect_profile(4.0, 4.0, 1.0).unwrap();
        assert!(matches!(
            kernel.loft_profiles(vec![(a, 0.0), (b, 1.0)]),
            Err(KernelError::LoftFailed { .. })
        ));
    }

    #[test]
    fn test_store_and_tessellate_box() {
        let mut kernel = TruckKernel::new();
        let handle = kernel.store_solid(primitives::make_box(1.0, 1.0, 1.0));

        let mesh = kernel.tessellate(&handle, &MeshOptions::default()).unwrap();

        assert!(!mesh.vertices.is_empty(), "Mesh should have vertices");
        assert_eq!(mesh.normals.len(), mesh.vertices.len());
        assert_eq!(mesh.face_ranges.len(), 6, "Box should have 6 face ranges");

        let total_indices = mesh.indices.len() as u32;
        let covered: u32 = mesh
            .face_ranges
            .iter()
            .map(|r| r.end_index - r.start_index)
            .sum();
        assert_eq!(covered, total_indices, "Face ranges should cover all indices");

        let again = kernel.tessellate(&handle, &MeshOptions::default()).unwrap();
        assert_eq!(mesh.face_ranges, again.face_ranges);
    }

    #[test]
    fn test_box_edges() {
        let mut kernel = TruckKernel::new();
        let handle = kernel.store_solid(primitives::make_box(1.0, 2.0, 3.0));
        let edges = kernel.extract_edges(&handle, 0.1).unwrap();
        assert_eq!(edges.edge_ranges.len(), 12);
        assert_eq!(edges.lines.len() % 2, 0);
    }

    #[test]
    fn test_release_and_translate() {
        let mut kernel = TruckKernel::new();
        let handle = kernel.store_solid(primitives::make_box(1.0, 1.0, 1.0));
        let moved = kernel.translate_solid(&handle, [5.0, 0.0, 0.0]).unwrap();
        assert_eq!(kernel.live_solids(), 2);
        assert_relative_eq!(kernel.bounding_box(&moved).unwrap().min[0], 5.0, epsilon = 1e-9);

        kernel.release(&handle);
        kernel.release(&handle);
        assert_eq!(kernel.live_solids(), 1);
        assert!(matches!(
            kernel.volume(&handle),
            Err(KernelError::SolidNotFound { .. })
        ));
    }

    #[test]
    fn test_export_step_header() {
        let mut kernel = TruckKernel::new();
        let handle = kernel.store_solid(primitives::make_box(1.0, 1.0, 1.0));
        let bytes = kernel.export_step(&handle).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("ISO-10303-21;"));
        assert!(text.contains("gridbin"));
    }

    #[test]
    fn test_subtract_overlapping_boxes() {
        let mut kernel = TruckKernel::new();
        let a = kernel.store_solid(primitives::make_box(4.0, 4.0, 4.0));
        let b = kernel.store_solid(builder::translated(
            &primitives::make_box(2.0, 2.0, 6.0),
            Vector3::new(1.0, 1.0, -1.0),
        ));
        let result = kernel.boolean_subtract(&a, &b).unwrap();
        assert_relative_eq!(kernel.volume(&result).unwrap(), 64.0 - 16.0, epsilon = 1e-3);
    }

    #[test]
    #[ignore = "truck 0.4: coplanar boolean faces fail"]
    fn test_union_of_touching_boxes() {
        let mut kernel = TruckKernel::new();
        let a = kernel.store_solid(primitives::make_box(1.0, 1.0, 1.0));
        let b = kernel.store_solid(builder::translated(
            &primitives::make_box(1.0, 1.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
        ));
        let result = kernel.boolean_union(&a, &b).unwrap();
        assert_relative_eq!(kernel.volume(&result).unwrap(), 2.0, epsilon = 1e-3);
    }
}
