use crate::types::*;

/// Core geometry kernel trait: the narrow capability set the bin pipeline
/// needs. Implemented by TruckKernel (wraps real truck) and MockKernel
/// (deterministic analytic test double).
///
/// Profiles are created centered on the origin in the XY plane; solids live
/// in the kernel until released. The kernel is not reentrant: callers must
/// serialize access.
pub trait Kernel {
    /// Closed rectangle of the given size centered on the origin, with
    /// quarter-circle corners of `radius`. A radius of half of both sides
    /// yields a circle.
    fn rounded_rect_profile(
        &mut self,
        width: f64,
        height: f64,
        radius: f64,
    ) -> Result<ProfileHandle, KernelError>;

    /// Circle of `radius` centered on the origin.
    fn circle_profile(&mut self, radius: f64) -> Result<ProfileHandle, KernelError>;

    /// Closed curve made of cubic Bezier segments. Winding is normalized so
    /// faces built from the profile point towards +Z.
    fn bezier_profile(&mut self, segments: &[CubicSegment]) -> Result<ProfileHandle, KernelError>;

    /// Rotate a profile counter-clockwise about the origin by
    /// `rotation_degrees`, then translate it by `offset`.
    fn place_profile(
        &mut self,
        profile: ProfileHandle,
        rotation_degrees: f64,
        offset: [f64; 2],
    ) -> Result<ProfileHandle, KernelError>;

    /// Extrude a profile placed at height `z` upward by `height`.
    fn extrude_profile(
        &mut self,
        profile: ProfileHandle,
        z: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Ruled loft through profiles placed at the given heights.
    fn loft_profiles(
        &mut self,
        sections: Vec<(ProfileHandle, f64)>,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Translated copy of a solid. The source is left untouched.
    fn translate_solid(
        &mut self,
        solid: &KernelSolidHandle,
        offset: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean union of two solids.
    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Tessellate a solid to a triangle mesh.
    fn tessellate(
        &self,
        solid: &KernelSolidHandle,
        options: &MeshOptions,
    ) -> Result<RenderMesh, KernelError>;

    /// Sample the boundary edges of a solid into polylines.
    fn extract_edges(
        &self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<EdgeRenderData, KernelError>;

    /// Axis-aligned bounds of a solid.
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError>;

    /// Enclosed volume of a solid, in mm³.
    fn volume(&self, solid: &KernelSolidHandle) -> Result<f64, KernelError>;

    /// Serialize a solid as a STEP (ISO 10303-21) file.
    fn export_step(&self, solid: &KernelSolidHandle) -> Result<Vec<u8>, KernelError>;

    /// Drop a solid. Releasing an unknown handle is a no-op.
    fn release(&mut self, solid: &KernelSolidHandle);

    /// Number of solids currently held.
    fn live_solids(&self) -> usize;
}
