//! End-to-end bin assembly against the analytic mock kernel.

use approx::assert_relative_eq;
use gridbin_engine::*;
use gridbin_kernel::{Kernel, KernelError, MockKernel, MockOp, TruckKernel};
use gridbin_ops::OpError;
use gridbin_types::*;

fn caliper() -> Outline {
    Outline::rounded_rect("caliper", Point2::new(40.0, 30.0), 80.0, 60.0, 15.0).with_depth(20.0)
}

fn two_pockets() -> Vec<Outline> {
    vec![
        Outline::rounded_rect("a", Point2::new(20.0, 20.0), 16.0, 10.0, 2.0).with_depth(6.0),
        Outline::spline(
            "b",
            Point2::new(60.0, 30.0),
            vec![
                Point2::new(-5.0, -5.0),
                Point2::new(5.0, -5.0),
                Point2::new(5.0, 5.0),
                Point2::new(-5.0, 5.0),
            ],
        )
        .with_depth(8.0)
        .with_rotation(15.0),
    ]
}

fn params() -> BinParameters {
    BinParameters::new(DEFAULT_TOTAL_HEIGHT, DEFAULT_BASE_HEIGHT)
}

#[test]
fn test_caliper_scenario() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let bin = assembler
        .build(&mut kernel, &[caliper()], params())
        .unwrap()
        .expect("non-empty input builds a bin");

    let bbox = kernel.bounding_box(&bin).unwrap();
    assert_relative_eq!(bbox.size()[0], 83.5, epsilon = 1e-9);
    assert_relative_eq!(bbox.size()[1], 83.5, epsilon = 1e-9);
    assert_relative_eq!(bbox.min[2], 0.0);
    assert_relative_eq!(bbox.max[2], 20.0, epsilon = 1e-9);

    let mesh = assembler.mesh(&kernel, &bin).unwrap();
    assert!(mesh.triangle_count() > 0);
    let (min, max) = mesh.bounds().unwrap();
    assert!((max[2] - min[2] - 20.0).abs() < 1e-4);
}

#[test]
fn test_height_tracks_total_height() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    for (total, base) in [(20.0, 4.75), (35.5, 4.75), (12.0, 6.0)] {
        let bin = assembler
            .build(&mut kernel, &two_pockets(), BinParameters::new(total, base))
            .unwrap()
            .unwrap();
        let bbox = kernel.bounding_box(&bin).unwrap();
        assert_relative_eq!(bbox.max[2] - bbox.min[2], total, epsilon = 1e-9);
    }
}

#[test]
fn test_repeated_builds_are_identical() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let first = assembler.build(&mut kernel, &two_pockets(), params()).unwrap().unwrap();
    let first_mesh = assembler.mesh(&kernel, &first).unwrap();
    let second = assembler.build(&mut kernel, &two_pockets(), params()).unwrap().unwrap();
    let second_mesh = assembler.mesh(&kernel, &second).unwrap();
    assert_eq!(first, second);
    assert_eq!(first_mesh, second_mesh);

    // A cold pipeline produces the same buffers too.
    let mut cold_kernel = MockKernel::new();
    let mut cold = BinAssembler::from_config(PipelineConfig::default());
    let third = cold.build(&mut cold_kernel, &two_pockets(), params()).unwrap().unwrap();
    assert_eq!(cold.mesh(&cold_kernel, &third).unwrap(), first_mesh);
}

#[test]
fn test_depth_change_reuses_other_stages() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let mut outlines = two_pockets();
    assembler.build(&mut kernel, &outlines, params()).unwrap();

    let lofts = kernel.calls(MockOp::Loft);
    let extrudes = kernel.calls(MockOp::Extrude);
    let translates = kernel.calls(MockOp::Translate);

    outlines[1].depth = 3.0;
    assembler.build(&mut kernel, &outlines, params()).unwrap();

    assert_eq!(kernel.calls(MockOp::Loft), lofts, "base unit reused");
    // Only the edited cutout and the wall blank are extruded again.
    assert_eq!(kernel.calls(MockOp::Extrude), extrudes + 2);
    // No tiles are placed again, only the wall.
    assert_eq!(kernel.calls(MockOp::Translate), translates + 1);
}

#[test]
fn test_moving_outlines_within_the_grid_keeps_base() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let mut outlines = vec![caliper()];
    assembler.build(&mut kernel, &outlines, params()).unwrap();
    let translates = kernel.calls(MockOp::Translate);

    outlines[0].position.x += 1.0;
    assembler.build(&mut kernel, &outlines, params()).unwrap();
    assert_eq!(kernel.calls(MockOp::Translate), translates + 1);
}

#[test]
fn test_no_solids_leak_beyond_cache() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig {
        cache_capacity: 3,
        ..PipelineConfig::default()
    });
    let mut outlines = two_pockets();
    for depth in [2.0, 4.0, 6.0, 8.0] {
        outlines[0].depth = depth;
        let bin = assembler.build(&mut kernel, &outlines, params()).unwrap().unwrap();
        assert!(kernel.volume(&bin).is_ok(), "returned bin is alive");
        assert_eq!(kernel.live_solids(), assembler.cache().len());
    }
    assert!(assembler.cache_stats().evictions > 0);

    assembler.clear_cache(&mut kernel);
    assert_eq!(kernel.live_solids(), 0);
}

#[test]
fn test_kernel_failure_propagates_without_leaks() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    kernel.fail_on(MockOp::Subtract);
    let err = assembler.build(&mut kernel, &two_pockets(), params()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Op(OpError::Kernel(KernelError::BooleanFailed { .. }))
    ));
    assert_eq!(kernel.live_solids(), assembler.cache().len());

    // Final fuse failure after the base is cached.
    kernel.clear_failures();
    assembler.build(&mut kernel, &two_pockets(), params()).unwrap();
    let mut edited = two_pockets();
    edited[0].depth = 1.0;
    kernel.fail_on(MockOp::Union);
    let err = assembler.build(&mut kernel, &edited, params()).unwrap_err();
    assert!(matches!(err, EngineError::Kernel(KernelError::BooleanFailed { .. })));
    assert_eq!(kernel.live_solids(), assembler.cache().len());
}

#[test]
fn test_degenerate_spline_is_reported() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let bad = Outline::spline(
        "bad",
        Point2::new(5.0, 5.0),
        vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
    );
    let err = assembler.build(&mut kernel, &[bad], params()).unwrap_err();
    assert!(matches!(err, EngineError::Op(OpError::DegenerateSpline { .. })));
}

#[test]
fn test_export_step_of_built_bin() {
    let mut kernel = MockKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let bin = assembler.build(&mut kernel, &[caliper()], params()).unwrap().unwrap();
    let bytes = assembler.export_step(&kernel, &bin).unwrap();
    assert!(bytes.starts_with(b"ISO-10303-21;"));
    // Export does not consume the cached solid.
    assert!(kernel.volume(&bin).is_ok());
}

#[test]
fn test_caliper_scenario_truck() {
    let mut kernel = TruckKernel::new();
    let mut assembler = BinAssembler::from_config(PipelineConfig::default());
    let bin = assembler
        .build(&mut kernel, &[caliper()], params())
        .unwrap()
        .unwrap();
    let bbox = kernel.bounding_box(&bin).unwrap();
    assert_relative_eq!(bbox.size()[0], 83.5, epsilon = 1e-3);
    assert_relative_eq!(bbox.size()[2], 20.0, epsilon = 1e-3);
    let step = assembler.export_step(&kernel, &bin).unwrap();
    assert!(step.starts_with(b"ISO-10303-21;"));
}
