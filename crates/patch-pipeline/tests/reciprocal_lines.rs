//! End-to-end patch tests on two synthetic parallel lines.
//!
//! Both lines are surveyed north-bound (azimuth 0°) with 1 m beam and ping
//! spacing. After rotation every sounding sits exactly on a 1 m cell center.
//! Line one observes zero depth residual; line two observes the residual of a
//! pure 0.5 m x-translation, so the solve must return exactly that.

use std::collections::BTreeMap;

use patch_core::{PatchParameter, Pt2, Real, Sounding};
use patch_pipeline::test_utils::{InMemorySource, SurfaceSample, SyntheticGridEngine};
use patch_pipeline::{
    stages, ConfigError, Diagnostic, LinePair, PatchTest, PatchTestConfig, PatchTestError,
    RunStatus, WeightingMode,
};

const PIVOT_X: Real = 100.5;
const PIVOT_Y: Real = 7.5;
const X_OFFSET: Real = 0.5;

fn surface(p: Pt2) -> SurfaceSample {
    SurfaceSample {
        depth: 20.0 + 2.0 * (0.7 * p.x).sin() + 1.5 * (0.9 * p.y).cos(),
        x_slope: 0.05 + 0.03 * (0.7 * p.x + 0.4 * p.y).cos(),
        y_slope: -0.04 + 0.02 * (0.5 * p.x - 0.8 * p.y).sin(),
    }
}

/// Rotated position of a north-bound sounding about the shared pivot.
fn rotated(x: Real, y: Real) -> Pt2 {
    Pt2::new(PIVOT_X + (y - PIVOT_Y), PIVOT_Y - (x - PIVOT_X))
}

/// 10 beams by 10 pings starting at easting `x0`; depth from `z`.
fn line(x0: Real, z: impl Fn(Pt2) -> Real) -> Vec<Sounding> {
    let mut out = Vec::new();
    for ping in 0..10 {
        for beam in 0..10 {
            let x = x0 + beam as Real;
            let y = PIVOT_Y + ping as Real;
            out.push(Sounding::new(x, y, z(rotated(x, y)) as f32));
        }
    }
    out
}

fn lines() -> LinePair {
    LinePair::new("0001_north", "0002_north").unwrap()
}

/// Tracks 5 m apart: 50 shared cells.
fn overlapping_source() -> InMemorySource {
    InMemorySource::new()
        .with_line("0001_north", line(PIVOT_X, |_| 0.0))
        .with_line(
            "0002_north",
            line(PIVOT_X + 5.0, |p| X_OFFSET * surface(p).x_slope),
        )
}

fn engine() -> SyntheticGridEngine {
    SyntheticGridEngine::new(1.0, surface)
}

fn full_parameters(unc: Real) -> BTreeMap<String, Real> {
    let mut map = BTreeMap::new();
    for key in ["roll", "pitch", "heading"] {
        map.insert(key.to_string(), 0.0);
    }
    for key in ["roll_unc", "pitch_unc", "heading_unc", "x_unc", "y_unc", "h_scale_unc"] {
        map.insert(key.to_string(), unc);
    }
    map
}

#[test]
fn recovers_x_translation() {
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    let status = pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    assert_eq!(status, RunStatus::Solved);
    assert!(pt.diagnostics().is_empty(), "{:?}", pt.diagnostics());

    let result = pt.result().unwrap();
    for p in PatchParameter::ALL {
        let [one, two] = result.parameter(p);
        let expected_two = if p == PatchParameter::XTranslation {
            X_OFFSET
        } else {
            0.0
        };
        assert!(one.abs() < 1e-6, "{}: line one {}", p, one);
        assert!(
            (two - expected_two).abs() < 1e-4,
            "{}: line two {} vs {}",
            p,
            two,
            expected_two
        );
    }

    let run = pt.last_run().unwrap();
    let solved = run.solved.as_ref().unwrap();
    assert_eq!(solved.solution.rank, 6);
    assert!(solved.residual_ss[1] < 1e-10, "{:?}", solved.residual_ss);
    assert_eq!(run.system.as_ref().unwrap().rows(), 50);
}

#[test]
fn run_records_every_stage() {
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    let run = pt.last_run().unwrap();
    assert_eq!(run.status, RunStatus::Solved);

    let collected = run.collected.as_ref().unwrap();
    assert_eq!(collected.buffer.len(), 200);
    assert_eq!(collected.buffer.line_range("0001_north"), Some(0..100));
    assert_eq!(collected.buffer.line_range("0002_north"), Some(100..200));

    let rotated = run.rotated.as_ref().unwrap();
    assert_eq!(rotated.pivot.min_x, PIVOT_X);
    assert_eq!(rotated.pivot.min_y, PIVOT_Y);
    let first = rotated.buffer.line_points("0002_north").unwrap()[0];
    assert!((first.x - PIVOT_X).abs() < 1e-9 && (first.y - 2.5).abs() < 1e-9);

    let surface = run.surface.as_ref().unwrap();
    assert_eq!(surface.layers.extent.shape(), (10, 15));
}

#[test]
fn stages_chain_reproduces_run() {
    let source = overlapping_source();
    let engine = engine();
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    pt.run(&lines(), &source, &engine).unwrap();

    let collected = stages::collect_points(&lines(), &source).unwrap().unwrap();
    let rotated = stages::rotate(&collected, 0.0).unwrap();
    let surface = stages::grid_surface(&rotated, &engine).unwrap();
    let system = stages::design(&surface).unwrap();
    let solved = stages::solve(&system, None, &Default::default()).unwrap();

    assert_eq!(Some(&solved.solution.result), pt.result());
}

#[test]
fn all_rejected_soundings_is_no_data() {
    let mut source = overlapping_source();
    source.reject_all("0001_north");
    source.reject_all("0002_north");

    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    let status = pt.run(&lines(), &source, &engine()).unwrap();
    assert_eq!(status, RunStatus::NoData);
    assert!(pt.result().is_none());
    assert_eq!(pt.diagnostics(), &[Diagnostic::NoData { lines: lines() }]);
    assert!(pt.report().to_string().contains("no result"));
}

#[test]
fn separated_tracks_have_no_overlap() {
    let source = InMemorySource::new()
        .with_line("0001_north", line(PIVOT_X, |_| 0.0))
        .with_line("0002_north", line(PIVOT_X + 100.0, |_| 0.0));
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    let status = pt.run(&lines(), &source, &engine()).unwrap();
    assert_eq!(status, RunStatus::NoOverlap);
    assert!(pt.result().is_none());
    assert_eq!(pt.diagnostics(), &[Diagnostic::NoOverlap { lines: lines() }]);
    assert!(pt.last_run().unwrap().system.is_none());
}

#[test]
fn one_empty_line_has_no_overlap() {
    let mut source = overlapping_source();
    source.reject_all("0002_north");
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    let status = pt.run(&lines(), &source, &engine()).unwrap();
    assert_eq!(status, RunStatus::NoOverlap);
}

#[test]
fn incomplete_parameters_fail_construction() {
    let mut map = full_parameters(0.01);
    map.remove("heading_unc");
    let config = PatchTestConfig::new(0.0).with_initial_parameters(map);
    match PatchTest::new(config) {
        Err(PatchTestError::Config(ConfigError::MissingParameters { missing })) => {
            assert_eq!(missing, vec!["heading_unc".to_string()]);
        }
        other => panic!("unexpected outcome {:?}", other.map(|_| ())),
    }
}

#[test]
fn report_before_run_has_no_result() {
    let pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    let report = pt.report();
    assert!(!report.has_result());
    assert!(report.lines.is_none());
    assert_eq!(report.to_string(), "Patch test results\nno result\n");
}

#[test]
fn rerun_clears_previous_result() {
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    assert!(pt.result().is_some());

    let mut empty = overlapping_source();
    empty.reject_all("0001_north");
    empty.reject_all("0002_north");
    assert_eq!(pt.run(&lines(), &empty, &engine()).unwrap(), RunStatus::NoData);
    assert!(pt.result().is_none());
    assert_eq!(pt.diagnostics().len(), 1);
}

#[test]
fn report_names_lines_and_rows() {
    let mut pt = PatchTest::new(PatchTestConfig::new(0.0)).unwrap();
    pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    let report = pt.report();
    let text = report.to_string();
    assert!(text.starts_with("Patch test results\nLines: [0001_north, 0002_north]\nroll: ["));
    assert!(text.contains("\nhorizontal scale factor: ["));
    assert_eq!(report.parameters.as_ref().unwrap().len(), 6);
    assert_eq!(report.rank, Some(6));
}

#[test]
fn tight_prior_holds_parameters_at_initial_values() {
    let mut map = full_parameters(1000.0);
    map.insert("x_unc".to_string(), 1e-6);
    let config = PatchTestConfig::new(0.0)
        .with_initial_parameters(map)
        .with_weighting(WeightingMode::APriori);
    let mut pt = PatchTest::new(config).unwrap();
    pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    let [_, x] = pt.result().unwrap().parameter(PatchParameter::XTranslation);
    assert!(x.abs() < 1e-3, "x translation {}", x);
}

#[test]
fn loose_prior_matches_unweighted_solve() {
    let config = PatchTestConfig::new(0.0)
        .with_initial_parameters(full_parameters(1e5))
        .with_weighting(WeightingMode::APriori);
    let mut pt = PatchTest::new(config).unwrap();
    pt.run(&lines(), &overlapping_source(), &engine()).unwrap();
    let [_, x] = pt.result().unwrap().parameter(PatchParameter::XTranslation);
    assert!((x - X_OFFSET).abs() < 1e-4, "x translation {}", x);
}
