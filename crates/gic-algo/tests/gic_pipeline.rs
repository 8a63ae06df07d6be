//! End-to-end checks of the GIC pipeline on small synthetic systems.

use gic_algo::test_utils::{parallel_lines_system, three_bus_system, two_bus_system};
use gic_algo::{GicConfig, GicTool};
use gic_core::{GicError, SolverKind};

fn assert_rel(actual: f64, expected: f64, tol: f64) {
    let scale = expected.abs().max(1e-300);
    assert!(
        ((actual - expected) / scale).abs() < tol,
        "expected {expected}, got {actual}"
    );
}

/// Series loop: sub1 ground, T1 HV coil, line, step-up, sub2 ground.
/// Branch resistances are 1/(3G); groundings are 1/ohms.
#[test]
fn two_bus_h_matches_series_loop() {
    let r_loop = 0.5 + 1.0 / (3.0 * 5.0) + 1.0 / (3.0 * 2.0) + 1.0 / (3.0 * 4.0) + 0.25;
    let ibase = 100.0 * 1e3 * (2.0_f64 / 3.0).sqrt() / 345.0;
    let expected = 1.0 / (ibase * 3.0 * r_loop);

    for solver in [SolverKind::Gauss, SolverKind::Faer] {
        let config = GicConfig {
            solver,
            ..GicConfig::default()
        };
        let tool = GicTool::new(&two_bus_system(), &config).unwrap();
        let h = tool.h_matrix(true).unwrap();
        assert_eq!((h.nrows(), h.ncols()), (1, 1));
        assert_rel(h.read(0, 0).abs(), expected, 1e-9);
    }
}

#[test]
fn reduced_h_is_trailing_block_of_full_h() {
    let tool = GicTool::new(&three_bus_system(), &GicConfig::default()).unwrap();
    let full = tool.h_matrix(false).unwrap();
    let reduced = tool.h_matrix(true).unwrap();
    let offset = full.ncols() - reduced.ncols();
    assert_eq!(offset, tool.topology().branches.line_range().start);
    for x in 0..reduced.nrows() {
        for l in 0..reduced.ncols() {
            assert_rel(reduced.read(x, l), full.read(x, offset + l), 1e-12);
        }
    }
}

#[test]
fn blocked_plain_transformer_sees_no_gic() {
    let mut tables = two_bus_system();
    tables.transformers[0].gic_blocked = true;
    let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
    assert_eq!(tool.topology().branches.n_windings(), 0);
    let h = tool.h_matrix(true).unwrap();
    assert_eq!(h.read(0, 0), 0.0);
}

#[test]
fn parallel_lines_collapse_to_one_corner() {
    let tool = GicTool::new(&parallel_lines_system(5), &GicConfig::default()).unwrap();
    let mut corners = tool.corner_factory().unwrap();
    assert_eq!(corners.groups().len(), 1);
    assert_eq!(corners.groups()[0].len(), 5);

    let topo = corners.topology(true, true).unwrap();
    assert_eq!(topo.len(), 1);
    let corner_net = topo.net_losses()[0];

    let greedy = corners.greedy_search(false).unwrap();
    let (_, best) = greedy.best().unwrap();
    assert_rel(best, corner_net, 1e-9);
    assert!(greedy.steps.iter().all(|&s| s == 0));
}

#[test]
fn greedy_never_loses_to_its_seed() {
    let tool = GicTool::new(&three_bus_system(), &GicConfig::default()).unwrap();
    let mut corners = tool.corner_factory().unwrap();
    let outcome = corners.greedy_search(true).unwrap();
    assert_eq!(outcome.losses.len(), outcome.seeds.len());
    assert_eq!(outcome.polarities.ncols(), outcome.seeds.len());

    let hle = corners.hle();
    for (s, seed) in outcome.seeds.iter().enumerate() {
        let seed_loss: f64 = (0..hle.nrows())
            .map(|x| {
                (0..hle.ncols())
                    .map(|l| hle.read(x, l) * if seed[l] < 0.0 { -1.0 } else { 1.0 })
                    .sum::<f64>()
                    .abs()
            })
            .sum();
        assert!(outcome.losses[s] >= seed_loss - 1e-12);
    }
}

#[test]
fn tessellation_preserves_line_components() {
    let tool = GicTool::new(&three_bus_system(), &GicConfig::default()).unwrap();
    let h = tool.h_matrix(true).unwrap();
    let tess = tool.tessellations(0.5).unwrap();
    let lines = tool.line_records();

    for x in 0..h.nrows() {
        let direct_x: f64 = lines
            .iter()
            .enumerate()
            .map(|(l, rec)| {
                let len = rec.length_km.unwrap().value();
                let bearing = rec.bearing_deg.unwrap().value().to_radians();
                h.read(x, l) * len * bearing.sin()
            })
            .sum();
        let tiled_x: f64 = (0..tess.hx.ncols()).map(|k| tess.hx.read(x, k)).sum();
        assert!((direct_x - tiled_x).abs() < 1e-9 * direct_x.abs().max(1.0));
    }
}

#[test]
fn invalid_tile_width_is_rejected() {
    let tool = GicTool::new(&three_bus_system(), &GicConfig::default()).unwrap();
    assert!(matches!(
        tool.tessellations(0.0),
        Err(GicError::InvalidTileWidth(_))
    ));
}

#[test]
fn tile_grid_respects_configured_limit() {
    let tables = three_bus_system();
    let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
    assert!(matches!(
        tool.tessellations(1e-10),
        Err(GicError::TileGridTooLarge { .. })
    ));

    // 0.5 degree tiles over the 1 x 1 degree extent need 9 tiles
    let config = GicConfig {
        max_tiles: 8,
        ..GicConfig::default()
    };
    let tool = GicTool::new(&tables, &config).unwrap();
    assert!(tool.tessellations(0.5).is_err());
}
