//! Geographic tessellation of line geometry.
//!
//! Lines are straight in (lon, lat) space. A uniform grid of square tiles of
//! width `W` degrees is laid from the south-west corner of all line endpoints.
//! Each line is cut at every tile edge it crosses; each piece is assigned to
//! the tile holding its midpoint and carries its share of the line's length,
//! resolved into east (x) and north (y) components by the line bearing:
//!
//! ```text
//! Lx[line, tile] += Δt · len_km · sin(bearing)
//! Ly[line, tile] += Δt · len_km · cos(bearing)
//! Hx = H · Lx,  Hy = H · Ly          (transformers × tiles)
//! ```
//!
//! Tiles are flattened row-major from the south: `tile = iy · nx + ix`.

use faer::{Mat, MatRef};
use gic_core::records::LineRecord;
use gic_core::{GicError, GicResult};
use serde::Serialize;
use tracing::{debug, warn};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Uniform tile grid over the line endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileGrid {
    /// South-west corner (lon, lat)
    pub origin: (f64, f64),
    pub width: f64,
    pub nx: usize,
    pub ny: usize,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
}

impl TileGrid {
    /// Smallest grid of `width`-degree tiles holding every finite point.
    /// Fails when it would need more than `max_tiles` tiles.
    pub fn covering<I>(points: I, width: f64, max_tiles: usize) -> GicResult<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        if !(width > 0.0 && width.is_finite()) {
            return Err(GicError::InvalidTileWidth(width));
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in points.into_iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if !min_x.is_finite() {
            (min_x, min_y, max_x, max_y) = (0.0, 0.0, 0.0, 0.0);
        }

        // Sized in f64 first so a tiny width cannot overflow the casts
        let nx_f = ((max_x - min_x) / width).floor() + 1.0;
        let ny_f = ((max_y - min_y) / width).floor() + 1.0;
        let tiles = nx_f * ny_f;
        let fits = tiles <= max_tiles as f64
            && (nx_f as usize)
                .checked_mul(ny_f as usize)
                .is_some_and(|n| n <= max_tiles);
        if !fits {
            return Err(GicError::TileGridTooLarge {
                width,
                tiles,
                max: max_tiles,
            });
        }
        let (nx, ny) = (nx_f as usize, ny_f as usize);
        Ok(Self {
            origin: (min_x, min_y),
            width,
            nx,
            ny,
            x_edges: (0..=nx).map(|k| min_x + k as f64 * width).collect(),
            y_edges: (0..=ny).map(|k| min_y + k as f64 * width).collect(),
        })
    }

    pub fn n_tiles(&self) -> usize {
        self.nx * self.ny
    }

    /// Tile containing a point, clamped to the grid.
    pub fn tile_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |v: f64, n: usize| {
            if v.is_nan() || v < 0.0 {
                0
            } else {
                (v.floor() as usize).min(n - 1)
            }
        };
        (
            clamp((x - self.origin.0) / self.width, self.nx),
            clamp((y - self.origin.1) / self.width, self.ny),
        )
    }

    pub fn flat(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx + ix
    }
}

/// One piece of a line inside one tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSegment {
    /// Column of the line in H
    pub line: usize,
    pub tile: (usize, usize),
    /// Share of the line's length in this piece
    pub fraction: f64,
}

/// Result of [`tessellate`].
#[derive(Debug, Clone)]
pub struct Tessellation {
    pub grid: TileGrid,
    pub segments: Vec<LineSegment>,
    /// East components, lines × tiles (km)
    pub lx: Mat<f64>,
    /// North components, lines × tiles (km)
    pub ly: Mat<f64>,
    /// transformers × tiles
    pub hx: Mat<f64>,
    pub hy: Mat<f64>,
}

/// Sorted cut parameters in `[0, 1]` where a straight segment crosses the
/// grid edges. Parallel directions give non-finite `t` and are skipped.
fn cut_points(grid: &TileGrid, from: (f64, f64), to: (f64, f64)) -> Vec<f64> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let mut ts = vec![0.0, 1.0];
    ts.extend(grid.x_edges.iter().map(|&e| (e - from.0) / dx));
    ts.extend(grid.y_edges.iter().map(|&e| (e - from.1) / dy));
    ts.retain(|t| t.is_finite() && (0.0..=1.0).contains(t));
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    ts
}

/// Great-circle length between two (lon, lat) points.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lat2) = (from.1.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (to.0 - from.0).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Compass bearing (0 = north, clockwise) from coordinates.
pub fn bearing_deg(from: (f64, f64), to: (f64, f64)) -> f64 {
    let mean_lat = ((from.1 + to.1) / 2.0).to_radians();
    let east = (to.0 - from.0) * mean_lat.cos();
    let north = to.1 - from.1;
    let deg = east.atan2(north).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Split each line across the tile grid and project H onto tiles.
///
/// `lines` must be the line rows in H column order.
pub fn tessellate(
    lines: &[&LineRecord],
    h: MatRef<'_, f64>,
    tile_width: f64,
    max_tiles: usize,
) -> GicResult<Tessellation> {
    if h.ncols() != lines.len() {
        return Err(GicError::DimensionMismatch {
            expected: lines.len(),
            actual: h.ncols(),
        });
    }

    let grid = TileGrid::covering(
        lines
            .iter()
            .filter_map(|l| l.coordinates())
            .flat_map(|(a, b)| [a, b]),
        tile_width,
        max_tiles,
    )?;
    let n_tiles = grid.n_tiles();
    if lines.len().checked_mul(n_tiles).is_none() {
        return Err(GicError::TileGridTooLarge {
            width: tile_width,
            tiles: n_tiles as f64,
            max: max_tiles,
        });
    }
    let mut lx = Mat::zeros(lines.len(), n_tiles);
    let mut ly = Mat::zeros(lines.len(), n_tiles);
    let mut segments = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some((from, to)) = line.coordinates() else {
            warn!(from = line.from_bus, to = line.to_bus, "line has no coordinates; zeroed in tessellation");
            continue;
        };
        let length = line
            .length_km
            .map(|l| l.value())
            .unwrap_or_else(|| haversine_km(from, to));
        if !length.is_finite() {
            warn!(from = line.from_bus, to = line.to_bus, "non-finite line length; zeroed in tessellation");
            continue;
        }
        let bearing = line
            .bearing_deg
            .map(|b| b.value())
            .unwrap_or_else(|| bearing_deg(from, to))
            .to_radians();
        let (east, north) = (length * bearing.sin(), length * bearing.cos());

        // Always holds 0 and 1, so a zero-span line is one piece
        let ts = cut_points(&grid, from, to);
        for piece in ts.windows(2) {
            let (t0, t1) = (piece[0], piece[1]);
            let fraction = t1 - t0;
            if fraction <= 0.0 {
                continue;
            }
            let mid = (t0 + t1) / 2.0;
            let x = from.0 + mid * (to.0 - from.0);
            let y = from.1 + mid * (to.1 - from.1);
            let (ix, iy) = grid.tile_of(x, y);
            let k = grid.flat(ix, iy);
            lx.write(i, k, lx.read(i, k) + fraction * east);
            ly.write(i, k, ly.read(i, k) + fraction * north);
            segments.push(LineSegment {
                line: i,
                tile: (ix, iy),
                fraction,
            });
        }
    }

    let hx = h * lx.as_ref();
    let hy = h * ly.as_ref();
    debug!(
        tiles = n_tiles,
        nx = grid.nx,
        ny = grid.ny,
        segments = segments.len(),
        "tessellated line geometry"
    );

    Ok(Tessellation {
        grid,
        segments,
        lx,
        ly,
        hx,
        hy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::line;
    use gic_core::units::{Degrees, Kilometers};

    fn geo_line(from: (f64, f64), to: (f64, f64), km: f64, bearing: f64) -> LineRecord {
        let mut l = line(1, 2, 1.0);
        (l.from_lon, l.from_lat, l.to_lon, l.to_lat) = (Some(from.0), Some(from.1), Some(to.0), Some(to.1));
        l.length_km = Some(Kilometers(km));
        l.bearing_deg = Some(Degrees(bearing));
        l
    }

    #[test]
    fn grid_covers_points() {
        let grid = TileGrid::covering([(0.0, 0.0), (2.5, 1.0)], 1.0, 100).unwrap();
        assert_eq!((grid.nx, grid.ny), (3, 2));
        assert_eq!(grid.x_edges, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid.tile_of(2.5, 1.0), (2, 1));
        assert_eq!(grid.tile_of(99.0, -5.0), (2, 0));
    }

    #[test]
    fn rejects_bad_width() {
        assert!(matches!(
            TileGrid::covering([(0.0, 0.0)], 0.0, 100),
            Err(GicError::InvalidTileWidth(_))
        ));
        assert!(TileGrid::covering([(0.0, 0.0)], f64::NAN, 100).is_err());
    }

    #[test]
    fn tiny_width_is_refused_before_allocating() {
        let pts = [(-84.0, 33.0), (-83.0, 34.0)];
        match TileGrid::covering(pts, 1e-10, 1_000_000) {
            Err(GicError::TileGridTooLarge { tiles, max, .. }) => {
                assert!(tiles > 1e19);
                assert_eq!(max, 1_000_000);
            }
            other => panic!("expected TileGridTooLarge, got {other:?}"),
        }
        // Far past usize::MAX
        assert!(TileGrid::covering(pts, 1e-300, usize::MAX).is_err());
        // Exactly at the limit is fine: 3 x 3 tiles
        let grid = TileGrid::covering(pts, 0.5, 9).unwrap();
        assert_eq!(grid.n_tiles(), 9);
        assert!(TileGrid::covering(pts, 0.5, 8).is_err());
    }

    #[test]
    fn east_west_line_splits_across_tiles() {
        let l = geo_line((0.0, 0.5), (3.0, 0.5), 300.0, 90.0);
        let h = Mat::from_fn(1, 1, |_, _| 2.0);
        let t = tessellate(&[&l], h.as_ref(), 1.0, 1_000).unwrap();
        assert_eq!((t.grid.nx, t.grid.ny), (4, 1));
        assert_eq!(t.segments.len(), 3);
        for k in 0..3 {
            assert!((t.lx.read(0, k) - 100.0).abs() < 1e-9);
            assert!(t.ly.read(0, k).abs() < 1e-9);
            assert!((t.hx.read(0, k) - 200.0).abs() < 1e-9);
        }
        assert_eq!(t.lx.read(0, 3), 0.0);
    }

    #[test]
    fn fractions_sum_to_one_for_diagonal_line() {
        let l = geo_line((0.2, 0.1), (2.7, 1.9), 250.0, 45.0);
        let h = Mat::from_fn(1, 1, |_, _| 1.0);
        let t = tessellate(&[&l], h.as_ref(), 0.5, 1_000).unwrap();
        let total: f64 = t.segments.iter().map(|s| s.fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);
        let lx_sum: f64 = (0..t.grid.n_tiles()).map(|k| t.lx.read(0, k)).sum();
        assert!((lx_sum - 250.0 * 45f64.to_radians().sin()).abs() < 1e-9);
    }

    #[test]
    fn zero_span_and_missing_coordinates_are_soft() {
        let point = geo_line((1.0, 1.0), (1.0, 1.0), 10.0, 0.0);
        let bare = line(2, 3, 1.0);
        let h = Mat::from_fn(1, 2, |_, _| 1.0);
        let t = tessellate(&[&point, &bare], h.as_ref(), 1.0, 1_000).unwrap();
        assert_eq!(t.grid.n_tiles(), 1);
        assert!((t.ly.read(0, 0) - 10.0).abs() < 1e-12);
        assert_eq!(t.lx.read(1, 0), 0.0);
        assert!(t.hx.read(0, 0).is_finite());
    }

    #[test]
    fn bearing_from_coordinates() {
        assert!((bearing_deg((0.0, 0.0), (0.0, 1.0))).abs() < 1e-9);
        assert!((bearing_deg((0.0, 0.0), (1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg((0.0, 0.0), (-1.0, 0.0)) - 270.0).abs() < 1e-9);
        assert!((haversine_km((0.0, 0.0), (0.0, 1.0)) - 111.19).abs() < 0.01);
    }

    #[test]
    fn column_count_must_match_lines() {
        let l = geo_line((0.0, 0.0), (1.0, 0.0), 1.0, 90.0);
        let h = Mat::<f64>::zeros(1, 2);
        assert!(matches!(
            tessellate(&[&l], h.as_ref(), 1.0, 1_000),
            Err(GicError::DimensionMismatch { .. })
        ));
    }
}
