//! Worst-case polarity corners.
//!
//! Lines whose transformer sign patterns are equal or exact negatives of one
//! another always push the same transformers in the same (or opposite)
//! direction, so they can share one polarity variable. Corners are the ±1
//! assignments over those groups, with each assignment and its negation
//! counted once since both produce the same absolute losses.
//!
//! ```text
//! HLE    = H · diag(len) · diag(E)          transformers × lines
//! CRNR   = {±1}^groups, negations removed   groups × corners
//! JOIN   = ±1 membership                    lines × groups
//! C      = JOIN · CRNR                      lines × corners
//! LOSSES = (HLE · C)ᵗ                       corners × transformers
//! ```

use super::memo::Memo;
use crate::config::GicConfig;
use faer::{Mat, MatRef};
use gic_core::{GicError, GicResult};
use std::collections::HashSet;
use tracing::{debug, info};

/// Column equivalence classes of `matrix`: columns equal to, or the exact
/// negative of, the class leader within `tolerance`. Columns whose entries
/// are all below `tolerance` in magnitude belong to no class.
pub fn find_equivalent_columns(matrix: MatRef<'_, f64>, tolerance: f64) -> Vec<Vec<usize>> {
    let (rows, cols) = (matrix.nrows(), matrix.ncols());
    let is_zero = |j: usize| (0..rows).all(|i| matrix.read(i, j).abs() < tolerance);
    let matches = |a: usize, b: usize, sign: f64| {
        (0..rows).all(|i| (matrix.read(i, a) - sign * matrix.read(i, b)).abs() <= tolerance)
    };

    let mut identified = vec![false; cols];
    let mut groups = Vec::new();
    for i in 0..cols {
        if identified[i] || is_zero(i) {
            continue;
        }
        let members: Vec<usize> = (0..cols)
            .filter(|&j| !identified[j] && (matches(i, j, 1.0) || matches(i, j, -1.0)))
            .collect();
        for &j in &members {
            identified[j] = true;
        }
        groups.push(members);
    }
    groups
}

/// All ±1 assignments over `n` groups (n × 2ⁿ). Column order follows a
/// cartesian product of `(+1, -1)` with the first group most significant.
pub fn polarity_combinations(n: usize) -> Mat<f64> {
    Mat::from_fn(n, 1usize << n, |g, c| {
        if (c >> (n - 1 - g)) & 1 == 0 {
            1.0
        } else {
            -1.0
        }
    })
}

fn column_key(matrix: MatRef<'_, f64>, j: usize, sign: f64) -> Vec<u64> {
    (0..matrix.nrows())
        // + 0.0 folds -0.0 into 0.0
        .map(|i| (sign * matrix.read(i, j) + 0.0).to_bits())
        .collect()
}

/// Drop every column that is the exact negative of an earlier kept column.
pub fn remove_negative_columns(matrix: MatRef<'_, f64>) -> Mat<f64> {
    let mut kept_keys = HashSet::new();
    let mut kept = Vec::new();
    for j in 0..matrix.ncols() {
        if kept_keys.contains(&column_key(matrix, j, -1.0)) {
            continue;
        }
        kept_keys.insert(column_key(matrix, j, 1.0));
        kept.push(j);
    }
    Mat::from_fn(matrix.nrows(), kept.len(), |i, k| matrix.read(i, kept[k]))
}

/// Linear-interpolated percentile (`q` in [0, 100]).
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Corner losses after optional pruning.
#[derive(Debug, Clone)]
pub struct CornerTopology {
    /// Signed transformer GIC per surviving corner (corners × transformers)
    pub losses: Mat<f64>,
    /// Column of the corner matrix each row came from
    pub corners: Vec<usize>,
}

impl CornerTopology {
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Sum of absolute losses per corner.
    pub fn net_losses(&self) -> Vec<f64> {
        (0..self.losses.nrows())
            .map(|r| (0..self.losses.ncols()).map(|c| self.losses.read(r, c).abs()).sum())
            .collect()
    }
}

/// `true` when `a` is elementwise ≤ `b` with at least one strict `<`.
fn dominated_by(a: &[f64], b: &[f64]) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y) && a.iter().zip(b).any(|(x, y)| x < y)
}

/// Corner enumeration state for one H-matrix.
#[derive(Debug, Clone)]
pub struct GicCorners {
    pub(crate) h: Mat<f64>,
    pub(crate) lengths: Vec<f64>,
    pub(crate) field: Vec<f64>,
    pub(crate) hle: Mat<f64>,
    pub(crate) sign_h: Mat<f64>,
    pub(crate) groups: Vec<Vec<usize>>,
    pub(crate) config: GicConfig,
    corner_matrix: Memo<Mat<f64>>,
    pub(crate) flip_matrix: Memo<Mat<f64>>,
}

impl GicCorners {
    /// `h` is transformers × lines; `lengths` and `field` are per line.
    pub fn new(h: Mat<f64>, lengths: &[f64], field: &[f64], config: &GicConfig) -> GicResult<Self> {
        let n_lines = h.ncols();
        for v in [lengths.len(), field.len()] {
            if v != n_lines {
                return Err(GicError::DimensionMismatch {
                    expected: n_lines,
                    actual: v,
                });
            }
        }

        let hle = Mat::from_fn(h.nrows(), n_lines, |x, l| h.read(x, l) * lengths[l] * field[l]);
        let zero_tol = config.sign_zero_tolerance;
        let sign_h = Mat::from_fn(h.nrows(), n_lines, |x, l| {
            let v = h.read(x, l);
            if v.abs() < zero_tol {
                0.0
            } else {
                v.signum()
            }
        });

        // Lines without excitation (zero length or field) join no group
        let eq_tol = config.equivalence_tolerance;
        let excited: Vec<bool> = (0..n_lines)
            .map(|l| (0..hle.nrows()).any(|x| hle.read(x, l).abs() >= eq_tol))
            .collect();
        let masked = Mat::from_fn(h.nrows(), n_lines, |x, l| {
            if excited[l] {
                sign_h.read(x, l)
            } else {
                0.0
            }
        });
        let groups = find_equivalent_columns(masked.as_ref(), eq_tol);

        debug!(
            transformers = h.nrows(),
            lines = n_lines,
            groups = groups.len(),
            "grouped lines by sign pattern"
        );

        Ok(Self {
            h,
            lengths: lengths.to_vec(),
            field: field.to_vec(),
            hle,
            sign_h,
            groups,
            config: config.clone(),
            corner_matrix: Memo::Unbuilt,
            flip_matrix: Memo::Unbuilt,
        })
    }

    pub fn h(&self) -> MatRef<'_, f64> {
        self.h.as_ref()
    }

    pub fn hle(&self) -> MatRef<'_, f64> {
        self.hle.as_ref()
    }

    pub fn sign_h(&self) -> MatRef<'_, f64> {
        self.sign_h.as_ref()
    }

    pub fn lengths(&self) -> &[f64] {
        &self.lengths
    }

    pub fn field(&self) -> &[f64] {
        &self.field
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn n_lines(&self) -> usize {
        self.h.ncols()
    }

    pub fn n_transformers(&self) -> usize {
        self.h.nrows()
    }

    /// Polarity corners (lines × corners), built on first call.
    pub fn corners(&mut self) -> GicResult<&Mat<f64>> {
        let (groups, sign_h, config) = (&self.groups, &self.sign_h, &self.config);
        self.corner_matrix
            .get_or_try_build(|| build_corner_matrix(groups, sign_h.as_ref(), config))
    }

    /// Losses of every corner, optionally pruned.
    ///
    /// `remove_strictly_small` drops corners dominated elementwise (in
    /// absolute loss) by another corner. `top_losses_only` keeps corners whose
    /// net loss is at or above the configured percentile.
    pub fn topology(
        &mut self,
        remove_strictly_small: bool,
        top_losses_only: bool,
    ) -> GicResult<CornerTopology> {
        let percentile_q = self.config.top_loss_percentile;
        self.corners()?;
        let (Some(c), hle) = (self.corner_matrix.get(), &self.hle) else {
            return Err(GicError::Other("corner matrix unavailable".into()));
        };

        let product = hle * c;
        let n_xf = product.nrows();
        let rows: Vec<Vec<f64>> = (0..product.ncols())
            .map(|k| (0..n_xf).map(|x| product.read(x, k)).collect())
            .collect();
        let mut keep: Vec<usize> = (0..rows.len()).collect();

        if remove_strictly_small {
            let abs: Vec<Vec<f64>> = rows
                .iter()
                .map(|r| r.iter().map(|v| v.abs()).collect())
                .collect();
            keep.retain(|&i| !(0..abs.len()).any(|j| j != i && dominated_by(&abs[i], &abs[j])));
        }

        if top_losses_only {
            let net: Vec<f64> = keep
                .iter()
                .map(|&i| rows[i].iter().map(|v| v.abs()).sum())
                .collect();
            if let Some(top) = percentile(&net, percentile_q) {
                keep = keep
                    .into_iter()
                    .zip(&net)
                    .filter(|&(_, &n)| n >= top)
                    .map(|(i, _)| i)
                    .collect();
            }
        }

        let losses = Mat::from_fn(keep.len(), n_xf, |r, x| rows[keep[r]][x]);
        info!(
            corners = rows.len(),
            kept = keep.len(),
            "computed corner topology"
        );
        Ok(CornerTopology {
            losses,
            corners: keep,
        })
    }
}

fn build_corner_matrix(
    groups: &[Vec<usize>],
    sign_h: MatRef<'_, f64>,
    config: &GicConfig,
) -> GicResult<Mat<f64>> {
    let n_groups = groups.len();
    if n_groups > config.max_corner_groups {
        return Err(GicError::CornerSpaceTooLarge {
            groups: n_groups,
            max: config.max_corner_groups,
        });
    }

    let crnr = remove_negative_columns(polarity_combinations(n_groups).as_ref());

    // JOIN as (group, sign) per line; lines in no group stay zero
    let mut join: Vec<Option<(usize, f64)>> = vec![None; sign_h.ncols()];
    for (g, members) in groups.iter().enumerate() {
        let reference = members[0];
        for &line in members {
            let negated = (0..sign_h.nrows())
                .all(|x| sign_h.read(x, reference) == -sign_h.read(x, line));
            join[line] = Some((g, if negated { -1.0 } else { 1.0 }));
        }
    }

    let corner_matrix = Mat::from_fn(sign_h.ncols(), crnr.ncols(), |l, c| match join[l] {
        Some((g, s)) => s * crnr.read(g, c),
        None => 0.0,
    });
    debug!(groups = n_groups, corners = crnr.ncols(), "built corner matrix");
    Ok(corner_matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat(rows: &[&[f64]]) -> Mat<f64> {
        Mat::from_fn(rows.len(), rows[0].len(), |i, j| rows[i][j])
    }

    #[test]
    fn equivalent_columns_partition_non_zero_columns() {
        let m = mat(&[
            &[1.0, -1.0, 0.0, 1.0, 1.0],
            &[-1.0, 1.0, 0.0, 1.0, -1.0],
        ]);
        let groups = find_equivalent_columns(m.as_ref(), 1e-10);
        assert_eq!(groups, vec![vec![0, 1, 4], vec![3]]);
        let mut all: Vec<usize> = groups.concat();
        all.sort();
        assert_eq!(all, vec![0, 1, 3, 4]);
    }

    #[test]
    fn five_identical_lines_make_one_corner() {
        let h = Mat::from_fn(3, 5, |x, _| [0.4, -0.2, 0.1][x]);
        let mut corners = GicCorners::new(h, &[10.0; 5], &[1.0; 5], &GicConfig::default()).unwrap();
        assert_eq!(corners.groups(), &[vec![0, 1, 2, 3, 4]]);
        assert_eq!(corners.corners().unwrap().ncols(), 1);
    }

    #[test]
    fn negation_closure_of_pruned_combinations() {
        let full = polarity_combinations(3);
        let pruned = remove_negative_columns(full.as_ref());
        assert_eq!(pruned.ncols(), 4);
        let col = |m: &Mat<f64>, j: usize| (0..m.nrows()).map(|i| m.read(i, j)).collect::<Vec<_>>();
        let pruned_cols: Vec<Vec<f64>> = (0..pruned.ncols()).map(|j| col(&pruned, j)).collect();
        for j in 0..full.ncols() {
            let c = col(&full, j);
            let neg: Vec<f64> = c.iter().map(|v| -v).collect();
            let has_c = pruned_cols.contains(&c);
            let has_neg = pruned_cols.contains(&neg);
            assert!(has_c ^ has_neg, "column {j}");
        }
    }

    #[test]
    fn combinations_follow_product_order() {
        let m = polarity_combinations(2);
        let cols: Vec<(f64, f64)> = (0..4).map(|c| (m.read(0, c), m.read(1, c))).collect();
        assert_eq!(cols, vec![(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]);
    }

    #[test]
    fn anti_columns_are_repolarized() {
        // Line 1 opposes line 0 on every transformer
        let h = mat(&[&[1.0, -2.0], &[-1.0, 3.0]]);
        let mut corners = GicCorners::new(h, &[1.0, 1.0], &[1.0, 1.0], &GicConfig::default()).unwrap();
        let c = corners.corners().unwrap();
        assert_eq!(c.ncols(), 1);
        assert_eq!((c.read(0, 0), c.read(1, 0)), (1.0, -1.0));
    }

    #[test]
    fn unexcited_lines_are_left_out() {
        let h = mat(&[&[1.0, 1.0, -1.0], &[1.0, -1.0, -1.0]]);
        let mut corners =
            GicCorners::new(h, &[5.0, 0.0, 5.0], &[1.0; 3], &GicConfig::default()).unwrap();
        assert_eq!(corners.groups(), &[vec![0, 2]]);
        let c = corners.corners().unwrap();
        assert_eq!(c.read(1, 0), 0.0);
    }

    #[test]
    fn dominance_pruning_removes_smaller_corner() {
        // Two independent lines: corners (+,+) and (+,-)
        let h = mat(&[&[1.0, 0.5], &[1.0, -0.5]]);
        let mut corners = GicCorners::new(h, &[1.0, 1.0], &[1.0, 1.0], &GicConfig::default()).unwrap();
        let all = corners.topology(false, false).unwrap();
        assert_eq!(all.len(), 2);
        // Losses |(1.5, 0.5)| and |(0.5, 1.5)| do not dominate each other
        let pruned = corners.topology(true, false).unwrap();
        assert_eq!(pruned.len(), 2);
    }

    #[test]
    fn strictly_dominated_corner_is_removed() {
        let h = mat(&[&[1.0, 0.5], &[1.0, 0.0]]);
        let mut corners = GicCorners::new(h, &[1.0, 1.0], &[1.0, 1.0], &GicConfig::default()).unwrap();
        // (+,+) gives (1.5, 1.0); (+,-) gives (0.5, 1.0)
        let pruned = corners.topology(true, false).unwrap();
        assert_eq!(pruned.corners, vec![0]);
        assert!((pruned.losses.read(0, 0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn top_losses_keep_the_maximum() {
        let h = mat(&[&[1.0, 0.5, 0.25], &[1.0, -0.5, 0.25], &[1.0, 0.5, -0.25]]);
        let mut corners = GicCorners::new(h, &[1.0; 3], &[1.0; 3], &GicConfig::default()).unwrap();
        let all = corners.topology(false, false).unwrap();
        let top = corners.topology(false, true).unwrap();
        let best = all.net_losses().into_iter().fold(f64::MIN, f64::max);
        assert!(!top.is_empty() && top.len() < all.len());
        assert!(top.net_losses().iter().any(|&n| (n - best).abs() < 1e-12));
    }

    #[test]
    fn corner_limit_is_enforced() {
        let h = Mat::from_fn(3, 3, |i, j| if i == j { 1.0 } else { 0.0 });
        let config = GicConfig {
            max_corner_groups: 2,
            ..GicConfig::default()
        };
        let mut corners = GicCorners::new(h, &[1.0; 3], &[1.0; 3], &config).unwrap();
        assert!(matches!(
            corners.corners(),
            Err(GicError::CornerSpaceTooLarge { groups: 3, max: 2 })
        ));
    }

    #[test]
    fn percentile_interpolates_linearly() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 50.0), Some(2.0));
        assert!((percentile(&[0.0, 10.0], 90.0).unwrap() - 9.0).abs() < 1e-12);
    }
}
