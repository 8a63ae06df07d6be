//! Transformer GIC sensitivity (H-matrix).
//!
//! H maps a unit induced voltage in each branch to the signed effective GIC
//! of each transformer:
//! ```text
//! H = K · Ibase⁻¹ · (P_H + TR⁻¹ · P_L) · (Gd · A · L⁻¹ · Aᵗ · Gd − Gd) / 3
//! ```
//!
//! `Gd·A·L⁻¹·Aᵗ·Gd` is never formed as a product of dense operands. For
//! branches `b`, `c` with endpoints `(f, t)`:
//! ```text
//! X[b,c] = g_b · g_c · (L⁻¹[f_b,f_c] − L⁻¹[f_b,t_c] − L⁻¹[t_b,f_c] + L⁻¹[t_b,t_c]) − δ_bc · g_b
//! ```
//! and only the requested columns of X are evaluated.

use super::incidence::ConductanceNetwork;
use crate::gic::topology::{ParsedTransformer, SelectorTriplets, Topology};
use faer::Mat;
use gic_core::{GicError, GicResult, LinearSystemBackend};
use sprs::{CsMat, TriMat};
use std::ops::Range;
use tracing::debug;

/// Per-transformer scaling applied after selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerScaling {
    /// HV/LV nominal ratio
    pub tap_ratio: Vec<f64>,
    /// DC current base in amperes
    pub current_base: Vec<f64>,
    pub k: Vec<f64>,
}

impl TransformerScaling {
    pub fn from_transformers(transformers: &[ParsedTransformer]) -> Self {
        Self {
            tap_ratio: transformers.iter().map(|x| x.tap_ratio).collect(),
            current_base: transformers.iter().map(ParsedTransformer::current_base).collect(),
            k: transformers.iter().map(|x| x.k_param).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }
}

/// LV and HV selectors as (transformers × branches) sparse matrices.
#[derive(Debug, Clone)]
pub struct SelectorMatrices {
    pub low: CsMat<f64>,
    pub high: CsMat<f64>,
}

impl SelectorMatrices {
    pub fn from_triplets(
        low: &SelectorTriplets,
        high: &SelectorTriplets,
        n_transformers: usize,
        n_branches: usize,
    ) -> Self {
        let build = |triplets: &SelectorTriplets| {
            let mut tri = TriMat::new((n_transformers, n_branches));
            for (r, c, v) in triplets.iter() {
                tri.add_triplet(r, c, v);
            }
            tri.to_csr()
        };
        Self {
            low: build(low),
            high: build(high),
        }
    }

    /// `K · Ibase⁻¹ · (P_H + TR⁻¹ · P_L)` as a sparse matrix.
    pub fn combined(&self, scaling: &TransformerScaling) -> CsMat<f64> {
        let (rows, cols) = self.high.shape();
        let mut tri = TriMat::new((rows, cols));
        for (&v, (x, b)) in self.high.iter() {
            tri.add_triplet(x, b, scaling.k[x] / scaling.current_base[x] * v);
        }
        for (&v, (x, b)) in self.low.iter() {
            let scale = scaling.k[x] / scaling.current_base[x] / scaling.tap_ratio[x];
            tri.add_triplet(x, b, scale * v);
        }
        tri.to_csr()
    }
}

/// H-matrix computation over an assembled network.
pub struct GicSensitivity;

impl GicSensitivity {
    /// Full (transformers × branches) H, or only the line columns when
    /// `reduce` is set.
    pub fn compute_h(
        topology: &Topology,
        network: &ConductanceNetwork,
        solver: &dyn LinearSystemBackend,
        reduce: bool,
    ) -> GicResult<Mat<f64>> {
        let nb = network.n_branches();
        if topology.branches.len() != nb {
            return Err(GicError::DimensionMismatch {
                expected: topology.branches.len(),
                actual: nb,
            });
        }
        let columns = if reduce {
            topology.branches.line_range()
        } else {
            0..nb
        };

        let selectors =
            SelectorMatrices::from_triplets(&topology.low, &topology.high, topology.n_transformers(), nb);
        let scaling = TransformerScaling::from_transformers(&topology.transformers);
        let m = selectors.combined(&scaling);

        let l_inv = solver.invert(network.grounded_dense().as_ref())?;
        let x = Self::branch_response(network, &l_inv, columns.clone());

        let mut h = Mat::zeros(m.rows(), columns.len());
        for (&coef, (row, b)) in m.iter() {
            for c in 0..columns.len() {
                h.write(row, c, h.read(row, c) + coef * x.read(b, c) / 3.0);
            }
        }

        debug!(
            transformers = h.nrows(),
            columns = h.ncols(),
            reduced = reduce,
            "computed H-matrix"
        );
        Ok(h)
    }

    /// Columns `columns` of `Gd·A·L⁻¹·Aᵗ·Gd − Gd` (branches × columns.len()).
    pub fn branch_response(
        network: &ConductanceNetwork,
        l_inv: &Mat<f64>,
        columns: Range<usize>,
    ) -> Mat<f64> {
        let g = network.conductance();
        let ends = network.endpoints();
        let offset = columns.start;
        Mat::from_fn(network.n_branches(), columns.len(), |b, k| {
            let c = offset + k;
            let (fb, tb) = ends[b];
            let (fc, tc) = ends[c];
            let coupling = l_inv.read(fb, fc) - l_inv.read(fb, tc) - l_inv.read(tb, fc)
                + l_inv.read(tb, tc);
            let self_term = if b == c { g[b] } else { 0.0 };
            g[b] * g[c] * coupling - self_term
        })
    }
}
