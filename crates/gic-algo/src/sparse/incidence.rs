//! Sparse incidence matrix and grounded conductance Laplacian.
//!
//! ```text
//! A[b, from(b)] = +1,  A[b, to(b)] = -1
//! Gd = 3 · diag(G)                   (per-phase to three-phase)
//! L  = Aᵗ · Gd · A  +  diag(1/R_ground) over substation nodes
//! ```
//!
//! Node columns follow [`NodeId`] ordering: substations by ascending number,
//! then buses by ascending number. Only nodes referenced by some branch get a
//! column.

use crate::gic::topology::BranchSet;
use faer::Mat;
use gic_core::records::SubstationRecord;
use gic_core::{GicError, GicResult, NodeId};
use sprs::{CsMat, CsMatView, TriMat};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Bijection between node ids and dense matrix indices.
#[derive(Debug, Clone, Default)]
pub struct NodeIndexMap {
    order: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
}

impl NodeIndexMap {
    pub fn from_nodes<I: IntoIterator<Item = NodeId>>(nodes: I) -> Self {
        let order: Vec<NodeId> = nodes.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let index = order.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        Self { order, index }
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.index.get(&node).copied()
    }

    pub fn node_at(&self, idx: usize) -> Option<NodeId> {
        self.order.get(idx).copied()
    }

    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Assembled DC conductance network.
#[derive(Debug, Clone)]
pub struct ConductanceNetwork {
    nodes: NodeIndexMap,
    /// branches × nodes
    incidence: CsMat<f64>,
    /// Three-phase branch conductance (diagonal of Gd)
    conductance: Vec<f64>,
    /// (from, to) node indices per branch
    endpoints: Vec<(usize, usize)>,
    /// Aᵗ·Gd·A before grounding
    laplacian: CsMat<f64>,
    /// (node index, conductance to remote earth) per substation column
    grounding: Vec<(usize, f64)>,
}

impl ConductanceNetwork {
    /// Assemble A, Gd and L from the ordered branch set.
    ///
    /// Every substation that appears as a branch endpoint must have a
    /// grounding record with a finite positive resistance.
    pub fn assemble(branches: &BranchSet, substations: &[SubstationRecord]) -> GicResult<Self> {
        let nodes = NodeIndexMap::from_nodes(
            branches
                .branches()
                .iter()
                .flat_map(|b| [b.from, b.to]),
        );
        let n = nodes.len();
        let nb = branches.len();

        let mut a = TriMat::new((nb, n));
        let mut lap = TriMat::new((n, n));
        let mut conductance = Vec::with_capacity(nb);
        let mut endpoints = Vec::with_capacity(nb);

        for (row, branch) in branches.branches().iter().enumerate() {
            if branch.from == branch.to {
                return Err(GicError::Validation(format!(
                    "branch {row} connects {} to itself",
                    branch.from
                )));
            }
            let i = nodes
                .index_of(branch.from)
                .ok_or_else(|| GicError::Other(format!("{} missing from ordering", branch.from)))?;
            let j = nodes
                .index_of(branch.to)
                .ok_or_else(|| GicError::Other(format!("{} missing from ordering", branch.to)))?;
            let g = 3.0 * branch.conductance;

            a.add_triplet(row, i, 1.0);
            a.add_triplet(row, j, -1.0);

            lap.add_triplet(i, i, g);
            lap.add_triplet(j, j, g);
            lap.add_triplet(i, j, -g);
            lap.add_triplet(j, i, -g);

            conductance.push(g);
            endpoints.push((i, j));
        }

        let ohms_by_sub: HashMap<usize, f64> = substations
            .iter()
            .map(|s| (s.number, s.grounding_ohms.value()))
            .collect();

        let mut grounding = Vec::new();
        for (idx, node) in nodes.order().iter().enumerate() {
            let NodeId::Substation(sub) = node else {
                // Substations sort first
                break;
            };
            let ohms = *ohms_by_sub
                .get(&sub.value())
                .ok_or(GicError::MissingGrounding(sub.value()))?;
            if !(ohms > 0.0 && ohms.is_finite()) {
                return Err(GicError::InvalidGrounding(sub.value(), ohms));
            }
            grounding.push((idx, 1.0 / ohms));
        }

        let network = Self {
            nodes,
            incidence: a.to_csr(),
            conductance,
            endpoints,
            laplacian: lap.to_csr(),
            grounding,
        };
        debug!(
            nodes = n,
            branches = nb,
            substations = network.grounding.len(),
            nnz = network.laplacian.nnz(),
            "assembled conductance Laplacian"
        );
        Ok(network)
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_branches(&self) -> usize {
        self.conductance.len()
    }

    pub fn nodes(&self) -> &NodeIndexMap {
        &self.nodes
    }

    pub fn incidence(&self) -> CsMatView<'_, f64> {
        self.incidence.view()
    }

    pub fn conductance(&self) -> &[f64] {
        &self.conductance
    }

    pub fn endpoints(&self) -> &[(usize, usize)] {
        &self.endpoints
    }

    /// Laplacian without the substation grounding terms.
    pub fn laplacian(&self) -> CsMatView<'_, f64> {
        self.laplacian.view()
    }

    pub fn grounding(&self) -> &[(usize, f64)] {
        &self.grounding
    }

    /// Sparse grounded Laplacian.
    pub fn grounded_laplacian(&self) -> CsMat<f64> {
        let n = self.n_nodes();
        let mut tri = TriMat::new((n, n));
        for (&v, (i, j)) in self.laplacian.iter() {
            tri.add_triplet(i, j, v);
        }
        for &(k, g) in &self.grounding {
            tri.add_triplet(k, k, g);
        }
        tri.to_csr()
    }

    /// Dense grounded Laplacian, ready for the inverse backend.
    pub fn grounded_dense(&self) -> Mat<f64> {
        let n = self.n_nodes();
        let mut dense = Mat::zeros(n, n);
        for (&v, (i, j)) in self.laplacian.iter() {
            dense.write(i, j, dense.read(i, j) + v);
        }
        for &(k, g) in &self.grounding {
            dense.write(k, k, dense.read(k, k) + g);
        }
        dense
    }

    /// Branch endpoints as node ids, for island detection.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.endpoints.iter().filter_map(|&(i, j)| {
            Some((self.nodes.node_at(i)?, self.nodes.node_at(j)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gic::topology::Topology;
    use crate::test_utils::{three_bus_system, two_bus_system};

    fn network(tables: &gic_core::GicTables) -> ConductanceNetwork {
        let topo = Topology::build(tables, 100.0).unwrap();
        ConductanceNetwork::assemble(&topo.branches, &tables.substations).unwrap()
    }

    fn dense(view: CsMatView<'_, f64>) -> Vec<Vec<f64>> {
        let (r, c) = view.shape();
        let mut out = vec![vec![0.0; c]; r];
        for (&v, (i, j)) in view.iter() {
            out[i][j] += v;
        }
        out
    }

    #[test]
    fn incidence_rows_have_one_plus_and_one_minus() {
        let net = network(&three_bus_system());
        let a = dense(net.incidence());
        for row in &a {
            assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
            assert_eq!(row.iter().filter(|&&v| v == -1.0).count(), 1);
            assert_eq!(row.iter().filter(|&&v| v != 0.0).count(), 2);
        }
    }

    #[test]
    fn laplacian_is_symmetric_and_equals_at_g_a() {
        let net = network(&three_bus_system());
        let a = dense(net.incidence());
        let l = dense(net.laplacian());
        let n = net.n_nodes();
        for i in 0..n {
            for j in 0..n {
                assert!((l[i][j] - l[j][i]).abs() < 1e-12);
                let expected: f64 = (0..net.n_branches())
                    .map(|b| a[b][i] * net.conductance()[b] * a[b][j])
                    .sum();
                assert!((l[i][j] - expected).abs() < 1e-9, "L[{i},{j}]");
            }
        }
    }

    #[test]
    fn grounding_only_touches_substation_diagonal() {
        let net = network(&three_bus_system());
        let before = dense(net.laplacian());
        let after = dense(net.grounded_laplacian().view());
        let grounded: Vec<usize> = net.grounding().iter().map(|&(k, _)| k).collect();
        for i in 0..net.n_nodes() {
            for j in 0..net.n_nodes() {
                let changed = (after[i][j] - before[i][j]).abs() > 0.0;
                assert_eq!(changed, i == j && grounded.contains(&i), "[{i},{j}]");
            }
        }
        let dense_grounded = net.grounded_dense();
        for i in 0..net.n_nodes() {
            for j in 0..net.n_nodes() {
                assert!((dense_grounded.read(i, j) - after[i][j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn node_map_is_a_bijection_with_substations_first() {
        let net = network(&three_bus_system());
        let order = net.nodes().order();
        for (i, node) in order.iter().enumerate() {
            assert_eq!(net.nodes().index_of(*node), Some(i));
        }
        let first_bus = order.iter().position(|n| !n.is_substation()).unwrap();
        assert!(order[first_bus..].iter().all(|n| !n.is_substation()));
        assert_eq!(net.grounding().len(), first_bus);
        let mut seen: Vec<NodeId> = net.edges().flat_map(|(a, b)| [a, b]).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen, order);
    }

    #[test]
    fn conductance_is_three_phase() {
        let tables = two_bus_system();
        let topo = Topology::build(&tables, 100.0).unwrap();
        let net = ConductanceNetwork::assemble(&topo.branches, &tables.substations).unwrap();
        for (b, branch) in topo.branches.branches().iter().enumerate() {
            assert!((net.conductance()[b] - 3.0 * branch.conductance).abs() < 1e-12);
        }
    }

    #[test]
    fn missing_grounding_is_fatal() {
        let mut tables = two_bus_system();
        tables.substations.retain(|s| s.number != 2);
        let topo = Topology::build(&tables, 100.0).unwrap();
        let err = ConductanceNetwork::assemble(&topo.branches, &tables.substations).unwrap_err();
        assert!(matches!(err, GicError::MissingGrounding(2)));
    }

    #[test]
    fn non_positive_grounding_is_rejected() {
        let mut tables = two_bus_system();
        tables.substations[0].grounding_ohms = gic_core::Ohms(0.0);
        let topo = Topology::build(&tables, 100.0).unwrap();
        let err = ConductanceNetwork::assemble(&topo.branches, &tables.substations).unwrap_err();
        assert!(matches!(err, GicError::InvalidGrounding(_, _)));
    }
}
