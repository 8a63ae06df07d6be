//! `GicTool`: one analysis over one snapshot of tables.

use super::corners::GicCorners;
use super::tessellation::{tessellate, Tessellation};
use super::topology::Topology;
use crate::config::GicConfig;
use crate::sparse::{ConductanceNetwork, GicSensitivity};
use faer::Mat;
use gic_core::records::{GicTables, LineRecord};
use gic_core::{
    floating_islands, BusId, GicError, GicResult, IslandSummary, LinearSystemBackend,
};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct GicTool {
    tables: GicTables,
    config: GicConfig,
    topology: Topology,
    network: ConductanceNetwork,
    floating: Vec<IslandSummary>,
    solver: Arc<dyn LinearSystemBackend>,
}

impl GicTool {
    /// Build the topology and conductance network. Fails on malformed wiring,
    /// unusable line conductance, or missing substation grounding.
    pub fn new(tables: &GicTables, config: &GicConfig) -> GicResult<Self> {
        config.validate()?;
        let topology = Topology::build(tables, config.system_mva_base)?;
        let network = ConductanceNetwork::assemble(&topology.branches, &tables.substations)?;

        let floating = floating_islands(network.edges());
        for island in &floating {
            warn!(
                island = island.island_id,
                nodes = island.nodes.len(),
                first = %island.nodes[0],
                "island has no path to ground"
            );
        }

        info!(
            transformers = topology.n_transformers(),
            branches = topology.branches.len(),
            lines = topology.branches.n_lines(),
            nodes = network.n_nodes(),
            solver = config.solver.as_str(),
            "GIC network ready"
        );

        Ok(Self {
            tables: tables.clone(),
            config: config.clone(),
            topology,
            network,
            floating,
            solver: config.solver.build_solver(),
        })
    }

    pub fn tables(&self) -> &GicTables {
        &self.tables
    }

    pub fn config(&self) -> &GicConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn network(&self) -> &ConductanceNetwork {
        &self.network
    }

    /// Islands of the branch graph with no substation.
    pub fn floating_islands(&self) -> &[IslandSummary] {
        &self.floating
    }

    /// Line rows in H column order.
    pub fn line_records(&self) -> Vec<&LineRecord> {
        self.tables.line_rows().collect()
    }

    /// H-matrix; `reduce` keeps only the line columns.
    pub fn h_matrix(&self, reduce: bool) -> GicResult<Mat<f64>> {
        if let Some(island) = self.floating.first() {
            return Err(GicError::Singular(format!(
                "grounded Laplacian is singular: island containing {} has no substation",
                island.nodes[0]
            )));
        }
        GicSensitivity::compute_h(&self.topology, &self.network, self.solver.as_ref(), reduce)
    }

    /// Direction-resolved, per-tile sensitivities. The grid is capped at
    /// `max_tiles` from the configuration.
    pub fn tessellations(&self, tile_width: f64) -> GicResult<Tessellation> {
        let h = self.h_matrix(true)?;
        tessellate(&self.line_records(), h.as_ref(), tile_width, self.config.max_tiles)
    }

    /// Corner state with line lengths (missing lengths count as zero) and a
    /// unit field on every line.
    pub fn corner_factory(&self) -> GicResult<GicCorners> {
        let field = vec![1.0; self.topology.branches.n_lines()];
        self.corner_factory_with_field(&field)
    }

    /// Corner state with a per-line field magnitude.
    pub fn corner_factory_with_field(&self, field: &[f64]) -> GicResult<GicCorners> {
        let lengths: Vec<f64> = self
            .tables
            .line_rows()
            .map(|l| l.length_km.map(|k| k.value()).unwrap_or(0.0))
            .collect();
        GicCorners::new(self.h_matrix(true)?, &lengths, field, &self.config)
    }

    /// Bus × transformer selector: each transformer books on its loss bus.
    pub fn loss_selector(&self) -> GicResult<CsMat<f64>> {
        let bus_index: HashMap<BusId, usize> = self
            .tables
            .buses
            .iter()
            .enumerate()
            .map(|(i, b)| (BusId::new(b.number), i))
            .collect();
        let mut px = TriMat::new((self.tables.buses.len(), self.topology.n_transformers()));
        for (x, xfmr) in self.topology.transformers.iter().enumerate() {
            let row = *bus_index
                .get(&xfmr.loss_bus)
                .ok_or(GicError::UnknownBus(xfmr.loss_bus.value()))?;
            px.add_triplet(row, x, 1.0);
        }
        Ok(px.to_csr())
    }

    /// Aggregate a per-transformer quantity onto buses, in bus-table order.
    pub fn bus_losses(&self, per_transformer: &[f64]) -> GicResult<Vec<(BusId, f64)>> {
        let n_xf = self.topology.n_transformers();
        if per_transformer.len() != n_xf {
            return Err(GicError::DimensionMismatch {
                expected: n_xf,
                actual: per_transformer.len(),
            });
        }
        let px = self.loss_selector()?;
        let mut totals = vec![0.0; self.tables.buses.len()];
        for (&v, (bus, x)) in px.iter() {
            totals[bus] += v * per_transformer[x];
        }
        Ok(self
            .tables
            .buses
            .iter()
            .zip(totals)
            .map(|(b, total)| (BusId::new(b.number), total))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{three_bus_system, two_bus_system};

    #[test]
    fn reduced_h_has_one_column_per_line() {
        let tables = three_bus_system();
        let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
        let h = tool.h_matrix(true).unwrap();
        assert_eq!(h.nrows(), tables.transformers.len());
        assert_eq!(h.ncols(), tool.line_records().len());
        assert!(tool.floating_islands().is_empty());
    }

    #[test]
    fn floating_island_is_reported_as_singular() {
        let mut tables = two_bus_system();
        let mut stray = crate::test_utils::line(7, 8, 1.0);
        stray.length_km = None;
        tables.lines.push(stray);
        let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
        assert_eq!(tool.floating_islands().len(), 1);
        assert!(matches!(tool.h_matrix(true), Err(GicError::Singular(_))));
    }

    #[test]
    fn bus_losses_book_on_loss_bus() {
        let tables = three_bus_system();
        let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
        let per_xf = vec![2.0; tables.transformers.len()];
        let by_bus = tool.bus_losses(&per_xf).unwrap();
        assert_eq!(by_bus.len(), tables.buses.len());
        let total: f64 = by_bus.iter().map(|(_, v)| v).sum();
        assert!((total - 2.0 * per_xf.len() as f64).abs() < 1e-12);
        for xfmr in &tables.transformers {
            let entry = by_bus
                .iter()
                .find(|(b, _)| b.value() == xfmr.loss_bus())
                .unwrap();
            assert!(entry.1 > 0.0);
        }
        assert!(matches!(
            tool.bus_losses(&[1.0]),
            Err(GicError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unknown_loss_bus_is_an_error() {
        let mut tables = three_bus_system();
        tables.transformers[0].from_bus = Some(999);
        let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
        assert!(matches!(tool.loss_selector(), Err(GicError::UnknownBus(999))));
    }

    #[test]
    fn corner_factory_uses_line_lengths() {
        let tables = three_bus_system();
        let tool = GicTool::new(&tables, &GicConfig::default()).unwrap();
        let corners = tool.corner_factory().unwrap();
        assert_eq!(corners.n_lines(), tool.line_records().len());
        let expected: Vec<f64> = tool
            .line_records()
            .iter()
            .map(|l| l.length_km.map(|k| k.value()).unwrap_or(0.0))
            .collect();
        assert_eq!(corners.lengths(), expected.as_slice());
    }
}
