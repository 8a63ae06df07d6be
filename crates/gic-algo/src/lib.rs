//! # gic-algo: Geomagnetically Induced Current Analysis
//!
//! Builds the DC equivalent network of a transmission system under a uniform
//! geoelectric field, computes the linear map from per-line induced voltage to
//! per-transformer effective GIC, and searches field polarities for the
//! orientations that maximize total transformer GIC.
//!
//! ## Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Topology | [`Topology::build`] | Branches, LV/HV selectors |
//! | Network | [`ConductanceNetwork::assemble`] | A, 3G, grounded Laplacian |
//! | Sensitivity | [`GicTool::h_matrix`] | H (transformers × branches or lines) |
//! | Tiling | [`GicTool::tessellations`] | Per-tile Hx, Hy |
//! | Corners | [`GicCorners::topology`] | Non-dominated polarity corners |
//! | Greedy | [`GicCorners::greedy_search`] | Local maxima per seed |
//!
//! ## Example
//!
//! ```ignore
//! use gic_algo::{GicConfig, GicTool};
//!
//! let tables = gic_algo::io::load_tables("cases/texas".as_ref())?;
//! let tool = GicTool::new(&tables, &GicConfig::default())?;
//!
//! let h = tool.h_matrix(true)?;
//! let mut corners = tool.corner_factory()?;
//! let worst = corners.topology(true, true)?;
//! println!("{} corners, best NET {:?}", worst.len(), worst.net_losses().first());
//! ```
//!
//! ## Features
//!
//! - `desktop` (default): enables `rayon` (parallel greedy seeds) and `csv`
//!   (table loading in [`io`])
//! - `wasm`: matrix assembly and corner search only

pub mod config;
pub mod gic;
#[cfg(feature = "csv")]
pub mod io;
pub mod sparse;
pub mod test_utils;

pub use config::{GicConfig, GreedyConfig, DEFAULT_ACCEPT_TIES};
pub use gic::{
    CornerTopology, GicCorners, GicTool, GreedyOutcome, GreedyStep, LineSegment, Tessellation,
    TileGrid, Topology,
};
pub use sparse::{ConductanceNetwork, GicSensitivity, NodeIndexMap};
