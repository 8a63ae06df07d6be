//! # Sparse Matrix Infrastructure for GIC Analysis
//!
//! A GIC network has one row per winding, step-up, and line branch and one
//! column per bus or substation. The incidence matrix and the pre-grounding
//! Laplacian stay sparse; only the grounded Laplacian is densified for the
//! inverse.
//!
//! ## Module Organization
//!
//! - [`incidence`]: node ordering, incidence matrix A, conductance Laplacian L
//! - [`sensitivity`]: H-matrix from L⁻¹ and the transformer selectors
//!
//! ## Usage
//!
//! ```ignore
//! use gic_algo::sparse::{ConductanceNetwork, GicSensitivity};
//!
//! let topo = Topology::build(&tables, 100.0)?;
//! let net = ConductanceNetwork::assemble(&topo.branches, &tables.substations)?;
//! let h = GicSensitivity::compute_h(&topo, &net, &FaerSolver, true)?;
//! ```

pub mod incidence;
pub mod sensitivity;

pub use incidence::{ConductanceNetwork, NodeIndexMap};
pub use sensitivity::{GicSensitivity, SelectorMatrices, TransformerScaling};
