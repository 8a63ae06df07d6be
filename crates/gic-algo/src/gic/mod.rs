//! # GIC Analysis
//!
//! The analysis pipeline, from raw tables to worst-case field orientations:
//!
//! 1. [`topology`]: parse transformers, emit winding/step-up/line branches and
//!    the LV/HV selector triplets
//! 2. [`crate::sparse`]: incidence, grounded Laplacian, H-matrix
//! 3. [`tessellation`]: split line sensitivities into per-tile x/y parts
//! 4. [`corners`]: equivalence groups, polarity corners, dominance filtering
//! 5. [`greedy`]: seeded local search over group polarities
//!
//! [`GicTool`] ties the stages together for one snapshot of tables.

pub mod corners;
pub mod greedy;
pub mod memo;
pub mod tessellation;
pub mod tool;
pub mod topology;

pub use corners::{CornerTopology, GicCorners};
pub use greedy::{find_local_max, find_local_max_hist, GreedyOutcome, GreedyStep, LocalMaxHistory};
pub use memo::Memo;
pub use tessellation::{tessellate, LineSegment, Tessellation, TileGrid};
pub use tool::GicTool;
pub use topology::{Branch, BranchKind, BranchSet, ParsedTransformer, Topology, Winding};
