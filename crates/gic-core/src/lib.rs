//! # gic-core: GIC Network Modeling Core
//!
//! Provides the vocabulary shared by every stage of a geomagnetically induced
//! current (GIC) study: typed ids, the signed node identity space, raw table
//! records, unit newtypes, and the dense linear-algebra backends.
//!
//! ## Node Identity
//!
//! The GIC network mixes two kinds of nodes in one index space:
//! - **Buses** carry positive signed ids (`+n`)
//! - **Substations** (grounding points) carry negative signed ids (`-n`)
//!
//! [`NodeId`] orders substations before buses, and within each kind by
//! ascending number, which is exactly the dense matrix ordering used by the
//! incidence and Laplacian assembly.
//!
//! ```
//! use gic_core::{BusId, NodeId, SubstationId};
//!
//! let sub = NodeId::Substation(SubstationId::new(3));
//! let bus = NodeId::Bus(BusId::new(1));
//! assert_eq!(sub.signed(), -3);
//! assert_eq!(bus.signed(), 1);
//! assert!(sub < bus);
//! assert_eq!(NodeId::from_signed(-3), Some(sub));
//! ```
//!
//! ## Modules
//!
//! - [`records`] - Raw transformer/line/substation/bus/step-up tables
//! - [`diagnostics`] - Input validation and issue reporting
//! - [`graph_utils`] - Island detection over branch endpoints
//! - [`solver`] - Dense inverse/solve backends (Gauss, faer)
//! - [`units`] - Unit-safe newtypes

use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod records;
pub mod solver;
pub mod units;

pub use diagnostics::{validate_tables, DiagnosticIssue, Diagnostics, Severity};
pub use error::{GicError, GicResult};
pub use graph_utils::{find_islands, floating_islands, IslandAnalysis, IslandSummary};
pub use records::{
    BusRecord, GenStepUpRecord, GicTables, LineRecord, SubstationRecord, TransformerRecord,
    WiringType,
};
pub use solver::*;
pub use units::{Degrees, Kilometers, Kilovolts, MegavoltAmperes, Ohms, Siemens};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstationId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerId(usize);

impl BusId {
    #[inline]
    pub fn new(value: usize) -> Self {
        BusId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl SubstationId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SubstationId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl TransformerId {
    #[inline]
    pub fn new(value: usize) -> Self {
        TransformerId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

/// A node of the GIC conductance network.
///
/// Variant order matters: the derived `Ord` puts every substation ahead of
/// every bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Substation(SubstationId),
    Bus(BusId),
}

impl NodeId {
    pub fn bus(number: usize) -> Self {
        NodeId::Bus(BusId::new(number))
    }

    pub fn substation(number: usize) -> Self {
        NodeId::Substation(SubstationId::new(number))
    }

    /// Signed identity: buses positive, substations negative.
    pub fn signed(&self) -> i64 {
        match self {
            NodeId::Bus(id) => id.value() as i64,
            NodeId::Substation(id) => -(id.value() as i64),
        }
    }

    /// Inverse of [`NodeId::signed`]. Zero is not a valid node.
    pub fn from_signed(value: i64) -> Option<Self> {
        match value {
            0 => None,
            v if v > 0 => Some(NodeId::bus(v as usize)),
            v => Some(NodeId::substation(v.unsigned_abs() as usize)),
        }
    }

    pub fn is_substation(&self) -> bool {
        matches!(self, NodeId::Substation(_))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Bus(id) => write!(f, "Bus {}", id.value()),
            NodeId::Substation(id) => write!(f, "Substation {}", id.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substations_sort_before_buses() {
        let mut nodes = vec![
            NodeId::bus(2),
            NodeId::substation(5),
            NodeId::bus(1),
            NodeId::substation(1),
        ];
        nodes.sort();
        let signed: Vec<i64> = nodes.iter().map(NodeId::signed).collect();
        assert_eq!(signed, vec![-1, -5, 1, 2]);
    }

    #[test]
    fn signed_round_trip_rejects_zero() {
        assert_eq!(NodeId::from_signed(0), None);
        assert_eq!(NodeId::from_signed(7), Some(NodeId::bus(7)));
        assert!(NodeId::from_signed(-7).unwrap().is_substation());
    }
}
