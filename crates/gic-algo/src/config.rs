//! Analysis configuration.
//!
//! Every field has a serde default so a partial TOML file (or none at all)
//! yields a usable configuration.
//!
//! ```toml
//! equivalence_tolerance = 1e-10
//! max_corner_groups = 12
//! max_tiles = 250000
//! solver = "gauss"
//!
//! [greedy]
//! accept_ties = false
//! max_steps = 5000
//! ```

use gic_core::{GicError, GicResult, SolverKind};
use serde::{Deserialize, Serialize};

/// Termination rule of the greedy local search: `false` requires a strict
/// increase in total loss for every move, `true` also takes equal-loss moves
/// into polarity states not visited before.
pub const DEFAULT_ACCEPT_TIES: bool = false;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GicConfig {
    /// |H| below this counts as zero when taking signs
    #[serde(default = "default_sign_zero_tolerance")]
    pub sign_zero_tolerance: f64,
    /// Tolerance for column equality and zero-column tests
    #[serde(default = "default_equivalence_tolerance")]
    pub equivalence_tolerance: f64,
    /// Largest number of equivalence groups whose 2^n polarity
    /// combinations will be enumerated. A memory guard: the corner matrix
    /// holds 2^n columns per transformer row.
    #[serde(default = "default_max_corner_groups")]
    pub max_corner_groups: usize,
    /// Percentile applied by the top-losses corner filter
    #[serde(default = "default_top_loss_percentile")]
    pub top_loss_percentile: f64,
    /// Largest tile grid a tessellation may allocate
    #[serde(default = "default_max_tiles")]
    pub max_tiles: usize,
    /// System base for converting per-unit line resistance to ohms
    #[serde(default = "default_system_mva_base")]
    pub system_mva_base: f64,
    /// Dense inverse backend for the grounded Laplacian
    #[serde(default)]
    pub solver: SolverKind,
    #[serde(default)]
    pub greedy: GreedyConfig,
}

impl Default for GicConfig {
    fn default() -> Self {
        Self {
            sign_zero_tolerance: default_sign_zero_tolerance(),
            equivalence_tolerance: default_equivalence_tolerance(),
            max_corner_groups: default_max_corner_groups(),
            top_loss_percentile: default_top_loss_percentile(),
            max_tiles: default_max_tiles(),
            system_mva_base: default_system_mva_base(),
            solver: SolverKind::default(),
            greedy: GreedyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreedyConfig {
    #[serde(default = "default_accept_ties")]
    pub accept_ties: bool,
    /// Hard cap on moves per seed
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            accept_ties: default_accept_ties(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_sign_zero_tolerance() -> f64 {
    1e-15
}

fn default_equivalence_tolerance() -> f64 {
    1e-10
}

fn default_max_corner_groups() -> usize {
    20
}

fn default_top_loss_percentile() -> f64 {
    90.0
}

fn default_max_tiles() -> usize {
    1_000_000
}

fn default_system_mva_base() -> f64 {
    100.0
}

fn default_accept_ties() -> bool {
    DEFAULT_ACCEPT_TIES
}

fn default_max_steps() -> usize {
    10_000
}

impl GicConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> GicResult<()> {
        if !(self.sign_zero_tolerance >= 0.0 && self.equivalence_tolerance >= 0.0) {
            return Err(GicError::Config("tolerances must be non-negative".into()));
        }
        if !(0.0..=100.0).contains(&self.top_loss_percentile) {
            return Err(GicError::Config(format!(
                "top_loss_percentile {} outside [0, 100]",
                self.top_loss_percentile
            )));
        }
        if !(self.system_mva_base > 0.0 && self.system_mva_base.is_finite()) {
            return Err(GicError::Config("system_mva_base must be positive".into()));
        }
        if self.max_tiles == 0 {
            return Err(GicError::Config("max_tiles must be positive".into()));
        }
        // 2^n columns must fit in usize
        if self.max_corner_groups >= usize::BITS as usize {
            return Err(GicError::Config(format!(
                "max_corner_groups must be below {}",
                usize::BITS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GicConfig = toml::from_str(
            r#"
            max_corner_groups = 8
            solver = "gauss"

            [greedy]
            accept_ties = true
            "#,
        )
        .unwrap();
        assert_eq!(config.max_corner_groups, 8);
        assert_eq!(config.solver, SolverKind::Gauss);
        assert!(config.greedy.accept_ties);
        assert_eq!(config.greedy.max_steps, 10_000);
        assert_eq!(config.sign_zero_tolerance, 1e-15);
        config.validate().unwrap();
    }

    #[test]
    fn memory_guards_default_to_roomy_limits() {
        let config = GicConfig::default();
        assert_eq!(config.max_corner_groups, 20);
        assert_eq!(config.max_tiles, 1_000_000);
        config.validate().unwrap();
    }

    #[test]
    fn default_termination_rule_is_strict() {
        assert!(!DEFAULT_ACCEPT_TIES);
        assert!(!GicConfig::default().greedy.accept_ties);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = GicConfig {
            top_loss_percentile: 120.0,
            ..GicConfig::default()
        };
        assert!(config.validate().is_err());
        config.top_loss_percentile = 90.0;
        config.max_corner_groups = 64;
        assert!(matches!(config.validate(), Err(GicError::Config(_))));
        config.max_corner_groups = 16;
        config.max_tiles = 0;
        assert!(matches!(config.validate(), Err(GicError::Config(_))));
    }
}
