use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend};
use crate::error::{GicError, GicResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Simple registry of available inverse backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Gauss,
    #[default]
    Faer,
}

impl FromStr for SolverKind {
    type Err = GicError;

    fn from_str(input: &str) -> GicResult<Self> {
        match input.to_ascii_lowercase().as_str() {
            "gauss" => Ok(SolverKind::Gauss),
            "faer" | "default" => Ok(SolverKind::Faer),
            other => Err(GicError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                other,
                SolverKind::available().join(", ")
            ))),
        }
    }
}

impl SolverKind {
    pub fn build_solver(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            SolverKind::Gauss => Arc::new(GaussSolver),
            SolverKind::Faer => Arc::new(FaerSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["gauss", "faer"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Gauss => "gauss",
            SolverKind::Faer => "faer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    #[test]
    fn solver_kind_parsing_supports_all_engines() {
        assert_eq!("gauss".parse::<SolverKind>().unwrap(), SolverKind::Gauss);
        assert_eq!("FAER".parse::<SolverKind>().unwrap(), SolverKind::Faer);
        assert!(matches!(
            "klu".parse::<SolverKind>(),
            Err(GicError::Config(_))
        ));
    }

    #[test]
    fn built_solvers_invert_diagonal_system() {
        let matrix = Mat::from_fn(2, 2, |i, j| if i == j { (i + 2) as f64 } else { 0.0 });
        for kind in [SolverKind::Gauss, SolverKind::Faer] {
            let inv = kind.build_solver().invert(matrix.as_ref()).unwrap();
            assert!((inv.read(0, 0) - 0.5).abs() < 1e-12, "{}", kind.as_str());
            assert!((inv.read(1, 1) - 1.0 / 3.0).abs() < 1e-12, "{}", kind.as_str());
        }
    }
}
