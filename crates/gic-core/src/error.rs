//! Unified error type for GIC analysis
//!
//! Library code returns [`GicResult`]. Data-contract violations (bad wiring
//! strings, missing grounding) and numerical failures (singular Laplacian)
//! are surfaced as-is; nothing here retries or regularizes.
//!
//! # Example
//!
//! ```ignore
//! use gic_core::{GicError, GicResult};
//!
//! fn analyse(dir: &Path) -> GicResult<()> {
//!     let tables = load_tables(dir)?;
//!     let tool = GicTool::new(&tables, &GicConfig::default())?;
//!     let _h = tool.h_matrix(true)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all GIC operations.
#[derive(Error, Debug)]
pub enum GicError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Winding configuration string that has no modeling rule
    #[error("Wiring configuration '{0}' is not implemented")]
    UnsupportedWiring(String),

    /// A branch references a substation with no grounding record
    #[error("Substation {0} has no grounding resistance record")]
    MissingGrounding(usize),

    /// Grounding resistance must be finite and positive
    #[error("Substation {0} has invalid grounding resistance {1} ohm")]
    InvalidGrounding(usize, f64),

    /// A bus number that is not in the bus table
    #[error("Unknown bus: {0}")]
    UnknownBus(usize),

    /// Linear-algebra failure (singular or non-finite inverse)
    #[error("Singular matrix: {0}")]
    Singular(String),

    /// Operand shapes do not agree
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Too many equivalence groups to enumerate corners. The limit is the
    /// `max_corner_groups` setting; corner storage grows as 2^groups.
    #[error(
        "{groups} equivalence groups exceed the corner limit of {max} \
         (max_corner_groups bounds memory at 2^groups corners; raise it to enumerate anyway)"
    )]
    CornerSpaceTooLarge { groups: usize, max: usize },

    /// Tessellation tile width must be finite and positive
    #[error("Invalid tile width: {0}")]
    InvalidTileWidth(f64),

    /// Tile width too small for the line extent
    #[error("tile width {width} needs {tiles:.0} tiles, above the max_tiles limit of {max}")]
    TileGridTooLarge { width: f64, tiles: f64, max: usize },

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GicError.
pub type GicResult<T> = Result<T, GicError>;

impl From<anyhow::Error> for GicError {
    fn from(err: anyhow::Error) -> Self {
        GicError::Other(err.to_string())
    }
}

impl From<String> for GicError {
    fn from(s: String) -> Self {
        GicError::Other(s)
    }
}

impl From<&str> for GicError {
    fn from(s: &str) -> Self {
        GicError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GicError {
    fn from(err: serde_json::Error) -> Self {
        GicError::Parse(err.to_string())
    }
}
