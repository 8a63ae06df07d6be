use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gic", author, version, about = "Geomagnetically induced current analysis", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Analysis configuration (TOML); defaults apply when omitted
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a table directory for problems before analysis
    Validate {
        /// Directory holding the CSV tables
        #[arg(value_hint = ValueHint::DirPath)]
        tables: PathBuf,
        /// Only show issues in this category (wiring, grounding, physical,
        /// structure, geometry); the exit status still covers every issue
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Compute the transformer GIC sensitivity matrix
    Hmat {
        #[arg(value_hint = ValueHint::DirPath)]
        tables: PathBuf,
        /// Keep every branch column instead of lines only
        #[arg(long)]
        full: bool,
        /// Write the matrix as CSV
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Enumerate worst-case polarity corners
    Corners {
        #[arg(value_hint = ValueHint::DirPath)]
        tables: PathBuf,
        /// Keep corners dominated by another corner
        #[arg(long)]
        keep_dominated: bool,
        /// Keep corners below the top-loss percentile
        #[arg(long)]
        all_losses: bool,
        /// Write per-corner transformer GIC as CSV
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Greedy local search from every distinct transformer sign pattern
    Greedy {
        #[arg(value_hint = ValueHint::DirPath)]
        tables: PathBuf,
        /// Log every local maximum
        #[arg(short, long)]
        verbose: bool,
        /// Write the polarity matrix (lines × seeds) as CSV
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Split line sensitivities over a geographic tile grid
    Tessellate {
        #[arg(value_hint = ValueHint::DirPath)]
        tables: PathBuf,
        /// Tile edge in degrees
        #[arg(long, default_value_t = 0.5)]
        tile_width: f64,
        /// Directory for hx.csv and hy.csv
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
}

/// Output format for command summaries.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table
    #[default]
    Table,
    /// JSON object (pipe-friendly)
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn parses_validate_category() {
        let cli = Cli::try_parse_from(["gic", "validate", "tables", "--category", "wiring"]).unwrap();
        match cli.command {
            Commands::Validate { category, .. } => assert_eq!(category.as_deref(), Some("wiring")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_corner_flags() {
        let cli = Cli::try_parse_from([
            "gic",
            "--config",
            "gic.toml",
            "corners",
            "tables",
            "--keep-dominated",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gic.toml")));
        match cli.command {
            Commands::Corners {
                keep_dominated,
                all_losses,
                format,
                ..
            } => {
                assert!(keep_dominated);
                assert!(!all_losses);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
