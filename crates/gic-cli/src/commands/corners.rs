use anyhow::Result;
use gic_algo::{io, GicConfig};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::{load_tool, print_table, transformer_labels};
use gic_cli::OutputFormat;

#[derive(Serialize)]
struct CornerSummary {
    groups: usize,
    corners: usize,
    kept: Vec<KeptCorner>,
}

#[derive(Serialize)]
struct KeptCorner {
    corner: usize,
    net: f64,
}

pub fn handle(
    dir: &Path,
    config: &GicConfig,
    keep_dominated: bool,
    all_losses: bool,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let tool = load_tool(dir, config)?;
    let mut factory = tool.corner_factory()?;
    let n_groups = factory.groups().len();
    let n_corners = factory.corners()?.ncols();
    let topology = factory.topology(!keep_dominated, !all_losses)?;

    let mut kept: Vec<KeptCorner> = topology
        .corners
        .iter()
        .zip(topology.net_losses())
        .map(|(&corner, net)| KeptCorner { corner, net })
        .collect();
    kept.sort_by(|a, b| b.net.total_cmp(&a.net));
    info!(groups = n_groups, corners = n_corners, kept = kept.len(), "Corner search done");

    if let Some(path) = out {
        let labels: Vec<String> = topology.corners.iter().map(|c| format!("corner{c}")).collect();
        io::write_matrix_csv(path, topology.losses.as_ref(), &transformer_labels(&tool), Some(&labels))?;
    }

    match format {
        OutputFormat::Json => {
            let summary = CornerSummary {
                groups: n_groups,
                corners: n_corners,
                kept,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            println!("{n_groups} equivalence groups, {n_corners} corners, {} kept", kept.len());
            let rows: Vec<String> = kept
                .iter()
                .map(|k| format!("{}\t{:.6}", k.corner, k.net))
                .collect();
            print_table("Corner\tNet GIC", &rows)?;
        }
    }
    Ok(())
}
