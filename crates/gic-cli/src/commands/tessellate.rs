use anyhow::Result;
use gic_algo::{io, GicConfig};
use std::path::Path;
use tracing::info;

use super::{load_tool, print_table, transformer_labels};

pub fn handle(dir: &Path, config: &GicConfig, tile_width: f64, out: Option<&Path>) -> Result<()> {
    let tool = load_tool(dir, config)?;
    let tess = tool.tessellations(tile_width)?;
    let grid = &tess.grid;
    info!(
        nx = grid.nx,
        ny = grid.ny,
        segments = tess.segments.len(),
        "Tessellated lines"
    );

    println!(
        "{} x {} tiles of {} degrees from ({:.4}, {:.4})",
        grid.nx, grid.ny, grid.width, grid.origin.0, grid.origin.1
    );

    if let Some(dir) = out {
        let tiles: Vec<String> = (0..grid.n_tiles())
            .map(|k| format!("tile{}_{}", k % grid.nx, k / grid.nx))
            .collect();
        let labels = transformer_labels(&tool);
        io::write_matrix_csv(&dir.join("hx.csv"), tess.hx.as_ref(), &tiles, Some(&labels))?;
        io::write_matrix_csv(&dir.join("hy.csv"), tess.hy.as_ref(), &tiles, Some(&labels))?;
        println!("Wrote hx.csv and hy.csv to {}", dir.display());
    }

    let rows: Vec<String> = tess
        .segments
        .iter()
        .map(|s| format!("{}\t({}, {})\t{:.4}", s.line, s.tile.0, s.tile.1, s.fraction))
        .collect();
    print_table("Line\tTile\tFraction", &rows)
}
