use anyhow::Result;
use gic_algo::{io, GicConfig};
use std::path::Path;
use tracing::info;

use super::{line_labels, load_tool, print_table, transformer_labels};

pub fn handle(dir: &Path, config: &GicConfig, full: bool, out: Option<&Path>) -> Result<()> {
    let tool = load_tool(dir, config)?;
    let h = tool.h_matrix(!full)?;
    let rows = transformer_labels(&tool);

    let columns: Vec<String> = if full {
        tool.topology()
            .branches
            .branches()
            .iter()
            .enumerate()
            .map(|(b, branch)| format!("{:?}{}:{}-{}", branch.kind, b, branch.from, branch.to))
            .collect()
    } else {
        line_labels(&tool)
    };

    info!(
        transformers = h.nrows(),
        columns = h.ncols(),
        "Computed H-matrix"
    );

    match out {
        Some(path) => {
            io::write_matrix_csv(path, h.as_ref(), &columns, Some(&rows))?;
            println!("Wrote {}x{} H-matrix to {}", h.nrows(), h.ncols(), path.display());
        }
        None => {
            let lines: Vec<String> = (0..h.nrows())
                .map(|x| {
                    let values: Vec<String> =
                        (0..h.ncols()).map(|c| format!("{:.6e}", h.read(x, c))).collect();
                    format!("{}\t{}", rows[x], values.join("\t"))
                })
                .collect();
            print_table(&format!("Transformer\t{}", columns.join("\t")), &lines)?;
        }
    }
    Ok(())
}
