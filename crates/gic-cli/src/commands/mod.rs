pub mod corners;
pub mod greedy;
pub mod hmat;
pub mod tessellate;
pub mod validate;

use anyhow::{Context, Result};
use gic_algo::{io, GicConfig, GicTool};
use std::io::Write;
use std::path::Path;
use tabwriter::TabWriter;
use tracing::info;

/// Load the tables under `dir` and assemble the network.
pub(crate) fn load_tool(dir: &Path, config: &GicConfig) -> Result<GicTool> {
    info!("Loading GIC tables from {}", dir.display());
    let tables = io::load_tables(dir)?;
    GicTool::new(&tables, config)
        .with_context(|| format!("building GIC network from '{}'", dir.display()))
}

/// Print tab-separated rows as an aligned table.
pub(crate) fn print_table(header: &str, rows: &[String]) -> Result<()> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "{header}")?;
    for row in rows {
        writeln!(writer, "{row}")?;
    }
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    print!("{table}");
    Ok(())
}

/// Transformer labels in H row order: the record name, else `T<index>`.
pub(crate) fn transformer_labels(tool: &GicTool) -> Vec<String> {
    tool.topology()
        .transformers
        .iter()
        .map(|x| x.name.clone().unwrap_or_else(|| format!("T{}", x.id.value())))
        .collect()
}

/// Line labels in H column order.
pub(crate) fn line_labels(tool: &GicTool) -> Vec<String> {
    tool.line_records()
        .iter()
        .map(|l| match &l.circuit {
            Some(ckt) => format!("{}-{}/{}", l.from_bus, l.to_bus, ckt),
            None => format!("{}-{}", l.from_bus, l.to_bus),
        })
        .collect()
}
