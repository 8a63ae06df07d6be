use anyhow::Result;
use gic_algo::{io, GicConfig};
use serde::Serialize;
use std::path::Path;

use super::{line_labels, load_tool, print_table};
use gic_cli::OutputFormat;

#[derive(Serialize)]
struct SeedResult {
    seed: usize,
    loss: f64,
    steps: usize,
}

pub fn handle(
    dir: &Path,
    config: &GicConfig,
    verbose: bool,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let tool = load_tool(dir, config)?;
    let mut factory = tool.corner_factory()?;
    let outcome = factory.greedy_search(verbose)?;

    if let Some(path) = out {
        let seeds: Vec<String> = (0..outcome.seeds.len()).map(|s| format!("seed{s}")).collect();
        io::write_matrix_csv(path, outcome.polarities.as_ref(), &seeds, Some(&line_labels(&tool)))?;
    }

    let results: Vec<SeedResult> = outcome
        .losses
        .iter()
        .zip(&outcome.steps)
        .enumerate()
        .map(|(seed, (&loss, &steps))| SeedResult { seed, loss, steps })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Table => {
            let rows: Vec<String> = results
                .iter()
                .map(|r| format!("{}\t{:.6}\t{}", r.seed, r.loss, r.steps))
                .collect();
            print_table("Seed\tLoss\tSteps", &rows)?;
            if let Some((seed, loss)) = outcome.best() {
                println!("Best: seed {seed} with loss {loss:.6}");
            }
        }
    }
    Ok(())
}
