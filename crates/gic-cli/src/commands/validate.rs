use anyhow::{bail, Result};
use gic_algo::io;
use gic_core::{validate_tables, DiagnosticIssue, Severity};
use std::path::Path;
use tracing::info;

use super::print_table;
use gic_cli::OutputFormat;

pub fn handle(dir: &Path, category: Option<&str>, format: OutputFormat) -> Result<()> {
    info!("Validating GIC tables in {}", dir.display());
    let tables = io::load_tables(dir)?;
    let diagnostics = validate_tables(&tables);
    let shown = match category {
        Some(category) => diagnostics.only_category(category),
        None => diagnostics.clone(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Table => {
            let rows: Vec<String> = shown.issues.iter().map(issue_row).collect();
            if !rows.is_empty() {
                print_table("Severity\tCategory\tEntity\tMessage", &rows)?;
            }
            println!("{}", shown.summary());
        }
    }

    if diagnostics.has_errors() {
        bail!("validation failed: {}", diagnostics.summary());
    }
    Ok(())
}

fn issue_row(issue: &DiagnosticIssue) -> String {
    let severity = match issue.severity {
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    format!(
        "{}\t{}\t{}\t{}",
        severity,
        issue.category,
        issue.entity.as_deref().unwrap_or("-"),
        issue.message
    )
}
