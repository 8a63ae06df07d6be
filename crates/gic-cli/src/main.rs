use clap::Parser;
use gic_cli::{load_config, Cli, Commands};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Validate {
            tables,
            category,
            format,
        } => commands::validate::handle(tables, category.as_deref(), *format),
        Commands::Hmat { tables, full, out } => {
            commands::hmat::handle(tables, &config, *full, out.as_deref())
        }
        Commands::Corners {
            tables,
            keep_dominated,
            all_losses,
            out,
            format,
        } => commands::corners::handle(
            tables,
            &config,
            *keep_dominated,
            *all_losses,
            out.as_deref(),
            *format,
        ),
        Commands::Greedy {
            tables,
            verbose,
            out,
            format,
        } => commands::greedy::handle(tables, &config, *verbose, out.as_deref(), *format),
        Commands::Tessellate {
            tables,
            tile_width,
            out,
        } => commands::tessellate::handle(tables, &config, *tile_width, out.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable with --format json
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    info!("gic {} starting", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
