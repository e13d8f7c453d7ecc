mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_bunyan_formatter::{
    BunyanFormattingLayer,
    JsonStorageLayer,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use cli::{
    Cli,
    Commands,
    RunArgs,
    WriteTemplateArgs,
};
use config::Config;
use errors::CliError;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn init_logging(json_logs: bool) {
    // This uses RUST_LOG environment variable
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let res = if json_logs {
        let formatting_layer = BunyanFormattingLayer::new("diacorr".into(), std::io::stderr);
        Registry::default()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(formatting_layer)
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = res {
        eprintln!("Unable to set up logging: {}", e);
    }
}

fn main_run(args: RunArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config)?.with_cli_args(&args);
    info!("Parsed configuration: {:#?}", config);
    let resolved = config.resolve()?;
    let outcome = processing::process(resolved)?;
    info!(
        "Finished with status {:?}: {} pseudo spectra",
        outcome.status, outcome.pseudo_spectra
    );
    Ok(())
}

fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let template = serde_json::to_string_pretty(&Config::template()).map_err(|e| {
        CliError::Config {
            source: e.to_string(),
        }
    })?;
    std::fs::write(&args.output_path, template).map_err(|e| CliError::io(e, &args.output_path))?;
    println!(
        "Wrote config template to {}\nuse as `diacorr run --config {}`",
        args.output_path.display(),
        args.output_path.display()
    );
    Ok(())
}

fn main() -> std::result::Result<(), CliError> {
    let args = Cli::parse();
    init_logging(args.json_logs);

    match args.command {
        Commands::Run(run_args) => main_run(run_args),
        Commands::WriteTemplate(template_args) => main_write_template(template_args),
    }
}
