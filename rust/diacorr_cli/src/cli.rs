use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit logs as bunyan-formatted JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build pseudo MS2 spectra for a feature list.
    Run(RunArgs),
    /// Write a configuration file with default parameters.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the raw data file as JSON (will over-write the config file)
    #[arg(short, long)]
    pub raw_file: Option<PathBuf>,

    /// Path to the feature list as JSON (will over-write the config file)
    #[arg(short, long)]
    pub feature_list: Option<PathBuf>,

    /// Path to the output directory (will over-write the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct WriteTemplateArgs {
    /// Where to write the template
    #[arg(short, long, default_value = "diacorr_config.json")]
    pub output_path: PathBuf,
}
