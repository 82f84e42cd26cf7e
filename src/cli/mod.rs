pub mod build;
pub mod check;
pub mod overrides;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "glossgen",
    about = "Generate a SKOS model of the SDMX glossary and reconcile it with the 2009 vocabulary",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where inputs come from. Flags win over the config file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// JSON override tables merged over the built-in ones
    #[arg(long)]
    pub overrides: Option<PathBuf>,
    /// SDMX-ML concept scheme (URL or path)
    #[arg(long)]
    pub xml: Option<String>,
    /// Legacy Turtle vocabulary (URL or path)
    #[arg(long)]
    pub legacy: Option<String>,
    /// Drop CONTEXT annotations
    #[arg(long = "no-context")]
    pub no_context: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the glossary and write every output file
    Build {
        #[command(flatten)]
        sources: SourceArgs,
        /// Directory the outputs are written to
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<PathBuf>,
        /// Skip the broader review report
        #[arg(long = "no-tuning")]
        no_tuning: bool,
    },
    /// Run the pipeline and print a summary without writing anything
    Check {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Print the effective override tables as JSON
    Overrides {
        /// JSON override tables merged over the built-in ones
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Leave out the built-in SDMX tables
        #[arg(long = "no-builtin")]
        no_builtin: bool,
    },
}
