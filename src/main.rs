use anyhow::Result;
use clap::Parser;

use glossgen::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            sources,
            out_dir,
            no_tuning,
        } => cli::build::run(&sources, out_dir.as_deref(), no_tuning),
        Commands::Check { sources } => cli::check::run(&sources),
        Commands::Overrides {
            overrides,
            no_builtin,
        } => cli::overrides::run(overrides.as_deref(), no_builtin),
    }
}
