use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use console::style;

use glossgen_core::emit::{write_outputs, EmitOptions};

use super::run::{build_glossary, load_config, print_summary};
use super::SourceArgs;

pub fn run(sources: &SourceArgs, out_dir: Option<&Path>, no_tuning: bool) -> Result<()> {
    let mut config = load_config(sources)?;
    if let Some(dir) = out_dir {
        config.out_dir = dir.to_path_buf();
    }
    if no_tuning {
        config.tuning = false;
    }

    let output = build_glossary(&config)?;

    let options = EmitOptions {
        namespaces: &config.namespaces,
        scheme: &config.scheme,
        names: &config.outputs,
        issued: Local::now().date_naive(),
        tuning: config.tuning,
    };
    let written = write_outputs(&output, &config.out_dir, &options)
        .with_context(|| format!("failed to write outputs to {}", config.out_dir.display()))?;

    print_summary(&output);
    eprintln!();
    for path in &written {
        eprintln!("  {} {}", style("wrote").dim(), path.display());
    }
    if config.tuning {
        eprintln!(
            "  {} concepts listed for broader review",
            output.tuning.len()
        );
    }

    Ok(())
}
