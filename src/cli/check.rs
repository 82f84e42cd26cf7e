use anyhow::Result;
use console::style;

use super::run::{build_glossary, load_config, print_summary};
use super::SourceArgs;

pub fn run(sources: &SourceArgs) -> Result<()> {
    let config = load_config(sources)?;
    let output = build_glossary(&config)?;

    print_summary(&output);

    if !output.diagnostics.is_empty() {
        eprintln!();
    }
    for diagnostic in output.diagnostics.iter() {
        let marker = if diagnostic.kind.is_informational() {
            style("·").dim()
        } else {
            style("!").yellow()
        };
        match &diagnostic.concept_id {
            Some(id) => eprintln!(
                "  {marker} {} {}: {}",
                diagnostic.kind,
                style(id).bold(),
                diagnostic.message
            ),
            None => eprintln!("  {marker} {}: {}", diagnostic.kind, diagnostic.message),
        }
    }

    Ok(())
}
