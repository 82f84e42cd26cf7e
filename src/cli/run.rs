use anyhow::{Context, Result};
use console::style;

use glossgen_core::{
    BuildOutput, Classification, Fetcher, GlossgenConfig, LegacyGraph, LegacyReader, SourceLocation,
    SourceRecord,
};

use super::SourceArgs;

/// Config file (or defaults), then environment, then flags.
pub fn load_config(args: &SourceArgs) -> Result<GlossgenConfig> {
    let mut config = match &args.config {
        Some(path) => GlossgenConfig::from_path(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => GlossgenConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(path) = &args.overrides {
        config.overrides = Some(path.clone());
    }
    if let Some(xml) = &args.xml {
        config.xml_source.clone_from(xml);
    }
    if let Some(legacy) = &args.legacy {
        config.legacy_source.clone_from(legacy);
    }
    if args.no_context {
        config.include_context = false;
    }

    Ok(config)
}

struct Inputs {
    records: Vec<SourceRecord>,
    legacy: glossgen_core::Result<LegacyGraph>,
}

async fn fetch_inputs(config: &GlossgenConfig) -> Result<Inputs> {
    let fetcher = Fetcher::new(&config.fetch)?;
    let xml_source = SourceLocation::parse(&config.xml_source)
        .with_context(|| format!("invalid concept scheme source '{}'", config.xml_source))?;

    let legacy = async {
        let source = SourceLocation::parse(&config.legacy_source)?;
        let text = fetcher.fetch_text(&source).await?;
        let graph = LegacyReader::new(config.namespaces.clone())?.read(&text)?;
        Ok::<_, glossgen_core::Error>(graph)
    };

    let (xml, legacy) = tokio::join!(fetcher.fetch_text(&xml_source), legacy);

    let xml = xml.with_context(|| format!("failed to load concept scheme from {xml_source}"))?;
    let records = config
        .sdmx_reader()
        .read(&xml)
        .with_context(|| format!("failed to parse concept scheme from {xml_source}"))?;

    Ok(Inputs { records, legacy })
}

/// Loads both sources and runs the pipeline. Only the concept scheme and
/// the override tables are required; a missing legacy graph degrades the
/// run instead of failing it.
pub fn build_glossary(config: &GlossgenConfig) -> Result<BuildOutput> {
    let builder = config
        .glossary_builder()
        .context("invalid override configuration")?;

    let runtime = tokio::runtime::Runtime::new()?;
    let inputs = runtime.block_on(fetch_inputs(config))?;

    if let Err(e) = &inputs.legacy {
        tracing::warn!("Legacy graph unavailable: {}", e);
    }

    Ok(builder.build(inputs.records, inputs.legacy))
}

pub fn print_summary(output: &BuildOutput) {
    eprintln!(
        "{} {} concepts, {} relations",
        style("●").green(),
        style(output.store.len()).bold(),
        output.relation_count()
    );
    eprintln!(
        "  Broader: {} ({} top concepts)",
        output.resolution.decisions.len(),
        output.top_concepts.len()
    );

    let matching = &output.matching;
    if matching.reconciled {
        eprintln!(
            "  Legacy: {} exact, {} close, {} mismatched, {} unmatched",
            matching.count(Classification::Exact),
            matching.count(Classification::Close),
            matching.count(Classification::Mismatch),
            matching.count(Classification::None)
        );
    } else {
        eprintln!(
            "  Legacy: {}",
            style("unavailable, running without reconciliation").yellow()
        );
    }

    eprintln!("  Codelists: {}", output.codelists.len());

    let warnings = output.diagnostics.warning_count();
    if warnings == 0 {
        eprintln!("  Diagnostics: {}", style("none").dim());
    } else {
        eprintln!("  Diagnostics: {}", style(format!("{warnings} warnings")).yellow());
    }
}
