use std::path::Path;

use anyhow::{Context, Result};

use glossgen_core::{FixRegistry, GlossgenConfig};

/// Prints the merged override tables after validating them.
pub fn run(overrides: Option<&Path>, no_builtin: bool) -> Result<()> {
    let config = GlossgenConfig {
        overrides: overrides.map(Path::to_path_buf),
        builtin_overrides: !no_builtin,
        ..GlossgenConfig::default()
    };

    let tables = config
        .override_config()
        .context("failed to load override tables")?;
    let registry = FixRegistry::new(tables.clone(), config.normalizer())
        .context("invalid override tables")?;
    tracing::debug!(
        "{} label fixes, {} parent overrides",
        registry.label_fix_count(),
        registry.parent_override_count()
    );

    println!("{}", serde_json::to_string_pretty(&tables)?);
    Ok(())
}
