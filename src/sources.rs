use anyhow::Result;

use crate::config::Config;
use crate::traits::SourceRegistry;

pub fn list_sources(config: &Config) -> Result<()> {
    let registry = SourceRegistry::from_config(config);
    if registry.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!("{:<16} {:<8} {:<10} DESCRIPTION", "SOURCE", "KIND", "STATUS");
    for source in registry.sources() {
        let status = match config.sources.get(source.id()) {
            Some(cfg) if !cfg.path.exists() => "MISSING",
            _ => "OK",
        };
        println!(
            "{:<16} {:<8} {:<10} {}",
            source.id(),
            source.kind(),
            status,
            source.description()
        );
    }

    Ok(())
}
