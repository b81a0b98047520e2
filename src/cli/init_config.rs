use super::config::{default_config_path, default_store_path, GateConfig};
use std::path::PathBuf;

/// Write a default configuration file
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(
    config_path: Option<String>,
    store_path: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let store_path = store_path
        .map(PathBuf::from)
        .unwrap_or_else(default_store_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file already exists: {} (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    GateConfig::create_default(&config_path, &store_path)?;

    println!("Created: {}", config_path.display());
    println!("Proposal store: {}", store_path.display());
    Ok(())
}
