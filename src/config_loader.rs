use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    info!(
        "Loaded network with {} nodes and {} links",
        config.network.nodes.len(),
        config.network.links.len()
    );

    Ok(config)
}

/// Write a configuration back out as YAML
pub fn write_config(config: &Config, output_path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(config).wrap_err("Failed to serialize configuration")?;
    std::fs::write(output_path, yaml)
        .wrap_err_with(|| format!("Failed to write configuration to '{}'", output_path.display()))?;

    info!("Configuration written to: {:?}", output_path);
    Ok(())
}
