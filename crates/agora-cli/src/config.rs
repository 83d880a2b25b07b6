//! Configuration file handling.

use std::path::Path;

use agora_governance::DaoConfig;

/// TOML file round trip for [`DaoConfig`].
pub trait ConfigFile: Sized {
    /// Load configuration from file.
    /// Path is validated to prevent directory traversal attacks.
    fn from_file(path: &Path) -> anyhow::Result<Self>;

    /// Save configuration to file.
    fn to_file(&self, path: &Path) -> anyhow::Result<()>;
}

fn check_path(path: &Path) -> anyhow::Result<()> {
    if path.to_string_lossy().contains("..") {
        anyhow::bail!("Invalid path: directory traversal detected");
    }
    Ok(())
}

impl ConfigFile for DaoConfig {
    fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: DaoConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        check_path(path)?;

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }
}

/// Load and validate, or fall back to defaults when no path is given.
pub fn load(path: Option<&Path>) -> anyhow::Result<DaoConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            DaoConfig::from_file(path)?
        }
        None => {
            tracing::info!("Using default configuration");
            DaoConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DaoConfig::default();
        config.governance.voting_period = 42;
        config.to_file(file.path()).unwrap();

        let loaded = DaoConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&DaoConfig::default()).unwrap();
        assert!(toml_str.contains("[governance]"));
        assert!(toml_str.contains("transaction_fee_bps = 50"));
        assert!(toml_str.contains("max_supply = \"1000000000\""));
    }

    #[test]
    fn test_partial_genesis() {
        let mut file = NamedTempFile::new().unwrap();
        let defaults = toml::to_string_pretty(&DaoConfig::default()).unwrap();
        // keep everything before the genesis section, then a bare admin
        let head = defaults.split("[genesis]").next().unwrap();
        write!(
            file,
            "{head}[genesis]\nadmin = \"0x0202020202020202020202020202020202020202\"\n"
        )
        .unwrap();

        let config = DaoConfig::from_file(file.path()).unwrap();
        assert!(config.genesis.roles.is_empty());
        assert!(config.genesis.token_allocations.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_traversal() {
        let err = DaoConfig::from_file(Path::new("../agora.toml")).unwrap_err();
        assert!(err.to_string().contains("traversal"));
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = DaoConfig::default();
        config.treasury.transaction_fee_bps = 500;
        config.to_file(file.path()).unwrap();
        assert!(load(Some(file.path())).is_err());
    }
}
