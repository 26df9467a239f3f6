use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.adpace/config.toml`, creating it with defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_in(&home.join(".adpace"))
    }

    /// Same as [`Config::load_or_init`] rooted at `dir`.
    pub fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join("config.toml");

        if !dir.exists() {
            fs::create_dir_all(dir).context("Failed to create .adpace directory")?;
        }

        let mut config = if config_path.exists() {
            let mut config = Self::from_file(&config_path)?;
            config.config_path.clone_from(&config_path);
            config
        } else {
            let config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub(super) fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
