use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::ConfigCommand;

const CONFIG_FILE_BASENAMES: &[&str] = &["config.yaml", "config.toml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VlttngConfig {
    #[serde(default)]
    pub profiles: ProfileConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Extra directories searched for `<name>.yml` profiles.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub hide_export: bool,
}

fn default_jobs() -> usize {
    1
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            hide_export: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_config_dir: PathBuf,
    pub profiles_dir: PathBuf,
}

impl ConfigPaths {
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.user_config_dir).with_context(|| {
            format!(
                "failed to create user config dir at {:?}",
                self.user_config_dir
            )
        })?;
        fs::create_dir_all(&self.profiles_dir)
            .with_context(|| format!("failed to create profiles dir at {:?}", self.profiles_dir))?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    paths: ConfigPaths,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("org", "lttng", "vlttng")
            .context("unable to resolve project directories")?;
        Ok(Self::with_config_dir(project_dirs.config_dir()))
    }

    pub fn with_config_dir(base_config: &Path) -> Self {
        let paths = ConfigPaths {
            user_config_dir: base_config.to_path_buf(),
            profiles_dir: base_config.join("profiles"),
        };
        Self { paths }
    }

    pub fn load(&self) -> Result<VlttngConfig> {
        self.paths.ensure()?;
        let path = self.config_path();
        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file at {:?}", path))?;
            let config: VlttngConfig =
                if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
                    toml::from_str(&contents).context("failed to parse TOML config")?
                } else {
                    serde_yaml::from_str(&contents).context("failed to parse YAML config")?
                };
            Ok(config)
        } else {
            let config = VlttngConfig::default();
            self.save(&config)?;
            Ok(config)
        }
    }

    pub fn save(&self, config: &VlttngConfig) -> Result<()> {
        self.paths.ensure()?;
        let path = self.config_path();
        let encoded = if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            toml::to_string_pretty(config).context("failed to serialize config to TOML")?
        } else {
            serde_yaml::to_string(config).context("failed to serialize config to YAML")?
        };
        let mut file = fs::File::create(&path)
            .with_context(|| format!("failed to open config file at {:?}", path))?;
        file.write_all(encoded.as_bytes())
            .with_context(|| format!("failed to write config file at {:?}", path))?;
        Ok(())
    }

    pub fn reset(&self) -> Result<VlttngConfig> {
        let config = VlttngConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// The first existing of `config.yaml` and `config.toml`, defaulting to
    /// `config.yaml`.
    pub fn config_path(&self) -> PathBuf {
        CONFIG_FILE_BASENAMES
            .iter()
            .map(|name| self.paths.user_config_dir.join(name))
            .find(|path| path.is_file())
            .unwrap_or_else(|| self.paths.user_config_dir.join(CONFIG_FILE_BASENAMES[0]))
    }

    /// Profile directories in lookup order: user, then configured. Bundled
    /// profiles are searched after these.
    pub fn profile_dirs(&self, config: &VlttngConfig) -> Vec<PathBuf> {
        let mut dirs = vec![self.paths.profiles_dir.clone()];
        dirs.extend(config.profiles.search_paths.iter().cloned());
        dirs
    }
}

pub fn handle_config(
    command: ConfigCommand,
    manager: &ConfigManager,
    config: &mut VlttngConfig,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            println!(
                "{}",
                serde_yaml::to_string(config).context("failed to serialize config for display")?
            );
        }
        ConfigCommand::Paths => {
            println!("config: {:?}", manager.config_path());
            for dir in manager.profile_dirs(config) {
                println!("profiles: {:?}", dir);
            }
            println!("profiles: (bundled)");
        }
        ConfigCommand::Reset => {
            *config = manager.reset()?;
            println!("configuration reset to defaults");
        }
    }
    Ok(())
}
