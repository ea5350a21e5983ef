//! Config file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bookfinder_core::PipelineConfig;
use serde::Deserialize;

const MIB: u64 = 1024 * 1024;

/// TOML-backed defaults. Every field is optional; CLI flags win.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Aggregator base URL.
    pub base_url: Option<String>,
    /// Article mirror base URL.
    pub article_mirror_url: Option<String>,
    /// Size cap in MiB.
    pub size_cap_mb: Option<u64>,
    /// Directory `fetch` writes into.
    pub output_dir: Option<PathBuf>,
    /// Send a HEAD size probe before each download.
    pub head_probe: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub search_timeout_secs: Option<u64>,
    pub mirror_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    /// Result sets kept in the cache.
    pub cache_capacity: Option<usize>,
    /// Results per display page.
    pub results_per_page: Option<usize>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(size_cap_mb) = self.size_cap_mb
            && !(1..=2048).contains(&size_cap_mb)
        {
            bail!("Invalid config value for `size_cap_mb`: {size_cap_mb}. Expected range: 1..=2048");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("search_timeout_secs", self.search_timeout_secs)?;
        validate_timeout_secs("mirror_timeout_secs", self.mirror_timeout_secs)?;
        validate_timeout_secs("download_timeout_secs", self.download_timeout_secs)?;
        validate_positive("cache_capacity", self.cache_capacity)?;
        validate_positive("results_per_page", self.results_per_page)?;
        Ok(())
    }

    /// Writes the fields that are set onto `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(article_mirror_url) = &self.article_mirror_url {
            config.article_mirror_url.clone_from(article_mirror_url);
        }
        if let Some(size_cap_mb) = self.size_cap_mb {
            config.size_cap_bytes = size_cap_mb * MIB;
        }
        if let Some(head_probe) = self.head_probe {
            config.head_probe = head_probe;
        }
        apply_secs(&mut config.connect_timeout, self.connect_timeout_secs);
        apply_secs(&mut config.search_timeout, self.search_timeout_secs);
        apply_secs(&mut config.mirror_timeout, self.mirror_timeout_secs);
        apply_secs(&mut config.download_timeout, self.download_timeout_secs);
        if let Some(cache_capacity) = self.cache_capacity {
            config.cache_capacity = cache_capacity;
        }
        if let Some(results_per_page) = self.results_per_page {
            config.results_per_page = results_per_page;
        }
    }
}

fn apply_secs(target: &mut Duration, secs: Option<u64>) {
    if let Some(secs) = secs {
        *target = Duration::from_secs(secs);
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_positive(field: &str, value: Option<usize>) -> Result<()> {
    if value == Some(0) {
        bail!("Invalid config value for `{field}`: 0. Expected a positive number");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter directive for this setting.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// The parsed config, or all-defaults when none was loaded.
    #[must_use]
    pub fn file_config(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bookfinder/config.toml`
/// 2. `$HOME/.config/bookfinder/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("bookfinder")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bookfinder")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` (which must exist), else the default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}
