//! Configuration for the install pipeline.
//!
//! Settings are read from `ingot.toml`, looked up next to the working root
//! (or at an explicit `--config` path). Every section is optional; a
//! missing file yields the defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [project]
//! root = "~/php"
//! upstream = "https://github.com/php/php-src.git"
//! make_jobs = 4
//!
//! [defaults]
//! options = ["--enable-mbstring", "--with-zlib"]
//!
//! [variants.debug]
//! options = ["--enable-debug"]
//!
//! [variants.web]
//! options = ["--enable-fpm"]
//! extensions = ["apcu"]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::InstallError;

/// Project-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Working root for sources, prefixes, logs, and locks.
    /// Defaults to `~/php`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Upstream git repository to fetch from.
    #[serde(default = "default_upstream")]
    pub upstream: String,
    /// Parallelism passed to make.
    #[serde(default = "default_make_jobs")]
    pub make_jobs: u32,
}

fn default_upstream() -> String {
    "https://github.com/php/php-src.git".to_string()
}

fn default_make_jobs() -> u32 {
    4
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: None,
            upstream: default_upstream(),
            make_jobs: default_make_jobs(),
        }
    }
}

/// Configure flags applied to every build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub options: Vec<String>,
}

/// A named build variant: extra or overriding configure flags plus
/// extensions built after the core install.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantConfig {
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// The complete ingot.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngotToml {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub variants: HashMap<String, VariantConfig>,
}

impl IngotToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse ingot.toml")
    }

    /// Load configuration from the default location under `root`.
    /// Returns the defaults if the file doesn't exist.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join("ingot.toml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Look up a variant by name, rejecting unknown names.
    pub fn variant(&self, name: &str) -> Result<&VariantConfig, InstallError> {
        self.variants
            .get(name)
            .ok_or_else(|| InstallError::UnknownVariant {
                name: name.to_string(),
            })
    }
}

/// Directory layout under the working root.
///
/// ```text
/// <root>/php-src/              shared source checkout
/// <root>/versions/<release>/   install prefix per release
/// <root>/log/                  build run logs
/// <root>/locks/                per-target advisory locks
/// <root>/patches/              source patch files
/// <root>/cache/                downloaded bootstrap artifacts
/// ```
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Resolve the working root: explicit CLI path, then the configured
    /// root, then `~/php`.
    pub fn resolve(cli_root: Option<&Path>, config: &IngotToml) -> Result<Paths> {
        let root = match cli_root {
            Some(path) => path.to_path_buf(),
            None => match &config.project.root {
                Some(path) => expand_home(path)?,
                None => dirs::home_dir()
                    .context("Failed to locate home directory")?
                    .join("php"),
            },
        };
        Ok(Paths { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The shared source checkout.
    pub fn work_tree(&self) -> PathBuf {
        self.root.join("php-src")
    }

    /// Install prefix for one release.
    pub fn prefix(&self, release: &str) -> PathBuf {
        self.root.join("versions").join(release)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn patches_dir(&self) -> PathBuf {
        self.root.join("patches")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> Result<PathBuf> {
    let Some(text) = path.to_str() else {
        return Ok(path.to_path_buf());
    };
    if let Some(rest) = text.strip_prefix("~/") {
        let home = dirs::home_dir().context("Failed to locate home directory")?;
        Ok(home.join(rest))
    } else if text == "~" {
        dirs::home_dir().context("Failed to locate home directory")
    } else {
        Ok(path.to_path_buf())
    }
}
