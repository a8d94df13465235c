//! Configuration management for the status collector

use crate::errors::{CollectorError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process settings; every value has a default so the binary runs without flags
#[derive(Debug, Clone, Parser)]
#[command(name = "status_collector", version, about = "Probe configured sites and update their status logs")]
pub struct Settings {
    /// Status page configuration document (YAML, or JSON with a .json extension)
    #[arg(long = "config", env = "STATUS_CONFIG_PATH", default_value = "config.yml")]
    pub config_path: PathBuf,

    /// Directory holding one log file per site and group
    #[arg(long, env = "STATUS_LOGS_DIR", default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Per-probe HTTP timeout
    #[arg(long, env = "PROBE_TIMEOUT_SECONDS", default_value_t = 30)]
    pub probe_timeout_seconds: u64,
}

impl Settings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    /// Metadata for the status page renderer
    #[serde(rename = "status-website", default)]
    pub status_website: StatusWebsite,

    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusWebsite {
    #[serde(default)]
    pub cname: String,

    #[serde(rename = "logoUrl", default)]
    pub logo_url: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Site {
    #[serde(default)]
    pub name: String,

    /// Probe target URL
    #[serde(default)]
    pub desc: String,

    #[serde(default)]
    pub slug: String,
}

impl Config {
    /// Load the document at `path`; a `.json` extension selects JSON, anything else YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            CollectorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json(&data)
        } else {
            Self::from_yaml(&data)
        };

        config.map_err(|e| CollectorError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();

        for group in &self.groups {
            validate_slug(&group.slug).map_err(|e| format!("group '{}': {}", group.name, e))?;
            if !seen.insert(group.slug.as_str()) {
                return Err(format!("slug '{}' is used more than once", group.slug));
            }

            for site in &group.sites {
                validate_slug(&site.slug).map_err(|e| format!("site '{}': {}", site.name, e))?;
                if !seen.insert(site.slug.as_str()) {
                    return Err(format!("slug '{}' is used more than once", site.slug));
                }
            }
        }

        Ok(())
    }

    pub fn site_count(&self) -> usize {
        self.groups.iter().map(|g| g.sites.len()).sum()
    }
}

/// Slugs become file stems inside the logs directory
fn validate_slug(slug: &str) -> std::result::Result<(), String> {
    if slug.is_empty() {
        return Err("slug cannot be empty".to_string());
    }

    if slug.starts_with('.') {
        return Err(format!("slug '{}' cannot start with '.'", slug));
    }

    if slug
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(format!("slug '{}' is not a valid file name", slug));
    }

    Ok(())
}
