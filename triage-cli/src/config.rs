use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use triage_core::{Amount, GtdSettings, SystemClock};

use crate::state::ensure_triage_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub gtd: GtdSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Effort available per day, e.g. "8p" or "4h".
    pub dedication: String,
    /// IANA zone used to read "now".
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Task file; defaults to ~/.triage/tasks.json.
    pub path: Option<PathBuf>,
    /// Reload interval for `triage watch`.
    pub poll_seconds: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            dedication: "8p".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            poll_seconds: 5,
        }
    }
}

impl Config {
    pub fn dedication(&self) -> Result<Amount> {
        let d: Amount = self
            .engine
            .dedication
            .parse()
            .with_context(|| format!("engine.dedication = {:?}", self.engine.dedication))?;
        if d <= Amount::ZERO {
            anyhow::bail!("engine.dedication must be positive, got {d}");
        }
        Ok(d)
    }

    pub fn clock(&self) -> Result<SystemClock> {
        SystemClock::new(&self.engine.timezone).context("engine.timezone")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.store.poll_seconds.max(1))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(p) => Ok(p.clone()),
            None => crate::state::default_store_path(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_triage_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Writes the default config unless one exists. Returns the message to show.
pub fn init_config() -> Result<String> {
    init_config_at(&config_path()?)
}

pub fn init_config_at(p: &Path) -> Result<String> {
    if p.exists() {
        return Ok(format!("Config already exists: {}", p.display()));
    }
    save_config_to(&Config::default(), p)?;
    Ok(format!("Wrote {}", p.display()))
}
