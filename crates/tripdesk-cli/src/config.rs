// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tripdesk_app::{DEFAULT_AIRPORT_MIN_QUERY, FormSettings};

const APP_NAME: &str = "tripdesk";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_API_TIMEOUT: &str = "10s";
const DEFAULT_TICK: &str = "1s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub reconcile: Reconcile,
    #[serde(default)]
    pub search: Search,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            reconcile: Reconcile::default(),
            search: Search::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_API_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_API_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reconcile {
    pub tick: Option<String>,
    pub batch: Option<bool>,
}

impl Default for Reconcile {
    fn default() -> Self {
        Self {
            tick: Some(DEFAULT_TICK.to_owned()),
            batch: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
    pub airport_min_query: Option<i64>,
}

impl Default for Search {
    fn default() -> Self {
        Self {
            airport_min_query: Some(DEFAULT_AIRPORT_MIN_QUERY as i64),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TRIPDESK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TRIPDESK_CONFIG_PATH to the config file")
        })?;

        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [api], [reconcile], and [search]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        for (key, raw) in [
            ("api.timeout", &self.api.timeout),
            ("reconcile.tick", &self.reconcile.tick),
        ] {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw)
                    .with_context(|| format!("{key} in {}", path.display()))?;
                if parsed <= Duration::ZERO {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        if let Some(min_query) = self.search.airport_min_query
            && !(0..=32).contains(&min_query)
        {
            bail!(
                "search.airport_min_query in {} must be between 0 and 32, got {}",
                path.display(),
                min_query
            );
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_API_TIMEOUT))
    }

    pub fn tick(&self) -> Result<Duration> {
        parse_duration(self.reconcile.tick.as_deref().unwrap_or(DEFAULT_TICK))
    }

    pub fn batch_reconcile(&self) -> bool {
        self.reconcile.batch.unwrap_or(true)
    }

    pub fn form_settings(&self) -> FormSettings {
        let airport_min_query = self
            .search
            .airport_min_query
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(DEFAULT_AIRPORT_MIN_QUERY);
        FormSettings { airport_min_query }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# tripdesk config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Back-office API root; reservation paths are appended to it\nbase_url = \"{}\"\ntimeout = \"{}\"\n\n[reconcile]\n# How often countdowns are re-evaluated\ntick = \"{}\"\n# Reconcile rows expiring on the same tick with one list fetch\nbatch = true\n\n[search]\n# Characters required before airport candidates are shown\nairport_min_query = {}\n",
            path.display(),
            DEFAULT_API_BASE_URL,
            DEFAULT_API_TIMEOUT,
            DEFAULT_TICK,
            DEFAULT_AIRPORT_MIN_QUERY,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        let Some(secs) = mins.checked_mul(60) else {
            bail!("duration {raw:?} is too large -- use a smaller number of minutes");
        };
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
