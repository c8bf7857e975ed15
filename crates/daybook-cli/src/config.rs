// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use daybook_sync::{
    APP_NAME, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE, DEFAULT_RETRY_MAX, DEFAULT_SAVE_DELAY,
    SavePolicy, StateStore,
};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT: &str = "10s";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub autosave: Autosave,
    #[serde(default)]
    pub state: State,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub session_token: Option<String>,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            session_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Autosave {
    pub delay: Option<String>,
    pub retry_base: Option<String>,
    pub retry_max: Option<String>,
    pub max_retries: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct State {
    pub path: Option<String>,
}

impl Config {
    fn with_defaults() -> Self {
        Self {
            version: CONFIG_VERSION,
            ..Self::default()
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("DAYBOOK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set DAYBOOK_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::with_defaults());
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
                    "config file {} has no version. Add `version = 1` and put values under [server], [autosave], and [state]",
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
        if let Some(base_url) = &self.server.base_url
            && base_url.trim().is_empty()
        {
            bail!("server.base_url in {} must not be empty", path.display());
        }

        let durations = [
            ("server.timeout", &self.server.timeout),
            ("autosave.retry_base", &self.autosave.retry_base),
            ("autosave.retry_max", &self.autosave.retry_max),
        ];
        for (key, value) in durations {
            if let Some(raw) = value
                && parse_duration(raw)? <= Duration::ZERO
            {
                bail!("{key} in {} must be positive, got {raw}", path.display());
            }
        }
        if let Some(raw) = &self.autosave.delay {
            parse_duration(raw).with_context(|| format!("autosave.delay in {}", path.display()))?;
        }

        if let Some(retries) = self.autosave.max_retries
            && retries < 0
        {
            bail!(
                "autosave.max_retries in {} must be non-negative, got {}",
                path.display(),
                retries
            );
        }

        let policy = self.save_policy()?;
        if policy.retry_max < policy.retry_base {
            bail!(
                "autosave.retry_max in {} must not be shorter than autosave.retry_base",
                path.display()
            );
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.server.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn session_token(&self) -> Option<&str> {
        self.server.session_token.as_deref()
    }

    pub fn save_policy(&self) -> Result<SavePolicy> {
        let duration_or = |value: &Option<String>, fallback: Duration| -> Result<Duration> {
            value.as_deref().map_or(Ok(fallback), parse_duration)
        };
        Ok(SavePolicy {
            delay: duration_or(&self.autosave.delay, DEFAULT_SAVE_DELAY)?,
            retry_base: duration_or(&self.autosave.retry_base, DEFAULT_RETRY_BASE)?,
            retry_max: duration_or(&self.autosave.retry_max, DEFAULT_RETRY_MAX)?,
            max_retries: self
                .autosave
                .max_retries
                .map_or(Ok(DEFAULT_MAX_RETRIES), u32::try_from)
                .context("autosave.max_retries is out of range")?,
        })
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => StateStore::default_path(),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# daybook config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# Value of the diarygo_session cookie after logging in.\n# session_token = \"\"\n\n[autosave]\n# Quiet period after the last keystroke before a save starts.\ndelay = \"500ms\"\nretry_base = \"1s\"\nretry_max = \"1m\"\nmax_retries = {}\n\n[state]\n# Optional. Default is the platform data dir (for example ~/.local/share/daybook/state.json)\n# path = \"/absolute/path/to/state.json\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_RETRIES,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
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
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}
