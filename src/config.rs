// ngsictl - CLI for FIWARE NGSI context brokers
// Copyright (C) 2024 The ngsictl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::dialect::Dialect;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub default_broker: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub brokers: BTreeMap<String, BrokerConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub url: Option<String>,
    pub ngsi_type: Option<Dialect>,
    pub service: Option<String>,
    pub path: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error("required host not found; pass --host or set one with `ngsictl broker add`")]
    MissingHost,
    #[error("broker `{0}` is not configured")]
    UnknownBroker(String),
    #[error("broker `{0}` has no url")]
    MissingUrl(String),
}

/// Per-invocation values taken from global flags.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub ngsi_type: Option<Dialect>,
    pub service: Option<String>,
    pub path: Option<String>,
    pub token: Option<String>,
}

/// A broker fully resolved from config files and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerTarget {
    pub url: String,
    pub dialect: Dialect,
    pub service: Option<String>,
    pub path: Option<String>,
    pub token: Option<String>,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".ngsictl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("NGSICTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("ngsictl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

/// Picks the broker named by `--host` (alias or URL) or the configured
/// default, then layers flag overrides on top.
pub fn resolve(cwd: &Path, overrides: &Overrides) -> Result<BrokerTarget> {
    let merged = load(cwd)?;

    let host = overrides
        .host
        .clone()
        .or(merged.default_broker.clone())
        .ok_or(ConfigError::MissingHost)?;

    let base = if is_url(&host) {
        BrokerConfig {
            url: Some(host.clone()),
            ..BrokerConfig::default()
        }
    } else {
        merged
            .brokers
            .get(&host)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownBroker(host.clone()))?
    };

    let url = base.url.ok_or_else(|| ConfigError::MissingUrl(host.clone()))?;

    Ok(BrokerTarget {
        url: url.trim().trim_end_matches('/').to_string(),
        dialect: overrides.ngsi_type.or(base.ngsi_type).unwrap_or_default(),
        service: overrides.service.clone().or(base.service),
        path: overrides.path.clone().or(base.path),
        token: overrides.token.clone().or(base.token),
    })
}

pub fn is_url(host: &str) -> bool {
    host.starts_with("http://") || host.starts_with("https://")
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    let mut brokers = user.brokers;
    for (alias, local_broker) in local.brokers {
        let merged = match brokers.remove(&alias) {
            Some(user_broker) => merge_broker(user_broker, local_broker),
            None => local_broker,
        };
        brokers.insert(alias, merged);
    }

    Config {
        default_broker: local.default_broker.or(user.default_broker),
        brokers,
    }
}

fn merge_broker(user: BrokerConfig, local: BrokerConfig) -> BrokerConfig {
    BrokerConfig {
        url: local.url.or(user.url),
        ngsi_type: local.ngsi_type.or(user.ngsi_type),
        service: local.service.or(user.service),
        path: local.path.or(user.path),
        token: local.token.or(user.token),
    }
}
