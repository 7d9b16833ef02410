//! Broker aliases kept in the config files.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::{self, BrokerConfig, Overrides, Scope, is_url};
use crate::dialect::Dialect;

const MASK: &str = "*****";

/// Values written to an alias; unset fields keep what is stored.
#[derive(Debug, Clone, Default)]
pub struct BrokerFields {
    pub url: Option<String>,
    pub ngsi_type: Option<Dialect>,
    pub service: Option<String>,
    pub path: Option<String>,
    pub token: Option<String>,
}

impl BrokerFields {
    /// `--url` plus the global `--ngsi-type`, `--service`, `--path` and
    /// `--token` flags.
    pub fn from_overrides(url: Option<String>, overrides: &Overrides) -> Self {
        Self {
            url,
            ngsi_type: overrides.ngsi_type,
            service: overrides.service.clone(),
            path: overrides.path.clone(),
            token: overrides.token.clone(),
        }
    }

    fn apply(&self, broker: &mut BrokerConfig) {
        if let Some(url) = &self.url {
            broker.url = Some(url.trim_end_matches('/').to_string());
        }
        if self.ngsi_type.is_some() {
            broker.ngsi_type = self.ngsi_type;
        }
        if let Some(service) = &self.service {
            broker.service = Some(service.clone());
        }
        if let Some(path) = &self.path {
            broker.path = Some(path.clone());
        }
        if let Some(token) = &self.token {
            broker.token = Some(token.clone());
        }
    }
}

fn check_alias(alias: &str) -> Result<()> {
    if alias.is_empty() || is_url(alias) || alias.contains(char::is_whitespace) {
        bail!("invalid broker alias `{alias}`");
    }
    Ok(())
}

fn check_url(url: Option<&str>) -> Result<()> {
    match url {
        Some(url) if is_url(url) => Ok(()),
        Some(url) => bail!("broker url must start with http:// or https://: {url}"),
        None => bail!("--url is required"),
    }
}

/// Aliases from both scopes, the default one marked with `*`.
pub fn list<W: Write>(cwd: &Path, out: &mut W) -> Result<()> {
    let merged = config::load(cwd)?;
    for alias in merged.brokers.keys() {
        let mark = if merged.default_broker.as_deref() == Some(alias.as_str()) {
            " *"
        } else {
            ""
        };
        writeln!(out, "{alias}{mark}")?;
    }
    Ok(())
}

/// Prints one alias as JSON with the token masked.
pub fn get<W: Write>(cwd: &Path, alias: &str, out: &mut W) -> Result<()> {
    let merged = config::load(cwd)?;
    let mut broker = merged
        .brokers
        .get(alias)
        .cloned()
        .with_context(|| format!("broker `{alias}` is not configured"))?;
    if broker.token.is_some() {
        broker.token = Some(MASK.into());
    }
    writeln!(out, "{}", serde_json::to_string_pretty(&broker)?)?;
    Ok(())
}

pub fn add(cwd: &Path, scope: Scope, alias: &str, fields: &BrokerFields, make_default: bool) -> Result<()> {
    check_alias(alias)?;
    check_url(fields.url.as_deref())?;

    let mut existing = config::load_scope(scope, cwd)?;
    if existing.brokers.contains_key(alias) {
        bail!("broker `{alias}` already exists; use `ngsictl configure` to update it");
    }

    let mut broker = BrokerConfig::default();
    fields.apply(&mut broker);
    existing.brokers.insert(alias.to_string(), broker);
    if make_default || existing.default_broker.is_none() {
        existing.default_broker = Some(alias.to_string());
    }

    let path = config::save(scope, &existing, cwd)?;
    info!(alias, path = %path.display(), "broker added");
    Ok(())
}

/// Creates or updates `alias` in `scope` and makes it the default broker.
pub fn configure(cwd: &Path, scope: Scope, alias: &str, fields: &BrokerFields) -> Result<()> {
    check_alias(alias)?;

    let mut existing = config::load_scope(scope, cwd)?;
    let broker = existing.brokers.entry(alias.to_string()).or_default();
    fields.apply(broker);
    check_url(broker.url.as_deref())?;
    existing.default_broker = Some(alias.to_string());

    let path = config::save(scope, &existing, cwd)?;
    info!(alias, path = %path.display(), "broker configured");
    Ok(())
}

pub fn delete(cwd: &Path, scope: Scope, alias: &str) -> Result<()> {
    let mut existing = config::load_scope(scope, cwd)?;
    if existing.brokers.remove(alias).is_none() {
        bail!("broker `{alias}` is not configured");
    }
    if existing.default_broker.as_deref() == Some(alias) {
        existing.default_broker = None;
    }

    let path = config::save(scope, &existing, cwd)?;
    info!(alias, path = %path.display(), "broker deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::isolated;

    fn fields(url: &str) -> BrokerFields {
        BrokerFields {
            url: Some(url.into()),
            ..BrokerFields::default()
        }
    }

    #[test]
    fn add_list_get_delete() {
        let (_guard, cwd) = isolated();
        let cwd = cwd.path();

        let mut orion = fields("http://orion:1026/");
        orion.token = Some("secret".into());
        add(cwd, Scope::User, "orion", &orion, false).unwrap();

        let mut ld = fields("http://orion-ld:1026");
        ld.ngsi_type = Some(Dialect::Ld);
        add(cwd, Scope::User, "orion-ld", &ld, false).unwrap();

        let mut out = Vec::new();
        list(cwd, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "orion *\norion-ld\n");

        let mut out = Vec::new();
        get(cwd, "orion", &mut out).unwrap();
        let shown: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(shown["url"], "http://orion:1026");
        assert_eq!(shown["token"], MASK);

        let target = config::resolve(cwd, &Overrides::default()).unwrap();
        assert_eq!(target.url, "http://orion:1026");
        assert_eq!(target.token.as_deref(), Some("secret"));

        delete(cwd, Scope::User, "orion").unwrap();
        let remaining = config::load_scope(Scope::User, cwd).unwrap();
        assert!(remaining.default_broker.is_none());
        assert_eq!(remaining.brokers.len(), 1);

        assert!(delete(cwd, Scope::User, "orion").is_err());
    }

    #[test]
    fn add_rejects_bad_input_and_duplicates() {
        let (_guard, cwd) = isolated();
        let cwd = cwd.path();

        assert!(add(cwd, Scope::User, "http://x", &fields("http://x"), false).is_err());
        assert!(add(cwd, Scope::User, "orion", &fields("orion:1026"), false).is_err());
        assert!(add(cwd, Scope::User, "orion", &BrokerFields::default(), false).is_err());

        add(cwd, Scope::User, "orion", &fields("http://orion:1026"), false).unwrap();
        let err = add(cwd, Scope::User, "orion", &fields("http://other"), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn configure_updates_in_place_and_sets_default() {
        let (_guard, cwd) = isolated();
        let cwd = cwd.path();

        add(cwd, Scope::Local, "a", &fields("http://a:1026"), false).unwrap();
        add(cwd, Scope::Local, "b", &fields("http://b:1026"), false).unwrap();

        let overrides = Overrides {
            service: Some("openiot".into()),
            ..Overrides::default()
        };
        let update = BrokerFields::from_overrides(None, &overrides);
        configure(cwd, Scope::Local, "b", &update).unwrap();

        let local = config::load_scope(Scope::Local, cwd).unwrap();
        assert_eq!(local.default_broker.as_deref(), Some("b"));
        let b = &local.brokers["b"];
        assert_eq!(b.url.as_deref(), Some("http://b:1026"));
        assert_eq!(b.service.as_deref(), Some("openiot"));

        assert!(configure(cwd, Scope::Local, "c", &BrokerFields::default()).is_err());
    }
}
