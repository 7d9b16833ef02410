use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Wire variant spoken by a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[value(aliases = ["ngsiv2", "ngsi-v2"])]
    #[serde(alias = "ngsiv2", alias = "ngsi-v2")]
    V2,
    #[value(alias = "ngsi-ld")]
    #[serde(alias = "ngsi-ld")]
    Ld,
}

impl Dialect {
    pub fn api_prefix(self) -> &'static str {
        match self {
            Dialect::V2 => "v2",
            Dialect::Ld => "ngsi-ld/v1",
        }
    }

    pub fn count_header(self) -> &'static str {
        match self {
            Dialect::V2 => "Fiware-Total-Count",
            Dialect::Ld => "NGSILD-Results-Count",
        }
    }

    /// Adds the "send me the total" flag to `query`.
    ///
    /// v2 folds `count` into a possibly existing `options` list, LD uses a
    /// dedicated `count=true` parameter.
    pub fn request_count(self, query: &mut Vec<(String, String)>) {
        match self {
            Dialect::V2 => match query.iter_mut().find(|(k, _)| k == "options") {
                Some((_, value)) if value.split(',').any(|o| o == "count") => {}
                Some((_, value)) => value.push_str(",count"),
                None => query.push(("options".into(), "count".into())),
            },
            Dialect::Ld => query.push(("count".into(), "true".into())),
        }
    }

    /// Smallest `limit` a broker accepts for a count-only request.
    pub fn count_only_limit(self) -> usize {
        match self {
            Dialect::V2 => 1,
            Dialect::Ld => 0,
        }
    }

    pub fn subscription_statuses(self) -> &'static [&'static str] {
        match self {
            Dialect::V2 => &["active", "inactive", "oneshot", "expired", "failed"],
            Dialect::Ld => &["active", "paused", "expired"],
        }
    }

    pub fn registrations_path(self) -> &'static str {
        match self {
            Dialect::V2 => "/registrations",
            Dialect::Ld => "/csourceRegistrations",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_merges_count_into_options() {
        let mut query = vec![("options".to_string(), "keyValues".to_string())];
        Dialect::V2.request_count(&mut query);
        assert_eq!(query, vec![("options".into(), "keyValues,count".into())]);

        Dialect::V2.request_count(&mut query);
        assert_eq!(query[0].1, "keyValues,count");
    }

    #[test]
    fn ld_uses_count_parameter() {
        let mut query = Vec::new();
        Dialect::Ld.request_count(&mut query);
        assert_eq!(query, vec![("count".into(), "true".into())]);
        assert_eq!(Dialect::Ld.count_header(), "NGSILD-Results-Count");
    }
}
