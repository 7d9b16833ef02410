//! Resource kinds the listing commands know how to show.
//!
//! Each kind keeps the members it renders as typed fields and carries every
//! other JSON member through `extra`, so `--json` output matches what the
//! broker sent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::localtime::LocalZone;

pub trait Resource: Clone + Serialize + DeserializeOwned {
    fn id(&self) -> &str;

    fn status(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Display value for a verbose column; `None` renders as a placeholder.
    fn field(&self, column: &str) -> Option<String>;

    /// Columns accepted by `--items`, `id` excluded.
    fn columns() -> &'static [&'static str];

    /// Columns shown by `--verbose` without `--items`.
    fn default_columns() -> &'static [&'static str];

    /// Rewrites timestamp members into local time.
    fn localize(&mut self, _zone: &LocalZone) {}
}

fn localize_opt(value: &mut Option<String>, zone: &LocalZone) {
    if let Some(v) = value.as_mut() {
        *v = zone.convert(v);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpEndpoint {
    #[serde(default)]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationV2 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_sent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_custom: Option<HttpEndpoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionV2 {
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationV2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for SubscriptionV2 {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn field(&self, column: &str) -> Option<String> {
        let n = self.notification.as_ref();
        match column {
            "id" => Some(self.id.clone()),
            "description" => self.description.clone(),
            "timessent" => n.and_then(|n| n.times_sent).map(|v| v.to_string()),
            "lastnotification" => n.and_then(|n| n.last_notification.clone()),
            "lastsuccess" => n.and_then(|n| n.last_success.clone()),
            "lastsuccesscode" => n.and_then(|n| n.last_success_code).map(|v| v.to_string()),
            "url" => n.and_then(|n| {
                n.http
                    .as_ref()
                    .or(n.http_custom.as_ref())
                    .map(|h| h.url.clone())
            }),
            "expires" => self.expires.clone(),
            "status" => self.status.clone(),
            _ => None,
        }
    }

    fn columns() -> &'static [&'static str] {
        &[
            "description",
            "timessent",
            "lastnotification",
            "lastsuccess",
            "lastsuccesscode",
            "url",
            "expires",
            "status",
        ]
    }

    fn default_columns() -> &'static [&'static str] {
        &["id", "status", "expires", "description"]
    }

    fn localize(&mut self, zone: &LocalZone) {
        localize_opt(&mut self.expires, zone);
        if let Some(n) = self.notification.as_mut() {
            localize_opt(&mut n.last_notification, zone);
            localize_opt(&mut n.last_success, zone);
            localize_opt(&mut n.last_failure, zone);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointLd {
    #[serde(default)]
    pub uri: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointLd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times_sent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLd {
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationLd>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for SubscriptionLd {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn field(&self, column: &str) -> Option<String> {
        let n = self.notification.as_ref();
        match column {
            "id" => Some(self.id.clone()),
            "description" => self.description.clone(),
            "timessent" => n.and_then(|n| n.times_sent).map(|v| v.to_string()),
            "lastnotification" => n.and_then(|n| n.last_notification.clone()),
            "lastsuccess" => n.and_then(|n| n.last_success.clone()),
            "notificationstatus" => n.and_then(|n| n.status.clone()),
            "uri" => n.and_then(|n| n.endpoint.as_ref()).map(|e| e.uri.clone()),
            "expires" => self.expires.clone().or_else(|| self.expires_at.clone()),
            "status" => self.status.clone(),
            _ => None,
        }
    }

    fn columns() -> &'static [&'static str] {
        &[
            "description",
            "timessent",
            "lastnotification",
            "lastsuccess",
            "notificationstatus",
            "uri",
            "expires",
            "status",
        ]
    }

    fn default_columns() -> &'static [&'static str] {
        &["id", "status", "expires", "description"]
    }

    fn localize(&mut self, zone: &LocalZone) {
        localize_opt(&mut self.expires, zone);
        localize_opt(&mut self.expires_at, zone);
        if let Some(n) = self.notification.as_mut() {
            localize_opt(&mut n.last_notification, zone);
            localize_opt(&mut n.last_success, zone);
            localize_opt(&mut n.last_failure, zone);
        }
    }
}

/// Context source registration, v2 or LD shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// v2 provider, `{"http": {"url": ...}}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    /// LD endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Registration {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "description" => self.description.clone(),
            "status" => self.status.clone(),
            "expires" => self.expires.clone().or_else(|| self.expires_at.clone()),
            "url" => self
                .provider
                .as_ref()
                .and_then(|p| p.pointer("/http/url"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| self.endpoint.clone()),
            _ => None,
        }
    }

    fn columns() -> &'static [&'static str] {
        &["description", "status", "expires", "url"]
    }

    fn default_columns() -> &'static [&'static str] {
        &["id", "description"]
    }

    fn localize(&mut self, zone: &LocalZone) {
        localize_opt(&mut self.expires, zone);
        localize_opt(&mut self.expires_at, zone);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    /// A name, or a list of names for multi-typed LD entities.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Entity {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.clone()),
            "type" => match self.entity_type.as_ref()? {
                Value::String(name) => Some(name.clone()),
                Value::Array(names) => Some(
                    names
                        .iter()
                        .map(|n| n.as_str().map_or_else(|| n.to_string(), str::to_string))
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                other => Some(other.to_string()),
            },
            _ => None,
        }
    }

    fn columns() -> &'static [&'static str] {
        &["type"]
    }

    fn default_columns() -> &'static [&'static str] {
        &["id", "type"]
    }
}

/// Entity type name as returned by `GET /v2/types?options=values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub String);

impl Resource for EntityType {
    fn id(&self) -> &str {
        &self.0
    }

    fn field(&self, column: &str) -> Option<String> {
        (column == "id").then(|| self.0.clone())
    }

    fn columns() -> &'static [&'static str] {
        &[]
    }

    fn default_columns() -> &'static [&'static str] {
        &["id"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn v2_subscription_keeps_unknown_members() {
        let raw = json!({
            "id": "5f6a",
            "description": "room temp",
            "subject": {"entities": [{"idPattern": ".*"}]},
            "notification": {"timesSent": 3, "http": {"url": "http://sink"}, "attrsFormat": "normalized"},
            "status": "active"
        });
        let sub: SubscriptionV2 = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(sub.field("url").as_deref(), Some("http://sink"));
        assert_eq!(sub.field("timessent").as_deref(), Some("3"));
        assert_eq!(sub.field("lastsuccesscode"), None);
        assert_eq!(serde_json::to_value(&sub).unwrap(), raw);
    }

    #[test]
    fn v2_subscription_custom_endpoint() {
        let sub: SubscriptionV2 = serde_json::from_value(json!({
            "id": "1",
            "notification": {"httpCustom": {"url": "http://custom", "method": "PUT"}}
        }))
        .unwrap();
        assert_eq!(sub.field("url").as_deref(), Some("http://custom"));
    }

    #[test]
    fn ld_subscription_fields_and_localize() {
        let mut sub: SubscriptionLd = serde_json::from_value(json!({
            "id": "urn:ngsi-ld:Subscription:1",
            "type": "Subscription",
            "expiresAt": "2020-10-01T00:00:00.00Z",
            "notification": {
                "endpoint": {"uri": "http://sink", "accept": "application/json"},
                "status": "ok",
                "lastNotification": "2020-10-01T00:00:00.000Z"
            },
            "status": "active"
        }))
        .unwrap();

        assert_eq!(sub.field("uri").as_deref(), Some("http://sink"));
        assert_eq!(sub.field("notificationstatus").as_deref(), Some("ok"));

        sub.localize(&LocalZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap()));
        assert_eq!(sub.field("expires").as_deref(), Some("2020-10-01T09:00:00.00+0900"));
        assert_eq!(
            sub.notification.unwrap().last_notification.as_deref(),
            Some("2020-10-01T09:00:00.000+0900")
        );
        assert_eq!(sub.extra["type"], "Subscription");
    }

    #[test]
    fn registration_url_in_both_shapes() {
        let v2: Registration = serde_json::from_value(json!({
            "id": "5f5dcb551e715bc7f1ad79e3",
            "provider": {"http": {"url": "http://context-provider:1234"}}
        }))
        .unwrap();
        assert_eq!(v2.field("url").as_deref(), Some("http://context-provider:1234"));

        let ld: Registration = serde_json::from_value(json!({
            "id": "urn:ngsi-ld:ContextSourceRegistration:1",
            "type": "ContextSourceRegistration",
            "endpoint": "http://csource"
        }))
        .unwrap();
        assert_eq!(ld.field("url").as_deref(), Some("http://csource"));
        assert_eq!(ld.field("description"), None);
    }

    #[test]
    fn entity_type_may_be_a_list() {
        let entities: Vec<Entity> = serde_json::from_value(json!([
            {"id": "urn:ngsi-ld:Building:1", "type": ["Building", "Landmark"]},
            {"id": "urn:ngsi-ld:Building:2", "type": "Building"},
            {"id": "urn:ngsi-ld:Building:3"}
        ]))
        .unwrap();

        assert_eq!(entities[0].field("type").as_deref(), Some("Building,Landmark"));
        assert_eq!(entities[1].field("type").as_deref(), Some("Building"));
        assert_eq!(entities[2].field("type"), None);
        assert_eq!(
            serde_json::to_value(&entities[0]).unwrap(),
            json!({"id": "urn:ngsi-ld:Building:1", "type": ["Building", "Landmark"]})
        );
    }
}
