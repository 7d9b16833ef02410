use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::config::BrokerTarget;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NgsiError, Result};

const UA: &str = concat!("ngsictl/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ResponseData {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ResponseData {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status and body as one line, e.g. `404 Not Found {"error":"NotFound"}`.
    pub fn status_text(&self) -> String {
        format!("{} {}", self.status, self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    root_url: Url,
    base_url: Url,
    http: Client,
    dialect: Dialect,
    service: Option<String>,
    service_path: Option<String>,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(target: &BrokerTarget) -> Result<Self> {
        const SITE: &str = "new_client";

        let mut root = Url::parse(&target.url)
            .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Validation, e))?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let base_url = root
            .join(&format!("{}/", target.dialect.api_prefix()))
            .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Validation, e))?;

        let http = Client::builder()
            .user_agent(HeaderValue::from_static(UA))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| NgsiError::wrap(SITE, 3, ErrorKind::Transport, e))?;

        Ok(Self {
            root_url: root,
            base_url,
            http,
            dialect: target.dialect,
            service: target.service.clone(),
            service_path: target.path.clone(),
            token: target.token.clone(),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> reqwest::Result<ResponseData> {
        self.request(Method::GET, path, query, None)
    }

    /// GET outside the API prefix, e.g. `/version`.
    pub fn get_root(&self, path: &str) -> reqwest::Result<ResponseData> {
        let url = join_path(&self.root_url, path);
        self.send(Method::GET, url, &[], None)
    }

    pub fn post_json(&self, path: &str, body: &Value) -> reqwest::Result<ResponseData> {
        self.request(Method::POST, path, &[], Some(body))
    }

    pub fn delete(&self, path: &str) -> reqwest::Result<ResponseData> {
        self.request(Method::DELETE, path, &[], None)
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> reqwest::Result<ResponseData> {
        self.send(method, join_path(&self.base_url, path), query, body)
    }

    fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> reqwest::Result<ResponseData> {
        let path = url.path().to_string();
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(USER_AGENT, HeaderValue::from_static(UA));

        match self.dialect {
            Dialect::V2 => {
                if let Some(service) = &self.service {
                    request = request.header("Fiware-Service", service);
                }
                if let Some(scope) = &self.service_path {
                    request = request.header("Fiware-ServicePath", scope);
                }
            }
            Dialect::Ld => {
                if let Some(tenant) = &self.service {
                    request = request.header("NGSILD-Tenant", tenant);
                }
            }
        }

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(body) = body {
            let content_type = if self.dialect == Dialect::Ld && body.get("@context").is_some() {
                "application/ld+json"
            } else {
                "application/json"
            };
            request = request.header(CONTENT_TYPE, content_type).json(body);
        }

        tracing::debug!(%method, path = path.as_str(), "sending request");
        let response = request.send()?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text()?;

        Ok(ResponseData {
            status,
            headers,
            body,
        })
    }
}

fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{}", base.path(), path.trim_start_matches('/'));
    url.set_path(&joined);
    url
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;

    pub(crate) fn target(url: &str, dialect: Dialect) -> BrokerTarget {
        BrokerTarget {
            url: url.to_string(),
            dialect,
            service: None,
            path: None,
            token: None,
        }
    }

    #[test]
    fn sends_tenant_headers_and_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/subscriptions")
                .header("Fiware-Service", "openiot")
                .header("Fiware-ServicePath", "/")
                .header("Authorization", "Bearer abc");
            then.status(200).body("[]");
        });

        let mut broker = target(&server.base_url(), Dialect::V2);
        broker.service = Some("openiot".into());
        broker.path = Some("/".into());
        broker.token = Some("abc".into());
        let client = ApiClient::new(&broker).unwrap();
        let response = client.get("/subscriptions", &[]).unwrap();

        mock.assert();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "[]");
    }

    #[test]
    fn ld_paths_and_tenant() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/ngsi-ld/v1/subscriptions/")
                .header("NGSILD-Tenant", "smartcity");
            then.status(200).body("[]");
        });

        let mut broker = target(&server.base_url(), Dialect::Ld);
        broker.service = Some("smartcity".into());
        let client = ApiClient::new(&broker).unwrap();
        client.get("/subscriptions/", &[]).unwrap();

        mock.assert();
    }

    #[test]
    fn non_success_is_not_a_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/v2/subscriptions/abc");
            then.status(404).body(r#"{"error":"NotFound"}"#);
        });

        let client = ApiClient::new(&target(&server.base_url(), Dialect::V2)).unwrap();
        let response = client.delete("/subscriptions/abc").unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status_text(), r#"404 Not Found {"error":"NotFound"}"#);
    }

    #[test]
    fn posts_ld_json_when_context_present() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/ngsi-ld/v1/subscriptions")
                .header("Content-Type", "application/ld+json");
            then.status(201)
                .header("Location", "/ngsi-ld/v1/subscriptions/urn:sub:1");
        });

        let client = ApiClient::new(&target(&server.base_url(), Dialect::Ld)).unwrap();
        let body = serde_json::json!({"type": "Subscription", "@context": "https://example.org/ctx.jsonld"});
        let response = client.post_json("/subscriptions", &body).unwrap();

        mock.assert();
        assert_eq!(
            response.header("Location"),
            Some("/ngsi-ld/v1/subscriptions/urn:sub:1")
        );
    }

    #[test]
    fn root_requests_skip_the_prefix() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/version");
            then.status(200).body(r#"{"orion":{"version":"3.7.0"}}"#);
        });

        let client = ApiClient::new(&target(&server.base_url(), Dialect::V2)).unwrap();
        let response = client.get_root("/version").unwrap();

        mock.assert();
        assert!(response.is_success());
    }

    #[test]
    fn rejects_bad_url() {
        let err = ApiClient::new(&target("not a url", Dialect::V2)).unwrap_err();
        assert!(err.is("new_client", 1));
    }
}
