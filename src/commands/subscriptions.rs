use std::io::Write;

use clap::Args;
use tracing::info;

use super::{ListArgs, id_from_location, print_json, print_line, read_data, run_list};
use crate::client::ApiClient;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NgsiError, Result};
use crate::filter::FilterSpec;
use crate::localtime::LocalZone;
use crate::paginate::remote_count;
use crate::resource::{Resource, SubscriptionLd, SubscriptionV2};

#[derive(Args, Debug, Clone, Default)]
pub struct ListOpts {
    #[arg(long, value_name = "STATUS1,STATUS2", help = "Keep subscriptions in these states")]
    pub status: Option<String>,
    #[arg(long, value_name = "REGEX", help = "Keep subscriptions whose description matches REGEX")]
    pub query: Option<String>,
    #[command(flatten)]
    pub output: ListArgs,
}

fn collection(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::V2 => "/subscriptions",
        Dialect::Ld => "/subscriptions/",
    }
}

pub fn list<W: Write>(client: &ApiClient, opts: &ListOpts, out: &mut W) -> Result<()> {
    let dialect = client.dialect();
    let filter = FilterSpec::new(
        opts.status.as_deref(),
        dialect.subscription_statuses(),
        opts.query.as_deref(),
    )?;
    match dialect {
        Dialect::V2 => run_list::<SubscriptionV2, W>(client, collection(dialect), &[], &filter, &opts.output, out),
        Dialect::Ld => run_list::<SubscriptionLd, W>(client, collection(dialect), &[], &filter, &opts.output, out),
    }
}

pub fn get<W: Write>(client: &ApiClient, id: &str, pretty: bool, local_time: bool, out: &mut W) -> Result<()> {
    let zone = local_time.then_some(LocalZone::System);
    match client.dialect() {
        Dialect::V2 => fetch_one::<SubscriptionV2, W>(client, id, pretty, zone, out),
        Dialect::Ld => fetch_one::<SubscriptionLd, W>(client, id, pretty, zone, out),
    }
}

fn fetch_one<T: Resource, W: Write>(
    client: &ApiClient,
    id: &str,
    pretty: bool,
    zone: Option<LocalZone>,
    out: &mut W,
) -> Result<()> {
    const SITE: &str = "get_subscription";

    let response = client
        .get(&format!("/subscriptions/{id}"), &[])
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(
            SITE,
            2,
            ErrorKind::HttpStatus,
            format!("{} {id}", response.status_text()),
        ));
    }

    let mut sub: T = serde_json::from_str(&response.body)
        .map_err(|e| NgsiError::wrap(SITE, 3, ErrorKind::Decode, e))?;
    if let Some(zone) = zone {
        sub.localize(&zone);
    }
    print_json(&sub, pretty, out)
}

pub fn create<W: Write>(client: &ApiClient, data: &str, out: &mut W) -> Result<()> {
    const SITE: &str = "create_subscription";

    let body = read_data(data)?;
    if !body.is_object() {
        return Err(NgsiError::new(SITE, 1, ErrorKind::Validation, "subscription must be a JSON object"));
    }

    let response = client
        .post_json("/subscriptions", &body)
        .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(SITE, 3, ErrorKind::HttpStatus, response.status_text()));
    }

    let location = response.header("Location").unwrap_or_default();
    info!(location, "subscription created");
    print_line(out, id_from_location(location, "subscriptions"))
}

pub fn delete(client: &ApiClient, id: &str) -> Result<()> {
    const SITE: &str = "delete_subscription";

    let path = format!("/subscriptions/{id}");
    let response = client
        .delete(&path)
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(
            SITE,
            2,
            ErrorKind::HttpStatus,
            format!("{} {id}", response.status_text()),
        ));
    }

    info!(id, "subscription deleted");
    Ok(())
}

pub fn count<W: Write>(client: &ApiClient, out: &mut W) -> Result<()> {
    let total = remote_count(client, collection(client.dialect()), &[])?;
    print_line(out, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{client, output};
    use httpmock::prelude::*;
    use serde_json::json;

    fn v2_page() -> serde_json::Value {
        json!([
            {"id": "3ea2e78f675f2d199d3025ff", "description": "room sensor", "status": "inactive",
             "notification": {"http": {"url": "http://sink:1028"}}},
            {"id": "3ea2e78f675f2d199d302600", "description": "car sensor", "status": "failed"},
            {"id": "3ea2e78f675f2d199d302601", "status": "active", "expires": "2020-12-09T11:06:29.693Z"},
            {"id": "3ea2e78f675f2d199d302602", "description": "dummy", "status": "expired"},
            {"id": "3ea2e78f675f2d199d302603", "description": "room", "status": "oneshot"},
            {"id": "3ea2e78f675f2d199d302604", "description": "dummy", "status": "inactive"}
        ])
    }

    fn v2_server() -> MockServer {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/subscriptions").query_param("options", "count");
            then.status(200)
                .header("Fiware-Total-Count", "6")
                .json_body(v2_page());
        });
        server
    }

    #[test]
    fn lists_ids_by_default() {
        let server = v2_server();
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::V2), &ListOpts::default(), &mut out).unwrap();
        assert_eq!(output(out).lines().count(), 6);
    }

    #[test]
    fn status_filter_keeps_the_one_active() {
        let server = v2_server();
        let opts = ListOpts {
            status: Some("active".into()),
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::V2), &opts, &mut out).unwrap();
        assert_eq!(output(out), "3ea2e78f675f2d199d302601\n");
    }

    #[test]
    fn verbose_items_after_filter() {
        let server = v2_server();
        let opts = ListOpts {
            status: Some("active".into()),
            output: ListArgs {
                verbose: true,
                items: Some("status,expires".into()),
                ..ListArgs::default()
            },
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::V2), &opts, &mut out).unwrap();
        assert_eq!(output(out), "3ea2e78f675f2d199d302601 active 2020-12-09T11:06:29.693Z\n");
    }

    #[test]
    fn query_then_count() {
        let server = v2_server();
        let opts = ListOpts {
            query: Some("sensor".into()),
            output: ListArgs {
                count: true,
                ..ListArgs::default()
            },
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::V2), &opts, &mut out).unwrap();
        assert_eq!(output(out), "2\n");
    }

    #[test]
    fn json_with_nothing_left_prints_nothing() {
        let server = v2_server();
        let opts = ListOpts {
            query: Some("^nomatch$".into()),
            output: ListArgs {
                json: true,
                ..ListArgs::default()
            },
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::V2), &opts, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn bad_flags_fail_before_any_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/subscriptions");
            then.status(200).header("Fiware-Total-Count", "0");
        });
        let client = client(&server.base_url(), Dialect::V2);

        let opts = ListOpts {
            output: ListArgs {
                verbose: true,
                items: Some("bogus".into()),
                ..ListArgs::default()
            },
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        let err = list(&client, &opts, &mut out).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownField);
        assert!(err.message.contains("bogus"));
        assert!(out.is_empty());

        let opts = ListOpts {
            status: Some("paused".into()),
            ..ListOpts::default()
        };
        let err = list(&client, &opts, &mut out).unwrap_err();
        assert!(err.is("filter_spec", 1));

        mock.assert_hits(0);
    }

    #[test]
    fn ld_listing_uses_ld_statuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/ngsi-ld/v1/subscriptions/")
                .query_param("count", "true");
            then.status(200)
                .header("NGSILD-Results-Count", "2")
                .json_body(json!([
                    {"id": "urn:ngsi-ld:Subscription:1", "type": "Subscription", "status": "paused",
                     "notification": {"endpoint": {"uri": "http://a"}}},
                    {"id": "urn:ngsi-ld:Subscription:2", "type": "Subscription", "status": "active",
                     "notification": {"endpoint": {"uri": "http://b"}}}
                ]));
        });

        let opts = ListOpts {
            status: Some("paused".into()),
            output: ListArgs {
                verbose: true,
                items: Some("uri".into()),
                ..ListArgs::default()
            },
            ..ListOpts::default()
        };
        let mut out = Vec::new();
        list(&client(&server.base_url(), Dialect::Ld), &opts, &mut out).unwrap();
        assert_eq!(output(out), "urn:ngsi-ld:Subscription:1 http://a\n");
    }

    #[test]
    fn get_prints_compact_or_pretty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/subscriptions/abc");
            then.status(200).json_body(json!({"id": "abc", "status": "active"}));
        });
        let client = client(&server.base_url(), Dialect::V2);

        let mut out = Vec::new();
        get(&client, "abc", false, false, &mut out).unwrap();
        assert_eq!(output(out), "{\"id\":\"abc\",\"status\":\"active\"}\n");

        let mut out = Vec::new();
        get(&client, "abc", true, false, &mut out).unwrap();
        assert_eq!(output(out), "{\n  \"id\": \"abc\",\n  \"status\": \"active\"\n}\n");
    }

    #[test]
    fn get_not_found_names_the_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/subscriptions/nope");
            then.status(404).body("{}");
        });
        let mut out = Vec::new();
        let err = get(&client(&server.base_url(), Dialect::V2), "nope", false, false, &mut out).unwrap_err();
        assert!(err.is("get_subscription", 2));
        assert_eq!(err.message, "404 Not Found {} nope");
    }

    #[test]
    fn create_prints_new_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/subscriptions")
                .json_body(json!({"description": "test"}));
            then.status(201).header("Location", "/v2/subscriptions/5f6a8a0c");
        });
        let mut out = Vec::new();
        create(&client(&server.base_url(), Dialect::V2), r#"{"description":"test"}"#, &mut out).unwrap();
        mock.assert();
        assert_eq!(output(out), "5f6a8a0c\n");
    }

    #[test]
    fn create_rejects_non_object() {
        let mut out = Vec::new();
        let err = create(&client("http://127.0.0.1:1", Dialect::V2), "[1]", &mut out).unwrap_err();
        assert!(err.is("create_subscription", 1));
    }

    #[test]
    fn delete_and_count() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/v2/subscriptions/abc");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/v2/subscriptions/gone");
            then.status(404).body("not found");
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/v2/subscriptions")
                .query_param("limit", "1");
            then.status(200).header("Fiware-Total-Count", "12").body("[]");
        });
        let client = client(&server.base_url(), Dialect::V2);

        delete(&client, "abc").unwrap();
        assert!(delete(&client, "gone").unwrap_err().is("delete_subscription", 2));

        let mut out = Vec::new();
        count(&client, &mut out).unwrap();
        assert_eq!(output(out), "12\n");
    }
}
