use std::io::Write;

use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{ListArgs, id_from_location, print_json, print_line, read_data, run_list};
use crate::client::ApiClient;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NgsiError, Result};
use crate::filter::FilterSpec;
use crate::paginate::remote_count;
use crate::resource::Registration;

#[derive(Args, Debug, Clone, Default)]
pub struct ListOpts {
    #[arg(long, value_name = "REGEX", help = "Keep registrations whose description matches REGEX")]
    pub query: Option<String>,
    #[command(flatten)]
    pub output: ListArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TemplateOpts {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_name = "ID")]
    pub entity_id: Option<String>,
    #[arg(long, value_name = "TYPE")]
    pub entity_type: Option<String>,
    #[arg(long, value_name = "ATTR1,ATTR2")]
    pub attrs: Option<String>,
    #[arg(long, value_name = "URL", help = "Context provider endpoint (http or https)")]
    pub provider: Option<String>,
}

fn collection_name(dialect: Dialect) -> &'static str {
    dialect.registrations_path().trim_start_matches('/')
}

pub fn list<W: Write>(client: &ApiClient, opts: &ListOpts, out: &mut W) -> Result<()> {
    let filter = FilterSpec::new(None, &[], opts.query.as_deref())?;
    let path = client.dialect().registrations_path();
    run_list::<Registration, W>(client, path, &[], &filter, &opts.output, out)
}

pub fn get<W: Write>(client: &ApiClient, id: &str, pretty: bool, out: &mut W) -> Result<()> {
    const SITE: &str = "get_registration";

    let path = format!("{}/{id}", client.dialect().registrations_path());
    let response = client
        .get(&path, &[])
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(
            SITE,
            2,
            ErrorKind::HttpStatus,
            format!("{} {id}", response.status_text()),
        ));
    }

    let registration: Registration = serde_json::from_str(&response.body)
        .map_err(|e| NgsiError::wrap(SITE, 3, ErrorKind::Decode, e))?;
    print_json(&registration, pretty, out)
}

pub fn create<W: Write>(client: &ApiClient, data: &str, out: &mut W) -> Result<()> {
    const SITE: &str = "create_registration";

    let body = read_data(data)?;
    if !body.is_object() {
        return Err(NgsiError::new(SITE, 1, ErrorKind::Validation, "registration must be a JSON object"));
    }

    let dialect = client.dialect();
    let response = client
        .post_json(dialect.registrations_path(), &body)
        .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(SITE, 3, ErrorKind::HttpStatus, response.status_text()));
    }

    let location = response.header("Location").unwrap_or_default();
    info!(location, "registration created");
    print_line(out, id_from_location(location, collection_name(dialect)))
}

pub fn delete(client: &ApiClient, id: &str) -> Result<()> {
    const SITE: &str = "delete_registration";

    let path = format!("{}/{id}", client.dialect().registrations_path());
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

    info!(id, "registration deleted");
    Ok(())
}

pub fn count<W: Write>(client: &ApiClient, out: &mut W) -> Result<()> {
    let total = remote_count(client, client.dialect().registrations_path(), &[])?;
    print_line(out, total)
}

#[derive(Serialize)]
struct EntityRef {
    id: String,
    #[serde(rename = "type")]
    entity_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateV2 {
    description: String,
    data_provided: DataProvided,
    provider: ProviderV2,
}

#[derive(Serialize)]
struct DataProvided {
    entities: Vec<EntityRef>,
    attrs: Vec<String>,
}

#[derive(Serialize)]
struct ProviderV2 {
    http: Endpoint,
}

#[derive(Serialize)]
struct Endpoint {
    url: String,
}

#[derive(Serialize)]
struct TemplateLd {
    #[serde(rename = "type")]
    kind: &'static str,
    description: String,
    information: Vec<Information>,
    endpoint: String,
}

#[derive(Serialize)]
struct Information {
    entities: Vec<EntityRef>,
    properties: Vec<String>,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Prints a registration skeleton for `dialect`; flags replace the
/// placeholder values.
pub fn template<W: Write>(dialect: Dialect, opts: &TemplateOpts, out: &mut W) -> Result<()> {
    const SITE: &str = "registration_template";

    if let Some(provider) = &opts.provider
        && !is_http(provider)
    {
        return Err(NgsiError::new(
            SITE,
            1,
            ErrorKind::Validation,
            format!("provider url error: {provider}"),
        ));
    }

    let attrs = opts.attrs.as_deref().map(split_list);

    match dialect {
        Dialect::V2 => {
            let template = TemplateV2 {
                description: opts.description.clone().unwrap_or_else(|| "Registration template".into()),
                data_provided: DataProvided {
                    entities: vec![EntityRef {
                        id: opts.entity_id.clone().unwrap_or_default(),
                        entity_type: opts.entity_type.clone().unwrap_or_else(|| "Room".into()),
                    }],
                    attrs: attrs.unwrap_or_else(|| vec!["attr".into()]),
                },
                provider: ProviderV2 {
                    http: Endpoint {
                        url: opts.provider.clone().unwrap_or_else(|| "http://localhost:1234".into()),
                    },
                },
            };
            print_json(&template, false, out)
        }
        Dialect::Ld => {
            let template = TemplateLd {
                kind: "ContextSourceRegistration",
                description: opts.description.clone().unwrap_or_else(|| "registration template".into()),
                information: vec![Information {
                    entities: vec![EntityRef {
                        id: opts
                            .entity_id
                            .clone()
                            .unwrap_or_else(|| "urn:ngsi-ld:Registration:001".into()),
                        entity_type: opts.entity_type.clone().unwrap_or_else(|| "Registration".into()),
                    }],
                    properties: attrs.unwrap_or_else(|| vec!["attr".into()]),
                }],
                endpoint: opts.provider.clone().unwrap_or_else(|| "http://registration".into()),
            };
            print_json(&template, false, out)
        }
    }
}
