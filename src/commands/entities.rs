//! Entity, entity type and broker version lookups.

use std::io::Write;

use clap::Args;
use serde::Deserialize;

use super::{ListArgs, print_line, run_list};
use crate::client::ApiClient;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NgsiError, Result};
use crate::filter::FilterSpec;
use crate::paginate::{DEFAULT_PAGE_SIZE, collect, remote_count};
use crate::render::{RenderMode, render};
use crate::resource::{Entity, EntityType};

/// Server-side entity selection shared by `list` and `count`.
#[derive(Args, Debug, Clone, Default)]
pub struct Selector {
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub entity_type: Option<String>,
    #[arg(long, value_name = "REGEX", help = "Entity id pattern")]
    pub id_pattern: Option<String>,
    #[arg(long, short = 'q', value_name = "EXPR", help = "Attribute query expression")]
    pub q: Option<String>,
}

impl Selector {
    fn query(&self) -> Vec<(String, String)> {
        [
            ("type", &self.entity_type),
            ("idPattern", &self.id_pattern),
            ("q", &self.q),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListOpts {
    #[command(flatten)]
    pub selector: Selector,
    #[command(flatten)]
    pub output: ListArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct TypesOpts {
    #[arg(long, short = 'j')]
    pub json: bool,
    #[arg(long, short = 'P')]
    pub pretty: bool,
}

pub fn list<W: Write>(client: &ApiClient, opts: &ListOpts, out: &mut W) -> Result<()> {
    run_list::<Entity, W>(
        client,
        "/entities",
        &opts.selector.query(),
        &FilterSpec::default(),
        &opts.output,
        out,
    )
}

pub fn count<W: Write>(client: &ApiClient, selector: &Selector, out: &mut W) -> Result<()> {
    let total = remote_count(client, "/entities", &selector.query())?;
    print_line(out, total)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityTypeList {
    #[serde(default)]
    type_list: Vec<String>,
}

pub fn types<W: Write>(client: &ApiClient, opts: &TypesOpts, out: &mut W) -> Result<()> {
    let mode = RenderMode::from_flags(false, opts.json, opts.pretty, false, Vec::new());
    let types = match client.dialect() {
        Dialect::V2 => {
            let query = vec![("options".to_string(), "values".to_string())];
            collect::<EntityType>(client, "/types", DEFAULT_PAGE_SIZE, &query)?
        }
        Dialect::Ld => ld_types(client)?,
    };
    render(&types, &mode, None, out)
}

/// LD answers `/types` with a single `EntityTypeList`, unpaged.
fn ld_types(client: &ApiClient) -> Result<Vec<EntityType>> {
    const SITE: &str = "ld_types";

    let response = client
        .get("/types", &[])
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(SITE, 2, ErrorKind::HttpStatus, response.status_text()));
    }

    let list: EntityTypeList = serde_json::from_str(&response.body)
        .map_err(|e| NgsiError::wrap(SITE, 3, ErrorKind::Decode, e))?;
    Ok(list.type_list.into_iter().map(EntityType).collect())
}

pub fn version<W: Write>(client: &ApiClient, out: &mut W) -> Result<()> {
    const SITE: &str = "version";

    let response = client
        .get_root("/version")
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(SITE, 2, ErrorKind::HttpStatus, response.status_text()));
    }
    print_line(out, response.body.trim_end())
}
