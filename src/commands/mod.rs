pub mod broker;
pub mod entities;
pub mod registrations;
pub mod subscriptions;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::client::ApiClient;
use crate::config::{self, Overrides};
use crate::error::{ErrorKind, NgsiError, Result};
use crate::filter::FilterSpec;
use crate::localtime::LocalZone;
use crate::paginate::{DEFAULT_PAGE_SIZE, collect};
use crate::render::{RenderMode, parse_columns, render};
use crate::resource::Resource;

/// What every command needs to reach a broker.
#[derive(Debug, Clone)]
pub struct Context {
    pub cwd: PathBuf,
    pub overrides: Overrides,
}

impl Context {
    pub fn connect(&self) -> Result<ApiClient> {
        let target = config::resolve(&self.cwd, &self.overrides)
            .map_err(|e| NgsiError::new("connect", 1, ErrorKind::Config, format!("{e:#}")))?;
        ApiClient::new(&target)
    }
}

/// Output flags shared by the `list` subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, value_name = "ITEM1,ITEM2", help = "Columns for --verbose (id is always first)")]
    pub items: Option<String>,
    #[arg(long, short = 'v', help = "One line per item with several columns")]
    pub verbose: bool,
    #[arg(long, short = 'j', help = "Print the listing as one JSON array")]
    pub json: bool,
    #[arg(long, short = 'P', help = "Print the listing as indented JSON")]
    pub pretty: bool,
    #[arg(long, help = "Show timestamps in local time")]
    pub local_time: bool,
    #[arg(long, short = 'C', help = "Print only the number of matching items")]
    pub count: bool,
}

impl ListArgs {
    pub fn zone(&self) -> Option<LocalZone> {
        self.local_time.then_some(LocalZone::System)
    }

    /// Validates flags and builds the render mode before anything is fetched.
    pub fn mode<T: Resource>(&self) -> Result<RenderMode> {
        let columns = parse_columns::<T>(self.items.as_deref())?;
        Ok(RenderMode::from_flags(
            self.count,
            self.json,
            self.pretty,
            self.verbose,
            columns,
        ))
    }
}

/// Collect, filter and print one listing.
pub fn run_list<T, W>(
    client: &ApiClient,
    path: &str,
    extra_query: &[(String, String)],
    filter: &FilterSpec,
    args: &ListArgs,
    out: &mut W,
) -> Result<()>
where
    T: Resource,
    W: Write,
{
    let mode = args.mode::<T>()?;
    let items = collect::<T>(client, path, DEFAULT_PAGE_SIZE, extra_query)?;
    let items = filter.apply(items);
    tracing::debug!(path, shown = items.len(), "listing filtered");
    render(&items, &mode, args.zone().as_ref(), out)
}

/// Reads `--data`: inline JSON, or `@path` to read it from a file.
pub fn read_data(data: &str) -> Result<Value> {
    const SITE: &str = "read_data";

    let text = match data.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            NgsiError::new(SITE, 1, ErrorKind::Io, format!("reading {path}: {e}")).with_source(e)
        })?,
        None => data.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Validation, e))
}

pub fn print_json<T, W>(value: &T, pretty: bool, out: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    const SITE: &str = "print_json";

    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Encode, e))?;
    writeln!(out, "{text}").map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Io, e))
}

pub fn print_line<W: Write>(out: &mut W, line: impl std::fmt::Display) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| NgsiError::wrap("print_line", 1, ErrorKind::Io, e))
}

/// Resource id from a `Location` header such as `/v2/subscriptions/<id>`.
pub fn id_from_location(location: &str, collection: &str) -> String {
    match location.rfind(&format!("{collection}/")) {
        Some(pos) => location[pos + collection.len() + 1..].to_string(),
        None => location.to_string(),
    }
}
