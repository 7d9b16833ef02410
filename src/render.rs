use std::borrow::Cow;
use std::io::Write;

use crate::error::{ErrorKind, NgsiError, Result};
use crate::localtime::LocalZone;
use crate::resource::Resource;

const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// One identifier per line.
    Plain,
    /// Space-joined columns, `id` first.
    Verbose(Vec<String>),
    Json,
    PrettyJson,
    Count,
}

impl RenderMode {
    /// Picks the mode from listing flags. `--count` wins over JSON, JSON over
    /// verbose.
    pub fn from_flags(count: bool, json: bool, pretty: bool, verbose: bool, columns: Vec<String>) -> Self {
        if count {
            RenderMode::Count
        } else if pretty {
            RenderMode::PrettyJson
        } else if json {
            RenderMode::Json
        } else if verbose {
            RenderMode::Verbose(columns)
        } else {
            RenderMode::Plain
        }
    }
}

/// Parses a `--items` list into verbose columns for `T`.
///
/// Names are case-insensitive. `id` is always the first column whether or not
/// it was listed.
pub fn parse_columns<T: Resource>(items: Option<&str>) -> Result<Vec<String>> {
    const SITE: &str = "parse_columns";

    let Some(list) = items else {
        return Ok(T::default_columns().iter().map(|c| c.to_string()).collect());
    };

    let allowed = T::columns();
    let mut columns = vec!["id".to_string()];
    for name in list.split(',') {
        let name = name.trim().to_lowercase();
        if name == "id" {
            continue;
        }
        if !allowed.contains(&name.as_str()) {
            return Err(NgsiError::new(
                SITE,
                1,
                ErrorKind::UnknownField,
                format!("error: {name} in --items"),
            ));
        }
        columns.push(name);
    }
    Ok(columns)
}

pub fn render<T, W>(items: &[T], mode: &RenderMode, zone: Option<&LocalZone>, out: &mut W) -> Result<()>
where
    T: Resource,
    W: Write,
{
    const SITE: &str = "render";

    let items: Cow<'_, [T]> = match zone {
        Some(zone) => {
            let mut copy = items.to_vec();
            copy.iter_mut().for_each(|item| item.localize(zone));
            Cow::Owned(copy)
        }
        None => Cow::Borrowed(items),
    };

    let io = |e: std::io::Error| NgsiError::wrap(SITE, 3, ErrorKind::Io, e);

    match mode {
        RenderMode::Plain => {
            for item in items.iter() {
                writeln!(out, "{}", item.id()).map_err(io)?;
            }
        }
        RenderMode::Verbose(columns) => {
            for item in items.iter() {
                writeln!(out, "{}", verbose_line(item, columns)).map_err(io)?;
            }
        }
        RenderMode::Json | RenderMode::PrettyJson => {
            // An empty listing prints nothing, not `[]`.
            if items.is_empty() {
                return Ok(());
            }
            let text = if *mode == RenderMode::PrettyJson {
                serde_json::to_string_pretty(&*items)
                    .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Encode, e))?
            } else {
                serde_json::to_string(&*items)
                    .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Encode, e))?
            };
            writeln!(out, "{text}").map_err(io)?;
        }
        RenderMode::Count => {
            writeln!(out, "{}", items.len()).map_err(io)?;
        }
    }

    Ok(())
}

fn verbose_line<T: Resource>(item: &T, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| match item.field(c) {
            Some(v) if !v.is_empty() => v,
            _ => PLACEHOLDER.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
