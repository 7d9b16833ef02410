//! Offset/limit listing against a broker.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::dialect::Dialect;
use crate::error::{ErrorKind, NgsiError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Reads the listing total the broker reports in a response header.
pub fn results_count(headers: &HeaderMap, dialect: Dialect) -> Result<u64> {
    const SITE: &str = "results_count";

    let name = dialect.count_header();
    let value = headers.get(name).ok_or_else(|| {
        NgsiError::new(SITE, 1, ErrorKind::CountHeaderMissing, format!("{name} header not found"))
    })?;

    let text = value
        .to_str()
        .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::CountParse, e))?;
    text.trim()
        .parse::<u64>()
        .map_err(|e| NgsiError::new(SITE, 2, ErrorKind::CountParse, format!("{name}: {text}")).with_source(e))
}

/// Fetches every page of `path` and returns the items in server order.
///
/// The total from the first page drives the loop; a total of zero ends the
/// listing with whatever was collected so far. Any failing page aborts the
/// whole listing.
pub fn collect<T>(
    client: &ApiClient,
    path: &str,
    page_size: usize,
    extra_query: &[(String, String)],
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    const SITE: &str = "collect";

    if page_size == 0 {
        return Err(NgsiError::new(SITE, 4, ErrorKind::Validation, "page size must be positive"));
    }

    let dialect = client.dialect();
    let mut accumulated: Vec<T> = Vec::new();
    let mut page = 0usize;

    loop {
        let mut query = extra_query.to_vec();
        dialect.request_count(&mut query);
        query.push(("limit".into(), page_size.to_string()));
        query.push(("offset".into(), (page * page_size).to_string()));

        let response = client
            .get(path, &query)
            .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
        if !response.is_success() {
            return Err(NgsiError::new(SITE, 2, ErrorKind::HttpStatus, response.status_text()));
        }

        let total = results_count(&response.headers, dialect)?;
        if total == 0 {
            break;
        }

        let items: Vec<T> = serde_json::from_str(&response.body)
            .map_err(|e| NgsiError::wrap(SITE, 3, ErrorKind::Decode, e))?;
        debug!(path, page, received = items.len(), total, "fetched page");
        let expected = total.saturating_sub((page * page_size) as u64).min(page_size as u64);
        if (items.len() as u64) < expected {
            warn!(
                path,
                page,
                received = items.len(),
                expected,
                "page shorter than the reported total implies"
            );
        }
        accumulated.extend(items);

        if ((page + 1) * page_size) as u64 >= total {
            break;
        }
        page += 1;
    }

    Ok(accumulated)
}

/// Asks the broker for the size of a collection without fetching it.
pub fn remote_count(client: &ApiClient, path: &str, extra_query: &[(String, String)]) -> Result<u64> {
    const SITE: &str = "remote_count";

    let dialect = client.dialect();
    let mut query = extra_query.to_vec();
    dialect.request_count(&mut query);
    query.push(("limit".into(), dialect.count_only_limit().to_string()));

    let response = client
        .get(path, &query)
        .map_err(|e| NgsiError::wrap(SITE, 1, ErrorKind::Transport, e))?;
    if !response.is_success() {
        return Err(NgsiError::new(SITE, 2, ErrorKind::HttpStatus, response.status_text()));
    }

    results_count(&response.headers, dialect)
}
