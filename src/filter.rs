use regex::Regex;

use crate::error::{ErrorKind, NgsiError, Result};
use crate::resource::Resource;

/// Client-side narrowing applied once the whole listing is collected.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    status: Option<Vec<String>>,
    query: Option<Regex>,
}

impl FilterSpec {
    /// Validates `--status` against `allowed` and compiles `--query`.
    pub fn new(status: Option<&str>, allowed: &[&str], query: Option<&str>) -> Result<Self> {
        const SITE: &str = "filter_spec";

        let status = match status {
            Some(list) => {
                let mut wanted = Vec::new();
                for s in list.split(',') {
                    let s = s.trim().to_lowercase();
                    if !allowed.contains(&s.as_str()) {
                        return Err(NgsiError::new(
                            SITE,
                            1,
                            ErrorKind::Validation,
                            format!("error: {} ({})", s, allowed.join(", ")),
                        ));
                    }
                    wanted.push(s);
                }
                Some(wanted)
            }
            None => None,
        };

        let query = query
            .map(Regex::new)
            .transpose()
            .map_err(|e| NgsiError::wrap(SITE, 2, ErrorKind::Validation, e))?;

        Ok(Self { status, query })
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.query.is_none()
    }

    pub fn matches<T: Resource>(&self, item: &T) -> bool {
        if let Some(wanted) = &self.status {
            let Some(status) = item.status() else {
                return false;
            };
            if !wanted.iter().any(|w| w.eq_ignore_ascii_case(status)) {
                return false;
            }
        }
        if let Some(re) = &self.query {
            match item.description() {
                Some(text) if re.is_match(text) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply<T: Resource>(&self, items: Vec<T>) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}
