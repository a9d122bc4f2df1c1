//! Parameters carried by the OAuth redirect back to `/auth/callback`.
//!
//! Providers put them either in the query string or in the fragment, so both
//! are kept and every lookup names which side it prefers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

const RELATIVE_BASE: &str = "http://localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    full_url: String,
    search: String,
    hash: String,
    query: Vec<(String, String)>,
    fragment: Vec<(String, String)>,
}

impl CallbackParams {
    /// Parses an absolute URL or a path such as `/auth/callback?code=abc`.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(RELATIVE_BASE)?;
        let url = base.join(raw.trim())?;

        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let fragment: Vec<(String, String)> = url
            .fragment()
            .map(|f| {
                form_urlencoded::parse(f.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            full_url: raw.trim().to_string(),
            search: url.query().map(|q| format!("?{q}")).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
            query,
            fragment,
        })
    }

    /// Empty values count as absent.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        find(&self.query, name)
    }

    pub fn fragment_param(&self, name: &str) -> Option<&str> {
        find(&self.fragment, name)
    }

    pub fn query_then_fragment(&self, name: &str) -> Option<&str> {
        self.query_param(name).or_else(|| self.fragment_param(name))
    }

    pub fn fragment_then_query(&self, name: &str) -> Option<&str> {
        self.fragment_param(name).or_else(|| self.query_param(name))
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.fragment.is_empty()
    }

    pub fn debug_info(&self, captured_at: DateTime<Utc>) -> CallbackDebugInfo {
        CallbackDebugInfo {
            full_url: self.full_url.clone(),
            search: self.search.clone(),
            hash: self.hash.clone(),
            search_params: self.query.iter().cloned().collect(),
            hash_params: self.fragment.iter().cloned().collect(),
            captured_at,
        }
    }
}

fn find<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.as_str())
}

/// Snapshot shown on the callback page for troubleshooting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackDebugInfo {
    pub full_url: String,
    pub search: String,
    pub hash: String,
    pub search_params: BTreeMap<String, String>,
    pub hash_params: BTreeMap<String, String>,
    pub captured_at: DateTime<Utc>,
}

impl CallbackDebugInfo {
    /// Debug info for a URL that could not be parsed at all.
    pub fn unparsed(raw: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            full_url: raw.to_string(),
            search: String::new(),
            hash: String::new(),
            search_params: BTreeMap::new(),
            hash_params: BTreeMap::new(),
            captured_at,
        }
    }
}
