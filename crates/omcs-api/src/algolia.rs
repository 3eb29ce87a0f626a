//! Algolia-style hosted search over HTTP
//!
//! Matches are requested wrapped in control-character sentinels, which are
//! stripped back out into plain text plus byte spans. The caller's marker is
//! applied later, on our side, so the service never gets to decide about
//! escaping.

use crate::config::Config;
use anyhow::{Context, Result};
use omcs_search::{CollectionRequest, FetchError, RawCollectionResult, RawHit, SearchService};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;
use url::form_urlencoded;
use url::Url;

pub const PRE_TAG: &str = "\u{2}";
pub const POST_TAG: &str = "\u{3}";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AlgoliaSearch {
    client: Client,
    base_url: String,
    app_id: Option<String>,
    api_key: Option<String>,
}

impl AlgoliaSearch {
    pub fn new(
        base_url: impl Into<String>,
        app_id: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(crate::USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            app_id,
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.search_base_url()?,
            config.search.app_id.clone(),
            config.search.api_key.clone(),
        )
    }

    fn query_url(&self, index_name: &str) -> Result<Url> {
        let url = format!(
            "{}/1/indexes/{}/query",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(index_name)
        );
        Url::parse(&url).with_context(|| format!("Invalid search URL: {}", url))
    }

    fn query(&self, request: &CollectionRequest) -> Result<RawCollectionResult> {
        let mut builder = self
            .client
            .post(self.query_url(&request.index_name)?)
            .json(&serde_json::json!({ "params": encode_params(request) }));
        if let Some(app_id) = &self.app_id {
            builder = builder.header("X-Algolia-Application-Id", app_id);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.header("X-Algolia-API-Key", api_key);
        }

        let response = builder.send().context("Failed to send search request")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            anyhow::bail!("Search failed ({}): {}", status, error_text);
        }

        let body: QueryResponse = response.json().context("Invalid search response")?;
        Ok(body.into_raw(&request.attributes))
    }
}

impl SearchService for AlgoliaSearch {
    fn search(&self, request: &CollectionRequest) -> Result<RawCollectionResult, FetchError> {
        self.query(request)
            .map_err(|e| FetchError::transient(&request.index_name, format!("{:#}", e)))
    }
}

/// The `params` string of a query: form-encoded search parameters, JSON
/// arrays where the service expects lists.
pub fn encode_params(request: &CollectionRequest) -> String {
    let attributes = serde_json::to_string(&request.attributes).unwrap_or_default();
    let mut params = form_urlencoded::Serializer::new(String::new());
    params
        .append_pair("query", &request.term)
        .append_pair("hitsPerPage", &request.hits_per_page.to_string())
        .append_pair("attributesToRetrieve", &attributes);

    if request.highlight.is_some() {
        params
            .append_pair("attributesToHighlight", &attributes)
            .append_pair("highlightPreTag", PRE_TAG)
            .append_pair("highlightPostTag", POST_TAG);
    } else {
        params.append_pair("attributesToHighlight", "[]");
    }

    if !request.facet_filters.is_empty() {
        let filters = serde_json::to_string(&request.facet_filters).unwrap_or_default();
        params.append_pair("facetFilters", &filters);
    }
    params.finish()
}

/// Strip sentinel tags from a highlighted value, returning the plain text
/// and the byte ranges that were wrapped. An unclosed tag runs to the end.
pub fn parse_highlighted(value: &str) -> (String, Vec<Range<usize>>) {
    let mut plain = String::with_capacity(value.len());
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut rest = value;

    while !rest.is_empty() {
        let tag = if open.is_some() { POST_TAG } else { PRE_TAG };
        match rest.find(tag) {
            Some(pos) => {
                plain.push_str(&rest[..pos]);
                match open.take() {
                    Some(start) => spans.push(start..plain.len()),
                    None => open = Some(plain.len()),
                }
                rest = &rest[pos + tag.len()..];
            }
            None => {
                plain.push_str(rest);
                rest = "";
            }
        }
    }
    if let Some(start) = open {
        spans.push(start..plain.len());
    }
    spans.retain(|span| !span.is_empty());
    (plain, spans)
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    hits: Vec<AlgoliaHit>,
    #[serde(rename = "nbHits", default)]
    nb_hits: usize,
}

#[derive(Debug, Deserialize)]
struct AlgoliaHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(rename = "_highlightResult", default)]
    highlight_result: HashMap<String, Value>,
    #[serde(flatten)]
    attributes: HashMap<String, Value>,
}

impl QueryResponse {
    fn into_raw(self, fields: &[String]) -> RawCollectionResult {
        RawCollectionResult {
            hits: self.hits.into_iter().map(|hit| hit.into_raw(fields)).collect(),
            estimated_total: self.nb_hits,
        }
    }
}

impl AlgoliaHit {
    fn into_raw(self, fields: &[String]) -> RawHit {
        let mut raw = RawHit::new(self.object_id);
        for field in fields {
            let highlighted = self
                .highlight_result
                .get(field)
                .and_then(|h| h.get("value"))
                .and_then(Value::as_str);

            if let Some(value) = highlighted {
                let (plain, spans) = parse_highlighted(value);
                raw = raw.with_field(field, plain);
                for span in spans {
                    raw = raw.with_match(field, span);
                }
            } else if let Some(text) = self.attributes.get(field).and_then(value_text) {
                raw = raw.with_field(field, text);
            }
        }
        raw
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
