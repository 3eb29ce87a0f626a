//! Cheatsheets (issues) and tags (labels) from the GitHub REST API

use crate::config::Config;
use anyhow::{Context, Result};
use omcs_search::{ContentSource, FeedItem, FetchError, ListRequest, Listing};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, LINK};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// Largest `per_page` the API honors
pub const MAX_PER_PAGE: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    pub updated_at: String,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLabel {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: String,
}

impl FeedItem for Issue {
    fn feed_id(&self) -> String {
        self.number.to_string()
    }
}

impl FeedItem for Label {
    fn feed_id(&self) -> String {
        self.id.to_string()
    }
}

pub struct GithubClient {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: Option<String>,
    /// Label id to name, filled as ids are resolved
    label_names: Mutex<HashMap<String, String>>,
}

impl GithubClient {
    pub fn new(
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(crate::USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            owner: owner.into(),
            repo: repo.into(),
            token,
            label_names: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (owner, repo) = config.repo_parts()?;
        Self::new(&config.github.api_url, owner, repo, config.github.token.clone())
    }

    /// URL of one page of `resource` under the repository.
    pub fn page_url(
        &self,
        resource: &str,
        request: &ListRequest,
        extra: &[(&str, &str)],
    ) -> Result<Url> {
        let base = format!(
            "{}/repos/{}/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            resource
        );
        let (page, per_page) = page_params(request);
        let mut url = Url::parse(&base).with_context(|| format!("Invalid API URL: {}", base))?;
        url.query_pairs_mut()
            .extend_pairs(extra)
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    /// URL of one page of open issues, most recently updated first,
    /// optionally under the label named `label_name`.
    pub fn issues_url(&self, request: &ListRequest, label_name: Option<&str>) -> Result<Url> {
        let mut extra = vec![("state", "open"), ("sort", "updated"), ("direction", "desc")];
        if let Some(name) = label_name {
            extra.push(("labels", name));
        }
        self.page_url("issues", request, &extra)
    }

    /// Name of the label with id `id`. Routes and feed partitions carry label
    /// ids, while the issues endpoint filters by name.
    pub fn label_name(&self, id: &str) -> Result<String> {
        if let Some(name) = self.label_names().get(id) {
            return Ok(name.clone());
        }
        let name = find_label_name(id, |request| {
            ContentSource::<Label>::list_by_cursor(self, request).map_err(anyhow::Error::from)
        })?;
        log::debug!("Label {} is '{}'", id, name);
        self.label_names().insert(id.to_string(), name.clone());
        Ok(name)
    }

    fn label_names(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.label_names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_issues(&self, request: &ListRequest) -> Result<Listing<Issue>> {
        let label_name = request
            .partition
            .as_deref()
            .map(|id| self.label_name(id))
            .transpose()?;
        let url = self.issues_url(request, label_name.as_deref())?;
        self.fetch_page(url)
    }

    fn fetch_page<T: DeserializeOwned>(&self, url: Url) -> Result<Listing<T>> {
        log::debug!("GET {}", url);
        let mut builder = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().context("Failed to send GitHub request")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            anyhow::bail!("GitHub request failed ({}): {}", status, error_text);
        }

        let has_next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .is_some_and(has_next_link);
        let hits: Vec<T> = response.json().context("Invalid GitHub response")?;
        Ok(Listing {
            hits,
            is_last: !has_next,
        })
    }
}

impl ContentSource<Issue> for GithubClient {
    /// Open issues, most recently updated first. The partition is a label id.
    fn list_by_cursor(&self, request: &ListRequest) -> Result<Listing<Issue>, FetchError> {
        self.list_issues(request)
            .map_err(|e| FetchError::transient("issues", format!("{:#}", e)))
    }
}

impl ContentSource<Label> for GithubClient {
    fn list_by_cursor(&self, request: &ListRequest) -> Result<Listing<Label>, FetchError> {
        self.page_url("labels", request, &[])
            .and_then(|url| self.fetch_page(url))
            .map_err(|e| FetchError::transient("labels", format!("{:#}", e)))
    }
}

/// Walk the label list page by page until the label with id `id` shows up.
pub fn find_label_name(
    id: &str,
    mut list: impl FnMut(&ListRequest) -> Result<Listing<Label>>,
) -> Result<String> {
    let mut offset = 0;
    loop {
        let request = ListRequest {
            partition: None,
            offset,
            limit: MAX_PER_PAGE,
        };
        let listing = list(&request)?;
        if let Some(label) = listing.hits.iter().find(|label| label.id.to_string() == id) {
            return Ok(label.name.clone());
        }
        if listing.is_last || listing.hits.len() < MAX_PER_PAGE {
            anyhow::bail!("No label with id {}", id);
        }
        offset += MAX_PER_PAGE;
    }
}

/// 1-based page number and page size for an offset/limit request.
fn page_params(request: &ListRequest) -> (usize, usize) {
    let per_page = request.limit.clamp(1, MAX_PER_PAGE);
    if request.limit > MAX_PER_PAGE {
        log::warn!(
            "Page size {} exceeds the API maximum, using {}",
            request.limit,
            MAX_PER_PAGE
        );
    }
    (request.offset / per_page + 1, per_page)
}

/// Whether a `Link` header advertises a next page.
pub fn has_next_link(header: &str) -> bool {
    header.split(',').any(|link| {
        link.split(';')
            .skip(1)
            .any(|param| param.trim() == "rel=\"next\"")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use omcs_search::{Collection, Highlighter, PageState, PaginationCursor, RawHit, Route};

    fn client() -> GithubClient {
        GithubClient::new("https://api.github.com/", "someone", "cheatsheets", None).unwrap()
    }

    fn list(partition: Option<&str>, offset: usize, limit: usize) -> ListRequest {
        ListRequest {
            partition: partition.map(str::to_string),
            offset,
            limit,
        }
    }

    #[test]
    fn test_page_url_from_offset() {
        let url = client()
            .page_url("labels", &list(None, 40, 20), &[])
            .unwrap();
        insta::assert_snapshot!(
            url.as_str(),
            @"https://api.github.com/repos/someone/cheatsheets/labels?per_page=20&page=3"
        );
    }

    fn label(id: u64, name: &str) -> Label {
        Label {
            id,
            name: name.to_string(),
            description: None,
            color: String::new(),
        }
    }

    #[test]
    fn test_issue_url_filters_by_label() {
        let url = client()
            .issues_url(&list(Some("12"), 0, 20), Some("docker compose"))
            .unwrap();
        assert_eq!(
            url.query(),
            Some("state=open&sort=updated&direction=desc&labels=docker+compose&per_page=20&page=1")
        );
    }

    #[test]
    fn test_tag_hit_route_opens_label_feed() {
        let hit = Highlighter::default()
            .highlight_hit(&RawHit::new("99").with_field("name", "terminal"), false);
        let route = Route::for_hit(Collection::Tag, &hit.id);
        assert_eq!(route.path(), "/sheet/label/99");

        let cursor = PaginationCursor::new("issues", 20).with_partition(route.id());
        let key = cursor.next_key::<Issue>(0, None).unwrap();
        let request = ListRequest {
            partition: cursor.partition().map(str::to_string),
            offset: cursor.offset(&key),
            limit: cursor.page_size(),
        };

        let mut offsets = Vec::new();
        let name = find_label_name(request.partition.as_deref().unwrap(), |labels| {
            offsets.push(labels.offset);
            let hits = if labels.offset == 0 {
                (1000..1100).map(|id| label(id, "other")).collect()
            } else {
                vec![label(7, "git"), label(99, "terminal")]
            };
            Ok(Listing {
                hits,
                is_last: labels.offset > 0,
            })
        })
        .unwrap();
        assert_eq!(name, "terminal");
        assert_eq!(offsets, vec![0, 100]);

        let url = client().issues_url(&request, Some(&name)).unwrap();
        assert_eq!(
            url.query(),
            Some("state=open&sort=updated&direction=desc&labels=terminal&per_page=20&page=1")
        );
    }

    #[test]
    fn test_unknown_label_id_is_an_error() {
        let err = find_label_name("5", |_| {
            Ok(Listing {
                hits: vec![label(1, "git")],
                is_last: true,
            })
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "No label with id 5");
    }

    #[test]
    fn test_resolved_label_name_is_reused() {
        let github = GithubClient::new("http://127.0.0.1:9", "a", "b", None).unwrap();
        github.label_names().insert("99".to_string(), "terminal".to_string());
        assert_eq!(github.label_name("99").unwrap(), "terminal");
        assert!(github.label_name("100").is_err());
    }

    #[test]
    fn test_page_size_is_capped() {
        assert_eq!(page_params(&list(None, 0, 250)), (1, 100));
        assert_eq!(page_params(&list(None, 200, 100)), (3, 100));
    }

    #[test]
    fn test_largest_cursor_page_matches_api_page() {
        let cursor = PaginationCursor::new("issues", MAX_PER_PAGE);
        let key = cursor.next_key::<Issue>(1, None).unwrap();
        let request = list(None, cursor.offset(&key), cursor.page_size());
        assert_eq!(page_params(&request), (2, MAX_PER_PAGE));

        let full = PageState::new(0, vec![0; MAX_PER_PAGE], false);
        assert!(!cursor.is_end(Some(&full)));
    }

    #[test]
    fn test_next_link_detection() {
        let header = r#"<https://api.github.com/repositories/1/issues?page=2>; rel="next", <https://api.github.com/repositories/1/issues?page=5>; rel="last""#;
        assert!(has_next_link(header));

        let last_page = r#"<https://api.github.com/repositories/1/issues?page=4>; rel="prev", <https://api.github.com/repositories/1/issues?page=1>; rel="first""#;
        assert!(!has_next_link(last_page));
        assert!(!has_next_link(""));
    }

    #[test]
    fn test_deserialize_issue_and_label() {
        let issue: Issue = serde_json::from_value(serde_json::json!({
            "number": 7,
            "title": "tmux",
            "body": null,
            "state": "open",
            "updated_at": "2022-03-01T10:00:00Z",
            "html_url": "https://github.com/someone/cheatsheets/issues/7",
            "labels": [{ "id": 99, "name": "terminal", "color": "ededed" }],
            "user": { "login": "someone" }
        }))
        .unwrap();
        assert_eq!(issue.feed_id(), "7");
        assert_eq!(issue.labels[0].name, "terminal");
        assert!(issue.body.is_none());

        let label: Label = serde_json::from_value(serde_json::json!({
            "id": 99,
            "name": "terminal",
            "color": "ededed"
        }))
        .unwrap();
        assert_eq!(label.feed_id(), "99");
        assert_eq!(label.description, None);
    }

    #[test]
    fn test_unreachable_api_is_transient() {
        let github = GithubClient::new("http://127.0.0.1:9", "a", "b", None).unwrap();
        let err = ContentSource::<Label>::list_by_cursor(&github, &list(None, 0, 20)).unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().starts_with("labels: "));
    }
}
