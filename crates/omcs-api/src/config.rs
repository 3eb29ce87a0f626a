use crate::github::MAX_PER_PAGE;
use anyhow::{Context, Result};
use omcs_search::{CollectionSpec, DEFAULT_QUIET_PERIOD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub github: GithubConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub app_id: Option<String>,
    /// Search-only key; never an admin key
    pub api_key: Option<String>,
    /// Overrides the host derived from `app_id`
    pub url: Option<String>,
    pub content_index: String,
    pub tag_index: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            api_key: None,
            url: None,
            content_index: CollectionSpec::content().index_name,
            tag_index: CollectionSpec::tags().index_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// `owner/name` of the repository holding the cheatsheets
    pub repo: Option<String>,
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            token: None,
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
    pub debounce_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce_ms: DEFAULT_QUIET_PERIOD.as_millis() as u64,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home_dir.join(".omcs").join("config.toml"))
}

impl Config {
    /// `~/.omcs/config.toml` (if present) with environment overrides applied.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// A feed page is one listing request, so its size must fit the API's
    /// `per_page` limit.
    pub fn validate(&self) -> Result<()> {
        let size = self.feed.page_size;
        if !(1..=MAX_PER_PAGE).contains(&size) {
            anyhow::bail!("feed.page_size must be between 1 and {}, got {}", MAX_PER_PAGE, size);
        }
        Ok(())
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |target: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key) {
                *target = Some(value);
            }
        };
        set(&mut self.search.app_id, "OMCS_SEARCH_APP_ID");
        set(&mut self.search.api_key, "OMCS_SEARCH_API_KEY");
        set(&mut self.search.url, "OMCS_SEARCH_URL");
        set(&mut self.github.repo, "OMCS_GITHUB_REPO");
        set(&mut self.github.token, "OMCS_GITHUB_TOKEN");

        if let Some(index) = lookup("OMCS_CONTENT_INDEX") {
            self.search.content_index = index;
        }
        if let Some(index) = lookup("OMCS_TAG_INDEX") {
            self.search.tag_index = index;
        }
        if let Some(url) = lookup("OMCS_GITHUB_API_URL") {
            self.github.api_url = url;
        }
        if let Some(size) = lookup("OMCS_PAGE_SIZE") {
            self.feed.page_size = size
                .parse()
                .with_context(|| format!("Invalid OMCS_PAGE_SIZE: {}", size))?;
        }
        if let Some(ms) = lookup("OMCS_DEBOUNCE_MS") {
            self.feed.debounce_ms = ms
                .parse()
                .with_context(|| format!("Invalid OMCS_DEBOUNCE_MS: {}", ms))?;
        }
        self.validate()
    }

    pub fn search_base_url(&self) -> Result<String> {
        if let Some(url) = &self.search.url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let app_id = self
            .search
            .app_id
            .as_deref()
            .context("No search application id (set OMCS_SEARCH_APP_ID or search.app_id)")?;
        Ok(format!("https://{}-dsn.algolia.net", app_id.to_lowercase()))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.feed.debounce_ms)
    }

    pub fn repo_parts(&self) -> Result<(&str, &str)> {
        let repo = self
            .github
            .repo
            .as_deref()
            .context("No repository configured (set OMCS_GITHUB_REPO or github.repo)")?;
        match repo.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok((owner, name))
            }
            _ => anyhow::bail!("Invalid repository '{}', expected owner/name", repo),
        }
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.search.api_key = config.search.api_key.as_deref().map(mask);
        config.github.token = config.github.token.as_deref().map(mask);
        config
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
