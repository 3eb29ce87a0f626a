pub mod algolia;
pub mod config;
pub mod github;

pub use algolia::AlgoliaSearch;
pub use config::{Config, FeedConfig, GithubConfig, SearchConfig};
pub use github::{GithubClient, Issue, IssueLabel, Label};

const USER_AGENT: &str = concat!("omcs/", env!("CARGO_PKG_VERSION"));
