use thiserror::Error;

/// Failure of a single remote call made on behalf of a search or a feed.
///
/// Responses that arrive after a newer request superseded them are not
/// errors; they are dropped where they are received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// One collection or one page could not be fetched. The caller renders
    /// that part as empty, or retries the page on the next `load_more`.
    #[error("{target}: {message}")]
    Transient { target: String, message: String },

    /// The whole pipeline is unreachable (no worker, no configuration).
    #[error("search pipeline unreachable: {0}")]
    Terminal(String),
}

impl FetchError {
    pub fn transient(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        FetchError::Transient {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        FetchError::Terminal(message.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }
}
