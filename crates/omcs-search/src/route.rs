//! Canonical routes for search hits

use crate::hit::Collection;
use std::fmt;

/// Where selecting a hit takes the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// A single cheatsheet (issue) detail page
    Sheet(String),
    /// The cheatsheets filed under one label
    Label(String),
}

impl Route {
    pub fn for_hit(collection: Collection, id: &str) -> Self {
        match collection {
            Collection::Content => Route::Sheet(id.to_string()),
            Collection::Tag => Route::Label(id.to_string()),
        }
    }

    /// Route pattern with the id left as a placeholder
    pub fn pattern(&self) -> &'static str {
        match self {
            Route::Sheet(_) => "/sheet/id/[id]",
            Route::Label(_) => "/sheet/label/[id]",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Route::Sheet(id) | Route::Label(id) => id,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Sheet(id) => format!("/sheet/id/{}", id),
            Route::Label(id) => format!("/sheet/label/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Routing collaborator owned by the rendering surface.
pub trait Navigator {
    fn navigate(&self, route: &Route);
}
