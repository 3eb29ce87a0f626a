//! Hits and collections, from raw service output to display-ready records

use crate::error::FetchError;
use crate::route::Route;
use std::collections::BTreeMap;
use std::ops::Range;

/// A named, independently ranked set of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    /// Cheatsheets (GitHub issues)
    Content,
    /// Labels attached to cheatsheets
    Tag,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Content, Collection::Tag];

    pub fn default_index_name(&self) -> &'static str {
        match self {
            Collection::Content => "cheatsheets_issues",
            Collection::Tag => "cheatsheets_labels",
        }
    }

    /// Group heading shown above this collection's hits
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Content => "Cheatsheets",
            Collection::Tag => "Labels",
        }
    }

    pub fn primary_field(&self) -> &'static str {
        match self {
            Collection::Content => "title",
            Collection::Tag => "name",
        }
    }

    pub fn secondary_field(&self) -> &'static str {
        match self {
            Collection::Content => "body",
            Collection::Tag => "description",
        }
    }

    pub fn display_fields(&self) -> [&'static str; 2] {
        [self.primary_field(), self.secondary_field()]
    }

    pub fn route(&self, id: &str) -> Route {
        Route::for_hit(*self, id)
    }
}

/// A hit as the search service returns it: plain field values and the byte
/// ranges of each field that matched the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawHit {
    pub id: String,
    pub fields: BTreeMap<String, String>,
    pub matches: BTreeMap<String, Vec<Range<usize>>>,
}

impl RawHit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_match(mut self, name: &str, span: Range<usize>) -> Self {
        self.matches.entry(name.to_string()).or_default().push(span);
        self
    }
}

/// One field of a hit, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayField {
    pub plain: String,
    /// Escaped text with matched ranges wrapped in the highlight marker
    pub markup: String,
    /// Normalized matched ranges into `plain`
    pub spans: Vec<Range<usize>>,
}

impl DisplayField {
    /// Split `plain` into `(text, matched)` segments, for surfaces that style
    /// matches themselves instead of rendering markup.
    pub fn segments(&self) -> Vec<(&str, bool)> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        for span in &self.spans {
            if span.start > cursor {
                segments.push((&self.plain[cursor..span.start], false));
            }
            segments.push((&self.plain[span.clone()], true));
            cursor = span.end;
        }
        if cursor < self.plain.len() {
            segments.push((&self.plain[cursor..], false));
        }
        segments
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hit {
    pub id: String,
    pub display_fields: BTreeMap<String, DisplayField>,
}

impl Hit {
    pub fn field(&self, name: &str) -> Option<&DisplayField> {
        self.display_fields.get(name)
    }

    pub fn primary(&self, collection: Collection) -> Option<&DisplayField> {
        self.field(collection.primary_field())
    }

    pub fn secondary(&self, collection: Collection) -> Option<&DisplayField> {
        self.field(collection.secondary_field())
    }
}

/// Shaped results of one collection for one logical query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCollection {
    pub collection: Collection,
    pub hits: Vec<Hit>,
    pub loading: bool,
    pub estimated_total: usize,
    /// Set when the collection degraded to empty because its call failed
    pub error: Option<String>,
}

impl ResultCollection {
    pub fn empty(collection: Collection) -> Self {
        Self {
            collection,
            hits: Vec::new(),
            loading: false,
            estimated_total: 0,
            error: None,
        }
    }

    pub fn failed(collection: Collection, error: &FetchError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::empty(collection)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
