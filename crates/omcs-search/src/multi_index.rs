//! One logical search, fanned out to several collections at once

use crate::error::FetchError;
use crate::highlight::{Highlighter, Marker};
use crate::hit::{Collection, RawHit, ResultCollection};
use crate::merge::shape_collection;
use std::sync::Arc;
use std::thread;

/// Hits per collection in the typeahead dropdown
pub const TYPEAHEAD_HITS_PER_PAGE: usize = 3;
/// Hits per collection on the full results page
pub const FULL_HITS_PER_PAGE: usize = 10;

/// Facet filter restricting the content collection to open cheatsheets
pub const OPEN_STATE_FILTER: &str = "state:OPEN";

/// A query against a single index of the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub index_name: String,
    pub term: String,
    pub hits_per_page: usize,
    /// Fields to return for each hit
    pub attributes: Vec<String>,
    /// Marker pair to highlight with; `None` when the term is empty
    pub highlight: Option<Marker>,
    pub facet_filters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCollectionResult {
    pub hits: Vec<RawHit>,
    pub estimated_total: usize,
}

/// The hosted search service. One shared handle serves concurrent calls.
pub trait SearchService: Send + Sync {
    fn search(&self, request: &CollectionRequest) -> Result<RawCollectionResult, FetchError>;
}

/// How one collection is queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub collection: Collection,
    pub index_name: String,
    pub hits_per_page: usize,
    pub facet_filters: Vec<String>,
}

impl CollectionSpec {
    pub fn content() -> Self {
        Self {
            collection: Collection::Content,
            index_name: Collection::Content.default_index_name().to_string(),
            hits_per_page: TYPEAHEAD_HITS_PER_PAGE,
            facet_filters: vec![OPEN_STATE_FILTER.to_string()],
        }
    }

    pub fn tags() -> Self {
        Self {
            collection: Collection::Tag,
            index_name: Collection::Tag.default_index_name().to_string(),
            hits_per_page: TYPEAHEAD_HITS_PER_PAGE,
            facet_filters: Vec::new(),
        }
    }

    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn with_hits_per_page(mut self, hits_per_page: usize) -> Self {
        self.hits_per_page = hits_per_page;
        self
    }
}

pub struct MultiIndexSearchClient {
    service: Arc<dyn SearchService>,
    specs: Vec<CollectionSpec>,
    highlighter: Highlighter,
}

impl MultiIndexSearchClient {
    /// Client over the content and tag collections with typeahead caps.
    pub fn new(service: Arc<dyn SearchService>) -> Self {
        Self {
            service,
            specs: vec![CollectionSpec::content(), CollectionSpec::tags()],
            highlighter: Highlighter::default(),
        }
    }

    pub fn with_collections(mut self, specs: Vec<CollectionSpec>) -> Self {
        self.specs = specs;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Apply one hit cap to every collection.
    pub fn with_hits_per_page(mut self, hits_per_page: usize) -> Self {
        for spec in &mut self.specs {
            spec.hits_per_page = hits_per_page;
        }
        self
    }

    pub fn collections(&self) -> &[CollectionSpec] {
        &self.specs
    }

    pub fn request_for(&self, spec: &CollectionSpec, term: &str) -> CollectionRequest {
        CollectionRequest {
            index_name: spec.index_name.clone(),
            term: term.to_string(),
            hits_per_page: spec.hits_per_page,
            attributes: spec
                .collection
                .display_fields()
                .iter()
                .map(|f| f.to_string())
                .collect(),
            highlight: wants_highlight(term).then(|| self.highlighter.marker().clone()),
            facet_filters: spec.facet_filters.clone(),
        }
    }

    /// Query every collection in parallel. The result has one entry per
    /// collection, in configuration order. A failed collection comes back
    /// empty with its error recorded; it never fails the others.
    pub fn query(&self, term: &str) -> Vec<ResultCollection> {
        let apply = wants_highlight(term);

        thread::scope(|s| {
            let handles: Vec<_> = self
                .specs
                .iter()
                .map(|spec| {
                    let request = self.request_for(spec, term);
                    (spec.collection, s.spawn(move || self.service.search(&request)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(collection, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(FetchError::transient(
                            collection.default_index_name(),
                            "search call panicked",
                        ))
                    });
                    match result {
                        Ok(raw) => shape_collection(collection, &raw, &self.highlighter, apply),
                        Err(e) => {
                            log::warn!("{} search failed: {}", collection.label(), e);
                            ResultCollection::failed(collection, &e)
                        }
                    }
                })
                .collect()
        })
    }
}

fn wants_highlight(term: &str) -> bool {
    !term.trim().is_empty()
}
