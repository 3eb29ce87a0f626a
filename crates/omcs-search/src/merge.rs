//! Shaping raw collection results and deciding what the surface shows
//!
//! The surface only ever shows one of: a loading indicator while a query is
//! outstanding, an explicit "no results" state when every collection came
//! back empty, or the non-empty collections as separate groups.

use crate::highlight::Highlighter;
use crate::hit::{Collection, Hit, ResultCollection};
use crate::multi_index::RawCollectionResult;
use std::collections::HashSet;

/// One non-empty collection, as rendered under its heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultGroup<'a> {
    pub collection: Collection,
    pub label: &'static str,
    pub hits: &'a [Hit],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchView<'a> {
    Loading,
    NoResults,
    Groups(Vec<ResultGroup<'a>>),
}

impl SearchView<'_> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SearchView::Loading)
    }

    pub fn groups(&self) -> &[ResultGroup<'_>] {
        match self {
            SearchView::Groups(groups) => groups,
            _ => &[],
        }
    }
}

/// Turn one collection's raw hits into display records. Hits repeating an
/// id already seen in this collection are dropped.
pub fn shape_collection(
    collection: Collection,
    raw: &RawCollectionResult,
    highlighter: &Highlighter,
    apply_highlight: bool,
) -> ResultCollection {
    let mut seen = HashSet::new();
    let hits = raw
        .hits
        .iter()
        .filter(|hit| seen.insert(hit.id.as_str()))
        .map(|hit| highlighter.highlight_hit(hit, apply_highlight))
        .collect();

    ResultCollection {
        collection,
        hits,
        loading: false,
        estimated_total: raw.estimated_total,
        error: None,
    }
}

/// Non-empty collections, in the order given.
pub fn group_results(collections: &[ResultCollection]) -> Vec<ResultGroup<'_>> {
    collections
        .iter()
        .filter(|c| !c.hits.is_empty())
        .map(|c| ResultGroup {
            collection: c.collection,
            label: c.collection.label(),
            hits: &c.hits,
        })
        .collect()
}

pub fn build_view(loading: bool, collections: &[ResultCollection]) -> SearchView<'_> {
    if loading || collections.iter().any(|c| c.loading) {
        return SearchView::Loading;
    }
    let groups = group_results(collections);
    if groups.is_empty() {
        SearchView::NoResults
    } else {
        SearchView::Groups(groups)
    }
}
