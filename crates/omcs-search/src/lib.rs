//! Client-side orchestration for the omcs cheatsheet library.
//!
//! Keystrokes go through a [`SearchSession`], which debounces them into
//! queries for a background worker. The worker fans each query out to the
//! content and tag collections in parallel, and the session only applies the
//! results of the newest query. Long lists are driven by an
//! [`InfiniteFeedController`], which pages through a [`ContentSource`] one
//! page at a time.
//!
//! Nothing in this crate talks to the network; the search service and the
//! content API are traits implemented elsewhere.

pub mod cache;
pub mod cursor;
pub mod debounce;
pub mod error;
pub mod feed;
pub mod highlight;
pub mod hit;
pub mod merge;
pub mod multi_index;
pub mod route;
pub mod session;

pub use cache::PageCache;
pub use cursor::{PageKey, PageState, PaginationCursor};
pub use debounce::{QueryDebouncer, DEFAULT_QUIET_PERIOD};
pub use error::FetchError;
pub use feed::{
    spawn_page_worker, ContentSource, FeedItem, InfiniteFeedController, ListRequest, Listing,
    PageRequest, PageResponse,
};
pub use highlight::{Highlighter, Marker};
pub use hit::{Collection, DisplayField, Hit, RawHit, ResultCollection};
pub use merge::{build_view, group_results, ResultGroup, SearchView};
pub use multi_index::{
    CollectionRequest, CollectionSpec, MultiIndexSearchClient, RawCollectionResult,
    SearchService, FULL_HITS_PER_PAGE, TYPEAHEAD_HITS_PER_PAGE,
};
pub use route::{Navigator, Route};
pub use session::{spawn_search_worker, SearchQuery, SearchResults, SearchSession};
