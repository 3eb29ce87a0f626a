//! Infinite-scroll feeds over a cursor-paginated content source
//!
//! Pages are fetched strictly one after another on a background worker. The
//! controller lives on the UI thread, polls for finished pages and appends
//! them, dropping items whose id it has already shown.

use crate::cache::PageCache;
use crate::cursor::{PageKey, PageState, PaginationCursor};
use crate::error::FetchError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Remaining items below which the surface should ask for the next page
pub const DEFAULT_PREFETCH_THRESHOLD: usize = 5;

/// Anything listed in a feed. The id must be stable for the item's lifetime
/// and unique within the source.
pub trait FeedItem {
    fn feed_id(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Restricts the listing, e.g. to the issues under one label
    pub partition: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    pub hits: Vec<T>,
    pub is_last: bool,
}

/// A stable collection sorted by last update, newest first.
pub trait ContentSource<T>: Send + Sync {
    fn list_by_cursor(&self, request: &ListRequest) -> Result<Listing<T>, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: PageKey,
    pub list: ListRequest,
}

#[derive(Debug)]
pub struct PageResponse<T> {
    pub key: PageKey,
    pub result: Result<Listing<T>, FetchError>,
}

/// Spawn a worker that serves page requests in the order received. Nothing is
/// posted back once `alive` is cleared.
pub fn spawn_page_worker<T: Send + 'static>(
    source: Arc<dyn ContentSource<T>>,
    request_rx: Receiver<PageRequest>,
    response_tx: Sender<PageResponse<T>>,
    alive: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(request) = request_rx.recv() {
            if !alive.load(Ordering::Acquire) {
                break;
            }

            log::debug!(
                "Fetching page {} (offset {}, limit {})",
                request.key,
                request.list.offset,
                request.list.limit
            );
            let result = source.list_by_cursor(&request.list);

            if !alive.load(Ordering::Acquire) {
                break;
            }
            let _ = response_tx.send(PageResponse {
                key: request.key,
                result,
            });
        }
    })
}

pub struct InfiniteFeedController<T> {
    cursor: PaginationCursor,
    cache: Arc<PageCache<T>>,
    pages: Vec<PageState<T>>,
    items: Vec<T>,
    seen: HashSet<String>,
    in_flight: Option<PageKey>,
    ended: bool,
    last_error: Option<FetchError>,
    threshold: usize,
    request_tx: Option<Sender<PageRequest>>,
    response_rx: Receiver<PageResponse<T>>,
    alive: Arc<AtomicBool>,
}

impl<T: FeedItem + Clone + Send + 'static> InfiniteFeedController<T> {
    /// Controller backed by its own page worker over `source`.
    pub fn spawn(source: Arc<dyn ContentSource<T>>, cursor: PaginationCursor) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));

        spawn_page_worker(source, request_rx, response_tx, alive.clone());
        Self::with_channels(cursor, request_tx, response_rx, alive)
    }
}

impl<T: FeedItem + Clone> InfiniteFeedController<T> {
    /// Controller talking to whatever serves `request_tx`.
    pub fn with_channels(
        cursor: PaginationCursor,
        request_tx: Sender<PageRequest>,
        response_rx: Receiver<PageResponse<T>>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cursor,
            cache: Arc::new(PageCache::default()),
            pages: Vec::new(),
            items: Vec::new(),
            seen: HashSet::new(),
            in_flight: None,
            ended: false,
            last_error: None,
            threshold: DEFAULT_PREFETCH_THRESHOLD,
            request_tx: Some(request_tx),
            response_rx,
            alive,
        }
    }

    /// Share resolved pages with other feeds over the same source.
    pub fn with_cache(mut self, cache: Arc<PageCache<T>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Seed page 0 with data fetched ahead of time, as a pre-rendered first
    /// page would be.
    pub fn with_initial_page(mut self, hits: Vec<T>, is_last: bool) -> Self {
        if self.pages.is_empty() {
            if let Some(key) = self.cursor.next_key::<T>(0, None) {
                let page = PageState::new(0, hits, is_last);
                self.cache.insert(key, page.clone());
                self.append(page);
            }
        }
        self
    }

    /// The concatenated feed, first occurrence of each id only.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn pages(&self) -> &[PageState<T>] {
        &self.pages
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn is_end(&self) -> bool {
        self.ended
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        !self.ended && !self.is_loading() && !self.is_closed()
    }

    /// Error of the most recent failed fetch, cleared by the next page that
    /// lands.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Ask for the next page. A no-op unless `has_more`. A page already in the
    /// cache is appended immediately. Returns whether anything happened.
    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }

        let index = self.pages.len();
        let Some(key) = self.cursor.next_key(index, self.pages.last()) else {
            self.ended = true;
            return false;
        };

        if let Some(page) = self.cache.get(&key) {
            log::trace!("Page {} served from cache", key);
            self.append(page);
            return true;
        }

        let request = PageRequest {
            list: ListRequest {
                partition: self.cursor.partition().map(str::to_string),
                offset: self.cursor.offset(&key),
                limit: self.cursor.page_size(),
            },
            key: key.clone(),
        };
        let sent = self
            .request_tx
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok());
        if !sent {
            self.fail_terminal();
            return false;
        }

        self.in_flight = Some(key);
        true
    }

    /// Scroll trigger: the surface reports how many items are left below the
    /// viewport.
    pub fn on_approaching_end(&mut self, remaining: usize) -> bool {
        remaining <= self.threshold && self.load_more()
    }

    /// Apply any finished pages without blocking. Returns how many landed.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.response_rx.try_recv() {
            if self.apply(response) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until the outstanding page lands or `timeout` passes.
    pub fn wait_for_page(&mut self, timeout: Duration) -> bool {
        if !self.is_loading() {
            return false;
        }
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => self.apply(response),
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                self.fail_terminal();
                false
            }
        }
    }

    fn apply(&mut self, response: PageResponse<T>) -> bool {
        if self.is_closed() {
            return false;
        }
        if self.in_flight.as_ref() != Some(&response.key) {
            log::trace!("Discarding response for page {} no longer awaited", response.key);
            return false;
        }
        self.in_flight = None;

        match response.result {
            Ok(listing) => {
                let page = PageState::new(response.key.index, listing.hits, listing.is_last);
                self.cache.insert(response.key, page.clone());
                self.append(page);
                true
            }
            Err(e) => {
                log::warn!("Failed to fetch page {}: {}", response.key, e);
                self.last_error = Some(e);
                false
            }
        }
    }

    fn append(&mut self, page: PageState<T>) {
        for item in &page.hits {
            if self.seen.insert(item.feed_id()) {
                self.items.push(item.clone());
            }
        }
        self.pages.push(page);
        self.ended = self.cursor.is_end(self.pages.last());
        self.last_error = None;
    }

    fn fail_terminal(&mut self) {
        log::warn!("Page worker is gone; feed {} stops here", self.cursor.namespace());
        self.in_flight = None;
        self.ended = true;
        self.last_error = Some(FetchError::terminal("page worker stopped"));
    }
}

impl<T> InfiniteFeedController<T> {
    /// Stop the worker. In-flight pages are never applied after this.
    pub fn close(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.request_tx = None;
    }

    pub fn is_closed(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }
}

impl<T> Drop for InfiniteFeedController<T> {
    fn drop(&mut self) {
        self.close();
    }
}
