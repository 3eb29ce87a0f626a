//! The search surface controller and its background worker
//!
//! Every keystroke bumps the session's generation and restarts the debounce
//! timer. When the timer fires, the query is tagged with the generation and
//! handed to the worker. Results come back tagged the same way, and only the
//! ones matching the current generation are applied, so a slow response to
//! an old query can never overwrite a newer one.

use crate::debounce::QueryDebouncer;
use crate::error::FetchError;
use crate::hit::{Collection, ResultCollection};
use crate::merge::{build_view, SearchView};
use crate::multi_index::MultiIndexSearchClient;
use crate::route::{Navigator, Route};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Query sent to the worker thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub id: u64,
    pub text: String,
}

/// Results for one query, all collections together
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub query_id: u64,
    pub term: String,
    pub collections: Vec<ResultCollection>,
    pub duration: Duration,
}

impl SearchResults {
    pub fn get(&self, collection: Collection) -> Option<&ResultCollection> {
        self.collections.iter().find(|c| c.collection == collection)
    }
}

/// Spawn the background search worker. Queued queries are coalesced so only
/// the latest one runs.
pub fn spawn_search_worker(
    client: Arc<MultiIndexSearchClient>,
    query_rx: Receiver<SearchQuery>,
    result_tx: Sender<SearchResults>,
    alive: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(mut query) = query_rx.recv() {
            // Drain pending queries, keep only the latest
            while let Ok(next) = query_rx.try_recv() {
                query = next;
            }
            if !alive.load(Ordering::Acquire) {
                break;
            }

            let start = Instant::now();
            let collections = client.query(&query.text);
            let duration = start.elapsed();
            log::debug!(
                "Query #{} {:?} finished in {:?}",
                query.id,
                query.text,
                duration
            );

            if !alive.load(Ordering::Acquire) {
                break;
            }
            let _ = result_tx.send(SearchResults {
                query_id: query.id,
                term: query.text,
                collections,
                duration,
            });
        }
    })
}

pub struct SearchSession {
    input: String,
    debouncer: QueryDebouncer,
    /// Bumped on every submit; results for any other generation are stale
    generation: u64,
    loading: bool,
    results: Option<SearchResults>,
    error: Option<FetchError>,
    query_tx: Option<Sender<SearchQuery>>,
    result_rx: Receiver<SearchResults>,
    alive: Arc<AtomicBool>,
}

impl SearchSession {
    /// Session backed by its own search worker.
    pub fn spawn(client: Arc<MultiIndexSearchClient>, debouncer: QueryDebouncer) -> Self {
        let (query_tx, query_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));

        spawn_search_worker(client, query_rx, result_tx, alive.clone());
        Self::with_channels(debouncer, query_tx, result_rx, alive)
    }

    pub fn with_channels(
        debouncer: QueryDebouncer,
        query_tx: Sender<SearchQuery>,
        result_rx: Receiver<SearchResults>,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            input: String::new(),
            debouncer,
            generation: 0,
            loading: false,
            results: None,
            error: None,
            query_tx: Some(query_tx),
            result_rx,
            alive,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True from the first submit until results for the latest one land.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The last applied results, which may belong to an older query while
    /// a newer one is loading.
    pub fn results(&self) -> Option<&SearchResults> {
        self.results.as_ref()
    }

    /// Set when the worker is unreachable. Searching stays disabled after.
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn submit(&mut self, raw: impl Into<String>) {
        self.submit_at(raw, Instant::now());
    }

    pub fn submit_at(&mut self, raw: impl Into<String>, now: Instant) {
        if self.is_closed() || self.error.is_some() {
            return;
        }
        let raw = raw.into();
        self.input.clone_from(&raw);
        self.generation += 1;
        self.loading = true;
        self.debouncer.submit_at(raw, now);
    }

    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Fire the debounced query if its quiet period is over, then apply any
    /// results that arrived. Returns whether new results were applied.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        if let Some(text) = self.debouncer.fire_at(now) {
            self.send_query(text);
        }
        self.poll_results()
    }

    /// Apply results for the current generation without blocking.
    pub fn poll_results(&mut self) -> bool {
        let mut applied = false;
        while let Ok(results) = self.result_rx.try_recv() {
            applied |= self.apply(results);
        }
        applied
    }

    /// Block until results for the latest submit land, driving the debounce
    /// timer meanwhile. Returns false on timeout or once the worker is gone.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if self.tick_at(now) || !self.loading {
                return !self.loading && self.error.is_none();
            }
            if now >= deadline {
                return false;
            }

            let until = self.debouncer.deadline().unwrap_or(deadline).min(deadline);
            if self.debouncer.is_pending() {
                thread::sleep(until.saturating_duration_since(now));
                continue;
            }
            match self.result_rx.recv_timeout(until.saturating_duration_since(now)) {
                Ok(results) => {
                    self.apply(results);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.fail_terminal();
                    return false;
                }
            }
        }
    }

    /// What the surface should show right now.
    pub fn view(&self) -> SearchView<'_> {
        let collections = self
            .results
            .as_ref()
            .map(|r| r.collections.as_slice())
            .unwrap_or_default();
        build_view(self.loading, collections)
    }

    /// Navigate to hit `index` of the `group`th visible group.
    pub fn select(&self, group: usize, index: usize, navigator: &dyn Navigator) -> Option<Route> {
        let view = self.view();
        let group = view.groups().get(group)?;
        let hit = group.hits.get(index)?;
        let route = group.collection.route(&hit.id);
        log::debug!("Navigating to {}", route);
        navigator.navigate(&route);
        Some(route)
    }

    /// Tear down: the pending timer is dropped, the worker stops and nothing
    /// it was doing is applied.
    pub fn close(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.query_tx = None;
        self.debouncer.cancel();
    }

    pub fn is_closed(&self) -> bool {
        !self.alive.load(Ordering::Acquire)
    }

    fn send_query(&mut self, text: String) {
        let query = SearchQuery {
            id: self.generation,
            text,
        };
        log::debug!("Sending query #{} {:?}", query.id, query.text);
        let sent = self
            .query_tx
            .as_ref()
            .is_some_and(|tx| tx.send(query).is_ok());
        if !sent {
            self.fail_terminal();
        }
    }

    fn apply(&mut self, results: SearchResults) -> bool {
        if self.is_closed() {
            return false;
        }
        if results.query_id != self.generation {
            log::trace!(
                "Discarding stale results for query #{} (current #{})",
                results.query_id,
                self.generation
            );
            return false;
        }
        self.results = Some(results);
        self.loading = false;
        true
    }

    fn fail_terminal(&mut self) {
        if self.is_closed() {
            return;
        }
        log::warn!("Search worker is gone; search disabled");
        self.error = Some(FetchError::terminal("search worker stopped"));
        self.loading = false;
        self.results = None;
        self.debouncer.cancel();
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{DisplayField, Hit};
    use std::cell::RefCell;

    const QUIET: Duration = Duration::from_millis(500);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    struct Harness {
        session: SearchSession,
        queries: Receiver<SearchQuery>,
        results: Sender<SearchResults>,
    }

    impl Harness {
        fn new() -> Self {
            let (query_tx, queries) = mpsc::channel();
            let (results, result_rx) = mpsc::channel();
            let session = SearchSession::with_channels(
                QueryDebouncer::new(QUIET),
                query_tx,
                result_rx,
                Arc::new(AtomicBool::new(true)),
            );
            Self {
                session,
                queries,
                results,
            }
        }

        fn sent(&self) -> Vec<SearchQuery> {
            self.queries.try_iter().collect()
        }

        /// Answer as the worker would: content hits titled after the term.
        fn answer(&self, query: &SearchQuery, titles: &[&str]) {
            let hits = titles
                .iter()
                .enumerate()
                .map(|(i, title)| Hit {
                    id: i.to_string(),
                    display_fields: [(
                        "title".to_string(),
                        DisplayField {
                            plain: title.to_string(),
                            markup: title.to_string(),
                            spans: Vec::new(),
                        },
                    )]
                    .into(),
                })
                .collect();
            let mut content = ResultCollection::empty(Collection::Content);
            content.hits = hits;
            self.results
                .send(SearchResults {
                    query_id: query.id,
                    term: query.text.clone(),
                    collections: vec![content, ResultCollection::empty(Collection::Tag)],
                    duration: ms(1),
                })
                .unwrap();
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        routes: RefCell<Vec<Route>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &Route) {
            self.routes.borrow_mut().push(route.clone());
        }
    }

    #[test]
    fn test_burst_sends_one_query() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        for (i, text) in ["d", "do", "doc", "dock"].iter().enumerate() {
            h.session.submit_at(*text, t0 + ms(100 * i as u64));
        }
        h.session.tick_at(t0 + ms(600));
        assert!(h.sent().is_empty());

        h.session.tick_at(t0 + ms(800));
        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "dock");
        assert_eq!(sent[0].id, h.session.generation());
        assert!(h.session.is_loading());
    }

    #[test]
    fn test_loading_spans_overlapping_requests() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        assert!(!h.session.is_loading());

        h.session.submit_at("awk", t0);
        assert!(h.session.is_loading());
        h.session.tick_at(t0 + QUIET);
        let first = h.sent().remove(0);

        h.session.submit_at("sed", t0 + ms(1000));
        h.session.tick_at(t0 + ms(1000) + QUIET);
        let second = h.sent().remove(0);

        h.answer(&first, &["awk one-liners"]);
        assert!(!h.session.poll_results());
        assert!(h.session.is_loading());
        assert!(h.session.view().is_loading());

        h.answer(&second, &["sed in place"]);
        assert!(h.session.poll_results());
        assert!(!h.session.is_loading());
        assert_eq!(h.session.results().unwrap().term, "sed");
    }

    #[test]
    fn test_out_of_order_results_keep_latest() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        h.session.submit_at("A", t0);
        h.session.tick_at(t0 + QUIET);
        let slow = h.sent().remove(0);
        h.session.submit_at("B", t0 + ms(600));
        h.session.tick_at(t0 + ms(1100));
        let fast = h.sent().remove(0);

        h.answer(&fast, &["B result"]);
        h.answer(&slow, &["A result"]);
        h.session.poll_results();

        let view = h.session.view();
        let title = &view.groups()[0].hits[0].field("title").unwrap().plain;
        assert_eq!(title, "B result");
        assert_eq!(h.session.results().unwrap().query_id, fast.id);
    }

    #[test]
    fn test_empty_results_show_no_results() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        h.session.submit_at("zzz", t0);
        h.session.tick_at(t0 + QUIET);
        let query = h.sent().remove(0);
        h.answer(&query, &[]);
        h.session.poll_results();
        assert_eq!(h.session.view(), SearchView::NoResults);
    }

    #[test]
    fn test_select_routes_through_navigator() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        h.session.submit_at("tar", t0);
        h.session.tick_at(t0 + QUIET);
        let query = h.sent().remove(0);
        h.answer(&query, &["tar czf", "tar xzf"]);
        h.session.poll_results();

        let navigator = RecordingNavigator::default();
        let route = h.session.select(0, 1, &navigator).unwrap();
        assert_eq!(route.path(), "/sheet/id/1");
        assert_eq!(navigator.routes.borrow().as_slice(), &[route]);
        assert!(h.session.select(1, 0, &navigator).is_none());
        assert!(h.session.select(0, 5, &navigator).is_none());
    }

    #[test]
    fn test_close_discards_late_results() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        h.session.submit_at("scp", t0);
        h.session.tick_at(t0 + QUIET);
        let query = h.sent().remove(0);

        h.session.close();
        h.answer(&query, &["scp -r"]);
        assert!(!h.session.poll_results());
        assert!(h.session.results().is_none());

        h.session.submit_at("ssh", t0 + ms(1000));
        h.session.tick_at(t0 + ms(2000));
        assert!(h.sent().is_empty());
    }

    #[test]
    fn test_dead_worker_is_terminal() {
        let t0 = Instant::now();
        let mut h = Harness::new();
        let (_, queries) = mpsc::channel();
        drop(std::mem::replace(&mut h.queries, queries));

        h.session.submit_at("rsync", t0);
        h.session.tick_at(t0 + QUIET);
        assert!(matches!(h.session.error(), Some(FetchError::Terminal(_))));
        assert!(!h.session.is_loading());
        assert_eq!(h.session.view(), SearchView::NoResults);
    }
}
