//! Sessions and feeds driven by their real worker threads.

use omcs_search::{
    Collection, CollectionRequest, ContentSource, FeedItem, FetchError, InfiniteFeedController,
    ListRequest, Listing, MultiIndexSearchClient, PaginationCursor, QueryDebouncer,
    RawCollectionResult, RawHit, SearchService, SearchSession, SearchView,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const QUIET: Duration = Duration::from_millis(20);
const TIMEOUT: Duration = Duration::from_secs(5);

/// Echoes the term back as one content hit, after a term-specific delay.
#[derive(Default)]
struct EchoService {
    calls: AtomicUsize,
}

impl SearchService for EchoService {
    fn search(&self, request: &CollectionRequest) -> Result<RawCollectionResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.term.starts_with("slow") {
            std::thread::sleep(Duration::from_millis(200));
        }
        if request.index_name != Collection::Content.default_index_name() {
            return Ok(RawCollectionResult::default());
        }
        let len = request.term.len();
        Ok(RawCollectionResult {
            hits: vec![RawHit::new("1")
                .with_field("title", request.term.clone())
                .with_match("title", 0..len)],
            estimated_total: 1,
        })
    }
}

fn start_session(service: Arc<EchoService>) -> SearchSession {
    let client = Arc::new(MultiIndexSearchClient::new(service));
    SearchSession::spawn(client, QueryDebouncer::new(QUIET))
}

fn shown_title(session: &SearchSession) -> Option<String> {
    match session.view() {
        SearchView::Groups(groups) => groups[0].hits[0]
            .field("title")
            .map(|f| f.plain.clone()),
        _ => None,
    }
}

#[test]
fn test_session_round_trip() {
    let service = Arc::new(EchoService::default());
    let mut session = start_session(service.clone());

    session.submit("jq");
    assert!(session.view().is_loading());
    assert!(session.wait(TIMEOUT));

    assert_eq!(shown_title(&session).as_deref(), Some("jq"));
    // One call per collection.
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_slow_stale_query_never_renders() {
    let service = Arc::new(EchoService::default());
    let mut session = start_session(service);

    session.submit("slow query");
    // Let the slow query reach the worker, then type again.
    std::thread::sleep(QUIET * 3);
    session.tick();
    session.submit("fast");
    assert!(session.wait(TIMEOUT));
    assert_eq!(shown_title(&session).as_deref(), Some("fast"));

    // The slow response lands afterwards and is dropped.
    std::thread::sleep(Duration::from_millis(300));
    session.poll_results();
    assert_eq!(shown_title(&session).as_deref(), Some("fast"));
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sheet(u32);

impl FeedItem for Sheet {
    fn feed_id(&self) -> String {
        self.0.to_string()
    }
}

/// 45 sheets, optionally scoped to a label; records every request.
#[derive(Default)]
struct SheetSource {
    requests: Mutex<Vec<ListRequest>>,
}

impl ContentSource<Sheet> for SheetSource {
    fn list_by_cursor(&self, request: &ListRequest) -> Result<Listing<Sheet>, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        let total = 45;
        let end = (request.offset + request.limit).min(total);
        let hits = (request.offset..end).map(|i| Sheet(i as u32)).collect();
        Ok(Listing {
            hits,
            is_last: end == total,
        })
    }
}

#[test]
fn test_feed_pages_to_the_end() {
    let source = Arc::new(SheetSource::default());
    let cursor = PaginationCursor::new("issues", 20).with_partition("docker");
    let mut feed = InfiniteFeedController::<Sheet>::spawn(source.clone(), cursor);

    let mut pages = 0;
    while feed.load_more() {
        assert!(!feed.load_more());
        assert!(feed.wait_for_page(TIMEOUT));
        pages += 1;
    }

    assert_eq!(pages, 3);
    assert!(feed.is_end());
    assert_eq!(feed.items().len(), 45);

    let requests = source.requests.lock().unwrap();
    let offsets: Vec<_> = requests.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 20, 40]);
    assert!(requests.iter().all(|r| r.partition.as_deref() == Some("docker")));
}
