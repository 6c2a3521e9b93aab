use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::entry::Entry;
use super::error::{ErrorKind, FeedError};
use super::fetcher::fetch_and_parse;
use super::parser::ParseOptions;

/// Messages sent from the background refresh task to its owner.
#[derive(Debug)]
pub enum RefreshEvent {
    /// Sent exactly once per started refresh.
    Completed(Result<Vec<Entry>, FeedError>),
}

/// Outcome of asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    /// A background task was spawned
    Started,
    /// A refresh is already in flight; it is kept and this request is dropped
    AlreadyRunning,
}

/// Clears the in-flight flag when the refresh task finishes, including by panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs fetch-then-parse for one feed on a background task.
///
/// At most one refresh is in flight at a time. Triggering a refresh while one
/// is running does not cancel it: the running one completes and the new
/// request is refused with [`RefreshRequest::AlreadyRunning`].
pub struct Refresher {
    client: reqwest::Client,
    url: Arc<str>,
    options: ParseOptions,
    events: mpsc::Sender<RefreshEvent>,
    in_flight: Arc<AtomicBool>,
}

impl Refresher {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<Arc<str>>,
        options: ParseOptions,
        events: mpsc::Sender<RefreshEvent>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            options,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Starts a refresh unless one is already running.
    ///
    /// Must be called from within a Tokio runtime. The result arrives as a
    /// single [`RefreshEvent::Completed`] on the channel given to
    /// [`Refresher::new`]; by the time it is received, a new refresh may be
    /// started.
    pub fn refresh(&self) -> RefreshRequest {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(feed = %self.url, "Refresh already in progress, ignoring request");
            return RefreshRequest::AlreadyRunning;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let client = self.client.clone();
        let url = Arc::clone(&self.url);
        let options = self.options;
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = fetch_and_parse(&client, &url, &options).await;
            if let Err(ref e) = result {
                tracing::warn!(feed = %url, error = %e, "Feed refresh failed");
            }

            drop(guard);
            if let Err(e) = events.send(RefreshEvent::Completed(result)).await {
                tracing::warn!(
                    error = %e,
                    event = "Completed",
                    "Channel send failed (receiver dropped)"
                );
            }
        });

        RefreshRequest::Started
    }
}

/// What a front end currently shows for a feed.
///
/// A failed refresh never clears what was shown before: the previous entries
/// stay in place and only the error is recorded.
#[derive(Debug, Default)]
pub struct FeedView {
    entries: Vec<Entry>,
    last_error: Option<(ErrorKind, String)>,
}

impl FeedView {
    /// Folds a refresh result into the view.
    ///
    /// Returns true when the entries were replaced.
    pub fn apply(&mut self, result: Result<Vec<Entry>, FeedError>) -> bool {
        match result {
            Ok(entries) => {
                self.entries = entries;
                self.last_error = None;
                true
            }
            Err(e) => {
                self.last_error = Some((e.kind(), e.to_string()));
                false
            }
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn last_error(&self) -> Option<(ErrorKind, &str)> {
        self.last_error
            .as_ref()
            .map(|(kind, message)| (*kind, message.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ONE_ITEM: &str = r#"<rss><channel><item>
        <title>Fresh</title><link>http://example.com/fresh</link>
    </item></channel></rss>"#;

    async fn feed_server(body: &str, delay: Duration) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn refresher(url: String, tx: mpsc::Sender<RefreshEvent>) -> Refresher {
        Refresher::new(reqwest::Client::new(), url, ParseOptions::default(), tx)
    }

    async fn next_result(rx: &mut mpsc::Receiver<RefreshEvent>) -> Result<Vec<Entry>, FeedError> {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Some(RefreshEvent::Completed(result))) => result,
            other => panic!("Expected a completion event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_completes_exactly_once() {
        let mock_server = feed_server(ONE_ITEM, Duration::ZERO).await;
        let (tx, mut rx) = mpsc::channel(4);
        let refresher = refresher(mock_server.uri(), tx);

        assert_eq!(refresher.refresh(), RefreshRequest::Started);
        let entries = next_result(&mut rx).await.unwrap();
        assert_eq!(entries.len(), 1);

        // No second event for the same refresh
        let extra = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(extra.is_err(), "unexpected extra event: {:?}", extra);
        assert!(!refresher.is_refreshing());
    }

    #[tokio::test]
    async fn test_second_trigger_keeps_in_flight_refresh() {
        let mock_server = feed_server(ONE_ITEM, Duration::from_millis(500)).await;
        let (tx, mut rx) = mpsc::channel(4);
        let refresher = refresher(mock_server.uri(), tx);

        assert_eq!(refresher.refresh(), RefreshRequest::Started);
        assert!(refresher.is_refreshing());
        assert_eq!(refresher.refresh(), RefreshRequest::AlreadyRunning);

        assert!(next_result(&mut rx).await.is_ok());
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);

        // Once the result is delivered a new refresh may start
        assert_eq!(refresher.refresh(), RefreshRequest::Started);
        assert!(next_result(&mut rx).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_reported_once() {
        let mock_server = feed_server("<rss><channel><item>", Duration::ZERO).await;
        let (tx, mut rx) = mpsc::channel(4);
        let refresher = refresher(mock_server.uri(), tx);

        refresher.refresh();
        let err = next_result(&mut rx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedFeed);
    }

    #[test]
    fn test_view_keeps_entries_on_error() {
        let mut builder = Entry::builder();
        builder.set_title("Kept");
        builder.set_link("http://example.com/kept").unwrap();
        let kept = builder.build().unwrap();

        let mut view = FeedView::default();
        assert!(view.apply(Ok(vec![kept.clone()])));
        assert!(view.last_error().is_none());

        assert!(!view.apply(Err(FeedError::Timeout)));
        assert_eq!(view.entries(), &[kept]);
        assert_eq!(
            view.last_error(),
            Some((ErrorKind::Connection, "Request timed out"))
        );

        assert!(view.apply(Ok(Vec::new())));
        assert!(view.entries().is_empty());
        assert!(view.last_error().is_none());
    }
}
