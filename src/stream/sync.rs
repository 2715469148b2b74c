//! # Stream synchronization
//!
//! [`StreamSync`] keeps a local, duplicate-free copy of one feed and extends
//! it in both directions:
//!
//! - `fill` starts over from the newest page
//! - `update` prepends whatever appeared since
//! - `more` appends one page older than the cursor
//! - `full` repeats `more` until history is exhausted
//!
//! Pods answer older-page requests with items at or before `max_time`, so
//! consecutive pages overlap and periods without posts yield pages that add
//! nothing. A full crawl treats such a page as a reason to probe further back,
//! a bounded number of times, before concluding it reached the end.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diaspora_pod_client::{Credentials, FeedLocation, Session, Settings, StreamSync};
//!
//! # tokio_test::block_on(async {
//! let session = Arc::new(Session::new("pod.example.org", Settings::default())?);
//! session.login(Credentials::new("alice", "secret")).await?;
//!
//! let mut stream = StreamSync::new(session, FeedLocation::Stream);
//! stream.fill().await?;
//! stream
//!     .full_with_progress(|s| {
//!         println!("{} posts so far", s.len());
//!         Ok(())
//!     })
//!     .await?;
//! # Ok::<(), diaspora_pod_client::Error>(())
//! # });
//! ```

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::location::FeedLocation;
use super::state::StreamState;
use crate::{
    Error, Result,
    session::Session,
    types::{FeedItem, Presence, RequestOptions, StreamPage},
};

/// Local copy of one feed
#[derive(Debug, Clone)]
pub struct StreamSync {
    session: Arc<Session>,
    location: FeedLocation,
    state: StreamState,
    /// Budget a full crawl starts with and returns to after progress
    retry_budget: u32,
    gap_step: Duration,
    cache_bust: bool,
    item_path: String,
}

impl StreamSync {
    /// Empty stream over `location`, tuned by the session's stream settings
    pub fn new(session: Arc<Session>, location: FeedLocation) -> Self {
        let settings = &session.settings().stream;
        let retry_budget = settings.retry_budget;
        let gap_step = Duration::try_seconds(settings.gap_step_secs).unwrap_or(Duration::MAX);
        let cache_bust = settings.cache_bust;
        let item_path = settings.item_path.clone();

        Self {
            session,
            location,
            state: StreamState::new(),
            retry_budget,
            gap_step,
            cache_bust,
            item_path,
        }
    }

    /// New stream loaded with the newest page
    pub async fn filled(session: Arc<Session>, location: FeedLocation) -> Result<Self> {
        let mut stream = Self::new(session, location);
        stream.fill().await?;
        Ok(stream)
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn with_gap_step(mut self, gap_step: Duration) -> Self {
        self.gap_step = gap_step;
        self
    }

    pub fn location(&self) -> &FeedLocation {
        &self.location
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Items, newest first
    pub fn items(&self) -> &[FeedItem] {
        self.state.items()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeedItem> {
        self.state.items().iter()
    }

    pub fn get(&self, index: usize) -> Option<&FeedItem> {
        self.state.items().get(index)
    }

    /// Owned snapshot of the items
    pub fn copy(&self) -> Vec<FeedItem> {
        self.state.items().to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.contains(id)
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.state.cursor()
    }

    /// Resume a crawl from a previously saved watermark
    pub fn set_cursor(&mut self, cursor: Option<DateTime<Utc>>) {
        self.state.set_cursor(cursor);
    }

    /// Retries left in the running or last full crawl
    pub fn retry_budget(&self) -> u32 {
        self.state.retry_budget()
    }

    /// Drop all items and the cursor
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Replace the contents with the newest page
    pub async fn fill(&mut self) -> Result<usize> {
        let page = self.fetch_page(None).await?;
        let count = self.state.replace(page);
        debug!("Filled {} with {} items", self.describe(), count);
        Ok(count)
    }

    /// Prepend items newer than anything known; returns how many were added
    pub async fn update(&mut self) -> Result<usize> {
        let page = self.fetch_page(None).await?;
        let added = self.state.prepend_newer(page);
        debug!("Update of {} added {} items", self.describe(), added);
        Ok(added)
    }

    /// Append one older page, starting at `watermark`, else the cursor, else now
    pub async fn more(&mut self, watermark: Option<DateTime<Utc>>) -> Result<usize> {
        let max_time = watermark
            .or_else(|| self.state.cursor())
            .unwrap_or_else(Utc::now);
        let page = self.fetch_page(Some(max_time)).await?;
        let appended = self.state.append_older(page);
        debug!(
            "Page before {} of {} appended {} items",
            max_time,
            self.describe(),
            appended
        );
        Ok(appended)
    }

    /// Fetch older pages until history is exhausted; returns how many items were added
    pub async fn full(&mut self) -> Result<usize> {
        self.full_with_progress(|_| Ok(())).await
    }

    /// Like [`full`](Self::full), calling `on_progress` after every page.
    /// An error from the callback stops the crawl and is returned as is.
    pub async fn full_with_progress<F>(&mut self, mut on_progress: F) -> Result<usize>
    where
        F: FnMut(&StreamSync) -> Result<()>,
    {
        let start = self.len();
        self.state.reset_retry_budget(self.retry_budget);
        let mut probe: Option<DateTime<Utc>> = None;

        info!("Crawling history of {}", self.describe());
        loop {
            let appended = self.more(probe).await?;
            on_progress(&*self)?;

            if appended > 0 {
                self.state.reset_retry_budget(self.retry_budget);
                probe = None;
                continue;
            }

            if !self.state.spend_retry() {
                break;
            }
            let from = probe
                .or_else(|| self.state.cursor())
                .unwrap_or_else(Utc::now);
            let Some(next) = from.checked_sub_signed(self.gap_step) else {
                warn!("Gap step reaches past the earliest representable time, stopping");
                break;
            };
            probe = Some(next);
            debug!(
                "No new items, probing before {} ({} retries left)",
                next,
                self.state.retry_budget()
            );
        }

        let added = self.len() - start;
        info!("Crawl of {} finished, {} items added", self.describe(), added);
        Ok(added)
    }

    /// Point-read every item and drop the ones no longer available; returns how many were dropped
    pub async fn purge(&mut self) -> Result<usize> {
        let mut gone = HashSet::new();
        for item in self.state.items() {
            if self.resolve_item(&item.id).await.is_gone() {
                gone.insert(item.id.clone());
            }
        }

        let removed = self.state.retain(|item| !gone.contains(&item.id));
        if removed > 0 {
            info!("Purged {} items from {}", removed, self.describe());
        }
        Ok(removed)
    }

    /// Look up a single item on the pod
    pub async fn resolve_item(&self, id: &str) -> Presence {
        let path = self.item_path.replace("{id}", id);
        let options = RequestOptions::new().with_header("accept", "application/json");

        match self.session.get(&path, options).await {
            Ok(response) if response.is_success() => match response.json::<Value>() {
                Ok(payload) => Presence::Found(payload),
                Err(e) => {
                    debug!("{} is not JSON ({}), keeping the raw body", path, e);
                    Presence::Found(Value::String(response.body))
                }
            },
            Ok(response) => {
                debug!("{} answered {}, treating as gone", path, response.status);
                Presence::Gone
            }
            Err(e) => {
                warn!("Could not read {}: {}, treating as gone", path, e);
                Presence::Gone
            }
        }
    }

    // Private helper methods...

    async fn fetch_page(&self, max_time: Option<DateTime<Utc>>) -> Result<StreamPage> {
        let path = self.location.path(&self.session.settings().http.default_scheme);

        let mut options = RequestOptions::new().with_header("accept", "application/json");
        for (key, value) in self.location.params() {
            options = options.with_param(key, value);
        }
        if let Some(max_time) = max_time {
            options = options.with_param("max_time", max_time.timestamp());
            if self.cache_bust && self.location.accepts_nonce() {
                options = options.with_param("_", Utc::now().timestamp_millis());
            }
        }
        if self.location.is_absolute() {
            options = options.absolute();
        }

        let response = self.session.get(&path, options).await?;
        if !response.is_success() {
            return Err(Error::stream(response.status_code(), path));
        }
        StreamPage::parse(&response.body)
    }

    fn describe(&self) -> String {
        self.location.path(&self.session.settings().http.default_scheme)
    }
}

impl<'a> IntoIterator for &'a StreamSync {
    type Item = &'a FeedItem;
    type IntoIter = std::slice::Iter<'a, FeedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
