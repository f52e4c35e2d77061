//! Search source coordinator.
//!
//! A [`SearchSource`] owns one history cache and one mirror. Each `search`
//! either answers from history or dispatches a versioned fetch:
//!
//! ```text
//! search(query, options)
//!       │
//!       ▼
//! ┌──────────────────────────────┐
//! │ history eligible?            │── yes ─→ reconcile mirror from entry, notify
//! │ (entry, fresh, range covers) │
//! └──────────────────────────────┘
//!       │ no
//!       ▼
//! trim window to rows a fresh entry lacks, v = ++current_version, fetch
//!       │
//!       ▼ (any order)
//! merge into history ─→ v > loaded_version? reconcile mirror
//!                   ─→ v == current_version? status = Loaded
//! ```
//!
//! Responses may complete out of issue order. Only the version counters
//! decide what reaches the mirror and the status.

mod status;
mod view;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use searchsync_core::{CacheKey, Error, Payload, SearchOptions, Window};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::fetch::Fetcher;
use crate::history::{CacheEntry, HistoryCache, Range};
use crate::mirror::MirrorStore;
use crate::observer::Subject;

pub use status::{SourceOptions, Status};
pub use view::{FieldTransform, LiveView, ViewOptions};

/// Issued and applied version counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Versions {
    /// Latest request issued.
    pub current: u64,
    /// Latest response applied to the mirror.
    pub loaded: u64,
}

/// Client-side view of one named remote search source.
#[derive(Clone)]
pub struct SearchSource {
    shared: Arc<Shared>,
}

struct Shared {
    source: String,
    search_fields: Vec<String>,
    options: SourceOptions,
    fetcher: Arc<dyn Fetcher>,
    state: Mutex<State>,
    store_changed: Subject,
    query_changed: Subject,
    status_changed: Subject,
}

#[derive(Default)]
struct State {
    current_query: Option<String>,
    status: Status,
    metadata: Map<String, Value>,
    history: HistoryCache,
    mirror: MirrorStore,
    versions: Versions,
}

impl SearchSource {
    /// Create a source named `source` whose documents are searched on `search_fields`
    /// (dotted paths allowed).
    pub fn new(
        source: impl Into<String>, search_fields: Vec<String>, options: SourceOptions, fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source: source.into(),
                search_fields,
                options,
                fetcher,
                state: Mutex::new(State::default()),
                store_changed: Subject::new(),
                query_changed: Subject::new(),
                status_changed: Subject::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.source
    }

    pub fn search_fields(&self) -> &[String] {
        &self.shared.search_fields
    }

    pub fn options(&self) -> SourceOptions {
        self.shared.options
    }

    /// Run a search.
    ///
    /// Records the query and notifies query observers, then answers from
    /// history or dispatches a fetch. The returned handle resolves once the
    /// response has been processed; it may be dropped, in which case the
    /// outcome is only visible through [`status`](Self::status).
    ///
    /// Fetches run on the ambient tokio runtime. Without one, a search that
    /// history cannot answer fails with `Error::Transport` and sets the status
    /// to `Status::Error`; nothing is dispatched.
    pub fn search(&self, query: Option<&str>, options: SearchOptions) -> SearchHandle {
        self.shared.state.lock().current_query = query.map(String::from);
        self.shared.query_changed.emit();

        let handle = self.load(query, options);

        if self.shared.options.local_search {
            self.shared.store_changed.emit();
        }

        handle
    }

    fn load(&self, query: Option<&str>, options: SearchOptions) -> SearchHandle {
        let shared = &self.shared;

        if let Err(err) = options.validate() {
            tracing::warn!(source = %shared.source, error = %err, "rejected search options");
            shared.set_status(Status::Error(err.to_wire()));
            return SearchHandle::ready(Err(err));
        }

        let key = CacheKey::new(query, &options);
        let window = options.window();
        let mut state = shared.state.lock();

        let cached = shared
            .options
            .keep_history
            .filter(|ttl| state.history.is_eligible(&key, window, *ttl, Instant::now()))
            .and_then(|_| state.history.get(&key))
            .map(|entry| (entry.documents.clone(), entry.metadata.clone()));

        if let Some((documents, metadata)) = cached {
            tracing::debug!(source = %shared.source, key = %key, rows = documents.len(), "history hit");
            state.mirror.reconcile(documents);
            state.metadata = metadata;
            drop(state);
            shared.store_changed.emit();
            return SearchHandle::ready(Ok(()));
        }

        let outgoing = match shared.options.keep_history {
            Some(ttl) => state.history.trim(&key, window, ttl, Instant::now()),
            None => window,
        };
        if outgoing != window {
            tracing::debug!(
                source = %shared.source,
                requested_skip = window.start(),
                requested_limit = ?window.limit,
                skip = outgoing.start(),
                limit = ?outgoing.limit,
                "trimmed request to uncovered rows"
            );
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let err = Error::Transport(format!("no tokio runtime to run the fetch on: {e}"));
                tracing::warn!(source = %shared.source, error = %err, "search not dispatched");
                state.status = Status::Error(err.to_wire());
                drop(state);
                shared.status_changed.emit();
                return SearchHandle::ready(Err(err));
            }
        };

        state.status = Status::Loading;
        state.versions.current += 1;
        let version = state.versions.current;
        drop(state);
        shared.status_changed.emit();

        tracing::debug!(source = %shared.source, version, key = %key, "dispatching search");

        let task_shared = shared.clone();
        let query = query.map(String::from);
        let outgoing_options = options.with_window(outgoing);
        let task = runtime.spawn(async move {
            let result = task_shared
                .fetcher
                .fetch(&task_shared.source, query.as_deref(), &outgoing_options)
                .await;
            task_shared.complete(key, version, outgoing, result)
        });

        SearchHandle { version: Some(version), inner: HandleInner::Pending(task) }
    }

    /// Status of the latest request.
    pub fn status(&self) -> Status {
        self.shared.state.lock().status.clone()
    }

    /// Metadata from the most recent response (or history hit) that carried any.
    pub fn metadata(&self) -> Map<String, Value> {
        self.shared.state.lock().metadata.clone()
    }

    pub fn current_query(&self) -> Option<String> {
        self.shared.state.lock().current_query.clone()
    }

    pub fn versions(&self) -> Versions {
        self.shared.state.lock().versions
    }

    /// Drop every history entry so the next search always fetches.
    pub fn clean_history(&self) {
        self.shared.state.lock().history.clear();
    }

    /// Range covered by the history entry for `(query, options)`, if any.
    pub fn cached_range(&self, query: Option<&str>, options: &SearchOptions) -> Option<Range> {
        let key = CacheKey::new(query, options);
        self.shared.state.lock().history.get(&key).map(|entry| entry.range)
    }

    /// Number of documents currently mirrored.
    pub fn mirror_len(&self) -> usize {
        self.shared.state.lock().mirror.len()
    }

    /// Fires after every mirror update, history hit and (with local search) every search.
    pub fn store_changes(&self) -> &Subject {
        &self.shared.store_changed
    }

    /// Fires whenever `search` records a new current query.
    pub fn query_changes(&self) -> &Subject {
        &self.shared.query_changed
    }

    /// Fires whenever the status is set.
    pub fn status_changes(&self) -> &Subject {
        &self.shared.status_changed
    }
}

impl Shared {
    fn set_status(&self, status: Status) {
        self.state.lock().status = status;
        self.status_changed.emit();
    }

    /// Completion path for a dispatched fetch.
    fn complete(&self, key: CacheKey, version: u64, window: Window, result: Result<Payload, Error>) -> Result<(), Error> {
        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(source = %self.source, version, error = %err, "search failed");
                self.set_status(Status::Error(err.to_wire()));
                return Err(err);
            }
        };

        let (documents, metadata) = payload.into_parts();
        let received = documents.len();
        let mut state = self.state.lock();

        if let Some(metadata) = &metadata {
            state.metadata = metadata.clone();
        }

        let shown = match self.options.keep_history {
            Some(ttl) => {
                let entry =
                    CacheEntry::new(documents, Range::fetched(window, received), Instant::now(), metadata.unwrap_or_default());
                let merged = state.history.merge(key, entry, ttl);
                tracing::debug!(
                    source = %self.source,
                    version,
                    start = merged.range.start,
                    end = merged.range.end,
                    rows = merged.documents.len(),
                    "merged into history"
                );
                merged.documents.clone()
            }
            None => documents,
        };

        if version > state.versions.loaded {
            state.mirror.reconcile(shown);
            state.versions.loaded = version;
        } else {
            tracing::debug!(source = %self.source, version, loaded = state.versions.loaded, "stale response kept out of mirror");
        }

        let is_current = version == state.versions.current;
        if is_current {
            state.status = Status::Loaded;
        }
        drop(state);

        if is_current {
            self.status_changed.emit();
        }
        self.store_changed.emit();

        Ok(())
    }
}

/// Outcome of one `search` call.
pub struct SearchHandle {
    version: Option<u64>,
    inner: HandleInner,
}

enum HandleInner {
    Ready(Result<(), Error>),
    Pending(JoinHandle<Result<(), Error>>),
}

impl SearchHandle {
    fn ready(result: Result<(), Error>) -> Self {
        Self { version: None, inner: HandleInner::Ready(result) }
    }

    /// Version assigned to the dispatched fetch; `None` when nothing was fetched.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Whether a fetch was dispatched.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner, HandleInner::Pending(_))
    }

    /// Wait until the response has been processed.
    ///
    /// # Errors
    ///
    /// Returns the fetch error (after the status has already been set to
    /// `Status::Error`), the validation error for rejected options, or a
    /// transport error if the completion task itself died.
    pub async fn finished(self) -> Result<(), Error> {
        match self.inner {
            HandleInner::Ready(result) => result,
            HandleInner::Pending(task) => {
                task.await.unwrap_or_else(|e| Err(Error::Transport(format!("search task failed: {e}"))))
            }
        }
    }
}

impl std::fmt::Debug for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHandle").field("version", &self.version).field("pending", &self.is_pending()).finish()
    }
}
