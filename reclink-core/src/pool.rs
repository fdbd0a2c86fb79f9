//! Cached recordings of the selected release group.
//!
//! Each release group goes through `Unrequested -> Loading -> Ready` at most
//! once per session. The first caller spawns the loader; everyone arriving
//! while it runs waits on the same watch channel and wakes when the full pool
//! is published.
//!
//! Selecting a different release group cancels loads for groups that are no
//! longer selected. Their partial results are dropped, the cache entry goes
//! back to unrequested and waiters see no pool.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entity_cache::EntityCache;
use crate::models::Recording;
use crate::musicbrainz::{SearchBackend, SearchRequest};
use crate::query::release_group_query;
use crate::retry::{Outcome, RetryPolicy};

pub type RecordingPool = Arc<Vec<Arc<Recording>>>;

#[derive(Debug, Clone)]
pub enum PoolState {
    Loading,
    Ready(RecordingPool),
}

impl PoolState {
    pub fn is_ready(&self) -> bool {
        matches!(self, PoolState::Ready(_))
    }

    pub fn recordings(&self) -> Option<RecordingPool> {
        match self {
            PoolState::Ready(recordings) => Some(recordings.clone()),
            PoolState::Loading => None,
        }
    }
}

struct PoolEntry {
    state: watch::Receiver<PoolState>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct PoolsState {
    selected: Option<String>,
    entries: HashMap<String, PoolEntry>,
}

struct PoolsInner {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<EntityCache>,
    retry: RetryPolicy,
    page_size: u32,
    state: Mutex<PoolsState>,
    shutdown: CancellationToken,
}

impl PoolsInner {
    fn lock(&self) -> MutexGuard<'_, PoolsState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Release-group recording pools for one editing session.
#[derive(Clone)]
pub struct ReleaseGroupPools {
    inner: Arc<PoolsInner>,
}

impl ReleaseGroupPools {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<EntityCache>,
        retry: RetryPolicy,
        page_size: u32,
    ) -> Self {
        Self {
            inner: Arc::new(PoolsInner {
                backend,
                cache,
                retry,
                page_size: page_size.max(1),
                state: Mutex::new(PoolsState::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Change the selected release group. Returns false if it was already
    /// selected.
    pub fn select(&self, release_group_id: Option<String>) -> bool {
        let mut state = self.inner.lock();
        if state.selected == release_group_id {
            return false;
        }
        state.selected = release_group_id;

        let selected = state.selected.clone();
        state.entries.retain(|id, entry| {
            let stale = Some(id) != selected.as_ref() && !entry.state.borrow().is_ready();
            if stale {
                debug!(release_group = %id, "Cancelling stale release group load");
                entry.cancel.cancel();
            }
            !stale
        });
        true
    }

    pub fn state_of(&self, release_group_id: &str) -> Option<PoolState> {
        self.inner
            .lock()
            .entries
            .get(release_group_id)
            .map(|entry| entry.state.borrow().clone())
    }

    /// Recordings of the selected release group, loading them on first use
    /// and waiting if a load is already running. `None` when nothing is
    /// selected, the load was abandoned, or `cancel` fired first.
    pub async fn current(&self, cancel: &CancellationToken) -> Option<RecordingPool> {
        let mut state = {
            let mut pools = self.inner.lock();
            let release_group_id = pools.selected.clone()?;
            match pools.entries.get(&release_group_id) {
                Some(entry) => entry.state.clone(),
                None => {
                    let (tx, rx) = watch::channel(PoolState::Loading);
                    let load_cancel = self.inner.shutdown.child_token();
                    pools.entries.insert(
                        release_group_id.clone(),
                        PoolEntry {
                            state: rx.clone(),
                            cancel: load_cancel.clone(),
                        },
                    );
                    tokio::spawn(load_pool(
                        self.inner.clone(),
                        release_group_id,
                        tx,
                        load_cancel,
                    ));
                    rx
                }
            }
        };

        let ready = async {
            state
                .wait_for(PoolState::is_ready)
                .await
                .ok()
                .and_then(|pool| pool.recordings())
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            recordings = ready => recordings,
        }
    }

    /// Stop all loads. Called when the session ends.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }
}

async fn load_pool(
    inner: Arc<PoolsInner>,
    release_group_id: String,
    tx: watch::Sender<PoolState>,
    cancel: CancellationToken,
) {
    let query = release_group_query(&release_group_id);
    let mut seen = HashSet::new();
    let mut recordings = Vec::new();
    let mut offset: u32 = 0;

    info!(release_group = %release_group_id, "Loading release group recordings");
    loop {
        let request = SearchRequest::recordings(query.clone(), inner.page_size, offset);
        let outcome = inner
            .retry
            .run("Release group recordings fetch", &cancel, || {
                inner.backend.search(&request)
            })
            .await;
        let page = match outcome {
            Outcome::Completed(page) => page,
            Outcome::Cancelled => {
                debug!(release_group = %release_group_id, "Release group load cancelled");
                return;
            }
            Outcome::GaveUp => {
                warn!(release_group = %release_group_id, "Giving up on release group recordings");
                abandon(&inner, &release_group_id, &cancel);
                return;
            }
        };

        let fetched = page.recordings.len();
        for record in &page.recordings {
            if seen.insert(record.id.clone()) {
                recordings.push(inner.cache.recording_from_record(record));
            }
        }
        offset += fetched as u32;
        debug!(
            release_group = %release_group_id,
            "Fetched {} of {} recordings", offset, page.count
        );
        if fetched == 0 || u64::from(offset) >= page.count {
            break;
        }
    }

    // Publish under the lock so a concurrent `select` cannot slip between
    // the staleness check and the state change.
    let guard = inner.lock();
    if cancel.is_cancelled() {
        return;
    }
    info!(
        release_group = %release_group_id,
        "Loaded {} release group recordings ({} cached in session)",
        recordings.len(),
        inner.cache.len()
    );
    tx.send_replace(PoolState::Ready(Arc::new(recordings)));
    drop(guard);
}

/// Drop the cache entry of a load that gave up, so the next caller starts
/// over. A cancelled load's entry was already removed by `select`.
fn abandon(inner: &PoolsInner, release_group_id: &str, cancel: &CancellationToken) {
    let mut pools = inner.lock();
    if !cancel.is_cancelled() {
        pools.entries.remove(release_group_id);
    }
}
