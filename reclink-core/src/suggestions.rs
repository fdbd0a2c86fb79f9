//! Per-track recording suggestions.
//!
//! A suggestion cycle for a track skips tracks without a name or with an
//! incomplete artist credit, ranks candidates from the release-group pool,
//! then from the suggestions already shown, then from a fresh backend
//! search, and finally puts the saved recording first when nothing is
//! linked.
//!
//! Re-linking is separate: only an edit to a watched track's name or length
//! re-evaluates its linked recording (see [`restore_recording`]). Refreshing
//! suggestions never touches the link.
//!
//! Each cycle owns the track's [`SearchSlot`](crate::search::SearchSlot);
//! starting one cancels the previous, and only the owner publishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::autocomplete::AutocompleteHook;
use crate::config::SuggestConfig;
use crate::debounce::Debouncer;
use crate::entity_cache::EntityCache;
use crate::models::Recording;
use crate::musicbrainz::SearchBackend;
use crate::pool::ReleaseGroupPools;
use crate::ranker::match_recordings;
use crate::retry::Outcome;
use crate::search::{RecordingSearch, SearchTicket};
use crate::similarity::{similar_lengths, similar_titles};
use crate::track::{Track, TrackSnapshot, TrackState};

struct SuggestionsInner {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<EntityCache>,
    pools: ReleaseGroupPools,
    search: RecordingSearch,
    debounce: Duration,
}

impl Drop for SuggestionsInner {
    fn drop(&mut self) {
        self.pools.shutdown();
    }
}

/// Suggestion engine for one release editing session.
#[derive(Clone)]
pub struct RecordingSuggestions {
    inner: Arc<SuggestionsInner>,
}

impl RecordingSuggestions {
    pub fn new(backend: Arc<dyn SearchBackend>, config: &SuggestConfig) -> Self {
        Self::with_cache(backend, Arc::new(EntityCache::new()), config)
    }

    pub fn with_cache(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<EntityCache>,
        config: &SuggestConfig,
    ) -> Self {
        let retry = config.retry_policy();
        let pools = ReleaseGroupPools::new(
            backend.clone(),
            cache.clone(),
            retry,
            config.pool_page_size,
        );
        let search = RecordingSearch::new(
            backend.clone(),
            cache.clone(),
            retry,
            config.search_limit,
        );
        Self {
            inner: Arc::new(SuggestionsInner {
                backend,
                cache,
                pools,
                search,
                debounce: config.debounce(),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.inner.cache
    }

    /// Select the release group whose recordings are preferred. Returns
    /// false if it was already selected.
    pub fn select_release_group(&self, release_group_id: Option<String>) -> bool {
        self.inner.pools.select(release_group_id)
    }

    /// Select a release group and refresh every track's suggestions.
    pub async fn release_group_changed(&self, release_group_id: Option<String>, tracks: &[Track]) {
        if !self.select_release_group(release_group_id) {
            return;
        }
        for track in tracks {
            self.find_recording_suggestions(track).await;
        }
    }

    /// Run one suggestion cycle for `track`. Safe to call repeatedly.
    pub async fn find_recording_suggestions(&self, track: &Track) {
        let state = track.state();
        if state.name.trim().is_empty() || !state.has_complete_credit() {
            debug!(track = track.id(), "Skipping suggestions for incomplete track");
            return;
        }

        let slot = track.search_slot();
        let ticket = slot.begin();
        let suggestions = match self.match_candidates(&state, &ticket).await {
            Outcome::Completed(suggestions) => suggestions,
            Outcome::Cancelled => {
                debug!(track = track.id(), "Suggestion cycle superseded");
                return;
            }
            Outcome::GaveUp => {
                warn!(track = track.id(), "No suggestion source answered");
                Vec::new()
            }
        };
        if !slot.is_current(&ticket) {
            return;
        }

        let suggestions = with_saved_recording(track, suggestions);
        info!(
            track = track.id(),
            "Publishing {} suggested recording(s)",
            suggestions.len()
        );
        track.set_suggested_recordings(suggestions);
        slot.finish(&ticket);
    }

    async fn match_candidates(
        &self,
        state: &TrackState,
        ticket: &SearchTicket,
    ) -> Outcome<Vec<Arc<Recording>>> {
        let cache = &self.inner.cache;
        if let Some(pool) = self.inner.pools.current(ticket.token()).await {
            let pool = cache.refreshed(&pool);
            if let Some(matched) = match_recordings(&state.name, state.length, &pool) {
                debug!("Matched {} recording(s) from release group", matched.len());
                return Outcome::Completed(matched);
            }
        }
        if ticket.is_cancelled() {
            return Outcome::Cancelled;
        }

        let shown = cache.refreshed(&state.suggested_recordings);
        if let Some(matched) = match_recordings(&state.name, state.length, &shown) {
            debug!("Matched {} recording(s) from current suggestions", matched.len());
            return Outcome::Completed(matched);
        }

        match self
            .inner
            .search
            .search(&state.name, state.length, &state.artist_credit, ticket)
            .await
        {
            Outcome::Completed(results) => Outcome::Completed(
                match_recordings(&state.name, state.length, &results).unwrap_or_default(),
            ),
            other => other,
        }
    }

    /// Follow edits to `track`. A name or length edit re-links right away;
    /// any edit to name, length or artist credit completeness refreshes the
    /// suggestions once the edits settle. Watching stops when the returned
    /// handle is dropped.
    pub fn track(&self, track: &Track) -> TrackWatch {
        let debouncer = {
            let engine = self.clone();
            let track = track.clone();
            Debouncer::new(self.inner.debounce, move || {
                let engine = engine.clone();
                let track = track.clone();
                async move { engine.find_recording_suggestions(&track).await }
            })
        };

        let track = track.clone();
        let mut rx = track.subscribe();
        let mut last = WatchedFields::of(&rx.borrow_and_update());
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let current = WatchedFields::of(&rx.borrow_and_update());
                if current == last {
                    continue;
                }
                if current.name != last.name || current.length != last.length {
                    restore_recording(&track);
                }
                last = current;
                debouncer.call();
            }
        });
        TrackWatch { task }
    }

    /// Adapter for a paged autocomplete widget bound to `track`.
    pub fn autocomplete_hook(&self, track: &Track) -> AutocompleteHook {
        AutocompleteHook::new(
            track.clone(),
            self.inner.backend.clone(),
            self.inner.cache.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WatchedFields {
    name: String,
    length: Option<u64>,
    credit_complete: bool,
}

impl WatchedFields {
    fn of(state: &TrackState) -> Self {
        Self {
            name: state.name.clone(),
            length: state.length,
            credit_complete: state.has_complete_credit(),
        }
    }
}

/// Keeps a track under watch until dropped.
pub struct TrackWatch {
    task: JoinHandle<()>,
}

impl Drop for TrackWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn resembles(state: &TrackState, snapshot: &TrackSnapshot) -> bool {
    similar_titles(&state.name, &snapshot.name) && similar_lengths(state.length, snapshot.length)
}

/// Link the saved recording if the track still resembles its saved
/// version, else the original recording if it resembles the original, else
/// nothing. Needs no backend.
pub fn restore_recording(track: &Track) {
    let state = track.state();
    let recording = match (track.saved(), track.original()) {
        (Some(saved), _) if resembles(&state, &saved) => saved.recording,
        (_, Some(original)) if resembles(&state, &original) => original.recording,
        _ => None,
    };
    track.set_recording(recording);
}

/// Put the saved recording first when the track has none linked, without
/// listing it twice.
fn with_saved_recording(track: &Track, suggestions: Vec<Arc<Recording>>) -> Vec<Arc<Recording>> {
    if track.state().recording.is_some() {
        return suggestions;
    }
    let Some(saved) = track.saved().and_then(|snapshot| snapshot.recording) else {
        return suggestions;
    };
    let mut promoted = Vec::with_capacity(suggestions.len() + 1);
    promoted.push(saved.clone());
    promoted.extend(suggestions.into_iter().filter(|r| r.id != saved.id));
    promoted
}
