//! Per-track fallback search and the single-flight slot that owns it.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity_cache::EntityCache;
use crate::models::{ArtistCreditName, Recording};
use crate::musicbrainz::{SearchBackend, SearchRequest};
use crate::query::build_recording_query;
use crate::retry::{Outcome, RetryPolicy};

/// Proof of which operation currently owns a track's slot.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    token: CancellationToken,
}

impl SearchTicket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Default)]
struct SlotState {
    generation: u64,
    current: Option<CancellationToken>,
}

/// At most one live suggestion operation per track.
#[derive(Default)]
pub struct SearchSlot {
    state: Mutex<SlotState>,
}

impl SearchSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancel whatever operation holds the slot and hand it to a new one.
    pub fn begin(&self) -> SearchTicket {
        let mut state = self.lock();
        if let Some(previous) = state.current.take() {
            previous.cancel();
        }
        state.generation += 1;
        let token = CancellationToken::new();
        state.current = Some(token.clone());
        SearchTicket {
            generation: state.generation,
            token,
        }
    }

    /// Whether `ticket` still owns the slot. Only the owner may write results.
    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        !ticket.is_cancelled() && self.lock().generation == ticket.generation
    }

    /// Release the slot if `ticket` still owns it.
    pub fn finish(&self, ticket: &SearchTicket) {
        let mut state = self.lock();
        if state.generation == ticket.generation {
            state.current = None;
        }
    }
}

/// Backend search scoped to one track's title, length and artists.
#[derive(Clone)]
pub struct RecordingSearch {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<EntityCache>,
    retry: RetryPolicy,
    limit: u32,
}

impl RecordingSearch {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<EntityCache>,
        retry: RetryPolicy,
        limit: u32,
    ) -> Self {
        Self {
            backend,
            cache,
            retry,
            limit,
        }
    }

    /// Search until it succeeds or `ticket` is superseded. A blank name
    /// yields an empty result without touching the backend.
    pub async fn search(
        &self,
        name: &str,
        length: Option<u64>,
        artist_credit: &[ArtistCreditName],
        ticket: &SearchTicket,
    ) -> Outcome<Vec<Arc<Recording>>> {
        let Some(query) = build_recording_query(name, length, artist_credit) else {
            return Outcome::Completed(Vec::new());
        };
        debug!("Searching recordings for track: {}", query);
        let request = SearchRequest::recordings(query, self.limit, 0);
        let outcome = self
            .retry
            .run("Recording search", ticket.token(), || {
                self.backend.search(&request)
            })
            .await;
        match outcome {
            Outcome::Completed(page) => Outcome::Completed(
                page.recordings
                    .iter()
                    .map(|record| self.cache.recording_from_record(record))
                    .collect(),
            ),
            Outcome::Cancelled => Outcome::Cancelled,
            Outcome::GaveUp => Outcome::GaveUp,
        }
    }
}
