//! Observable track state shared between the editor and the suggestion
//! engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::models::{is_credit_complete, ArtistCreditName, Recording};
use crate::search::SearchSlot;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Name, length and linked recording at one point in a track's history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSnapshot {
    pub name: String,
    pub length: Option<u64>,
    pub recording: Option<Arc<Recording>>,
}

/// Live, editable fields of a track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackState {
    pub name: String,
    /// Duration in milliseconds.
    pub length: Option<u64>,
    pub artist_credit: Vec<ArtistCreditName>,
    pub recording: Option<Arc<Recording>>,
    pub suggested_recordings: Vec<Arc<Recording>>,
}

impl TrackState {
    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            name: self.name.clone(),
            length: self.length,
            recording: self.recording.clone(),
        }
    }

    pub fn has_complete_credit(&self) -> bool {
        is_credit_complete(&self.artist_credit)
    }
}

struct TrackInner {
    id: u64,
    state: watch::Sender<TrackState>,
    saved: Mutex<Option<TrackSnapshot>>,
    original: Option<TrackSnapshot>,
    search: SearchSlot,
}

/// Handle to one track of a release being edited. Clones share the track.
///
/// Every setter notifies subscribers only when the value actually changed.
#[derive(Clone)]
pub struct Track {
    inner: Arc<TrackInner>,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl Track {
    /// A track that has never been saved.
    pub fn new(state: TrackState) -> Self {
        Self::build(state, None)
    }

    /// A track loaded from an existing release. Its current fields become
    /// both the saved and the original snapshot.
    pub fn from_saved(state: TrackState) -> Self {
        let snapshot = state.snapshot();
        Self::build(state, Some(snapshot))
    }

    fn build(state: TrackState, snapshot: Option<TrackSnapshot>) -> Self {
        let (sender, _) = watch::channel(state);
        Self {
            inner: Arc::new(TrackInner {
                id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
                state: sender,
                saved: Mutex::new(snapshot.clone()),
                original: snapshot,
                search: SearchSlot::default(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Copy of the current fields.
    pub fn state(&self) -> TrackState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackState> {
        self.inner.state.subscribe()
    }

    pub fn saved(&self) -> Option<TrackSnapshot> {
        self.inner
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn original(&self) -> Option<TrackSnapshot> {
        self.inner.original.clone()
    }

    /// Record the current fields as the last saved version.
    pub fn mark_saved(&self) {
        let snapshot = self.inner.state.borrow().snapshot();
        *self
            .inner
            .saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot);
    }

    pub(crate) fn search_slot(&self) -> &SearchSlot {
        &self.inner.search
    }

    fn update<F>(&self, modify: F)
    where
        F: FnOnce(&mut TrackState) -> bool,
    {
        self.inner.state.send_if_modified(modify);
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.update(|state| {
            if state.name == name {
                return false;
            }
            state.name = name;
            true
        });
    }

    pub fn set_length(&self, length: Option<u64>) {
        self.update(|state| {
            if state.length == length {
                return false;
            }
            state.length = length;
            true
        });
    }

    pub fn set_artist_credit(&self, artist_credit: Vec<ArtistCreditName>) {
        self.update(|state| {
            if state.artist_credit == artist_credit {
                return false;
            }
            state.artist_credit = artist_credit;
            true
        });
    }

    pub fn set_recording(&self, recording: Option<Arc<Recording>>) {
        self.update(|state| {
            if state.recording == recording {
                return false;
            }
            state.recording = recording;
            true
        });
    }

    pub fn set_suggested_recordings(&self, suggested: Vec<Arc<Recording>>) {
        self.update(|state| {
            if state.suggested_recordings == suggested {
                return false;
            }
            state.suggested_recordings = suggested;
            true
        });
    }
}
