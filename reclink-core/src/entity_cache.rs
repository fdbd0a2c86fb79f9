use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::Recording;
use crate::musicbrainz::RecordingRecord;

/// Recordings materialized during one editing session, keyed by MBID.
///
/// Every source (release-group pool, track search, autocomplete) goes
/// through here, so the same recording is one shared `Arc` no matter which
/// source found it.
#[derive(Default)]
pub struct EntityCache {
    recordings: Mutex<HashMap<String, Arc<Recording>>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Recording>>> {
        self.recordings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Recording>> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The cached instance of each recording. Holders of an older `Arc`,
    /// such as a loaded release-group pool, see release data backfilled
    /// since. Recordings unknown to the cache are kept as given.
    pub fn refreshed(&self, recordings: &[Arc<Recording>]) -> Vec<Arc<Recording>> {
        let cached = self.lock();
        recordings
            .iter()
            .map(|recording| {
                cached
                    .get(&recording.id)
                    .cloned()
                    .unwrap_or_else(|| recording.clone())
            })
            .collect()
    }

    /// Return the cached recording for a search record, creating it on
    /// first sight. A cached recording without release data picks up the
    /// record's `appears_on`.
    pub fn recording_from_record(&self, record: &RecordingRecord) -> Arc<Recording> {
        let mut recordings = self.lock();
        if let Some(existing) = recordings.get_mut(&record.id) {
            if existing.appears_on.is_none() {
                if let Some(appears_on) = record.appears_on() {
                    let mut backfilled = (**existing).clone();
                    backfilled.appears_on = Some(appears_on);
                    *existing = Arc::new(backfilled);
                }
            }
            return existing.clone();
        }
        let recording = Arc::new(record.to_recording());
        recordings.insert(record.id.clone(), recording.clone());
        recording
    }
}
