use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reclink_core::models::ArtistCreditName;
use reclink_core::musicbrainz::{
    ArtistCreditRecord, ArtistRecord, RecordingRecord, ReleaseGroupRecord, ReleaseRecord,
    SearchBackend, SearchError, SearchPage, SearchRequest,
};

/// Initialize tracing for tests with proper test output handling
#[allow(dead_code)]
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true)
        .try_init();
}

/// In-memory search backend.
///
/// `rgid:<id>` queries page through the recordings registered for that
/// release group; every other query pages through the catalog. Each request
/// is logged before it is answered.
#[derive(Default)]
pub struct MockBackend {
    catalog: Mutex<Vec<RecordingRecord>>,
    release_groups: Mutex<HashMap<String, Vec<RecordingRecord>>>,
    /// Indexes of calls (0-based) that fail with a 503.
    failing_calls: Mutex<HashSet<usize>>,
    fail_all: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<SearchRequest>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(records: Vec<RecordingRecord>) -> Self {
        let backend = Self::new();
        *backend.catalog.lock().unwrap() = records;
        backend
    }

    pub fn add_release_group(&self, release_group_id: &str, records: Vec<RecordingRecord>) {
        self.release_groups
            .lock()
            .unwrap()
            .insert(release_group_id.to_string(), records);
    }

    pub fn fail_call(&self, index: usize) {
        self.failing_calls.lock().unwrap().insert(index);
    }

    pub fn fail_all(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    /// Answer every request only after `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<SearchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn offsets(&self) -> Vec<u32> {
        self.calls().iter().map(|call| call.offset).collect()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_all.lock().unwrap() || self.failing_calls.lock().unwrap().contains(&index) {
            return Err(SearchError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }

        let records = match request.query.strip_prefix("rgid:") {
            Some(release_group_id) => self
                .release_groups
                .lock()
                .unwrap()
                .get(&release_group_id.replace('\\', ""))
                .cloned()
                .unwrap_or_default(),
            None => self.catalog.lock().unwrap().clone(),
        };
        let start = (request.offset as usize).min(records.len());
        let end = (start + request.limit as usize).min(records.len());
        Ok(SearchPage {
            count: records.len() as u64,
            offset: u64::from(request.offset),
            recordings: records[start..end].to_vec(),
        })
    }
}

/// A recording by artist `a1` that appears on one release per listed
/// release group.
#[allow(dead_code)]
pub fn make_record(
    id: &str,
    title: &str,
    length: Option<u64>,
    release_groups: &[&str],
) -> RecordingRecord {
    RecordingRecord {
        id: id.to_string(),
        title: title.to_string(),
        length,
        artist_credit: vec![ArtistCreditRecord {
            name: "Artist".to_string(),
            joinphrase: String::new(),
            artist: Some(ArtistRecord {
                id: "a1".to_string(),
                name: "Artist".to_string(),
            }),
        }],
        disambiguation: String::new(),
        video: None,
        releases: Some(
            release_groups
                .iter()
                .enumerate()
                .map(|(i, release_group)| ReleaseRecord {
                    id: format!("{id}-release-{i}"),
                    title: "Album".to_string(),
                    release_group: Some(ReleaseGroupRecord {
                        id: release_group.to_string(),
                    }),
                })
                .collect(),
        ),
    }
}

/// `count` distinct recordings named `Track N`.
#[allow(dead_code)]
pub fn numbered_records(count: usize, release_group: &str) -> Vec<RecordingRecord> {
    (0..count)
        .map(|i| {
            make_record(
                &format!("rec-{i}"),
                &format!("Track {i}"),
                Some(180_000),
                &[release_group],
            )
        })
        .collect()
}

#[allow(dead_code)]
pub fn credit() -> Vec<ArtistCreditName> {
    vec![ArtistCreditName::new("a1", "Artist")]
}
