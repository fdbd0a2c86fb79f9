use std::sync::Arc;

use tracing::debug;

use crate::entity_cache::EntityCache;
use crate::models::Recording;
use crate::musicbrainz::{SearchBackend, SearchError, SearchRequest};
use crate::query::build_recording_query;
use crate::track::Track;

/// A page request from an autocomplete widget. Pages start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutocompleteRequest {
    pub search: String,
    pub page: u32,
    pub page_size: u32,
}

impl AutocompleteRequest {
    pub fn new(search: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self {
            search: search.into(),
            page,
            page_size,
        }
    }

    fn limit(&self) -> u32 {
        self.page_size.max(1)
    }

    fn offset(&self) -> u32 {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutocompletePage {
    pub recordings: Vec<Arc<Recording>>,
    pub page: u32,
    pub total_pages: u32,
}

/// Recording lookup for a track's autocomplete field.
///
/// Free text replaces the title while the track's length and artists still
/// scope the query. Errors go back to the widget; nothing is retried.
pub struct AutocompleteHook {
    track: Track,
    backend: Arc<dyn SearchBackend>,
    cache: Arc<EntityCache>,
}

impl AutocompleteHook {
    pub(crate) fn new(track: Track, backend: Arc<dyn SearchBackend>, cache: Arc<EntityCache>) -> Self {
        Self {
            track,
            backend,
            cache,
        }
    }

    pub async fn fetch(&self, request: &AutocompleteRequest) -> Result<AutocompletePage, SearchError> {
        let state = self.track.state();
        let Some(query) = build_recording_query(&request.search, state.length, &state.artist_credit)
        else {
            return Ok(AutocompletePage {
                recordings: Vec::new(),
                page: 1,
                total_pages: 0,
            });
        };

        let limit = request.limit();
        let search = SearchRequest::recordings(query, limit, request.offset());
        debug!(
            "Autocomplete search page {} ({} per page): {}",
            request.page, limit, search.query
        );
        let page = self.backend.search(&search).await?;

        let recordings = page
            .recordings
            .iter()
            .map(|record| self.cache.recording_from_record(record))
            .collect();
        let limit = u64::from(limit);
        Ok(AutocompletePage {
            recordings,
            page: (page.offset / limit + 1) as u32,
            total_pages: page.count.div_ceil(limit) as u32,
        })
    }
}
