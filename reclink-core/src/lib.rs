pub mod autocomplete;
pub mod config;
pub mod debounce;
pub mod entity_cache;
pub mod models;
pub mod musicbrainz;
pub mod pool;
pub mod query;
pub mod ranker;
pub mod retry;
pub mod search;
pub mod similarity;
pub mod suggestions;
pub mod track;

pub use config::SuggestConfig;
pub use musicbrainz::{MusicBrainzClient, SearchBackend, SearchError};
pub use suggestions::RecordingSuggestions;
pub use track::{Track, TrackState};
