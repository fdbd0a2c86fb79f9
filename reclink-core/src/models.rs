use serde::{Deserialize, Serialize};

/// One name in an artist credit, in credit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistCreditName {
    /// MBID of the credited artist. `None` while the user has typed a name
    /// but not yet picked an artist.
    pub artist_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub join_phrase: String,
}

impl ArtistCreditName {
    pub fn new(artist_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artist_id: Some(artist_id.into()),
            name: name.into(),
            join_phrase: String::new(),
        }
    }
}

/// A credit is complete when it names at least one artist and every name
/// is linked to an artist id.
pub fn is_credit_complete(credit: &[ArtistCreditName]) -> bool {
    !credit.is_empty()
        && credit
            .iter()
            .all(|name| name.artist_id.as_deref().is_some_and(|id| !id.is_empty()))
}

/// Artist ids of a credit, in credit order, skipping unlinked names.
pub fn credit_artist_ids(credit: &[ArtistCreditName]) -> Vec<&str> {
    credit
        .iter()
        .filter_map(|name| name.artist_id.as_deref())
        .filter(|id| !id.is_empty())
        .collect()
}

/// A release a recording appears on, summarized for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppearsOn {
    pub release_id: String,
    pub release_title: String,
    pub release_group_id: String,
}

/// A catalog recording that a track can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub name: String,
    /// Duration in milliseconds.
    pub length: Option<u64>,
    /// Artist credit rendered as a single display string.
    pub artist: String,
    /// Disambiguation comment, empty when there is none.
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub video: bool,
    /// Releases this recording appears on, at most one per release group.
    /// `None` when the source did not include release data.
    pub appears_on: Option<Vec<AppearsOn>>,
}

impl Recording {
    pub fn appearance_count(&self) -> usize {
        self.appears_on.as_ref().map_or(0, Vec::len)
    }
}
