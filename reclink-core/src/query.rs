use crate::models::{credit_artist_ids, ArtistCreditName};
use crate::similarity::MAX_LENGTH_DIFFERENCE;

/// Escape characters that have a meaning in Lucene query syntax.
pub fn escape_lucene(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '+' | '-'
                | '&'
                | '|'
                | '!'
                | '('
                | ')'
                | '{'
                | '}'
                | '['
                | ']'
                | '^'
                | '"'
                | '~'
                | '*'
                | '?'
                | ':'
                | '\\'
                | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the recording search query for a track.
///
/// Title together with every credited artist is boosted above title alone,
/// and a known length restricts results to recordings of similar duration
/// or with no duration at all. Returns `None` for a blank title, which must
/// never be sent to the backend.
pub fn build_recording_query(
    name: &str,
    length: Option<u64>,
    artist_credit: &[ArtistCreditName],
) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let title_clause = format!("recording:({})", escape_lucene(name));
    let artist_ids = credit_artist_ids(artist_credit);

    let mut query = if artist_ids.is_empty() {
        format!("({})", title_clause)
    } else {
        let artists = artist_ids
            .iter()
            .map(|id| format!("arid:{}", escape_lucene(id)))
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(
            "(({} AND {})^2 OR ({}))",
            title_clause, artists, title_clause
        )
    };

    if let Some(length) = length {
        query.push_str(&format!(
            " AND (dur:[{} TO {}] OR -dur:[* TO *])",
            length.saturating_sub(MAX_LENGTH_DIFFERENCE),
            length + MAX_LENGTH_DIFFERENCE
        ));
    }

    Some(query)
}

/// Query listing every recording on a release group.
pub fn release_group_query(release_group_id: &str) -> String {
    format!("rgid:{}", escape_lucene(release_group_id))
}
