use std::cmp::Reverse;
use std::sync::Arc;

use crate::models::Recording;
use crate::similarity::{
    similar_lengths, similar_names, strip_parenthetical, MAX_LENGTH_DIFFERENCE,
};

/// Length difference used for every candidate when the track itself has
/// no length, so that only appearances decide the order.
pub const NEUTRAL_LENGTH_DIFFERENCE: u64 = MAX_LENGTH_DIFFERENCE / 2;

/// Whether `recording` could be the recording of a track with this name and
/// length.
pub fn is_candidate(name: &str, length: Option<u64>, recording: &Recording) -> bool {
    similar_lengths(length, recording.length)
        && (similar_names(name, &recording.name)
            || similar_names(name, strip_parenthetical(&recording.name)))
}

/// Sort key for the length tie-break. Candidates without a length sort last.
pub fn length_difference(length: Option<u64>, recording: &Recording) -> u64 {
    match (length, recording.length) {
        (None, _) => NEUTRAL_LENGTH_DIFFERENCE,
        (Some(_), None) => u64::MAX,
        (Some(a), Some(b)) => a.abs_diff(b),
    }
}

/// Keep the candidates matching a track and order them best first: most
/// release appearances, then closest length. Equal candidates keep their
/// input order. `None` when nothing matches, so the caller can move on to
/// another source.
pub fn match_recordings(
    name: &str,
    length: Option<u64>,
    candidates: &[Arc<Recording>],
) -> Option<Vec<Arc<Recording>>> {
    let mut matches: Vec<Arc<Recording>> = candidates
        .iter()
        .filter(|recording| is_candidate(name, length, recording))
        .cloned()
        .collect();
    if matches.is_empty() {
        return None;
    }
    matches.sort_by_key(|recording| {
        (
            Reverse(recording.appearance_count()),
            length_difference(length, recording),
        )
    });
    Some(matches)
}
