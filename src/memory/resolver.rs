//! Unique / ambiguous / not-found decision over ranked memory hits.
//!
//! With at least two hits, the best match is ambiguous when its distance is
//! more than [`AMBIGUITY_RATIO`] of the runner-up's, i.e. it is not clearly
//! closer than the alternative.

use super::types::VectorHit;

pub const AMBIGUITY_RATIO: f32 = 0.7;

/// Candidates offered back to the user on ambiguity.
pub const MAX_CANDIDATES: usize = 3;

/// Lower bound on hits fetched before deciding, so the ratio always has a runner-up to compare.
pub const MIN_RESOLVE_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    NotFound,
    Unique(VectorHit),
    Ambiguous(Vec<VectorHit>),
}

/// `hits` must be sorted by ascending distance.
pub fn resolve(mut hits: Vec<VectorHit>) -> Resolution {
    if hits.is_empty() {
        return Resolution::NotFound;
    }
    if is_ambiguous(&hits) {
        hits.truncate(MAX_CANDIDATES);
        return Resolution::Ambiguous(hits);
    }
    Resolution::Unique(hits.swap_remove(0))
}

pub fn is_ambiguous(hits: &[VectorHit]) -> bool {
    match hits {
        [best, runner_up, ..] => best.distance > AMBIGUITY_RATIO * runner_up.distance,
        _ => false,
    }
}

/// Bullet list of candidate contents, one `- ` line each.
pub fn format_candidates(candidates: &[VectorHit]) -> String {
    candidates
        .iter()
        .take(MAX_CANDIDATES)
        .map(|h| format!("- {}", h.content))
        .collect::<Vec<_>>()
        .join("\n")
}
