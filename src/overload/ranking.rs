//! Ranking of viable candidates.

use super::{Candidate, OverloadMatch};

/// Outcome of ranking the viable candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ranking {
    /// Position of the single best match in the viable list.
    Winner(usize),
    /// Positions of the candidates tied for the lowest cost.
    Ambiguous(Vec<usize>),
}

/// Pick the lowest-cost viable candidate.
///
/// `viable` pairs an index into `candidates` with its match result. Among the
/// candidates sharing the lowest cost, those registered by the same class
/// with the same signature fingerprint shadow each other and only the most
/// recent one stays. If exactly one survivor remains it wins; otherwise the
/// call is ambiguous and the survivors are returned.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn find_best_match(viable: &[(usize, OverloadMatch)], candidates: &[Candidate<'_>]) -> Ranking {
    let Some(best_cost) = viable.iter().map(|(_, m)| m.total_cost).min() else {
        return Ranking::Ambiguous(Vec::new());
    };

    let candidate_at = |position: usize| &candidates[viable[position].0];
    let mut survivors: Vec<usize> = Vec::new();
    for (position, (_, matched)) in viable.iter().enumerate() {
        if matched.total_cost != best_cost {
            continue;
        }
        let candidate = candidate_at(position);
        let shadowed = survivors.iter_mut().find(|survivor| {
            let other = candidate_at(**survivor);
            other.owner == candidate.owner
                && other.overload.fingerprint() == candidate.overload.fingerprint()
        });
        match shadowed {
            Some(survivor) => {
                if candidate.overload.sequence() > candidate_at(*survivor).overload.sequence() {
                    *survivor = position;
                }
            }
            None => survivors.push(position),
        }
    }

    match survivors.as_slice() {
        [only] => Ranking::Winner(*only),
        _ => Ranking::Ambiguous(survivors),
    }
}
