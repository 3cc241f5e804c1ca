/// Round-robin selection across content kinds so no single category can
/// dominate a result set when alternatives exist.
use std::collections::BTreeMap;

use crate::models::ScoredCandidate;

/// Picks up to `target` candidates balanced across kinds. Candidates are
/// partitioned by kind; each partition is sorted by total score descending
/// with (recency descending, title ascending) as the explicit deterministic
/// tie-break; partitions are then drained round-robin in alphabetical kind
/// order until the target is reached or every partition is exhausted.
pub fn select_diverse(candidates: Vec<ScoredCandidate>, target: usize) -> Vec<ScoredCandidate> {
    if target == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut partitions: BTreeMap<String, Vec<ScoredCandidate>> = BTreeMap::new();
    for candidate in candidates {
        partitions
            .entry(candidate.candidate.kind.clone())
            .or_default()
            .push(candidate);
    }

    for partition in partitions.values_mut() {
        partition.sort_by(|a, b| {
            b.breakdown
                .total
                .partial_cmp(&a.breakdown.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.candidate.timestamp.cmp(&a.candidate.timestamp))
                .then_with(|| a.candidate.title.cmp(&b.candidate.title))
        });
    }

    let mut queues: Vec<std::vec::IntoIter<ScoredCandidate>> = partitions
        .into_values()
        .map(|partition| partition.into_iter())
        .collect();

    let mut selected = Vec::with_capacity(target);
    while selected.len() < target {
        let mut drained = true;
        for queue in queues.iter_mut() {
            if selected.len() >= target {
                break;
            }
            if let Some(candidate) = queue.next() {
                selected.push(candidate);
                drained = false;
            }
        }
        if drained {
            break;
        }
    }

    selected
}
