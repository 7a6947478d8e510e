use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::types::MatchResult;

/// Candidate position paired with its score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredIndex {
    pub index: usize,
    pub score: f32,
}

/// Total order on scores with NaN below every real value.
fn compare_scores(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

// Greater means ranked earlier: higher score, then lower index.
impl PartialEq for ScoredIndex {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredIndex {}

impl Ord for ScoredIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_scores(self.score, other.score).then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for ScoredIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns the `min(k, n)` best `(index, score)` pairs, best first.
///
/// Ties keep the lower index. Runs a bounded min-heap in `O(n log k)`.
pub fn select_top_k(scores: &[f32], k: usize) -> Vec<ScoredIndex> {
    if k == 0 || scores.is_empty() {
        return Vec::new();
    }

    let capacity = k.min(scores.len());
    let mut heap: BinaryHeap<Reverse<ScoredIndex>> = BinaryHeap::with_capacity(capacity);

    for (index, &score) in scores.iter().enumerate() {
        let candidate = ScoredIndex { index, score };
        if heap.len() < capacity {
            heap.push(Reverse(candidate));
        } else if let Some(mut worst) = heap.peek_mut() {
            // Replacing through `PeekMut` sifts the new entry down on drop.
            if candidate > worst.0 {
                *worst = Reverse(candidate);
            }
        }
    }

    heap.into_sorted_vec().into_iter().map(|Reverse(s)| s).collect()
}

/// Maps the top-k of `scores` onto `keys`.
///
/// Returns an empty list when the lengths differ or `k == 0`.
pub fn rank<K: AsRef<str>>(keys: &[K], scores: &[f32], k: usize) -> Vec<MatchResult> {
    if keys.len() != scores.len() {
        return Vec::new();
    }

    select_top_k(scores, k)
        .into_iter()
        .map(|s| MatchResult::new(keys[s.index].as_ref(), s.score))
        .collect()
}
