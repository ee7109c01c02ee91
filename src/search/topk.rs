//! Top-K collection of correlation peaks.

use std::cmp::Ordering;

/// Scored template placement (top-left corner) at one pyramid level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Top-K container with O(k) insertion cost.
pub(crate) struct TopK {
    k: usize,
    items: Vec<Peak>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    /// Pushes a peak, evicting the lowest-ranked one if at capacity.
    pub(crate) fn push(&mut self, peak: Peak) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(peak);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if peak_cmp_desc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if peak_cmp_desc(&peak, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = peak;
        }
    }

    pub(crate) fn extend(&mut self, peaks: impl IntoIterator<Item = Peak>) {
        for peak in peaks {
            self.push(peak);
        }
    }

    /// Returns peaks sorted by descending score.
    pub(crate) fn into_sorted_desc(mut self) -> Vec<Peak> {
        self.items.sort_by(peak_cmp_desc);
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::{Peak, TopK};

    #[test]
    fn keeps_highest_scores() {
        let mut topk = TopK::new(2);
        for (i, score) in [0.1f32, 0.9, 0.5, 0.7].into_iter().enumerate() {
            topk.push(Peak { x: i, y: 0, score });
        }
        let scores: Vec<f32> = topk.into_sorted_desc().iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }
}
