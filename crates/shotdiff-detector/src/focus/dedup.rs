use std::cmp::Ordering;

use shotdiff_types::FocusCandidate;

/// Collapses every group of transitively overlapping candidates to a single
/// winner and returns the winners in reading order.
///
/// Winners are picked by kind priority, then larger extent, then reading order.
pub(crate) fn resolve_overlaps(candidates: Vec<FocusCandidate>) -> Vec<FocusCandidate> {
    if candidates.len() < 2 {
        return candidates;
    }

    let mut dsu = DisjointSet::with_len(candidates.len());
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if candidates[i].extent.intersects(&candidates[j].extent) {
                dsu.union(i, j);
            }
        }
    }

    let mut winners: Vec<Option<usize>> = vec![None; candidates.len()];
    for idx in 0..candidates.len() {
        let root = dsu.find(idx);
        let slot = &mut winners[root];
        match slot {
            Some(current) if outranks(&candidates[*current], &candidates[idx]) => {}
            _ => *slot = Some(idx),
        }
    }

    let mut kept: Vec<FocusCandidate> = winners
        .into_iter()
        .flatten()
        .map(|idx| candidates[idx])
        .collect();
    kept.sort_by_key(|candidate| (candidate.extent.y, candidate.extent.x, candidate.kind));
    kept
}

fn outranks(a: &FocusCandidate, b: &FocusCandidate) -> bool {
    let ordering = a
        .kind
        .priority()
        .cmp(&b.kind.priority())
        .then(a.extent.area().cmp(&b.extent.area()))
        .then((b.extent.y, b.extent.x).cmp(&(a.extent.y, a.extent.x)));
    ordering != Ordering::Less
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn with_len(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let parent = self.parent[x];
        if parent == x {
            return x;
        }
        let root = self.find(parent);
        self.parent[x] = root;
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.rank[root_a] < self.rank[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b] = root_a;
        if self.rank[root_a] == self.rank[root_b] {
            self.rank[root_a] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdiff_types::{BoundingBox, FocusKind};

    fn candidate(kind: FocusKind, x: u32, y: u32, w: u32, h: u32) -> FocusCandidate {
        FocusCandidate::new(kind, BoundingBox::new(x, y, w, h))
    }

    #[test]
    fn cursor_beats_enclosing_border() {
        let border = candidate(FocusKind::Border, 10, 10, 200, 30);
        let cursor = candidate(FocusKind::Cursor, 40, 15, 1, 14);
        let kept = resolve_overlaps(vec![border, cursor]);
        assert_eq!(kept, vec![cursor]);
    }

    #[test]
    fn border_beats_bold_and_chains_are_transitive() {
        let bold_a = candidate(FocusKind::Bold, 0, 0, 20, 10);
        let border = candidate(FocusKind::Border, 15, 5, 100, 30);
        let bold_b = candidate(FocusKind::Bold, 110, 30, 20, 10);
        let kept = resolve_overlaps(vec![bold_a, bold_b, border]);
        assert_eq!(kept, vec![border]);
    }

    #[test]
    fn same_kind_prefers_larger_then_earlier() {
        let small = candidate(FocusKind::Bold, 0, 0, 10, 10);
        let large = candidate(FocusKind::Bold, 5, 5, 20, 10);
        assert_eq!(resolve_overlaps(vec![small, large]), vec![large]);

        let first = candidate(FocusKind::Bold, 0, 0, 10, 10);
        let second = candidate(FocusKind::Bold, 5, 0, 10, 10);
        assert_eq!(resolve_overlaps(vec![second, first]), vec![first]);
    }

    #[test]
    fn disjoint_candidates_are_sorted_and_stable_under_reapplication() {
        let a = candidate(FocusKind::Bold, 50, 100, 20, 10);
        let b = candidate(FocusKind::Cursor, 10, 100, 1, 14);
        let c = candidate(FocusKind::Border, 0, 10, 80, 30);
        let once = resolve_overlaps(vec![a, b, c]);
        assert_eq!(once, vec![c, b, a]);
        assert_eq!(resolve_overlaps(once.clone()), once);
    }
}
