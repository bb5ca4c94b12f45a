/// Binary min-heap over node ids with a reverse index, so the key of a node that is already
/// queued can be lowered in place instead of pushing a duplicate entry.
#[derive(Default, Debug)]
pub(crate) struct IndexedBinaryHeap<Key> {
    heap: Vec<(Key, usize)>,
    // node id -> position in `heap`
    positions: Vec<Option<usize>>,
}

impl<Key> IndexedBinaryHeap<Key>
where
    Key: Ord + Copy,
{
    pub fn resize(&mut self, num_ids: usize) {
        self.positions.resize(num_ids, None);
    }

    #[cfg(test)]
    pub fn contains(&self, id: usize) -> bool {
        self.positions.get(id).is_some_and(|position| position.is_some())
    }

    pub fn clear(&mut self) {
        for &(_, id) in self.heap.iter() {
            self.positions[id] = None;
        }
        self.heap.clear();
    }

    /// Inserts `id`, or lowers its key if it is queued with a larger one.
    /// Returns false when the queued key is already at most `key`.
    pub fn push_or_decrease(&mut self, id: usize, key: Key) -> bool {
        if id >= self.positions.len() {
            self.positions.resize(id + 1, None);
        }

        match self.positions[id] {
            Some(position) => {
                if self.heap[position].0 <= key {
                    return false;
                }
                self.heap[position].0 = key;
                self.sift_up(position);
            }
            None => {
                self.heap.push((key, id));
                self.positions[id] = Some(self.heap.len() - 1);
                self.sift_up(self.heap.len() - 1);
            }
        }
        true
    }

    pub fn pop(&mut self) -> Option<(Key, usize)> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let (key, id) = self.heap.pop()?;
        self.positions[id] = None;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((key, id))
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.heap[parent].0 <= self.heap[position].0 {
                break;
            }
            self.swap(parent, position);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut smallest = position;
            if left < self.heap.len() && self.heap[left].0 < self.heap[smallest].0 {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right].0 < self.heap[smallest].0 {
                smallest = right;
            }
            if smallest == position {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.positions[self.heap[i].1] = Some(i);
        self.positions[self.heap[j].1] = Some(j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(vec![(1, 5), (2, 3), (3, 8), (4, 1)], vec![4, 2, 1, 3])]
    #[case(vec![(7, 0), (3, 0), (5, -2)], vec![5, 7, 3])]
    fn pops_in_key_order(#[case] entries: Vec<(usize, i64)>, #[case] expected: Vec<usize>) {
        let mut heap = IndexedBinaryHeap::default();
        for (id, key) in entries {
            assert!(heap.push_or_decrease(id, key));
        }

        let mut actual = Vec::new();
        while let Some((_, id)) = heap.pop() {
            actual.push(id);
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn decrease_key_reorders_without_duplicates() {
        let mut heap = IndexedBinaryHeap::default();
        heap.resize(6);
        heap.push_or_decrease(1, 10);
        heap.push_or_decrease(2, 20);
        heap.push_or_decrease(3, 30);

        assert!(!heap.push_or_decrease(1, 15));
        assert!(heap.push_or_decrease(3, 5));
        assert!(heap.contains(1) && heap.contains(2) && heap.contains(3));

        assert_eq!(heap.pop(), Some((5, 3)));
        assert!(!heap.contains(3));
        assert_eq!(heap.pop(), Some((10, 1)));
        assert_eq!(heap.pop(), Some((20, 2)));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn clear_resets_positions() {
        let mut heap = IndexedBinaryHeap::default();
        heap.push_or_decrease(4, 1);
        heap.push_or_decrease(2, 2);
        heap.clear();

        assert!(!heap.contains(4) && !heap.contains(2));
        assert!(heap.push_or_decrease(4, 7));
        assert_eq!(heap.pop(), Some((7, 4)));
    }
}
