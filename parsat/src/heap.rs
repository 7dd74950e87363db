use crate::intmap::{AsIndex, IntMap};

/// Indexed binary heap over keys `K`, ordered by decreasing activity.
///
/// The activity map lives in the solver and is passed into every operation,
/// so bumping an activity and reordering the heap stay two separate steps.
#[derive(Debug, Clone)]
pub struct Heap<K: AsIndex> {
    heap: Vec<K>,
    indices: IntMap<K, i32>,
}

impl<K: AsIndex> Default for Heap<K> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            indices: IntMap::new(),
        }
    }
}

#[inline(always)]
fn left(i: usize) -> usize {
    2 * i + 1
}
#[inline(always)]
fn parent(i: usize) -> usize {
    (i - 1) >> 1
}

impl<K: AsIndex> Heap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    pub fn in_heap(&self, k: K) -> bool {
        self.indices.has(k) && self.indices[k] >= 0
    }

    /// The element at heap slot `i`; used for random decisions.
    #[inline]
    pub fn peek_slot(&self, i: usize) -> K {
        self.heap[i]
    }

    fn percolate_up(&mut self, mut i: usize, act: &IntMap<K, f64>) {
        let x = self.heap[i];
        while i != 0 && act[x] > act[self.heap[parent(i)]] {
            let p = self.heap[parent(i)];
            self.heap[i] = p;
            self.indices[p] = i as i32;
            i = parent(i);
        }
        self.heap[i] = x;
        self.indices[x] = i as i32;
    }

    fn percolate_down(&mut self, mut i: usize, act: &IntMap<K, f64>) {
        let x = self.heap[i];
        loop {
            let l = left(i);
            if l >= self.heap.len() {
                break;
            }
            let r = l + 1;
            let child = if r < self.heap.len() && act[self.heap[r]] > act[self.heap[l]] {
                r
            } else {
                l
            };
            if act[self.heap[child]] <= act[x] {
                break;
            }
            let c = self.heap[child];
            self.heap[i] = c;
            self.indices[c] = i as i32;
            i = child;
        }
        self.heap[i] = x;
        self.indices[x] = i as i32;
    }

    /// Reorder `k` after its activity was bumped.
    pub fn decrease(&mut self, k: K, act: &IntMap<K, f64>) {
        debug_assert!(self.in_heap(k));
        let i = self.indices[k] as usize;
        self.percolate_up(i, act);
    }

    pub fn insert(&mut self, k: K, act: &IntMap<K, f64>) {
        self.indices.reserve(k, -1);
        debug_assert!(!self.in_heap(k));
        self.indices[k] = self.heap.len() as i32;
        self.heap.push(k);
        self.percolate_up(self.heap.len() - 1, act);
    }

    /// Remove and return the most active element.
    pub fn remove_min(&mut self, act: &IntMap<K, f64>) -> K {
        let x = self.heap[0];
        let last = self.heap.pop().expect("cannot pop from empty heap");
        self.indices[x] = -1;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.indices[last] = 0;
            self.percolate_down(0, act);
        }
        x
    }

    /// Rebuild the heap from scratch out of `ks`.
    pub fn build(&mut self, ks: &[K], act: &IntMap<K, f64>) {
        for &k in &self.heap {
            self.indices[k] = -1;
        }
        self.heap.clear();
        for (i, &k) in ks.iter().enumerate() {
            self.indices.reserve(k, -1);
            self.indices[k] = i as i32;
            self.heap.push(k);
        }
        if self.heap.len() > 1 {
            for i in (0..self.heap.len() / 2).rev() {
                self.percolate_down(i, act);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_order() {
        let mut heap: Heap<u32> = Heap::new();
        let mut act: IntMap<u32, f64> = IntMap::new();
        for v in 0u32..10 {
            act.insert(v, (v as f64) * 0.5, 0.0);
        }
        for v in 0u32..10 {
            heap.insert(v, &act);
        }
        assert!(heap.in_heap(3));
        let mut seen = vec![];
        while !heap.is_empty() {
            seen.push(heap.remove_min(&act));
        }
        // most active first
        assert_eq!(seen, (0u32..10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_decrease() {
        let mut heap: Heap<u32> = Heap::new();
        let mut act: IntMap<u32, f64> = IntMap::new();
        for v in 0u32..4 {
            act.insert(v, v as f64, 0.0);
            heap.insert(v, &act);
        }
        act[1] = 100.0;
        heap.decrease(1, &act);
        assert_eq!(heap.remove_min(&act), 1);
    }
}
