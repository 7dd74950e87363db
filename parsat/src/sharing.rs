/*****************************************************************************************[sharing.rs]
Copyright (c) 2003-2006, Niklas Een, Niklas Sorensson (MiniSat)
Copyright (c) 2007-2010, Niklas Sorensson (MiniSat)
Copyright (c) 2018-2018, Masaki Hara

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or
substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
**************************************************************************************************/

use crate::clause::Lit;

/// Batch of clauses one portfolio member publishes during a sharing round.
///
/// Append-only flat arena with a glue value per clause. Writers and readers
/// never overlap on the same pool; that discipline comes from the barrier
/// phases of the sharing protocol, not from the pool itself.
#[derive(Debug, Default)]
pub struct ClausePool {
    lits: Vec<Lit>,
    index: Vec<(u32, u32, u32)>, // (offset, len, glue)
}

impl ClausePool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Append a clause with its glue/LBD value.
    pub fn add(&mut self, c: &[Lit], glue: u32) {
        let off = self.lits.len() as u32;
        self.lits.extend_from_slice(c);
        self.index.push((off, c.len() as u32, glue));
    }

    /// The `i`-th stored clause and its glue value.
    pub fn get(&self, i: usize) -> (&[Lit], u32) {
        let (off, len, glue) = self.index[i];
        (&self.lits[off as usize..(off + len) as usize], glue)
    }

    /// Empty the pool; called once per round after all consumers drained it.
    pub fn reset(&mut self) {
        self.lits.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clause::Var;

    fn lit(i: u32) -> Lit {
        Lit::new(Var::from_idx(i), true)
    }

    #[test]
    fn test_add_get_reset() {
        let mut pool = ClausePool::new();
        assert!(pool.is_empty());
        pool.add(&[lit(0), lit(1)], 2);
        pool.add(&[lit(2)], 1);
        assert_eq!(pool.len(), 2);
        let (c0, g0) = pool.get(0);
        assert_eq!(c0, &[lit(0), lit(1)][..]);
        assert_eq!(g0, 2);
        let (c1, g1) = pool.get(1);
        assert_eq!(c1, &[lit(2)][..]);
        assert_eq!(g1, 1);
        pool.reset();
        assert!(pool.is_empty());
        pool.add(&[lit(3)], 3);
        assert_eq!(pool.get(0).0, &[lit(3)][..]);
    }
}
