/*****************************************************************************************[simp.rs]
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

use {
    crate::callbacks::Callbacks,
    crate::clause::{lbool, CRef, LMap, Lit, VMap, Var},
    crate::core::{Solver, SyncHook},
    crate::interface::SolverInterface,
    crate::intmap::IntMapBool,
    std::mem,
};

/// Simplifying CDCL solver: wraps the plain engine with bounded variable
/// elimination in the style of SatELite-based preprocessors.
///
/// Eliminated variables are recorded together with their removed clauses so
/// that (a) models of the simplified formula can be extended back to models
/// of the original one, and (b) a variable can be restored on demand when a
/// later incremental call constrains it again.
pub struct SimpSolver<Cb: Callbacks> {
    s: Solver<Cb>,
    use_simp: bool,
    /// Allowed growth of the clause database per eliminated variable.
    grow: i32,
    /// Resolvents longer than this block the elimination of their variable.
    clause_lim: i32,
    /// Variables with more occurrences than this on both sides are skipped.
    occ_lim: usize,
    /// Above this many original clauses, elimination is not attempted at all.
    simp_cls_limit: u64,
    frozen: IntMapBool<Var>,
    eliminated: IntMapBool<Var>,
    /// Solution-reconstruction stack: records of `[lits..., len]`, pivot
    /// literal stored last among the lits.
    elim_clauses: Vec<u32>,
    /// Clauses removed when eliminating a variable, kept for restore-on-demand.
    elim_crefs: VMap<Vec<CRef>>,
}

impl<Cb: Callbacks + Default> Default for SimpSolver<Cb> {
    fn default() -> Self {
        SimpSolver::new(crate::core::SolverOpts::default(), Default::default())
    }
}

impl<Cb: Callbacks> SimpSolver<Cb> {
    pub fn new(opts: crate::core::SolverOpts, cb: Cb) -> Self {
        Self {
            s: Solver::new(opts, cb),
            use_simp: true,
            grow: 0,
            clause_lim: 20,
            occ_lim: 10,
            simp_cls_limit: 200_000,
            frozen: IntMapBool::new(),
            eliminated: IntMapBool::new(),
            elim_clauses: vec![],
            elim_crefs: VMap::new(),
        }
    }

    /// Access the wrapped plain solver.
    pub fn inner(&self) -> &Solver<Cb> {
        &self.s
    }

    pub fn inner_mut(&mut self) -> &mut Solver<Cb> {
        &mut self.s
    }

    /// Number of original clauses above which simplification is skipped.
    pub fn max_simp_cls(&self) -> u64 {
        self.simp_cls_limit
    }

    /// If a variable is frozen it will not be eliminated.
    pub fn set_frozen(&mut self, v: Var, b: bool) {
        self.frozen.reserve(v);
        self.frozen.set(v, b);
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        self.eliminated.has(v) && self.eliminated[v]
    }

    /// Perform variable elimination based simplification.
    /// Returns `false` iff the formula was found unsatisfiable.
    /// `turn_off` disables elimination for the rest of the solver's life.
    pub fn eliminate(&mut self, turn_off: bool) -> bool {
        if self.use_simp
            && self.s.is_ok()
            && (self.s.n_orig_clauses() as u64) <= self.simp_cls_limit
        {
            self.eliminate_vars();
        }
        if turn_off {
            self.use_simp = false;
        }
        self.s.is_ok()
    }

    /// Monotonic work counter of the wrapped engine; paces sharing rounds.
    pub fn num_accesses(&self) -> u64 {
        self.s.num_accesses()
    }

    pub fn num_decisions(&self) -> u64 {
        self.s.num_decisions()
    }

    pub fn num_restarts(&self) -> u64 {
        self.s.num_restarts()
    }

    /// Perturb search heuristics based on the solver's portfolio rank.
    pub fn diversify(&mut self, rank: u32, span: u32) {
        self.s.diversify(rank, span);
    }

    /// Register the per-round synchronization callback of a portfolio.
    pub fn set_sync_hook(&mut self, hook: SyncHook<Cb>) {
        self.s.set_sync_hook(hook);
    }

    /// Number of literals proved at level 0 (the "unit clauses" of the
    /// simplified formula). Monotonic across solve calls.
    pub fn n_units(&self) -> usize {
        self.s.proved_at_lvl_0().len()
    }

    pub fn get_unit(&self, i: usize) -> Lit {
        self.s.proved_at_lvl_0()[i]
    }

    /// Number of slots in the original clause list, including deleted
    /// clauses; the index space of `clause()` is stable across solve calls.
    pub fn n_orig_clauses(&self) -> usize {
        self.s.n_orig_clauses()
    }

    /// Literals and mark bit of the `i`-th original clause (`mark == 1`
    /// means deleted or satisfied during preprocessing).
    pub fn clause(&self, i: usize) -> (&[Lit], u32) {
        self.s.orig_clause(i)
    }

    /// Add a clause given in internal form; used when replicating the
    /// primary solver's formula into another solver.
    pub fn import_clause(&mut self, lits: &[Lit]) -> bool {
        let mut c = lits.to_vec();
        self.add_clause_reuse(&mut c)
    }

    pub fn take_model(&mut self) -> Vec<lbool> {
        self.s.take_model()
    }

    pub fn take_conflict(&mut self) -> Vec<Lit> {
        self.s.take_conflict()
    }

    pub fn conflict_len(&self) -> usize {
        self.s.conflict_len()
    }

    pub fn set_decision(&mut self, v: Var, dvar: bool) {
        self.s.set_decision_var(v, dvar);
    }

    pub fn reserve_vars(&mut self, n: u32) {
        self.s.reserve_vars(n);
    }

    /// Solve under assumptions, controlling preprocessing explicitly.
    pub fn solve_limited_simp(
        &mut self,
        assumps: &[Lit],
        do_simp: bool,
        turn_off_simp: bool,
    ) -> lbool {
        // assumption variables must be live and must stay live
        for &l in assumps {
            if self.is_eliminated(l.var()) {
                self.restore_var(l.var());
            }
            self.set_frozen(l.var(), true);
        }
        if do_simp && self.use_simp && !self.eliminate(turn_off_simp) {
            return lbool::FALSE;
        }
        let ret = self.s.solve_limited(assumps);
        if ret == lbool::TRUE {
            let mut m = self.s.take_model();
            self.extend_model(&mut m);
            *self.s.model_mut() = m;
        }
        ret
    }

    /// Undo variable elimination on `model`: walk the reconstruction stack
    /// backwards and flip a record's pivot whenever the recorded clause is
    /// not already satisfied. Records of restored variables are skipped.
    pub fn extend_model(&self, model: &mut Vec<lbool>) {
        let nv = self.s.num_vars() as usize;
        if model.len() < nv {
            model.resize(nv, lbool::UNDEF);
        }
        let ec = &self.elim_clauses;
        let mut i = ec.len();
        while i > 0 {
            let len = ec[i - 1] as usize;
            debug_assert!(len >= 1 && i > len);
            let lits = &ec[i - 1 - len..i - 1];
            let pivot = Lit::from_idx(lits[len - 1]);
            if self.is_eliminated(pivot.var()) {
                let mut satisfied = false;
                for &li in lits {
                    let l = Lit::from_idx(li);
                    let val = model
                        .get(l.var().idx() as usize)
                        .cloned()
                        .unwrap_or(lbool::UNDEF)
                        ^ !l.sign();
                    if val == lbool::TRUE {
                        satisfied = true;
                        break;
                    }
                }
                if !satisfied {
                    model[pivot.var().idx() as usize] = lbool::new(pivot.sign());
                }
            }
            i -= len + 1;
        }
    }

    /// Bring an eliminated variable back: re-add its removed clauses through
    /// the normal clause path and make it a decision variable again. Cascades
    /// through other eliminated variables mentioned in those clauses.
    pub(crate) fn restore_var(&mut self, v: Var) {
        let mut work = vec![v];
        while let Some(v) = work.pop() {
            if !self.is_eliminated(v) {
                continue;
            }
            info!("restore eliminated variable {:?}", v);
            self.eliminated.set(v, false);
            self.s.set_decision_var(v, true);
            let crs = mem::take(&mut self.elim_crefs[v]);
            for cr in crs {
                let mut lits: Vec<Lit> = self.s.ca().get_ref(cr).lits().to_vec();
                for &l in &lits {
                    if self.is_eliminated(l.var()) {
                        work.push(l.var());
                    }
                }
                self.s.add_clause_reuse(&mut lits);
            }
        }
    }

    fn eliminate_vars(&mut self) {
        if !self.s.propagate_toplevel() {
            return;
        }

        // occurrence lists over the live original clauses
        let mut occ: LMap<Vec<CRef>> = LMap::new();
        let nv = self.s.num_vars();
        for vi in 0..nv {
            let v = Var::from_idx(vi);
            occ.reserve_default(Lit::new(v, true));
            occ.reserve_default(Lit::new(v, false));
        }
        for i in 0..self.s.n_orig_clauses() {
            let cr = self.s.orig_crefs()[i];
            let c = self.s.ca().get_ref(cr);
            if c.mark() != 0 {
                continue;
            }
            for &l in c.lits() {
                occ[l].push(cr);
            }
        }

        // try cheap variables first
        let mut cands: Vec<(u64, Var)> = Vec::new();
        for vi in 0..nv {
            let v = Var::from_idx(vi);
            if self.var_blocked(v) {
                continue;
            }
            let np = occ[Lit::new(v, true)].len() as u64;
            let nn = occ[Lit::new(v, false)].len() as u64;
            if np + nn == 0 {
                continue;
            }
            cands.push((np * nn, v));
        }
        cands.sort_unstable_by_key(|&(w, _)| w);

        let mut eliminated = 0;
        for (_, v) in cands {
            if !self.s.is_ok() {
                return;
            }
            if self.try_eliminate(v, &mut occ) {
                eliminated += 1;
            }
        }
        debug!("eliminated {} variables", eliminated);
        let _ = eliminated;
    }

    fn var_blocked(&self, v: Var) -> bool {
        (self.frozen.has(v) && self.frozen[v])
            || self.is_eliminated(v)
            || self.s.assign_value_lit(Lit::new(v, true)) != lbool::UNDEF
    }

    /// A clause takes part in resolution only while unmarked and not yet
    /// satisfied at the top level.
    fn live(&self, cr: CRef) -> bool {
        let c = self.s.ca().get_ref(cr);
        c.mark() == 0
            && !c
                .lits()
                .iter()
                .any(|&l| self.s.assign_value_lit(l) == lbool::TRUE)
    }

    fn try_eliminate(&mut self, v: Var, occ: &mut LMap<Vec<CRef>>) -> bool {
        if self.var_blocked(v) {
            return false;
        }
        let pl = Lit::new(v, true);
        let nl = Lit::new(v, false);
        let pos: Vec<CRef> = occ[pl].iter().cloned().filter(|&cr| self.live(cr)).collect();
        let neg: Vec<CRef> = occ[nl].iter().cloned().filter(|&cr| self.live(cr)).collect();
        if pos.is_empty() && neg.is_empty() {
            return false;
        }
        if pos.len() > self.occ_lim && neg.len() > self.occ_lim {
            return false;
        }

        // all pairwise resolvents must fit in the budget
        let limit = pos.len() + neg.len() + self.grow as usize;
        let mut resolvents: Vec<Vec<Lit>> = Vec::new();
        for &pc in &pos {
            for &nc in &neg {
                if let Some(r) = self.merge(pc, nc, v) {
                    if r.len() > self.clause_lim as usize {
                        return false;
                    }
                    resolvents.push(r);
                    if resolvents.len() > limit {
                        return false;
                    }
                }
            }
        }

        trace!("eliminate variable {:?}", v);

        // record the smaller side plus an asserting unit for model extension
        if pos.len() > neg.len() {
            for &cr in &neg {
                self.record_elim_clause(v, cr);
            }
            self.record_elim_unit(pl);
        } else {
            for &cr in &pos {
                self.record_elim_clause(v, cr);
            }
            self.record_elim_unit(nl);
        }

        // drop the old clauses, keep them around for restore-on-demand
        for &cr in pos.iter().chain(neg.iter()) {
            self.s.remove_clause(cr);
        }
        self.elim_crefs.reserve_default(v);
        self.elim_crefs[v].extend(pos.iter().cloned());
        self.elim_crefs[v].extend(neg.iter().cloned());
        self.eliminated.reserve(v);
        self.eliminated.set(v, true);
        self.s.set_decision_var(v, false);

        for mut r in resolvents {
            let (ok, cr) = self.s.add_clause_and_get(&mut r);
            if !ok {
                return true; // formula became unsat; `ok` flag is down
            }
            if let Some(cr) = cr {
                for &l in self.s.ca().get_ref(cr).lits() {
                    occ[l].push(cr);
                }
            }
        }
        let _ = self.s.propagate_toplevel();
        true
    }

    /// Resolve the clauses `pc` and `nc` on `v`. `None` for tautological or
    /// already satisfied resolvents.
    fn merge(&self, pc: CRef, nc: CRef, v: Var) -> Option<Vec<Lit>> {
        let ca = self.s.ca();
        let p = ca.get_ref(pc);
        let q = ca.get_ref(nc);
        let mut out: Vec<Lit> = Vec::with_capacity((p.size() + q.size()) as usize);
        for &l in p.lits() {
            if l.var() == v {
                continue;
            }
            match self.s.assign_value_lit(l) {
                x if x == lbool::TRUE => return None,
                x if x == lbool::FALSE => continue,
                _ => out.push(l),
            }
        }
        for &l in q.lits() {
            if l.var() == v {
                continue;
            }
            match self.s.assign_value_lit(l) {
                x if x == lbool::TRUE => return None,
                x if x == lbool::FALSE => continue,
                _ => {
                    if out.contains(&!l) {
                        return None; // tautology
                    }
                    if !out.contains(&l) {
                        out.push(l);
                    }
                }
            }
        }
        Some(out)
    }

    fn record_elim_clause(&mut self, v: Var, cr: CRef) {
        let mut pivot = Lit::UNDEF;
        let mut n = 0u32;
        {
            let lits = self.s.ca().get_ref(cr).lits();
            for &l in lits {
                if l.var() == v {
                    pivot = l;
                } else {
                    self.elim_clauses.push(l.idx());
                }
                n += 1;
            }
        }
        debug_assert!(pivot != Lit::UNDEF, "pivot var not in recorded clause");
        self.elim_clauses.push(pivot.idx());
        self.elim_clauses.push(n);
    }

    fn record_elim_unit(&mut self, l: Lit) {
        self.elim_clauses.push(l.idx());
        self.elim_clauses.push(1);
    }
}

impl<Cb: Callbacks> SolverInterface for SimpSolver<Cb> {
    fn num_vars(&self) -> u32 {
        self.s.num_vars()
    }
    fn num_clauses(&self) -> u64 {
        self.s.num_clauses()
    }
    fn num_conflicts(&self) -> u64 {
        self.s.num_conflicts()
    }
    fn is_ok(&self) -> bool {
        self.s.is_ok()
    }

    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        let v = self.s.new_var(upol, dvar);
        self.frozen.reserve(v);
        self.eliminated.reserve(v);
        self.elim_crefs.reserve_default(v);
        v
    }

    fn new_var_default(&mut self) -> Var {
        self.new_var(lbool::UNDEF, true)
    }

    fn var_of_int(&mut self, v_idx: u32) -> Var {
        while v_idx >= self.num_vars() {
            self.new_var_default();
        }
        Var::from_idx(v_idx)
    }

    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool {
        // clauses over eliminated variables bring those variables back first
        for i in 0..clause.len() {
            let v = clause[i].var();
            if self.is_eliminated(v) {
                self.restore_var(v);
            }
        }
        self.s.add_clause_reuse(clause)
    }

    fn simplify(&mut self) -> bool {
        self.s.simplify()
    }

    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool {
        self.solve_limited_simp(assumps, false, false)
    }

    fn get_model(&self) -> &[lbool] {
        self.s.get_model()
    }
    fn value_var(&self, v: Var) -> lbool {
        self.s.value_var(v)
    }
    fn value_lit(&self, l: Lit) -> lbool {
        self.s.value_lit(l)
    }
    fn unsat_core(&self) -> &[Lit] {
        self.s.unsat_core()
    }
    fn interrupt(&self) {
        self.s.interrupt();
    }
    fn print_stats(&self) {
        self.s.print_stats();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callbacks::Basic;
    use crate::core::SolverOpts;

    fn new_solver() -> SimpSolver<Basic> {
        SimpSolver::new(SolverOpts::default(), Basic::new())
    }

    fn lit(s: &mut SimpSolver<Basic>, l: i32) -> Lit {
        let v = s.var_of_int((l.abs() - 1) as u32);
        Lit::new(v, l > 0)
    }

    fn add(s: &mut SimpSolver<Basic>, c: &[i32]) -> bool {
        let mut cl: Vec<Lit> = c.iter().map(|&l| lit(s, l)).collect();
        s.add_clause_reuse(&mut cl)
    }

    fn model_lit_true(s: &SimpSolver<Basic>, l: i32) -> bool {
        let v = Var::from_idx((l.abs() - 1) as u32);
        s.value_lit(Lit::new(v, l > 0)) == lbool::TRUE
    }

    #[test]
    fn test_eliminate_and_extend() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 3]);
        add(&mut s, &[-2, 3]);
        assert!(s.eliminate(true));
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        // every original clause must hold under the extended model
        assert!(model_lit_true(&s, 1) || model_lit_true(&s, 2));
        assert!(!model_lit_true(&s, 1) || model_lit_true(&s, 3));
        assert!(!model_lit_true(&s, 2) || model_lit_true(&s, 3));
    }

    #[test]
    fn test_eliminate_unsat() {
        let mut s = new_solver();
        add(&mut s, &[1]);
        add(&mut s, &[-1]);
        assert!(!s.eliminate(true));
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    }

    #[test]
    fn test_frozen_not_eliminated() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        let v = Var::from_idx(0);
        s.set_frozen(v, true);
        assert!(s.eliminate(true));
        assert!(!s.is_eliminated(v));
    }

    #[test]
    fn test_restore_on_demand() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        assert!(s.eliminate(true));
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        // constrain a possibly-eliminated variable again
        add(&mut s, &[-2]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        assert!(model_lit_true(&s, 1));
        assert!(model_lit_true(&s, -2));
    }

    #[test]
    fn test_assumption_over_eliminated_var() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        assert!(s.eliminate(true));
        let a = lit(&mut s, -2);
        assert_eq!(s.solve_limited(&[a]), lbool::TRUE);
        assert!(model_lit_true(&s, 1));
    }
}
