/*****************************************************************************************[core.rs]
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
    crate::callbacks::{Callbacks, ProgressStatus},
    crate::clause::{
        self, lbool, CRef, ClauseAllocator, ClauseRef, LMap, LSet, Lit, VMap, Var,
    },
    crate::heap::Heap,
    crate::intmap::IntMapBool,
    crate::interface::SolverInterface,
    smallvec::SmallVec,
    std::{
        mem,
        sync::atomic::{AtomicBool, Ordering},
    },
};

/// Per-round synchronization callback, invoked by the solver at restart
/// boundaries once registered. Returning `true` stops the search.
pub type SyncHook<Cb> = Box<dyn FnMut(&mut Solver<Cb>) -> bool + Send>;

/// Upper bound on the length of a clause kept in the sharing buffer.
const SHARE_MAX_LEN: usize = 30;
/// Upper bound on the glue of a clause kept in the sharing buffer.
const SHARE_MAX_GLUE: u32 = 8;
/// Upper bound on buffered clauses between two sharing rounds.
const SHARE_MAX_CLAUSES: usize = 256;

/// The main solver structure
///
/// A `Solver` object contains the whole state of the SAT solver, including
/// a clause allocator, literals, clauses, and statistics.
///
/// It is parametrized by `Callbacks`
pub struct Solver<Cb: Callbacks> {
    // Extra results: (read-only member variable)
    /// If problem is satisfiable, this vector contains the model (if any).
    model: Vec<lbool>,
    /// If problem is unsatisfiable (possibly under assumptions),
    /// this vector represent the final conflict clause expressed in the assumptions.
    conflict: LSet,

    cb: Cb, // the callbacks
    asynch_interrupt: AtomicBool,

    /// List of problem clauses. Never compacted, so indices are stable
    /// across solve calls (deleted clauses keep their slot, marked).
    clauses: Vec<CRef>,
    /// List of learnt clauses.
    learnts: Vec<CRef>,

    sync_hook: Option<SyncHook<Cb>>,
    share: ShareBuf,

    v: SolverV,
}

/// The current assignments.
struct VarState {
    /// A heuristic measurement of the activity of a variable.
    activity: VMap<f64>,
    /// Current assignment for each variable.
    ass: VMap<lbool>,
    /// Stores reason and level for each variable.
    vardata: VMap<VarData>,
    /// Amount to bump next variable with.
    var_inc: f64,
    var_decay: f64,

    /// Assignment stack; stores all assigments made in the order they were made.
    trail: Vec<Lit>,
    /// Separator indices for different decision levels in `trail`.
    trail_lim: Vec<i32>,
}

struct SolverV {
    vars: VarState,
    watches: Watches,
    /// A priority queue of variables ordered with respect to the variable activity.
    order_heap: Heap<Var>,

    /// The preferred polarity of each variable.
    polarity: VMap<bool>,
    /// The users preferred polarity of each variable.
    user_pol: VMap<lbool>,
    /// Declares if a variable is eligible for selection in the decision heuristic.
    decision: VMap<bool>,
    /// If `false`, the constraints are already unsatisfiable. No part of the solver state may be used!
    ok: bool,
    /// Amount to bump next clause with.
    cla_inc: f64,
    /// Head of queue (as index into the trail).
    qhead: i32,
    /// Next variable to be created.
    next_var: Var,
    ca: ClauseAllocator,
    /// Current set of assumptions provided to solve by the user.
    assumptions: Vec<Lit>,

    // Temporaries (to reduce allocation overhead).
    seen: VMap<Seen>,
    minimize_stack: Vec<Lit>,
    analyze_toclear: Vec<Lit>,
    tmp_analyze: Vec<Lit>,

    // Statistics: (read-only member variable)
    solves: u64,
    starts: u64,
    decisions: u64,
    rnd_decisions: u64,
    propagations: u64,
    conflicts: u64,
    dec_vars: u64,
    max_literals: u64,
    tot_literals: u64,

    num_clauses: u64,
    num_learnts: u64,
    clauses_literals: u64,
    learnts_literals: u64,

    // Mode of operation:
    clause_decay: f64,
    random_var_freq: f64,
    random_seed: f64,
    luby_restart: bool,
    /// Controls conflict clause minimization (0=none, 1=basic, 2=deep).
    ccmin_mode: i32,
    /// Controls the level of phase saving (0=none, 1=limited, 2=full).
    phase_saving: i32,
    /// Use random polarities for branching heuristics.
    rnd_pol: bool,
    /// Initialize variable activities with a small random value.
    rnd_init_act: bool,
    /// Minimum number to set the learnts limit to.
    min_learnts_lim: i32,

    /// The initial restart limit.
    restart_first: i32,
    /// The factor with which the restart limit is multiplied in each restart.
    restart_inc: f64,
    /// The intitial limit for learnt clauses is a factor of the original clauses.
    learntsize_factor: f64,
    /// The limit for learnt clauses is multiplied with this factor each restart.
    learntsize_inc: f64,

    max_learnts: f64,
    learntsize_adjust_start_confl: i32,
    learntsize_adjust_inc: f64,
    learntsize_adjust_confl: f64,
    learntsize_adjust_cnt: i32,

    /// Number of top-level assignments since last execution of 'simplify()'.
    simp_db_assigns: i32,
    /// Remaining number of propagations that must be made before next execution of 'simplify()'.
    simp_db_props: i64,
    /// Set by `search()`.
    progress_estimate: f64,
}

/// Buffer of recently learnt clauses waiting to be published to the other
/// members of a portfolio. Flat arena, one `(offset, len, glue)` entry per clause.
struct ShareBuf {
    enabled: bool,
    lits: Vec<Lit>,
    index: Vec<(u32, u32, u32)>,
}

impl ShareBuf {
    fn new() -> Self {
        Self {
            enabled: false,
            lits: vec![],
            index: vec![],
        }
    }

    fn push(&mut self, c: &[Lit], glue: u32) {
        if !self.enabled
            || c.is_empty()
            || c.len() > SHARE_MAX_LEN
            || glue > SHARE_MAX_GLUE
            || self.index.len() >= SHARE_MAX_CLAUSES
        {
            return;
        }
        let off = self.lits.len() as u32;
        self.lits.extend_from_slice(c);
        self.index.push((off, c.len() as u32, glue));
    }

    fn clear(&mut self) {
        self.lits.clear();
        self.index.clear();
    }
}

// public API
impl<Cb: Callbacks> SolverInterface for Solver<Cb> {
    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        self.v.new_var(upol, dvar)
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

    // in the API, we can only add clauses at level 0
    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool {
        debug!("add toplevel clause {:?}", clause);
        debug_assert_eq!(
            self.v.decision_level(),
            0,
            "add clause at non-zero decision level"
        );
        clause.sort_unstable();
        self.add_clause_(clause).0
    }

    fn simplify(&mut self) -> bool {
        self.simplify_internal()
    }

    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool {
        self.asynch_interrupt.store(false, Ordering::SeqCst);
        self.v.assumptions.clear();
        self.v.assumptions.extend_from_slice(assumps);
        self.solve_internal()
    }

    fn value_var(&self, v: Var) -> lbool {
        self.model
            .get(v.idx() as usize)
            .map_or(lbool::UNDEF, |&v| v)
    }
    fn value_lit(&self, l: Lit) -> lbool {
        self.value_var(l.var()) ^ !l.sign()
    }
    fn get_model(&self) -> &[lbool] {
        &self.model
    }
    fn is_ok(&self) -> bool {
        self.v.ok
    }

    fn num_vars(&self) -> u32 {
        self.v.num_vars()
    }
    fn num_clauses(&self) -> u64 {
        self.v.num_clauses
    }
    fn num_conflicts(&self) -> u64 {
        self.v.conflicts
    }

    fn unsat_core(&self) -> &[Lit] {
        self.conflict.as_slice()
    }

    fn interrupt(&self) {
        self.asynch_interrupt.store(true, Ordering::SeqCst);
    }

    fn print_stats(&self) {
        println!("c restarts              : {}", self.v.starts);
        println!("c conflicts             : {:<12}", self.v.conflicts);
        println!(
            "c decisions             : {:<12}   ({:4.2} % random)",
            self.v.decisions,
            self.v.rnd_decisions as f32 * 100.0 / self.v.decisions as f32
        );
        println!("c propagations          : {:<12}", self.v.propagations);
        println!(
            "c conflict literals     : {:<12}   ({:4.2} % deleted)",
            self.v.tot_literals,
            (self.v.max_literals - self.v.tot_literals) as f64 * 100.0
                / self.v.max_literals as f64
        );
    }
}

impl<Cb: Callbacks + Default> Default for Solver<Cb> {
    fn default() -> Self {
        Solver::new(SolverOpts::default(), Default::default())
    }
}

// main algorithm
impl<Cb: Callbacks> Solver<Cb> {
    /// Create a new solver with the given options and callbacks.
    pub fn new(opts: SolverOpts, cb: Cb) -> Self {
        assert!(opts.check());
        Self {
            model: vec![],
            conflict: LSet::new(),
            cb,
            clauses: vec![],
            learnts: vec![],
            asynch_interrupt: AtomicBool::new(false),
            sync_hook: None,
            share: ShareBuf::new(),
            v: SolverV::new(&opts),
        }
    }

    /// Temporary access to the callbacks
    pub fn cb_mut(&mut self) -> &mut Cb {
        &mut self.cb
    }

    /// Temporary access to the callbacks
    pub fn cb(&self) -> &Cb {
        &self.cb
    }

    pub fn num_propagations(&self) -> u64 {
        self.v.propagations
    }
    pub fn num_decisions(&self) -> u64 {
        self.v.decisions
    }
    pub fn num_restarts(&self) -> u64 {
        self.v.starts
    }

    /// Monotonic measure of work performed so far; used by a portfolio to
    /// pace clause-sharing rounds.
    pub fn num_accesses(&self) -> u64 {
        self.v.propagations + self.v.conflicts
    }

    /// Literals proved at level 0. They keep this value from now on.
    pub fn proved_at_lvl_0(&self) -> &[Lit] {
        self.v.vars.proved_at_lvl_0()
    }

    /// Number of slots in the original clause list, including deleted
    /// clauses. Stable across solve calls; used for incremental replication.
    pub fn n_orig_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Literals and mark bit of the `i`-th original clause.
    pub fn orig_clause(&self, i: usize) -> (&[Lit], u32) {
        let c = self.v.ca.get_ref(self.clauses[i]);
        (c.lits(), c.mark())
    }

    /// Move the model out of the solver.
    pub fn take_model(&mut self) -> Vec<lbool> {
        mem::take(&mut self.model)
    }

    pub(crate) fn model_mut(&mut self) -> &mut Vec<lbool> {
        &mut self.model
    }

    /// Move the assumption conflict out of the solver.
    pub fn take_conflict(&mut self) -> Vec<Lit> {
        let c = self.conflict.as_slice().to_vec();
        self.conflict.clear();
        c
    }

    pub fn conflict_len(&self) -> usize {
        self.conflict.len()
    }

    /// Make `v` eligible (or not) for branching.
    pub fn set_decision_var(&mut self, v: Var, dvar: bool) {
        self.v.set_decision_var(v, dvar);
    }

    /// Pre-size internal arrays for `n` variables.
    pub fn reserve_vars(&mut self, n: u32) {
        self.v.vars.trail.reserve(n as usize);
    }

    /// Register the per-round synchronization callback and start buffering
    /// learnt clauses for publication.
    pub fn set_sync_hook(&mut self, hook: SyncHook<Cb>) {
        self.share.enabled = true;
        self.sync_hook = Some(hook);
    }

    /// Hand every buffered learnt clause to `f`, then clear the buffer.
    pub fn drain_shared<F: FnMut(&[Lit], u32)>(&mut self, mut f: F) {
        for &(off, len, glue) in &self.share.index {
            f(
                &self.share.lits[off as usize..(off + len) as usize],
                glue,
            );
        }
        self.share.clear();
    }

    /// Import a clause learnt by another solver. Must be called at level 0.
    /// Failures only affect this solver's `ok` flag; the clause is implied
    /// by the common formula, so an import that empties out is a proof of
    /// unsatisfiability.
    pub fn import_shared(&mut self, lits: &[Lit], glue: u32) -> bool {
        debug_assert_eq!(self.v.decision_level(), 0);
        if !self.v.ok {
            return false;
        }
        let mut c: SmallVec<[Lit; 8]> = SmallVec::new();
        for &l in lits {
            if l.var().idx() >= self.num_vars() {
                return true; // unknown variable here, drop the clause
            }
            let val = self.v.value_lit(l);
            let lvl = self.v.level_lit(l);
            if val == lbool::TRUE && lvl == 0 {
                return true;
            }
            if val == lbool::FALSE && lvl == 0 {
                continue;
            }
            c.push(l);
        }
        c.sort_unstable();
        let mut last = Lit::UNDEF;
        let mut j = 0;
        for i in 0..c.len() {
            if c[i] == !last {
                return true; // tautology
            }
            if c[i] != last {
                last = c[i];
                c[j] = c[i];
                j += 1;
            }
        }
        c.truncate(j);
        if c.is_empty() {
            self.v.ok = false;
            return false;
        } else if c.len() == 1 {
            self.v.vars.unchecked_enqueue(c[0], CRef::UNDEF);
        } else {
            let cr = self.v.ca.alloc(&c, true);
            self.v.ca.get_mut(cr).set_glue(glue);
            self.learnts.push(cr);
            self.v.attach_clause(cr);
        }
        true
    }

    /// Perturb branching and restart heuristics based on the solver's rank
    /// in a portfolio, so members follow different search trajectories.
    pub fn diversify(&mut self, rank: u32, span: u32) {
        let v = &mut self.v;
        let step = (rank % span.max(1)) as f64;
        v.random_seed = (v.random_seed + step * 100003.0) % 2147483647.0;
        if v.random_seed <= 0.0 {
            v.random_seed += 91648253.0;
        }
        match rank % 6 {
            0 => {}
            1 => {
                // geometric restarts
                v.luby_restart = false;
                v.restart_inc = 1.5;
            }
            2 => {
                // aggressive restarts
                v.restart_first = 50;
            }
            3 => {
                // conservative restarts
                v.restart_first = 500;
            }
            4 => {
                // randomized branching
                v.rnd_pol = true;
                v.random_var_freq = 0.02;
                v.rnd_init_act = true;
            }
            5 => {
                v.phase_saving = 1;
                v.ccmin_mode = 1;
            }
            _ => unreachable!(),
        }
    }

    pub(crate) fn ca(&self) -> &ClauseAllocator {
        &self.v.ca
    }

    pub(crate) fn orig_crefs(&self) -> &[CRef] {
        &self.clauses
    }

    pub(crate) fn assign_value_lit(&self, l: Lit) -> lbool {
        self.v.value_lit(l)
    }

    /// Detach and mark a clause; the slot in the clause list stays.
    pub(crate) fn remove_clause(&mut self, cr: CRef) {
        self.v.remove_clause(cr);
    }

    /// Propagate all pending facts at level 0, `false` on conflict.
    pub(crate) fn propagate_toplevel(&mut self) -> bool {
        debug_assert_eq!(self.v.decision_level(), 0);
        if !self.v.ok || self.v.propagate().is_some() {
            self.v.ok = false;
        }
        self.v.ok
    }

    fn simplify_internal(&mut self) -> bool {
        debug_assert_eq!(self.v.decision_level(), 0);

        if !self.v.ok || self.v.propagate().is_some() {
            self.v.ok = false;
            return false;
        }

        if self.v.vars.num_assigns() as i32 == self.v.simp_db_assigns || self.v.simp_db_props > 0 {
            return true;
        }

        self.cb.on_simplify();
        // Remove satisfied learnt clauses. Original clauses are left alone so
        // their indices stay stable for incremental replication.
        {
            let v = &mut self.v;
            let cb = &mut self.cb;
            self.learnts.retain(|&cr| {
                let satisfied = v.satisfied(v.ca.get_ref(cr));
                if satisfied {
                    cb.on_delete_clause(v.ca.get_ref(cr).lits());
                    v.remove_clause(cr);
                }
                !satisfied
            });
        }
        self.v.watches.clean_all(&self.v.ca);
        self.v.rebuild_order_heap();

        self.v.simp_db_assigns = self.v.vars.num_assigns() as i32;
        self.v.simp_db_props = (self.v.clauses_literals + self.v.learnts_literals) as i64;

        true
    }

    /// Search for a model the specified number of conflicts.
    ///
    /// Use negative value for `nof_conflicts` indicate infinity.
    ///
    /// # Output:
    ///
    /// - `lbool::TRUE` if a partial assigment that is consistent with respect to the clauseset is found. If
    ///    all variables are decision variables, this means that the clause set is satisfiable.
    /// - `lbool::FALSE` if the clause set is unsatisfiable.
    /// - `lbool::UNDEF` if the bound on number of conflicts is reached.
    fn search(&mut self, nof_conflicts: i32, tmp_learnt: &mut Vec<Lit>) -> lbool {
        debug_assert!(self.v.ok);
        let mut conflict_c = 0;
        self.v.starts += 1;

        loop {
            let confl = self.v.propagate();

            if let Some(confl) = confl {
                // conflict analysis
                self.v.conflicts += 1;
                conflict_c += 1;
                if self.v.decision_level() == 0 {
                    return lbool::FALSE;
                }

                let (backtrack_lvl, glue) = self.v.analyze(confl, &self.learnts, tmp_learnt);
                self.cb.on_new_clause(tmp_learnt, clause::Kind::Learnt);
                self.v.cancel_until(backtrack_lvl as u32);
                self.record_learnt(tmp_learnt, glue);

                self.v.vars.var_decay_activity();
                self.v.cla_decay_activity();

                self.v.learntsize_adjust_cnt -= 1;
                if self.v.learntsize_adjust_cnt == 0 {
                    self.v.learntsize_adjust_confl *= self.v.learntsize_adjust_inc;
                    self.v.learntsize_adjust_cnt = self.v.learntsize_adjust_confl as i32;
                    self.v.max_learnts *= self.v.learntsize_inc;

                    let trail_lim_head = self
                        .v
                        .vars
                        .trail_lim
                        .first()
                        .cloned()
                        .unwrap_or(self.v.vars.trail.len() as i32);
                    let v = &self.v;
                    self.cb.on_progress(|| ProgressStatus {
                        conflicts: v.conflicts as i32,
                        dec_vars: v.dec_vars as i32 - trail_lim_head,
                        n_clauses: v.num_clauses,
                        n_clause_lits: v.clauses_literals as i32,
                        max_learnt: v.max_learnts as i32,
                        n_learnt: v.num_learnts,
                        n_learnt_lits: v.learnts_literals as f64 / v.num_learnts as f64,
                        progress_estimate: v.progress_estimate * 100.0,
                    });
                }
            } else {
                // no conflict
                if (nof_conflicts >= 0 && conflict_c >= nof_conflicts) || !self.within_budget() {
                    // Reached bound on number of conflicts:
                    self.v.progress_estimate = self.v.progress_estimate();
                    if self.v.decision_level() > 0 {
                        self.v.cancel_until(0);
                    }
                    return lbool::UNDEF;
                }

                // Simplify the set of problem clauses:
                if self.v.decision_level() == 0 && !self.simplify_internal() {
                    return lbool::FALSE;
                }

                if self.learnts.len() as f64 - self.v.vars.num_assigns() as f64
                    >= self.v.max_learnts
                {
                    // Reduce the set of learnt clauses:
                    self.reduce_db();
                }

                // select the next decision (using assumptions, or variable heap)
                let mut next = Lit::UNDEF;
                while (self.v.decision_level() as usize) < self.v.assumptions.len() {
                    // Perform user provided assumption:
                    let p = self.v.assumptions[self.v.decision_level() as usize];
                    if self.v.value_lit(p) == lbool::TRUE {
                        // Dummy decision level, since `p` is true already:
                        self.v.vars.new_decision_level();
                    } else if self.v.value_lit(p) == lbool::FALSE {
                        let mut conflict = mem::replace(&mut self.conflict, LSet::new());
                        self.v.analyze_final(!p, &mut conflict);
                        self.conflict = conflict;
                        return lbool::FALSE;
                    } else {
                        next = p;
                        break;
                    }
                }

                if next == Lit::UNDEF {
                    // new variable decision:
                    next = self.v.pick_branch_lit();

                    if next == Lit::UNDEF {
                        // model found
                        return lbool::TRUE;
                    }
                    self.v.decisions += 1;
                }

                // Increase decision level and enqueue `next`
                // with no justification since it's a decision
                trace!("pick-next {:?}", next);
                self.v.vars.new_decision_level();
                self.v.vars.unchecked_enqueue(next, CRef::UNDEF);
            }
        }
    }

    /// Record a learnt clause produced by `analyze` and enqueue its
    /// asserting literal. Must be called right after backtracking.
    fn record_learnt(&mut self, learnt: &[Lit], glue: u32) {
        if learnt.is_empty() {
            self.v.ok = false;
            return;
        }
        if learnt.len() == 1 {
            // directly propagate the unit clause at level 0
            self.v.vars.unchecked_enqueue(learnt[0], CRef::UNDEF);
        } else {
            let cr = self.v.ca.alloc(learnt, true);
            self.v.ca.get_mut(cr).set_glue(glue);
            self.learnts.push(cr);
            self.v.attach_clause(cr);
            self.v.cla_bump_activity(&self.learnts, cr);
            self.v.vars.unchecked_enqueue(learnt[0], cr);
        }
        self.share.push(learnt, glue);
    }

    /// Main solve method (assumptions given in `self.v.assumptions`).
    fn solve_internal(&mut self) -> lbool {
        debug_assert_eq!(self.v.decision_level(), 0);
        self.model.clear();
        self.conflict.clear();
        if !self.v.ok {
            return lbool::FALSE;
        }

        self.v.solves += 1;
        let mut tmp_learnt: Vec<Lit> = vec![];

        self.v.max_learnts = self.num_clauses() as f64 * self.v.learntsize_factor;
        if self.v.max_learnts < self.v.min_learnts_lim as f64 {
            self.v.max_learnts = self.v.min_learnts_lim as f64;
        }

        self.v.learntsize_adjust_confl = self.v.learntsize_adjust_start_confl as f64;
        self.v.learntsize_adjust_cnt = self.v.learntsize_adjust_confl as i32;
        let mut status;

        info!("search.start");
        self.cb.on_start();

        // Search:
        let mut curr_restarts: i32 = 0;
        loop {
            let rest_base = if self.v.luby_restart {
                utils::luby(self.v.restart_inc, curr_restarts)
            } else {
                f64::powi(self.v.restart_inc, curr_restarts)
            };
            let nof_conflicts = (rest_base * self.v.restart_first as f64) as i32;
            status = self.search(nof_conflicts, &mut tmp_learnt);
            if !self.within_budget() {
                status = lbool::UNDEF;
                break;
            }

            if status != lbool::UNDEF {
                break;
            }

            info!("search.restart({})", curr_restarts);
            curr_restarts += 1;
            self.cb.on_restart();

            // portfolio synchronization point: publish and consume shared
            // clauses, stop searching if the portfolio has a winner
            if self.sync_hook.is_some() {
                let mut hook = self.sync_hook.take().expect("sync hook vanished");
                let stop = hook(self);
                self.sync_hook = Some(hook);
                if !self.v.ok {
                    status = lbool::FALSE;
                    break;
                }
                if stop {
                    break;
                }
            }
        }

        self.cb.on_result(status);

        if status == lbool::TRUE {
            // Extend & copy model:
            let num_vars = self.num_vars();
            self.model.resize(num_vars as usize, lbool::UNDEF);
            for i in 0..num_vars {
                self.model[i as usize] = self.v.value(Var::from_idx(i));
            }
        } else if status == lbool::FALSE && self.conflict.len() == 0 {
            // NOTE: we may return `false` without an empty conflict in case we had assumptions. In
            // this case `self.conflict` contains the unsat-core but adding new clauses might
            // succeed in the absence of these assumptions.
            self.v.ok = false;
        }

        if self.v.decision_level() > 0 {
            self.v.cancel_until(0);
        }
        debug!("res: {:?}", status);
        status
    }

    /// Remove half of the learnt clauses, minus the clauses locked by the current assignment. Locked
    /// clauses are clauses that are reason to some assignment. Binary clauses are never removed.
    fn reduce_db(&mut self) {
        let extra_lim = self.v.cla_inc / self.learnts.len() as f64; // Remove any clause below this activity

        debug!("reduce_db.start");

        {
            let ca = &self.v.ca;
            self.learnts.sort_unstable_by(|&x, &y| {
                let x = ca.get_ref(x);
                let y = ca.get_ref(y);
                Ord::cmp(&(x.size() <= 2), &(y.size() <= 2)).then(
                    PartialOrd::partial_cmp(&x.activity(), &y.activity()).expect("NaN activity"),
                )
            });
        }
        // Don't delete binary or locked clauses. From the rest, delete clauses from the first half
        // and clauses with activity smaller than `extra_lim`:
        let mut j = 0;
        for i in 0..self.learnts.len() {
            let cr = self.learnts[i];
            let cond = {
                let c = self.v.ca.get_ref(cr);
                c.size() > 2
                    && !self.v.locked(c)
                    && (i < self.learnts.len() / 2 || (c.activity() as f64) < extra_lim)
            };
            if cond {
                self.cb.on_delete_clause(self.v.ca.get_ref(cr).lits());
                self.v.remove_clause(cr);
            } else {
                self.learnts[j] = cr;
                j += 1;
            }
        }

        let _deleted = self.learnts.len() - j;
        self.learnts.truncate(j);

        debug!("reduce_db.done (deleted {})", _deleted);
    }

    fn has_been_interrupted(&self) -> bool {
        self.asynch_interrupt.load(Ordering::Relaxed)
    }

    fn within_budget(&self) -> bool {
        !self.has_been_interrupted() && !self.cb.stop()
    }

    /// Add clause; returns `(ok, cref_of_new_clause)`.
    ///
    /// Precondition: `clause` is sorted for some ordering on `Lit`
    fn add_clause_(&mut self, clause: &mut Vec<Lit>) -> (bool, Option<CRef>) {
        if !self.v.ok {
            return (false, None);
        }

        let mut last_lit = Lit::UNDEF;
        let mut j = 0;
        // remove duplicates, true literals, etc.
        for i in 0..clause.len() {
            let lit_i = clause[i];
            let value = self.v.value_lit(lit_i);
            let lvl = self.v.level_lit(lit_i);
            if (value == lbool::TRUE && lvl == 0) || lit_i == !last_lit {
                return (true, None); // tauto or satisfied already at level 0
            } else if !(value == lbool::FALSE && lvl == 0) && lit_i != last_lit {
                // not a duplicate
                last_lit = lit_i;
                clause[j] = lit_i;
                j += 1;
            }
        }

        clause.truncate(j);
        if clause.is_empty() {
            self.v.ok = false;
            (false, None)
        } else if clause.len() == 1 {
            self.v.vars.unchecked_enqueue(clause[0], CRef::UNDEF);
            (true, None)
        } else {
            let cr = self.v.ca.alloc(clause, false);
            self.clauses.push(cr);
            self.v.attach_clause(cr);
            (true, Some(cr))
        }
    }

    /// Like `add_clause_reuse`, but also returns the reference of the stored
    /// clause (if one was allocated). Used by the preprocessor to maintain
    /// occurrence lists.
    pub(crate) fn add_clause_and_get(&mut self, clause: &mut Vec<Lit>) -> (bool, Option<CRef>) {
        debug_assert_eq!(self.v.decision_level(), 0);
        clause.sort_unstable();
        self.add_clause_(clause)
    }
}

#[derive(Debug, Clone, Copy)]
struct VarData {
    reason: CRef,
    level: i32,
}

impl Default for VarData {
    fn default() -> Self {
        Self {
            reason: CRef::UNDEF,
            level: 0,
        }
    }
}

impl VarData {
    #[inline(always)]
    fn new(reason: CRef, level: i32) -> Self {
        Self { reason, level }
    }
}

#[derive(Debug, Clone, Copy)]
struct Watcher {
    cref: CRef,
    blocker: Lit,
}

impl Watcher {
    fn new(cref: CRef, blocker: Lit) -> Self {
        Self { cref, blocker }
    }
}

impl PartialEq for Watcher {
    #[inline(always)]
    fn eq(&self, rhs: &Self) -> bool {
        self.cref == rhs.cref
    }
}
impl Eq for Watcher {}

type OccVec = SmallVec<[Watcher; 4]>;

/// `watches[lit]` lists the clauses watching `lit` (inspected when the
/// literal becomes false). Removed clauses are cleaned out lazily.
struct Watches {
    occs: LMap<OccVec>,
    dirty: IntMapBool<Lit>,
    dirties: Vec<Lit>,
}

impl Watches {
    fn new() -> Self {
        Self {
            occs: LMap::new(),
            dirty: IntMapBool::new(),
            dirties: Vec::new(),
        }
    }

    fn init(&mut self, l: Lit) {
        self.occs.reserve_default(l);
        self.dirty.reserve(l);
    }

    #[inline]
    fn push(&mut self, l: Lit, w: Watcher) {
        self.occs[l].push(w);
    }

    #[inline]
    fn is_dirty(&self, l: Lit) -> bool {
        self.dirty[l]
    }

    fn smudge(&mut self, l: Lit) {
        if !self.dirty[l] {
            self.dirty.set(l, true);
            self.dirties.push(l);
        }
    }

    fn clean(&mut self, l: Lit, ca: &ClauseAllocator) {
        self.occs[l].retain(|w| ca.get_ref(w.cref).mark() != 1);
        self.dirty.set(l, false);
    }

    fn clean_all(&mut self, ca: &ClauseAllocator) {
        let dirties = mem::take(&mut self.dirties);
        for &l in &dirties {
            // dirties may contain duplicates
            if self.dirty[l] {
                self.clean(l, ca);
            }
        }
    }

    #[inline]
    fn take(&mut self, l: Lit) -> OccVec {
        mem::take(&mut self.occs[l])
    }

    #[inline]
    fn put(&mut self, l: Lit, ws: OccVec) {
        debug_assert!(self.occs[l].is_empty());
        self.occs[l] = ws;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Seen {
    UNDEF,
    SOURCE,
}

impl Default for Seen {
    #[inline]
    fn default() -> Self {
        Seen::UNDEF
    }
}

impl Seen {
    #[inline(always)]
    fn is_seen(&self) -> bool {
        *self != Seen::UNDEF
    }
}

impl SolverV {
    fn new(opts: &SolverOpts) -> Self {
        Self {
            vars: VarState::new(opts),
            watches: Watches::new(),
            order_heap: Heap::new(),

            polarity: VMap::new(),
            user_pol: VMap::new(),
            decision: VMap::new(),
            ok: true,
            cla_inc: 1.0,
            qhead: 0,
            next_var: Var::from_idx(0),
            ca: ClauseAllocator::new(),
            assumptions: vec![],

            seen: VMap::new(),
            minimize_stack: vec![],
            analyze_toclear: vec![],
            tmp_analyze: vec![],

            solves: 0,
            starts: 0,
            decisions: 0,
            rnd_decisions: 0,
            propagations: 0,
            conflicts: 0,
            dec_vars: 0,
            max_literals: 0,
            tot_literals: 0,

            num_clauses: 0,
            num_learnts: 0,
            clauses_literals: 0,
            learnts_literals: 0,

            clause_decay: opts.clause_decay,
            random_var_freq: opts.random_var_freq,
            random_seed: opts.random_seed,
            luby_restart: opts.luby_restart,
            ccmin_mode: opts.ccmin_mode,
            phase_saving: opts.phase_saving,
            rnd_pol: false,
            rnd_init_act: opts.rnd_init_act,
            min_learnts_lim: opts.min_learnts_lim,
            restart_first: opts.restart_first,
            restart_inc: opts.restart_inc,

            learntsize_factor: 1.0 / 3.0,
            learntsize_inc: 1.1,
            max_learnts: 0.0,
            learntsize_adjust_start_confl: 100,
            learntsize_adjust_inc: 1.5,
            learntsize_adjust_confl: 0.0,
            learntsize_adjust_cnt: 0,

            simp_db_assigns: -1,
            simp_db_props: 0,
            progress_estimate: 0.0,
        }
    }

    #[inline(always)]
    fn num_vars(&self) -> u32 {
        self.next_var.idx()
    }

    #[inline(always)]
    fn decision_level(&self) -> u32 {
        self.vars.decision_level()
    }

    #[inline(always)]
    fn value(&self, x: Var) -> lbool {
        self.vars.value(x)
    }

    #[inline(always)]
    fn value_lit(&self, x: Lit) -> lbool {
        self.vars.value_lit(x)
    }

    #[inline(always)]
    fn level_lit(&self, x: Lit) -> i32 {
        self.vars.level(x.var())
    }

    fn set_decision_var(&mut self, v: Var, b: bool) {
        if b && !self.decision[v] {
            self.dec_vars += 1;
        } else if !b && self.decision[v] {
            self.dec_vars -= 1;
        }
        self.decision[v] = b;
        self.insert_var_order(v);
    }

    fn insert_var_order(&mut self, x: Var) {
        if !self.order_heap.in_heap(x) && self.decision[x] {
            self.order_heap.insert(x, &self.vars.activity);
        }
    }

    fn cla_decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.clause_decay;
    }

    fn cla_bump_activity(&mut self, learnts: &[CRef], cr: CRef) {
        let new_activity = {
            let mut c = self.ca.get_mut(cr);
            let r = c.activity() + self.cla_inc as f32;
            c.set_activity(r);
            r
        };
        if new_activity > 1e20 {
            // Rescale:
            for &learnt in learnts.iter() {
                let mut c = self.ca.get_mut(learnt);
                let r = c.activity() * 1e-20;
                c.set_activity(r);
            }
            self.cla_inc *= 1e-20;
        }
    }

    /// Pick a literal to make a decision with
    fn pick_branch_lit(&mut self) -> Lit {
        let mut next = Var::UNDEF;

        // Random decision:
        if utils::drand(&mut self.random_seed) < self.random_var_freq
            && !self.order_heap.is_empty()
        {
            let idx = utils::irand(&mut self.random_seed, self.order_heap.len() as i32) as usize;
            next = self.order_heap.peek_slot(idx);
            if self.value(next) == lbool::UNDEF && self.decision[next] {
                self.rnd_decisions += 1;
            }
        }

        // Activity based decision:
        while next == Var::UNDEF || self.value(next) != lbool::UNDEF || !self.decision[next] {
            if self.order_heap.is_empty() {
                next = Var::UNDEF;
                break;
            }
            next = self.order_heap.remove_min(&self.vars.activity);
        }

        // Choose polarity based on different polarity modes (global or per-variable):
        if next == Var::UNDEF {
            Lit::UNDEF
        } else if self.user_pol[next] != lbool::UNDEF {
            Lit::new(next, self.user_pol[next] == lbool::TRUE)
        } else if self.rnd_pol {
            Lit::new(next, utils::drand(&mut self.random_seed) < 0.5)
        } else {
            Lit::new(next, self.polarity[next])
        }
    }

    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        let v = self.next_var;
        self.next_var = Var::from_idx(self.next_var.idx() + 1);
        self.watches.init(Lit::new(v, false));
        self.watches.init(Lit::new(v, true));
        self.vars.ass.insert_default(v, lbool::UNDEF);
        self.vars.vardata.insert_default(v, VarData::default());
        if self.rnd_init_act {
            self.vars
                .activity
                .insert(v, utils::drand(&mut self.random_seed) * 0.00001, 0.0);
        } else {
            self.vars.activity.insert(v, 0.0, 0.0);
        }
        self.seen.insert_default(v, Seen::UNDEF);
        self.polarity.insert(v, false, false);
        self.user_pol.insert(v, upol, lbool::UNDEF);
        self.decision.reserve(v, false);
        self.set_decision_var(v, dvar);
        v
    }

    /// Analyze conflict and produce a reason clause.
    ///
    /// # Pre-conditions:
    ///
    /// - current decision level must be greater than root level.
    /// - `confl` is falsified in the current trail.
    ///
    /// # Post-conditions:
    ///
    /// - the backtrack level and the glue of the learnt clause are returned.
    /// - `out_learnt[0]` is the asserting literal at the backtrack level.
    fn analyze(
        &mut self,
        confl: CRef,
        learnts: &[CRef],
        out_learnt: &mut Vec<Lit>,
    ) -> (i32, u32) {
        out_learnt.clear();
        out_learnt.push(Lit::UNDEF); // leave room for the asserting literal

        debug!("analyze.start {:?}", confl);

        let mut path_c: i32 = 0;
        let mut p = Lit::UNDEF;
        let mut index = self.vars.trail.len();
        let mut cr = confl;

        loop {
            debug_assert!(cr != CRef::UNDEF, "analyze reached a decision literal");

            if self.ca.get_ref(cr).learnt() {
                self.cla_bump_activity(learnts, cr);
            }

            // copy the literals to resolve with, so activities can be bumped
            // while the clause store stays untouched
            self.tmp_analyze.clear();
            {
                let lits = self.ca.get_ref(cr).lits();
                let start = if p == Lit::UNDEF { 0 } else { 1 };
                self.tmp_analyze.extend_from_slice(&lits[start..]);
            }

            for k in 0..self.tmp_analyze.len() {
                let q = self.tmp_analyze[k];
                let lvl = self.vars.level(q.var());
                if !self.seen[q.var()].is_seen() && lvl > 0 {
                    self.vars
                        .var_bump_activity(&mut self.order_heap, q.var());
                    self.seen[q.var()] = Seen::SOURCE;
                    if lvl >= self.vars.decision_level() as i32 {
                        path_c += 1;
                    } else {
                        out_learnt.push(q);
                    }
                }
            }

            // Select next literal in the trail to look at:
            loop {
                index -= 1;
                if self.seen[self.vars.trail[index].var()].is_seen() {
                    break;
                }
            }
            p = self.vars.trail[index];
            cr = self.vars.reason(p.var());
            self.seen[p.var()] = Seen::UNDEF;
            path_c -= 1;

            if path_c <= 0 {
                break;
            }
        }

        debug_assert!(p != Lit::UNDEF);
        out_learnt[0] = !p;
        self.max_literals += out_learnt.len() as u64;

        self.minimize_conflict(out_learnt);

        // Find correct backtrack level:
        let btlevel = if out_learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            let mut max_level = self.vars.level(out_learnt[max_i].var());
            // Find the first literal assigned at the next-highest level:
            for i in 2..out_learnt.len() {
                let level = self.vars.level(out_learnt[i].var());
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }
            // Swap-in this literal at index 1:
            out_learnt.swap(max_i, 1);
            max_level
        };

        let glue = {
            let mut levels: SmallVec<[i32; 16]> = out_learnt
                .iter()
                .map(|&l| self.vars.level(l.var()))
                .collect();
            levels.sort_unstable();
            levels.dedup();
            levels.len() as u32
        };

        for i in 0..self.analyze_toclear.len() {
            let lit = self.analyze_toclear[i];
            self.seen[lit.var()] = Seen::UNDEF; // (`seen[]` is now cleared)
        }

        trace!("analyze.learnt {:?} (btlevel {})", out_learnt, btlevel);
        (btlevel, glue)
    }

    /// An abstraction of the level of a variable
    #[inline]
    fn abstract_level(&self, v: Var) -> u32 {
        1 << (self.vars.level(v) & 31)
    }

    fn minimize_conflict(&mut self, out_learnt: &mut Vec<Lit>) {
        // Simplify conflict clause:
        self.analyze_toclear.clear();
        self.analyze_toclear.extend_from_slice(out_learnt);
        let new_size = if self.ccmin_mode == 2 {
            let mut abstract_levels = 0;
            for a in out_learnt[1..].iter() {
                abstract_levels |= self.abstract_level(a.var());
            }

            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                // can eliminate `lit` only if it's redundant *and* not a decision
                if self.vars.reason(lit.var()) == CRef::UNDEF
                    || !self.lit_redundant(lit, abstract_levels)
                {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else if self.ccmin_mode == 1 {
            let mut j = 1;
            for i in 1..out_learnt.len() {
                let lit = out_learnt[i];
                let x = lit.var();
                let reason = self.vars.reason(x);

                let mut retain = reason == CRef::UNDEF;
                if !retain {
                    self.tmp_analyze.clear();
                    self.tmp_analyze
                        .extend_from_slice(&self.ca.get_ref(reason).lits()[1..]);
                    for k in 0..self.tmp_analyze.len() {
                        let v = self.tmp_analyze[k].var();
                        if !self.seen[v].is_seen() && self.vars.level(v) > 0 {
                            retain = true;
                            break;
                        }
                    }
                }
                if retain {
                    out_learnt[j] = lit;
                    j += 1;
                }
            }
            j
        } else {
            out_learnt.len()
        };

        self.tot_literals += new_size as u64;
        debug_assert!(new_size <= out_learnt.len());
        out_learnt.truncate(new_size);
    }

    /// Check if `p` can be removed from a conflict clause `C`.
    ///
    /// It can be removed from `C` if it is propagation-implied
    /// by literals of level 0 exclusively or if `C x p.reason` subsumes `C`.
    fn lit_redundant(&mut self, p: Lit, abstract_levels: u32) -> bool {
        self.minimize_stack.clear();
        self.minimize_stack.push(p);

        let top = self.analyze_toclear.len();

        while let Some(q) = self.minimize_stack.pop() {
            let cr = self.vars.reason(q.var());
            debug_assert!(cr != CRef::UNDEF);

            self.tmp_analyze.clear();
            self.tmp_analyze
                .extend_from_slice(&self.ca.get_ref(cr).lits()[1..]);

            // `q` comes from some propagation, check whether the propagation
            // reasons can also be eliminated or are already in the clause
            for k in 0..self.tmp_analyze.len() {
                let l = self.tmp_analyze[k];
                if self.vars.level(l.var()) == 0 || self.seen[l.var()] == Seen::SOURCE {
                    continue;
                }

                if self.vars.reason(l.var()) != CRef::UNDEF
                    && (self.abstract_level(l.var()) & abstract_levels) != 0
                {
                    self.seen[l.var()] = Seen::SOURCE;
                    self.minimize_stack.push(l);
                    self.analyze_toclear.push(l);
                } else {
                    // cannot remove `l`, cancel
                    for i in top..self.analyze_toclear.len() {
                        let a = self.analyze_toclear[i];
                        self.seen[a.var()] = Seen::UNDEF;
                    }
                    self.analyze_toclear.truncate(top);
                    return false;
                }
            }
        }

        true
    }

    /// Specialized analysis procedure to express the final conflict in terms of assumptions.
    /// Calculates the (possibly empty) set of assumptions that led to the assignment of `p`, and
    /// stores the result in `out_conflict`.
    fn analyze_final(&mut self, p: Lit, out_conflict: &mut LSet) {
        out_conflict.clear();
        out_conflict.insert(p);
        debug!("analyze_final lit={:?}", p);

        if self.decision_level() == 0 {
            return; // no assumptions
        }

        self.seen[p.var()] = Seen::SOURCE;

        let start = self.vars.trail_lim[0] as usize;
        for i in (start..self.vars.trail.len()).rev() {
            let lit = self.vars.trail[i];
            let x = lit.var();
            if self.seen[x].is_seen() {
                let reason = self.vars.reason(x);
                if reason == CRef::UNDEF {
                    debug_assert!(self.vars.level(x) > 0);
                    out_conflict.insert(!lit);
                } else {
                    self.tmp_analyze.clear();
                    self.tmp_analyze
                        .extend_from_slice(&self.ca.get_ref(reason).lits()[1..]);
                    for k in 0..self.tmp_analyze.len() {
                        let l = self.tmp_analyze[k];
                        if self.vars.level(l.var()) > 0 {
                            self.seen[l.var()] = Seen::SOURCE;
                        }
                    }
                }
                self.seen[x] = Seen::UNDEF;
            }
        }

        self.seen[p.var()] = Seen::UNDEF;
    }

    /// Propagates all enqueued facts.
    ///
    /// If a conflict arises, the conflicting clause is returned, otherwise `None`.
    ///
    /// # Post-conditions:
    ///
    /// - the propagation queue is empty, even if there was a conflict.
    fn propagate(&mut self) -> Option<CRef> {
        let mut confl = None;
        let mut num_props: u32 = 0;

        while (self.qhead as usize) < self.vars.trail.len() {
            // `p` is the next enqueued fact to propagate.
            let p = self.vars.trail[self.qhead as usize];
            self.qhead += 1;
            num_props += 1;

            if self.watches.is_dirty(p) {
                self.watches.clean(p, &self.ca);
            }
            // take the list out; new watches always go to other literals'
            // lists, so `occs[p]` stays untouched while we iterate
            let mut ws = self.watches.take(p);
            let mut i: usize = 0;
            let mut j: usize = 0;
            let end: usize = ws.len();
            'clauses: while i < end {
                // Try to avoid inspecting the clause:
                let blocker = ws[i].blocker;
                if self.vars.value_lit(blocker) == lbool::TRUE {
                    ws[j] = ws[i];
                    j += 1;
                    i += 1;
                    continue;
                }

                // Make sure the false literal is lits[1]:
                let cr = ws[i].cref;
                i += 1;
                let false_lit = !p;
                let first = {
                    let mut c = self.ca.get_mut(cr);
                    if c[0] == false_lit {
                        c[0] = c[1];
                        c[1] = false_lit;
                    }
                    debug_assert_eq!(c[1], false_lit);
                    c[0]
                };

                // If 0th watch is true, then clause is already satisfied.
                let w = Watcher::new(cr, first);
                if first != blocker && self.vars.value_lit(first) == lbool::TRUE {
                    ws[j] = w;
                    j += 1;
                    continue;
                }

                // Look for new watch:
                {
                    let mut c = self.ca.get_mut(cr);
                    let size = c.size();
                    let mut k = 2;
                    while k < size {
                        if self.vars.value_lit(c[k]) != lbool::FALSE {
                            let new_watch = c[k];
                            c[1] = new_watch;
                            c[k] = false_lit;
                            debug_assert_ne!(!new_watch, p);
                            self.watches.push(!new_watch, w);
                            continue 'clauses;
                        }
                        k += 1;
                    }
                }

                // Did not find watch -- clause is unit under assignment:
                ws[j] = w;
                j += 1;
                if self.vars.value_lit(first) == lbool::FALSE {
                    confl = Some(cr);
                    self.qhead = self.vars.trail.len() as i32;
                    // Copy the remaining watches:
                    while i < end {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.vars.unchecked_enqueue(first, cr);
                }
            }
            ws.truncate(j);
            self.watches.put(p, ws);
        }
        self.propagations += num_props as u64;
        self.simp_db_props -= num_props as i64;

        confl
    }

    fn rebuild_order_heap(&mut self) {
        let mut vs = vec![];
        for v in (0..self.num_vars()).map(Var::from_idx) {
            if self.decision[v] && self.value(v) == lbool::UNDEF {
                vs.push(v);
            }
        }
        self.order_heap.build(&vs, &self.vars.activity);
    }

    /// Attach a clause to watcher lists
    fn attach_clause(&mut self, cr: CRef) {
        let (c0, c1, learnt, size) = {
            let c = self.ca.get_ref(cr);
            debug_assert!(c.size() > 1);
            (c[0], c[1], c.learnt(), c.size())
        };
        self.watches.push(!c0, Watcher::new(cr, c1));
        self.watches.push(!c1, Watcher::new(cr, c0));
        if learnt {
            self.num_learnts += 1;
            self.learnts_literals += size as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += size as u64;
        }
    }

    /// Detach a clause from watcher lists (lazily).
    fn detach_clause(&mut self, cr: CRef) {
        let (c0, c1, csize, clearnt) = {
            let c = self.ca.get_ref(cr);
            (c[0], c[1], c.size(), c.learnt())
        };
        debug_assert!(csize > 1);

        self.watches.smudge(!c0);
        self.watches.smudge(!c1);

        if clearnt {
            self.num_learnts -= 1;
            self.learnts_literals -= csize as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= csize as u64;
        }
    }

    /// Detach and free a clause.
    fn remove_clause(&mut self, cr: CRef) {
        self.detach_clause(cr);
        {
            let c = self.ca.get_ref(cr);
            // Don't leave pointers to free'd memory!
            if self.locked(c) {
                self.vars.vardata[c[0].var()].reason = CRef::UNDEF;
            }
        }
        self.ca.get_mut(cr).set_mark(1);
        self.ca.free(cr);
    }

    fn satisfied(&self, c: ClauseRef) -> bool {
        c.iter().any(|&lit| self.value_lit(lit) == lbool::TRUE)
    }

    /// Returns `true` if a clause is a reason for some implication in the current state.
    fn locked(&self, c: ClauseRef) -> bool {
        let reason = self.vars.reason(c[0].var());
        self.value_lit(c[0]) == lbool::TRUE
            && reason != CRef::UNDEF
            && self.ca.get_ref(reason) == c
    }

    /// Revert to the state at given level (keeping all assignment at `level` but not beyond).
    fn cancel_until(&mut self, level: u32) {
        debug_assert!(self.decision_level() > level);
        let trail_lim_last = *self.vars.trail_lim.last().expect("trail_lim is empty") as usize;
        let trail_lim_level = self.vars.trail_lim[level as usize] as usize;
        for c in (trail_lim_level..self.vars.trail.len()).rev() {
            let x = self.vars.trail[c].var();
            self.vars.ass[x] = lbool::UNDEF;
            if self.phase_saving > 1 || (self.phase_saving == 1 && c > trail_lim_last) {
                self.polarity[x] = self.vars.trail[c].sign();
            }
            self.insert_var_order(x);
        }
        self.qhead = trail_lim_level as i32;
        self.vars.trail.truncate(trail_lim_level);
        self.vars.trail_lim.truncate(level as usize);
    }

    fn progress_estimate(&self) -> f64 {
        let mut progress = 0.0;
        let f = 1.0 / self.num_vars() as f64;

        for i in 0..self.decision_level() + 1 {
            let beg: i32 = if i == 0 {
                0
            } else {
                self.vars.trail_lim[i as usize - 1]
            };
            let end: i32 = if i == self.decision_level() {
                self.vars.trail.len() as i32
            } else {
                self.vars.trail_lim[i as usize]
            };
            progress += f64::powi(f, i as i32) * (end - beg) as f64;
        }

        progress / self.num_vars() as f64
    }
}

impl VarState {
    fn new(opts: &SolverOpts) -> Self {
        Self {
            ass: VMap::new(),
            vardata: VMap::new(),
            activity: VMap::new(),
            var_inc: 1.0,
            var_decay: opts.var_decay,
            trail: vec![],
            trail_lim: vec![],
        }
    }

    #[inline(always)]
    fn num_assigns(&self) -> u32 {
        self.trail.len() as u32
    }

    /// Begins a new decision level.
    fn new_decision_level(&mut self) {
        let lvl = self.trail.len() as i32;
        self.trail_lim.push(lvl);
    }

    fn proved_at_lvl_0(&self) -> &[Lit] {
        // find where the end of the level-0 part of the trail is
        let end = self
            .trail_lim
            .get(0)
            .map_or(self.trail.len(), |&x| x as usize);
        &self.trail[..end]
    }

    #[inline(always)]
    fn value(&self, x: Var) -> lbool {
        self.ass[x]
    }

    #[inline(always)]
    fn value_lit(&self, x: Lit) -> lbool {
        self.ass[x.var()] ^ !x.sign()
    }

    #[inline(always)]
    fn level(&self, x: Var) -> i32 {
        self.vardata[x].level
    }

    #[inline(always)]
    fn reason(&self, x: Var) -> CRef {
        self.vardata[x].reason
    }

    fn var_decay_activity(&mut self) {
        self.var_inc *= 1.0 / self.var_decay;
    }

    #[inline(always)]
    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn unchecked_enqueue(&mut self, p: Lit, from: CRef) {
        debug_assert_eq!(
            self.value_lit(p),
            lbool::UNDEF,
            "lit {:?} should be undef",
            p
        );
        self.ass[p.var()] = lbool::new(p.sign());
        self.vardata[p.var()] = VarData::new(from, self.decision_level() as i32);
        self.trail.push(p);
    }

    /// Increase a variable with the current 'bump' value.
    fn var_bump_activity(&mut self, order_heap: &mut Heap<Var>, v: Var) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > 1e100 {
            // Rescale:
            for (_, x) in self.activity.iter_mut() {
                *x *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }

        // Update order_heap with respect to new activity:
        if order_heap.in_heap(v) {
            order_heap.decrease(v, &self.activity);
        }
    }
}

mod utils {
    /// Finite subsequences of the Luby-sequence:
    ///
    /// > 0: 1
    /// > 1: 1 1 2
    /// > 2: 1 1 2 1 1 2 4
    /// > 3: 1 1 2 1 1 2 4 1 1 2 1 1 2 4 8
    /// ...
    pub(super) fn luby(y: f64, mut x: i32) -> f64 {
        // Find the finite subsequence that contains index 'x', and the
        // size of that subsequence:
        let mut size = 1;
        let mut seq = 0;
        while size < x + 1 {
            seq += 1;
            size = 2 * size + 1;
        }

        while size - 1 != x {
            size = (size - 1) >> 1;
            seq -= 1;
            x = x % size;
        }

        f64::powi(y, seq)
    }

    /// Generate a random double:
    pub(super) fn drand(seed: &mut f64) -> f64 {
        *seed *= 1389796.0;
        let q = (*seed / 2147483647.0) as i32;
        *seed -= q as f64 * 2147483647.0;
        *seed / 2147483647.0
    }

    /// Generate a random integer:
    pub(super) fn irand(seed: &mut f64, size: i32) -> i32 {
        (drand(seed) * size as f64) as i32
    }
}

#[derive(Debug, Clone)]
pub struct SolverOpts {
    pub var_decay: f64,
    pub clause_decay: f64,
    pub random_var_freq: f64,
    pub random_seed: f64,
    pub ccmin_mode: i32,
    pub phase_saving: i32,
    pub rnd_init_act: bool,
    pub luby_restart: bool,
    pub restart_first: i32,
    pub restart_inc: f64,
    pub min_learnts_lim: i32,
}

impl Default for SolverOpts {
    fn default() -> SolverOpts {
        Self {
            var_decay: 0.95,
            clause_decay: 0.999,
            random_var_freq: 0.0,
            random_seed: 91648253.0,
            ccmin_mode: 2,
            phase_saving: 2,
            rnd_init_act: false,
            luby_restart: true,
            restart_first: 100,
            restart_inc: 2.0,
            min_learnts_lim: 0,
        }
    }
}

impl SolverOpts {
    /// Check that options are valid.
    pub fn check(&self) -> bool {
        (0.0 < self.var_decay && self.var_decay < 1.0)
            && (0.0 < self.clause_decay && self.clause_decay < 1.0)
            && (0.0 <= self.random_var_freq && self.random_var_freq <= 1.0)
            && (0.0 < self.random_seed && self.random_seed < f64::INFINITY)
            && (0 <= self.ccmin_mode && self.ccmin_mode <= 2)
            && (0 <= self.phase_saving && self.phase_saving <= 2)
            && 1 <= self.restart_first
            && (1.0 < self.restart_inc && self.restart_inc < f64::INFINITY)
            && 0 <= self.min_learnts_lim
    }
}

#[allow(unused)]
fn check_is_send<T: Send>() {}
#[allow(unused)]
fn solver_is_send<Cb: Callbacks + Send>() {
    check_is_send::<Solver<Cb>>();
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callbacks::Basic;

    fn lit(solver: &mut Solver<Basic>, l: i32) -> Lit {
        let v = solver.var_of_int((l.abs() - 1) as u32);
        Lit::new(v, l > 0)
    }

    fn add(solver: &mut Solver<Basic>, c: &[i32]) -> bool {
        let mut cl: Vec<Lit> = c.iter().map(|&l| lit(solver, l)).collect();
        solver.add_clause_reuse(&mut cl)
    }

    fn new_solver() -> Solver<Basic> {
        Solver::new(SolverOpts::default(), Basic::new())
    }

    #[test]
    fn test_trivial_sat() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 2]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        assert_eq!(s.value_var(Var::from_idx(1)), lbool::TRUE);
    }

    #[test]
    fn test_trivial_unsat() {
        let mut s = new_solver();
        add(&mut s, &[1]);
        add(&mut s, &[-1]);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
        assert!(!s.is_ok());
    }

    #[test]
    fn test_unsat_2vars() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 2]);
        add(&mut s, &[1, -2]);
        add(&mut s, &[-1, -2]);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    }

    #[test]
    fn test_assumptions_core() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        let a = lit(&mut s, -1);
        let b = lit(&mut s, -2);
        assert_eq!(s.solve_limited(&[a, b]), lbool::FALSE);
        let core = s.unsat_core();
        assert!(!core.is_empty());
        // formula is satisfiable without the assumptions
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    }

    #[test]
    fn test_incremental() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        add(&mut s, &[-1]);
        add(&mut s, &[-2]);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    }

    #[test]
    fn test_interrupt_before_solve() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        // interrupt flag is cleared on entry, so this still solves
        s.interrupt();
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    }

    #[test]
    fn test_import_shared() {
        let mut s = new_solver();
        add(&mut s, &[1, 2]);
        let a = lit(&mut s, -1);
        assert!(s.import_shared(&[a], 1));
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        assert_eq!(s.value_var(Var::from_idx(0)), lbool::FALSE);
        assert_eq!(s.value_var(Var::from_idx(1)), lbool::TRUE);
    }
}
