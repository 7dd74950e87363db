/*****************************************************************************************[par.rs]
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
    crate::clause::{lbool, Lit, Var},
    crate::core::{Solver, SolverOpts, SyncHook},
    crate::interface::SolverInterface,
    crate::jobqueue::{self, Barrier, JobQueue},
    crate::sharing::ClausePool,
    crate::simp::SimpSolver,
    cpu_time::ProcessTime,
    std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering},
    std::sync::{Arc, Mutex},
    std::time::Instant,
};

/// Clause accesses a solver must perform between two sharing rounds.
const SYNC_DIFF: u64 = 10_000;

/// Configuration of the portfolio solver.
#[derive(Debug, Clone)]
pub struct ParSolverOpts {
    /// Number of solvers to use; `0` means one per CPU, `-1` every 2nd CPU.
    pub cores: i32,
    /// Options the workers are derived from (before diversification).
    pub base: SolverOpts,
    pub verbosity: i32,
}

impl Default for ParSolverOpts {
    fn default() -> Self {
        Self {
            cores: 0,
            base: SolverOpts::default(),
            verbosity: 0,
        }
    }
}

impl ParSolverOpts {
    pub fn check(&self) -> bool {
        self.cores >= -1 && self.base.check()
    }
}

/// Per-worker record. Every field is written by the owning worker thread
/// during a solve call and read by the coordinator afterwards.
struct SolverData {
    status: AtomicU8,
    idle_s: Mutex<f64>,
    next_sync_limit: AtomicU64,
    // telemetry only
    winning: AtomicU64,
    entered_barrier: AtomicU64,
    blocked_by_barrier: AtomicU64,
}

impl SolverData {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(lbool::UNDEF.to_u8()),
            idle_s: Mutex::new(0.0),
            next_sync_limit: AtomicU64::new(0),
            winning: AtomicU64::new(0),
            entered_barrier: AtomicU64::new(0),
            blocked_by_barrier: AtomicU64::new(0),
        }
    }

    fn status(&self) -> lbool {
        lbool::from_u8(self.status.load(Ordering::SeqCst))
    }

    fn set_status(&self, s: lbool) {
        self.status.store(s.to_u8(), Ordering::SeqCst);
    }
}

/// State shared between the coordinator and all worker threads.
struct ParShared {
    cores: usize,
    barrier: Barrier,
    pools: Vec<Mutex<ClausePool>>,
    data: Vec<SolverData>,
    /// Read-only assumption vector for the in-flight solve call.
    assumptions: Mutex<Vec<Lit>>,
    /// Workers currently inside the sync barrier phase (arrival order).
    syncing_solvers: AtomicUsize,
    /// A worker found a definite answer; everybody else winds down.
    stop: AtomicBool,
    /// Asynchronous interruption requested from outside.
    interrupt: AtomicBool,
    /// Workers whose search has finished for this call.
    done: AtomicUsize,
    /// Decision of the terminal rendezvous, published by the barrier cycle
    /// that observed the whole portfolio done.
    round_over: AtomicBool,
}

impl ParShared {
    fn new(cores: usize) -> Self {
        Self {
            cores,
            barrier: Barrier::new(0), // grown before the first parallel solve
            pools: (0..cores).map(|_| Mutex::new(ClausePool::new())).collect(),
            data: (0..cores).map(|_| SolverData::new()).collect(),
            assumptions: Mutex::new(vec![]),
            syncing_solvers: AtomicUsize::new(0),
            stop: AtomicBool::new(false),
            interrupt: AtomicBool::new(false),
            done: AtomicUsize::new(0),
            round_over: AtomicBool::new(false),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.interrupt.load(Ordering::SeqCst)
    }
}

/// Callbacks installed into every worker: the stop predicate polls the
/// portfolio-wide stop and interrupt flags.
pub struct PortfolioCb {
    shared: Arc<ParShared>,
}

impl Callbacks for PortfolioCb {
    #[inline]
    fn stop(&self) -> bool {
        self.shared.stop_requested()
    }
}

/// Cloneable handle that can interrupt a running [`ParSolver`] from another
/// thread (or a signal handler).
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<ParShared>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.shared.interrupt.store(true, Ordering::SeqCst);
    }
}

/// Portfolio-parallel solver: runs `cores` diversified simplifying solvers
/// on the same formula, exchanges learnt clauses between them during search
/// and returns the first sound answer.
///
/// Worker 0 is the *primary*: it owns the authoritative formula and is the
/// only worker that preprocesses. Workers 1.. are *replicas* kept in sync
/// from the primary between solve calls.
pub struct ParSolver {
    // field order matters: the pool joins its threads before workers drop
    jobs: Option<JobQueue>,
    workers: Vec<Arc<Mutex<SimpSolver<PortfolioCb>>>>,
    shared: Arc<ParShared>,

    cores: usize,
    verbosity: i32,
    initialized: bool,
    use_simplification: bool,
    /// A formula-modifying call targeted the primary since the last
    /// replica sync.
    primary_modified: bool,
    /// Original clauses already replicated from the primary.
    synced_clauses: usize,
    /// Unit clauses already replicated from the primary.
    synced_units: usize,
    simplification_seconds: f64,
    start_wall: Instant,
    start_cpu: ProcessTime,

    /// If the problem is satisfiable, this vector contains the model.
    pub model: Vec<lbool>,
    /// If the problem is unsatisfiable under assumptions, the final
    /// conflict clause expressed in the assumptions.
    pub conflict: Vec<Lit>,
}

fn nr_cores(requested: i32) -> usize {
    let detected = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let cores = if requested == 0 {
        detected
    } else if requested < 0 {
        (detected + 1) / 2
    } else {
        requested as usize
    };
    cores.max(1)
}

impl Default for ParSolver {
    fn default() -> Self {
        ParSolver::new(ParSolverOpts::default())
    }
}

impl ParSolver {
    pub fn new(opts: ParSolverOpts) -> Self {
        assert!(opts.check());
        let cores = nr_cores(opts.cores);
        println!("c initialize solver for {} cores", cores);

        let shared = Arc::new(ParShared::new(cores));
        let mut workers = Vec::with_capacity(cores);
        for i in 0..cores {
            let cb = PortfolioCb {
                shared: Arc::clone(&shared),
            };
            let mut s = SimpSolver::new(opts.base.clone(), cb);
            s.diversify(i as u32, 32);
            if i > 0 {
                // only the primary ever preprocesses
                s.eliminate(true);
            }
            workers.push(Arc::new(Mutex::new(s)));
        }

        let jobs = if cores > 1 {
            println!(
                "c initialize thread pool for {} non-primary threads",
                cores - 1
            );
            let q = JobQueue::new(cores - 1);
            q.set_state(jobqueue::SLEEP);
            Some(q)
        } else {
            None
        };

        Self {
            jobs,
            workers,
            shared,
            cores,
            verbosity: opts.verbosity,
            initialized: true,
            use_simplification: true,
            primary_modified: false,
            synced_clauses: 0,
            synced_units: 0,
            simplification_seconds: 0.0,
            start_wall: Instant::now(),
            start_cpu: ProcessTime::now(),
            model: vec![],
            conflict: vec![],
        }
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Handle usable to interrupt this solver from another thread.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            shared: Arc::clone(&self.shared),
        }
    }

    fn primary(&self) -> std::sync::MutexGuard<SimpSolver<PortfolioCb>> {
        self.workers[0].lock().unwrap()
    }

    // Problem specification (pass-through to the primary):

    pub fn n_vars(&self) -> u32 {
        self.primary().num_vars()
    }

    pub fn n_clauses(&self) -> u64 {
        self.primary().num_clauses()
    }

    pub fn add_clause_(&mut self, ps: &mut Vec<Lit>) -> bool {
        self.primary_modified = true;
        self.workers[0].lock().unwrap().add_clause_reuse(ps)
    }

    /// Hand an input clause to the online proof checker. No proof backend is
    /// attached to the portfolio, so this only flags the primary as modified.
    pub fn add_input_clause_(&mut self, _ps: &mut Vec<Lit>) {
        self.primary_modified = true;
    }

    pub fn reserve_vars(&mut self, n: u32) {
        self.workers[0].lock().unwrap().reserve_vars(n);
    }

    // Variable mode:

    pub fn set_frozen(&mut self, v: Var, b: bool) {
        // not flagged as a modification: only the primary runs simplification
        self.workers[0].lock().unwrap().set_frozen(v, b);
    }

    pub fn is_eliminated(&self, v: Var) -> bool {
        self.primary().is_eliminated(v)
    }

    /// Perform variable elimination based simplification on the primary.
    pub fn eliminate(&mut self, turn_off_elim: bool) -> bool {
        println!("c primary elimination");
        self.primary_modified = true;
        self.workers[0].lock().unwrap().eliminate(turn_off_elim)
    }

    pub fn max_simp_cls(&self) -> u64 {
        self.primary().max_simp_cls()
    }

    // Solving:

    pub fn okay(&self) -> bool {
        self.workers.iter().all(|w| w.lock().unwrap().is_ok())
    }

    pub fn solve(&mut self, assumps: &[Lit], do_simp: bool, turn_off_simp: bool) -> bool {
        self.solve_limited_simp(assumps, do_simp, turn_off_simp) == lbool::TRUE
    }

    /// Solve under assumptions with full control over preprocessing.
    pub fn solve_limited_simp(
        &mut self,
        assumps: &[Lit],
        do_simp: bool,
        turn_off_simp: bool,
    ) -> lbool {
        debug_assert!(self.initialized);
        self.conflict.clear();
        self.model.clear();

        // preprocessing runs once per solver life, sequentially on the primary
        if self.use_simplification {
            if self.verbosity > 0 {
                println!("c run simplification with primary solver");
            }
            self.use_simplification = false;
            let t0 = Instant::now();
            let ok = {
                let mut primary = self.workers[0].lock().unwrap();
                for &l in assumps {
                    primary.set_frozen(l.var(), true);
                }
                primary.eliminate(true)
            };
            self.simplification_seconds += t0.elapsed().as_secs_f64();
            self.primary_modified = true;
            {
                let primary = self.workers[0].lock().unwrap();
                self.shared.data[0]
                    .next_sync_limit
                    .store(primary.num_accesses(), Ordering::SeqCst);
            }
            if !ok {
                if self.verbosity > 0 {
                    println!("c simplification solved formula as unsat");
                }
                debug_assert!(self.conflict.is_empty());
                self.shared.interrupt.store(false, Ordering::SeqCst);
                return lbool::FALSE;
            }
        }

        if self.cores == 1 {
            let ret;
            {
                let mut primary = self.workers[0].lock().unwrap();
                ret = primary.solve_limited_simp(assumps, do_simp, turn_off_simp);
                self.model = primary.take_model();
                self.conflict = primary.take_conflict();
            }
            self.shared.interrupt.store(false, Ordering::SeqCst);
            return ret;
        }

        // assumptions over eliminated variables force those variables (and
        // their clauses) back before the replicas are synced
        {
            let mut primary = self.workers[0].lock().unwrap();
            for &l in assumps {
                if primary.is_eliminated(l.var()) {
                    primary.restore_var(l.var());
                    self.primary_modified = true;
                }
                primary.set_frozen(l.var(), true);
            }
        }

        let jobs = self.jobs.as_ref().expect("jobqueue should be initialized");

        // allow ALL parallel solvers to use the barrier before they start
        self.shared.barrier.grow(self.cores);
        *self.shared.assumptions.lock().unwrap() = assumps.to_vec();
        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.done.store(0, Ordering::SeqCst);
        self.shared.round_over.store(false, Ordering::SeqCst);
        self.shared.syncing_solvers.store(0, Ordering::SeqCst);
        for d in &self.shared.data {
            d.set_status(lbool::UNDEF);
        }
        jobs.set_state(jobqueue::SLEEP);

        for t in 1..self.cores {
            if self.primary_modified && !self.sync_solver_from_primary(t) {
                info!("solver {} failed to sync and will report unsat", t);
            }

            // initialize communication for this solver
            self.install_sync_hook(t);

            let shared = Arc::clone(&self.shared);
            let worker = Arc::clone(&self.workers[t]);
            jobs.add_job(Box::new(move || thread_run_solve(&shared, &worker, t)));
        }
        // initialize communication for the primary solver
        self.install_sync_hook(0);

        // parallel execution will start
        jobs.set_state(jobqueue::WORKING);

        self.primary_modified = false;
        // the calling thread acts as worker 0
        thread_run_solve(&self.shared, &self.workers[0], 0);

        // when we return from this, all parallel solvers are done as well
        // and do not modify relevant state anymore

        // prepare to sync from the state of the primary solver for
        // incremental solving
        {
            let primary = self.workers[0].lock().unwrap();
            self.synced_clauses = primary.n_orig_clauses();
            self.synced_units = primary.n_units();
        }

        let ret = self.collect_solvers_results();
        debug_assert!(
            self.shared.barrier.empty(),
            "all job functions should have left the barrier"
        );
        self.shared.interrupt.store(false, Ordering::SeqCst);
        ret
    }

    /// Replicate the delta of the primary's formula into worker `t`.
    /// Returns true iff every step succeeded and the replica is still okay.
    fn sync_solver_from_primary(&self, t: usize) -> bool {
        let src = self.workers[0].lock().unwrap();
        let mut dest = self.workers[t].lock().unwrap();
        if self.verbosity > 0 {
            println!("c sync solver {} from primary solver object", t);
        }

        // sync variables
        if dest.num_vars() < src.num_vars() {
            debug!(
                "resolve variable diff: {}",
                src.num_vars() - dest.num_vars()
            );
            dest.reserve_vars(src.num_vars());
            while dest.num_vars() < src.num_vars() {
                // ignore eliminated variables for decisions
                let next = Var::from_idx(dest.num_vars());
                dest.new_var(lbool::UNDEF, !src.is_eliminated(next));
            }
        }
        // a variable restored in the primary becomes branchable again
        for vi in 0..dest.num_vars() {
            let v = Var::from_idx(vi);
            dest.set_decision(v, !src.is_eliminated(v));
        }

        // sync unit clauses
        let mut ok = true;
        for unit_idx in self.synced_units..src.n_units() {
            let mut unit = vec![src.get_unit(unit_idx)];
            ok = dest.add_clause_reuse(&mut unit) && ok;
        }

        // sync clauses (after simplification this only syncs the survivors)
        for cls_idx in self.synced_clauses..src.n_orig_clauses() {
            let (lits, mark) = src.clause(cls_idx);
            if mark == 1 {
                continue; // skip satisfied clauses
            }
            let mut tmp = lits.to_vec();
            ok = dest.add_clause_reuse(&mut tmp) && ok;
        }

        ok && dest.is_ok()
    }

    fn install_sync_hook(&self, t: usize) {
        let shared = Arc::clone(&self.shared);
        let hook: SyncHook<PortfolioCb> =
            Box::new(move |s: &mut Solver<PortfolioCb>| portfolio_sync_and_share(&shared, s, t));
        self.workers[t].lock().unwrap().set_sync_hook(hook);
    }

    /// Pick the winning worker and move its result out (see the soundness
    /// rules: definite answers of different workers must agree).
    fn collect_solvers_results(&mut self) -> lbool {
        let mut status = lbool::UNDEF;
        let mut smallest_conflict = usize::MAX;
        let mut smallest_conflict_idx: i32 = -1;
        let mut sat_solver: i32 = -1;

        for t in 0..self.cores {
            let r = self.shared.data[t].status();
            if r == lbool::UNDEF {
                continue;
            }
            if status != lbool::UNDEF && r != status {
                panic!("c detected unsound parallel behavior when collecting results, aborting");
            }

            if r == lbool::FALSE {
                // heuristically select the smallest conflict
                let len = self.workers[t].lock().unwrap().conflict_len();
                if len < smallest_conflict {
                    smallest_conflict = len;
                    smallest_conflict_idx = t as i32;
                }
            } else if sat_solver < 0 {
                // select the first solver that won
                sat_solver = t as i32;
            }
            status = r;
        }

        if status == lbool::TRUE {
            debug_assert!(sat_solver >= 0);
            // with elimination the winning model has to be fixed up with the
            // primary's reconstruction stack
            let mut model = self.workers[sat_solver as usize].lock().unwrap().take_model();
            self.workers[0].lock().unwrap().extend_model(&mut model);
            self.model = model;
        } else if status == lbool::FALSE {
            debug_assert!(smallest_conflict_idx >= 0);
            self.conflict = self.workers[smallest_conflict_idx as usize]
                .lock()
                .unwrap()
                .take_conflict();
        }

        status
    }
}

impl SolverInterface for ParSolver {
    fn num_vars(&self) -> u32 {
        self.n_vars()
    }
    fn num_clauses(&self) -> u64 {
        self.n_clauses()
    }
    fn num_conflicts(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.lock().unwrap().num_conflicts())
            .sum()
    }
    fn is_ok(&self) -> bool {
        self.okay()
    }

    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var {
        self.primary_modified = true;
        self.workers[0].lock().unwrap().new_var(upol, dvar)
    }

    fn new_var_default(&mut self) -> Var {
        self.new_var(lbool::UNDEF, true)
    }

    fn var_of_int(&mut self, v_idx: u32) -> Var {
        self.primary_modified = true;
        self.workers[0].lock().unwrap().var_of_int(v_idx)
    }

    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool {
        self.add_clause_(clause)
    }

    fn simplify(&mut self) -> bool {
        self.primary_modified = true;
        self.workers[0].lock().unwrap().simplify()
    }

    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool {
        self.solve_limited_simp(assumps, true, false)
    }

    fn get_model(&self) -> &[lbool] {
        &self.model
    }

    fn value_var(&self, v: Var) -> lbool {
        self.model
            .get(v.idx() as usize)
            .map_or(lbool::UNDEF, |&x| x)
    }

    fn value_lit(&self, l: Lit) -> lbool {
        self.value_var(l.var()) ^ !l.sign()
    }

    fn unsat_core(&self) -> &[Lit] {
        &self.conflict
    }

    fn interrupt(&self) {
        self.shared.interrupt.store(true, Ordering::SeqCst);
    }

    fn print_stats(&self) {
        println!("c used {} cores", self.cores);
        println!(
            "c simplification wall time:      : {} s",
            self.simplification_seconds
        );

        let cpu_time = ProcessTime::now()
            .duration_since(self.start_cpu)
            .as_secs_f64();
        println!("c CPU time                       : {} s", cpu_time);

        let wall = self.start_wall.elapsed().as_secs_f64();
        let theoretical_max =
            (wall - self.simplification_seconds) * self.cores as f64 + self.simplification_seconds;
        println!("c theor. Max CPU time:           : {} s", theoretical_max);

        let total_idle: f64 = self
            .shared
            .data
            .iter()
            .map(|d| *d.idle_s.lock().unwrap())
            .sum();
        println!("c idle wall search time (sum):   : {} s", total_idle);

        let mut total_conflicts = 0u64;
        let mut total_decisions = 0u64;
        let mut total_restarts = 0u64;
        for w in &self.workers {
            let w = w.lock().unwrap();
            total_conflicts += w.num_conflicts();
            total_decisions += w.num_decisions();
            total_restarts += w.num_restarts();
        }
        println!("c SUM stats conflicts:           : {}", total_conflicts);
        println!("c SUM stats decisions:           : {}", total_decisions);
        println!("c SUM stats restarts:            : {}", total_restarts);

        if self.verbosity > 1 {
            for (t, d) in self.shared.data.iter().enumerate() {
                println!(
                    "c solver {}: entered barrier {} (blocked {}), winning {}",
                    t,
                    d.entered_barrier.load(Ordering::Relaxed),
                    d.blocked_by_barrier.load(Ordering::Relaxed),
                    d.winning.load(Ordering::Relaxed)
                );
            }
        }
    }
}

impl Drop for ParSolver {
    fn drop(&mut self) {
        // terminate and join the pool first; workers and shared state follow
        self.jobs.take();
        self.initialized = false;
    }
}

/// Job body of one portfolio member (the calling thread runs this for the
/// primary). Searches, publishes the result, then keeps matching barrier
/// arrivals until the whole portfolio has finished.
fn thread_run_solve(shared: &ParShared, worker: &Mutex<SimpSolver<PortfolioCb>>, t: usize) {
    debug!("started thread {}", t);

    let assumps: Vec<Lit> = shared.assumptions.lock().unwrap().clone();
    let data = &shared.data[t];

    let status;
    {
        let mut solver = worker.lock().unwrap();
        if !solver.is_ok() {
            // stop early, the solver is in a bad state initially already
            status = lbool::FALSE;
        } else {
            data.set_status(lbool::UNDEF);
            status = solver.solve_limited(&assumps);
        }
    }
    data.set_status(status);
    if status != lbool::UNDEF {
        // first sound answer wins; everybody else winds down
        data.winning.fetch_add(1, Ordering::Relaxed);
        shared.stop.store(true, Ordering::SeqCst);
    }

    // Terminal rendezvous. A finished worker keeps matching any in-flight
    // sharing phases arrival-for-arrival, so stragglers can complete their
    // three-phase exchange and observe the stop flag. The arrival that
    // completes a cycle decides, under the barrier lock, whether the whole
    // portfolio is done; every participant of that cycle reads the same
    // decision after release.
    shared.done.fetch_add(1, Ordering::SeqCst);
    data.entered_barrier.fetch_add(1, Ordering::Relaxed);
    let idle_from = Instant::now();
    loop {
        shared.barrier.wait_then(|| {
            let all_done = shared.done.load(Ordering::SeqCst) == shared.cores;
            shared.round_over.store(all_done, Ordering::SeqCst);
        });
        if shared.round_over.load(Ordering::SeqCst) {
            break;
        }
    }
    *data.idle_s.lock().unwrap() += idle_from.elapsed().as_secs_f64();
}

/// The portfolio sync callback (§ three-phase sharing): invoked by a worker
/// at restart boundaries. Publishes the worker's fresh learnt clauses into
/// its own pool, consumes everybody else's, and tells the worker whether to
/// stop searching.
fn portfolio_sync_and_share(
    shared: &ParShared,
    s: &mut Solver<PortfolioCb>,
    t: usize,
) -> bool {
    if shared.stop_requested() {
        return true;
    }

    let data = &shared.data[t];
    // ignore this call while below the solver-internal step limit
    if s.num_accesses() <= data.next_sync_limit.load(Ordering::SeqCst) {
        return false;
    }

    // remember when we reached syncing, to later adjust the sync pacing
    let _entering_sync = shared.syncing_solvers.fetch_add(1, Ordering::SeqCst);
    data.entered_barrier.fetch_add(1, Ordering::Relaxed);

    let blocked_from = Instant::now();
    // phase A: rendezvous of all workers
    shared.barrier.wait();
    shared.syncing_solvers.store(0, Ordering::SeqCst); // set back for the next round
    if blocked_from.elapsed().as_millis() > 1 {
        data.blocked_by_barrier.fetch_add(1, Ordering::Relaxed);
    }

    // publish: move fresh learnt clauses into our own pool
    {
        let mut pool = shared.pools[t].lock().unwrap();
        s.drain_shared(|lits, glue| pool.add(lits, glue));
    }

    // phase B: publication done everywhere
    shared.barrier.wait();

    // consume what every other worker published (best effort)
    for o in 0..shared.cores {
        if o == t {
            continue;
        }
        let pool = shared.pools[o].lock().unwrap();
        for i in 0..pool.len() {
            let (lits, glue) = pool.get(i);
            let _ = s.import_shared(lits, glue);
        }
    }

    // phase C: consumption done everywhere; pools can be reset
    shared.barrier.wait();
    shared.pools[t].lock().unwrap().reset();

    data.next_sync_limit
        .store(s.num_accesses() + SYNC_DIFF, Ordering::SeqCst);

    shared.stop_requested()
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_par(cores: i32) -> ParSolver {
        ParSolver::new(ParSolverOpts {
            cores,
            ..ParSolverOpts::default()
        })
    }

    fn lit(s: &mut ParSolver, l: i32) -> Lit {
        let v = s.var_of_int((l.abs() - 1) as u32);
        Lit::new(v, l > 0)
    }

    fn add(s: &mut ParSolver, c: &[i32]) -> bool {
        let mut cl: Vec<Lit> = c.iter().map(|&l| lit(s, l)).collect();
        s.add_clause_(&mut cl)
    }

    #[test]
    fn test_cores_resolution() {
        assert!(nr_cores(0) >= 1);
        assert_eq!(nr_cores(3), 3);
        assert!(nr_cores(-1) >= 1);
    }

    #[test]
    fn test_sequential_unsat_units() {
        let mut s = new_par(1);
        add(&mut s, &[1]);
        add(&mut s, &[-1]);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
        assert!(s.conflict.is_empty());
    }

    #[test]
    fn test_parallel_sat_small() {
        let mut s = new_par(2);
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 3]);
        add(&mut s, &[-2, 3]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        assert_eq!(s.value_var(Var::from_idx(2)), lbool::TRUE);
    }

    #[test]
    fn test_parallel_unsat_small() {
        let mut s = new_par(4);
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 2]);
        add(&mut s, &[1, -2]);
        add(&mut s, &[-1, -2]);
        assert_eq!(s.solve_limited(&[]), lbool::FALSE);
        assert!(s.conflict.is_empty());
    }

    #[test]
    fn test_synced_counts_after_solve() {
        let mut s = new_par(2);
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 3]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        let primary = s.workers[0].lock().unwrap();
        assert_eq!(s.synced_clauses, primary.n_orig_clauses());
        assert_eq!(s.synced_units, primary.n_units());
    }

    #[test]
    fn test_pools_empty_after_solve() {
        let mut s = new_par(2);
        add(&mut s, &[1, 2]);
        add(&mut s, &[-1, 3]);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
        for p in &s.shared.pools {
            assert!(p.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn test_interrupt_is_idempotent() {
        let mut s = new_par(2);
        add(&mut s, &[1, 2]);
        let h = s.interrupter();
        h.interrupt();
        h.interrupt();
        // the pending interrupt makes the next call indeterminate...
        assert_eq!(s.solve_limited(&[]), lbool::UNDEF);
        // ...and is consumed by it
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    }
}
