
/* Main Interface */

use crate::clause::{lbool, Lit, Var};

/// Main interface for a solver: it makes it possible to add clauses,
/// allocate variables, and check for satisfiability
///
/// It is implemented by the plain CDCL engine, by the simplifying solver and
/// by the parallel portfolio solver, so the DIMACS layer and the frontend can
/// drive any of them.
pub trait SolverInterface {
    fn num_vars(&self) -> u32;
    fn num_clauses(&self) -> u64;
    fn num_conflicts(&self) -> u64;

    fn is_ok(&self) -> bool;

    /// Creates a new SAT variable in the solver. If 'decision' is cleared, variable will not be
    /// used as a decision variable (NOTE! This has effects on the meaning of a SATISFIABLE result).
    fn new_var(&mut self, upol: lbool, dvar: bool) -> Var;

    /// Create a new variable with the default polarity
    fn new_var_default(&mut self) -> Var;

    /// Obtain the variable corresponding to the given 0-based index, creating
    /// intermediate variables as needed.
    fn var_of_int(&mut self, v_idx: u32) -> Var;

    /// Add a clause to the solver. Returns `false` if the solver is in
    /// an `UNSAT` state. May reorder `clause`.
    fn add_clause_reuse(&mut self, clause: &mut Vec<Lit>) -> bool;

    /// Simplify the clause database according to the current top-level assignment.
    fn simplify(&mut self) -> bool;

    /// Search for a model that respects a given set of assumptions (with resource constraints).
    fn solve_limited(&mut self, assumps: &[Lit]) -> lbool;

    /// Query whole model
    ///
    /// Precondition: last result was `Sat` (ie `lbool::TRUE`)
    fn get_model(&self) -> &[lbool];

    /// Query model for var
    fn value_var(&self, v: Var) -> lbool;

    /// Query model for lit
    fn value_lit(&self, l: Lit) -> lbool;

    /// Return unsat core (as a subset of assumptions).
    ///
    /// Precondition: last result was `Unsat`
    fn unsat_core(&self) -> &[Lit];

    /// Trigger a (potentially asynchronous) interruption of the solver.
    fn interrupt(&self);

    /// Print some current statistics to standard output.
    fn print_stats(&self);
}
