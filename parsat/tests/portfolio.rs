//! End-to-end tests of the portfolio solver: small crafted instances,
//! pigeonhole formulas, incremental solving and interruption, plus a
//! random 3-SAT sweep asserting that every core count agrees.

use parsat::{lbool, Lit, ParSolver, ParSolverOpts, SolverInterface, Var};
use std::thread;
use std::time::{Duration, Instant};

fn new_par(cores: i32) -> ParSolver {
    ParSolver::new(ParSolverOpts {
        cores,
        ..ParSolverOpts::default()
    })
}

fn lit_of(s: &mut ParSolver, l: i32) -> Lit {
    assert!(l != 0);
    let v = s.var_of_int((l.abs() - 1) as u32);
    Lit::new(v, l > 0)
}

fn add(s: &mut ParSolver, c: &[i32]) {
    let mut cl: Vec<Lit> = c.iter().map(|&l| lit_of(s, l)).collect();
    s.add_clause_reuse(&mut cl);
}

/// Check that the solver's model satisfies every clause of `cnf`.
fn check_model(s: &ParSolver, cnf: &[Vec<i32>]) {
    for clause in cnf {
        let sat = clause.iter().any(|&l| {
            let v = Var::from_idx((l.abs() - 1) as u32);
            s.value_lit(Lit::new(v, l > 0)) == lbool::TRUE
        });
        assert!(sat, "model does not satisfy clause {:?}", clause);
    }
}

#[test]
fn unsat_units_one_core() {
    let mut s = new_par(1);
    add(&mut s, &[1]);
    add(&mut s, &[-1]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert!(s.conflict.is_empty());
}

#[test]
fn unsat_two_vars_four_cores() {
    let mut s = new_par(4);
    add(&mut s, &[1, 2]);
    add(&mut s, &[-1, 2]);
    add(&mut s, &[1, -2]);
    add(&mut s, &[-1, -2]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
    assert!(s.conflict.is_empty());
}

#[test]
fn unsat_chain_four_cores() {
    let mut s = new_par(4);
    add(&mut s, &[1, 2, 3]);
    add(&mut s, &[-1]);
    add(&mut s, &[-2]);
    add(&mut s, &[-3, 1]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn sat_forces_last_var_two_cores() {
    let cnf = vec![vec![1, 2], vec![-1, 3], vec![-2, 3]];
    let mut s = new_par(2);
    for c in &cnf {
        add(&mut s, c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert_eq!(s.value_var(Var::from_idx(2)), lbool::TRUE);
    check_model(&s, &cnf);
}

/// Pigeonhole principle: `pigeons` pigeons into `holes` holes.
/// Unsatisfiable whenever `pigeons > holes`.
fn pigeonhole(pigeons: i32, holes: i32) -> Vec<Vec<i32>> {
    let var = |p: i32, h: i32| (p - 1) * holes + h; // 1-based DIMACS literal
    let mut cnf = vec![];
    for p in 1..=pigeons {
        cnf.push((1..=holes).map(|h| var(p, h)).collect());
    }
    for h in 1..=holes {
        for p1 in 1..=pigeons {
            for p2 in (p1 + 1)..=pigeons {
                cnf.push(vec![-var(p1, h), -var(p2, h)]);
            }
        }
    }
    cnf
}

#[test]
fn pigeonhole_5_4_four_cores() {
    let mut s = new_par(4);
    for c in &pigeonhole(5, 4) {
        add(&mut s, c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn pigeonhole_4_4_is_sat() {
    let cnf = pigeonhole(4, 4);
    let mut s = new_par(2);
    for c in &cnf {
        add(&mut s, c);
    }
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    check_model(&s, &cnf);
}

#[test]
fn incremental_solving_two_cores() {
    let mut s = new_par(2);
    add(&mut s, &[1, 2]);
    let a = lit_of(&mut s, 1);
    assert_eq!(s.solve_limited(&[a]), lbool::TRUE);
    add(&mut s, &[-2]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    assert_eq!(s.model[0], lbool::TRUE);
    assert_eq!(s.model[1], lbool::FALSE);
}

#[test]
fn incremental_towards_unsat() {
    let mut s = new_par(2);
    add(&mut s, &[1, 2]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    add(&mut s, &[-1]);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    check_model(&s, &[vec![1, 2], vec![-1]]);
    add(&mut s, &[-2]);
    assert_eq!(s.solve_limited(&[]), lbool::FALSE);
}

#[test]
fn assumption_core_is_subset() {
    let mut s = new_par(2);
    add(&mut s, &[1, 2]);
    let a = lit_of(&mut s, -1);
    let b = lit_of(&mut s, -2);
    assert_eq!(s.solve_limited(&[a, b]), lbool::FALSE);
    assert!(!s.conflict.is_empty());
    for &l in &s.conflict {
        assert!(l == !a || l == !b, "conflict lit {:?} not from assumptions", l);
    }
    // without the assumptions the formula is satisfiable again
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}

/// Random 3-SAT instance near the phase transition.
fn random_3sat(rng: &mut fastrand::Rng, num_vars: i32, num_clauses: i32) -> Vec<Vec<i32>> {
    let mut cnf = Vec::with_capacity(num_clauses as usize);
    for _ in 0..num_clauses {
        let mut clause = vec![];
        while clause.len() < 3 {
            let v = rng.i32(1..=num_vars);
            if clause.iter().any(|&l: &i32| l.abs() == v) {
                continue;
            }
            clause.push(if rng.bool() { v } else { -v });
        }
        cnf.push(clause);
    }
    cnf
}

#[test]
fn random_3sat_all_core_counts_agree() {
    for seed in 0..6u64 {
        let mut rng = fastrand::Rng::with_seed(seed);
        // ratio ~4.26, right at the hard region for this size
        let cnf = random_3sat(&mut rng, 30, 128);

        let mut verdicts = vec![];
        for &cores in &[1, 2, 4] {
            let mut s = new_par(cores);
            for c in &cnf {
                add(&mut s, c);
            }
            let ret = s.solve_limited(&[]);
            assert!(ret != lbool::UNDEF, "seed {} cores {} indeterminate", seed, cores);
            if ret == lbool::TRUE {
                check_model(&s, &cnf);
            }
            verdicts.push(ret);
        }
        assert!(
            verdicts.windows(2).all(|w| w[0] == w[1]),
            "seed {}: verdicts disagree: {:?}",
            seed,
            verdicts
        );
    }
}

#[test]
fn interrupt_returns_promptly() {
    let mut s = new_par(4);
    // large pigeonhole instance, far beyond what any worker finishes quickly
    for c in &pigeonhole(10, 9) {
        add(&mut s, c);
    }
    let h = s.interrupter();
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        h.interrupt();
    });
    let started = Instant::now();
    let ret = s.solve_limited(&[]);
    t.join().unwrap();
    assert_eq!(ret, lbool::UNDEF);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "interrupt was not prompt: {:?}",
        started.elapsed()
    );
    // the solver stays usable and the interrupt is consumed
    let mut easy = new_par(2);
    add(&mut easy, &[1]);
    assert_eq!(easy.solve_limited(&[]), lbool::TRUE);
}

#[test]
fn interrupt_twice_equals_once() {
    let mut s = new_par(2);
    add(&mut s, &[1, 2]);
    let h = s.interrupter();
    h.interrupt();
    h.interrupt();
    assert_eq!(s.solve_limited(&[]), lbool::UNDEF);
    assert_eq!(s.solve_limited(&[]), lbool::TRUE);
}
