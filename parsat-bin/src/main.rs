/*****************************************************************************************[main.rs]
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

extern crate clap;
extern crate cpu_time;
extern crate flate2;
extern crate parsat;

#[cfg(not(feature = "logging"))]
mod env_logger {
    pub fn init() {}
}

#[cfg(feature = "logging")]
extern crate env_logger;

use clap::{App, Arg};
use flate2::bufread::GzDecoder;
use parsat::{lbool, ParSolver, ParSolverOpts, SolverInterface, SolverOpts};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::process::exit;
use std::time::Instant;

mod system;

fn main() {
    env_logger::init();
    let exitcode = main2().unwrap_or_else(|err| {
        eprintln!("{}", err);
        exit(1)
    });
    exit(exitcode);
}

fn main2() -> io::Result<i32> {
    let resource = system::ResourceMeasure::new();

    let matches = App::new("ParSat")
        .version("0.1.0")
        .about("Portfolio-parallel CDCL SAT solver")
        .arg(Arg::with_name("input-file"))
        .arg(Arg::with_name("result-output-file"))
        .arg(
            Arg::with_name("cores")
                .long("cores")
                .help("Number of solvers to use, 0 means each CPU, -1 every 2nd CPU")
                .default_value("0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbosity")
                .long("verb")
                .default_value("1")
                .takes_value(true),
        )
        .arg(Arg::with_name("is-strict").long("strict"))
        .arg(
            Arg::with_name("var-decay")
                .long("var-decay")
                .help("The variable activity decay factor")
                .default_value("0.95")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("clause-decay")
                .long("cla-decay")
                .help("The clause activity decay factor")
                .default_value("0.999")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("random-seed")
                .long("rnd-seed")
                .help("The base random seed the workers are diversified from")
                .default_value("91648253.0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("luby-restart")
                .long("luby")
                .conflicts_with("no-luby-restart")
                .help("Use the Luby restart sequence [default]"),
        )
        .arg(
            Arg::with_name("no-luby-restart")
                .long("no-luby")
                .help("Do not use the Luby restart sequence"),
        )
        .arg(
            Arg::with_name("restart-first")
                .long("rfirst")
                .help("The base restart interval")
                .default_value("100")
                .takes_value(true),
        )
        .get_matches();

    let mut solver_opts = SolverOpts::default();
    solver_opts.var_decay = matches
        .value_of("var-decay")
        .and_then(|s| s.parse().ok())
        .unwrap_or(solver_opts.var_decay);
    solver_opts.clause_decay = matches
        .value_of("clause-decay")
        .and_then(|s| s.parse().ok())
        .unwrap_or(solver_opts.clause_decay);
    solver_opts.random_seed = matches
        .value_of("random-seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(solver_opts.random_seed);
    solver_opts.luby_restart = !matches.is_present("no-luby-restart");
    solver_opts.restart_first = matches
        .value_of("restart-first")
        .and_then(|s| s.parse().ok())
        .unwrap_or(solver_opts.restart_first);

    let verbosity = matches
        .value_of("verbosity")
        .unwrap()
        .parse::<i32>()
        .unwrap_or(0);
    if verbosity < 0 || verbosity > 2 {
        eprintln!(
            "ERROR! value <{}> is too small for option \"verb\".",
            verbosity
        );
        exit(1);
    }
    let cores = matches
        .value_of("cores")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let par_opts = ParSolverOpts {
        cores,
        base: solver_opts,
        verbosity,
    };
    if !par_opts.check() {
        eprintln!("Invalid option value");
        exit(1);
    }

    let input_file = matches.value_of("input-file");
    let result_output_file = matches.value_of("result-output-file");
    let is_strict = matches.is_present("is-strict");

    let mut solver = ParSolver::new(par_opts);

    let initial_time = Instant::now();

    if let Some(input_file) = input_file {
        let file = BufReader::new(File::open(input_file)?);
        read_input_autogz(file, &mut solver, is_strict)?;
    } else {
        println!("c Reading from standard input... Use '--help' for help.");
        let stdin = io::stdin();
        read_input_autogz(stdin.lock(), &mut solver, is_strict)?;
    }

    let mut resfile = if let Some(result_output_file) = result_output_file {
        Some(BufWriter::new(File::create(result_output_file)?))
    } else {
        None
    };

    if verbosity > 0 {
        println!(
            "c |  Number of variables:  {:12}                                         |",
            solver.num_vars()
        );
        println!(
            "c |  Number of clauses:    {:12}                                         |",
            solver.num_clauses()
        );
        let duration = Instant::now() - initial_time;
        println!(
            "c |  Parse time:           {:9}.{:02} s                                       |",
            duration.as_secs(),
            duration.subsec_nanos() / 10_000_000
        );
    }

    let ret = solver.solve_limited(&[]);
    if verbosity > 0 {
        solver.print_stats();
        println!("c CPU time              : {:.3}s", resource.cpu_time());
    }

    if ret == lbool::TRUE {
        println!("s SATISFIABLE");
    } else if ret == lbool::FALSE {
        println!("s UNSATISFIABLE");
    } else {
        println!("s INDETERMINATE");
    }
    if let Some(resfile) = resfile.as_mut() {
        if ret == lbool::TRUE {
            writeln!(resfile, "s SAT")?;
            write_model(resfile, &solver)?;
        } else if ret == lbool::FALSE {
            writeln!(resfile, "s UNSAT")?;
        } else {
            writeln!(resfile, "s INDET")?;
        }
        resfile.flush()?;
    } else if ret == lbool::TRUE && verbosity > 0 {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_model(&mut out, &solver)?;
    }
    mem::drop(resfile);

    let exitcode = if ret == lbool::TRUE {
        10
    } else if ret == lbool::FALSE {
        20
    } else {
        0
    };

    if !cfg!(debug_assertions) {
        // (faster than "return", which will invoke the destructor for 'ParSolver')
        exit(exitcode);
    }

    Ok(exitcode)
}

fn write_model<W: Write>(out: &mut W, solver: &ParSolver) -> io::Result<()> {
    write!(out, "v ")?;
    for (i, &val) in solver.model.iter().enumerate() {
        if val == lbool::TRUE {
            write!(out, "{} ", i + 1)?;
        } else if val == lbool::FALSE {
            write!(out, "-{} ", i + 1)?;
        }
    }
    writeln!(out, "0")
}

fn read_input_autogz<R: BufRead>(
    mut input: R,
    solver: &mut ParSolver,
    is_strict: bool,
) -> io::Result<()> {
    let is_gz = input.fill_buf()?.starts_with(b"\x1F\x8B");
    if is_gz {
        read_input(BufReader::new(GzDecoder::new(input)), solver, is_strict)
    } else {
        read_input(input, solver, is_strict)
    }
}

fn read_input<R: BufRead>(mut input: R, solver: &mut ParSolver, is_strict: bool) -> io::Result<()> {
    parsat::dimacs::parse(&mut input, solver, is_strict)
}
