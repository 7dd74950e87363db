/*****************************************************************************************[dimacs.rs]
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
    crate::clause::Lit,
    crate::interface::SolverInterface,
    std::io::{self, BufRead},
};

/// `parse(input, solver)` adds the content of `input` to the solver.
///
/// `is_strict` makes the parse fail when the number of clauses does not
/// match the declared header.
pub fn parse<S: SolverInterface, R: BufRead>(
    input: &mut R,
    solver: &mut S,
    is_strict: bool,
) -> io::Result<()> {
    let mut lits = vec![];
    let mut num_clauses = 0;
    let mut num_read_clauses = 0;
    loop {
        skip_whitespace(input)?;
        let ch = next_byte(input)?;
        if ch == Some(b'p') {
            let mut header = [0; 5];
            input.read_exact(&mut header)?;
            if &header != b"p cnf" {
                return parse_error("PARSE ERROR! Unexpected char: p".to_string());
            }
            parse_int(input)?; // number of variables, unused
            num_clauses = parse_int(input)?;
        } else if ch == Some(b'c') {
            skip_line(input)?;
        } else if ch.is_some() {
            read_clause(input, solver, &mut lits)?;
            solver.add_clause_reuse(&mut lits);
            num_read_clauses += 1;
        } else {
            break;
        }
    }
    if is_strict && num_clauses != num_read_clauses {
        return parse_error(
            "PARSE ERROR! DIMACS header mismatch: wrong number of clauses".to_string(),
        );
    }
    Ok(())
}

fn read_clause<S: SolverInterface, R: BufRead>(
    input: &mut R,
    solver: &mut S,
    lits: &mut Vec<Lit>,
) -> io::Result<()> {
    lits.clear();
    loop {
        let parsed_lit = parse_int(input)?;
        if parsed_lit == 0 {
            return Ok(());
        }
        let var = (parsed_lit.abs() - 1) as u32;
        let lit = Lit::new(solver.var_of_int(var), parsed_lit > 0);
        lits.push(lit);
    }
}

fn parse_int<R: BufRead>(input: &mut R) -> io::Result<i32> {
    skip_whitespace(input)?;
    let ch = next_byte(input)?;
    let neg = if ch == Some(b'+') || ch == Some(b'-') {
        input.consume(1);
        ch == Some(b'-')
    } else {
        false
    };
    match next_byte(input)? {
        Some(ch) if ch.is_ascii_digit() => {}
        Some(ch) => {
            return parse_error(format!("PARSE ERROR! Unexpected char: {}", ch as char));
        }
        None => return parse_error("PARSE ERROR! Unexpected EOF".to_string()),
    }
    let mut val = 0;
    while let Some(ch) = next_byte(input)? {
        if !ch.is_ascii_digit() {
            break;
        }
        input.consume(1);
        val = val * 10 + (ch - b'0') as i32;
    }
    if neg {
        Ok(-val)
    } else {
        Ok(val)
    }
}

#[inline(always)]
fn is_whitespace(ch: Option<u8>) -> bool {
    ch.map(|ch| (b'\x09'..=b'\x0d').contains(&ch) || ch == b' ')
        .unwrap_or(false)
}

fn skip_whitespace<R: BufRead>(input: &mut R) -> io::Result<()> {
    while is_whitespace(next_byte(input)?) {
        input.consume(1);
    }
    Ok(())
}

fn skip_line<R: BufRead>(input: &mut R) -> io::Result<()> {
    loop {
        if let Some(ch) = next_byte(input)? {
            input.consume(1);
            if ch == b'\n' {
                return Ok(());
            }
        } else {
            return Ok(());
        }
    }
}

fn next_byte<R: BufRead>(input: &mut R) -> io::Result<Option<u8>> {
    Ok(input.fill_buf()?.first().copied())
}

fn parse_error<T>(message: String) -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::InvalidInput, message))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callbacks::Basic;
    use crate::clause::lbool;
    use crate::core::{Solver, SolverOpts};

    #[test]
    fn test_parse_and_solve() {
        let mut s = Solver::new(SolverOpts::default(), Basic::new());
        let mut input = io::Cursor::new(b"c comment\np cnf 2 2\n1 2 0\n-1 2 0\n");
        parse(&mut input, &mut s, true).unwrap();
        assert_eq!(s.num_vars(), 2);
        assert_eq!(s.solve_limited(&[]), lbool::TRUE);
    }

    #[test]
    fn test_strict_mismatch() {
        let mut s = Solver::new(SolverOpts::default(), Basic::new());
        let mut input = io::Cursor::new(b"p cnf 2 3\n1 2 0\n");
        assert!(parse(&mut input, &mut s, true).is_err());
    }
}
