//! N-Queens model.
//!
//! One variable per column holds the row of its queen. Rows differ through
//! [`AllDifferent`]; diagonals through pairwise [`NotEqual`] with offsets.

use std::rc::Rc;

use cpforge_solver::{SearchResult, Solver};

use crate::constraints::{AllDifferent, NotEqual};
use crate::intvar::IntVar;

/// Number of solutions of the N-Queens problem for `n` in `1..=10`.
pub const SOLUTION_COUNTS: [u64; 10] = [1, 0, 0, 2, 10, 4, 40, 92, 352, 724];

/// Adds the N-Queens model to `solver` and returns the queen variables.
///
/// Built outside search the constraints are only buffered, so this cannot
/// fail; inside search they propagate immediately and may.
///
/// # Panics
///
/// Panics if `n` is zero or above 64.
pub fn nqueens_model(solver: &mut Solver, n: usize) -> SearchResult<Vec<IntVar>> {
    assert!(n > 0 && n <= 64, "board size must be within 1..=64");
    let max_row = n as i64 - 1;
    let queens: Vec<IntVar> = (0..n)
        .map(|i| IntVar::new(solver, format!("q{i}"), 0, max_row))
        .collect();

    solver.add_constraint(Rc::new(AllDifferent::new(queens.clone())))?;
    for i in 0..n {
        for j in i + 1..n {
            let distance = (j - i) as i64;
            for offset in [distance, -distance] {
                solver.add_constraint(Rc::new(NotEqual::new(queens[i].clone(), queens[j].clone(), offset)))?;
            }
        }
    }
    Ok(queens)
}

/// Returns true if `rows` places no two queens on the same row or diagonal.
pub fn is_valid_placement(rows: &[i64]) -> bool {
    rows.iter().enumerate().all(|(i, &ri)| {
        rows.iter().enumerate().skip(i + 1).all(|(j, &rj)| {
            let distance = (j - i) as i64;
            ri != rj && (ri - rj).abs() != distance
        })
    })
}
