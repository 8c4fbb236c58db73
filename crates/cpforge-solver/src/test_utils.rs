//! Test utilities for cpforge-solver.
//!
//! A binary model: `n` cells starting unbound (-1), each branched to 0 on
//! the left and 1 on the right. A full search enumerates the `2^n` leaves in
//! lexicographic order.

use std::fmt;
use std::rc::Rc;

use cpforge_core::Rev;

use crate::decision::{Decision, DecisionBuilder};
use crate::failure::SearchResult;
use crate::solver::Solver;

pub const UNBOUND: i64 = -1;

type Reject = Box<dyn Fn(&[i64]) -> bool>;

/// Sets one cell to 0 (left) or 1 (right).
pub struct SetBit {
    pub var: Rev<i64>,
    pub position: usize,
}

impl fmt::Debug for SetBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{} in {{0, 1}}", self.position)
    }
}

impl Decision for SetBit {
    fn apply(&self, solver: &mut Solver) -> SearchResult<()> {
        solver.set_value(self.var, 0);
        Ok(())
    }

    fn refute(&self, solver: &mut Solver) -> SearchResult<()> {
        solver.set_value(self.var, 1);
        Ok(())
    }
}

/// Branches on the first unbound cell. Fails nodes whose bound prefix
/// matches `reject`.
pub struct BinaryBuilder {
    pub vars: Vec<Rev<i64>>,
    reject: Option<Reject>,
}

impl BinaryBuilder {
    pub fn new(vars: Vec<Rev<i64>>) -> Self {
        Self { vars, reject: None }
    }

    pub fn rejecting(vars: Vec<Rev<i64>>, reject: impl Fn(&[i64]) -> bool + 'static) -> Self {
        Self {
            vars,
            reject: Some(Box::new(reject)),
        }
    }
}

impl DecisionBuilder for BinaryBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        let values = values(solver, &self.vars);
        if let Some(reject) = &self.reject {
            if reject(&values) {
                return Err(solver.fail());
            }
        }
        Ok(values.iter().position(|&v| v == UNBOUND).map(|position| {
            Rc::new(SetBit {
                var: self.vars[position],
                position,
            }) as Rc<dyn Decision>
        }))
    }
}

/// Creates `n` unbound cells.
pub fn binary_vars(solver: &mut Solver, n: usize) -> Vec<Rev<i64>> {
    (0..n).map(|_| solver.make_rev(UNBOUND)).collect()
}

pub fn values(solver: &Solver, vars: &[Rev<i64>]) -> Vec<i64> {
    vars.iter().map(|v| solver.value(*v)).collect()
}
