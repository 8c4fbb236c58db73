//! Constraints over [`IntVar`]s.

use std::rc::Rc;

use cpforge_solver::{Constraint, DemonPriority, SearchResult, Solver};

use crate::intvar::IntVar;

/// `x != y + offset`.
pub struct NotEqual {
    x: IntVar,
    y: IntVar,
    offset: i64,
}

impl NotEqual {
    pub fn new(x: IntVar, y: IntVar, offset: i64) -> Self {
        Self { x, y, offset }
    }

    fn propagate(x: &IntVar, y: &IntVar, offset: i64, solver: &mut Solver) -> SearchResult<()> {
        if let Some(v) = x.value(solver) {
            y.remove_value(solver, v - offset)?;
        }
        if let Some(v) = y.value(solver) {
            x.remove_value(solver, v + offset)?;
        }
        Ok(())
    }
}

impl Constraint for NotEqual {
    fn post(&self, solver: &mut Solver) -> SearchResult<()> {
        let (x, y, offset) = (self.x.clone(), self.y.clone(), self.offset);
        let demon = solver.make_closure_demon("not_equal", DemonPriority::Var, move |s| {
            Self::propagate(&x, &y, offset, s)
        });
        self.x.when_domain(solver, demon);
        self.y.when_domain(solver, demon);
        Ok(())
    }

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()> {
        Self::propagate(&self.x, &self.y, self.offset, solver)
    }

    fn name(&self) -> &str {
        "NotEqual"
    }
}

/// All variables take pairwise different values.
///
/// Removes the value of every bound variable from the others.
pub struct AllDifferent {
    vars: Vec<IntVar>,
}

impl AllDifferent {
    pub fn new(vars: Vec<IntVar>) -> Self {
        Self { vars }
    }

    fn propagate_from(vars: &[IntVar], index: usize, solver: &mut Solver) -> SearchResult<()> {
        let Some(value) = vars[index].value(solver) else {
            return Ok(());
        };
        for (j, other) in vars.iter().enumerate() {
            if j != index {
                other.remove_value(solver, value)?;
            }
        }
        Ok(())
    }
}

impl Constraint for AllDifferent {
    fn post(&self, solver: &mut Solver) -> SearchResult<()> {
        let vars: Rc<[IntVar]> = self.vars.clone().into();
        for (i, var) in self.vars.iter().enumerate() {
            let vars = Rc::clone(&vars);
            let demon = solver.make_closure_demon(format!("all_different[{i}]"), DemonPriority::Var, move |s| {
                Self::propagate_from(&vars, i, s)
            });
            var.when_domain(solver, demon);
        }
        Ok(())
    }

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()> {
        for i in 0..self.vars.len() {
            Self::propagate_from(&self.vars, i, solver)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "AllDifferent"
    }
}

/// `x < y`, propagated on bounds from a delayed demon.
pub struct LessThan {
    x: IntVar,
    y: IntVar,
}

impl LessThan {
    pub fn new(x: IntVar, y: IntVar) -> Self {
        Self { x, y }
    }

    fn propagate(x: &IntVar, y: &IntVar, solver: &mut Solver) -> SearchResult<()> {
        y.set_min(solver, x.min(solver) + 1)?;
        x.set_max(solver, y.max(solver) - 1)
    }
}

impl Constraint for LessThan {
    fn post(&self, solver: &mut Solver) -> SearchResult<()> {
        let (x, y) = (self.x.clone(), self.y.clone());
        let demon = solver.make_closure_demon("less_than", DemonPriority::Delayed, move |s| {
            Self::propagate(&x, &y, s)
        });
        self.x.when_domain(solver, demon);
        self.y.when_domain(solver, demon);
        Ok(())
    }

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()> {
        Self::propagate(&self.x, &self.y, solver)
    }

    fn name(&self) -> &str {
        "LessThan"
    }
}
