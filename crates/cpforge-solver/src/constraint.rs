//! Constraints and their posting protocol.

use std::rc::Rc;

use tracing::{debug, info};

use crate::failure::SearchResult;
use crate::solver::{Solver, SolverState};

/// A constraint as seen by the runtime.
///
/// `post` attaches demons to the variables the constraint watches;
/// `initial_propagate` establishes consistency once. Both run with the
/// queue frozen.
pub trait Constraint {
    fn post(&self, solver: &mut Solver) -> SearchResult<()>;

    fn initial_propagate(&self, solver: &mut Solver) -> SearchResult<()>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl Solver {
    /// Adds a constraint to the model.
    ///
    /// Outside search the constraint is buffered until the next root
    /// propagation. During root propagation it is appended to the nested
    /// constraints of the constraint being posted. During search it is posted
    /// and propagated immediately and lives until the current node is
    /// backtracked.
    pub fn add_constraint(&mut self, constraint: Rc<dyn Constraint>) -> SearchResult<()> {
        match self.state {
            SolverState::InSearch => {
                self.search_constraints.alloc(Rc::clone(&constraint));
                self.queue_constraint(constraint)
            }
            SolverState::InRootNode => {
                let parent = if self.constraint_index == self.constraints.len() {
                    self.additional_constraints
                        .get(self.additional_constraint_index)
                        .map_or(self.constraint_index, |(_, parent)| *parent)
                } else {
                    self.constraint_index
                };
                self.additional_constraints.push((constraint, parent));
                Ok(())
            }
            _ => {
                self.constraints.push(constraint);
                Ok(())
            }
        }
    }

    /// Returns the number of constraints added outside search.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Returns the number of constraints added while posting others at the
    /// root node.
    pub fn additional_constraint_count(&self) -> usize {
        self.additional_constraints.len()
    }

    /// Returns the index of the top-level constraint that added the nested
    /// constraint `index`.
    pub fn additional_constraint_parent(&self, index: usize) -> Option<usize> {
        self.additional_constraints.get(index).map(|(_, parent)| *parent)
    }

    /// Freezes the queue, posts and propagates `constraint`, then unfreezes.
    pub(crate) fn post_and_propagate(&mut self, constraint: &Rc<dyn Constraint>) -> SearchResult<()> {
        self.freeze_queue();
        constraint.post(self)?;
        constraint.initial_propagate(self)?;
        self.unfreeze_queue()
    }

    /// Posts every model constraint, then the nested ones they added.
    pub(crate) fn process_constraints(&mut self) -> SearchResult<()> {
        if self.config.disable_solve {
            info!("Forcing early failure");
            return Err(self.fail());
        }
        self.additional_constraints.clear();
        self.additional_constraint_index = 0;

        let count = self.constraints.len();
        self.constraint_index = 0;
        while self.constraint_index < count {
            let constraint = Rc::clone(&self.constraints[self.constraint_index]);
            self.post_and_propagate(&constraint)?;
            self.constraint_index += 1;
        }
        assert_eq!(
            self.constraints.len(),
            count,
            "constraint list changed during root propagation"
        );

        while self.additional_constraint_index < self.additional_constraints.len() {
            let (nested, parent) = {
                let (c, p) = &self.additional_constraints[self.additional_constraint_index];
                (Rc::clone(c), *p)
            };
            debug!(
                constraint = nested.name(),
                parent = self.constraints[parent].name(),
                "posting nested constraint"
            );
            self.post_and_propagate(&nested)?;
            self.additional_constraint_index += 1;
        }
        Ok(())
    }
}
