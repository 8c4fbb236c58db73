//! Decisions and decision builders.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::failure::SearchResult;
use crate::monitor::SearchMonitor;
use crate::solver::Solver;

/// A binary choice: `apply` takes the left branch, `refute` the right one.
pub trait Decision: Debug {
    fn apply(&self, solver: &mut Solver) -> SearchResult<()>;

    fn refute(&self, solver: &mut Solver) -> SearchResult<()>;
}

/// Produces the next decision, or `None` at a leaf.
pub trait DecisionBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>>;

    /// Adds the monitors this builder needs to the search being started.
    fn append_monitors(&self, _solver: &Solver, _extras: &mut Vec<Rc<RefCell<dyn SearchMonitor>>>) {}

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// How the search treats the next decision, as chosen by a branch selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionModification {
    /// Left branch first, right branch on backtrack.
    #[default]
    NoChange,
    /// Right branch first, left branch on backtrack.
    SwitchBranches,
    /// Apply only; no choice point.
    KeepLeft,
    /// Refute only; no choice point.
    KeepRight,
    /// Fail both branches.
    KillBoth,
}

/// Decision whose branches are swapped.
#[derive(Debug)]
pub struct ReverseDecision {
    inner: Rc<dyn Decision>,
}

impl ReverseDecision {
    pub fn new(inner: Rc<dyn Decision>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Rc<dyn Decision> {
        &self.inner
    }
}

impl Decision for ReverseDecision {
    fn apply(&self, solver: &mut Solver) -> SearchResult<()> {
        self.inner.refute(solver)
    }

    fn refute(&self, solver: &mut Solver) -> SearchResult<()> {
        self.inner.apply(solver)
    }
}

/// Decision built from two closures.
pub struct ClosureDecision<A, R> {
    name: String,
    apply: A,
    refute: R,
}

impl<A, R> ClosureDecision<A, R>
where
    A: Fn(&mut Solver) -> SearchResult<()>,
    R: Fn(&mut Solver) -> SearchResult<()>,
{
    pub fn new(name: impl Into<String>, apply: A, refute: R) -> Self {
        Self {
            name: name.into(),
            apply,
            refute,
        }
    }
}

impl<A, R> Decision for ClosureDecision<A, R>
where
    A: Fn(&mut Solver) -> SearchResult<()>,
    R: Fn(&mut Solver) -> SearchResult<()>,
{
    fn apply(&self, solver: &mut Solver) -> SearchResult<()> {
        (self.apply)(solver)
    }

    fn refute(&self, solver: &mut Solver) -> SearchResult<()> {
        (self.refute)(solver)
    }
}

impl<A, R> Debug for ClosureDecision<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decision builder that chains several builders: each one is asked for
/// decisions until it reaches a leaf, then the next one takes over.
pub struct ComposeDecisionBuilder {
    builders: Vec<Rc<dyn DecisionBuilder>>,
}

impl ComposeDecisionBuilder {
    pub fn new(builders: Vec<Rc<dyn DecisionBuilder>>) -> Self {
        Self { builders }
    }
}

impl DecisionBuilder for ComposeDecisionBuilder {
    fn next(&self, solver: &mut Solver) -> SearchResult<Option<Rc<dyn Decision>>> {
        for builder in &self.builders {
            if let Some(decision) = builder.next(solver)? {
                return Ok(Some(decision));
            }
        }
        Ok(None)
    }

    fn append_monitors(&self, solver: &Solver, extras: &mut Vec<Rc<RefCell<dyn SearchMonitor>>>) {
        for builder in &self.builders {
            builder.append_monitors(solver, extras);
        }
    }
}
