//! Demons: propagation callbacks scheduled by the queue.

use std::fmt;
use std::rc::Rc;

use cpforge_core::ArenaId;

use crate::failure::SearchResult;
use crate::solver::Solver;

/// Scheduling class of a demon.
///
/// `Var` demons run before `Delayed` ones. `Normal` demons are executed
/// immediately by [`Solver::execute`] and are queued as `Var` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DemonPriority {
    Var,
    #[default]
    Normal,
    Delayed,
}

impl DemonPriority {
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Var => 0,
            Self::Normal => 1,
            Self::Delayed => 2,
        }
    }
}

/// A propagation callback.
///
/// Demons are shared handles; a constraint typically keeps the [`DemonId`]
/// returned by [`Solver::register_demon`] and attaches it to the variables it
/// watches.
pub trait Demon {
    /// Runs the propagation step.
    fn run(&self, solver: &mut Solver) -> SearchResult<()>;

    fn priority(&self) -> DemonPriority {
        DemonPriority::Normal
    }

    /// Name used in traces and propagation profiles.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handle to a demon registered on a solver.
///
/// Demons registered during search are released on backtrack; a stale id is
/// ignored by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DemonId(pub(crate) ArenaId);

/// Demon wrapping a closure.
pub struct ClosureDemon<F> {
    name: String,
    priority: DemonPriority,
    run: F,
}

impl<F> ClosureDemon<F>
where
    F: Fn(&mut Solver) -> SearchResult<()>,
{
    pub fn new(name: impl Into<String>, priority: DemonPriority, run: F) -> Self {
        Self {
            name: name.into(),
            priority,
            run,
        }
    }
}

impl<F> Demon for ClosureDemon<F>
where
    F: Fn(&mut Solver) -> SearchResult<()>,
{
    fn run(&self, solver: &mut Solver) -> SearchResult<()> {
        (self.run)(solver)
    }

    fn priority(&self) -> DemonPriority {
        self.priority
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for ClosureDemon<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureDemon")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Arena entry: the demon plus its queue bookkeeping.
pub(crate) struct DemonEntry {
    pub(crate) demon: Rc<dyn Demon>,
    pub(crate) priority: DemonPriority,
    pub(crate) stamp: u64,
}

impl DemonEntry {
    pub(crate) fn new(demon: Rc<dyn Demon>) -> Self {
        let priority = demon.priority();
        Self {
            demon,
            priority,
            stamp: 0,
        }
    }
}
