//! State markers: the entries of a search's backtrack stack.
//!
//! Every marker except a fast reversible action records a [`ScopeMark`]; popping
//! the marker restores the trail to it and releases everything allocated in
//! the scope.

use std::fmt;
use std::rc::Rc;

use cpforge_core::TrailMark;

use crate::decision::Decision;
use crate::solver::Solver;

/// Which sentinel a marker is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    /// Pushed once by the solver constructor.
    SolverCtor,
    /// Pushed when a search starts.
    InitialSearch,
    /// Pushed after root propagation of a top-level search.
    RootNode,
}

/// Which branch of a choice point is being explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Left,
    Right,
}

/// Kind of a marker, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    Sentinel,
    SimpleMarker,
    ChoicePoint,
    ReversibleAction,
}

pub(crate) type BacktrackAction = Box<dyn FnOnce(&mut Solver)>;

pub(crate) enum MarkerKind {
    Sentinel(SentinelKind),
    SimpleMarker,
    ChoicePoint {
        decision: Rc<dyn Decision>,
        branch: Branch,
        depth: u32,
        left_depth: u32,
    },
    ReversibleAction {
        action: BacktrackAction,
        fast: bool,
    },
}

impl MarkerKind {
    pub(crate) fn marker_type(&self) -> MarkerType {
        match self {
            Self::Sentinel(_) => MarkerType::Sentinel,
            Self::SimpleMarker => MarkerType::SimpleMarker,
            Self::ChoicePoint { .. } => MarkerType::ChoicePoint,
            Self::ReversibleAction { .. } => MarkerType::ReversibleAction,
        }
    }
}

impl fmt::Debug for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentinel(kind) => f.debug_tuple("Sentinel").field(kind).finish(),
            Self::SimpleMarker => f.write_str("SimpleMarker"),
            Self::ChoicePoint {
                decision,
                branch,
                depth,
                left_depth,
            } => f
                .debug_struct("ChoicePoint")
                .field("decision", decision)
                .field("branch", branch)
                .field("depth", depth)
                .field("left_depth", left_depth)
                .finish(),
            Self::ReversibleAction { fast, .. } => {
                f.debug_struct("ReversibleAction").field("fast", fast).finish()
            }
        }
    }
}

/// Everything a marker needs to undo its scope.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeMark {
    pub(crate) trail: TrailMark,
    pub(crate) demons: usize,
    pub(crate) constraints: usize,
}

#[derive(Debug)]
pub(crate) struct StateMarker {
    pub(crate) kind: MarkerKind,
    pub(crate) mark: Option<ScopeMark>,
}

impl Solver {
    /// Pushes a simple marker, opening a scope closed by [`pop_state`].
    ///
    /// [`pop_state`]: Solver::pop_state
    pub fn push_state(&mut self) {
        self.push_marker(MarkerKind::SimpleMarker);
    }

    /// Pops the simple marker pushed by the matching [`push_state`],
    /// restoring every reversible change made since.
    ///
    /// # Panics
    ///
    /// Panics if the marker on top of the stack is not a simple marker.
    ///
    /// [`push_state`]: Solver::push_state
    pub fn pop_state(&mut self) {
        let top = self.active_search().markers.last().map(|m| m.kind.marker_type());
        assert_eq!(
            top,
            Some(MarkerType::SimpleMarker),
            "pop_state must match a push_state"
        );
        self.pop_marker();
    }

    /// Registers an action run when the search backtracks past this point.
    ///
    /// A `fast` action records no trail mark: popping it runs the action
    /// without restoring anything.
    pub fn add_backtrack_action(&mut self, action: impl FnOnce(&mut Solver) + 'static, fast: bool) {
        self.push_marker(MarkerKind::ReversibleAction {
            action: Box::new(action),
            fast,
        });
    }

    /// Returns the number of markers on the active search's stack.
    pub fn marker_count(&self) -> usize {
        self.active_search().markers.len()
    }

    /// Returns the type of the marker on top of the active search's stack.
    pub fn top_marker(&self) -> Option<MarkerType> {
        self.active_search().markers.last().map(|m| m.kind.marker_type())
    }

    pub(crate) fn push_marker(&mut self, kind: MarkerKind) {
        let fast = matches!(kind, MarkerKind::ReversibleAction { fast: true, .. });
        let mark = (!fast).then(|| self.scope_mark());
        self.active_search_mut().markers.push(StateMarker { kind, mark });
        self.queue.increase_stamp();
    }

    /// Pops the top marker, restores its scope and returns its payload.
    pub(crate) fn pop_marker(&mut self) -> MarkerKind {
        let Some(marker) = self.active_search_mut().markers.pop() else {
            panic!("pop on an empty marker stack");
        };
        if let Some(mark) = marker.mark {
            self.restore_scope(&mark);
        }
        self.queue.increase_stamp();
        marker.kind
    }

    fn scope_mark(&self) -> ScopeMark {
        ScopeMark {
            trail: self.trail.mark(&self.store),
            demons: self.demons.len(),
            constraints: self.search_constraints.len(),
        }
    }

    fn restore_scope(&mut self, mark: &ScopeMark) {
        self.trail.backtrack_to(&mark.trail, &mut self.store);
        self.search_constraints.truncate(mark.constraints);
        self.demons.truncate(mark.demons);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_push_pop_restores_values() {
        let mut solver = Solver::new();
        let x = solver.make_rev(1i64);
        solver.push_state();
        solver.set_value(x, 5);
        solver.push_state();
        solver.set_value(x, 9);
        solver.pop_state();
        assert_eq!(solver.value(x), 5);
        solver.pop_state();
        assert_eq!(solver.value(x), 1);
    }

    #[test]
    fn test_backtrack_actions_run_lifo() {
        let mut solver = Solver::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        solver.push_state();
        for i in 0..3 {
            let l = Rc::clone(&log);
            solver.add_backtrack_action(move |_| l.borrow_mut().push(i), i % 2 == 0);
        }
        assert_eq!(solver.top_marker(), Some(MarkerType::ReversibleAction));
        while solver.top_marker() == Some(MarkerType::ReversibleAction) {
            if let MarkerKind::ReversibleAction { action, .. } = solver.pop_marker() {
                action(&mut solver);
            }
        }
        solver.pop_state();
        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn test_fast_action_does_not_restore() {
        let mut solver = Solver::new();
        let x = solver.make_rev(0i32);
        solver.add_backtrack_action(|_| {}, true);
        solver.set_value(x, 4);
        solver.pop_marker();
        assert_eq!(solver.value(x), 4);
    }

    #[test]
    fn test_demons_registered_in_scope_are_released() {
        let mut solver = Solver::new();
        let outer = solver.make_closure_demon("outer", Default::default(), |_| Ok(()));
        solver.push_state();
        let inner = solver.make_closure_demon("inner", Default::default(), |_| Ok(()));
        assert_eq!(solver.demon_count(), 2);
        solver.pop_state();
        assert_eq!(solver.demon_count(), 1);
        assert!(solver.is_demon_alive(outer));
        assert!(!solver.is_demon_alive(inner));
    }

    #[test]
    fn test_rev_alloc_released_with_scope() {
        let mut solver = Solver::new();
        solver.push_state();
        let table = solver.rev_alloc_array(vec![1u8, 2, 3]);
        assert_eq!(solver.rev_get(table).map(Vec::len), Some(3));
        solver.pop_state();
        assert!(solver.rev_get(table).is_none());
    }

    #[test]
    fn test_stamp_moves_on_push_and_pop() {
        let mut solver = Solver::new();
        let before = solver.stamp();
        solver.push_state();
        assert_eq!(solver.stamp(), before + 1);
        solver.pop_state();
        assert_eq!(solver.stamp(), before + 2);
    }

    #[test]
    #[should_panic(expected = "pop_state must match a push_state")]
    fn test_pop_state_rejects_other_markers() {
        let mut solver = Solver::new();
        solver.push_state();
        solver.add_backtrack_action(|_| {}, false);
        solver.pop_state();
    }

    #[test]
    #[should_panic(expected = "pop_state must match a push_state")]
    fn test_pop_state_rejects_ctor_sentinel() {
        let mut solver = Solver::new();
        solver.pop_state();
    }
}
