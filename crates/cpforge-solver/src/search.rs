//! The search engine: choice points, backtracking and the search state
//! machine.
//!
//! Each [`Solver::new_search`] pushes an `InitialSearch` sentinel on the
//! active search's marker stack. Top-level searches add a `RootNode` sentinel
//! once root propagation succeeds; every decision then pushes a choice point.
//! A failure pops markers back to the newest left-branch choice point, whose
//! decision is refuted next; reaching a sentinel exhausts the search.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, error, info, trace, warn};

use crate::decision::{Decision, DecisionBuilder, DecisionModification, ReverseDecision};
use crate::failure::SearchResult;
use crate::limit::SearchLimit;
use crate::marker::{Branch, MarkerKind, SentinelKind, StateMarker};
use crate::monitor::{monitor, MonitorRef, SearchMonitor, SearchTrace};
use crate::queue::SuspendedQueue;
use crate::solver::{Solver, SolverState};

type MonitorList = SmallVec<[MonitorRef; 8]>;

pub(crate) type BranchSelector = Box<dyn FnMut(&Solver) -> DecisionModification>;

/// One level of search: the top-level search or a nested one.
pub(crate) struct Search {
    pub(crate) markers: Vec<StateMarker>,
    pub(crate) monitors: Vec<MonitorRef>,
    pub(crate) builder: Option<Rc<dyn DecisionBuilder>>,
    pub(crate) solution_counter: u64,
    pub(crate) unchecked_solution_counter: u64,
    pub(crate) sentinel_pushed: u32,
    pub(crate) search_depth: u32,
    pub(crate) left_search_depth: u32,
    pub(crate) created_by_solve: bool,
    pub(crate) backtrack_at_end: bool,
    pub(crate) should_finish: bool,
    pub(crate) should_restart: bool,
    pub(crate) selector: Option<BranchSelector>,
    /// Propagation of the parent search, put back when this one ends.
    pub(crate) parent_queue: Option<SuspendedQueue>,
}

impl Search {
    pub(crate) fn new() -> Self {
        Self {
            markers: Vec::new(),
            monitors: Vec::new(),
            builder: None,
            solution_counter: 0,
            unchecked_solution_counter: 0,
            sentinel_pushed: 0,
            search_depth: 0,
            left_search_depth: 0,
            created_by_solve: false,
            backtrack_at_end: true,
            should_finish: false,
            should_restart: false,
            selector: None,
            parent_queue: None,
        }
    }

    fn clear(&mut self) {
        self.monitors.clear();
        self.builder = None;
        self.search_depth = 0;
        self.left_search_depth = 0;
        self.selector = None;
        self.backtrack_at_end = true;
    }

    fn left_move(&mut self) {
        self.search_depth += 1;
        self.left_search_depth += 1;
    }

    fn right_move(&mut self) {
        self.search_depth += 1;
    }
}

impl Solver {
    /// Starts a search driven by `builder`.
    ///
    /// Called inside a running search, the new search is nested: it explores
    /// below the current node and has its own markers and monitors. Otherwise
    /// the top-level search is reset and root propagation happens on the
    /// first [`next_solution`](Solver::next_solution).
    ///
    /// # Panics
    ///
    /// Panics if called during root propagation.
    pub fn new_search(&mut self, builder: Rc<dyn DecisionBuilder>, monitors: Vec<MonitorRef>) {
        assert_ne!(
            self.state,
            SolverState::InRootNode,
            "cannot start a new search during root propagation"
        );
        let nested = self.state == SolverState::InSearch;
        if nested {
            let mut search = Search::new();
            search.parent_queue = Some(self.queue.suspend());
            self.searches.push(search);
        } else {
            self.backtrack_to_sentinel(SentinelKind::InitialSearch);
            self.state = SolverState::OutsideSearch;
        }

        let mut installed = monitors;
        builder.append_monitors(self, &mut installed);
        if !nested {
            if let Some(limits) = self.config.limits.as_ref().filter(|l| !l.is_unbounded()) {
                installed.push(monitor(SearchLimit::from_config(limits)));
            }
            if self.config.trace_search {
                installed.push(monitor(SearchTrace::with_prefix("######## ")));
            }
        }

        let search = self.active_search_mut();
        search.created_by_solve = false;
        search.monitors = installed;
        self.enter_search();
        self.push_sentinel(SentinelKind::InitialSearch);
        self.active_search_mut().builder = Some(builder);
    }

    /// Explores until the next solution of the active search.
    ///
    /// Returns false when the search space is exhausted, the root node is
    /// infeasible or the search was finished early. For a top-level search
    /// [`state`](Solver::state) tells these cases apart.
    pub fn next_solution(&mut self) -> bool {
        let top_level = self.solve_depth() <= 1;
        let Some(builder) = self.active_search().builder.clone() else {
            warn!("next_solution called without a new_search before");
            return false;
        };
        let mut refute: Option<Rc<dyn Decision>> = None;

        if top_level {
            match self.state {
                SolverState::ProblemInfeasible | SolverState::NoMoreSolutions => return false,
                SolverState::AtSolution => {
                    if self.backtrack_one_level(&mut refute) {
                        self.state = SolverState::NoMoreSolutions;
                        return false;
                    }
                    self.state = SolverState::InSearch;
                }
                SolverState::OutsideSearch => {
                    if !self.propagate_root() {
                        return false;
                    }
                }
                SolverState::InSearch => {}
                SolverState::InRootNode => panic!("next_solution called during root propagation"),
            }
        }

        let found = loop {
            match self.explore(&builder, &mut refute) {
                Ok(()) => break true,
                Err(_) => {
                    self.notify(|m, s| m.begin_fail(s));
                    self.after_failure();
                    let sentinel = if top_level {
                        SentinelKind::RootNode
                    } else {
                        SentinelKind::InitialSearch
                    };
                    let search = self.active_search_mut();
                    if search.should_finish {
                        search.should_finish = false;
                        search.should_restart = false;
                        refute = None;
                        self.backtrack_to_sentinel(sentinel);
                        break false;
                    } else if search.should_restart {
                        search.should_finish = false;
                        search.should_restart = false;
                        refute = None;
                        self.backtrack_to_sentinel(sentinel);
                        self.push_sentinel(sentinel);
                        debug!(depth = self.solve_depth(), "search restarted");
                        self.notify(|m, s| m.restart_search(s));
                    } else if self.backtrack_one_level(&mut refute) {
                        break false;
                    }
                }
            }
        };

        if top_level {
            self.state = if found {
                SolverState::AtSolution
            } else {
                SolverState::NoMoreSolutions
            };
        }
        found
    }

    /// Ends the active search, restoring the state it started from.
    ///
    /// A nested search started by [`solve_and_commit`](Solver::solve_and_commit)
    /// keeps its effects instead: its reversible actions move to the parent
    /// search and its other markers are dropped.
    pub fn end_search(&mut self) {
        if self.active_search().backtrack_at_end {
            self.backtrack_to_sentinel(SentinelKind::InitialSearch);
        } else {
            assert!(
                self.searches.len() > 1,
                "only nested searches can keep their effects"
            );
            if self.active_search().sentinel_pushed > 0 {
                self.jump_to_sentinel_when_nested();
            }
        }
        self.notify(|m, s| m.exit_search(s));

        let search = self.active_search();
        if self.searches.len() == 1 {
            info!(
                solutions = search.solution_counter,
                branches = self.stats.branches,
                failures = self.stats.failures,
                elapsed_ms = self.stats.elapsed().as_millis() as u64,
                "Search ended"
            );
        } else {
            debug!(depth = self.searches.len(), solutions = search.solution_counter, "nested search ended");
        }

        self.active_search_mut().clear();
        if self.searches.len() == 1 {
            self.state = SolverState::OutsideSearch;
        } else if let Some(parent_queue) = self.searches.pop().and_then(|search| search.parent_queue) {
            self.queue.resume(parent_queue);
        }
    }

    /// Runs a complete search and reports whether a solution was found.
    ///
    /// The search stops at the first solution unless a monitor asks to
    /// continue from [`SearchMonitor::at_solution`]. All changes are undone
    /// on return.
    pub fn solve(&mut self, builder: Rc<dyn DecisionBuilder>, monitors: Vec<MonitorRef>) -> bool {
        self.new_search(builder, monitors);
        self.active_search_mut().created_by_solve = true;
        self.next_solution();
        let found = self.active_search().solution_counter > 0;
        self.end_search();
        found
    }

    /// Runs a nested search and keeps the state of the solution it found.
    ///
    /// # Panics
    ///
    /// Panics if no search is running.
    pub fn solve_and_commit(&mut self, builder: Rc<dyn DecisionBuilder>, monitors: Vec<MonitorRef>) -> bool {
        assert_eq!(
            self.state,
            SolverState::InSearch,
            "solve_and_commit can only run inside a search"
        );
        self.new_search(builder, monitors);
        let search = self.active_search_mut();
        search.created_by_solve = true;
        search.backtrack_at_end = false;
        self.next_solution();
        let found = self.active_search().solution_counter > 0;
        self.end_search();
        found
    }

    /// Restarts the active search from its root.
    ///
    /// # Panics
    ///
    /// Panics if the active search has not started.
    pub fn restart_search(&mut self) {
        assert_ne!(self.active_search().sentinel_pushed, 0, "restart of a search that has not started");
        if self.solve_depth() == 1 {
            if self.active_search().sentinel_pushed > 1 {
                self.backtrack_to_sentinel(SentinelKind::RootNode);
            }
            assert_eq!(self.active_search().sentinel_pushed, 1);
            self.push_sentinel(SentinelKind::RootNode);
            self.state = SolverState::InSearch;
        } else {
            assert_eq!(self.state, SolverState::InSearch);
            if self.active_search().sentinel_pushed > 0 {
                self.backtrack_to_sentinel(SentinelKind::InitialSearch);
            }
            assert_eq!(self.active_search().sentinel_pushed, 0);
            self.push_sentinel(SentinelKind::InitialSearch);
        }
        self.notify(|m, s| m.restart_search(s));
    }

    /// Asks the active search to restart from its root at the next failure.
    pub fn restart_current_search(&mut self) {
        self.active_search_mut().should_restart = true;
    }

    /// Asks the active search to stop at the next failure.
    pub fn finish_current_search(&mut self) {
        self.active_search_mut().should_finish = true;
    }

    /// Installs a selector deciding how each following decision of the
    /// active search is explored. It is removed when the search backtracks
    /// past this point.
    pub fn set_branch_selector(&mut self, selector: impl FnMut(&Solver) -> DecisionModification + 'static) {
        let solve_depth = self.solve_depth();
        self.add_backtrack_action(
            move |s| {
                if s.solve_depth() == solve_depth {
                    s.active_search_mut().selector = None;
                }
            },
            false,
        );
        self.active_search_mut().selector = Some(Box::new(selector));
    }

    /// Returns true if the active search was started by `solve` or
    /// `solve_and_commit`.
    pub fn currently_in_solve(&self) -> bool {
        self.active_search().created_by_solve
    }

    /// Polls the periodic checks of the top-level search's monitors.
    ///
    /// Called at every decision boundary of any search and every
    /// `test_period` demon runs.
    pub fn top_periodic_check(&mut self) -> SearchResult<()> {
        let monitors: MonitorList = self.searches[0].monitors.iter().cloned().collect();
        for m in monitors {
            if let Ok(mut guard) = m.try_borrow_mut() {
                guard.periodic_check(self)?;
            }
        }
        Ok(())
    }

    /// Best progress estimate of the top-level search's monitors.
    pub fn top_progress_percent(&self) -> Option<u32> {
        self.searches[0]
            .monitors
            .iter()
            .filter_map(|m| m.try_borrow().ok().and_then(|g| g.progress_percent(self)))
            .max()
    }

    fn propagate_root(&mut self) -> bool {
        self.state = SolverState::InRootNode;
        self.notify(|m, s| m.begin_initial_propagation(s));
        let root = self
            .process_constraints()
            .and_then(|()| self.notify_fallible(|m, s| m.end_initial_propagation(s)));
        match root {
            Ok(()) => {
                self.push_sentinel(SentinelKind::RootNode);
                self.state = SolverState::InSearch;
                true
            }
            Err(_) => {
                self.notify(|m, s| m.begin_fail(s));
                self.after_failure();
                self.backtrack_to_sentinel(SentinelKind::InitialSearch);
                self.state = SolverState::ProblemInfeasible;
                debug!(failures = self.stats.failures, "root propagation failed");
                false
            }
        }
    }

    /// Explores from the current node to the next leaf. `Ok` means a
    /// solution to hand back to the caller.
    fn explore(
        &mut self,
        builder: &Rc<dyn DecisionBuilder>,
        refute: &mut Option<Rc<dyn Decision>>,
    ) -> SearchResult<()> {
        if let Some(d) = refute.take() {
            let (depth, left_depth) = self.depths();
            self.push_marker(MarkerKind::ChoicePoint {
                decision: Rc::clone(&d),
                branch: Branch::Right,
                depth,
                left_depth,
            });
            self.notify_fallible(|m, s| m.refute_decision(s, d.as_ref()))?;
            trace!(decision = ?d, depth, "refute");
            self.stats.record_branch();
            d.refute(self)?;
            self.notify_fallible(|m, s| m.after_decision(s, d.as_ref(), false))?;
            self.active_search_mut().right_move();
        }

        let db = builder.as_ref();
        loop {
            self.top_periodic_check()?;
            self.notify_fallible(|m, s| m.begin_next_decision(s, db))?;
            let next = db.next(self)?;
            self.notify_fallible(|m, s| m.end_next_decision(s, db, next.as_deref()))?;
            let Some(decision) = next else {
                break;
            };

            let modification = self.modify_decision();
            let d: Rc<dyn Decision> = if modification == DecisionModification::SwitchBranches {
                Rc::new(ReverseDecision::new(decision))
            } else {
                decision
            };
            match modification {
                DecisionModification::NoChange | DecisionModification::SwitchBranches => {
                    self.stats.record_decision();
                    let (depth, left_depth) = self.depths();
                    self.push_marker(MarkerKind::ChoicePoint {
                        decision: Rc::clone(&d),
                        branch: Branch::Left,
                        depth,
                        left_depth,
                    });
                    self.notify_fallible(|m, s| m.apply_decision(s, d.as_ref()))?;
                    trace!(decision = ?d, depth, "apply");
                    self.stats.record_branch();
                    d.apply(self)?;
                    self.notify_fallible(|m, s| m.after_decision(s, d.as_ref(), true))?;
                    self.active_search_mut().left_move();
                }
                DecisionModification::KeepLeft => {
                    self.notify_fallible(|m, s| m.apply_decision(s, d.as_ref()))?;
                    d.apply(self)?;
                    self.notify_fallible(|m, s| m.after_decision(s, d.as_ref(), true))?;
                }
                DecisionModification::KeepRight => {
                    self.notify_fallible(|m, s| m.refute_decision(s, d.as_ref()))?;
                    d.refute(self)?;
                    self.notify_fallible(|m, s| m.after_decision(s, d.as_ref(), false))?;
                }
                DecisionModification::KillBoth => return Err(self.fail()),
            }
        }

        self.active_search_mut().unchecked_solution_counter += 1;
        if self.accept_solution() {
            self.active_search_mut().solution_counter += 1;
            self.stats.record_solution();
            debug!(
                depth = self.solve_depth(),
                branches = self.stats.branches,
                failures = self.stats.failures,
                "solution found"
            );
            if !self.at_solution() || !self.currently_in_solve() {
                return Ok(());
            }
        }
        Err(self.fail())
    }

    fn modify_decision(&mut self) -> DecisionModification {
        let index = self.searches.len() - 1;
        let Some(mut selector) = self.searches[index].selector.take() else {
            return DecisionModification::NoChange;
        };
        let modification = selector(self);
        if self.searches[index].selector.is_none() {
            self.searches[index].selector = Some(selector);
        }
        modification
    }

    /// Pops markers up to the newest left-branch choice point, whose
    /// decision is stored in `refute`. Returns true if a sentinel was reached
    /// instead.
    fn backtrack_one_level(&mut self, refute: &mut Option<Rc<dyn Decision>>) -> bool {
        let mut no_more_solutions = false;
        loop {
            match self.pop_marker() {
                MarkerKind::Sentinel(kind) => {
                    let depth = self.solve_depth();
                    assert!(
                        (kind == SentinelKind::RootNode && depth == 1)
                            || (kind == SentinelKind::InitialSearch && depth > 1),
                        "wrong sentinel {kind:?} found at solve depth {depth}"
                    );
                    self.active_search_mut().sentinel_pushed -= 1;
                    no_more_solutions = true;
                    break;
                }
                MarkerKind::SimpleMarker => {
                    error!("simple markers should not be encountered during search");
                }
                MarkerKind::ChoicePoint {
                    decision,
                    branch,
                    depth,
                    left_depth,
                } => {
                    if branch == Branch::Left {
                        *refute = Some(decision);
                        let search = self.active_search_mut();
                        search.search_depth = depth;
                        search.left_search_depth = left_depth;
                        break;
                    }
                }
                MarkerKind::ReversibleAction { action, .. } => action(self),
            }
        }
        self.notify(|m, s| m.end_fail(s));
        self.fail_stamp += 1;
        if no_more_solutions {
            self.notify(|m, s| m.no_more_solutions(s));
        }
        no_more_solutions
    }

    /// Pops markers of the active search until the sentinel of `target`
    /// kind, running reversible actions on the way.
    pub(crate) fn backtrack_to_sentinel(&mut self, target: SentinelKind) {
        let skip = target != SentinelKind::SolverCtor && self.active_search().sentinel_pushed == 0;
        while !skip && !self.active_search().markers.is_empty() {
            match self.pop_marker() {
                MarkerKind::Sentinel(kind) => {
                    let search = self.active_search_mut();
                    if kind != SentinelKind::SolverCtor {
                        assert!(search.sentinel_pushed > 0, "sentinel count out of sync");
                        search.sentinel_pushed -= 1;
                    }
                    search.search_depth = 0;
                    search.left_search_depth = 0;
                    if kind == target {
                        break;
                    }
                }
                MarkerKind::ReversibleAction { action, .. } => action(self),
                MarkerKind::SimpleMarker | MarkerKind::ChoicePoint { .. } => {}
            }
        }
        self.fail_stamp += 1;
    }

    pub(crate) fn push_sentinel(&mut self, kind: SentinelKind) {
        self.push_marker(MarkerKind::Sentinel(kind));
        if kind != SentinelKind::SolverCtor {
            self.active_search_mut().sentinel_pushed += 1;
        }
    }

    /// Moves the reversible actions of the nested search to its parent and
    /// drops its other markers, keeping every change made below.
    fn jump_to_sentinel_when_nested(&mut self) {
        assert!(self.solve_depth() > 1, "jump to sentinel from the top-level search");
        let Some(mut child) = self.searches.pop() else {
            unreachable!("solve depth above one implies a nested search");
        };
        let mut found = false;
        for (position, marker) in child.markers.drain(..).enumerate() {
            match marker.kind {
                MarkerKind::ReversibleAction { .. } => self.active_search_mut().markers.push(marker),
                MarkerKind::Sentinel(_) => {
                    assert_eq!(position, 0, "sentinel found above the bottom of a nested search");
                    found = true;
                }
                MarkerKind::SimpleMarker | MarkerKind::ChoicePoint { .. } => {}
            }
        }
        assert!(found, "sentinel not found in nested search");
        child.sentinel_pushed = 0;
        child.search_depth = 0;
        child.left_search_depth = 0;
        self.searches.push(child);
    }

    fn enter_search(&mut self) {
        let depth = self.searches.len();
        let search = self.active_search_mut();
        search.solution_counter = 0;
        search.unchecked_solution_counter = 0;
        let monitors = search.monitors.len();
        if depth == 1 {
            info!(monitors, constraints = self.constraints.len(), "Search started");
        } else {
            debug!(depth, "nested search started");
        }
        self.notify(|m, s| m.enter_search(s));
    }

    fn depths(&self) -> (u32, u32) {
        let search = self.active_search();
        (search.search_depth, search.left_search_depth)
    }

    fn active_monitors(&self) -> MonitorList {
        self.active_search().monitors.iter().cloned().collect()
    }

    /// Calls `f` on every monitor of the active search. Monitors already
    /// borrowed further up the stack are skipped.
    pub(crate) fn notify(&mut self, mut f: impl FnMut(&mut (dyn SearchMonitor + 'static), &mut Solver)) {
        for m in self.active_monitors() {
            if let Ok(mut guard) = m.try_borrow_mut() {
                f(&mut *guard, self);
            }
        }
    }

    /// Like [`notify`](Solver::notify) but stops at the first failure.
    pub(crate) fn notify_fallible(
        &mut self,
        mut f: impl FnMut(&mut (dyn SearchMonitor + 'static), &mut Solver) -> SearchResult<()>,
    ) -> SearchResult<()> {
        for m in self.active_monitors() {
            if let Ok(mut guard) = m.try_borrow_mut() {
                f(&mut *guard, self)?;
            }
        }
        Ok(())
    }

    fn accept_solution(&mut self) -> bool {
        let mut valid = true;
        self.notify(|m, s| {
            if !m.accept_solution(s) {
                valid = false;
            }
        });
        valid
    }

    fn at_solution(&mut self) -> bool {
        let mut should_continue = false;
        self.notify(|m, s| {
            if m.at_solution(s) {
                should_continue = true;
            }
        });
        should_continue
    }
}
