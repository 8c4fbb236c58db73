//! The solver: owner of the trail, the propagation queue and the searches.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use cpforge_config::{SolverConfig, TrailCompression};
use cpforge_core::{
    CpForgeError, Rev, RevAlloc, RevStore, RevValue, ScopedArena, Trail, TrailPacker, ZlibPacker,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::constraint::Constraint;
use crate::demon::{ClosureDemon, Demon, DemonEntry, DemonId, DemonPriority};
use crate::failure::{Failure, SearchResult};
use crate::marker::SentinelKind;
use crate::queue::Queue;
use crate::search::Search;
use crate::stats::{SolverStatistics, SolverStats};

/// Where the solver stands in the search life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// No search is running.
    OutsideSearch,
    /// Constraints are being posted and propagated at the root.
    InRootNode,
    /// A search is exploring.
    InSearch,
    /// The last `next_solution` returned a solution.
    AtSolution,
    /// The search space is exhausted.
    NoMoreSolutions,
    /// Root propagation failed.
    ProblemInfeasible,
}

/// A constraint-programming solver.
///
/// The solver owns every piece of reversible state. Model code creates
/// reversible cells and demons through it, adds constraints, then drives a
/// search with a [`DecisionBuilder`](crate::DecisionBuilder).
///
/// # Example
///
/// ```
/// use cpforge_solver::Solver;
///
/// let mut solver = Solver::new();
/// let x = solver.make_rev(3i64);
/// solver.push_state();
/// solver.set_value(x, 10);
/// solver.pop_state();
/// assert_eq!(solver.value(x), 3);
/// ```
pub struct Solver {
    pub(crate) config: SolverConfig,
    pub(crate) state: SolverState,
    pub(crate) trail: Trail,
    pub(crate) store: RevStore,
    pub(crate) demons: ScopedArena<DemonEntry>,
    pub(crate) queue: Queue,
    pub(crate) searches: Vec<Search>,
    pub(crate) constraints: Vec<Rc<dyn Constraint>>,
    pub(crate) additional_constraints: Vec<(Rc<dyn Constraint>, usize)>,
    pub(crate) constraint_index: usize,
    pub(crate) additional_constraint_index: usize,
    pub(crate) search_constraints: ScopedArena<Rc<dyn Constraint>>,
    pub(crate) stats: SolverStats,
    pub(crate) fail_stamp: u64,
    rng: ChaCha8Rng,
    demon_profile: BTreeMap<String, u64>,
}

impl Solver {
    /// Creates a solver with the default configuration.
    pub fn new() -> Self {
        Self::build(SolverConfig::default())
    }

    /// Creates a solver from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CpForgeError::Config`] if the configuration is invalid.
    pub fn with_config(config: SolverConfig) -> cpforge_core::Result<Self> {
        config
            .validate()
            .map_err(|e| CpForgeError::Config(e.to_string()))?;
        Ok(Self::build(config))
    }

    fn build(config: SolverConfig) -> Self {
        let trail = match config.compress_trail {
            TrailCompression::NoCompression => Trail::new(config.trail_block_size),
            TrailCompression::CompressWithZlib => Trail::with_packer(config.trail_block_size, || {
                Box::new(ZlibPacker::default()) as Box<dyn TrailPacker>
            }),
        };
        let rng = match config.random_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        let mut stats = SolverStats::default();
        stats.start();
        debug!(
            compression = ?config.compress_trail,
            block_size = config.trail_block_size,
            test_period = config.test_period,
            "solver created"
        );

        let mut solver = Self {
            config,
            state: SolverState::OutsideSearch,
            trail,
            store: RevStore::new(),
            demons: ScopedArena::new(),
            queue: Queue::new(),
            searches: vec![Search::new()],
            constraints: Vec::new(),
            additional_constraints: Vec::new(),
            constraint_index: 0,
            additional_constraint_index: 0,
            search_constraints: ScopedArena::new(),
            stats,
            fail_stamp: 0,
            rng,
            demon_profile: BTreeMap::new(),
        };
        solver.push_sentinel(SentinelKind::SolverCtor);
        solver
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Signals that the current node is infeasible.
    ///
    /// Callers return the failure as `Err` and let `?` carry it to the
    /// search loop.
    ///
    /// # Panics
    ///
    /// Panics if no search is running.
    pub fn fail(&mut self) -> Failure {
        assert!(self.solve_depth() > 0, "fail called outside of a search");
        self.stats.record_failure();
        Failure::new()
    }

    // ---- demons ----

    /// Registers a demon. It lives until the enclosing marker is popped.
    pub fn register_demon(&mut self, demon: Rc<dyn Demon>) -> DemonId {
        DemonId(self.demons.alloc(DemonEntry::new(demon)))
    }

    /// Registers a demon running `run`.
    pub fn make_closure_demon<F>(&mut self, name: impl Into<String>, priority: DemonPriority, run: F) -> DemonId
    where
        F: Fn(&mut Solver) -> SearchResult<()> + 'static,
    {
        self.register_demon(Rc::new(ClosureDemon::new(name, priority, run)))
    }

    /// Returns the number of live demons.
    pub fn demon_count(&self) -> usize {
        self.demons.len()
    }

    pub fn is_demon_alive(&self, id: DemonId) -> bool {
        self.demons.contains(id.0)
    }

    /// Returns the priority of a live demon.
    pub fn demon_priority(&self, id: DemonId) -> Option<DemonPriority> {
        self.demons.get(id.0).map(|entry| entry.priority)
    }

    /// Returns the number of demon runs at `priority`.
    pub fn demon_runs(&self, priority: DemonPriority) -> u64 {
        self.stats.demon_runs(priority)
    }

    /// Demon runs per demon name, recorded when `profile_propagation` is on.
    pub fn demon_profile(&self) -> &BTreeMap<String, u64> {
        &self.demon_profile
    }

    pub(crate) fn profile_demon(&mut self, name: &str) {
        match self.demon_profile.get_mut(name) {
            Some(runs) => *runs += 1,
            None => {
                self.demon_profile.insert(name.to_string(), 1);
            }
        }
    }

    // ---- reversible state ----

    /// Creates a reversible cell holding `value`.
    pub fn make_rev<T: RevValue>(&mut self, value: T) -> Rev<T> {
        self.store.make(value)
    }

    pub fn value<T: RevValue>(&self, rev: Rev<T>) -> T {
        self.store.get(rev)
    }

    /// Records the current value of `rev` on the trail unconditionally.
    pub fn save_value<T: RevValue>(&mut self, rev: Rev<T>) {
        self.store.save(&mut self.trail, rev);
    }

    /// Writes `value`, recording the old one at most once per search node.
    pub fn set_value<T: RevValue>(&mut self, rev: Rev<T>, value: T) {
        let stamp = self.queue.stamp();
        self.store.set(&mut self.trail, rev, value, stamp);
    }

    /// Adds `delta` to an integer cell.
    pub fn add_value<T>(&mut self, rev: Rev<T>, delta: T)
    where
        T: RevValue + std::ops::Add<Output = T>,
    {
        let stamp = self.queue.stamp();
        self.store.add(&mut self.trail, rev, delta, stamp);
    }

    /// Allocates `value` for the lifetime of the current scope.
    pub fn rev_alloc<T: 'static>(&mut self, value: T) -> RevAlloc<T> {
        self.trail.rev_alloc(value)
    }

    /// Allocates an array for the lifetime of the current scope.
    pub fn rev_alloc_array<T: 'static>(&mut self, values: Vec<T>) -> RevAlloc<Vec<T>> {
        self.trail.rev_alloc_array(values)
    }

    /// Returns the allocation behind `handle`, or `None` once its scope was
    /// popped.
    pub fn rev_get<T: 'static>(&self, handle: RevAlloc<T>) -> Option<&T> {
        self.trail.rev_get(handle)
    }

    pub fn rev_get_mut<T: 'static>(&mut self, handle: RevAlloc<T>) -> Option<&mut T> {
        self.trail.rev_get_mut(handle)
    }

    /// Returns the number of live reversible allocations.
    pub fn rev_alloc_count(&self) -> usize {
        self.trail.allocation_count()
    }

    /// Returns the number of trail cells recorded for `T`.
    pub fn trail_len<T: RevValue>(&self) -> usize {
        self.trail.len_of::<T>()
    }

    /// Returns the number of trail cells over all segments.
    pub fn total_trail_len(&self) -> usize {
        self.trail.total_len()
    }

    // ---- counters ----

    pub fn branches(&self) -> u64 {
        self.stats.branches
    }

    pub fn failures(&self) -> u64 {
        self.stats.failures
    }

    pub fn decisions(&self) -> u64 {
        self.stats.decisions
    }

    /// Accepted solutions of the top-level search.
    pub fn solutions(&self) -> u64 {
        self.searches[0].solution_counter
    }

    /// Leaves reached by the top-level search, accepted or not.
    pub fn unchecked_solutions(&self) -> u64 {
        self.searches[0].unchecked_solution_counter
    }

    /// Accepted solutions over every search since the solver was created.
    pub fn total_solutions(&self) -> u64 {
        self.stats.solutions
    }

    /// Time since the solver was created.
    pub fn wall_time(&self) -> Duration {
        self.stats.elapsed()
    }

    /// Returns the queue stamp.
    pub fn stamp(&self) -> u64 {
        self.queue.stamp()
    }

    /// Returns a counter bumped on every backtrack.
    pub fn fail_stamp(&self) -> u64 {
        self.fail_stamp
    }

    /// Number of running searches: 0 outside search, 1 for the top-level
    /// search, more when nested.
    pub fn solve_depth(&self) -> usize {
        if self.state == SolverState::OutsideSearch {
            0
        } else {
            self.searches.len()
        }
    }

    /// Number of branches taken from the root of the active search.
    pub fn search_depth(&self) -> u32 {
        self.active_search().search_depth
    }

    /// Number of left branches taken from the root of the active search.
    pub fn search_left_depth(&self) -> u32 {
        self.active_search().left_search_depth
    }

    pub fn statistics(&self) -> SolverStatistics {
        SolverStatistics {
            branches: self.stats.branches,
            failures: self.stats.failures,
            decisions: self.stats.decisions,
            solutions: self.stats.solutions,
            var_demon_runs: self.stats.demon_runs(DemonPriority::Var),
            normal_demon_runs: self.stats.demon_runs(DemonPriority::Normal),
            delayed_demon_runs: self.stats.demon_runs(DemonPriority::Delayed),
            trail_cells: self.trail.total_len(),
            trail_packed_bytes: self.trail.packed_bytes(),
            wall_time: self.stats.elapsed(),
        }
    }

    // ---- randomness ----

    /// Returns a uniform value in `0..bound`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn rand_u64(&mut self, bound: u64) -> u64 {
        self.rng.random_range(0..bound)
    }

    /// Returns a uniform value in `0..bound`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is not positive.
    pub fn rand_i64(&mut self, bound: i64) -> i64 {
        self.rng.random_range(0..bound)
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    // ---- searches ----

    pub(crate) fn active_search(&self) -> &Search {
        let index = self.searches.len() - 1;
        &self.searches[index]
    }

    pub(crate) fn active_search_mut(&mut self) -> &mut Search {
        let index = self.searches.len() - 1;
        &mut self.searches[index]
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("state", &self.state)
            .field("solve_depth", &self.solve_depth())
            .field("branches", &self.stats.branches)
            .field("failures", &self.stats.failures)
            .field("constraints", &self.constraints.len())
            .field("demons", &self.demons.len())
            .field("trail", &self.trail)
            .finish_non_exhaustive()
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        while self.searches.len() > 1 {
            self.backtrack_to_sentinel(SentinelKind::InitialSearch);
            self.searches.pop();
        }
        self.backtrack_to_sentinel(SentinelKind::SolverCtor);
    }
}
