//! The propagation queue.
//!
//! Demons are deduplicated with stamps: a demon is enqueued only if its stamp
//! is older than the queue stamp, and takes the queue stamp when enqueued.
//! Running a demon resets its stamp to `stamp - 1` so it can be enqueued again
//! by the events it triggers itself. The queue stamp moves on every marker
//! push and pop and on every freeze.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

use crate::constraint::Constraint;
use crate::demon::{DemonId, DemonPriority};
use crate::failure::SearchResult;
use crate::solver::Solver;

type FailAction = Box<dyn FnMut(&mut Solver)>;

pub(crate) struct Queue {
    var_queue: VecDeque<DemonId>,
    delayed_queue: VecDeque<DemonId>,
    stamp: u64,
    freeze_level: u32,
    in_process: bool,
    in_add: bool,
    to_add: Vec<Rc<dyn Constraint>>,
    clean_action: Option<FailAction>,
    runs_since_check: u64,
}

impl Queue {
    pub(crate) fn new() -> Self {
        Self {
            var_queue: VecDeque::new(),
            delayed_queue: VecDeque::new(),
            stamp: 1,
            freeze_level: 0,
            in_process: false,
            in_add: false,
            to_add: Vec::new(),
            clean_action: None,
            runs_since_check: 0,
        }
    }

    #[inline]
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    #[inline]
    pub(crate) fn increase_stamp(&mut self) {
        self.stamp += 1;
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.freeze_level > 0
    }

    pub(crate) fn pending(&self) -> usize {
        self.var_queue.len() + self.delayed_queue.len()
    }

    /// Sets the current propagation aside and hands back an idle queue.
    ///
    /// The stamp moves so the demons still waiting in the set-aside queues
    /// can be enqueued again.
    pub(crate) fn suspend(&mut self) -> SuspendedQueue {
        self.stamp += 1;
        SuspendedQueue {
            var_queue: std::mem::take(&mut self.var_queue),
            delayed_queue: std::mem::take(&mut self.delayed_queue),
            freeze_level: std::mem::take(&mut self.freeze_level),
            in_process: std::mem::take(&mut self.in_process),
            in_add: std::mem::take(&mut self.in_add),
            to_add: std::mem::take(&mut self.to_add),
            clean_action: self.clean_action.take(),
        }
    }

    /// Puts back a propagation set aside by [`suspend`](Queue::suspend),
    /// dropping whatever was left in the idle queue.
    pub(crate) fn resume(&mut self, saved: SuspendedQueue) {
        self.var_queue = saved.var_queue;
        self.delayed_queue = saved.delayed_queue;
        self.freeze_level = saved.freeze_level;
        self.in_process = saved.in_process;
        self.in_add = saved.in_add;
        self.to_add = saved.to_add;
        self.clean_action = saved.clean_action;
    }
}

/// Queue state of an enclosing search while a nested one runs.
pub(crate) struct SuspendedQueue {
    var_queue: VecDeque<DemonId>,
    delayed_queue: VecDeque<DemonId>,
    freeze_level: u32,
    in_process: bool,
    in_add: bool,
    to_add: Vec<Rc<dyn Constraint>>,
    clean_action: Option<FailAction>,
}

impl Solver {
    /// Enqueues a demon on the variable queue and processes the queue unless
    /// it is frozen.
    ///
    /// A demon already waiting since the last stamp change is not enqueued
    /// twice.
    pub fn enqueue_var(&mut self, id: DemonId) -> SearchResult<()> {
        let stamp = self.queue.stamp;
        let Some(entry) = self.demons.get_mut(id.0) else {
            return Ok(());
        };
        if entry.stamp < stamp {
            entry.stamp = stamp;
            self.queue.var_queue.push_back(id);
            if self.queue.freeze_level == 0 {
                self.process_queue()?;
            }
        }
        Ok(())
    }

    /// Enqueues a demon on the delayed queue. Never processes.
    pub fn enqueue_delayed_demon(&mut self, id: DemonId) {
        let stamp = self.queue.stamp;
        let Some(entry) = self.demons.get_mut(id.0) else {
            return;
        };
        if entry.stamp < stamp {
            entry.stamp = stamp;
            self.queue.delayed_queue.push_back(id);
        }
    }

    /// Runs a demon now, or defers it to the delayed queue if it has
    /// [`DemonPriority::Delayed`].
    pub fn execute(&mut self, id: DemonId) -> SearchResult<()> {
        let stamp = self.queue.stamp;
        let Some(entry) = self.demons.get(id.0) else {
            return Ok(());
        };
        if entry.priority == DemonPriority::Delayed {
            self.enqueue_delayed_demon(id);
            Ok(())
        } else if entry.stamp < stamp {
            self.run_demon(id)
        } else {
            Ok(())
        }
    }

    /// Executes every demon of `ids` in order.
    pub fn execute_all(&mut self, ids: &[DemonId]) -> SearchResult<()> {
        for &id in ids {
            self.execute(id)?;
        }
        Ok(())
    }

    /// Enqueues every demon of `ids` on the delayed queue.
    pub fn enqueue_all(&mut self, ids: &[DemonId]) {
        for &id in ids {
            self.enqueue_delayed_demon(id);
        }
    }

    /// Suspends queue processing until the matching [`unfreeze_queue`].
    ///
    /// [`unfreeze_queue`]: Solver::unfreeze_queue
    pub fn freeze_queue(&mut self) {
        self.queue.freeze_level += 1;
        self.queue.stamp += 1;
    }

    /// Leaves one freeze level; the last one processes the queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue is not frozen.
    pub fn unfreeze_queue(&mut self) -> SearchResult<()> {
        assert!(self.queue.freeze_level > 0, "unbalanced unfreeze_queue");
        self.queue.freeze_level -= 1;
        if self.queue.freeze_level == 0 {
            self.process_queue()?;
        }
        Ok(())
    }

    /// Returns true while the queue is frozen.
    pub fn is_queue_frozen(&self) -> bool {
        self.queue.is_frozen()
    }

    /// Returns the number of demons waiting in the queue.
    pub fn pending_demons(&self) -> usize {
        self.queue.pending()
    }

    /// Installs an action run once, after the next failure has cleared the
    /// queue. It replaces any action still waiting.
    pub fn set_action_on_fail(&mut self, action: impl FnMut(&mut Solver) + 'static) {
        self.queue.clean_action = Some(Box::new(action));
    }

    pub fn reset_action_on_fail(&mut self) {
        self.queue.clean_action = None;
    }

    /// Drains the queue. Reentrant calls return immediately.
    pub(crate) fn process_queue(&mut self) -> SearchResult<()> {
        if self.queue.in_process {
            return Ok(());
        }
        self.queue.in_process = true;
        let result = self.drain_queue();
        self.queue.in_process = false;
        result
    }

    fn drain_queue(&mut self) -> SearchResult<()> {
        loop {
            let next = match self.queue.var_queue.pop_front() {
                Some(id) => Some(id),
                None => self.queue.delayed_queue.pop_front(),
            };
            match next {
                Some(id) => self.run_demon(id)?,
                None => return Ok(()),
            }
        }
    }

    fn run_demon(&mut self, id: DemonId) -> SearchResult<()> {
        let stamp = self.queue.stamp;
        let Some(entry) = self.demons.get_mut(id.0) else {
            return Ok(());
        };
        entry.stamp = stamp - 1;
        let demon = Rc::clone(&entry.demon);
        let priority = entry.priority;

        self.stats.record_demon_run(priority);
        if self.config.profile_propagation {
            self.profile_demon(demon.name());
        }
        if self.config.trace_propagation {
            trace!(demon = demon.name(), ?priority, "running demon");
        }

        self.queue.runs_since_check += 1;
        if self.queue.runs_since_check >= self.config.test_period {
            self.queue.runs_since_check = 0;
            self.top_periodic_check()?;
        }
        demon.run(self)
    }

    /// Resets the queue after a failure.
    pub(crate) fn after_failure(&mut self) {
        self.queue.var_queue.clear();
        self.queue.delayed_queue.clear();
        if let Some(mut action) = self.queue.clean_action.take() {
            action(self);
        }
        self.queue.freeze_level = 0;
        self.queue.in_process = false;
        self.queue.in_add = false;
        self.queue.to_add.clear();
    }

    /// Posts a constraint created during search, after the ones already
    /// waiting.
    pub(crate) fn queue_constraint(&mut self, constraint: Rc<dyn Constraint>) -> SearchResult<()> {
        self.queue.to_add.push(constraint);
        self.process_added_constraints()
    }

    fn process_added_constraints(&mut self) -> SearchResult<()> {
        if self.queue.in_add {
            return Ok(());
        }
        self.queue.in_add = true;
        let mut counter = 0;
        while counter < self.queue.to_add.len() {
            let constraint = Rc::clone(&self.queue.to_add[counter]);
            if let Err(failure) = self.post_and_propagate(&constraint) {
                self.queue.in_add = false;
                return Err(failure);
            }
            counter += 1;
        }
        self.queue.in_add = false;
        self.queue.to_add.clear();
        Ok(())
    }
}
