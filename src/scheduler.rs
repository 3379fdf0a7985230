//! Discrete-event scheduler on a logical millisecond clock.
//!
//! Entries fire in (time, insertion order). Cancelling is a filter over the queue, so pausing
//! and game over never leave a stale callback behind.

use crate::session::Side;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    /// Gravity step for one session.
    Fall(Side),
    /// Planner decision for the automated session's fresh piece.
    PlanDecide,
    /// One horizontal drive step toward the planned column.
    PlanStep,
    RulePoll,
}

impl Task {
    /// Tasks that belong to a session and stop while the duel is paused.
    pub fn is_session_task(self) -> bool {
        !matches!(self, Self::RulePoll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    at: u64,
    seq: u64,
    task: Task,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical time of the last fired entry (or of the last `pop_due` horizon).
    pub fn now(&self) -> u64 {
        self.now
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn schedule_in(&mut self, delay_ms: u64, task: Task) {
        self.schedule_at(self.now + delay_ms, task);
    }

    pub fn schedule_at(&mut self, at: u64, task: Task) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Entry {
            at: at.max(self.now),
            seq,
            task,
        }));
    }

    /// Drop every pending entry whose task matches `pred`.
    pub fn cancel(&mut self, mut pred: impl FnMut(Task) -> bool) {
        self.queue.retain(|Reverse(entry)| !pred(entry.task));
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    #[cfg(test)]
    pub fn is_scheduled(&self, task: Task) -> bool {
        self.queue.iter().any(|Reverse(entry)| entry.task == task)
    }

    /// Fire time of the earliest pending entry for `task`.
    #[cfg(test)]
    pub fn due_at(&self, task: Task) -> Option<u64> {
        self.queue
            .iter()
            .filter(|Reverse(entry)| entry.task == task)
            .map(|Reverse(entry)| entry.at)
            .min()
    }

    /// Pop the earliest entry due at or before `until`, moving the clock to its fire time.
    /// Returns `None` (and moves the clock to `until`) once nothing else is due.
    pub fn pop_due(&mut self, until: u64) -> Option<Task> {
        match self.queue.peek() {
            Some(Reverse(entry)) if entry.at <= until => {
                let Reverse(entry) = self.queue.pop()?;
                self.now = self.now.max(entry.at);
                Some(entry.task)
            }
            _ => {
                self.now = self.now.max(until);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_time_then_insertion_order() {
        let mut s = Scheduler::new();
        s.schedule_in(50, Task::Fall(Side::Ai));
        s.schedule_in(10, Task::PlanDecide);
        s.schedule_in(50, Task::Fall(Side::Human));
        s.schedule_in(10, Task::RulePoll);

        assert_eq!(s.pop_due(100), Some(Task::PlanDecide));
        assert_eq!(s.now(), 10);
        assert_eq!(s.pop_due(100), Some(Task::RulePoll));
        assert_eq!(s.pop_due(100), Some(Task::Fall(Side::Ai)));
        assert_eq!(s.pop_due(100), Some(Task::Fall(Side::Human)));
        assert_eq!(s.now(), 50);
        assert_eq!(s.pop_due(100), None);
        assert_eq!(s.now(), 100);
    }

    #[test]
    fn nothing_fires_before_its_time() {
        let mut s = Scheduler::new();
        s.schedule_in(30, Task::PlanStep);
        assert_eq!(s.pop_due(29), None);
        assert_eq!(s.now(), 29);
        assert_eq!(s.pop_due(30), Some(Task::PlanStep));
    }

    #[test]
    fn delays_are_relative_to_the_current_clock() {
        let mut s = Scheduler::new();
        assert_eq!(s.pop_due(1_000), None);
        s.schedule_in(100, Task::RulePoll);
        assert_eq!(s.due_at(Task::RulePoll), Some(1_100));
    }

    #[test]
    fn cancel_removes_only_matching_tasks() {
        let mut s = Scheduler::new();
        s.schedule_in(10, Task::Fall(Side::Human));
        s.schedule_in(10, Task::Fall(Side::Ai));
        s.schedule_in(10, Task::RulePoll);
        s.cancel(Task::is_session_task);
        assert_eq!(s.len(), 1);
        assert!(s.is_scheduled(Task::RulePoll));
        assert!(!s.is_scheduled(Task::Fall(Side::Human)));
        s.clear();
        assert!(s.is_empty());
    }
}
