//! Ordered list of pending tasks.

use anvil_core::Task;

/// Pending tasks, front first
///
/// Stored back-to-front so that popping the front and splicing subtasks
/// in front are both pushes and pops on a `Vec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Agenda {
    reversed: Vec<Task>,
}

impl Agenda {
    /// Create an agenda from tasks in execution order
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut reversed = tasks;
        reversed.reverse();
        Self { reversed }
    }

    /// Next task to work on
    #[must_use]
    pub fn front(&self) -> Option<&Task> {
        self.reversed.last()
    }

    /// Remove and return the next task
    pub fn pop_front(&mut self) -> Option<Task> {
        self.reversed.pop()
    }

    /// Put tasks in front, keeping their order
    pub fn push_front(&mut self, tasks: Vec<Task>) {
        self.reversed.extend(tasks.into_iter().rev());
    }

    /// Copy of this agenda with `tasks` placed in front
    #[must_use]
    pub fn with_front(&self, tasks: Vec<Task>) -> Self {
        let mut next = self.clone();
        next.push_front(tasks);
        next
    }

    /// All tasks, front first
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.reversed.iter().rev()
    }

    /// All tasks after the front one
    pub fn rest(&self) -> impl Iterator<Item = &Task> {
        self.iter().skip(1)
    }

    /// Number of pending tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.reversed.len()
    }

    /// Check if nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reversed.is_empty()
    }
}
