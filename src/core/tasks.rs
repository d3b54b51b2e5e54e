//! # Tasks
//!
//! The task-combination engine. Independent input lists are collected into a
//! [`TaskListSet`] and enumerated as their Cartesian product in "odometer"
//! order: the first list added varies slowest, the last list added varies
//! fastest.

use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use thiserror::Error;

/// A single substitution value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Task(String);

impl Task {
    /// Wraps one substitution value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, as substituted into the command line.
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Task {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Task {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One combination: exactly one task from each list, in list order.
pub type TaskGroup = Vec<Task>;

/// Returned by [`TaskListSet::next_group`] once every combination was produced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("All task combinations have been produced.")]
pub struct ExhaustedError;

/// Returned when a list is added to a set whose enumeration already started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cannot add a task list after enumeration has started.")]
pub struct SealedError;

/// An ordered sequence of tasks coming from exactly one input source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one task.
    pub fn add(&mut self, value: impl Into<Task>) {
        self.tasks.push(value.into());
    }

    /// Appends every value, in iteration order.
    pub fn extend<I, T>(&mut self, values: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        self.tasks.extend(values.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The tasks in their current order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Uniformly permutes the list in place (Fisher–Yates).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tasks.shuffle(rng);
    }
}

impl<T: Into<Task>> FromIterator<T> for TaskList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered collection of task lists, enumerated as their Cartesian product.
///
/// The enumeration cursor is a tuple of per-list positions advanced with
/// carry, so it can always be rebuilt from a linear index (see [`Self::seek`]).
#[derive(Debug, Clone, Default)]
pub struct TaskListSet {
    lists: Vec<TaskList>,
    cursor: Vec<usize>,
    produced: usize,
    started: bool,
    exhausted: bool,
}

impl TaskListSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seals `list` into the set. Lists are enumerated in the order they are added.
    pub fn add_task_list(&mut self, list: TaskList) -> Result<(), SealedError> {
        if self.started {
            return Err(SealedError);
        }
        self.lists.push(list);
        self.cursor.push(0);
        Ok(())
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    /// Total number of combinations: the product of the list lengths.
    ///
    /// An empty set has exactly one (empty) combination. Saturates at `usize::MAX`.
    pub fn size(&self) -> usize {
        self.lists
            .iter()
            .fold(1usize, |acc, list| acc.saturating_mul(list.len()))
    }

    /// Linear index of the next combination to be produced.
    pub fn position(&self) -> usize {
        self.produced
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.produced >= self.size()
    }

    /// Produces the next task group in odometer order.
    pub fn next_group(&mut self) -> Result<TaskGroup, ExhaustedError> {
        self.started = true;
        if self.exhausted || self.lists.iter().any(TaskList::is_empty) {
            self.exhausted = true;
            return Err(ExhaustedError);
        }

        let group = self
            .lists
            .iter()
            .zip(&self.cursor)
            .filter_map(|(list, &pos)| list.tasks.get(pos).cloned())
            .collect();

        self.produced += 1;
        self.advance();
        Ok(group)
    }

    /// Moves the cursor so that the next call to [`Self::next_group`] yields
    /// the combination at linear `index`.
    pub fn seek(&mut self, index: usize) -> Result<(), ExhaustedError> {
        self.started = true;
        if index >= self.size() {
            self.exhausted = true;
            return Err(ExhaustedError);
        }

        // Mixed-radix decomposition, least significant digit = last list.
        let mut rest = index;
        for (pos, list) in self.cursor.iter_mut().zip(&self.lists).rev() {
            *pos = rest % list.len();
            rest /= list.len();
        }
        self.produced = index;
        self.exhausted = false;
        Ok(())
    }

    /// Increments the cursor with carry. Overflow of the first list marks exhaustion.
    fn advance(&mut self) {
        for (pos, list) in self.cursor.iter_mut().zip(&self.lists).rev() {
            *pos += 1;
            if *pos < list.len() {
                return;
            }
            *pos = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for TaskListSet {
    type Item = TaskGroup;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_group().ok()
    }
}
