use core::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::FillTask;

// -------------------------------------------------------------------------------------------------

/// Identifies a user of the host application; the owner of selections, tasks, and accounts.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[expect(clippy::exhaustive_structs)]
pub struct UserId(pub u64);

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user #{}", self.0)
    }
}

/// Holds each user's current [`FillTask`], and guarantees that no user has more than one
/// task in progress.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<UserId, FillTask>,
}

impl TaskRegistry {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `task` the user's current task.
    ///
    /// Fails, leaving the registry unchanged, if the user's current task has not finished.
    /// A finished (done, failed, or cancelled) task is replaced.
    pub fn try_set_task(
        &mut self,
        user: UserId,
        task: FillTask,
    ) -> Result<(), TaskAlreadyActiveError> {
        match self.tasks.entry(user) {
            Entry::Occupied(mut entry) => {
                let status = entry.get().status();
                if !status.is_terminal() {
                    return Err(TaskAlreadyActiveError { user });
                }
                entry.insert(task);
            }
            Entry::Vacant(entry) => {
                entry.insert(task);
            }
        }
        Ok(())
    }

    /// Removes the user's task, whatever its state, and returns it.
    ///
    /// This does not cancel the task.
    pub fn clear_task(&mut self, user: UserId) -> Option<FillTask> {
        self.tasks.remove(&user)
    }

    /// Removes the user's task only if it is `task`.
    ///
    /// Returns whether it was removed.
    pub fn clear_task_if(&mut self, user: UserId, task: &FillTask) -> bool {
        match self.tasks.entry(user) {
            Entry::Occupied(entry) if entry.get().same_task(task) => {
                entry.remove();
                true
            }
            _ => false,
        }
    }

    /// Returns the user's current task, if any.
    pub fn task(&self, user: UserId) -> Option<&FillTask> {
        self.tasks.get(&user)
    }

    /// Returns the number of users with a task in the registry, finished or not.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Error from [`TaskRegistry::try_set_task()`] when the user already has a task in progress.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{user} already has a fill in progress")]
#[non_exhaustive]
pub struct TaskAlreadyActiveError {
    /// The user whose task is in progress.
    pub user: UserId,
}
