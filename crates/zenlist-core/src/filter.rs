use serde_json::{
  Value,
  json
};
use tracing::trace;
use zenlist_shared::{
  Task,
  TaskPriority,
  TaskStatus
};

/// Toggles `value` in `list`: present
/// values are removed, absent ones are
/// appended. Applying it twice is the
/// identity.
pub fn toggle_membership<T>(
  list: &mut Vec<T>,
  value: T
) where
  T: PartialEq
{
  if let Some(pos) = list
    .iter()
    .position(|item| *item == value)
  {
    list.remove(pos);
  } else {
    list.push(value);
  }
}

/// Status and priority constraints for
/// the task query. An empty set places
/// no constraint on its dimension.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct TaskFilter {
  pub statuses:   Vec<TaskStatus>,
  pub priorities: Vec<TaskPriority>
}

impl TaskFilter {
  pub fn toggle_status(
    &mut self,
    status: TaskStatus
  ) {
    toggle_membership(
      &mut self.statuses,
      status
    );
    trace!(statuses = ?self.statuses, "status filter toggled");
  }

  pub fn toggle_priority(
    &mut self,
    priority: TaskPriority
  ) {
    toggle_membership(
      &mut self.priorities,
      priority
    );
    trace!(priorities = ?self.priorities, "priority filter toggled");
  }

  pub fn is_empty(&self) -> bool {
    self.statuses.is_empty()
      && self.priorities.is_empty()
  }

  /// Variables for the `fetch-tasks`
  /// operation.
  pub fn query_variables(
    &self,
    project_id: &str,
    page_size: usize
  ) -> Value {
    json!({
      "projectId": project_id,
      "statuses": self.statuses,
      "priorities": self.priorities,
      "first": page_size
    })
  }

  /// Server-side matching rule for a
  /// root task. Subtasks are never
  /// filtered by their parent's match.
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    let status_ok = self
      .statuses
      .is_empty()
      || self
        .statuses
        .contains(&task.status);
    let priority_ok = self
      .priorities
      .is_empty()
      || self
        .priorities
        .contains(&task.priority);
    status_ok && priority_ok
  }
}
