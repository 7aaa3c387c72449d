use tracing::debug;
use zenlist_shared::{
  Label,
  Project,
  Task
};

use crate::cache::contains_task;

/// What re-validation did to the project
/// selection.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub enum ProjectRevalidation {
  Kept,
  /// The selection was absent or
  /// dangling and fell back to the
  /// first project.
  Fallback(String),
  /// The collection is empty.
  Cleared
}

/// Currently selected ids into the
/// entity cache. Never chooses an entity
/// on its own, except the first-project
/// fallback.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct Selection {
  pub project_id: Option<String>,
  pub label_id:   Option<String>,
  pub task_id:    Option<String>
}

impl Selection {
  pub fn revalidate_projects(
    &mut self,
    projects: &[Project]
  ) -> ProjectRevalidation {
    let Some(first) = projects.first()
    else {
      if self.project_id.take().is_some()
      {
        debug!(
          "project selection cleared; \
           no projects"
        );
      }
      return ProjectRevalidation::Cleared;
    };

    let still_present =
      self.project_id.as_deref().is_some_and(
        |id| {
          projects
            .iter()
            .any(|project| project.id == id)
        }
      );
    if still_present {
      return ProjectRevalidation::Kept;
    }

    debug!(
      previous = ?self.project_id,
      fallback = %first.id,
      "project selection fell back to first project"
    );
    self.project_id =
      Some(first.id.clone());
    ProjectRevalidation::Fallback(
      first.id.clone()
    )
  }

  /// Returns `true` when a dangling label
  /// selection was cleared.
  pub fn revalidate_label(
    &mut self,
    labels: &[Label]
  ) -> bool {
    let dangling = self
      .label_id
      .as_deref()
      .is_some_and(|id| {
        !labels
          .iter()
          .any(|label| label.id == id)
      });
    if dangling {
      debug!(label = ?self.label_id, "label selection cleared");
      self.label_id = None;
    }
    dangling
  }

  /// Returns `true` when a dangling task
  /// selection was cleared. Subtask ids
  /// count as present.
  pub fn revalidate_task(
    &mut self,
    roots: &[Task]
  ) -> bool {
    let dangling = self
      .task_id
      .as_deref()
      .is_some_and(|id| {
        !contains_task(roots, id)
      });
    if dangling {
      debug!(task = ?self.task_id, "task selection cleared");
      self.task_id = None;
    }
    dangling
  }
}
