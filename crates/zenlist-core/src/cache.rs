use serde_json::json;
use tracing::{debug, instrument, warn};
use zenlist_shared::{Connection, Label, Profile, Project, Task};

use crate::error::SyncError;
use crate::filter::TaskFilter;
use crate::remote::{Operation, RemoteStore, take_field};

/// Last-fetched snapshot of every remote collection. Collections are only
/// ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCache {
    pub profile: Option<Profile>,
    pub projects: Vec<Project>,
    pub labels: Vec<Label>,
    /// Root tasks, each carrying its subtasks.
    pub tasks: Vec<Task>,
}

impl EntityCache {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.iter().find(|label| label.id == id)
    }

    /// Looks a task up across root tasks and subtasks.
    pub fn task(&self, id: &str) -> Option<&Task> {
        flatten_tasks(&self.tasks).into_iter().find(|task| task.id == id)
    }
}

/// Each root task followed by its subtasks.
pub fn flatten_tasks(roots: &[Task]) -> Vec<&Task> {
    let mut flat = Vec::with_capacity(roots.len());
    for root in roots {
        flat.push(root);
        flat.extend(root.subtasks.iter());
    }
    flat
}

pub fn contains_task(roots: &[Task], id: &str) -> bool {
    roots
        .iter()
        .any(|root| root.id == id || root.subtasks.iter().any(|sub| sub.id == id))
}

/// Enforces the single nesting level: subtasks lose any children of their
/// own and roots never claim a parent.
pub fn normalize_nesting(roots: Vec<Task>) -> Vec<Task> {
    roots
        .into_iter()
        .filter_map(|mut root| {
            if let Some(parent) = root.parent_task_id.as_deref() {
                warn!(task = %root.id, parent, "subtask returned as a root task; dropping");
                return None;
            }
            for sub in &mut root.subtasks {
                if sub.parent_task_id.as_deref() != Some(root.id.as_str()) {
                    warn!(
                        task = %sub.id,
                        parent = ?sub.parent_task_id,
                        root = %root.id,
                        "subtask parent does not match enclosing root"
                    );
                    sub.parent_task_id = Some(root.id.clone());
                }
                if !sub.subtasks.is_empty() {
                    warn!(task = %sub.id, nested = sub.subtasks.len(), "discarding nested subtasks");
                    sub.subtasks.clear();
                }
            }
            Some(root)
        })
        .collect()
}

#[instrument(skip(remote))]
pub async fn fetch_profile<R: RemoteStore>(remote: &R) -> Result<Profile, SyncError> {
    let op = Operation::FetchProfile;
    let data = remote.execute(op, json!({})).await?;
    let profile: Profile = take_field(op, data)?;
    debug!(id = %profile.id, "profile fetched");
    Ok(profile)
}

#[instrument(skip(remote))]
pub async fn fetch_projects<R: RemoteStore>(
    remote: &R,
    page_size: usize,
) -> Result<Vec<Project>, SyncError> {
    let op = Operation::FetchProjects;
    let data = remote.execute(op, json!({ "first": page_size })).await?;
    let projects = take_field::<Connection<Project>>(op, data)?.into_nodes();
    debug!(count = projects.len(), "projects fetched");
    Ok(projects)
}

#[instrument(skip(remote))]
pub async fn fetch_labels<R: RemoteStore>(remote: &R, page_size: usize) -> Result<Vec<Label>, SyncError> {
    let op = Operation::FetchLabels;
    let data = remote.execute(op, json!({ "first": page_size })).await?;
    let labels = take_field::<Connection<Label>>(op, data)?.into_nodes();
    debug!(count = labels.len(), "labels fetched");
    Ok(labels)
}

#[instrument(skip(remote, filter), fields(statuses = ?filter.statuses, priorities = ?filter.priorities))]
pub async fn fetch_tasks<R: RemoteStore>(
    remote: &R,
    project_id: &str,
    filter: &TaskFilter,
    page_size: usize,
) -> Result<Vec<Task>, SyncError> {
    let op = Operation::FetchTasks;
    let data = remote
        .execute(op, filter.query_variables(project_id, page_size))
        .await?;
    let roots = normalize_nesting(take_field::<Connection<Task>>(op, data)?.into_nodes());
    let outside = roots.iter().filter(|root| !filter.matches(root)).count();
    if outside > 0 {
        warn!(outside, "server returned root tasks outside the active filter");
    }
    debug!(
        roots = roots.len(),
        total = flatten_tasks(&roots).len(),
        "tasks fetched"
    );
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use zenlist_shared::{Task, TaskPriority, TaskStatus};

    use super::{EntityCache, contains_task, flatten_tasks, normalize_nesting};

    fn task(id: &str, parent: Option<&str>) -> Task {
        let at = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("valid time");
        Task {
            id: id.to_string(),
            parent_task_id: parent.map(str::to_string),
            title: id.to_uppercase(),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::P3,
            start_at: None,
            due_at: None,
            completed_at: None,
            created_at: at,
            updated_at: at,
            labels: vec![],
            subtasks: vec![],
        }
    }

    #[test]
    fn flattened_view_lists_each_task_once_in_order() {
        let mut a = task("a", None);
        a.subtasks = vec![task("a1", Some("a")), task("a2", Some("a"))];
        let b = task("b", None);
        let roots = vec![a, b];

        let ids: Vec<&str> = flatten_tasks(&roots).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a1", "a2", "b"]);
        assert!(contains_task(&roots, "a2"));
        assert!(!contains_task(&roots, "zz"));

        let cache = EntityCache {
            tasks: roots,
            ..EntityCache::default()
        };
        assert_eq!(cache.task("a1").map(|t| t.title.as_str()), Some("A1"));
    }

    #[test]
    fn nesting_is_capped_at_one_level() {
        let mut sub = task("a1", Some("a"));
        sub.subtasks = vec![task("a1x", Some("a1"))];
        let mut a = task("a", None);
        a.subtasks = vec![sub, task("stray", Some("other"))];

        let roots = normalize_nesting(vec![a, task("orphan", Some("a"))]);
        assert_eq!(roots.len(), 1);
        assert!(roots[0].subtasks[0].subtasks.is_empty());
        assert_eq!(roots[0].subtasks[1].parent_task_id.as_deref(), Some("a"));
    }
}
