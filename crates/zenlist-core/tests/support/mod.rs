//! In-memory graph service used by the session tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use zenlist_core::config::PageSizes;
use zenlist_core::error::SyncError;
use zenlist_core::orchestrator::Session;
use zenlist_core::remote::{Operation, RemoteStore};
use zenlist_core::state::AppState;
use zenlist_shared::{
    Connection, CreateLabelInput, CreateProjectInput, CreateTaskInput, Label, LabelRef, Profile, Project, Task,
    TaskPriority, TaskStatus, UpdateLabelInput, UpdateProjectInput, UpdateTaskInput, UpsertProfileInput,
};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0)
        .single()
        .expect("valid time")
}

#[derive(Debug, Clone)]
struct StoredTask {
    project_id: String,
    task: Task,
    label_ids: Vec<String>,
}

enum Failure {
    Operation(String),
    Transport(u16),
}

#[derive(Default)]
struct Inner {
    profile: Option<Profile>,
    projects: Vec<Project>,
    labels: Vec<Label>,
    tasks: Vec<StoredTask>,
    next_id: u32,
    calls: Vec<(Operation, Value)>,
    failures: VecDeque<(Operation, Failure)>,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn tick(&self) -> DateTime<Utc> {
        epoch() + Duration::minutes(i64::from(self.next_id))
    }
}

/// A remote that implements the service's operation semantics over plain
/// vectors and records every call it receives.
#[derive(Default)]
pub struct FakeRemote {
    inner: RefCell<Inner>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.inner.borrow_mut().profile = Some(Profile {
            id: "me".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.test".to_string(),
            timezone: "UTC".to_string(),
            avatar_url: None,
            created_at: epoch(),
            updated_at: epoch(),
        });
        remote
    }

    pub fn add_project(&self, title: &str) -> String {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id("p");
        let at = inner.tick();
        inner.projects.push(Project {
            id: id.clone(),
            title: title.to_string(),
            description: None,
            color: None,
            created_at: at,
            updated_at: at,
        });
        id
    }

    pub fn add_label(&self, name: &str) -> String {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id("l");
        let at = inner.tick();
        inner.labels.push(Label {
            id: id.clone(),
            name: name.to_string(),
            created_at: at,
            updated_at: at,
        });
        id
    }

    pub fn add_task(
        &self,
        project_id: &str,
        parent: Option<&str>,
        title: &str,
        status: TaskStatus,
        labels: &[&str],
    ) -> String {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id("t");
        let at = inner.tick();
        inner.tasks.push(StoredTask {
            project_id: project_id.to_string(),
            task: blank_task(&id, parent, title, status, TaskPriority::P3, at),
            label_ids: labels.iter().map(|label| label.to_string()).collect(),
        });
        id
    }

    /// Makes the next call to `operation` fail with an operation error.
    pub fn fail_next(&self, operation: Operation, message: &str) {
        self.inner
            .borrow_mut()
            .failures
            .push_back((operation, Failure::Operation(message.to_string())));
    }

    pub fn fail_next_transport(&self, operation: Operation, status: u16) {
        self.inner
            .borrow_mut()
            .failures
            .push_back((operation, Failure::Transport(status)));
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.inner.borrow().calls.iter().map(|(op, _)| *op).collect()
    }

    pub fn last_variables(&self, operation: Operation) -> Option<Value> {
        self.inner
            .borrow()
            .calls
            .iter()
            .rev()
            .find(|(op, _)| *op == operation)
            .map(|(_, vars)| vars.clone())
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    pub fn stored_task(&self, id: &str) -> Option<Task> {
        self.inner
            .borrow()
            .tasks
            .iter()
            .find(|stored| stored.task.id == id)
            .map(|stored| stored.task.clone())
    }

    fn respond(&self, operation: Operation, variables: &Value) -> Result<Value, SyncError> {
        let mut inner = self.inner.borrow_mut();
        let payload = match operation {
            Operation::FetchProfile => {
                let profile = inner
                    .profile
                    .clone()
                    .ok_or_else(|| not_found("profile"))?;
                to_json(&profile)
            }
            Operation::FetchProjects => {
                let first = page_size(variables);
                let nodes = inner.projects.iter().take(first).cloned().collect();
                to_json(&Connection::<Project>::from_nodes(nodes))
            }
            Operation::FetchLabels => {
                let first = page_size(variables);
                let nodes = inner.labels.iter().take(first).cloned().collect();
                to_json(&Connection::<Label>::from_nodes(nodes))
            }
            Operation::FetchTasks => to_json(&Connection::from_nodes(fetch_tasks(&inner, variables)?)),
            Operation::UpsertProfile => {
                let input: UpsertProfileInput = input(variables)?;
                let at = inner.tick();
                let profile = inner.profile.get_or_insert_with(|| Profile {
                    id: "me".to_string(),
                    name: String::new(),
                    email: String::new(),
                    timezone: String::new(),
                    avatar_url: None,
                    created_at: at,
                    updated_at: at,
                });
                profile.name = input.name;
                profile.email = input.email;
                profile.timezone = input.timezone;
                profile.avatar_url = input.avatar_url;
                profile.updated_at = at;
                to_json(&*profile)
            }
            Operation::CreateProject => {
                let input: CreateProjectInput = input(variables)?;
                if input.title.trim().is_empty() {
                    return Err(bad_input("title is required"));
                }
                let id = inner.next_id("p");
                let at = inner.tick();
                let project = Project {
                    id,
                    title: input.title,
                    description: input.description,
                    color: input.color,
                    created_at: at,
                    updated_at: at,
                };
                inner.projects.push(project.clone());
                to_json(&project)
            }
            Operation::UpdateProject => {
                let input: UpdateProjectInput = input(variables)?;
                let at = inner.tick();
                let project = inner
                    .projects
                    .iter_mut()
                    .find(|project| project.id == input.id)
                    .ok_or_else(|| not_found("project"))?;
                if let Some(title) = input.title.as_set() {
                    project.title = title.clone();
                }
                project.description = input.description.apply_to(project.description.take());
                project.color = input.color.apply_to(project.color.take());
                project.updated_at = at;
                to_json(&*project)
            }
            Operation::DeleteProject => {
                let id = id_var(variables)?;
                let before = inner.projects.len();
                inner.projects.retain(|project| project.id != id);
                if inner.projects.len() == before {
                    return Err(not_found("project"));
                }
                inner.tasks.retain(|stored| stored.project_id != id);
                json!({ "id": id, "deletedAt": inner.tick() })
            }
            Operation::CreateLabel => {
                let input: CreateLabelInput = input(variables)?;
                if inner.labels.iter().any(|label| label.name == input.name) {
                    return Err(SyncError::Operation {
                        message: "label name already exists".to_string(),
                        code: Some("CONFLICT".to_string()),
                    });
                }
                let id = inner.next_id("l");
                let at = inner.tick();
                let label = Label {
                    id,
                    name: input.name,
                    created_at: at,
                    updated_at: at,
                };
                inner.labels.push(label.clone());
                to_json(&label)
            }
            Operation::UpdateLabel => {
                let input: UpdateLabelInput = input(variables)?;
                let at = inner.tick();
                let label = inner
                    .labels
                    .iter_mut()
                    .find(|label| label.id == input.id)
                    .ok_or_else(|| not_found("label"))?;
                label.name = input.name;
                label.updated_at = at;
                to_json(&*label)
            }
            Operation::DeleteLabel => {
                let id = id_var(variables)?;
                let before = inner.labels.len();
                inner.labels.retain(|label| label.id != id);
                if inner.labels.len() == before {
                    return Err(not_found("label"));
                }
                for stored in &mut inner.tasks {
                    stored.label_ids.retain(|label_id| *label_id != id);
                }
                json!({ "id": id, "deletedAt": inner.tick() })
            }
            Operation::CreateTask => {
                let input: CreateTaskInput = input(variables)?;
                if !inner.projects.iter().any(|project| project.id == input.project_id) {
                    return Err(not_found("project"));
                }
                if let Some(parent) = input.parent_task_id.as_deref() {
                    let parent_is_root = inner.tasks.iter().any(|stored| {
                        stored.task.id == parent && stored.task.is_root() && stored.project_id == input.project_id
                    });
                    if !parent_is_root {
                        return Err(bad_input("parent task must be a root task in the same project"));
                    }
                }
                let id = inner.next_id("t");
                let at = inner.tick();
                let mut task = blank_task(
                    &id,
                    input.parent_task_id.as_deref(),
                    &input.title,
                    input.status,
                    input.priority,
                    at,
                );
                task.description = input.description;
                task.start_at = input.start_at;
                task.due_at = input.due_at;
                inner.tasks.push(StoredTask {
                    project_id: input.project_id,
                    task,
                    label_ids: input.label_ids,
                });
                to_json(&resolve(&inner, inner.tasks.len() - 1))
            }
            Operation::UpdateTask => {
                let input: UpdateTaskInput = input(variables)?;
                let at = inner.tick();
                let index = inner
                    .tasks
                    .iter()
                    .position(|stored| stored.task.id == input.id)
                    .ok_or_else(|| not_found("task"))?;
                let stored = &mut inner.tasks[index];
                if let Some(title) = input.title.as_set() {
                    stored.task.title = title.clone();
                }
                stored.task.description = input.description.apply_to(stored.task.description.take());
                if let Some(status) = input.status {
                    stored.task.status = status;
                    stored.task.completed_at = (status == TaskStatus::Done).then_some(at);
                }
                if let Some(priority) = input.priority {
                    stored.task.priority = priority;
                }
                stored.task.start_at = input.start_at.apply_to(stored.task.start_at);
                stored.task.due_at = input.due_at.apply_to(stored.task.due_at);
                if let Some(label_ids) = input.label_ids {
                    stored.label_ids = label_ids;
                }
                stored.task.updated_at = at;
                to_json(&resolve(&inner, index))
            }
            Operation::DeleteTask => {
                let id = id_var(variables)?;
                let before = inner.tasks.len();
                inner
                    .tasks
                    .retain(|stored| stored.task.id != id && stored.task.parent_task_id.as_deref() != Some(id.as_str()));
                if inner.tasks.len() == before {
                    return Err(not_found("task"));
                }
                json!({ "id": id, "deletedAt": inner.tick() })
            }
        };
        Ok(json!({ operation.root_field(): payload }))
    }
}

impl RemoteStore for FakeRemote {
    async fn execute(&self, operation: Operation, variables: Value) -> Result<Value, SyncError> {
        let failure = {
            let mut inner = self.inner.borrow_mut();
            inner.calls.push((operation, variables.clone()));
            let position = inner.failures.iter().position(|(op, _)| *op == operation);
            position.and_then(|index| inner.failures.remove(index))
        };
        match failure {
            Some((_, Failure::Operation(message))) => Err(SyncError::operation(message)),
            Some((_, Failure::Transport(status))) => Err(SyncError::Transport { status }),
            None => self.respond(operation, &variables),
        }
    }
}

/// Session over a fresh fake, in UTC with default page sizes.
pub fn session(remote: FakeRemote) -> Session<FakeRemote> {
    Session::new(remote, AppState::new(chrono_tz::UTC), PageSizes::default())
}

fn blank_task(
    id: &str,
    parent: Option<&str>,
    title: &str,
    status: TaskStatus,
    priority: TaskPriority,
    at: DateTime<Utc>,
) -> Task {
    Task {
        id: id.to_string(),
        parent_task_id: parent.map(str::to_string),
        title: title.to_string(),
        description: None,
        status,
        priority,
        start_at: None,
        due_at: None,
        completed_at: None,
        created_at: at,
        updated_at: at,
        labels: vec![],
        subtasks: vec![],
    }
}

fn resolve(inner: &Inner, index: usize) -> Task {
    let stored = &inner.tasks[index];
    let mut task = stored.task.clone();
    task.labels = stored
        .label_ids
        .iter()
        .filter_map(|id| inner.labels.iter().find(|label| label.id == *id))
        .map(|label| LabelRef {
            id: label.id.clone(),
            name: label.name.clone(),
        })
        .collect();
    task
}

/// Root tasks matching the filters, each with every one of its subtasks.
fn fetch_tasks(inner: &Inner, variables: &Value) -> Result<Vec<Task>, SyncError> {
    let project_id = variables
        .get("projectId")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_input("projectId is required"))?;
    let statuses: Vec<TaskStatus> = list_var(variables, "statuses")?;
    let priorities: Vec<TaskPriority> = list_var(variables, "priorities")?;
    let first = page_size(variables);

    let roots = inner
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, stored)| stored.project_id == project_id && stored.task.is_root())
        .filter(|(_, stored)| statuses.is_empty() || statuses.contains(&stored.task.status))
        .filter(|(_, stored)| priorities.is_empty() || priorities.contains(&stored.task.priority))
        .take(first)
        .map(|(index, stored)| {
            let mut root = resolve(inner, index);
            root.subtasks = inner
                .tasks
                .iter()
                .enumerate()
                .filter(|(_, sub)| sub.task.parent_task_id.as_deref() == Some(stored.task.id.as_str()))
                .map(|(sub_index, _)| resolve(inner, sub_index))
                .collect();
            root
        })
        .collect();
    Ok(roots)
}

fn input<T: DeserializeOwned>(variables: &Value) -> Result<T, SyncError> {
    let raw = variables
        .get("input")
        .cloned()
        .ok_or_else(|| bad_input("input is required"))?;
    serde_json::from_value(raw).map_err(|err| bad_input(&err.to_string()))
}

fn list_var<T: DeserializeOwned>(variables: &Value, key: &str) -> Result<Vec<T>, SyncError> {
    match variables.get(key) {
        None | Some(Value::Null) => Ok(vec![]),
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|err| bad_input(&err.to_string())),
    }
}

fn id_var(variables: &Value) -> Result<String, SyncError> {
    variables
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| bad_input("id is required"))
}

fn page_size(variables: &Value) -> usize {
    variables
        .get("first")
        .and_then(Value::as_u64)
        .map_or(usize::MAX, |first| first as usize)
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("fake payload serializes")
}

fn not_found(what: &str) -> SyncError {
    SyncError::Operation {
        message: format!("{what} not found"),
        code: Some("NOT_FOUND".to_string()),
    }
}

fn bad_input(message: &str) -> SyncError {
    SyncError::Operation {
        message: message.to_string(),
        code: Some("BAD_USER_INPUT".to_string()),
    }
}
