use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(
  rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum TaskStatus {
  Todo,
  InProgress,
  Blocked,
  Done
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 4] = [
    TaskStatus::Todo,
    TaskStatus::InProgress,
    TaskStatus::Blocked,
    TaskStatus::Done
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "TODO",
      | TaskStatus::InProgress => {
        "IN_PROGRESS"
      }
      | TaskStatus::Blocked => "BLOCKED",
      | TaskStatus::Done => "DONE"
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskStatus {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let normalized = s
      .trim()
      .to_ascii_uppercase()
      .replace('-', "_");
    TaskStatus::ALL
      .into_iter()
      .find(|status| {
        status.as_str() == normalized
      })
      .ok_or_else(|| {
        format!(
          "unknown task status: {s}"
        )
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub enum TaskPriority {
  P1,
  P2,
  P3,
  P4,
  P5
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 5] = [
    TaskPriority::P1,
    TaskPriority::P2,
    TaskPriority::P3,
    TaskPriority::P4,
    TaskPriority::P5
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::P1 => "P1",
      | TaskPriority::P2 => "P2",
      | TaskPriority::P3 => "P3",
      | TaskPriority::P4 => "P4",
      | TaskPriority::P5 => "P5"
    }
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TaskPriority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let normalized =
      s.trim().to_ascii_uppercase();
    TaskPriority::ALL
      .into_iter()
      .find(|priority| {
        priority.as_str() == normalized
      })
      .ok_or_else(|| {
        format!(
          "unknown task priority: {s}"
        )
      })
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub id:         String,
  pub name:       String,
  pub email:      String,
  pub timezone:   String,
  #[serde(default)]
  pub avatar_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id:          String,
  pub title:       String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub color:       Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Label {
  pub id:         String,
  pub name:       String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>
}

/// Label reference nested inside a task
/// payload.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct LabelRef {
  pub id:   String,
  pub name: String
}

/// A root task or a subtask. Only root
/// tasks carry `subtasks`; a subtask
/// always has `parent_task_id` set.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:             String,
  #[serde(default)]
  pub parent_task_id: Option<String>,
  pub title:          String,
  #[serde(default)]
  pub description:    Option<String>,
  pub status:         TaskStatus,
  pub priority:       TaskPriority,
  #[serde(default)]
  pub start_at:       Option<DateTime<Utc>>,
  #[serde(default)]
  pub due_at:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub completed_at:   Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  #[serde(default)]
  pub labels:         Vec<LabelRef>,
  #[serde(default)]
  pub subtasks:       Vec<Task>
}

impl Task {
  pub fn is_root(&self) -> bool {
    self.parent_task_id.is_none()
  }

  pub fn label_ids(&self) -> Vec<String> {
    self
      .labels
      .iter()
      .map(|label| label.id.clone())
      .collect()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
  pub id:         String,
  pub deleted_at: DateTime<Utc>
}

/// Relay-style list envelope returned by
/// the list queries.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct Connection<T> {
  #[serde(default = "Vec::new")]
  pub edges: Vec<Edge<T>>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct Edge<T> {
  pub node: T
}

impl<T> Connection<T> {
  pub fn from_nodes(
    nodes: Vec<T>
  ) -> Self {
    Self {
      edges: nodes
        .into_iter()
        .map(|node| Edge {
          node
        })
        .collect()
    }
  }

  pub fn into_nodes(self) -> Vec<T> {
    self
      .edges
      .into_iter()
      .map(|edge| edge.node)
      .collect()
  }
}

/// Per-field intent of a sparse update.
/// `Unchanged` is omitted from the wire
/// payload, `Clear` is sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEdit<T> {
  Unchanged,
  Clear,
  Set(T)
}

impl<T> Default for FieldEdit<T> {
  fn default() -> Self {
    FieldEdit::Unchanged
  }
}

impl<T> FieldEdit<T> {
  pub fn is_unchanged(&self) -> bool {
    matches!(self, FieldEdit::Unchanged)
  }

  pub fn as_set(&self) -> Option<&T> {
    match self {
      | FieldEdit::Set(value) => {
        Some(value)
      }
      | _ => None
    }
  }

  /// Resolves the edit against the
  /// current value.
  pub fn apply_to(
    self,
    current: Option<T>
  ) -> Option<T> {
    match self {
      | FieldEdit::Unchanged => current,
      | FieldEdit::Clear => None,
      | FieldEdit::Set(value) => {
        Some(value)
      }
    }
  }
}

impl<T: Serialize> Serialize
  for FieldEdit<T>
{
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match self {
      | FieldEdit::Set(value) => {
        value.serialize(serializer)
      }
      | FieldEdit::Unchanged
      | FieldEdit::Clear => {
        serializer.serialize_none()
      }
    }
  }
}

impl<'de, T> Deserialize<'de>
  for FieldEdit<T>
where
  T: Deserialize<'de>
{
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    Ok(
      match Option::<T>::deserialize(
        deserializer
      )? {
        | Some(value) => {
          FieldEdit::Set(value)
        }
        | None => FieldEdit::Clear
      }
    )
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileInput {
  pub name:       String,
  pub email:      String,
  pub timezone:   String,
  pub avatar_url: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
  pub title:       String,
  pub description: Option<String>,
  pub color:       Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectInput {
  pub id:          String,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub title:       FieldEdit<String>,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub description: FieldEdit<String>,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub color:       FieldEdit<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct CreateLabelInput {
  pub name: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct UpdateLabelInput {
  pub id:   String,
  pub name: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
  pub project_id:     String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub parent_task_id: Option<String>,
  pub title:          String,
  pub description:    Option<String>,
  pub status:         TaskStatus,
  pub priority:       TaskPriority,
  pub start_at:       Option<DateTime<Utc>>,
  pub due_at:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub label_ids:      Vec<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
  pub id:          String,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub title:       FieldEdit<String>,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub description: FieldEdit<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<TaskStatus>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<TaskPriority>,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub start_at:
    FieldEdit<DateTime<Utc>>,
  #[serde(
    default,
    skip_serializing_if = "FieldEdit::is_unchanged"
  )]
  pub due_at: FieldEdit<DateTime<Utc>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub label_ids:   Option<Vec<String>>
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::{
    Connection,
    FieldEdit,
    Task,
    TaskPriority,
    TaskStatus,
    UpdateTaskInput
  };

  #[test]
  fn sparse_update_omits_unchanged_fields()
  {
    let input = UpdateTaskInput {
      id: "t1".to_string(),
      title: FieldEdit::Set(
        "Ship it".to_string()
      ),
      description: FieldEdit::Clear,
      ..UpdateTaskInput::default()
    };

    let value = serde_json::to_value(
      &input
    )
    .expect("serialize input");
    assert_eq!(
      value,
      json!({
        "id": "t1",
        "title": "Ship it",
        "description": null
      })
    );
  }

  #[test]
  fn field_edit_decodes_missing_null_and_value()
   {
    let decoded: UpdateTaskInput =
      serde_json::from_value(json!({
        "id": "t1",
        "description": null,
        "title": "x"
      }))
      .expect("decode input");

    assert_eq!(
      decoded.title,
      FieldEdit::Set("x".to_string())
    );
    assert_eq!(
      decoded.description,
      FieldEdit::Clear
    );
    assert_eq!(
      decoded.due_at,
      FieldEdit::Unchanged
    );
  }

  #[test]
  fn enums_use_wire_names() {
    assert_eq!(
      serde_json::to_value(
        TaskStatus::InProgress
      )
      .expect("status"),
      json!("IN_PROGRESS")
    );
    assert_eq!(
      "in-progress"
        .parse::<TaskStatus>()
        .expect("parse status"),
      TaskStatus::InProgress
    );
    assert_eq!(
      "p2".parse::<TaskPriority>()
        .expect("parse priority"),
      TaskPriority::P2
    );
  }

  #[test]
  fn task_connection_decodes_nodes() {
    let page: Connection<Task> =
      serde_json::from_value(json!({
        "edges": [{
          "node": {
            "id": "t1",
            "title": "Plan",
            "status": "TODO",
            "priority": "P1",
            "createdAt": "2026-01-05T12:00:00Z",
            "updatedAt": "2026-01-05T12:00:00Z",
            "subtasks": [{
              "id": "t2",
              "parentTaskId": "t1",
              "title": "Draft",
              "status": "DONE",
              "priority": "P3",
              "createdAt": "2026-01-05T12:00:00Z",
              "updatedAt": "2026-01-05T12:00:00Z"
            }]
          }
        }]
      }))
      .expect("decode connection");

    let tasks = page.into_nodes();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].is_root());
    assert_eq!(
      tasks[0].subtasks[0]
        .parent_task_id
        .as_deref(),
      Some("t1")
    );

    let empty: Connection<Task> =
      serde_json::from_value(json!({}))
        .expect("decode empty");
    assert!(empty.into_nodes().is_empty());
  }
}
