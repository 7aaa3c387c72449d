use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::error::SyncError;

const USER_AGENT: &str = concat!("zenlist/", env!("CARGO_PKG_VERSION"));

const TASK_FIELDS: &str = "
      id
      parentTaskId
      title
      description
      status
      priority
      startAt
      dueAt
      completedAt
      createdAt
      updatedAt
      labels {
        id
        name
      }";

/// Every query and mutation the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchProfile,
    FetchProjects,
    FetchLabels,
    FetchTasks,
    UpsertProfile,
    CreateProject,
    UpdateProject,
    DeleteProject,
    CreateLabel,
    UpdateLabel,
    DeleteLabel,
    CreateTask,
    UpdateTask,
    DeleteTask,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::FetchProfile => "fetch-profile",
            Operation::FetchProjects => "fetch-projects",
            Operation::FetchLabels => "fetch-labels",
            Operation::FetchTasks => "fetch-tasks",
            Operation::UpsertProfile => "upsert-profile",
            Operation::CreateProject => "create-project",
            Operation::UpdateProject => "update-project",
            Operation::DeleteProject => "delete-project",
            Operation::CreateLabel => "create-label",
            Operation::UpdateLabel => "update-label",
            Operation::DeleteLabel => "delete-label",
            Operation::CreateTask => "create-task",
            Operation::UpdateTask => "update-task",
            Operation::DeleteTask => "delete-task",
        }
    }

    pub fn operation_name(self) -> &'static str {
        match self {
            Operation::FetchProfile => "Me",
            Operation::FetchProjects => "Projects",
            Operation::FetchLabels => "Labels",
            Operation::FetchTasks => "Tasks",
            Operation::UpsertProfile => "UpsertMe",
            Operation::CreateProject => "CreateProject",
            Operation::UpdateProject => "UpdateProject",
            Operation::DeleteProject => "DeleteProject",
            Operation::CreateLabel => "CreateLabel",
            Operation::UpdateLabel => "UpdateLabel",
            Operation::DeleteLabel => "DeleteLabel",
            Operation::CreateTask => "CreateTask",
            Operation::UpdateTask => "UpdateTask",
            Operation::DeleteTask => "DeleteTask",
        }
    }

    /// Field of `data` holding the operation's payload.
    pub fn root_field(self) -> &'static str {
        match self {
            Operation::FetchProfile => "me",
            Operation::FetchProjects => "projects",
            Operation::FetchLabels => "labels",
            Operation::FetchTasks => "tasks",
            Operation::UpsertProfile => "upsertMe",
            Operation::CreateProject => "createProject",
            Operation::UpdateProject => "updateProject",
            Operation::DeleteProject => "deleteProject",
            Operation::CreateLabel => "createLabel",
            Operation::UpdateLabel => "updateLabel",
            Operation::DeleteLabel => "deleteLabel",
            Operation::CreateTask => "createTask",
            Operation::UpdateTask => "updateTask",
            Operation::DeleteTask => "deleteTask",
        }
    }

    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            Operation::FetchProfile
                | Operation::FetchProjects
                | Operation::FetchLabels
                | Operation::FetchTasks
        )
    }

    pub fn document(self) -> String {
        const PROFILE: &str = "id name email timezone avatarUrl createdAt updatedAt";
        const PROJECT: &str = "id title description color createdAt updatedAt";
        const LABEL: &str = "id name createdAt updatedAt";
        const DELETED: &str = "id deletedAt";

        match self {
            Operation::FetchProfile => format!("query Me {{ me {{ {PROFILE} }} }}"),
            Operation::FetchProjects => format!(
                "query Projects($first: Int) {{ projects(first: $first) {{ edges {{ node {{ {PROJECT} }} }} }} }}"
            ),
            Operation::FetchLabels => format!(
                "query Labels($first: Int) {{ labels(first: $first) {{ edges {{ node {{ {LABEL} }} }} }} }}"
            ),
            Operation::FetchTasks => format!(
                "query Tasks($projectId: ID!, $statuses: [TaskStatus!], $priorities: [TaskPriority!], $first: Int) {{
  tasks(projectId: $projectId, statuses: $statuses, priorities: $priorities, first: $first) {{
    edges {{
      node {{{TASK_FIELDS}
        subtasks {{{TASK_FIELDS}
        }}
      }}
    }}
  }}
}}"
            ),
            Operation::UpsertProfile => format!(
                "mutation UpsertMe($input: UpsertMeInput!) {{ upsertMe(input: $input) {{ {PROFILE} }} }}"
            ),
            Operation::CreateProject => format!(
                "mutation CreateProject($input: CreateProjectInput!) {{ createProject(input: $input) {{ {PROJECT} }} }}"
            ),
            Operation::UpdateProject => format!(
                "mutation UpdateProject($input: UpdateProjectInput!) {{ updateProject(input: $input) {{ {PROJECT} }} }}"
            ),
            Operation::DeleteProject => format!(
                "mutation DeleteProject($id: ID!) {{ deleteProject(id: $id) {{ {DELETED} }} }}"
            ),
            Operation::CreateLabel => format!(
                "mutation CreateLabel($input: CreateLabelInput!) {{ createLabel(input: $input) {{ {LABEL} }} }}"
            ),
            Operation::UpdateLabel => format!(
                "mutation UpdateLabel($input: UpdateLabelInput!) {{ updateLabel(input: $input) {{ {LABEL} }} }}"
            ),
            Operation::DeleteLabel => format!(
                "mutation DeleteLabel($id: ID!) {{ deleteLabel(id: $id) {{ {DELETED} }} }}"
            ),
            Operation::CreateTask => format!(
                "mutation CreateTask($input: CreateTaskInput!) {{ createTask(input: $input) {{{TASK_FIELDS} }} }}"
            ),
            Operation::UpdateTask => format!(
                "mutation UpdateTask($input: UpdateTaskInput!) {{ updateTask(input: $input) {{{TASK_FIELDS} }} }}"
            ),
            Operation::DeleteTask => format!(
                "mutation DeleteTask($id: ID!) {{ deleteTask(id: $id) {{ {DELETED} }} }}"
            ),
        }
    }
}

/// The graph API as seen by the sync layer: one round trip per call,
/// returning the response's `data` object.
pub trait RemoteStore {
    fn execute(
        &self,
        operation: Operation,
        variables: Value,
    ) -> impl Future<Output = Result<Value, SyncError>>;
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    fn code(&self) -> Option<String> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Turns a raw HTTP exchange into `data` or a classified failure.
///
/// Operation errors in the body take precedence over the status code, so a
/// 4xx carrying `errors` still surfaces the server's first message.
pub fn classify_response(status: u16, body: &[u8]) -> Result<Value, SyncError> {
    let success = (200..300).contains(&status);
    let envelope = match serde_json::from_slice::<GraphqlResponse>(body) {
        Ok(envelope) => envelope,
        Err(err) if success => {
            return Err(SyncError::Decode {
                operation: "graphql",
                source: err,
            });
        }
        Err(_) => return Err(SyncError::Transport { status }),
    };

    if let Some(first) = envelope.errors.first() {
        let message = if first.message.trim().is_empty() {
            format!("request failed: {status}")
        } else {
            first.message.clone()
        };
        return Err(SyncError::Operation {
            message,
            code: first.code(),
        });
    }

    if !success {
        return Err(SyncError::Transport { status });
    }

    match envelope.data {
        Some(Value::Null) | None => Err(SyncError::operation("response carried no data")),
        Some(data) => Ok(data),
    }
}

/// Pulls the operation's root field out of `data` and decodes it.
pub fn take_field<T: DeserializeOwned>(operation: Operation, mut data: Value) -> Result<T, SyncError> {
    let field = operation.root_field();
    let value = data
        .get_mut(field)
        .map(Value::take)
        .filter(|value| !value.is_null())
        .ok_or(SyncError::MissingField {
            operation: operation.name(),
            field,
        })?;

    serde_json::from_value(value).map_err(|source| SyncError::Decode {
        operation: operation.name(),
        source,
    })
}

/// HTTP transport for the graph endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteStore for GraphqlClient {
    #[instrument(skip(self, variables), fields(operation = operation.name(), mutation = operation.is_mutation(), endpoint = %self.endpoint))]
    async fn execute(&self, operation: Operation, variables: Value) -> Result<Value, SyncError> {
        let payload = json!({
            "query": operation.document(),
            "operationName": operation.operation_name(),
            "variables": variables,
        });
        let body = serde_json::to_vec(&payload).map_err(SyncError::Encode)?;

        let response = self
            .http
            .post(self.endpoint.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        debug!(status, bytes = bytes.len(), "graph response received");

        classify_response(status, &bytes).inspect_err(|err| {
            warn!(status, error = %err, "graph call failed");
        })
    }
}
