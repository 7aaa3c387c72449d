//! User actions wrapped in the busy/notice envelope.
//!
//! Every action is an explicit sequence of awaited remote calls. The
//! envelope in [`Session::finish`] is the one place where a result turns
//! into a notice; a missing selection skips the action without touching
//! the notice at all.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use zenlist_shared::{DeleteResult, Label, Profile, Project, Task};

use crate::cache::{fetch_labels, fetch_profile, fetch_projects, fetch_tasks};
use crate::config::PageSizes;
use crate::error::SyncError;
use crate::forms::ClearFields;
use crate::remote::{Operation, RemoteStore, take_field};
use crate::state::{AppState, DraftSlot, Transition};

/// How an action ended, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    /// A required selection was missing; nothing ran.
    Skipped,
    Failed,
    /// Another action was in flight; no remote call was made.
    Rejected,
}

impl ActionOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, ActionOutcome::Failed | ActionOutcome::Rejected)
    }
}

pub struct Session<R> {
    remote: R,
    state: AppState,
    pages: PageSizes,
}

impl<R: RemoteStore> Session<R> {
    pub fn new(remote: R, state: AppState, pages: PageSizes) -> Self {
        Self {
            remote,
            state,
            pages,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    /// Drops a busy flag left behind by an action future that was dropped
    /// before it finished. Returns the abandoned action's name.
    pub fn abandon_in_flight(&mut self) -> Option<String> {
        let running = self.state.activity.in_flight.clone()?;
        warn!(action = %running, "abandoning unfinished action");
        self.dispatch(Transition::ActionAbandoned);
        Some(running)
    }

    /// Applies one transition to the state value.
    pub fn dispatch(&mut self, transition: Transition) {
        let state = std::mem::take(&mut self.state);
        self.state = state.apply(transition);
    }

    // Refreshes. Each is one remote call followed by a wholesale replace.

    #[instrument(skip(self))]
    pub async fn refresh_profile(&mut self) -> Result<(), SyncError> {
        let profile = fetch_profile(&self.remote).await?;
        self.dispatch(Transition::ProfileReplaced(profile));
        Ok(())
    }

    /// Returns `true` when re-validation moved the project selection.
    #[instrument(skip(self))]
    pub async fn refresh_projects(&mut self) -> Result<bool, SyncError> {
        let before = self.state.selection.project_id.clone();
        let projects = fetch_projects(&self.remote, self.pages.projects).await?;
        self.dispatch(Transition::ProjectsReplaced(projects));
        Ok(self.state.selection.project_id != before)
    }

    #[instrument(skip(self))]
    pub async fn refresh_labels(&mut self) -> Result<(), SyncError> {
        let labels = fetch_labels(&self.remote, self.pages.labels).await?;
        self.dispatch(Transition::LabelsReplaced(labels));
        Ok(())
    }

    /// Task refresh scoped to the selected project and the active filters.
    pub async fn refresh_tasks(&mut self) -> Result<(), SyncError> {
        let project_id = self.state.selection.project_id.clone();
        self.refresh_tasks_for(project_id.as_deref()).await
    }

    /// Without a project this empties the task collection and makes no call.
    #[instrument(skip(self))]
    pub async fn refresh_tasks_for(&mut self, project_id: Option<&str>) -> Result<(), SyncError> {
        let Some(project_id) = project_id else {
            self.dispatch(Transition::TasksCleared);
            return Ok(());
        };
        let tasks = fetch_tasks(&self.remote, project_id, &self.state.filter, self.pages.tasks).await?;
        self.dispatch(Transition::TasksReplaced(tasks));
        Ok(())
    }

    // Envelope.

    fn begin(&mut self, action: &str) -> bool {
        if let Some(running) = self.state.activity.in_flight.clone() {
            let err = SyncError::Busy { running };
            warn!(action, error = %err, "action rejected");
            self.dispatch(Transition::ActionRejected {
                action: action.to_string(),
                message: err.to_string(),
            });
            return false;
        }
        debug!(action, "action started");
        self.dispatch(Transition::ActionStarted(action.to_string()));
        true
    }

    fn finish(&mut self, action: &str, result: Result<String, SyncError>) -> ActionOutcome {
        match result {
            Ok(message) => {
                info!(action, %message, "action succeeded");
                self.dispatch(Transition::ActionSucceeded {
                    action: action.to_string(),
                    message,
                });
                ActionOutcome::Succeeded
            }
            Err(err) => {
                warn!(action, error = %err, "action failed");
                self.dispatch(Transition::ActionFailed {
                    action: action.to_string(),
                    message: err.to_string(),
                });
                ActionOutcome::Failed
            }
        }
    }

    /// Validation gaps skip silently; any other precondition error is
    /// reported as the action's failure.
    fn decline(&mut self, action: &str, err: SyncError) -> ActionOutcome {
        if err.is_skip() {
            debug!(action, reason = %err, "action skipped");
            return ActionOutcome::Skipped;
        }
        if !self.begin(action) {
            return ActionOutcome::Rejected;
        }
        self.finish(action, Err(err))
    }

    async fn mutate<I, T>(&self, operation: Operation, input: &I) -> Result<T, SyncError>
    where
        I: Serialize,
        T: DeserializeOwned,
    {
        let input = serde_json::to_value(input).map_err(SyncError::Encode)?;
        let data = self.remote.execute(operation, json!({ "input": input })).await?;
        take_field(operation, data)
    }

    async fn delete(&self, operation: Operation, id: &str) -> Result<DeleteResult, SyncError> {
        let data = self.remote.execute(operation, json!({ "id": id })).await?;
        let deleted: DeleteResult = take_field(operation, data)?;
        debug!(id = %deleted.id, deleted_at = %deleted.deleted_at, "deletion confirmed");
        Ok(deleted)
    }

    fn selected_project_id(&self, action: &'static str) -> Result<String, SyncError> {
        self.state
            .selection
            .project_id
            .clone()
            .ok_or(SyncError::ValidationGap {
                action,
                requirement: "a selected project",
            })
    }

    fn selected_label_id(&self, action: &'static str) -> Result<String, SyncError> {
        self.state
            .selection
            .label_id
            .clone()
            .ok_or(SyncError::ValidationGap {
                action,
                requirement: "a selected label",
            })
    }

    fn selected_task_id(&self, action: &'static str) -> Result<String, SyncError> {
        self.state
            .selection
            .task_id
            .clone()
            .ok_or(SyncError::ValidationGap {
                action,
                requirement: "a selected task",
            })
    }

    // Loading actions.

    /// Profile, then projects, then labels. A project selection moved
    /// during the load triggers a separate task load, even when a later
    /// step of the load failed.
    #[instrument(skip(self))]
    pub async fn bootstrap(&mut self) -> ActionOutcome {
        const ACTION: &str = "initial load";
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let before = self.state.selection.project_id.clone();
        let result = self.load_all().await;
        let moved = self.state.selection.project_id != before;
        let outcome = self.finish(ACTION, result.map(|()| "data loaded".to_string()));
        if !moved {
            return outcome;
        }
        let tasks = self.load_tasks().await;
        if outcome.is_failure() { outcome } else { tasks }
    }

    async fn load_all(&mut self) -> Result<(), SyncError> {
        self.refresh_profile().await?;
        self.refresh_projects().await?;
        self.refresh_labels().await
    }

    #[instrument(skip(self))]
    pub async fn refresh_all(&mut self) -> ActionOutcome {
        const ACTION: &str = "refresh";
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            self.load_all().await?;
            self.refresh_tasks().await?;
            Ok::<_, SyncError>("all data refreshed".to_string())
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn reload_tasks(&mut self) -> ActionOutcome {
        self.task_load("reload tasks").await
    }

    async fn load_tasks(&mut self) -> ActionOutcome {
        self.task_load("tasks").await
    }

    async fn task_load(&mut self, action: &'static str) -> ActionOutcome {
        if let Err(err) = self.selected_project_id(action) {
            // The collection still has to follow the empty selection.
            self.dispatch(Transition::TasksCleared);
            return self.decline(action, err);
        }
        if !self.begin(action) {
            return ActionOutcome::Rejected;
        }
        let result = self
            .refresh_tasks()
            .await
            .map(|()| format!("{} tasks loaded", self.state.all_tasks().len()));
        self.finish(action, result)
    }

    /// Selects a project (or none) and loads its tasks when the selection moved.
    /// An id missing from the cache fails and leaves the selection alone.
    #[instrument(skip(self))]
    pub async fn select_project(&mut self, id: Option<String>) -> ActionOutcome {
        if let Some(unknown) = id.as_deref().filter(|id| self.state.cache.project(id).is_none()) {
            let err = SyncError::InvalidInput {
                field: "project",
                message: format!("no project with id {unknown}"),
            };
            return self.decline("tasks", err);
        }
        let before = self.state.selection.project_id.clone();
        self.dispatch(Transition::ProjectSelected(id));
        if self.state.selection.project_id == before {
            return ActionOutcome::Succeeded;
        }
        self.load_tasks().await
    }

    pub fn select_label(&mut self, id: Option<String>) {
        self.dispatch(Transition::LabelSelected(id));
    }

    pub fn select_task(&mut self, id: Option<String>) {
        self.dispatch(Transition::TaskSelected(id));
    }

    #[instrument(skip(self))]
    pub async fn apply_filters(&mut self) -> ActionOutcome {
        const ACTION: &str = "tasks filter";
        if let Err(err) = self.selected_project_id(ACTION) {
            return self.decline(ACTION, err);
        }
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = self.refresh_tasks().await.map(|()| {
            let filter = &self.state.filter;
            if filter.is_empty() {
                "filters cleared".to_string()
            } else {
                format!(
                    "{} statuses and {} priorities applied",
                    filter.statuses.len(),
                    filter.priorities.len()
                )
            }
        });
        self.finish(ACTION, result)
    }

    // Profile.

    #[instrument(skip(self))]
    pub async fn upsert_profile(&mut self) -> ActionOutcome {
        const ACTION: &str = "upsertProfile";
        let input = self.state.forms.profile.to_input();
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let profile: Profile = self.mutate(Operation::UpsertProfile, &input).await?;
            debug!(id = %profile.id, "profile saved");
            self.refresh_profile().await?;
            Ok::<_, SyncError>("profile saved".to_string())
        }
        .await;
        self.finish(ACTION, result)
    }

    // Projects.

    #[instrument(skip(self))]
    pub async fn create_project(&mut self) -> ActionOutcome {
        const ACTION: &str = "createProject";
        let Some(input) = self.state.forms.project_create.to_create_input() else {
            return self.decline(ACTION, blank("title"));
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let project: Project = self.mutate(Operation::CreateProject, &input).await?;
            self.dispatch(Transition::DraftReset(DraftSlot::ProjectCreate));
            self.refresh_projects().await?;
            self.refresh_tasks().await?;
            Ok::<_, SyncError>(format!("project {} created", project.title))
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn update_project(&mut self) -> ActionOutcome {
        const ACTION: &str = "updateProject";
        let id = match self.selected_project_id(ACTION) {
            Ok(id) => id,
            Err(err) => return self.decline(ACTION, err),
        };
        let input = self.state.forms.project_update.to_update_input(&id);
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let project: Project = self.mutate(Operation::UpdateProject, &input).await?;
            self.refresh_projects().await?;
            let selected = self.state.selection.project_id.clone();
            self.dispatch(Transition::ProjectSelected(selected));
            self.refresh_tasks().await?;
            Ok::<_, SyncError>(format!("project {} updated", project.title))
        }
        .await;
        self.finish(ACTION, result)
    }

    /// Deleting the selected project falls back to the first remaining one,
    /// whose tasks are loaded as a separate action.
    #[instrument(skip(self))]
    pub async fn delete_project(&mut self) -> ActionOutcome {
        const ACTION: &str = "deleteProject";
        let id = match self.selected_project_id(ACTION) {
            Ok(id) => id,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            self.delete(Operation::DeleteProject, &id).await?;
            self.dispatch(Transition::ProjectSelected(None));
            self.dispatch(Transition::TasksCleared);
            self.refresh_projects().await?;
            Ok::<_, SyncError>("project deleted".to_string())
        }
        .await;
        let outcome = self.finish(ACTION, result);
        if outcome == ActionOutcome::Succeeded && self.state.selection.project_id.is_some() {
            return self.load_tasks().await;
        }
        outcome
    }

    // Labels.

    #[instrument(skip(self))]
    pub async fn create_label(&mut self) -> ActionOutcome {
        const ACTION: &str = "createLabel";
        let Some(input) = self.state.forms.label_create.to_create_input() else {
            return self.decline(ACTION, blank("name"));
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let label: Label = self.mutate(Operation::CreateLabel, &input).await?;
            self.dispatch(Transition::DraftReset(DraftSlot::LabelCreate));
            self.refresh_labels().await?;
            Ok::<_, SyncError>(format!("label {} created", label.name))
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn update_label(&mut self) -> ActionOutcome {
        const ACTION: &str = "updateLabel";
        let input = self.selected_label_id(ACTION).and_then(|id| {
            self.state
                .forms
                .label_update
                .to_update_input(&id)
                .ok_or_else(|| blank("name"))
        });
        let input = match input {
            Ok(input) => input,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let label: Label = self.mutate(Operation::UpdateLabel, &input).await?;
            self.refresh_labels().await?;
            let selected = self.state.selection.label_id.clone();
            self.dispatch(Transition::LabelSelected(selected));
            self.refresh_tasks().await?;
            Ok::<_, SyncError>(format!("label {} updated", label.name))
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn delete_label(&mut self) -> ActionOutcome {
        const ACTION: &str = "deleteLabel";
        let id = match self.selected_label_id(ACTION) {
            Ok(id) => id,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            self.delete(Operation::DeleteLabel, &id).await?;
            self.refresh_labels().await?;
            self.refresh_tasks().await?;
            Ok::<_, SyncError>("label deleted".to_string())
        }
        .await;
        self.finish(ACTION, result)
    }

    // Tasks.

    #[instrument(skip(self))]
    pub async fn create_task(&mut self) -> ActionOutcome {
        const ACTION: &str = "createTask";
        let tz = *self.state.timezone();
        let input = self.selected_project_id(ACTION).and_then(|project_id| {
            self.state
                .forms
                .task_create
                .to_create_input(&project_id, &tz)?
                .ok_or_else(|| blank("title"))
        });
        let input = match input {
            Ok(input) => input,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let task: Task = self.mutate(Operation::CreateTask, &input).await?;
            self.dispatch(Transition::DraftReset(DraftSlot::TaskCreate));
            self.refresh_tasks().await?;
            Ok::<_, SyncError>(format!("task {} created", task.title))
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn create_subtask(&mut self) -> ActionOutcome {
        const ACTION: &str = "createSubtask";
        let tz = *self.state.timezone();
        let input = self.selected_project_id(ACTION).and_then(|project_id| {
            let draft = &self.state.forms.subtask_create;
            if draft.parent_task_id.trim().is_empty() {
                return Err(SyncError::ValidationGap {
                    action: ACTION,
                    requirement: "a parent task",
                });
            }
            draft
                .to_create_input(&project_id, &tz)?
                .ok_or_else(|| blank("title"))
        });
        let input = match input {
            Ok(input) => input,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let task: Task = self.mutate(Operation::CreateTask, &input).await?;
            self.dispatch(Transition::DraftReset(DraftSlot::SubtaskCreate));
            self.refresh_tasks().await?;
            Ok::<_, SyncError>(format!("subtask {} created", task.title))
        }
        .await;
        self.finish(ACTION, result)
    }

    pub async fn update_task(&mut self) -> ActionOutcome {
        self.update_task_with_clears(ClearFields::default()).await
    }

    /// Like [`Session::update_task`], nulling the fields `clear` names when
    /// their draft text is blank.
    #[instrument(skip(self))]
    pub async fn update_task_with_clears(&mut self, clear: ClearFields) -> ActionOutcome {
        const ACTION: &str = "updateTask";
        let tz = *self.state.timezone();
        let input = self.selected_task_id(ACTION).and_then(|id| {
            self.state
                .forms
                .task_update
                .to_update_input_with_clears(&id, &tz, clear)
        });
        let input = match input {
            Ok(input) => input,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            let task: Task = self.mutate(Operation::UpdateTask, &input).await?;
            self.refresh_tasks().await?;
            self.dispatch(Transition::TaskDraftResynced);
            Ok::<_, SyncError>(format!("task {} updated", task.title))
        }
        .await;
        self.finish(ACTION, result)
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&mut self) -> ActionOutcome {
        const ACTION: &str = "deleteTask";
        let id = match self.selected_task_id(ACTION) {
            Ok(id) => id,
            Err(err) => return self.decline(ACTION, err),
        };
        if !self.begin(ACTION) {
            return ActionOutcome::Rejected;
        }
        let result = async {
            self.delete(Operation::DeleteTask, &id).await?;
            self.dispatch(Transition::TaskSelected(None));
            self.refresh_tasks().await?;
            Ok::<_, SyncError>("task deleted".to_string())
        }
        .await;
        self.finish(ACTION, result)
    }
}

fn blank(field: &'static str) -> SyncError {
    SyncError::InvalidInput {
        field,
        message: "must not be blank".to_string(),
    }
}
