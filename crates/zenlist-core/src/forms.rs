//! Editable drafts derived from the cache and the current selection.
//!
//! Drafts hold plain text the way an input widget would. Converting a draft
//! into a mutation input is where blank handling happens: create inputs send
//! `null` for blank optional fields, update inputs omit them.

use chrono_tz::Tz;
use zenlist_shared::{
    CreateLabelInput, CreateProjectInput, CreateTaskInput, FieldEdit, Label, Profile, Project, Task,
    TaskPriority, TaskStatus, UpdateLabelInput, UpdateProjectInput, UpdateTaskInput,
    UpsertProfileInput,
};

use crate::datetime::{from_local_input, to_local_input_opt};
use crate::error::SyncError;
use crate::filter::toggle_membership;

pub const DEFAULT_PROFILE_NAME: &str = "ZenList User";
pub const DEFAULT_PROFILE_EMAIL: &str = "user@zenlist.local";
pub const DEFAULT_PROFILE_TIMEZONE: &str = "UTC";

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn sparse(value: &str, clear: bool) -> FieldEdit<String> {
    match non_blank(value) {
        Some(value) => FieldEdit::Set(value),
        None if clear => FieldEdit::Clear,
        None => FieldEdit::Unchanged,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub name: String,
    pub email: String,
    pub timezone: String,
    pub avatar_url: String,
}

impl Default for ProfileDraft {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            email: DEFAULT_PROFILE_EMAIL.to_string(),
            timezone: DEFAULT_PROFILE_TIMEZONE.to_string(),
            avatar_url: String::new(),
        }
    }
}

impl ProfileDraft {
    pub fn from_profile(profile: &Profile) -> Self {
        let timezone = non_blank(&profile.timezone).unwrap_or_else(|| DEFAULT_PROFILE_TIMEZONE.to_string());
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            timezone,
            avatar_url: profile.avatar_url.clone().unwrap_or_default(),
        }
    }

    pub fn to_input(&self) -> UpsertProfileInput {
        UpsertProfileInput {
            name: self.name.clone(),
            email: self.email.clone(),
            timezone: self.timezone.clone(),
            avatar_url: non_blank(&self.avatar_url),
        }
    }
}

/// Title, description and color; used for both the create and the update form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub color: String,
}

impl ProjectDraft {
    pub fn from_project(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone().unwrap_or_default(),
            color: project.color.clone().unwrap_or_default(),
        }
    }

    /// `None` while the required title is blank.
    pub fn to_create_input(&self) -> Option<CreateProjectInput> {
        Some(CreateProjectInput {
            title: non_blank(&self.title)?,
            description: non_blank(&self.description),
            color: non_blank(&self.color),
        })
    }

    pub fn to_update_input(&self, id: &str) -> UpdateProjectInput {
        UpdateProjectInput {
            id: id.to_string(),
            title: sparse(&self.title, false),
            description: sparse(&self.description, false),
            color: sparse(&self.color, false),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDraft {
    pub name: String,
}

impl LabelDraft {
    pub fn from_label(label: &Label) -> Self {
        Self {
            name: label.name.clone(),
        }
    }

    pub fn to_create_input(&self) -> Option<CreateLabelInput> {
        Some(CreateLabelInput {
            name: non_blank(&self.name)?,
        })
    }

    pub fn to_update_input(&self, id: &str) -> Option<UpdateLabelInput> {
        Some(UpdateLabelInput {
            id: id.to_string(),
            name: non_blank(&self.name)?,
        })
    }
}

/// Optional fields an update should explicitly clear when their draft is blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearFields {
    pub description: bool,
    pub start_at: bool,
    pub due_at: bool,
    pub labels: bool,
}

/// Task, subtask and task-update form. `status` and `priority` model
/// controlled selects, so `None` means "nothing chosen".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Only meaningful for the subtask create form.
    pub parent_task_id: String,
    pub title: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Local editable text, see [`crate::datetime::LOCAL_INPUT_FORMAT`].
    pub start_at: String,
    pub due_at: String,
    pub label_ids: Vec<String>,
}

impl TaskDraft {
    pub fn for_create() -> Self {
        Self {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::P3),
            ..Self::default()
        }
    }

    pub fn from_task(task: &Task, tz: &Tz) -> Self {
        Self {
            parent_task_id: String::new(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            status: Some(task.status),
            priority: Some(task.priority),
            start_at: to_local_input_opt(task.start_at, tz),
            due_at: to_local_input_opt(task.due_at, tz),
            label_ids: task.label_ids(),
        }
    }

    pub fn toggle_label(&mut self, label_id: impl Into<String>) {
        toggle_membership(&mut self.label_ids, label_id.into());
    }

    /// `Ok(None)` while the required title is blank.
    pub fn to_create_input(&self, project_id: &str, tz: &Tz) -> Result<Option<CreateTaskInput>, SyncError> {
        let Some(title) = non_blank(&self.title) else {
            return Ok(None);
        };

        Ok(Some(CreateTaskInput {
            project_id: project_id.to_string(),
            parent_task_id: non_blank(&self.parent_task_id),
            title,
            description: non_blank(&self.description),
            status: self.status.unwrap_or(TaskStatus::Todo),
            priority: self.priority.unwrap_or(TaskPriority::P3),
            start_at: from_local_input(&self.start_at, tz, "startAt")?,
            due_at: from_local_input(&self.due_at, tz, "dueAt")?,
            label_ids: self.label_ids.clone(),
        }))
    }

    pub fn to_update_input(&self, id: &str, tz: &Tz) -> Result<UpdateTaskInput, SyncError> {
        self.to_update_input_with_clears(id, tz, ClearFields::default())
    }

    /// Sparse update: blank text is left unchanged unless `clear` asks for
    /// an explicit null.
    pub fn to_update_input_with_clears(
        &self,
        id: &str,
        tz: &Tz,
        clear: ClearFields,
    ) -> Result<UpdateTaskInput, SyncError> {
        let date = |text: &str, field: &'static str, clear: bool| -> Result<FieldEdit<_>, SyncError> {
            Ok(match from_local_input(text, tz, field)? {
                Some(instant) => FieldEdit::Set(instant),
                None if clear => FieldEdit::Clear,
                None => FieldEdit::Unchanged,
            })
        };

        let label_ids = if !self.label_ids.is_empty() {
            Some(self.label_ids.clone())
        } else if clear.labels {
            Some(Vec::new())
        } else {
            None
        };

        Ok(UpdateTaskInput {
            id: id.to_string(),
            title: sparse(&self.title, false),
            description: sparse(&self.description, clear.description),
            status: self.status,
            priority: self.priority,
            start_at: date(&self.start_at, "startAt", clear.start_at)?,
            due_at: date(&self.due_at, "dueAt", clear.due_at)?,
            label_ids,
        })
    }
}

/// Every draft the client holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forms {
    pub profile: ProfileDraft,
    pub project_create: ProjectDraft,
    pub project_update: ProjectDraft,
    pub label_create: LabelDraft,
    pub label_update: LabelDraft,
    pub task_create: TaskDraft,
    pub subtask_create: TaskDraft,
    pub task_update: TaskDraft,
}

impl Default for Forms {
    fn default() -> Self {
        Self {
            profile: ProfileDraft::default(),
            project_create: ProjectDraft::default(),
            project_update: ProjectDraft::default(),
            label_create: LabelDraft::default(),
            label_update: LabelDraft::default(),
            task_create: TaskDraft::for_create(),
            subtask_create: TaskDraft::for_create(),
            task_update: TaskDraft::default(),
        }
    }
}

impl Forms {
    pub fn sync_project_update(&mut self, project: Option<&Project>) {
        self.project_update = project.map(ProjectDraft::from_project).unwrap_or_default();
    }

    pub fn sync_label_update(&mut self, label: Option<&Label>) {
        self.label_update = label.map(LabelDraft::from_label).unwrap_or_default();
    }

    pub fn sync_task_update(&mut self, task: Option<&Task>, tz: &Tz) {
        self.task_update = task
            .map(|task| TaskDraft::from_task(task, tz))
            .unwrap_or_default();
    }
}
