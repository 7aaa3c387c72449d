//! The single state-store value and its named transitions.
//!
//! Every change to cached entities, selections, drafts, filters or the
//! action envelope goes through [`AppState::apply`], which consumes the
//! current value and returns the next one.

use chrono_tz::Tz;
use tracing::debug;
use zenlist_shared::{Label, Profile, Project, Task, TaskPriority, TaskStatus};

use crate::cache::{EntityCache, flatten_tasks};
use crate::filter::TaskFilter;
use crate::forms::{Forms, LabelDraft, ProfileDraft, ProjectDraft, TaskDraft};
use crate::selection::{ProjectRevalidation, Selection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Notice::Failure(_))
    }
}

/// Busy flag plus the single notice of the last finished action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    /// Name of the action currently in flight.
    pub in_flight: Option<String>,
    pub notice: Option<Notice>,
}

impl Activity {
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        match &self.notice {
            Some(Notice::Failure(text)) => Some(text),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.notice {
            Some(Notice::Success(text)) => Some(text),
            _ => None,
        }
    }
}

/// Draft slots addressable by edit transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskForm {
    Create,
    Subtask,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSlot {
    ProjectCreate,
    LabelCreate,
    TaskCreate,
    SubtaskCreate,
    TaskUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    ProfileReplaced(Profile),
    ProjectsReplaced(Vec<Project>),
    LabelsReplaced(Vec<Label>),
    TasksReplaced(Vec<Task>),
    TasksCleared,
    ProjectSelected(Option<String>),
    LabelSelected(Option<String>),
    TaskSelected(Option<String>),
    /// Re-derives the task update draft from the selected task.
    TaskDraftResynced,
    StatusFilterToggled(TaskStatus),
    PriorityFilterToggled(TaskPriority),
    ProfileEdited(ProfileDraft),
    ProjectCreateEdited(ProjectDraft),
    ProjectUpdateEdited(ProjectDraft),
    LabelCreateEdited(LabelDraft),
    LabelUpdateEdited(LabelDraft),
    TaskEdited(TaskForm, TaskDraft),
    TaskLabelToggled(TaskForm, String),
    DraftReset(DraftSlot),
    ActionStarted(String),
    ActionSucceeded { action: String, message: String },
    ActionFailed { action: String, message: String },
    /// An overlapping action was turned away; the running one keeps the busy flag.
    ActionRejected { action: String, message: String },
    /// Clears the busy flag of an action that will never finish; the notice stays.
    ActionAbandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub cache: EntityCache,
    pub selection: Selection,
    pub forms: Forms,
    pub filter: TaskFilter,
    pub activity: Activity,
    tz: Tz,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl AppState {
    pub fn new(tz: Tz) -> Self {
        Self {
            cache: EntityCache::default(),
            selection: Selection::default(),
            forms: Forms::default(),
            filter: TaskFilter::default(),
            activity: Activity::default(),
            tz,
        }
    }

    /// Timezone used for editable date text.
    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub fn root_tasks(&self) -> &[Task] {
        &self.cache.tasks
    }

    pub fn all_tasks(&self) -> Vec<&Task> {
        flatten_tasks(&self.cache.tasks)
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.selection
            .project_id
            .as_deref()
            .and_then(|id| self.cache.project(id))
    }

    pub fn selected_label(&self) -> Option<&Label> {
        self.selection
            .label_id
            .as_deref()
            .and_then(|id| self.cache.label(id))
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selection
            .task_id
            .as_deref()
            .and_then(|id| self.cache.task(id))
    }

    /// Root tasks that can take a new subtask.
    pub fn parent_candidates(&self) -> Vec<&Task> {
        self.cache.tasks.iter().filter(|task| task.is_root()).collect()
    }

    #[must_use]
    pub fn apply(mut self, transition: Transition) -> Self {
        debug!(transition = transition_name(&transition), "applying transition");
        match transition {
            Transition::ProfileReplaced(profile) => {
                self.forms.profile = ProfileDraft::from_profile(&profile);
                self.cache.profile = Some(profile);
            }
            Transition::ProjectsReplaced(projects) => {
                self.cache.projects = projects;
                match self.selection.revalidate_projects(&self.cache.projects) {
                    ProjectRevalidation::Kept => {}
                    ProjectRevalidation::Fallback(id) => {
                        let project = self.cache.project(&id);
                        self.forms.sync_project_update(project);
                    }
                    ProjectRevalidation::Cleared => {
                        self.forms.sync_project_update(None);
                        self = self.apply(Transition::TasksCleared);
                    }
                }
            }
            Transition::LabelsReplaced(labels) => {
                self.cache.labels = labels;
                if self.selection.revalidate_label(&self.cache.labels) {
                    self.forms.sync_label_update(None);
                }
            }
            Transition::TasksReplaced(tasks) => {
                self.cache.tasks = tasks;
                self.revalidate_task_selection();
            }
            Transition::TasksCleared => {
                self.cache.tasks.clear();
                self.revalidate_task_selection();
            }
            Transition::ProjectSelected(id) => {
                let project = id.as_deref().and_then(|id| self.cache.project(id)).cloned();
                self.selection.project_id = project.as_ref().map(|project| project.id.clone());
                self.forms.sync_project_update(project.as_ref());
            }
            Transition::LabelSelected(id) => {
                let label = id.as_deref().and_then(|id| self.cache.label(id)).cloned();
                self.selection.label_id = label.as_ref().map(|label| label.id.clone());
                self.forms.sync_label_update(label.as_ref());
            }
            Transition::TaskSelected(id) => {
                let task = id.as_deref().and_then(|id| self.cache.task(id)).cloned();
                self.selection.task_id = task.as_ref().map(|task| task.id.clone());
                self.forms.sync_task_update(task.as_ref(), &self.tz);
            }
            Transition::TaskDraftResynced => {
                let task = self.selected_task().cloned();
                self.forms.sync_task_update(task.as_ref(), &self.tz);
            }
            Transition::StatusFilterToggled(status) => self.filter.toggle_status(status),
            Transition::PriorityFilterToggled(priority) => self.filter.toggle_priority(priority),
            Transition::ProfileEdited(draft) => self.forms.profile = draft,
            Transition::ProjectCreateEdited(draft) => self.forms.project_create = draft,
            Transition::ProjectUpdateEdited(draft) => self.forms.project_update = draft,
            Transition::LabelCreateEdited(draft) => self.forms.label_create = draft,
            Transition::LabelUpdateEdited(draft) => self.forms.label_update = draft,
            Transition::TaskEdited(form, draft) => *self.task_form_mut(form) = draft,
            Transition::TaskLabelToggled(form, label_id) => {
                self.task_form_mut(form).toggle_label(label_id);
            }
            Transition::DraftReset(slot) => match slot {
                DraftSlot::ProjectCreate => self.forms.project_create = ProjectDraft::default(),
                DraftSlot::LabelCreate => self.forms.label_create = LabelDraft::default(),
                DraftSlot::TaskCreate => self.forms.task_create = TaskDraft::for_create(),
                DraftSlot::SubtaskCreate => self.forms.subtask_create = TaskDraft::for_create(),
                DraftSlot::TaskUpdate => self.forms.task_update = TaskDraft::default(),
            },
            Transition::ActionStarted(action) => {
                self.activity.in_flight = Some(action);
                if self.activity.error().is_some() {
                    self.activity.notice = None;
                }
            }
            Transition::ActionSucceeded { action, message } => {
                self.activity.in_flight = None;
                self.activity.notice = Some(Notice::Success(format!("{action}: {message}")));
            }
            Transition::ActionFailed { action, message } => {
                self.activity.in_flight = None;
                self.activity.notice = Some(Notice::Failure(format!("{action} failed: {message}")));
            }
            Transition::ActionRejected { action, message } => {
                self.activity.notice = Some(Notice::Failure(format!("{action} failed: {message}")));
            }
            Transition::ActionAbandoned => self.activity.in_flight = None,
        }
        self
    }

    fn revalidate_task_selection(&mut self) {
        if self.selection.revalidate_task(&self.cache.tasks) {
            self.forms.task_update = TaskDraft::default();
        }
    }

    fn task_form_mut(&mut self, form: TaskForm) -> &mut TaskDraft {
        match form {
            TaskForm::Create => &mut self.forms.task_create,
            TaskForm::Subtask => &mut self.forms.subtask_create,
            TaskForm::Update => &mut self.forms.task_update,
        }
    }
}

fn transition_name(transition: &Transition) -> &'static str {
    match transition {
        Transition::ProfileReplaced(_) => "profile-replaced",
        Transition::ProjectsReplaced(_) => "projects-replaced",
        Transition::LabelsReplaced(_) => "labels-replaced",
        Transition::TasksReplaced(_) => "tasks-replaced",
        Transition::TasksCleared => "tasks-cleared",
        Transition::ProjectSelected(_) => "project-selected",
        Transition::LabelSelected(_) => "label-selected",
        Transition::TaskSelected(_) => "task-selected",
        Transition::TaskDraftResynced => "task-draft-resynced",
        Transition::StatusFilterToggled(_) => "status-filter-toggled",
        Transition::PriorityFilterToggled(_) => "priority-filter-toggled",
        Transition::ProfileEdited(_) => "profile-edited",
        Transition::ProjectCreateEdited(_) => "project-create-edited",
        Transition::ProjectUpdateEdited(_) => "project-update-edited",
        Transition::LabelCreateEdited(_) => "label-create-edited",
        Transition::LabelUpdateEdited(_) => "label-update-edited",
        Transition::TaskEdited(..) => "task-edited",
        Transition::TaskLabelToggled(..) => "task-label-toggled",
        Transition::DraftReset(_) => "draft-reset",
        Transition::ActionStarted(_) => "action-started",
        Transition::ActionSucceeded { .. } => "action-succeeded",
        Transition::ActionFailed { .. } => "action-failed",
        Transition::ActionRejected { .. } => "action-rejected",
        Transition::ActionAbandoned => "action-abandoned",
    }
}
