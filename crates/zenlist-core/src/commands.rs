use std::io::{self, Write};

use tracing::{debug, info, instrument};

use crate::cli::{Command, LabelCommand, ProfileArgs, ProjectCommand, TaskCommand, TaskFields, TasksArgs};
use crate::forms::{ClearFields, LabelDraft, ProjectDraft, TaskDraft};
use crate::orchestrator::{ActionOutcome, Session};
use crate::remote::RemoteStore;
use crate::render::Renderer;
use crate::state::{TaskForm, Transition};

/// Runs one command against a bootstrapped session and prints the result.
/// Returns the outcome of the last action that ran.
#[instrument(skip(session, renderer, command))]
pub async fn dispatch<R: RemoteStore>(
    session: &mut Session<R>,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<ActionOutcome> {
    debug!(?command, "dispatching command");

    let outcome = match command {
        Command::Show => {
            let mut out = io::stdout().lock();
            renderer.write_overview(&mut out, session.state())?;
            return Ok(ActionOutcome::Succeeded);
        }
        Command::Profile(args) => cmd_profile(session, args).await?,
        Command::Project(cmd) => cmd_project(session, cmd).await,
        Command::Label(cmd) => cmd_label(session, cmd).await,
        Command::Task(cmd) => cmd_task(session, cmd).await,
        Command::Tasks(args) => {
            let outcome = cmd_tasks(session, args).await;
            let mut out = io::stdout().lock();
            renderer.write_tasks(&mut out, session.state())?;
            outcome
        }
    };

    info!(?outcome, "command finished");
    Ok(outcome)
}

async fn cmd_profile<R: RemoteStore>(session: &mut Session<R>, args: ProfileArgs) -> anyhow::Result<ActionOutcome> {
    if args.is_empty() {
        let mut out = io::stdout().lock();
        let draft = &session.state().forms.profile;
        writeln!(out, "name      {}", draft.name)?;
        writeln!(out, "email     {}", draft.email)?;
        writeln!(out, "timezone  {}", draft.timezone)?;
        writeln!(out, "avatar    {}", draft.avatar_url)?;
        return Ok(ActionOutcome::Succeeded);
    }

    let mut draft = session.state().forms.profile.clone();
    if let Some(name) = args.name {
        draft.name = name;
    }
    if let Some(email) = args.email {
        draft.email = email;
    }
    if let Some(timezone) = args.timezone {
        draft.timezone = timezone;
    }
    if let Some(avatar_url) = args.avatar_url {
        draft.avatar_url = avatar_url;
    }
    session.dispatch(Transition::ProfileEdited(draft));
    Ok(session.upsert_profile().await)
}

async fn cmd_project<R: RemoteStore>(session: &mut Session<R>, cmd: ProjectCommand) -> ActionOutcome {
    match cmd {
        ProjectCommand::Create {
            title,
            description,
            color,
        } => {
            session.dispatch(Transition::ProjectCreateEdited(ProjectDraft {
                title,
                description: description.unwrap_or_default(),
                color: color.unwrap_or_default(),
            }));
            session.create_project().await
        }
        ProjectCommand::Update {
            id,
            title,
            description,
            color,
        } => {
            if let Some(outcome) = select_project(session, id).await {
                return outcome;
            }
            // Unset flags leave the field blank, which the update omits.
            session.dispatch(Transition::ProjectUpdateEdited(ProjectDraft {
                title: title.unwrap_or_default(),
                description: description.unwrap_or_default(),
                color: color.unwrap_or_default(),
            }));
            session.update_project().await
        }
        ProjectCommand::Delete { id } => {
            if let Some(outcome) = select_project(session, Some(id)).await {
                return outcome;
            }
            session.delete_project().await
        }
        ProjectCommand::Select { id } => session.select_project(Some(id)).await,
    }
}

/// Moves the project selection; `Some` carries a failed task load.
async fn select_project<R: RemoteStore>(session: &mut Session<R>, id: Option<String>) -> Option<ActionOutcome> {
    let id = id?;
    let outcome = session.select_project(Some(id)).await;
    outcome.is_failure().then_some(outcome)
}

async fn cmd_label<R: RemoteStore>(session: &mut Session<R>, cmd: LabelCommand) -> ActionOutcome {
    match cmd {
        LabelCommand::Create { name } => {
            session.dispatch(Transition::LabelCreateEdited(LabelDraft { name }));
            session.create_label().await
        }
        LabelCommand::Update { id, name } => {
            session.select_label(Some(id));
            session.dispatch(Transition::LabelUpdateEdited(LabelDraft { name }));
            session.update_label().await
        }
        LabelCommand::Delete { id } => {
            session.select_label(Some(id));
            session.delete_label().await
        }
    }
}

async fn cmd_task<R: RemoteStore>(session: &mut Session<R>, cmd: TaskCommand) -> ActionOutcome {
    match cmd {
        TaskCommand::Create {
            title,
            project,
            fields,
        } => {
            if let Some(outcome) = select_project(session, project).await {
                return outcome;
            }
            let draft = edited_draft(TaskDraft::for_create(), Some(title), fields);
            session.dispatch(Transition::TaskEdited(TaskForm::Create, draft));
            session.create_task().await
        }
        TaskCommand::Subtask {
            parent,
            title,
            project,
            fields,
        } => {
            if let Some(outcome) = select_project(session, project).await {
                return outcome;
            }
            let base = TaskDraft {
                parent_task_id: parent,
                ..TaskDraft::for_create()
            };
            let draft = edited_draft(base, Some(title), fields);
            session.dispatch(Transition::TaskEdited(TaskForm::Subtask, draft));
            session.create_subtask().await
        }
        TaskCommand::Update {
            id,
            project,
            title,
            fields,
            clear_description,
            clear_start,
            clear_due,
            clear_labels,
        } => {
            if let Some(outcome) = select_project(session, project).await {
                return outcome;
            }
            session.select_task(Some(id));
            let base = session.state().forms.task_update.clone();
            let draft = edited_draft(base, title, fields);
            session.dispatch(Transition::TaskEdited(TaskForm::Update, draft));
            let clear = ClearFields {
                description: clear_description,
                start_at: clear_start,
                due_at: clear_due,
                labels: clear_labels,
            };
            if clear.description {
                blank_field(session, |draft| draft.description.clear());
            }
            if clear.start_at {
                blank_field(session, |draft| draft.start_at.clear());
            }
            if clear.due_at {
                blank_field(session, |draft| draft.due_at.clear());
            }
            if clear.labels {
                blank_field(session, |draft| draft.label_ids.clear());
            }
            session.update_task_with_clears(clear).await
        }
        TaskCommand::Delete { id, project } => {
            if let Some(outcome) = select_project(session, project).await {
                return outcome;
            }
            session.select_task(Some(id));
            session.delete_task().await
        }
    }
}

/// Label ids are toggled against the base draft, so passing an id the
/// task already carries removes it.
fn edited_draft(mut draft: TaskDraft, title: Option<String>, fields: TaskFields) -> TaskDraft {
    if let Some(title) = title {
        draft.title = title;
    }
    if let Some(description) = fields.description {
        draft.description = description;
    }
    if fields.status.is_some() {
        draft.status = fields.status;
    }
    if fields.priority.is_some() {
        draft.priority = fields.priority;
    }
    if let Some(start) = fields.start {
        draft.start_at = start;
    }
    if let Some(due) = fields.due {
        draft.due_at = due;
    }
    for label_id in fields.labels {
        draft.toggle_label(label_id);
    }
    draft
}

fn blank_field<R: RemoteStore>(session: &mut Session<R>, edit: impl FnOnce(&mut TaskDraft)) {
    let mut draft = session.state().forms.task_update.clone();
    edit(&mut draft);
    session.dispatch(Transition::TaskEdited(TaskForm::Update, draft));
}

async fn cmd_tasks<R: RemoteStore>(session: &mut Session<R>, args: TasksArgs) -> ActionOutcome {
    if let Some(outcome) = select_project(session, args.project).await {
        return outcome;
    }
    for status in args.statuses {
        if !session.state().filter.statuses.contains(&status) {
            session.dispatch(Transition::StatusFilterToggled(status));
        }
    }
    for priority in args.priorities {
        if !session.state().filter.priorities.contains(&priority) {
            session.dispatch(Transition::PriorityFilterToggled(priority));
        }
    }
    session.apply_filters().await
}
