use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zenlist_shared::{TaskPriority, TaskStatus};

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "zenlist",
    version,
    about = "ZenList: admin client for the ZenList task service",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Full endpoint URL, overriding every configured source.
    #[arg(long = "endpoint", global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Profile, projects, labels and the selected project's tasks.
    Show,
    /// Show the profile, or save it when any field is given.
    Profile(ProfileArgs),
    #[command(subcommand)]
    Project(ProjectCommand),
    #[command(subcommand)]
    Label(LabelCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    /// List tasks of a project with optional status and priority filters.
    Tasks(TasksArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long = "avatar-url")]
    pub avatar_url: Option<String>,
}

impl ProfileArgs {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.timezone.is_none() && self.avatar_url.is_none()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommand {
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Update the project with `id`, or the default selection.
    Update {
        id: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Delete {
        id: String,
    },
    Select {
        id: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum LabelCommand {
    Create { name: String },
    Update { id: String, name: String },
    Delete { id: String },
}

/// Task fields shared by create, subtask and update.
#[derive(Args, Debug, Clone, Default)]
pub struct TaskFields {
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Local time, YYYY-MM-DDTHH:MM.
    #[arg(long)]
    pub start: Option<String>,
    /// Local time, YYYY-MM-DDTHH:MM.
    #[arg(long)]
    pub due: Option<String>,
    /// Label id to toggle; repeatable.
    #[arg(long = "label", action = ArgAction::Append)]
    pub labels: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    Create {
        title: String,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Subtask {
        parent: String,
        title: String,
        #[arg(long)]
        project: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    Update {
        id: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        clear_labels: bool,
    },
    Delete {
        id: String,
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TasksArgs {
    #[arg(long)]
    pub project: Option<String>,
    #[arg(long = "status", action = ArgAction::Append)]
    pub statuses: Vec<TaskStatus>,
    #[arg(long = "priority", action = ArgAction::Append)]
    pub priorities: Vec<TaskPriority>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use zenlist_shared::{TaskPriority, TaskStatus};

    use super::{Command, GlobalCli, TaskCommand};

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = GlobalCli::try_parse_from([
            "zenlist",
            "tasks",
            "--status",
            "done",
            "--status",
            "in-progress",
            "--priority",
            "P1",
            "-vv",
            "--rc",
            "page.tasks=10",
        ])
        .expect("parse");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "page.tasks");
        let Some(Command::Tasks(args)) = cli.command else {
            panic!("expected tasks command");
        };
        assert_eq!(args.statuses, vec![TaskStatus::Done, TaskStatus::InProgress]);
        assert_eq!(args.priorities, vec![TaskPriority::P1]);
    }

    #[test]
    fn task_update_flags() {
        let cli = GlobalCli::try_parse_from([
            "zenlist",
            "task",
            "update",
            "t1",
            "--title",
            "Ship it",
            "--label",
            "l1",
            "--clear-due",
        ])
        .expect("parse");
        let Some(Command::Task(TaskCommand::Update {
            id,
            title,
            fields,
            clear_due,
            clear_start,
            ..
        })) = cli.command
        else {
            panic!("expected task update");
        };
        assert_eq!(id, "t1");
        assert_eq!(title.as_deref(), Some("Ship it"));
        assert_eq!(fields.labels, vec!["l1"]);
        assert!(clear_due);
        assert!(!clear_start);
    }

    #[test]
    fn bad_status_is_rejected() {
        assert!(GlobalCli::try_parse_from(["zenlist", "tasks", "--status", "later"]).is_err());
    }
}
