use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;
use zenlist_shared::{Task, TaskStatus};

use crate::config::Config;
use crate::datetime::format_display;
use crate::state::{AppState, Notice};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn write_notice<W: Write>(&self, mut out: W, state: &AppState) -> anyhow::Result<()> {
        match &state.activity.notice {
            Some(notice @ Notice::Success(_)) => writeln!(out, "{}", self.paint(notice.text(), "32"))?,
            Some(notice @ Notice::Failure(_)) => writeln!(out, "{}", self.paint(notice.text(), "31"))?,
            None => {}
        }
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_overview<W: Write>(&self, mut out: W, state: &AppState) -> anyhow::Result<()> {
        if let Some(profile) = &state.cache.profile {
            writeln!(out, "{} <{}> ({})", profile.name, profile.email, profile.timezone)?;
            writeln!(out)?;
        }

        let selected_project = state.selection.project_id.as_deref();
        let rows = state
            .cache
            .projects
            .iter()
            .map(|project| {
                vec![
                    self.marker(selected_project == Some(project.id.as_str())),
                    self.paint(&project.id, "33"),
                    project.title.clone(),
                    project.color.clone().unwrap_or_default(),
                    project.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(&mut out, &["", "ID", "Project", "Color", "Description"], rows)?;
        writeln!(out)?;

        let selected_label = state.selection.label_id.as_deref();
        let rows = state
            .cache
            .labels
            .iter()
            .map(|label| {
                vec![
                    self.marker(selected_label == Some(label.id.as_str())),
                    self.paint(&label.id, "33"),
                    label.name.clone(),
                ]
            })
            .collect();
        write_table(&mut out, &["", "ID", "Label"], rows)?;
        writeln!(out)?;

        self.write_tasks(&mut out, state)
    }

    /// Flattened task view; subtasks are indented under their root.
    pub fn write_tasks<W: Write>(&self, mut out: W, state: &AppState) -> anyhow::Result<()> {
        let tz = state.timezone();
        let selected = state.selection.task_id.as_deref();
        let rows = state
            .all_tasks()
            .into_iter()
            .map(|task| self.task_row(task, selected, tz))
            .collect();
        write_table(
            &mut out,
            &["", "ID", "Title", "Status", "Pri", "Due", "Labels"],
            rows,
        )
    }

    fn task_row(&self, task: &Task, selected: Option<&str>, tz: &Tz) -> Vec<String> {
        let title = if task.is_root() {
            task.title.clone()
        } else {
            format!("  └ {}", task.title)
        };
        let status = match task.status {
            TaskStatus::Done => self.paint(task.status.as_str(), "32"),
            TaskStatus::Blocked => self.paint(task.status.as_str(), "31"),
            _ => task.status.to_string(),
        };
        let labels = task
            .labels
            .iter()
            .map(|label| format!("+{}", label.name))
            .collect::<Vec<_>>()
            .join(" ");

        vec![
            self.marker(selected == Some(task.id.as_str())),
            self.paint(&task.id, "33"),
            title,
            status,
            task.priority.to_string(),
            task.due_at.map(|due| format_display(due, tz)).unwrap_or_default(),
            labels,
        ]
    }

    fn marker(&self, selected: bool) -> String {
        if selected { self.paint("*", "1") } else { String::new() }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(mut writer: W, headers: &[&str], rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(*header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("{header:width$}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                format!("{cell}{}", " ".repeat(width.saturating_sub(visible_width)))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
