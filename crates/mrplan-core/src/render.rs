use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use mrplan_shared::{Bucket, Intent, ProjectDto, TaskDto};
use unicode_width::UnicodeWidthStr;
use uuid::Uuid;

use crate::config::Config;
use crate::session::SessionStatus;

/// Project label shown for tasks with no project or a dangling one.
pub const NO_PROJECT: &str = "No project";

/// `45'` under an hour, hours otherwise (`2h`, `1.5h`). Nothing for an
/// unset or zero estimate.
pub fn format_time_label(minutes: Option<u32>) -> Option<String> {
    match minutes {
        None | Some(0) => None,
        Some(m) if m < 60 => Some(format!("{m}'")),
        Some(m) => Some(format!("{}h", f64::from(m) / 60.0)),
    }
}

pub fn project_label<'a>(task: &TaskDto, projects: &'a [ProjectDto]) -> &'a str {
    task.project_id
        .and_then(|id| projects.iter().find(|p| p.id == id))
        .map(|p| p.name.as_str())
        .unwrap_or(NO_PROJECT)
}

pub fn bucket_heading(bucket: Bucket, count: usize) -> String {
    format!("{} {} ({count})", bucket.emoji(), bucket.title())
}

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

        Ok(Self { color })
    }

    #[tracing::instrument(skip_all)]
    pub fn write_board<W: Write>(
        &self,
        mut out: W,
        board: &[(Bucket, Vec<TaskDto>)],
        projects: &[ProjectDto],
    ) -> anyhow::Result<()> {
        for (idx, (bucket, tasks)) in board.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", self.paint(&bucket_heading(*bucket, tasks.len()), "1"))?;
            if tasks.is_empty() {
                continue;
            }

            let rows = tasks
                .iter()
                .map(|task| {
                    let check = if task.completed {
                        self.paint("[x]", "32")
                    } else {
                        "[ ]".to_string()
                    };
                    let time = format_time_label(task.estimated_time).unwrap_or_default();
                    let project = project_label(task, projects);
                    let project = if project == NO_PROJECT {
                        self.paint(project, "2")
                    } else {
                        project.to_string()
                    };
                    vec![check, task.title.clone(), self.paint(&time, "33"), project]
                })
                .collect();

            write_table(
                &mut out,
                vec![
                    String::new(),
                    "Title".to_string(),
                    "Time".to_string(),
                    "Project".to_string(),
                ],
                rows,
            )?;
        }
        Ok(())
    }

    pub fn write_status<W: Write>(&self, mut out: W, status: &SessionStatus) -> anyhow::Result<()> {
        let user = status
            .user
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            out,
            "user {user}  drawer {} ({:.1})  view {}  overlay {}",
            status.drawer, status.drawer_progress, status.vertical, status.overlay
        )?;
        if let Some(selected) = &status.selected {
            write!(out, " [{selected}]")?;
        }
        if let Some(task_id) = status.dragging {
            write!(out, "  dragging {}", short_id(task_id))?;
            if let Some(bucket) = status.hovered {
                write!(out, " over {bucket}")?;
            }
        }
        writeln!(out)?;
        Ok(())
    }

    /// One line per intent. `tasks` resolves ids to titles where it can.
    pub fn write_intents<W: Write>(
        &self,
        mut out: W,
        intents: &[Intent],
        tasks: &[TaskDto],
    ) -> anyhow::Result<()> {
        if intents.is_empty() {
            writeln!(out, "no intents issued")?;
            return Ok(());
        }
        let name = |id: Uuid| {
            tasks
                .iter()
                .find(|t| t.id == id)
                .map(|t| format!("\"{}\"", t.title))
                .unwrap_or_else(|| short_id(id))
        };
        for (idx, intent) in intents.iter().enumerate() {
            let line = match intent {
                Intent::Create { fields, .. } => {
                    format!("create {}", serde_json::to_string(fields)?)
                }
                Intent::Update { task_id, patch } => {
                    format!("update {} {}", name(*task_id), serde_json::to_string(patch)?)
                }
                Intent::Delete { task_id } => format!("delete {}", name(*task_id)),
            };
            writeln!(out, "{} {line}", self.paint(&format!("{:>3}", idx + 1), "33"))?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "  {header:width$}", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "  {}{}", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
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
