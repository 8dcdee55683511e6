//! Mirror active tasks into macOS Reminders.
//!
//! Reminders is driven through AppleScript (`osascript -e <script>`). The
//! process launcher is a [`CommandRunner`] handed to [`RemindersApp`] at
//! construction, so tests can record scripts instead of running them.

use std::process::Command;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::grammar::is_active;
use crate::priority::{parse_task_info, Priority};

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("'{0}' is not available on PATH")]
    Unavailable(String),
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to clear reminder list '{list}' via AppleScript (stderr: {stderr})")]
    ClearFailed { list: String, stderr: String },
    #[error("Failed to add reminder '{title}' to list '{list}' via AppleScript (stderr: {stderr})")]
    AddFailed {
        title: String,
        list: String,
        stderr: String,
    },
    #[error("Failed to add reminder for task on line {line} ('{title}'): {source}")]
    Task {
        line: usize,
        title: String,
        #[source]
        source: Box<ReminderError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stderr: String,
}

/// Runs an external program to completion.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ReminderError>;
}

/// Launches real processes, resolving the program on `PATH` first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ReminderError> {
        let resolved =
            which::which(program).map_err(|_| ReminderError::Unavailable(program.to_string()))?;
        let output = Command::new(resolved)
            .args(args)
            .output()
            .map_err(|source| ReminderError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Destination for mirrored tasks.
pub trait ReminderSink {
    fn clear_list(&self) -> Result<(), ReminderError>;
    fn add_reminder(&self, title: &str, due_today: bool, note: &str) -> Result<(), ReminderError>;
}

/// Escape a value for use inside an AppleScript string literal.
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub struct RemindersApp<R> {
    list_name: String,
    due_hour: i32,
    due_minute: i32,
    runner: R,
}

impl<R: CommandRunner> RemindersApp<R> {
    pub fn new(runner: R, settings: &Settings) -> Self {
        Self {
            list_name: settings.reminder_list_name.clone(),
            due_hour: settings.default_due_hour,
            due_minute: settings.default_due_minute,
            runner,
        }
    }

    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn clear_script(&self) -> String {
        let list = escape_applescript(&self.list_name);
        format!(
            r#"tell application "Reminders"
    if exists list "{list}" then
        tell list "{list}"
            delete reminders
        end tell
    end if
end tell"#
        )
    }

    pub fn add_script(&self, title: &str, due_today: bool, note: &str) -> String {
        let list = escape_applescript(&self.list_name);
        let name = escape_applescript(title);
        let body = escape_applescript(note);
        let (preamble, due) = if due_today {
            (
                format!(
                    "set dueDate to (current date)\nset hours of dueDate to {}\nset minutes of dueDate to {}\nset seconds of dueDate to 0\n",
                    self.due_hour, self.due_minute
                ),
                ", due date:dueDate",
            )
        } else {
            (String::new(), "")
        };
        format!(
            r#"{preamble}tell application "Reminders"
    if exists list "{list}" then
        tell list "{list}"
            make new reminder with properties {{name:"{name}", body:"{body}"{due}}}
        end tell
    else
        error "List '{list}' does not exist"
    end if
end tell"#
        )
    }

    fn osascript(&self, script: String) -> Result<CommandOutput, ReminderError> {
        debug!(list = %self.list_name, "running osascript");
        self.runner.run("osascript", &["-e".to_string(), script])
    }
}

impl<R: CommandRunner> ReminderSink for RemindersApp<R> {
    fn clear_list(&self) -> Result<(), ReminderError> {
        let output = self.osascript(self.clear_script())?;
        if !output.success {
            return Err(ReminderError::ClearFailed {
                list: self.list_name.clone(),
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    fn add_reminder(&self, title: &str, due_today: bool, note: &str) -> Result<(), ReminderError> {
        let output = self.osascript(self.add_script(title, due_today, note))?;
        if !output.success {
            return Err(ReminderError::AddFailed {
                title: title.to_string(),
                list: self.list_name.clone(),
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncedTask {
    pub line: usize,
    pub title: String,
    pub due_today: bool,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub synced: Vec<SyncedTask>,
}

fn reminder_note(priority: Priority, effort: u32) -> String {
    let mut note = format!("Priority: {priority}");
    if effort > 0 {
        note.push_str(&format!(", Effort: {effort}"));
    }
    note
}

/// Replace the sink's contents with the active tasks found in `content`.
///
/// Critical and high priority tasks are due today. The first failure stops
/// the batch and names the offending line.
pub fn sync_active_tasks<S: ReminderSink + ?Sized>(
    content: &str,
    sink: &S,
) -> Result<SyncReport, ReminderError> {
    sink.clear_list()?;
    let mut report = SyncReport::default();
    for (idx, line) in content.split('\n').enumerate() {
        if !is_active(line) {
            continue;
        }
        let line_no = idx + 1;
        let Some(info) = parse_task_info(line) else {
            warn!(line = line_no, "could not parse active task");
            continue;
        };
        let due_today = matches!(info.priority, Priority::Critical | Priority::High);
        let note = reminder_note(info.priority, info.effort);
        sink.add_reminder(&info.title, due_today, &note)
            .map_err(|source| ReminderError::Task {
                line: line_no,
                title: info.title.clone(),
                source: Box::new(source),
            })?;
        report.synced.push(SyncedTask {
            line: line_no,
            title: info.title,
            due_today,
            note,
        });
    }
    info!(count = report.synced.len(), "reminders synced");
    Ok(report)
}
