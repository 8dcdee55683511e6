//! Read-only lint pass over a task document.
//!
//! Nothing here affects record keeping; the engine tolerates every anomaly
//! reported below. Errors are things that change how a line is classified
//! (a malformed bracket, a misplaced `!!`), warnings are likely typos, and
//! info entries are suggestions.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::grammar::{is_completed, ACTIVE_MARKER};
use crate::priority::{priority_token, Priority};

const VALID_STATUSES: [&str; 7] = [" ", "x", "X", "w", "W", "b", "B"];
const FIBONACCI_EFFORTS: [&str; 10] = ["1", "2", "3", "5", "8", "13", "21", "34", "55", "89"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueLevel::Info => "INFO",
            IssueLevel::Warning => "WARNING",
            IssueLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
    pub level: IssueLevel,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub info: Vec<Issue>,
}

impl ValidationReport {
    fn push(&mut self, level: IssueLevel, line: usize, message: impl Into<String>) {
        let issue = Issue {
            line,
            message: message.into(),
            level,
        };
        match level {
            IssueLevel::Error => self.errors.push(issue),
            IssueLevel::Warning => self.warnings.push(issue),
            IssueLevel::Info => self.info.push(issue),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.info.is_empty()
    }

    /// Human-readable summary grouped by severity.
    pub fn render(&self) -> String {
        if self.is_clean() {
            return "No issues found\n".to_string();
        }
        let mut out = String::new();
        let groups = [
            (&self.errors, "errors"),
            (&self.warnings, "warnings"),
            (&self.info, "suggestions"),
        ];
        for (issues, label) in groups {
            if issues.is_empty() {
                continue;
            }
            out.push_str(&format!("{} {}:\n", issues.len(), label));
            for issue in issues {
                out.push_str(&format!("  Line {}: {}\n", issue.line, issue.message));
            }
        }
        out
    }
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("header regex"))
}

/// `- [<status>]<rest>` with any non-empty status, as typed by the user.
fn loose_task_parts(line: &str) -> Option<(&str, &str)> {
    let after_open = line.trim_start().strip_prefix("- [")?;
    let close = after_open.find(']')?;
    if close == 0 {
        return None;
    }
    Some((&after_open[..close], &after_open[close + 1..]))
}

pub fn validate_content(content: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    for (idx, line) in content.split('\n').enumerate() {
        validate_line(line, idx + 1, &mut report);
    }
    validate_global(content, &mut report);
    report
}

fn validate_line(line: &str, line_no: usize, report: &mut ValidationReport) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    if trimmed.starts_with("- [") {
        validate_task_line(line, line_no, report);
    } else if trimmed.starts_with('#') {
        validate_header_line(line, line_no, report);
    } else if trimmed.starts_with("- ") && !line.starts_with("  ") && !line.starts_with('\t') {
        report.push(IssueLevel::Warning, line_no, "Detail line should be indented");
    }
}

fn validate_task_line(line: &str, line_no: usize, report: &mut ValidationReport) {
    let Some((status, rest)) = loose_task_parts(line) else {
        report.push(IssueLevel::Error, line_no, "Invalid task format");
        return;
    };

    if !VALID_STATUSES.contains(&status) {
        report.push(IssueLevel::Warning, line_no, format!("Unknown status '{status}'"));
    }
    if rest.trim().is_empty() {
        report.push(IssueLevel::Warning, line_no, "Task has no title");
    }

    if line.contains(ACTIVE_MARKER) {
        match rest.strip_prefix(" !! ") {
            Some(tail) if tail.contains(ACTIVE_MARKER) => report.push(
                IssueLevel::Error,
                line_no,
                "Multiple active markers (!!) are not allowed",
            ),
            Some(_) => {}
            None => report.push(
                IssueLevel::Error,
                line_no,
                "Active marker (!!) must come immediately after the status bracket and before any priority/effort markers",
            ),
        }
        if !status.contains([' ', 'w', 'W']) {
            report.push(
                IssueLevel::Warning,
                line_no,
                "Active task (!!) should have empty or 'w' status",
            );
        }
    }

    if let Some(token) = priority_token(line) {
        if Priority::from_letter(token.letter) == Priority::None {
            report.push(
                IssueLevel::Warning,
                line_no,
                format!("Unknown priority '{}'", token.letter),
            );
        }
        if !FIBONACCI_EFFORTS.contains(&token.digits) {
            report.push(
                IssueLevel::Info,
                line_no,
                format!("Effort '{}' is not a standard fibonacci number", token.digits),
            );
        }
    }
}

fn validate_header_line(line: &str, line_no: usize, report: &mut ValidationReport) {
    let Some(caps) = header_regex().captures(line) else {
        report.push(IssueLevel::Warning, line_no, "Invalid header format");
        return;
    };
    let level = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
    let title = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    if title.is_empty() {
        report.push(IssueLevel::Warning, line_no, "Header has no title");
    }
    if level > 3 {
        report.push(
            IssueLevel::Info,
            line_no,
            "Consider using fewer header levels for better organization",
        );
    }
}

fn validate_global(content: &str, report: &mut ValidationReport) {
    let mut has_tasks = false;
    let mut all_completed = true;
    let mut has_headers = false;

    for line in content.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("- [") {
            has_tasks = true;
            if !is_completed(line) {
                all_completed = false;
            }
        } else if trimmed.starts_with('#') {
            has_headers = true;
        }
    }

    if !has_tasks {
        report.push(IssueLevel::Warning, 1, "No tasks found in file");
    }
    if !has_headers {
        report.push(
            IssueLevel::Info,
            1,
            "Consider adding a header to organize your tasks",
        );
    }
    if has_tasks && all_completed {
        report.push(
            IssueLevel::Info,
            1,
            "All tasks are completed - consider archiving or creating new tasks",
        );
    }
}
