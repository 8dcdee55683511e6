//! Task-line grammar.
//!
//! A task line is `<indent?>- [<status>]<rest>`; an indented `- ` bullet is a
//! detail line belonging to the task above it. Everything here is pure and
//! total: malformed input classifies as plain text instead of erroring.

/// Marker placed right after the status bracket to flag a task as active.
pub const ACTIVE_MARKER: &str = "!!";

/// Status letters that mean "worked on since the last record-keeping run".
pub const TOUCHED_STATUSES: [char; 3] = ['B', 'W', 'X'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Task,
    Detail,
    Plain,
}

/// The fixed prefix of a task line, borrowed from the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPrefix<'a> {
    pub indent: &'a str,
    pub status: char,
    /// Everything after the closing bracket, untrimmed.
    pub rest: &'a str,
    status_offset: usize,
}

pub fn task_prefix(line: &str) -> Option<TaskPrefix<'_>> {
    let body = line.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let indent = &line[..line.len() - body.len()];
    let after_open = body.strip_prefix("- [")?;
    let mut chars = after_open.chars();
    let status = chars.next()?;
    if status == ']' {
        return None;
    }
    let rest = chars.as_str().strip_prefix(']')?;
    Some(TaskPrefix {
        indent,
        status,
        rest,
        status_offset: indent.len() + "- [".len(),
    })
}

/// Text after a required `[ \t]+` indent, or `None` when the line is flush left.
fn required_indent(line: &str) -> Option<&str> {
    let body = line.trim_start_matches([' ', '\t']);
    if body.len() == line.len() {
        return None;
    }
    Some(body)
}

pub fn is_task(line: &str) -> bool {
    task_prefix(line).is_some()
}

pub fn is_sub_task(line: &str) -> bool {
    required_indent(line)
        .map(|body| body.starts_with("- ["))
        .unwrap_or(false)
}

/// True for any indented `- ` bullet, including indented task lines.
pub fn is_task_detail(line: &str) -> bool {
    required_indent(line)
        .map(|body| body.starts_with("- "))
        .unwrap_or(false)
}

pub fn is_completed(line: &str) -> bool {
    matches!(task_prefix(line), Some(prefix) if prefix.status.eq_ignore_ascii_case(&'x'))
}

/// `!!` must sit exactly one space after the bracket, be followed by a space,
/// and appear only once on the line.
pub fn is_active(line: &str) -> bool {
    let Some(prefix) = task_prefix(line) else {
        return false;
    };
    let Some(tail) = prefix
        .rest
        .strip_prefix(' ')
        .and_then(|rest| rest.strip_prefix(ACTIVE_MARKER))
        .and_then(|rest| rest.strip_prefix(' '))
    else {
        return false;
    };
    !tail.contains(ACTIVE_MARKER)
}

pub fn is_touched(line: &str) -> bool {
    matches!(task_prefix(line), Some(prefix) if TOUCHED_STATUSES.contains(&prefix.status))
}

pub fn classify(line: &str) -> LineKind {
    if is_task(line) {
        LineKind::Task
    } else if is_task_detail(line) {
        LineKind::Detail
    } else {
        LineKind::Plain
    }
}

/// Rewrite the status character of a task line from `old` to `new`.
///
/// Only the bracketed status is considered; text in the title that happens to
/// look like `- [W]` is left alone.
pub fn replace_status(line: &str, old: char, new: char) -> String {
    match task_prefix(line) {
        Some(prefix) if prefix.status == old => {
            let at = prefix.status_offset;
            let mut out = String::with_capacity(line.len());
            out.push_str(&line[..at]);
            out.push(new);
            out.push_str(&line[at + old.len_utf8()..]);
            out
        }
        _ => line.to_string(),
    }
}

/// Settle a touched status letter back to its lowercase form.
pub fn convert_active_to_touched(line: &str) -> String {
    TOUCHED_STATUSES
        .iter()
        .fold(line.to_string(), |acc, upper| {
            replace_status(&acc, *upper, upper.to_ascii_lowercase())
        })
}
