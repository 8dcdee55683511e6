use std::fmt;

use serde::Serialize;

use crate::grammar::task_prefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn from_letter(letter: char) -> Priority {
        match letter {
            'A' => Priority::Critical,
            'B' => Priority::High,
            'C' => Priority::Medium,
            'D' => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "None",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A whole-word `<uppercase letter><digits>` token such as `A1` or `C13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityToken<'a> {
    pub letter: char,
    pub digits: &'a str,
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Find the first priority/effort token on a line.
pub fn priority_token(line: &str) -> Option<PriorityToken<'_>> {
    let bytes = line.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        if !byte.is_ascii_uppercase() {
            continue;
        }
        if idx > 0 && is_word_byte(bytes[idx - 1]) {
            continue;
        }
        let digits_start = idx + 1;
        let digits_end = bytes[digits_start..]
            .iter()
            .position(|b| !b.is_ascii_digit())
            .map(|offset| digits_start + offset)
            .unwrap_or(bytes.len());
        if digits_end == digits_start {
            continue;
        }
        if digits_end < bytes.len() && is_word_byte(bytes[digits_end]) {
            continue;
        }
        return Some(PriorityToken {
            letter: *byte as char,
            digits: &line[digits_start..digits_end],
        });
    }
    None
}

pub fn parse_priority(line: &str) -> Priority {
    priority_token(line)
        .map(|token| Priority::from_letter(token.letter))
        .unwrap_or(Priority::None)
}

/// Effort estimate from the same token as the priority; 0 when absent.
pub fn parse_effort(line: &str) -> u32 {
    priority_token(line)
        .and_then(|token| token.digits.parse::<u32>().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub line: String,
    pub status: char,
    pub title: String,
    pub priority: Priority,
    pub effort: u32,
}

impl TaskInfo {
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.priority != Priority::None {
            parts.push(self.priority.to_string());
        }
        if self.effort > 0 {
            parts.push(format!("Effort: {}", self.effort));
        }
        parts.push(format!("Status: {}", self.status));
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        parts.join(" | ")
    }
}

pub fn parse_task_info(line: &str) -> Option<TaskInfo> {
    let prefix = task_prefix(line)?;
    Some(TaskInfo {
        line: line.to_string(),
        status: prefix.status,
        title: prefix.rest.trim().to_string(),
        priority: parse_priority(line),
        effort: parse_effort(line),
    })
}
