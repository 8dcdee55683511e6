use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::grammar::{is_active, is_completed, task_prefix};
use crate::priority::{parse_task_info, Priority};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write report to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub active_tasks: usize,
    pub blocked_tasks: usize,
    pub worked_tasks: usize,
    pub priorities: BTreeMap<Priority, usize>,
    /// Count of tasks per effort estimate; tasks without one are left out.
    pub efforts: BTreeMap<u32, usize>,
    pub generated_at: String,
}

/// Tally task lines. Each task lands in at most one of completed, active,
/// blocked or worked, checked in that order.
pub fn analyze_content(content: &str, generated_at: &str) -> TaskStats {
    let mut stats = TaskStats {
        generated_at: generated_at.to_string(),
        ..TaskStats::default()
    };
    for line in content.split('\n') {
        let Some(prefix) = task_prefix(line) else {
            continue;
        };
        stats.total_tasks += 1;

        if is_completed(line) {
            stats.completed_tasks += 1;
        } else if is_active(line) {
            stats.active_tasks += 1;
        } else {
            match prefix.status {
                'b' | 'B' => stats.blocked_tasks += 1,
                'w' | 'W' => stats.worked_tasks += 1,
                _ => {}
            }
        }

        if let Some(info) = parse_task_info(line) {
            *stats.priorities.entry(info.priority).or_default() += 1;
            if info.effort > 0 {
                *stats.efforts.entry(info.effort).or_default() += 1;
            }
        }
    }
    stats
}

pub fn analyze_file(path: &Path) -> Result<TaskStats, StatsError> {
    let content = fs::read_to_string(path).map_err(|source| StatsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    Ok(analyze_content(&content, &generated_at))
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

pub fn render_report(stats: &TaskStats) -> String {
    let total = stats.total_tasks;
    let mut lines = vec![
        "# Task Statistics Report".to_string(),
        format!("Generated: {}", stats.generated_at),
        String::new(),
        "## Overall Statistics".to_string(),
        format!("- Total Tasks: {total}"),
    ];
    let rows = [
        ("Completed", stats.completed_tasks),
        ("Active", stats.active_tasks),
        ("Blocked", stats.blocked_tasks),
        ("Worked On", stats.worked_tasks),
    ];
    for (label, count) in rows {
        lines.push(format!("- {label}: {count} ({:.1}%)", percentage(count, total)));
    }
    lines.push(String::new());

    let ranked: Vec<_> = stats
        .priorities
        .iter()
        .rev()
        .filter(|(priority, _)| **priority != Priority::None)
        .collect();
    if !ranked.is_empty() {
        lines.push("## Priority Breakdown".to_string());
        for (priority, count) in ranked {
            lines.push(format!("- {priority}: {count} ({:.1}%)", percentage(*count, total)));
        }
        lines.push(String::new());
    }

    if !stats.efforts.is_empty() {
        lines.push("## Effort Breakdown".to_string());
        for (effort, count) in &stats.efforts {
            lines.push(format!("- Effort {effort}: {count} tasks"));
        }
        lines.push(String::new());
    }

    lines.push("## Progress Summary".to_string());
    lines.push(format!(
        "- Completion Rate: {:.1}%",
        percentage(stats.completed_tasks, total)
    ));
    if total > 0 {
        lines.push(format!(
            "- Active Rate: {:.1}%",
            percentage(stats.active_tasks, total)
        ));
    }
    lines.join("\n") + "\n"
}

pub fn write_report(path: &Path, report: &str) -> Result<PathBuf, StatsError> {
    let write_err = |source| StatsError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, report).map_err(write_err)?;
    Ok(path.to_path_buf())
}
