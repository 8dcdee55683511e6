use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_taskmasterra"));
    cmd.env("TASKMASTERRA_LOG", "silent");
    cmd
}

fn write_todo(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("todo.md");
    std::fs::write(&path, content).expect("write todo");
    path
}

#[test]
fn validate_clean_file_succeeds() {
    let repo = TempDir::new().expect("repo");
    let todo = write_todo(repo.path(), "# Today\n- [ ] !! A1 Call bank\n  - fees\n");
    let output = bin()
        .args(["validate", "-i"])
        .arg(&todo)
        .output()
        .expect("run validate");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "No issues found\n");
}

#[test]
fn validate_exits_non_zero_on_errors() {
    let repo = TempDir::new().expect("repo");
    let todo = write_todo(repo.path(), "# Today\n- [ broken\n");
    let output = bin()
        .args(["validate", "--json", "-i"])
        .arg(&todo)
        .output()
        .expect("run validate");
    assert_eq!(output.status.code(), Some(1));
    let json: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["errors"][0]["line"], 2);
    assert_eq!(json["errors"][0]["message"], "Invalid task format");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1 validation error(s)"), "{stderr}");
}

#[test]
fn stats_prints_markdown_report() {
    let repo = TempDir::new().expect("repo");
    let todo = write_todo(
        repo.path(),
        "# Today\n- [x] A1 done\n- [ ] !! B2 now\n- [b] C3 waiting\n- [ ] later\n",
    );
    let output = bin()
        .args(["stats", "-i"])
        .arg(&todo)
        .output()
        .expect("run stats");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("# Task Statistics Report\n"));
    assert!(stdout.contains("- Total Tasks: 4\n"));
    assert!(stdout.contains("- Completed: 1 (25.0%)\n"));
    assert!(stdout.contains("- Blocked: 1 (25.0%)\n"));
    assert!(stdout.contains("- Active Rate: 25.0%\n"));
}

#[test]
fn stats_json_written_to_output_file() {
    let repo = TempDir::new().expect("repo");
    let todo = write_todo(repo.path(), "- [x] A1 done\n- [w] D5 halfway\n");
    let out = repo.path().join("reports").join("stats.json");
    let output = bin()
        .args(["stats", "--json", "-i"])
        .arg(&todo)
        .arg("-o")
        .arg(&out)
        .output()
        .expect("run stats");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Report written to"));

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("report")).expect("json");
    assert_eq!(json["total_tasks"], 2);
    assert_eq!(json["completed_tasks"], 1);
    assert_eq!(json["worked_tasks"], 1);
    assert_eq!(json["priorities"]["Critical"], 1);
    assert_eq!(json["efforts"]["5"], 1);
}

#[test]
fn oversized_input_is_refused() {
    let repo = TempDir::new().expect("repo");
    let line = "- [ ] filler task\n";
    let body = line.repeat(11 * 1024 * 1024 / line.len() + 1);
    let todo = write_todo(repo.path(), &body);

    let output = bin()
        .args(["validate", "-i"])
        .arg(&todo)
        .output()
        .expect("run validate");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("too large"), "{stderr}");

    let output = bin()
        .env("TASKMASTERRA_HOME", repo.path().join("home"))
        .args(["recordkeep", "-i"])
        .arg(&todo)
        .output()
        .expect("run recordkeep");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("too large"), "{stderr}");
    assert!(!stderr.contains("Validation issues"), "{stderr}");
    assert!(!repo.path().join("todo.xjournal.md").exists());
}
