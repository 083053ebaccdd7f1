use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskmaster-{nanos}-{name}"))
}

fn add_task(store_dir: &Path, text: &str) -> u64 {
    let output = Command::new(env!("CARGO_BIN_EXE_taskmaster"))
        .args(["--json", "add", text])
        .env("TASKMASTER_STORE_DIR", store_dir)
        .env("TASKMASTER_CONFIG_PATH", store_dir.join("missing-config.json"))
        .output()
        .expect("failed to run add");
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("json output");
    parsed["id"].as_u64().expect("numeric id")
}

fn run_interactive(args: &[&str], input: &str, disable_notifications: bool) -> Output {
    let store_dir = temp_path("cli-interactive");
    let output = run_session(&store_dir, args, input, disable_notifications);
    std::fs::remove_dir_all(&store_dir).ok();
    output
}

fn run_session(
    store_dir: &Path,
    args: &[&str],
    input: &str,
    disable_notifications: bool,
) -> Output {
    let exe = env!("CARGO_BIN_EXE_taskmaster");

    let mut command = Command::new(exe);
    command
        .args(args)
        .env("TASKMASTER_STORE_DIR", store_dir)
        .env("TASKMASTER_CONFIG_PATH", store_dir.join("missing-config.json"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if disable_notifications {
        command.env("TASKMASTER_DISABLE_NOTIFICATIONS", "1");
    } else {
        command.env_remove("TASKMASTER_DISABLE_NOTIFICATIONS");
    }

    let mut child = command.spawn().expect("failed to spawn interactive session");
    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    child
        .wait_with_output()
        .expect("failed to read interactive output")
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive(&[], "help\nexit\n", true);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_question_mark_shows_usage() {
    let output = run_interactive(&[], "?\nquit\n", true);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_filter_applies_to_later_lists() {
    let input = "add \"Buy milk\"\nadd Walk dog\nfilter completed\nlist\nfilter active\nlist\n";
    let output = run_interactive(&["--ephemeral"], input, true);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Showing completed tasks"));
    assert!(stdout.contains("No tasks found"));
    assert!(stdout.contains("Showing active tasks"));
    assert!(stdout.contains("2 items left to complete (active)"));
}

#[test]
fn interactive_reports_parse_errors_and_continues() {
    let output = run_interactive(&["--ephemeral"], "toggle abc\nadd \"oops\nadd fine\n", true);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stderr.contains("unterminated quote"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added task: fine"));
}

#[cfg(any(target_os = "linux", windows))]
#[test]
fn interactive_remind_without_permission_reports_advisory() {
    let dir = temp_path("cli-remind-denied");
    let id = add_task(&dir, "Call mom");

    let output = run_session(&dir, &[], &format!("remind {id}\ncancel {id}\n"), true);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Notification Permission Required"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("No pending reminder for {id}")));
    assert!(!stdout.contains("Reminder set"));
}

#[cfg(any(target_os = "linux", windows))]
#[test]
fn interactive_exit_cancels_pending_reminders() {
    let dir = temp_path("cli-remind-teardown");
    let id = add_task(&dir, "Stretch");

    let output = run_session(
        &dir,
        &["--config-override", "desktop_notifications=false"],
        &format!("remind {id}\nexit\n"),
        false,
    );
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Reminder set for \"Stretch\", fires in 10s"));
    assert!(!stdout.contains("[TaskMaster Reminder]"));
}

#[test]
fn interactive_delete_cancels_reminder() {
    let dir = temp_path("cli-remind-delete");
    let id = add_task(&dir, "Water plants");

    let input = format!("remind {id}\ndelete {id}\ncancel {id}\n");
    let output = run_session(
        &dir,
        &["--config-override", "desktop_notifications=false"],
        &input,
        false,
    );
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Deleted task: Water plants"));
    assert!(stdout.contains(&format!("No pending reminder for {id}")));
}

#[test]
fn interactive_remind_on_missing_task_is_reported() {
    let output = run_interactive(&["--ephemeral"], "remind 7\ncancel 7\n", true);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No task with id 7"));
    assert!(stdout.contains("No pending reminder for 7"));
}

#[test]
fn interactive_rejects_startup_flags() {
    let input = "list --ephemeral\n--config-override theme=noir list\nadd kept\n";
    let output = run_interactive(&["--ephemeral"], input, true);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - --ephemeral only applies when starting taskmaster"));
    assert!(stderr.contains("--config-override only applies when starting taskmaster"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("No tasks found"));
    assert!(stdout.contains("Added task: kept"));
}
