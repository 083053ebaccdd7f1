//! Plain, table and JSON output for the terminal front end.

use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskmaster_core::config::Theme;
use taskmaster_core::error::AppError;
use taskmaster_core::notify::NotificationSink;
use taskmaster_core::{Filter, ReminderNotice, Task, TaskId};

const RESET: &str = "\x1b[0m";

/// ANSI colours for ids and secondary lines; the plain theme leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette {
    id: Option<&'static str>,
    note: Option<&'static str>,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Plain => Self::default(),
            Theme::Noir => Self {
                id: Some("\x1b[38;5;208m"),
                note: Some("\x1b[38;5;250m"),
            },
            Theme::Solarized => Self {
                id: Some("\x1b[38;5;108m"),
                note: Some("\x1b[38;5;250m"),
            },
        }
    }

    pub fn id(&self, id: TaskId) -> String {
        paint(self.id, &id.to_string())
    }

    pub fn note(&self, text: &str) -> String {
        paint(self.note, text)
    }
}

fn paint(colour: Option<&str>, text: &str) -> String {
    match colour {
        Some(colour) => format!("{colour}{text}{RESET}"),
        None => text.to_string(),
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: TaskId,
    #[tabled(rename = "STATUS")]
    status: &'static str,
    #[tabled(rename = "TASK")]
    text: String,
}

fn status_label(task: &Task) -> &'static str {
    if task.completed { "completed" } else { "active" }
}

pub fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "text": task.text,
        "completed": task.completed,
    })
}

pub fn render_table(tasks: &[&Task]) -> String {
    let rows = tasks.iter().map(|task| TaskRow {
        id: task.id,
        status: status_label(task),
        text: task.text.clone(),
    });
    Table::new(rows).with(Style::psql()).to_string()
}

pub fn remaining_line(remaining: usize) -> String {
    match remaining {
        1 => "1 item left to complete".to_string(),
        n => format!("{n} items left to complete"),
    }
}

pub fn print_task(verb: &str, task: &Task, json: bool, palette: &Palette) {
    if json {
        println!("{}", task_json(task));
    } else {
        let id = palette.id(task.id);
        println!("{verb} task: {} ({id})", task.text);
    }
}

pub fn print_missing(id: TaskId, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "id": id, "status": "not_found" }));
    } else {
        println!("No task with id {id}");
    }
}

pub fn print_unchanged(message: &str, json: bool, palette: &Palette) {
    if json {
        println!("{}", serde_json::json!({ "status": "unchanged", "message": message }));
    } else {
        println!("{}", palette.note(message));
    }
}

pub fn print_list(
    visible: &[&Task],
    filter: Filter,
    remaining: usize,
    total: usize,
    json: bool,
    palette: &Palette,
) {
    if json {
        let payload: Vec<_> = visible.iter().map(|task| task_json(task)).collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    if visible.is_empty() {
        println!("No tasks found");
    } else {
        println!("{}", render_table(visible));
    }

    if total > 0 {
        let summary = format!("{} ({filter})", remaining_line(remaining));
        println!("{}", palette.note(&summary));
    }
}

pub fn print_notice(id: TaskId, notice: &ReminderNotice, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "id": id,
                "status": notice.code(),
                "message": notice.to_string(),
            })
        );
    } else if notice.is_set() {
        println!("{}: {notice}", notice.title());
    } else {
        // Advisory, not a failure: the command itself succeeded.
        eprintln!("{}: {notice}", notice.title());
    }
}

/// Echoes reminders into the terminal, then hands them to the desktop sink.
pub struct TerminalNotifier {
    desktop: Arc<dyn NotificationSink>,
}

impl TerminalNotifier {
    pub fn new(desktop: Arc<dyn NotificationSink>) -> Self {
        Self { desktop }
    }
}

impl NotificationSink for TerminalNotifier {
    fn deliver(&self, title: &str, body: &str) -> Result<(), AppError> {
        println!("[{title}] {body}");
        self.desktop.deliver(title, body)
    }
}
