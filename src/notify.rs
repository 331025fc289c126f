//! Notices and confirmations, kept apart from rendering.
//!
//! Controllers and the session guard report through [`Notifier`] and ask
//! through [`Confirm`]; the CLI prints and prompts, the TUI queues notices
//! for its status line and answers confirmations from a popup.

use chrono::{DateTime, Local};
use std::io::{self, BufRead, Write};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Screen-entry failure; paired with navigation away.
    Blocking,
    /// Failure of an in-page action; no navigation.
    Inline,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
            at: Local::now(),
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);

    fn blocking(&mut self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Blocking, message));
    }

    fn inline(&mut self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Inline, message));
    }

    fn info(&mut self, message: &str) {
        self.notify(Notice::new(NoticeLevel::Info, message));
    }
}

/// Keeps every notice in arrival order.
#[derive(Debug, Default)]
pub struct NoticeLog {
    notices: Vec<Notice>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.notices.iter().map(|n| n.message.as_str()).collect()
    }

    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.iter().map(|n| n.level).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}

impl Notifier for NoticeLog {
    fn notify(&mut self, notice: Notice) {
        log::debug!("notice ({:?}): {}", notice.level, notice.message);
        self.notices.push(notice);
    }
}

#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Blocking => eprintln!("⛔ {}", notice.message),
            NoticeLevel::Inline => eprintln!("❌ {}", notice.message),
            NoticeLevel::Info => println!("✅ {}", notice.message),
        }
    }
}

/// Inline failure text for an in-page action.
pub fn failure_message(action: &str, error: &ClientError) -> String {
    let message = error.to_string();
    if message.is_empty() {
        format!("{action}: Unknown error")
    } else {
        format!("{action}: {message}")
    }
}

pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct Preset(pub bool);

impl Confirm for Preset {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{prompt} (y/n): ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
