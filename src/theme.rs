//! Terminal colors for human-readable output

use colored::*;

pub struct Theme;

impl Theme {
    pub fn header(text: &str) -> ColoredString {
        text.bold().cyan()
    }

    pub fn divider(width: usize) -> ColoredString {
        "─".repeat(width).as_str().dimmed()
    }

    pub fn divider_bold(width: usize) -> ColoredString {
        "━".repeat(width).as_str().cyan()
    }

    pub fn primary(text: &str) -> ColoredString {
        text.bold()
    }

    pub fn value(text: &str) -> ColoredString {
        text.bright_white().bold()
    }

    pub fn muted(text: &str) -> ColoredString {
        text.dimmed()
    }

    pub fn success(text: &str) -> ColoredString {
        text.green().bold()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red().bold()
    }

    /// Color for a diff category label
    pub fn kind(label: &str) -> ColoredString {
        match label {
            "added" => label.green(),
            "deleted" => label.red(),
            "changed" => label.yellow(),
            _ => label.magenta(),
        }
    }
}
