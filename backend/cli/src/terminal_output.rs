//! Terminal output: ANSI-styled notes and conversation rendering.

use parley_core::{ConversationEntry, Role, Topic};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// One conversation line, e.g. `[12:04:31] agent: 4`.
pub fn format_entry(entry: &ConversationEntry, color: bool) -> String {
    let time = entry.created_at().format("%H:%M:%S");
    let role = entry.role().as_str();
    if !color {
        return format!("[{time}] {role}: {}", entry.text());
    }
    let tint = match entry.role() {
        Role::User => BLUE,
        Role::Agent => GREEN,
    };
    format!("{DIM}[{time}]{RESET} {tint}{BOLD}{role}{RESET}: {}", entry.text())
}

pub fn print_entries(entries: &[ConversationEntry]) {
    let color = supports_color();
    for entry in entries {
        println!("{}", format_entry(entry, color));
    }
}

pub fn format_topics(topics: &[Topic]) -> String {
    topics
        .iter()
        .enumerate()
        .map(|(i, t)| format!("  {}. {} <{}>", i + 1, t.title, t.url))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_article(article: &str, topics: &[Topic]) {
    println!("{article}");
    if !topics.is_empty() {
        println!();
        if supports_color() {
            println!("{BOLD}Further reading{RESET}");
        } else {
            println!("Further reading");
        }
        println!("{}", format_topics(topics));
    }
}
