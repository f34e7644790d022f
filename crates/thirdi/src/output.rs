//! Small output helpers: quiet-aware printing, colors, byte formatting.

use std::io::{self, IsTerminal};

use owo_colors::OwoColorize;

/// Print a line unless `--quiet` was passed.
pub fn note(quiet: bool, line: &str) {
    if !quiet {
        println!("{line}");
    }
}

/// Whether to color output: terminal attached and `NO_COLOR` unset.
pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err()
}

/// A green "ok" or red "down" marker.
pub fn up_down(up: bool) -> String {
    if !should_color() {
        return if up { "up".into() } else { "down".into() };
    }
    if up {
        format!("{}", "up".green())
    } else {
        format!("{}", "down".red())
    }
}

/// Highlight an essid in output.
pub fn essid(name: &str) -> String {
    if should_color() {
        format!("{}", name.cyan().bold())
    } else {
        name.to_owned()
    }
}

/// Format bytes into a compact human-readable string ("245M", "1.2G").
pub fn fmt_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1}G", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{}M", bytes / 1_000_000)
    } else if bytes >= 1_000 {
        format!("{}K", bytes / 1_000)
    } else {
        format!("{bytes}B")
    }
}
