//! Operator facing console lines.
//!
//! Informational and warning lines go to stdout and never halt the run. A fatal
//! condition is a single labeled line on stderr; terminating is up to the caller.

use colored::Colorize;

use crate::error::Error;

pub fn info(msg: impl AsRef<str>) {
    println!("{} {}", "[INFO]".green(), msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    println!("{} {}", "[WARN]".yellow(), msg.as_ref());
}

pub fn fatal(err: &Error) {
    fatal_message(err.category(), err);
}

pub fn fatal_message(category: &str, msg: impl std::fmt::Display) {
    eprintln!("{} {category}: {msg}", "[FATAL]".red().bold());
}

pub fn aborted() {
    eprintln!("\n{} User interrupted.", "[ABORTED]".red());
}
