//! User-facing messages on stderr
//!
//! Warnings and errors for people at a terminal, without the timestamps and
//! module paths of the log output.

use owo_colors::OwoColorize;

/// Yellow warning, padded with blank lines
///
/// # Example
/// ```ignore
/// output::warn("Index was built by a different fsindex version. Run 'fsindex index --force'.");
/// ```
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Red error, padded with blank lines
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Plain informational message, padded with blank lines
pub fn info(message: &str) {
    eprintln!("\n{}\n", message);
}

/// Green confirmation of a finished action
pub fn success(message: &str) {
    eprintln!("{}", message.green());
}
