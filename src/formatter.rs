//! Terminal output formatting for search results
//!
//! Rows are printed in index order as a small tree under a header echoing
//! the query. Colors are used only on a TTY and never with `NO_COLOR`.

use crossterm::tty::IsTty;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::fmt::Write as _;
use std::io;

use crate::models::{MemberKey, ResultRow, SearchResponse, SearchResults};

/// Output formatter configuration
pub struct OutputFormatter {
    /// Whether to use colors and formatting
    pub use_colors: bool,
}

impl OutputFormatter {
    /// Create a new formatter with automatic TTY detection
    pub fn new(plain: bool) -> Self {
        let is_tty = io::stdout().is_tty();
        let no_color = std::env::var("NO_COLOR").is_ok();

        Self {
            use_colors: !plain && !no_color && is_tty,
        }
    }

    /// Print a search response to stdout
    pub fn format_response(&self, response: &SearchResponse) {
        print!("{}", self.render(response));
    }

    /// Render a search response as text
    pub fn render(&self, response: &SearchResponse) -> String {
        let mut out = String::new();

        let Some(results) = &response.results else {
            out.push_str("Empty query.\n");
            return out;
        };

        if results.is_empty() {
            out.push_str("No results found.\n");
            return out;
        }

        let count = results.len();
        let header = match (&response.name, &response.prototype) {
            (Some(name), _) => format!("name: {}", name),
            (_, Some(prototype)) => format!(": {}", prototype),
            _ => response.query.clone(),
        };
        let tally = format!("({} {})", count, if count == 1 { "result" } else { "results" });

        if self.use_colors {
            let _ = writeln!(out, "{} {}", header.bright_cyan().bold(), tally.dimmed());
        } else {
            let _ = writeln!(out, "{} {}", header, tally);
        }

        for (idx, row) in results.rows().iter().enumerate() {
            let connector = if idx + 1 == count { "└─" } else { "├─" };
            let line = match results {
                SearchResults::ByName(_) => self.name_line(row),
                SearchResults::BySignature(_) => self.signature_line(row),
            };

            if self.use_colors {
                let _ = writeln!(out, "  {} {}", connector.dimmed(), line);
            } else {
                let _ = writeln!(out, "  {} {}", connector, line);
            }
        }

        out
    }

    /// `[kind] name  in Owner`
    fn name_line(&self, row: &ResultRow) -> String {
        let name = row.key.get(0).and_then(Value::as_str).unwrap_or("?");
        let kind = row.key.get(1).and_then(Value::as_str).unwrap_or("?");
        let owner = owner_name(&row.value);

        if self.use_colors {
            format!(
                "{} {}  {}",
                self.kind_badge(kind),
                name.bold(),
                format!("in {}", owner).dimmed()
            )
        } else {
            format!("[{}] {}  in {}", kind, name, owner)
        }
    }

    /// `name : signature  in Owner`
    fn signature_line(&self, row: &ResultRow) -> String {
        let name = row.value.get("name").and_then(Value::as_str).unwrap_or("?");
        let owner = row.value.get("type").map(owner_name).unwrap_or_default();
        let signature = row.signature.as_deref().unwrap_or_default();

        if self.use_colors {
            format!(
                "{} : {}  {}",
                name.bold(),
                signature.green(),
                format!("in {}", owner).dimmed()
            )
        } else {
            format!("{} : {}  in {}", name, signature, owner)
        }
    }

    fn kind_badge(&self, kind: &str) -> String {
        let badge = format!("[{}]", kind);
        match kind {
            "type" => badge.cyan().to_string(),
            "method" => badge.green().to_string(),
            "property" => badge.blue().to_string(),
            "event" => badge.magenta().to_string(),
            "field" => badge.yellow().to_string(),
            _ => badge,
        }
    }
}

/// Display name of the type a row belongs to
fn owner_name(value: &Value) -> String {
    serde_json::from_value::<MemberKey>(value.clone())
        .map(|key| key.full_name())
        .unwrap_or_else(|_| value.to_string())
}
