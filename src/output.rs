//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output leads with what the user recognizes (era titles, phases,
//! positional indices); ids, file names and byte counts follow as secondary
//! context on indented lines.
//!
//! # Output Format
//!
//! ## Catalog
//!
//! ```text
//! Time Travel
//! 001 Ancient Egypt (ancient-egypt)
//!     Pharaohs & Gold
//! 002 Viking Age (vikings)
//!     Warriors of the North
//! ```
//!
//! ## Status
//!
//! ```text
//! Phase: complete
//!     Portrait: image/jpeg, 48213 bytes
//!     Era: Viking Age (vikings)
//!     Result: image/png, 901234 bytes
//!     Darkroom: sepia(0%) contrast(100%) brightness(100%), grain off
//! History: 2 plates
//! ```
//!
//! ## History
//!
//! ```text
//! Recent Plates
//! 001 Film Noir (film-noir) <- showing
//!     Prompt: Transform the person into a 1940s detective or femme fa...
//! 002 Viking Age (vikings)
//!     Prompt: Transform the person into a fierce Viking warrior. Fur...
//! ```
//!
//! ## Plates
//!
//! ```text
//! Plates in ./out
//! 001 Film Noir → chronosnap-film-noir-1700000000123.png (881 KB)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::darkroom::Adjustments;
use crate::era::{self, EraCategory};
use crate::export::PlateFile;
use crate::session::{GenerationResult, Session};
use serde::Serialize;
use std::path::Path;

/// Prompt previews are cut to this many characters.
const PROMPT_PREVIEW: usize = 56;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// `Title (id)`, the display identity of an era.
fn era_label(title: &str, id: &str) -> String {
    format!("{} ({})", title, id)
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Format the era catalog, grouped by category in display order.
pub fn format_catalog(categories: &[EraCategory]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(category.label().to_string());
        for (pos, era) in era::by_category(*category).iter().enumerate() {
            lines.push(format!(
                "{} {}",
                format_index(pos + 1),
                era_label(era.title, era.id)
            ));
            lines.push(format!("{}{}", indent(1), era.description));
        }
    }
    lines
}

pub fn print_catalog(categories: &[EraCategory]) {
    for line in format_catalog(categories) {
        println!("{}", line);
    }
}

// ============================================================================
// Session status
// ============================================================================

/// Format where the session stands and what it holds.
pub fn format_status(session: &Session, adjustments: &Adjustments) -> Vec<String> {
    let mut lines = vec![format!("Phase: {}", session.phase())];
    let ctx = indent(1);

    if let Some(source) = session.source() {
        lines.push(format!(
            "{ctx}Portrait: {}, {} bytes",
            source.mime_type(),
            source.len()
        ));
    }
    if let Some(era) = session.selected_era() {
        lines.push(format!("{ctx}Era: {}", era_label(era.title, era.id)));
    }
    if let Some(prompt) = session.pending_prompt() {
        lines.push(format!("{ctx}Prompt: {}", truncate_desc(prompt, PROMPT_PREVIEW)));
    }
    if let Some(result) = session.result() {
        lines.push(format!(
            "{ctx}Result: {}, {} bytes",
            result.image.mime_type(),
            result.image.len()
        ));
        lines.push(format!(
            "{ctx}Darkroom: {}, grain {}",
            adjustments.css_filter(),
            if adjustments.grain() { "on" } else { "off" }
        ));
    }
    if let Some(error) = session.error() {
        lines.push(format!("{ctx}Error: {}", error));
    }

    let count = session.history().len();
    lines.push(format!(
        "History: {} plate{}",
        count,
        if count == 1 { "" } else { "s" }
    ));
    lines
}

pub fn print_status(session: &Session, adjustments: &Adjustments) {
    for line in format_status(session, adjustments) {
        println!("{}", line);
    }
}

// ============================================================================
// History
// ============================================================================

/// Format the session history, marking the result currently on display.
pub fn format_history(history: &[GenerationResult], showing: Option<&GenerationResult>) -> Vec<String> {
    let mut lines = vec!["Recent Plates".to_string()];
    if history.is_empty() {
        lines.push(format!("{}(none yet)", indent(1)));
        return lines;
    }
    for (i, entry) in history.iter().enumerate() {
        let marker = if showing == Some(entry) { " <- showing" } else { "" };
        lines.push(format!(
            "{} {}{}",
            format_index(i + 1),
            era_label(entry.era.title, entry.era.id),
            marker
        ));
        lines.push(format!(
            "{}Prompt: {}",
            indent(1),
            truncate_desc(&entry.original_prompt, PROMPT_PREVIEW)
        ));
    }
    lines
}

pub fn print_history(history: &[GenerationResult], showing: Option<&GenerationResult>) {
    for line in format_history(history, showing) {
        println!("{}", line);
    }
}

// ============================================================================
// Exported plates
// ============================================================================

/// Format a listing of exported plates in `dir`.
pub fn format_plates(plates: &[PlateFile], dir: &Path) -> Vec<String> {
    let mut lines = vec![format!("Plates in {}", dir.display())];
    if plates.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
        return lines;
    }
    for (i, plate) in plates.iter().enumerate() {
        let file = plate
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = era::find(&plate.name.era_id)
            .map(|e| e.title)
            .unwrap_or(plate.name.era_id.as_str());
        lines.push(format!(
            "{} {} → {} ({})",
            format_index(i + 1),
            title,
            file,
            human_size(plate.size)
        ));
    }
    lines
}

pub fn print_plates(plates: &[PlateFile], dir: &Path) {
    for line in format_plates(plates, dir) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON summary
// ============================================================================

/// Machine-readable snapshot of a session, for `--json`.
#[derive(Debug, Serialize)]
pub struct SessionSummary<'a> {
    pub phase: &'static str,
    pub era: Option<&'a str>,
    pub error: Option<&'a str>,
    pub result: Option<ResultSummary<'a>>,
    pub history: usize,
    pub adjustments: &'a Adjustments,
    pub exported: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultSummary<'a> {
    pub era: &'a str,
    pub timestamp_ms: u64,
    pub mime_type: &'a str,
    pub bytes: usize,
    pub prompt: &'a str,
}

impl<'a> SessionSummary<'a> {
    pub fn new(session: &'a Session, adjustments: &'a Adjustments, exported: Option<&Path>) -> Self {
        Self {
            phase: session.phase().as_str(),
            era: session.selected_era().map(|e| e.id),
            error: session.error(),
            result: session.result().map(|r| ResultSummary {
                era: r.era.id,
                timestamp_ms: r.unix_millis(),
                mime_type: r.image.mime_type(),
                bytes: r.image.len(),
                prompt: &r.original_prompt,
            }),
            history: session.history().len(),
            adjustments,
            exported: exported.map(|p| p.display().to_string()),
        }
    }
}

pub fn print_summary_json(summary: &SessionSummary<'_>) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
