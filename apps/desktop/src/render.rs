//! Plain-text rendering of upload sessions.

use std::fmt::Write as _;

use chrono::Local;
use client_core::UploadSession;
use shared::domain::{MatchRecord, SearchResult, WorkflowKind, WorkflowResult};

pub fn render_session(session: &UploadSession) -> String {
    let kind = session.kind();
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", section_title(kind));

    if let Some(message) = session.error_message() {
        let _ = writeln!(out, "! {message}");
    }
    match session.image() {
        Some(image) => {
            let _ = writeln!(
                out,
                "Image Preview: {} ({}, {})",
                image.preview().uri(),
                image.name(),
                human_readable_bytes(image.size_bytes() as u64)
            );
        }
        None => {
            let _ = writeln!(out, "No image selected.");
        }
    }
    if session.is_busy() {
        let _ = writeln!(out, "{}", busy_label(kind));
    } else if session.can_submit() {
        let _ = writeln!(out, "Ready to {}: submit {}", kind.label(), kind.label());
    }

    match session.result() {
        Some(WorkflowResult::Registered(result)) => {
            let _ = writeln!(out, "Registered Animal ID: {}", result.animal_id);
        }
        Some(WorkflowResult::Matches(result)) => out.push_str(&render_search_result(result)),
        None => {}
    }
    out
}

pub fn render_search_result(result: &SearchResult) -> String {
    let mut out = String::from("Search Results\n");
    if result.is_empty() {
        out.push_str("No matching results found.\n");
        return out;
    }
    for record in &result.matches {
        out.push_str(&render_match_card(record));
    }
    out
}

fn render_match_card(record: &MatchRecord) -> String {
    let mut card = String::new();
    let _ = writeln!(card, "- Animal ID: {}", record.animal_id);
    let _ = writeln!(card, "  Similarity: {}", format_similarity(record.similarity));
    let _ = writeln!(
        card,
        "  Registered At: {}",
        record
            .registered_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(url) = &record.image_url {
        let _ = writeln!(card, "  Image: {url}");
    }
    card
}

pub fn format_similarity(similarity: f64) -> String {
    format!("{:.2}%", similarity * 100.0)
}

fn section_title(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Register => "Register New Animal",
        WorkflowKind::Search => "Search Animal",
    }
}

fn busy_label(kind: WorkflowKind) -> &'static str {
    match kind {
        WorkflowKind::Register => "Registering...",
        WorkflowKind::Search => "Searching...",
    }
}

pub fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    format_scaled_unit(bytes, MB, "MB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}
