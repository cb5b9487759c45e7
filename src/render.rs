//! Terminal rendering surface for the repository list.
//!
//! Produces plain strings so callers decide where output goes. Identifiers
//! `repository-likes-{id}` and `like-button-{id}` are emitted on request for
//! scripted verification of the output.

use crate::types::{LikeFailure, RepositoryRecord};
use colored::*;
use std::fmt::Write;

const LIKE_LABEL: &str = "Curtir";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub color: bool,
    pub show_test_ids: bool,
}

pub fn likes_label(likes: u64) -> String {
    format!("{} curtidas", likes)
}

pub fn likes_test_id(record: &RepositoryRecord) -> String {
    format!("repository-likes-{}", record.id)
}

pub fn like_button_test_id(record: &RepositoryRecord) -> String {
    format!("like-button-{}", record.id)
}

pub fn render_record(record: &RepositoryRecord, options: &RenderOptions) -> String {
    let mut out = String::new();

    let title = if options.color {
        record.title.bold().to_string()
    } else {
        record.title.clone()
    };
    let _ = writeln!(out, "{}", title);

    if !record.techs.is_empty() {
        let techs: Vec<String> = record
            .techs
            .iter()
            .map(|tech| {
                let tag = format!("[{}]", tech);
                if options.color { tag.green().bold().to_string() } else { tag }
            })
            .collect();
        let _ = writeln!(out, "  {}", techs.join(" "));
    }

    let likes = likes_label(record.likes);
    let button = format!("[ {} ]", LIKE_LABEL);
    let (likes, button) = if options.color {
        (likes.bold().to_string(), button.white().on_purple().bold().to_string())
    } else {
        (likes, button)
    };

    if options.show_test_ids {
        let _ = writeln!(out, "  {}  <{}>", likes, likes_test_id(record));
        let _ = writeln!(out, "  {}  <{}>", button, like_button_test_id(record));
    } else {
        let _ = writeln!(out, "  {}", likes);
        let _ = writeln!(out, "  {}", button);
    }

    out
}

pub fn render_list(records: &[RepositoryRecord], options: &RenderOptions) -> String {
    if records.is_empty() {
        let hint = "No repositories yet.";
        return if options.color {
            format!("{}\n", hint.dimmed())
        } else {
            format!("{}\n", hint)
        };
    }

    records
        .iter()
        .map(|record| render_record(record, options))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Banner shown when a like round-trip fails; the list itself is left as it was.
pub fn render_failure(failure: &LikeFailure, color: bool) -> String {
    let message = format!("⚠️ Could not like repository {}: {}", failure.id, failure.reason);
    if color {
        message.red().bold().to_string()
    } else {
        message
    }
}
