//! Rule application over document text.
//!
//! The engine never mutates its input: each call rebuilds the document as a
//! line buffer, applies the rules in order, and returns the new text with a
//! log entry per change actually made. Applying the same rule set twice is
//! a fixed point: once a field is renamed or rewritten, the second pass
//! finds nothing left to match.
//!
//! APPEND has its own entry point because it edits inside semicolon blocks
//! the other actions deliberately skip.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::expr;
use crate::scan::with_block_state;

use super::{FieldRule, RuleAction};

/// Apply DELETE, EDIT, RENAME and CALCULATE rules in rule order. CHECK and
/// APPEND rules are ignored here; CHECK is interactive and APPEND goes
/// through [`apply_appends`].
pub fn apply_rules(content: &str, rules: &[FieldRule]) -> (String, Vec<String>) {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut log = Vec::new();

    for rule in rules {
        match &rule.action {
            RuleAction::Delete => delete_field(&mut lines, &rule.name, &mut log),
            RuleAction::Edit { value } => edit_field(&mut lines, &rule.name, value, &mut log),
            RuleAction::Rename { target } => rename_field(&mut lines, &rule.name, target, &mut log),
            RuleAction::Calculate { expression } => {
                calculate_field(&mut lines, &rule.name, expression, &mut log)
            }
            RuleAction::Check { .. } | RuleAction::Append { .. } => {}
        }
    }

    (rejoin(lines, content), log)
}

/// Apply APPEND rules: insert each rule's text at the end of the field's
/// semicolon block. Fields not in multiline form are left untouched.
pub fn apply_appends(content: &str, rules: &[FieldRule]) -> (String, Vec<String>) {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut log = Vec::new();

    for rule in rules {
        if let RuleAction::Append { text } = &rule.action {
            if append_to_block(&mut lines, &rule.name, text) {
                log.push(format!("APPENDED: {}", rule.name));
            }
        }
    }

    (rejoin(lines, content), log)
}

fn rejoin(lines: Vec<String>, original: &str) -> String {
    let mut text = lines.join("\n");
    if original.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// True when the trimmed line starts with `field` as a whole token, not as
/// a prefix of a longer name.
fn line_names_field(line: &str, field: &str) -> bool {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(field) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

fn delete_field(lines: &mut Vec<String>, field: &str, log: &mut Vec<String>) {
    let before = lines.len();
    lines.retain(|line| !line.trim_start().starts_with(field));
    if lines.len() != before {
        log.push(format!("DELETED: {field}"));
    }
}

fn edit_field(lines: &mut Vec<String>, field: &str, value: &str, log: &mut Vec<String>) {
    if value.is_empty() {
        delete_field(lines, field, log);
        return;
    }
    let mut edited = false;
    for line in lines.iter_mut() {
        if line.trim_start().starts_with(field) {
            *line = format!("{field}    {value}");
            edited = true;
        }
    }
    if edited {
        log.push(format!("EDITED: {field} -> {value}"));
    }
}

fn rename_field(lines: &mut [String], old: &str, target: &str, log: &mut Vec<String>) {
    let mut renamed = false;
    for line in lines.iter_mut() {
        if !line_names_field(line, old) {
            continue;
        }
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        let remainder = &trimmed[old.len()..];
        *line = format!("{indent}{target}{remainder}");
        renamed = true;
    }
    if renamed {
        log.push(format!("RENAMED: {old} -> {target}"));
    }
}

fn calculate_field(lines: &mut Vec<String>, field: &str, expression: &str, log: &mut Vec<String>) {
    let fields = collect_numeric_fields(lines);
    let value = match expr::evaluate(expression, &fields) {
        Ok(value) => value,
        Err(error) => {
            // Fails closed: no value is assigned, the document keeps its
            // current content for this field.
            warn!(field, %error, "CALCULATE evaluation failed");
            return;
        }
    };

    let formatted = format!("{value}");
    let mut replaced = false;
    for line in lines.iter_mut() {
        if line_names_field(line, field) {
            *line = format!("{field}    {formatted}");
            replaced = true;
            break;
        }
    }
    if !replaced {
        lines.push(format!("{field}    {formatted}"));
    }
    log.push(format!("CALCULATED: {field} = {formatted}"));
}

/// Numeric field values visible outside semicolon blocks. Quotes and a
/// trailing standard-uncertainty suffix like `(3)` are stripped before
/// parsing.
fn collect_numeric_fields(lines: &[String]) -> HashMap<String, f64> {
    let joined = lines.join("\n");
    let mut fields = HashMap::new();

    for (line, state) in with_block_state(&joined) {
        if state.in_block() || line.starts_with(';') {
            continue;
        }
        let Some(caps) = regex!(r"^\s*(_\S+)\s+(\S+)").captures(line) else {
            continue;
        };
        let name = &caps[1];
        let raw = caps[2].trim_matches(|c| c == '\'' || c == '"');
        let bare = regex!(r"\(\d+\)$").replace(raw, "");
        if let Ok(value) = bare.parse::<f64>() {
            fields.insert(name.to_string(), value);
        }
    }

    debug!(count = fields.len(), "collected numeric fields for CALCULATE");
    fields
}

/// Insert `text` before the closing delimiter of `field`'s semicolon block,
/// separated from the existing content by a blank line. Returns false when
/// the field is absent or not in multiline form.
fn append_to_block(lines: &mut Vec<String>, field: &str, text: &str) -> bool {
    // The field may appear several times (a loop header, a single-line
    // value); only an occurrence directly followed by the lone `;` opener
    // qualifies.
    let opening = (0..lines.len().saturating_sub(1)).find(|&at| {
        line_names_field(&lines[at], field) && lines[at + 1].trim() == ";"
    });
    let Some(opening) = opening else {
        return false;
    };

    let closing = lines[opening + 2..]
        .iter()
        .position(|line| line.trim() == ";")
        .map(|offset| opening + 2 + offset);
    let Some(closing) = closing else {
        return false;
    };

    let mut insert = vec![String::new()];
    insert.extend(text.lines().map(str::to_string));
    lines.splice(closing..closing, insert);
    true
}
