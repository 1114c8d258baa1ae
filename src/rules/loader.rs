//! Rules-file parser.
//!
//! Two passes over the text. Pass one harvests descriptions from standalone
//! `# _field: text` comments and from trailing comments on rule lines. Pass
//! two parses the rule lines themselves, aggregating repeated CHECK and
//! APPEND lines for a field into one rule. Malformed lines are skipped with
//! a log entry, never fatal; a rules file with a typo still loads the rest.

use std::collections::HashMap;

use tracing::warn;

use super::{FieldRule, RuleAction};

/// Parse a rules file into an ordered rule list.
pub fn parse_rules(text: &str) -> Vec<FieldRule> {
    let descriptions = collect_descriptions(text);

    let mut rules: Vec<FieldRule> = Vec::new();
    let mut check_index: HashMap<String, usize> = HashMap::new();
    let mut append_index: HashMap<String, usize> = HashMap::new();

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let line = match line.split_once('#') {
            Some((code, _)) => code.trim(),
            None => line,
        };
        if line.is_empty() {
            continue;
        }

        let (keyword, rest) = split_action(line);
        let action = match parse_action(keyword, rest) {
            Some(parsed) => parsed,
            None => {
                warn!(line = number + 1, text = line, "skipping malformed rule line");
                continue;
            }
        };
        let (name, action) = action;

        match action {
            RuleAction::Check { default_value, suggestions } => {
                let value = suggestions.first().cloned().unwrap_or_default();
                if let Some(&at) = check_index.get(&name) {
                    if let RuleAction::Check {
                        default_value: existing_default,
                        suggestions: existing,
                    } = &mut rules[at].action
                    {
                        if !value.is_empty() && !existing.iter().any(|s| s == &value) {
                            existing.push(value.clone());
                        }
                        if existing_default.is_empty() {
                            *existing_default = value;
                        }
                    }
                } else {
                    check_index.insert(name.clone(), rules.len());
                    rules.push(FieldRule {
                        description: description_for(&descriptions, &name),
                        name,
                        action: RuleAction::Check { default_value, suggestions },
                    });
                }
            }
            RuleAction::Append { text: addition } => {
                if let Some(&at) = append_index.get(&name) {
                    if let RuleAction::Append { text: existing } = &mut rules[at].action {
                        existing.push_str("\n\n");
                        existing.push_str(&addition);
                    }
                } else {
                    append_index.insert(name.clone(), rules.len());
                    rules.push(FieldRule {
                        description: description_for(&descriptions, &name),
                        name,
                        action: RuleAction::Append { text: addition },
                    });
                }
            }
            other => rules.push(FieldRule {
                description: description_for(&descriptions, &name),
                name,
                action: other,
            }),
        }
    }

    rules
}

/// Pass one: field descriptions, first-seen wins.
fn collect_descriptions(text: &str) -> HashMap<String, String> {
    let mut descriptions = HashMap::new();

    for raw in text.lines() {
        let line = raw.trim();
        if let Some(comment) = line.strip_prefix('#') {
            if let Some((name, description)) = comment.split_once(':') {
                let name = name.trim();
                if name.starts_with('_') {
                    descriptions
                        .entry(name.to_string())
                        .or_insert_with(|| description.trim().to_string());
                }
            }
        } else if !line.starts_with("//") {
            if let Some((code, comment)) = line.split_once('#') {
                let (_, rest) = split_action(code.trim());
                if let Some(name) = rest.split_whitespace().next() {
                    if name.starts_with('_') {
                        descriptions
                            .entry(name.to_string())
                            .or_insert_with(|| comment.trim().to_string());
                    }
                }
            }
        }
    }

    descriptions
}

fn description_for(descriptions: &HashMap<String, String>, name: &str) -> String {
    let description = descriptions.get(name).cloned().unwrap_or_default();
    merge_options(&description)
}

/// Put an `options:` tail from a comment on its own line so option lists
/// display below the prose.
fn merge_options(description: &str) -> String {
    match description.to_lowercase().find("options:") {
        Some(at) => format!("{}\n{}", description[..at].trim(), description[at..].trim()),
        None => description.to_string(),
    }
}

/// Split off a recognized action prefix; anything else is a CHECK line.
fn split_action(line: &str) -> (&'static str, &str) {
    if let Some((head, rest)) = line.split_once(':') {
        let keyword = match head.trim().to_ascii_uppercase().as_str() {
            "DELETE" => Some("DELETE"),
            "EDIT" => Some("EDIT"),
            "APPEND" => Some("APPEND"),
            "RENAME" => Some("RENAME"),
            "CALCULATE" => Some("CALCULATE"),
            _ => None,
        };
        if let Some(keyword) = keyword {
            return (keyword, rest.trim());
        }
    }
    ("CHECK", line)
}

/// Parse the text after the action prefix. `None` means the line is
/// malformed for its action.
fn parse_action(keyword: &str, rest: &str) -> Option<(String, RuleAction)> {
    match keyword {
        "DELETE" => {
            let mut tokens = rest.split_whitespace();
            let name = tokens.next()?;
            if !name.starts_with('_') || tokens.next().is_some() {
                return None;
            }
            Some((name.to_string(), RuleAction::Delete))
        }
        "RENAME" => {
            let mut tokens = rest.split_whitespace();
            let (old, new) = (tokens.next()?, tokens.next()?);
            if !old.starts_with('_') || !new.starts_with('_') || tokens.next().is_some() {
                return None;
            }
            Some((old.to_string(), RuleAction::Rename { target: new.to_string() }))
        }
        "CALCULATE" => {
            let (name, expression) = rest.split_once('=')?;
            let (name, expression) = (name.trim(), expression.trim());
            if !name.starts_with('_') || expression.is_empty() {
                return None;
            }
            Some((name.to_string(), RuleAction::Calculate { expression: expression.to_string() }))
        }
        "EDIT" | "APPEND" | "CHECK" => {
            let (name, value) = match rest.split_once(char::is_whitespace) {
                Some((name, value)) => (name, value.trim()),
                None => (rest, ""),
            };
            if !name.starts_with('_') {
                return None;
            }
            let name = name.to_string();
            let action = match keyword {
                "EDIT" => RuleAction::Edit { value: value.to_string() },
                "APPEND" => RuleAction::Append { text: value.to_string() },
                _ => {
                    let suggestions =
                        if value.is_empty() { Vec::new() } else { vec![value.to_string()] };
                    RuleAction::Check { default_value: value.to_string(), suggestions }
                }
            };
            Some((name, action))
        }
        _ => None,
    }
}
