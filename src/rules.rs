//! Field-rules DSL: parsing rule files and applying them to documents.
//!
//! A rules file is line oriented. Each non-comment line is
//! `[ACTION:] <field> [value]` where the action prefix is one of `DELETE:`,
//! `EDIT:`, `APPEND:`, `RENAME:` or `CALCULATE:` (case-insensitive) and its
//! absence means CHECK. `#` opens a comment, either a whole line or a
//! trailing one; a line starting with `//` is a pure comment with no inline
//! splitting. Standalone `# _field: text` comments document a field and are
//! attached to its rule.
//!
//! Loading (loader.rs) turns the file into an ordered `Vec<FieldRule>`;
//! application (engine.rs) replays a rule list over document text and
//! reports each change in an operation log. Rule lists are immutable after
//! loading and may be applied to any number of documents.

#[path = "rules/engine.rs"]
mod engine;
#[path = "rules/loader.rs"]
mod loader;
#[cfg(test)]
#[path = "rules/tests.rs"]
mod tests;

pub use engine::{apply_appends, apply_rules};
pub use loader::parse_rules;

/// One entry from a rules file.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: String,
    /// Documentation gathered from `# _field: text` comments or the line's
    /// trailing comment, empty when the file offers none.
    pub description: String,
    pub action: RuleAction,
}

/// What a rule does to its field. Exactly one action per rule; repeated
/// CHECK and APPEND lines for the same field aggregate into a single rule
/// at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// Present-and-plausible check with a default and suggested values.
    Check {
        /// First non-empty value observed across the field's CHECK lines.
        default_value: String,
        /// Distinct observed values in first-seen order.
        suggestions: Vec<String>,
    },
    Delete,
    Edit {
        /// Replacement value; empty means remove the line.
        value: String,
    },
    Append {
        /// Text inserted into the field's multiline block. Aggregated
        /// APPEND lines are joined with a blank line between them.
        text: String,
    },
    Rename {
        target: String,
    },
    Calculate {
        expression: String,
    },
}

impl FieldRule {
    /// Action keyword as written in a rules file, for logs and round-trip
    /// display.
    pub fn action_name(&self) -> &'static str {
        match self.action {
            RuleAction::Check { .. } => "CHECK",
            RuleAction::Delete => "DELETE",
            RuleAction::Edit { .. } => "EDIT",
            RuleAction::Append { .. } => "APPEND",
            RuleAction::Rename { .. } => "RENAME",
            RuleAction::Calculate { .. } => "CALCULATE",
        }
    }
}
