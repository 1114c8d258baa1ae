use std::fs;
use std::path::Path;

use tracing::info;

use crate::dictionary::{DeprecationIndex, DictionaryParser};
use crate::error::{Error, Result};
use crate::rules::{self, FieldRule};

/// Load and parse a rules file.
///
/// # Example
/// ```no_run
/// let rules = cifmend::load_rules("field_rules.txt")?;
/// # Ok::<(), cifmend::Error>(())
/// ```
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<FieldRule>> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let rules = rules::parse_rules(&text);
    info!(path = %path.display(), count = rules.len(), "loaded rules file");
    Ok(rules)
}

/// Apply a rule list to document text.
///
/// Runs the line-level actions first, then APPEND insertions into multiline
/// blocks, and returns the rewritten text with one log entry per change.
/// The input is never mutated and the same rule list may be reused across
/// documents.
pub fn apply_rules(content: &str, rules: &[FieldRule]) -> (String, Vec<String>) {
    let (content, mut log) = rules::apply_rules(content, rules);
    let (content, appended) = rules::apply_appends(&content, rules);
    log.extend(appended);
    (content, log)
}

/// Load a CIF dictionary for alias queries.
///
/// The file's absence is an error; callers must not fall back to an empty
/// dictionary and silently answer every query with "unknown".
pub fn parse_dictionary(path: impl AsRef<Path>) -> Result<DictionaryParser> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::DictionaryNotFound(path.to_path_buf()));
    }
    let text =
        fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    Ok(DictionaryParser::new(text))
}

/// Load the deprecation index from a CIF dictionary file.
pub fn load_deprecations(path: impl AsRef<Path>) -> Result<DeprecationIndex> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::DictionaryNotFound(path.to_path_buf()));
    }
    let text =
        fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    Ok(DeprecationIndex::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleAction;

    #[test]
    fn apply_rules_runs_line_actions_then_appends() {
        let content = "_old_name 1\n_notes\n;\nexisting text\n;\n";
        let rules = vec![
            FieldRule {
                name: "_old_name".to_string(),
                description: String::new(),
                action: RuleAction::Rename { target: "_new_name".to_string() },
            },
            FieldRule {
                name: "_notes".to_string(),
                description: String::new(),
                action: RuleAction::Append { text: "appended line".to_string() },
            },
        ];
        let (text, log) = apply_rules(content, &rules);
        assert_eq!(text, "_new_name 1\n_notes\n;\nexisting text\n\nappended line\n;\n");
        assert_eq!(log, vec!["RENAMED: _old_name -> _new_name", "APPENDED: _notes"]);
    }

    #[test]
    fn missing_dictionary_is_an_error_not_an_empty_table() {
        let err = parse_dictionary("/nonexistent/cif_core.dic").unwrap_err();
        assert!(matches!(err, Error::DictionaryNotFound(_)));
    }
}
