//! Deprecation index over the dictionary's `save_` frames.
//!
//! The dictionary marks retirement three ways and this index folds all of
//! them into one record per field:
//!
//! * `_definition_replaced.by '<field>'` names a successor; the `.`
//!   sentinel means withdrawn with no successor.
//! * `_alias.deprecation_date` rows date the retirement of individual
//!   CIF1 aliases.
//! * `DEPRECATED` markers in free-text `_description.text` blocks, often
//!   with a `Use _x` or `Replaced by '_x'` hint.
//!
//! Like the alias tables, the index is built on first query and cached in
//! a `OnceCell`.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use tracing::debug;

use super::parser;

/// How loudly a consumer should flag a use of the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The dictionary names an explicit replacement path.
    Warning,
    /// Deprecation is only asserted in descriptive text.
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationInfo {
    pub field_name: String,
    pub replacement_field: Option<String>,
    pub deprecation_date: Option<String>,
    pub reason: String,
    pub severity: Severity,
}

/// Per-field deprecation records for one dictionary text.
#[derive(Debug)]
pub struct DeprecationIndex {
    text: String,
    info: OnceCell<HashMap<String, DeprecationInfo>>,
}

impl DeprecationIndex {
    pub fn new(text: impl Into<String>) -> Self {
        DeprecationIndex { text: text.into(), info: OnceCell::new() }
    }

    fn index(&self) -> &HashMap<String, DeprecationInfo> {
        self.info.get_or_init(|| build_index(&self.text))
    }

    pub fn is_deprecated(&self, field_name: &str) -> bool {
        self.index().contains_key(&field_name.to_lowercase())
    }

    pub fn get_info(&self, field_name: &str) -> Option<&DeprecationInfo> {
        self.index().get(&field_name.to_lowercase())
    }

    pub fn get_replacement(&self, field_name: &str) -> Option<&str> {
        self.get_info(field_name)?.replacement_field.as_deref()
    }

    pub fn all_deprecated_fields(&self) -> Vec<&str> {
        self.index().values().map(|info| info.field_name.as_str()).collect()
    }

    /// Human-readable migration advice, `None` for fields in good standing.
    pub fn get_migration_suggestion(&self, field_name: &str) -> Option<String> {
        let info = self.get_info(field_name)?;
        let suggestion = match &info.replacement_field {
            Some(replacement) => {
                let mut s = format!("Replace '{}' with '{}'", info.field_name, replacement);
                if let Some(date) = &info.deprecation_date {
                    s.push_str(&format!(" (deprecated since {date})"));
                }
                s
            }
            None => format!("Field '{}' is deprecated: {}", info.field_name, info.reason),
        };
        Some(suggestion)
    }
}

fn build_index(text: &str) -> HashMap<String, DeprecationInfo> {
    let mut index = HashMap::new();

    for (name, body) in parser::save_blocks(text) {
        if parser::is_category_name(name) {
            continue;
        }
        let Some(main_field) = parser::definition_id(body) else {
            continue;
        };

        let replacement = parser::replacement_target(body);
        let withdrawn = parser::replaced_without_successor(body);
        let has_marker = replacement.is_some() || withdrawn;
        let description = description_deprecation(body);

        if has_marker || description.is_some() {
            let reason = match (&description, &replacement) {
                (Some(from_text), _) => from_text.clone(),
                (None, Some(successor)) => format!("Superseded by {successor}"),
                _ if withdrawn => "Deprecated with no direct replacement".to_string(),
                _ => "Deprecated field".to_string(),
            };
            let severity = if has_marker { Severity::Warning } else { Severity::Info };
            index.insert(
                main_field.to_lowercase(),
                DeprecationInfo {
                    field_name: main_field.clone(),
                    replacement_field: replacement,
                    deprecation_date: None,
                    reason,
                    severity,
                },
            );
        }

        // Dated alias rows retire the CIF1 spelling in favor of the frame's
        // own definition.
        for alias in parser::extract_aliases(body) {
            if !alias.is_deprecated() {
                continue;
            }
            index.entry(alias.name.to_lowercase()).or_insert_with(|| DeprecationInfo {
                field_name: alias.name.clone(),
                replacement_field: Some(main_field.clone()),
                deprecation_date: alias.deprecation_date.clone(),
                reason: format!("Superseded by {main_field}"),
                severity: Severity::Warning,
            });
        }
    }

    debug!(deprecated = index.len(), "built deprecation index");
    index
}

/// Deprecation reason taken from the description text, `None` when the
/// text carries no `DEPRECATED` marker.
fn description_deprecation(body: &str) -> Option<String> {
    let caps = regex!(r"(?s)_description\.text\s*\n;\s*(.*?)\s*\n;").captures(body)?;
    let description = &caps[1];

    if !regex!(r"(?mi)\*\*DEPRECATED\*\*|DEPRECATED\.|^DEPRECATED").is_match(description) {
        return None;
    }
    if let Some(use_caps) = regex!(r"Use\s+([_\w.]+)").captures(description) {
        return Some(format!("Use {} instead", &use_caps[1]));
    }
    if let Some(replaced_caps) = regex!(r"Replaced by\s+'([^']+)'").captures(description) {
        return Some(format!("Replaced by {}", &replaced_caps[1]));
    }
    Some("Deprecated field".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICT: &str = "\
save_cell_measurement.wavelength
_definition.id   '_cell_measurement.wavelength'
_definition_replaced.by   '_diffrn_radiation_wavelength.value'
_description.text
;
    **DEPRECATED** Use _diffrn_radiation_wavelength.value instead.
;
save_

save_cell_measurement.temperature
_definition.id   '_cell_measurement.temperature'
_definition_replaced.by   '_diffrn.ambient_temperature'
save_

save_cell_measurement.radiation
_definition.id   '_cell_measurement.radiation'
_definition_replaced.by   .
_description.text
;
    DEPRECATED. No modern equivalent is defined.
;
save_

save_exptl_crystal.density_meas_temp
_definition.id   '_exptl_crystal.density_meas_temp'
_description.text
;
    DEPRECATED. Should not be used.
;
save_

save_cell.length_a
_definition.id   '_cell.length_a'
loop_
  _alias.definition_id
  _alias.deprecation_date
    '_cell_length_a'       .
    '_cell_length.a'       2003-05-01
save_
";

    #[test]
    fn replacement_marker_implies_deprecated_even_without_text_marker() {
        let index = DeprecationIndex::new(DICT);
        let info = index.get_info("_cell_measurement.temperature").unwrap();
        assert_eq!(info.replacement_field.as_deref(), Some("_diffrn.ambient_temperature"));
        assert_eq!(info.severity, Severity::Warning);
        assert_eq!(info.reason, "Superseded by _diffrn.ambient_temperature");
    }

    #[test]
    fn description_hint_takes_priority_as_the_reason() {
        let index = DeprecationIndex::new(DICT);
        let info = index.get_info("_cell_measurement.wavelength").unwrap();
        assert_eq!(info.reason, "Use _diffrn_radiation_wavelength.value instead");
        assert_eq!(info.severity, Severity::Warning);
    }

    #[test]
    fn withdrawn_sentinel_means_deprecated_with_no_replacement() {
        let index = DeprecationIndex::new(DICT);
        let info = index.get_info("_cell_measurement.radiation").unwrap();
        assert_eq!(info.replacement_field, None);
        assert_eq!(info.severity, Severity::Warning);
    }

    #[test]
    fn text_only_deprecation_is_informational() {
        let index = DeprecationIndex::new(DICT);
        let info = index.get_info("_exptl_crystal.density_meas_temp").unwrap();
        assert_eq!(info.severity, Severity::Info);
        assert_eq!(info.replacement_field, None);
    }

    #[test]
    fn dated_aliases_point_at_the_enclosing_definition() {
        let index = DeprecationIndex::new(DICT);
        let info = index.get_info("_cell_length.a").unwrap();
        assert_eq!(info.replacement_field.as_deref(), Some("_cell.length_a"));
        assert_eq!(info.deprecation_date.as_deref(), Some("2003-05-01"));
        // The '.' sentinel alias is not deprecated.
        assert!(!index.is_deprecated("_cell_length_a"));
        assert!(!index.is_deprecated("_cell.length_a"));
    }

    #[test]
    fn migration_suggestions_name_the_replacement_and_date() {
        let index = DeprecationIndex::new(DICT);
        assert_eq!(
            index.get_migration_suggestion("_cell_length.a").as_deref(),
            Some("Replace '_cell_length.a' with '_cell.length_a' (deprecated since 2003-05-01)")
        );
        assert_eq!(
            index.get_migration_suggestion("_cell_measurement.radiation").as_deref(),
            Some("Field '_cell_measurement.radiation' is deprecated: Deprecated field")
        );
        assert_eq!(index.get_migration_suggestion("_cell_length_a"), None);
    }
}
