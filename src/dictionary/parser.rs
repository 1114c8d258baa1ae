//! CIF core dictionary parser.
//!
//! A DDLm dictionary is a sequence of `save_` frames. A frame named after a
//! field carries the canonical CIF2 name in `_definition.id`, zero or more
//! CIF1-era aliases (inline or in a `loop_`), and optionally a replacement
//! marker. Category frames (all-uppercase names) define no fields and are
//! skipped.
//!
//! The scan is line based. `save_<name>` opens a frame, a lone `save_`
//! closes it, and everything between is the frame body. Nothing here
//! attempts a full CIF grammar; the dictionary format is regular enough
//! that statement-level regexes over the body are exact.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use tracing::debug;

/// One alias row from a field's `save_` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAlias {
    pub name: String,
    /// Value of `_alias.deprecation_date` where the loop carries one. The
    /// reserved value `.` means "not deprecated" and is kept verbatim.
    pub deprecation_date: Option<String>,
}

impl FieldAlias {
    /// A dated alias is deprecated; a missing date or the `.` sentinel is
    /// an alias in good standing.
    pub fn is_deprecated(&self) -> bool {
        match &self.deprecation_date {
            Some(date) => date != ".",
            None => false,
        }
    }
}

/// Everything recorded for one field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// Canonical CIF2 name as written in `_definition.id`.
    pub name: String,
    pub aliases: Vec<FieldAlias>,
    pub is_replaced: bool,
    /// Target of `_definition_replaced.by`, absent when the marker uses the
    /// `.` sentinel (withdrawn with no successor).
    pub replacement: Option<String>,
}

/// Lookup tables built from one full dictionary scan. Keys are lowercased;
/// values keep the dictionary's original casing.
#[derive(Debug, Default)]
pub struct DictionaryTables {
    cif1_to_cif2: HashMap<String, String>,
    cif2_to_cif1: HashMap<String, Vec<String>>,
    entries: HashMap<String, DictionaryEntry>,
}

impl DictionaryTables {
    pub fn cif1_to_cif2(&self) -> &HashMap<String, String> {
        &self.cif1_to_cif2
    }

    pub fn cif2_to_cif1(&self) -> &HashMap<String, Vec<String>> {
        &self.cif2_to_cif1
    }

    pub fn entry(&self, cif2_name: &str) -> Option<&DictionaryEntry> {
        self.entries.get(&cif2_name.to_lowercase())
    }
}

/// Parses a dictionary text once and answers alias queries from the cached
/// tables.
#[derive(Debug)]
pub struct DictionaryParser {
    text: String,
    tables: OnceCell<DictionaryTables>,
}

impl DictionaryParser {
    pub fn new(text: impl Into<String>) -> Self {
        DictionaryParser { text: text.into(), tables: OnceCell::new() }
    }

    /// Tables for this dictionary, scanning the text on first use.
    pub fn parse(&self) -> &DictionaryTables {
        self.tables.get_or_init(|| build_tables(&self.text))
    }

    /// Canonical CIF2 name for a CIF1 field, if the dictionary knows it.
    /// For replaced definitions this is the replacement target, so migration
    /// never lands on a dead name.
    pub fn cif2_field(&self, cif1_name: &str) -> Option<&str> {
        self.parse().cif1_to_cif2.get(&cif1_name.to_lowercase()).map(String::as_str)
    }

    /// Preferred CIF1 spelling for a CIF2 field: the first non-deprecated
    /// alias without a `.` in it, falling back to the first non-deprecated
    /// alias of any shape.
    pub fn cif1_field(&self, cif2_name: &str) -> Option<&str> {
        let entry = self.parse().entry(cif2_name)?;
        let live = || entry.aliases.iter().filter(|a| !a.is_deprecated());
        live()
            .find(|a| !a.name.contains('.'))
            .or_else(|| live().next())
            .map(|a| a.name.as_str())
    }

    /// True when the name appears in either direction of the alias tables.
    pub fn is_known_field(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        let tables = self.parse();
        tables.cif1_to_cif2.contains_key(&key) || tables.cif2_to_cif1.contains_key(&key)
    }

    /// True when the name is a deprecated alias or a replaced CIF2 name.
    pub fn is_field_deprecated(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        let tables = self.parse();
        if let Some(entry) = tables.entries.get(&key) {
            if entry.is_replaced {
                return true;
            }
        }
        tables
            .entries
            .values()
            .any(|entry| {
                entry.aliases.iter().any(|a| {
                    a.name.to_lowercase() == key && (a.is_deprecated() || entry.is_replaced)
                })
            })
    }

    /// Alias records for a CIF2 field, empty when unknown.
    pub fn field_aliases(&self, cif2_name: &str) -> &[FieldAlias] {
        self.parse().entry(cif2_name).map(|e| e.aliases.as_slice()).unwrap_or(&[])
    }
}

fn build_tables(text: &str) -> DictionaryTables {
    let mut tables = DictionaryTables::default();

    for (name, body) in save_blocks(text) {
        if is_category_name(name) {
            continue;
        }
        let Some(cif2_name) = definition_id(body) else {
            continue;
        };
        let aliases = extract_aliases(body);
        let is_replaced = has_replacement_marker(body);
        let replacement = replacement_target(body);
        let cif2_key = cif2_name.to_lowercase();

        if is_replaced {
            // Every alias of a replaced definition is dead. Point both
            // directions at the replacement so lookups skip the dead name,
            // or back at the definition itself when there is no successor.
            let target = replacement.as_deref().unwrap_or(&cif2_name).to_string();
            let target_key = target.to_lowercase();
            for alias in &aliases {
                tables.cif1_to_cif2.insert(alias.name.to_lowercase(), target.clone());
                let reverse = tables.cif2_to_cif1.entry(target_key.clone()).or_default();
                push_unique(reverse, &alias.name);
            }
        } else {
            for alias in &aliases {
                if alias.name.eq_ignore_ascii_case(&cif2_name) {
                    continue;
                }
                if alias.is_deprecated() {
                    continue;
                }
                tables.cif1_to_cif2.insert(alias.name.to_lowercase(), cif2_name.clone());
                push_unique(tables.cif2_to_cif1.entry(cif2_key.clone()).or_default(), &alias.name);
            }
        }

        let entry = DictionaryEntry { name: cif2_name, aliases, is_replaced, replacement };
        tables.entries.insert(cif2_key, entry);
    }

    debug!(
        mappings = tables.cif1_to_cif2.len(),
        definitions = tables.entries.len(),
        "parsed CIF dictionary"
    );
    tables
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

/// `(name, body)` for every `save_` frame in the text. Only a lone `save_`
/// line closes a frame; an unterminated trailing frame is dropped.
pub(crate) fn save_blocks(text: &str) -> Vec<(&str, &str)> {
    let mut blocks = Vec::new();
    let mut current: Option<(&str, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("save_") {
            if rest.is_empty() {
                if let Some((name, body_start)) = current.take() {
                    blocks.push((name, &text[body_start..start]));
                }
            } else if current.is_none() {
                current = Some((rest, offset));
            }
            // A save_<name> line inside an open frame is frame content,
            // which only happens in malformed input. Leave it in the body.
        }
    }
    blocks
}

/// Category frames are named in uppercase (`save_CELL`); field frames carry
/// at least one lowercase character (`save_cell.length_a`).
pub(crate) fn is_category_name(name: &str) -> bool {
    !name.chars().any(|c| c.is_ascii_lowercase())
}

pub(crate) fn definition_id(body: &str) -> Option<String> {
    regex!(r"_definition\.id\s+'([^']+)'")
        .captures(body)
        .map(|caps| caps[1].to_string())
}

pub(crate) fn has_replacement_marker(body: &str) -> bool {
    body.contains("_definition_replaced.by") || body.contains("_definition_replaced.id")
}

pub(crate) fn replacement_target(body: &str) -> Option<String> {
    regex!(r"_definition_replaced\.by\s+'([^']+)'")
        .captures(body)
        .map(|caps| caps[1].to_string())
}

/// True when the replacement marker carries the `.` sentinel: the field was
/// withdrawn outright and has no successor.
pub(crate) fn replaced_without_successor(body: &str) -> bool {
    regex!(r"(?m)_definition_replaced\.by[ \t]+\.[ \t]*$").is_match(body)
}

/// Aliases from a frame body, both the inline single-alias form and the
/// looped form with an optional deprecation-date column.
pub(crate) fn extract_aliases(body: &str) -> Vec<FieldAlias> {
    let mut aliases = Vec::new();

    for line in body.lines() {
        if let Some(caps) = regex!(r"^\s*_alias\.definition_id\s+'([^']+)'").captures(line) {
            aliases.push(FieldAlias { name: caps[1].to_string(), deprecation_date: None });
        }
    }

    let lines: Vec<&str> = body.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim() != "loop_" {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut headers = Vec::new();
        while j < lines.len() && lines[j].trim().starts_with('_') {
            headers.push(lines[j].trim());
            j += 1;
        }
        if headers.first() == Some(&"_alias.definition_id") {
            let has_dates = headers.get(1) == Some(&"_alias.deprecation_date");
            while j < lines.len() {
                let row = lines[j].trim();
                if row.is_empty() || row.starts_with('#') {
                    j += 1;
                    continue;
                }
                let ends_data = row.starts_with('_')
                    || row.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
                if ends_data {
                    break;
                }
                let mut columns = row.split_whitespace();
                if let Some(raw_name) = columns.next() {
                    let name = raw_name.trim_matches('\'').to_string();
                    let deprecation_date =
                        if has_dates { columns.next().map(str::to_string) } else { None };
                    aliases.push(FieldAlias { name, deprecation_date });
                }
                j += 1;
            }
        }
        i = j.max(i + 1);
    }

    aliases
}
