//! Rule-driven normalization, validation and CIF1/CIF2 migration for
//! Crystallographic Information Files.
//!
//! The crate has four cooperating subsystems:
//!
//! * a rules-file DSL (`rules`) describing per-field CHECK / DELETE / EDIT /
//!   APPEND / RENAME / CALCULATE policies and an engine replaying them over
//!   document text,
//! * a restricted arithmetic evaluator (`expr`) backing CALCULATE rules,
//! * a dictionary layer (`dictionary`) extracting CIF1<->CIF2 alias tables,
//!   a CIF2-only overlay and deprecation metadata from the official
//!   dictionary,
//! * a CIF2 value formatter and compliance checker (`value`) enforcing the
//!   quoting and multiline-encoding grammar.
//!
//! ```
//! let rules = cifmend::parse_rules("RENAME: _refine_diff_density_max _refine_diff.potential_max");
//! let (text, log) = cifmend::apply_rules("_refine_diff_density_max 0.12\n", &rules);
//! assert_eq!(text, "_refine_diff.potential_max 0.12\n");
//! assert_eq!(log, ["RENAMED: _refine_diff_density_max -> _refine_diff.potential_max"]);
//! ```

#[macro_use]
mod macros;

mod api;
mod dictionary;
mod error;
mod expr;
mod rules;
mod scan;
mod value;

pub use api::{apply_rules, load_deprecations, load_rules, parse_dictionary};
pub use dictionary::{
    DeprecationIndex, DeprecationInfo, DictionaryEntry, DictionaryParser, DictionaryTables,
    ExtendedDictionary, FieldAlias, FieldStatus, Severity,
};
pub use error::{Error, Result};
pub use expr::{ExprError, evaluate as evaluate_expression};
pub use rules::{FieldRule, RuleAction, parse_rules};
pub use scan::{BlockState, with_block_state};
pub use value::{
    ComplianceFix, ComplianceIssue, decode_triple_quoted, fix_cif2_compliance, format_value,
    needs_quoting, validate_cif2_compliance,
};
