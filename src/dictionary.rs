//! Dictionary-driven alias resolution.
//!
//! The official CIF core dictionary defines every field in a `save_` block
//! carrying the canonical CIF2 name, its CIF1-era aliases, and deprecation
//! or replacement metadata. This module turns that file into queryable
//! tables:
//!
//! ```text
//! dictionary text ──┐
//!                   │  DictionaryParser::parse      (parser.rs)
//!                   └───────────┬──────────────────
//!                               │ cif1 -> cif2 map, cif2 -> [cif1] map,
//!                               │ per-field alias + replacement records
//!                               ▼
//!              ExtendedDictionary                   (extensions.rs)
//!                dictionary-first lookups, static CIF2-only overlay
//!                               │
//!                               ▼
//!              DeprecationIndex                     (deprecation.rs)
//!                status / severity / migration text from the same blocks
//! ```
//!
//! Parsing is parse-once per instance: the first query triggers a full scan
//! and later queries read the cached tables. The cache is a `OnceCell`, so
//! concurrent first use is safe and re-parsing requires a fresh instance.

#[path = "dictionary/deprecation.rs"]
mod deprecation;
#[path = "dictionary/extensions.rs"]
mod extensions;
#[path = "dictionary/parser.rs"]
mod parser;

pub use deprecation::{DeprecationIndex, DeprecationInfo, Severity};
pub use extensions::{ExtendedDictionary, FieldStatus};
pub use parser::{DictionaryEntry, DictionaryParser, DictionaryTables, FieldAlias};
