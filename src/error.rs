//! Crate-level error type.
//!
//! Only operations that touch the filesystem boundary (loading a rules file
//! or a dictionary file) are fallible at this level. Everything inside the
//! core is a pure text transformation that recovers locally: malformed rule
//! lines are skipped, dictionary blocks without a definition id are ignored,
//! and failed CALCULATE evaluations simply assign no value.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The dictionary file the caller pointed at does not exist. Callers must
    /// not substitute an empty dictionary on this condition.
    #[error("dictionary not found at {}", .0.display())]
    DictionaryNotFound(PathBuf),

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
