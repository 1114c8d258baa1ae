//! Semicolon-block tracking.
//!
//! CIF multiline values are delimited by lines whose first column is `;`.
//! Several consumers need to know, line by line, whether they are currently
//! inside such a block: the CIF2 compliance validator and fixer must skip
//! block content entirely, and the APPEND engine must find a block's closing
//! delimiter. Rather than threading ad hoc booleans through each scan, the
//! state is modeled as an explicit two-state machine consumed one line at a
//! time.

/// Whether the scanner is inside a semicolon-delimited text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Normal,
    InBlock,
}

impl BlockState {
    /// Advance the machine over one line and return the state that applies
    /// to the *following* line.
    ///
    /// A delimiter line toggles the state. Per the CIF grammar the delimiter
    /// is a `;` in the first column; the opening delimiter may carry the
    /// first line of the value after it, which does not affect tracking.
    pub fn step(self, line: &str) -> BlockState {
        if line.starts_with(';') {
            match self {
                BlockState::Normal => BlockState::InBlock,
                BlockState::InBlock => BlockState::Normal,
            }
        } else {
            self
        }
    }

    /// True when the *current* line is block content or a delimiter, i.e.
    /// not an ordinary data line.
    pub fn in_block(self) -> bool {
        self == BlockState::InBlock
    }
}

/// Iterate `(line, state)` pairs where `state` is the machine state *at* the
/// start of that line. Delimiter lines are reported with the state they had
/// before toggling, so an opening `;` line is `Normal` and a closing `;`
/// line is `InBlock`.
pub fn with_block_state(content: &str) -> impl Iterator<Item = (&str, BlockState)> {
    let mut state = BlockState::Normal;
    content.lines().map(move |line| {
        let at_line = state;
        state = state.step(line);
        (line, at_line)
    })
}
