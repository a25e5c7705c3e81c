//! PGN import and export.
//!
//! The accepted text is standard PGN plus `[%name value]` commands embedded
//! in comments. Import tolerates `;` comments, `%` escape lines and move
//! suffix glyphs; export is canonical.

mod lexer;
mod parser;
pub mod san;
mod writer;

use crate::position::FenError;

pub use parser::{parse_pgn, parse_pgn_games, parse_pgn_with_limits};
pub use writer::write_pgn;

/// Bounds applied to untrusted input before and during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_input_bytes: usize,
    pub max_variation_depth: usize,
}

impl ParseLimits {
    pub const DEFAULT_MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;
    pub const DEFAULT_MAX_VARIATION_DEPTH: usize = 256;
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: Self::DEFAULT_MAX_INPUT_BYTES,
            max_variation_depth: Self::DEFAULT_MAX_VARIATION_DEPTH,
        }
    }
}

/// Position in the input text. Line and column are 1-based, offset is in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("Malformed PGN at {location}: {message}")]
    Malformed { message: String, location: Location },
    #[error("PGN limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("Invalid FEN tag: {0}")]
    Fen(#[from] FenError),
}

impl PgnError {
    pub(crate) fn malformed(message: impl Into<String>, location: Location) -> Self {
        Self::Malformed {
            message: message.into(),
            location,
        }
    }

    /// Location of a syntax error, if this is one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Malformed { location, .. } => Some(*location),
            _ => None,
        }
    }
}
