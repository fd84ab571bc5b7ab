//! Shared source-location types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line/column coordinate of a token in the source file.
///
/// Both components are 1-based in parser output. [`Pos::ZERO`] is reserved
/// for diagnostics that have no carrier token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const ZERO: Pos = Pos { line: 0, col: 0 };

    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
