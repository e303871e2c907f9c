//! Parser error type. No panic-mode recovery: on an unexpected token the
//! parser reports the range and the expected-token description and
//! returns, per §4.2/§7.

use crate::pos::SourceRange;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ParseError {
    pub range: SourceRange,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: error: expected {}, found {}",
            self.range, self.expected, self.found
        )
    }
}

impl std::error::Error for ParseError {}

pub type PResult<T> = Result<T, ParseError>;
