//! The recursive-descent grammar parser and its supporting cursor.

pub mod c;
pub mod cursor;
pub mod error;

pub use c::Parser;
pub use cursor::{lex_all, Cursor};
pub use error::{PResult, ParseError};
