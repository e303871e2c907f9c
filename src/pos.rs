//! Source position tracking and the pull-style byte reader abstraction.
//!
//! A [`SourcePos`] is a `(file, line, col)` triple. Advancement follows the
//! C-source convention: tabs hop to the next multiple of 8, newlines reset
//! the column and bump the line, everything else just advances the column.

use std::fmt;

/// Tab stop width used by [`SourcePos::advance`].
const TAB_STOP: usize = 8;

/// Fixed capacity for the file-name buffer. Longer names are truncated —
/// callers only ever use this for diagnostic display, not as a real path.
const FILE_NAME_CAP: usize = 191;

/// A position within a source file: 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourcePos {
    file: String,
    pub line: usize,
    pub col: usize,
}

impl SourcePos {
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        let mut file = file.into();
        if file.len() > FILE_NAME_CAP {
            file.truncate(FILE_NAME_CAP);
        }
        Self { file, line, col }
    }

    pub fn start(file: impl Into<String>) -> Self {
        Self::new(file, 1, 1)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Advance past one consumed byte, returning the new position.
    pub fn advance(&self, byte: u8) -> Self {
        match byte {
            b'\n' => Self::new(self.file.clone(), self.line + 1, 1),
            b'\t' => {
                let col = ((self.col - 1) / TAB_STOP + 1) * TAB_STOP + 1;
                Self::new(self.file.clone(), self.line, col)
            }
            _ => Self::new(self.file.clone(), self.line, self.col + 1),
        }
    }

    /// Lexicographic `(line, col)` ordering used by the position-monotonicity
    /// testable property in the spec.
    pub fn le(&self, other: &SourcePos) -> bool {
        (self.line, self.col) <= (other.line, other.col)
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A closed `[begin, end]` range of source positions, inclusive of the last
/// character as required for token spans.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceRange {
    pub begin: SourcePos,
    pub end: SourcePos,
}

impl SourceRange {
    pub fn new(begin: SourcePos, end: SourcePos) -> Self {
        Self { begin, end }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.begin.line == self.end.line {
            write!(
                f,
                "{}:{}:{}-{}",
                self.begin.file(),
                self.begin.line,
                self.begin.col,
                self.end.col
            )
        } else {
            write!(f, "{}-{}", self.begin, self.end)
        }
    }
}

/// Result of a single pull from the byte reader.
pub struct ReadResult {
    /// Bytes actually read. `nread < buf.len()` signals EOF.
    pub nread: usize,
    /// Source position of `buf[0]` at the time of this read.
    pub begin_pos: SourcePos,
}

/// A pull-style byte reader. Implementors drive the lexer's buffering; EOF
/// is signalled by returning fewer bytes than requested.
pub trait ByteReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<ReadResult>;
}

/// The simplest possible reader: an in-memory string plus a running
/// position. Used for tests, for the common "whole file slurped up front"
/// case, and by both CLIs.
pub struct StrReader<'a> {
    file: String,
    bytes: &'a [u8],
    offset: usize,
    pos: SourcePos,
}

impl<'a> StrReader<'a> {
    pub fn new(file: impl Into<String>, text: &'a str) -> Self {
        let file = file.into();
        Self {
            pos: SourcePos::start(file.clone()),
            file,
            bytes: text.as_bytes(),
            offset: 0,
        }
    }
}

impl<'a> ByteReader for StrReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<ReadResult> {
        let begin_pos = self.pos.clone();
        let remaining = &self.bytes[self.offset..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        for &b in &remaining[..n] {
            self.pos = self.pos.advance(b);
        }
        self.offset += n;
        let _ = &self.file;
        Ok(ReadResult {
            nread: n,
            begin_pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_stops_advance_to_next_multiple_of_eight() {
        let p = SourcePos::new("f", 1, 1);
        let p = p.advance(b'\t');
        assert_eq!(p.col, 9);
        let p = p.advance(b'a').advance(b'\t');
        assert_eq!(p.col, 17);
    }

    #[test]
    fn newline_resets_column_and_bumps_line() {
        let p = SourcePos::new("f", 3, 5);
        let p = p.advance(b'\n');
        assert_eq!((p.line, p.col), (4, 1));
    }

    #[test]
    fn long_file_name_is_truncated() {
        let name = "x".repeat(500);
        let p = SourcePos::start(name);
        assert_eq!(p.file().len(), FILE_NAME_CAP);
    }

    #[test]
    fn str_reader_reports_eof_with_short_read() {
        let mut r = StrReader::new("f", "ab");
        let mut buf = [0u8; 8];
        let res = r.read(&mut buf).unwrap();
        assert_eq!(res.nread, 2);
        let res2 = r.read(&mut buf).unwrap();
        assert_eq!(res2.nread, 0);
    }
}
