//! The character-driven C lexer.
//!
//! Holds a small lookahead buffer over a [`ByteReader`] and produces one
//! [`Token`] per call to [`Lexer::next_token`]. On end of input it produces
//! a single `Eof` token and keeps producing `Eof` on every subsequent call,
//! matching the "streams one token per call, EOF forever after" contract.

use crate::lexer::token::{TokType, Token};
use crate::pos::{ByteReader, SourcePos};
use std::collections::VecDeque;
use std::fmt;

/// Minimum lookahead the buffer guarantees while not at true EOF — enough
/// for the longest keyword (`register`, 8 bytes) plus one more to
/// distinguish it from a longer identifier.
const MIN_LOOKAHEAD: usize = 8;
/// Size of each refill chunk pulled from the reader.
const REFILL_CHUNK: usize = 32;

#[derive(Debug)]
pub enum LexError {
    Io(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Io(msg) => write!(f, "I/O error while lexing: {msg}"),
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<R> {
    reader: R,
    buf: VecDeque<u8>,
    pos: SourcePos,
    eof_seen: bool,
    at_line_start: bool,
    in_block_comment: bool,
}

impl<R: ByteReader> Lexer<R> {
    pub fn new(reader: R, file: impl Into<String>) -> Self {
        Self {
            reader,
            buf: VecDeque::new(),
            pos: SourcePos::start(file),
            eof_seen: false,
            at_line_start: true,
            in_block_comment: false,
        }
    }

    fn fill(&mut self, want: usize) -> Result<(), LexError> {
        while self.buf.len() < want && !self.eof_seen {
            let mut chunk = vec![0u8; REFILL_CHUNK];
            let res = self
                .reader
                .read(&mut chunk)
                .map_err(|e| LexError::Io(e.to_string()))?;
            if res.nread < chunk.len() {
                self.eof_seen = true;
            }
            self.buf.extend(chunk[..res.nread].iter().copied());
        }
        Ok(())
    }

    fn peek_at(&mut self, i: usize) -> Result<Option<u8>, LexError> {
        self.fill((i + 1).max(MIN_LOOKAHEAD))?;
        Ok(self.buf.get(i).copied())
    }

    fn peek(&mut self) -> Result<Option<u8>, LexError> {
        self.peek_at(0)
    }

    fn bump(&mut self) -> Result<Option<u8>, LexError> {
        self.fill(MIN_LOOKAHEAD)?;
        match self.buf.pop_front() {
            Some(b) => {
                self.pos = self.pos.advance(b);
                self.at_line_start = b == b'\n';
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    fn starts_with(&mut self, s: &str) -> Result<bool, LexError> {
        for (i, c) in s.bytes().enumerate() {
            if self.peek_at(i)? != Some(c) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn next_token(&mut self) -> Result<Token<()>, LexError> {
        if self.in_block_comment {
            let tok = self.next_block_comment_part()?;
            if tok.tok_type == TokType::BComEnd || tok.tok_type == TokType::Eof {
                self.in_block_comment = false;
            }
            return Ok(tok);
        }

        let begin = self.pos.clone();
        let Some(c) = self.peek()? else {
            return Ok(Token::new(TokType::Eof, begin.clone(), begin, String::new()));
        };

        if c == b' ' {
            return self.lex_run(TokType::Space, |b| b == b' ');
        }
        if c == b'\t' {
            return self.lex_run(TokType::HTab, |b| b == b'\t');
        }
        if c == b'\n' {
            let end = begin.clone();
            self.bump()?;
            return Ok(Token::new(TokType::Newline, begin, end, "\n".into()));
        }
        if c == b'\\' && self.peek_at(1)? == Some(b'\n') {
            let mid = begin.advance(b'\\');
            self.bump()?;
            self.bump()?;
            return Ok(Token::new(
                TokType::LineContinuation,
                begin,
                mid,
                "\\\n".into(),
            ));
        }
        if c == b'#' {
            return self.lex_preproc_line(begin);
        }
        if c == b'/' {
            if self.peek_at(1)? == Some(b'*') {
                return self.lex_block_comment_open(begin);
            }
            if self.peek_at(1)? == Some(b'/') {
                return self.lex_line_comment(begin);
            }
        }
        if is_ident_start(c) {
            return self.lex_ident_or_keyword_or_prefixed_literal(begin);
        }
        if c.is_ascii_digit() {
            return self.lex_number(begin);
        }
        if c == b'\'' {
            return self.lex_char_lit(begin, "");
        }
        if c == b'"' {
            return self.lex_string_lit(begin, "");
        }
        if let Some(tt) = self.try_punctuator()? {
            let mut text = String::new();
            for _ in 0..punct_len(tt) {
                text.push(self.bump()?.unwrap() as char);
            }
            let end = self.pos.clone();
            return Ok(Token::new(tt, begin, back_one(&end), text));
        }

        // Unrecognized byte.
        let b = self.bump()?.unwrap();
        let end = self.pos.clone();
        if b.is_ascii_graphic() || b == b' ' {
            Ok(Token::new(
                TokType::Invalid,
                begin,
                back_one(&end),
                (b as char).to_string(),
            ))
        } else {
            Ok(Token::new(
                TokType::Invchar,
                begin,
                back_one(&end),
                String::from_utf8_lossy(&[b]).into_owned(),
            ))
        }
    }

    fn lex_run(&mut self, tt: TokType, pred: impl Fn(u8) -> bool) -> Result<Token<()>, LexError> {
        let begin = self.pos.clone();
        let mut text = String::new();
        let mut end = begin.clone();
        while let Some(c) = self.peek()? {
            if !pred(c) {
                break;
            }
            end = self.pos.clone();
            text.push(self.bump()?.unwrap() as char);
        }
        Ok(Token::new(tt, begin, end, text))
    }

    fn lex_preproc_line(&mut self, begin: SourcePos) -> Result<Token<()>, LexError> {
        let mut text = String::new();
        loop {
            match self.peek()? {
                None => break,
                Some(b'\\') if self.peek_at(1)? == Some(b'\n') => {
                    text.push(self.bump()?.unwrap() as char);
                    text.push(self.bump()?.unwrap() as char);
                }
                Some(b'\n') => break,
                Some(b) => {
                    text.push(self.bump()?.unwrap() as char);
                    let _ = b;
                }
            }
        }
        let end = self.pos.clone();
        Ok(Token::new(TokType::PreprocLine, begin, back_one(&end), text))
    }

    fn lex_block_comment_open(&mut self, begin: SourcePos) -> Result<Token<()>, LexError> {
        self.bump()?; // /
        self.bump()?; // *
        let end = self.pos.clone();
        self.in_block_comment = true;
        Ok(Token::new(TokType::BComBegin, begin, back_one(&end), "/*".into()))
    }

    /// Drains one `BComText`/`BComCont`/`BComEnd` part of a block comment
    /// already opened by `BComBegin`, preserving exact original
    /// whitespace inside the comment as separate tokens.
    fn next_block_comment_part(&mut self) -> Result<Token<()>, LexError> {
        let begin = self.pos.clone();
        if self.starts_with("*/")? {
            self.bump()?;
            self.bump()?;
            let end = self.pos.clone();
            return Ok(Token::new(TokType::BComEnd, begin, back_one(&end), "*/".into()));
        }
        match self.peek()? {
            None => Ok(Token::new(TokType::Eof, begin.clone(), begin, String::new())),
            Some(b'\n') => self.lex_run(TokType::BComCont, |b| b == b'\n'),
            Some(_) => {
                let mut text = String::new();
                loop {
                    if self.starts_with("*/")? {
                        break;
                    }
                    match self.peek()? {
                        None | Some(b'\n') => break,
                        Some(_) => text.push(self.bump()?.unwrap() as char),
                    }
                }
                let end = self.pos.clone();
                Ok(Token::new(TokType::BComText, begin, back_one(&end), text))
            }
        }
    }

    fn lex_line_comment(&mut self, begin: SourcePos) -> Result<Token<()>, LexError> {
        let mut text = String::new();
        self.bump()?;
        self.bump()?;
        text.push_str("//");
        loop {
            match self.peek()? {
                None | Some(b'\n') => break,
                Some(b'\\') if self.peek_at(1)? == Some(b'\n') => {
                    text.push(self.bump()?.unwrap() as char);
                    text.push(self.bump()?.unwrap() as char);
                }
                Some(_) => text.push(self.bump()?.unwrap() as char),
            }
        }
        let end = self.pos.clone();
        Ok(Token::new(TokType::LComment, begin, back_one(&end), text))
    }

    fn lex_ident_or_keyword_or_prefixed_literal(
        &mut self,
        begin: SourcePos,
    ) -> Result<Token<()>, LexError> {
        // String/char literal encoding prefixes: L, u, U, u8.
        if self.at_prefix_then_quote("u8", b'"')? || self.at_prefix_then_quote("u8", b'\'')? {
            let p = self.take_prefix(2)?;
            return self.lex_quoted(begin, p);
        }
        for p in ["L", "u", "U"] {
            if self.at_prefix_then_quote(p, b'"')? || self.at_prefix_then_quote(p, b'\'')? {
                let prefix = self.take_prefix(p.len())?;
                return self.lex_quoted(begin, prefix);
            }
        }

        let mut text = String::new();
        while let Some(c) = self.peek()? {
            if is_ident_cont(c) {
                text.push(self.bump()?.unwrap() as char);
            } else {
                break;
            }
        }
        let end = self.pos.clone();
        let tt = TokType::keyword_from_str(&text).unwrap_or(TokType::Ident);
        Ok(Token::new(tt, begin, back_one(&end), text))
    }

    fn at_prefix_then_quote(&mut self, prefix: &str, quote: u8) -> Result<bool, LexError> {
        for (i, b) in prefix.bytes().enumerate() {
            if self.peek_at(i)? != Some(b) {
                return Ok(false);
            }
        }
        Ok(self.peek_at(prefix.len())? == Some(quote))
    }

    fn take_prefix(&mut self, n: usize) -> Result<String, LexError> {
        let mut s = String::new();
        for _ in 0..n {
            s.push(self.bump()?.unwrap() as char);
        }
        Ok(s)
    }

    fn lex_quoted(&mut self, begin: SourcePos, prefix: String) -> Result<Token<()>, LexError> {
        match self.peek()? {
            Some(b'"') => self.lex_string_lit(begin, &prefix),
            Some(b'\'') => self.lex_char_lit(begin, &prefix),
            _ => unreachable!("at_prefix_then_quote guarantees a quote follows"),
        }
    }

    fn lex_char_lit(&mut self, begin: SourcePos, prefix: &str) -> Result<Token<()>, LexError> {
        let mut text = prefix.to_string();
        text.push(self.bump()?.unwrap() as char); // opening '
        loop {
            match self.peek()? {
                None | Some(b'\n') => break,
                Some(b'\'') => {
                    text.push(self.bump()?.unwrap() as char);
                    break;
                }
                Some(b'\\') => {
                    text.push(self.bump()?.unwrap() as char);
                    self.consume_escape(&mut text)?;
                }
                Some(_) => text.push(self.bump()?.unwrap() as char),
            }
        }
        let end = self.pos.clone();
        Ok(Token::new(TokType::CharLit, begin, back_one(&end), text))
    }

    fn lex_string_lit(&mut self, begin: SourcePos, prefix: &str) -> Result<Token<()>, LexError> {
        let mut text = prefix.to_string();
        text.push(self.bump()?.unwrap() as char); // opening "
        loop {
            match self.peek()? {
                None | Some(b'\n') => break,
                Some(b'"') => {
                    text.push(self.bump()?.unwrap() as char);
                    break;
                }
                Some(b'\\') => {
                    text.push(self.bump()?.unwrap() as char);
                    self.consume_escape(&mut text)?;
                }
                Some(_) => text.push(self.bump()?.unwrap() as char),
            }
        }
        let end = self.pos.clone();
        Ok(Token::new(TokType::StringLit, begin, back_one(&end), text))
    }

    /// Consumes one escape sequence body (the char after the backslash has
    /// NOT yet been pushed). Handles the named escapes, 1-3 digit octal,
    /// and hex runs of arbitrary length, per §4.1.
    fn consume_escape(&mut self, text: &mut String) -> Result<(), LexError> {
        match self.peek()? {
            Some(b @ (b'\'' | b'"' | b'?' | b'\\' | b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v')) => {
                text.push(self.bump()?.unwrap() as char);
                let _ = b;
            }
            Some(b'x') => {
                text.push(self.bump()?.unwrap() as char);
                while matches!(self.peek()?, Some(b) if b.is_ascii_hexdigit()) {
                    text.push(self.bump()?.unwrap() as char);
                }
            }
            Some(b) if (b'0'..=b'7').contains(&b) => {
                for _ in 0..3 {
                    match self.peek()? {
                        Some(b) if (b'0'..=b'7').contains(&b) => {
                            text.push(self.bump()?.unwrap() as char)
                        }
                        _ => break,
                    }
                }
            }
            Some(_) | None => {
                // Unrecognized escape: keep the backslash as-is (lossless
                // text preservation takes priority over validation here).
            }
        }
        Ok(())
    }

    fn lex_number(&mut self, begin: SourcePos) -> Result<Token<()>, LexError> {
        let mut text = String::new();
        if self.peek()? == Some(b'0') && matches!(self.peek_at(1)?, Some(b'x') | Some(b'X')) {
            text.push(self.bump()?.unwrap() as char);
            text.push(self.bump()?.unwrap() as char);
            while matches!(self.peek()?, Some(b) if b.is_ascii_hexdigit()) {
                text.push(self.bump()?.unwrap() as char);
            }
        } else {
            while matches!(self.peek()?, Some(b) if b.is_ascii_digit()) {
                text.push(self.bump()?.unwrap() as char);
            }
            if self.peek()? == Some(b'.') {
                text.push(self.bump()?.unwrap() as char);
                while matches!(self.peek()?, Some(b) if b.is_ascii_digit()) {
                    text.push(self.bump()?.unwrap() as char);
                }
            }
        }
        // integer-suffix: u/U, l/L, ll/LL in any order/case, up to "ull".
        loop {
            match self.peek()? {
                Some(b @ (b'u' | b'U' | b'l' | b'L')) => {
                    text.push(self.bump()?.unwrap() as char);
                    let _ = b;
                }
                _ => break,
            }
        }
        let end = self.pos.clone();
        Ok(Token::new(TokType::Number, begin, back_one(&end), text))
    }

    fn try_punctuator(&mut self) -> Result<Option<TokType>, LexError> {
        let c0 = self.peek()?;
        let c1 = self.peek_at(1)?;
        let c2 = self.peek_at(2)?;
        use TokType::*;
        Ok(Some(match (c0, c1, c2) {
            (Some(b'.'), Some(b'.'), Some(b'.')) => Ellipsis,
            (Some(b'<'), Some(b'<'), Some(b'=')) => ShlAssign,
            (Some(b'>'), Some(b'>'), Some(b'=')) => ShrAssign,
            (Some(b'='), Some(b'='), _) => Eq,
            (Some(b'!'), Some(b'='), _) => Neq,
            (Some(b'<'), Some(b'='), _) => Leq,
            (Some(b'>'), Some(b'='), _) => Geq,
            (Some(b'<'), Some(b'<'), _) => Shl,
            (Some(b'>'), Some(b'>'), _) => Shr,
            (Some(b'&'), Some(b'&'), _) => LogAnd,
            (Some(b'|'), Some(b'|'), _) => LogOr,
            (Some(b'+'), Some(b'+'), _) => Inc,
            (Some(b'-'), Some(b'-'), _) => Dec,
            (Some(b'-'), Some(b'>'), _) => Arrow,
            (Some(b'+'), Some(b'='), _) => AddAssign,
            (Some(b'-'), Some(b'='), _) => SubAssign,
            (Some(b'*'), Some(b'='), _) => MulAssign,
            (Some(b'/'), Some(b'='), _) => DivAssign,
            (Some(b'%'), Some(b'='), _) => ModAssign,
            (Some(b'&'), Some(b'='), _) => AndAssign,
            (Some(b'|'), Some(b'='), _) => OrAssign,
            (Some(b'^'), Some(b'='), _) => XorAssign,
            (Some(b'('), ..) => LParen,
            (Some(b')'), ..) => RParen,
            (Some(b'{'), ..) => LBrace,
            (Some(b'}'), ..) => RBrace,
            (Some(b'['), ..) => LBracket,
            (Some(b']'), ..) => RBracket,
            (Some(b';'), ..) => Semicolon,
            (Some(b','), ..) => Comma,
            (Some(b':'), ..) => Colon,
            (Some(b'.'), ..) => Dot,
            (Some(b'&'), ..) => Amp,
            (Some(b'*'), ..) => Star,
            (Some(b'+'), ..) => Plus,
            (Some(b'-'), ..) => Minus,
            (Some(b'~'), ..) => Tilde,
            (Some(b'!'), ..) => Excl,
            (Some(b'/'), ..) => Slash,
            (Some(b'%'), ..) => Percent,
            (Some(b'<'), ..) => Lt,
            (Some(b'>'), ..) => Gt,
            (Some(b'='), ..) => Assign,
            (Some(b'^'), ..) => Xor,
            (Some(b'|'), ..) => Bar,
            (Some(b'?'), ..) => Quest,
            _ => return Ok(None),
        }))
    }
}

fn punct_len(tt: TokType) -> usize {
    use TokType::*;
    match tt {
        Ellipsis | ShlAssign | ShrAssign => 3,
        Eq | Neq | Leq | Geq | Shl | Shr | LogAnd | LogOr | Inc | Dec | Arrow | AddAssign
        | SubAssign | MulAssign | DivAssign | ModAssign | AndAssign | OrAssign | XorAssign => 2,
        _ => 1,
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// The token ranges recorded by the spec are inclusive of the last
/// character; `self.pos` after consuming always points one past it, so we
/// step back one column for the end position. This is a column-only
/// correction: callers never cross a line boundary between bump and this
/// call within a single-line token path.
fn back_one(pos: &SourcePos) -> SourcePos {
    SourcePos::new(pos.file().to_string(), pos.line, pos.col.saturating_sub(1).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::StrReader;

    fn lex_all(src: &str) -> Vec<Token<()>> {
        let mut lx = Lexer::new(StrReader::new("t.c", src), "t.c");
        let mut out = Vec::new();
        loop {
            let t = lx.next_token().unwrap();
            let is_eof = t.tok_type == TokType::Eof;
            out.push(t);
            if is_eof {
                break;
            }
        }
        out
    }

    #[test]
    fn round_trip_reproduces_source() {
        let src = "int main(void) { return 0; }\n";
        let toks = lex_all(src);
        let mut reconstructed = String::new();
        for t in &toks {
            if t.tok_type != TokType::Eof {
                reconstructed.push_str(&t.text);
            }
        }
        assert_eq!(reconstructed, src);
    }

    #[test]
    fn keyword_vs_identifier() {
        let toks = lex_all("int integer;");
        assert_eq!(toks[0].tok_type, TokType::Int);
        assert_eq!(toks[2].tok_type, TokType::Ident);
        assert_eq!(toks[2].text, "integer");
    }

    #[test]
    fn compound_assignment_operators() {
        let toks: Vec<_> = lex_all("a <<= 1; b >>= 2;")
            .into_iter()
            .filter(|t| !t.is_ignorable() && t.tok_type != TokType::Eof)
            .collect();
        assert_eq!(toks[1].tok_type, TokType::ShlAssign);
        assert_eq!(toks[5].tok_type, TokType::ShrAssign);
    }

    #[test]
    fn eof_is_sticky() {
        let mut lx = Lexer::new(StrReader::new("t.c", ""), "t.c");
        assert_eq!(lx.next_token().unwrap().tok_type, TokType::Eof);
        assert_eq!(lx.next_token().unwrap().tok_type, TokType::Eof);
    }

    #[test]
    fn preprocessor_line_is_captured_verbatim() {
        let toks = lex_all("#define X 1\nint x;");
        assert_eq!(toks[0].tok_type, TokType::PreprocLine);
        assert_eq!(toks[0].text, "#define X 1");
    }

    #[test]
    fn string_and_char_prefixes() {
        let toks: Vec<_> = lex_all(r#"L"wide"; u8"u8"; 'c';"#)
            .into_iter()
            .filter(|t| !t.is_ignorable() && t.tok_type != TokType::Eof)
            .collect();
        assert_eq!(toks[0].tok_type, TokType::StringLit);
        assert_eq!(toks[0].text, "L\"wide\"");
        assert_eq!(toks[2].tok_type, TokType::StringLit);
        assert_eq!(toks[2].text, "u8\"u8\"");
    }

    #[test]
    fn numbers_with_suffixes_and_bases() {
        let toks: Vec<_> = lex_all("0x1Aul 0777 42LL")
            .into_iter()
            .filter(|t| !t.is_ignorable() && t.tok_type != TokType::Eof)
            .collect();
        assert_eq!(toks[0].text, "0x1Aul");
        assert_eq!(toks[1].text, "0777");
        assert_eq!(toks[2].text, "42LL");
    }

    #[test]
    fn block_comment_round_trips_as_multiple_tokens() {
        let src = "/* hello\n world */x;";
        let toks = lex_all(src);
        assert_eq!(toks[0].tok_type, TokType::BComBegin);
        assert!(toks.iter().any(|t| t.tok_type == TokType::BComText));
        assert!(toks.iter().any(|t| t.tok_type == TokType::BComCont));
        assert!(toks.iter().any(|t| t.tok_type == TokType::BComEnd));
        let reconstructed: String = toks
            .iter()
            .filter(|t| t.tok_type != TokType::Eof)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(reconstructed, src);
    }

    #[test]
    fn invalid_and_invchar_bytes() {
        let toks: Vec<_> = lex_all("a `$ \x01 b")
            .into_iter()
            .filter(|t| !t.is_ignorable())
            .collect();
        assert!(toks.iter().any(|t| t.tok_type == TokType::Invalid));
        assert!(toks.iter().any(|t| t.tok_type == TokType::Invchar));
    }
}
