//! Lexer for the textual IR format (§4.4). Shares the position-tracking
//! and buffering discipline of [`crate::lexer::c`] but with a much
//! smaller token set.

use crate::pos::{ByteReader, SourcePos};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrTokType {
    Space,
    Newline,
    Comment,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis,

    Kw(IrKeyword),

    Ident,
    Number,

    Eof,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrKeyword {
    Op(crate::ir::model::Op),
    Proc,
    Var,
    Record,
    Union,
    Begin,
    End,
    Lvar,
    Attr,
    Extern,
    Global,
    Int,
    Ptr,
    Nil,
}

impl IrKeyword {
    fn from_str(s: &str) -> Option<IrKeyword> {
        use IrKeyword::*;
        Some(match s {
            "proc" => Proc,
            "var" => Var,
            "record" => Record,
            "union" => Union,
            "begin" => Begin,
            "end" => End,
            "lvar" => Lvar,
            "attr" => Attr,
            "extern" => Extern,
            "global" => Global,
            "int" => Int,
            "ptr" => Ptr,
            "nil" => Nil,
            _ => return Some(Op(crate::ir::model::Op::from_mnemonic(s)?)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct IrToken {
    pub tok_type: IrTokType,
    pub begin_pos: SourcePos,
    pub end_pos: SourcePos,
    pub text: String,
}

impl fmt::Display for IrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}-{} {:?}", self.tok_type, self.begin_pos, self.end_pos, self.text)
    }
}

impl IrTokType {
    pub fn is_ignorable(self) -> bool {
        matches!(self, IrTokType::Space | IrTokType::Newline | IrTokType::Comment)
    }
}

#[derive(Debug)]
pub struct IrLexError(pub std::io::Error);

impl fmt::Display for IrLexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I/O error while lexing IR text: {}", self.0)
    }
}
impl std::error::Error for IrLexError {}

const REFILL_CHUNK: usize = 32;
const MIN_LOOKAHEAD: usize = 4;

pub struct IrLexer<R> {
    reader: R,
    buf: VecDeque<u8>,
    pos: SourcePos,
    eof_seen: bool,
}

impl<R: ByteReader> IrLexer<R> {
    pub fn new(reader: R, file: impl Into<String>) -> Self {
        Self {
            reader,
            buf: VecDeque::new(),
            pos: SourcePos::start(file),
            eof_seen: false,
        }
    }

    fn fill(&mut self) -> Result<(), IrLexError> {
        while self.buf.len() < MIN_LOOKAHEAD && !self.eof_seen {
            let mut chunk = [0u8; REFILL_CHUNK];
            let res = self.reader.read(&mut chunk).map_err(IrLexError)?;
            if res.nread < chunk.len() {
                self.eof_seen = true;
            }
            self.buf.extend(&chunk[..res.nread]);
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, IrLexError> {
        self.fill()?;
        Ok(self.buf.front().copied())
    }

    fn bump(&mut self) -> Result<u8, IrLexError> {
        self.fill()?;
        let b = self.buf.pop_front().expect("bump called at EOF");
        self.pos = self.pos.advance(b);
        Ok(b)
    }

    pub fn next_token(&mut self) -> Result<IrToken, IrLexError> {
        loop {
            if self.peek()?.is_none() {
                return Ok(IrToken {
                    tok_type: IrTokType::Eof,
                    begin_pos: self.pos.clone(),
                    end_pos: self.pos.clone(),
                    text: String::new(),
                });
            }
            let c = self.peek()?.unwrap();
            if c == b' ' || c == b'\t' {
                return self.lex_run(IrTokType::Space, |b| b == b' ' || b == b'\t');
            }
            if c == b'\n' {
                let begin = self.pos.clone();
                self.bump()?;
                return Ok(IrToken {
                    tok_type: IrTokType::Newline,
                    begin_pos: begin.clone(),
                    end_pos: begin,
                    text: "\n".to_string(),
                });
            }
            if c == b'/' {
                return self.lex_comment();
            }
            break;
        }

        let begin = self.pos.clone();
        let c = self.peek()?.unwrap();
        macro_rules! single {
            ($tt:expr) => {{
                self.bump()?;
                Ok(IrToken {
                    tok_type: $tt,
                    end_pos: self.pos.clone(),
                    begin_pos: begin,
                    text: (c as char).to_string(),
                })
            }};
        }
        match c {
            b'(' => single!(IrTokType::LParen),
            b')' => single!(IrTokType::RParen),
            b'{' => single!(IrTokType::LBrace),
            b'}' => single!(IrTokType::RBrace),
            b',' => single!(IrTokType::Comma),
            b':' => single!(IrTokType::Colon),
            b';' => single!(IrTokType::Semicolon),
            b'.' => {
                self.bump()?;
                if self.peek()? == Some(b'.') {
                    self.bump()?;
                    self.bump()?;
                    return Ok(IrToken {
                        tok_type: IrTokType::Ellipsis,
                        begin_pos: begin,
                        end_pos: self.pos.clone(),
                        text: "...".to_string(),
                    });
                }
                Ok(IrToken {
                    tok_type: IrTokType::Dot,
                    begin_pos: begin.clone(),
                    end_pos: begin,
                    text: ".".to_string(),
                })
            }
            b'-' | b'0'..=b'9' => self.lex_number(),
            b'%' | b'@' | b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_ident_or_keyword(),
            _ => {
                self.bump()?;
                Ok(IrToken {
                    tok_type: IrTokType::Invalid,
                    begin_pos: begin.clone(),
                    end_pos: begin,
                    text: (c as char).to_string(),
                })
            }
        }
    }

    fn lex_run(&mut self, tt: IrTokType, pred: impl Fn(u8) -> bool) -> Result<IrToken, IrLexError> {
        let begin = self.pos.clone();
        let mut text = String::new();
        let mut end = begin.clone();
        while let Some(b) = self.peek()? {
            if !pred(b) {
                break;
            }
            end = self.pos.clone();
            self.bump()?;
            text.push(b as char);
        }
        Ok(IrToken {
            tok_type: tt,
            begin_pos: begin,
            end_pos: end,
            text,
        })
    }

    fn lex_comment(&mut self) -> Result<IrToken, IrLexError> {
        let begin = self.pos.clone();
        self.bump()?; // '/'
        let mut text = "/".to_string();
        if self.peek()? == Some(b'*') {
            self.bump()?;
            text.push('*');
            let mut end = self.pos.clone();
            loop {
                match self.peek()? {
                    None => break,
                    Some(b'*') => {
                        self.bump()?;
                        text.push('*');
                        if self.peek()? == Some(b'/') {
                            self.bump()?;
                            text.push('/');
                            end = self.pos.clone();
                            break;
                        }
                    }
                    Some(b) => {
                        self.bump()?;
                        text.push(b as char);
                        end = self.pos.clone();
                    }
                }
            }
            return Ok(IrToken {
                tok_type: IrTokType::Comment,
                begin_pos: begin,
                end_pos: end,
                text,
            });
        }
        Ok(IrToken {
            tok_type: IrTokType::Invalid,
            begin_pos: begin.clone(),
            end_pos: begin,
            text,
        })
    }

    fn lex_number(&mut self) -> Result<IrToken, IrLexError> {
        let begin = self.pos.clone();
        let mut text = String::new();
        let mut end = begin.clone();
        if self.peek()? == Some(b'-') {
            end = self.pos.clone();
            self.bump()?;
            text.push('-');
        }
        while let Some(b @ b'0'..=b'9') = self.peek()? {
            end = self.pos.clone();
            self.bump()?;
            text.push(b as char);
        }
        Ok(IrToken {
            tok_type: IrTokType::Number,
            begin_pos: begin,
            end_pos: end,
            text,
        })
    }

    fn lex_ident_or_keyword(&mut self) -> Result<IrToken, IrLexError> {
        let begin = self.pos.clone();
        let mut text = String::new();
        let first = self.peek()?.unwrap();
        let mut end = self.pos.clone();
        self.bump()?;
        text.push(first as char);
        while let Some(b) = self.peek()? {
            if b.is_ascii_alphanumeric() || b == b'_' {
                end = self.pos.clone();
                self.bump()?;
                text.push(b as char);
            } else {
                break;
            }
        }
        let tt = if first == b'%' || first == b'@' {
            IrTokType::Ident
        } else if let Some(kw) = IrKeyword::from_str(&text) {
            IrTokType::Kw(kw)
        } else {
            IrTokType::Ident
        };
        Ok(IrToken {
            tok_type: tt,
            begin_pos: begin,
            end_pos: end,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::StrReader;

    fn lex_all(src: &str) -> Vec<IrToken> {
        let mut lex = IrLexer::new(StrReader::new("t.ir", src), "t.ir");
        let mut out = Vec::new();
        loop {
            let t = lex.next_token().unwrap();
            let eof = t.tok_type == IrTokType::Eof;
            out.push(t);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_proc_header() {
        let toks = lex_all("proc @main ( ) : int.16 begin end ;");
        let kinds: Vec<_> = toks.iter().map(|t| t.tok_type).collect();
        assert!(kinds.contains(&IrTokType::Kw(IrKeyword::Proc)));
        assert!(kinds.contains(&IrTokType::Ident));
        assert!(kinds.contains(&IrTokType::Kw(IrKeyword::Int)));
        assert!(kinds.contains(&IrTokType::Dot));
    }

    #[test]
    fn lexes_negative_immediate() {
        let toks = lex_all("-5");
        assert_eq!(toks[0].tok_type, IrTokType::Number);
        assert_eq!(toks[0].text, "-5");
    }
}
