//! Token types and the token record itself.

use crate::pos::SourcePos;
use std::fmt;

/// Closed token-type enumeration. Mirrors §3 of the spec: whitespace,
/// comments, punctuators, keywords, and literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TokType {
    // Whitespace
    Space,
    HTab,
    Newline,
    LineContinuation,

    // Comments
    BComBegin, // /*
    BComText,
    BComCont, // the newline(s) inside a block comment
    BComEnd,  // */
    LComment, // // ...
    PreprocLine,

    // Punctuators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Ellipsis,
    Dot,
    Arrow,
    Inc,
    Dec,
    Amp,
    Star,
    Plus,
    Minus,
    Tilde,
    Excl,
    Slash,
    Percent,
    Shl,
    Shr,
    Lt,
    Gt,
    Leq,
    Geq,
    Eq,
    Neq,
    Xor,
    Bar,
    LogAnd,
    LogOr,
    Quest,
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,

    // Keywords
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Int,
    Long,
    Register,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
    Bool, // _Bool
    Complex,
    Imaginary,
    Restrict,
    Atomic,     // _Atomic
    Alignas,    // _Alignas
    Attribute,  // __attribute__
    Asm,
    Inline,

    // Identifiers / literals
    Ident,
    Number,
    CharLit,
    StringLit,

    // Sentinels
    Invalid,
    Invchar,
    Eof,
    Error,
}

impl TokType {
    /// Ignorable for grammar purposes: whitespace, comments, preprocessor
    /// lines. The parser skips these while seeking grammar tokens.
    pub fn is_ignorable(self) -> bool {
        matches!(
            self,
            TokType::Space
                | TokType::HTab
                | TokType::Newline
                | TokType::LineContinuation
                | TokType::BComBegin
                | TokType::BComText
                | TokType::BComCont
                | TokType::BComEnd
                | TokType::LComment
                | TokType::PreprocLine
        )
    }

    pub fn keyword_from_str(s: &str) -> Option<TokType> {
        Some(match s {
            "auto" => TokType::Auto,
            "break" => TokType::Break,
            "case" => TokType::Case,
            "char" => TokType::Char,
            "const" => TokType::Const,
            "continue" => TokType::Continue,
            "default" => TokType::Default,
            "do" => TokType::Do,
            "double" => TokType::Double,
            "else" => TokType::Else,
            "enum" => TokType::Enum,
            "extern" => TokType::Extern,
            "float" => TokType::Float,
            "for" => TokType::For,
            "goto" => TokType::Goto,
            "if" => TokType::If,
            "int" => TokType::Int,
            "long" => TokType::Long,
            "register" => TokType::Register,
            "return" => TokType::Return,
            "short" => TokType::Short,
            "signed" => TokType::Signed,
            "sizeof" => TokType::Sizeof,
            "static" => TokType::Static,
            "struct" => TokType::Struct,
            "switch" => TokType::Switch,
            "typedef" => TokType::Typedef,
            "union" => TokType::Union,
            "unsigned" => TokType::Unsigned,
            "void" => TokType::Void,
            "volatile" => TokType::Volatile,
            "while" => TokType::While,
            "_Bool" => TokType::Bool,
            "_Complex" => TokType::Complex,
            "_Imaginary" => TokType::Imaginary,
            "restrict" => TokType::Restrict,
            "_Atomic" => TokType::Atomic,
            "_Alignas" => TokType::Alignas,
            "__attribute__" => TokType::Attribute,
            "asm" => TokType::Asm,
            "inline" => TokType::Inline,
            _ => return None,
        })
    }
}

/// One lexed token: type, inclusive source span, the exact source bytes
/// that composed it, and an opaque user-data slot the enclosing tool may
/// attach (the checker cross-links tokens back to tool-level records via
/// this). The core never dereferences `user_data`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Token<U = ()> {
    pub tok_type: TokType,
    pub begin_pos: SourcePos,
    pub end_pos: SourcePos,
    pub text: String,
    #[serde(skip)]
    pub user_data: Option<U>,
}

impl<U> Token<U> {
    pub fn new(tok_type: TokType, begin_pos: SourcePos, end_pos: SourcePos, text: String) -> Self {
        Self {
            tok_type,
            begin_pos,
            end_pos,
            text,
            user_data: None,
        }
    }

    pub fn is_ignorable(&self) -> bool {
        self.tok_type.is_ignorable()
    }
}

impl<U> fmt::Display for Token<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}@{}-{} {:?}",
            self.tok_type, self.begin_pos, self.end_pos, self.text
        )
    }
}
