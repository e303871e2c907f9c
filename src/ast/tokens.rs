//! AST-level token storage.
//!
//! Every AST node keeps slots for the source tokens it syntactically
//! consumed (braces, commas, operators, …) so the checker can reformat
//! faithfully. The user-data slot on each stored token is an opaque `u64`
//! handle the enclosing tool may set; the core never reads it back.

use crate::lexer::token::{TokType, Token};

/// An AST-owned token: the same record the lexer produces, with the
/// user-data slot fixed to an opaque handle instead of left generic. A
/// fully generic `Token<U>` threaded through every AST type would buy
/// nothing here since the core never dereferences `user_data` (§6); a
/// concrete opaque payload keeps every node type simple to write and
/// match on.
pub type AstTok = Token<u64>;

pub fn from_lexer(tok: Token<()>) -> AstTok {
    Token {
        tok_type: tok.tok_type,
        begin_pos: tok.begin_pos,
        end_pos: tok.end_pos,
        text: tok.text,
        user_data: None,
    }
}

/// A node's full left-to-right sequence of directly-owned tokens, in
/// source order, with gaps (`None`) for places where a punctuator is
/// optional and absent (e.g. a missing trailing comma). Exists so
/// `first_tok`/`last_tok` accessors have something concrete to return
/// even for nodes whose only source footprint is their own tokens.
#[derive(Debug, Clone, Default)]
pub struct TokSlots {
    toks: Vec<AstTok>,
}

impl TokSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tok: AstTok) -> &mut Self {
        self.toks.push(tok);
        self
    }

    pub fn first(&self) -> Option<&AstTok> {
        self.toks.first()
    }

    pub fn last(&self) -> Option<&AstTok> {
        self.toks.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AstTok> {
        self.toks.iter()
    }

    pub fn find(&self, tt: TokType) -> Option<&AstTok> {
        self.toks.iter().find(|t| t.tok_type == tt)
    }
}

/// Implemented by every AST node: the recursive first/last-token
/// accessors the spec's invariants (§3, §4.2) require.
pub trait Spanned {
    fn first_tok(&self) -> &AstTok;
    fn last_tok(&self) -> &AstTok;
}

/// Picks the earlier of two spans' first tokens / later of two spans'
/// last tokens — used when a node's span must be derived from children
/// plus its own slots.
pub fn first_of<'a>(candidates: impl IntoIterator<Item = &'a AstTok>) -> &'a AstTok {
    candidates
        .into_iter()
        .min_by(|a, b| (a.begin_pos.line, a.begin_pos.col).cmp(&(b.begin_pos.line, b.begin_pos.col)))
        .expect("span must have at least one token")
}

pub fn last_of<'a>(candidates: impl IntoIterator<Item = &'a AstTok>) -> &'a AstTok {
    candidates
        .into_iter()
        .max_by(|a, b| (a.end_pos.line, a.end_pos.col).cmp(&(b.end_pos.line, b.end_pos.col)))
        .expect("span must have at least one token")
}
