//! Declarator trees: right-recursive wrappers around an `identifier` or
//! `no-identifier` leaf, per §3/§4.2.

use crate::ast::tokens::{first_of, AstTok, Spanned};
use crate::ast::types::TypeQualifier;

/// A function parameter: either a full declaration (`int x`) or, in a
/// parameter type list, an abstract declarator (`int`).
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub specs: crate::ast::types::DeclSpecs,
    pub declarator: Declarator,
}

#[derive(Debug, Clone)]
pub enum Declarator {
    /// A leaf carrying the declared identifier.
    Ident { tok: AstTok },
    /// A leaf with no identifier — a pure type-name / abstract declarator.
    NoIdent { placeholder: Option<AstTok> },
    /// `*[qualifiers] inner`
    Pointer {
        star: AstTok,
        qualifiers: Vec<TypeQualifier>,
        inner: Box<Declarator>,
    },
    /// `( inner )`
    Parenthesized {
        lparen: AstTok,
        inner: Box<Declarator>,
        rparen: AstTok,
    },
    /// `inner ( params... [, ...] )`
    Function {
        inner: Box<Declarator>,
        lparen: AstTok,
        params: Vec<ParamDecl>,
        variadic: bool,
        commas: Vec<AstTok>,
        ellipsis: Option<AstTok>,
        rparen: AstTok,
    },
    /// `inner [ size? ]`
    Array {
        inner: Box<Declarator>,
        lbracket: AstTok,
        size: Option<Box<super::expr::Expr>>,
        rbracket: AstTok,
    },
}

impl Declarator {
    /// True iff the innermost leaf is `no-identifier` — the pure
    /// type-name form used by casts, `sizeof(type)`, parameter lists.
    pub fn is_abstract(&self) -> bool {
        match self {
            Declarator::Ident { .. } => false,
            Declarator::NoIdent { .. } => true,
            Declarator::Pointer { inner, .. }
            | Declarator::Parenthesized { inner, .. }
            | Declarator::Function { inner, .. }
            | Declarator::Array { inner, .. } => inner.is_abstract(),
        }
    }

    /// The identifier token at the leaf, if this declarator names one.
    pub fn ident_tok(&self) -> Option<&AstTok> {
        match self {
            Declarator::Ident { tok } => Some(tok),
            Declarator::NoIdent { .. } => None,
            Declarator::Pointer { inner, .. }
            | Declarator::Parenthesized { inner, .. }
            | Declarator::Function { inner, .. }
            | Declarator::Array { inner, .. } => inner.ident_tok(),
        }
    }

    pub fn ident_name(&self) -> Option<&str> {
        self.ident_tok().map(|t| t.text.as_str())
    }
}

impl Spanned for Declarator {
    fn first_tok(&self) -> &AstTok {
        match self {
            Declarator::Ident { tok } => tok,
            Declarator::NoIdent { placeholder } => placeholder
                .as_ref()
                .expect("empty abstract declarator has no tokens of its own"),
            Declarator::Pointer { star, inner, .. } => first_of([star, inner.first_tok()]),
            Declarator::Parenthesized { lparen, .. } => lparen,
            Declarator::Function { inner, .. } => inner.first_tok(),
            Declarator::Array { inner, .. } => inner.first_tok(),
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            Declarator::Ident { tok } => tok,
            Declarator::NoIdent { placeholder } => placeholder
                .as_ref()
                .expect("empty abstract declarator has no tokens of its own"),
            Declarator::Pointer { inner, .. } => inner.last_tok(),
            Declarator::Parenthesized { rparen, .. } => rparen,
            Declarator::Function { rparen, .. } => rparen,
            Declarator::Array { rbracket, .. } => rbracket,
        }
    }
}

/// One entry of an init-declarator-list: `declarator [= initializer]`.
#[derive(Debug, Clone)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub eq: Option<AstTok>,
    pub initializer: Option<super::expr::Initializer>,
}

impl Spanned for InitDeclarator {
    fn first_tok(&self) -> &AstTok {
        self.declarator.first_tok()
    }

    fn last_tok(&self) -> &AstTok {
        match &self.initializer {
            Some(init) => init.last_tok(),
            None => self.declarator.last_tok(),
        }
    }
}
