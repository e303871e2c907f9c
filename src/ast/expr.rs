//! Expression grammar nodes, primary through comma, per §4.2.

use crate::ast::declarator::Declarator;
use crate::ast::tokens::{first_of, last_of, AstTok, Spanned};
use crate::ast::types::DeclSpecs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Gt,
    Leq,
    Geq,
    Eq,
    Neq,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
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
}

impl BinOp {
    pub fn is_assignment(self) -> bool {
        use BinOp::*;
        matches!(
            self,
            Assign
                | MulAssign
                | DivAssign
                | ModAssign
                | AddAssign
                | SubAssign
                | ShlAssign
                | ShrAssign
                | AndAssign
                | XorAssign
                | OrAssign
        )
    }

    /// The underlying arithmetic/bitwise op a compound assignment
    /// performs before storing, or `None` for plain `=`.
    pub fn compound_base(self) -> Option<BinOp> {
        use BinOp::*;
        Some(match self {
            MulAssign => Mul,
            DivAssign => Div,
            ModAssign => Mod,
            AddAssign => Add,
            SubAssign => Sub,
            ShlAssign => Shl,
            ShrAssign => Shr,
            AndAssign => BitAnd,
            XorAssign => BitXor,
            OrAssign => BitOr,
            _ => return None,
        })
    }
}

/// A type-name: declaration specifiers + an abstract declarator, used by
/// `sizeof(type)`, casts, and compound literals.
#[derive(Debug, Clone)]
pub struct TypeName {
    pub specs: DeclSpecs,
    pub declarator: Declarator,
}

impl Spanned for TypeName {
    fn first_tok(&self) -> &AstTok {
        self.specs
            .first_tok()
            .unwrap_or_else(|| self.declarator.first_tok())
    }

    fn last_tok(&self) -> &AstTok {
        if !self.declarator.is_abstract() || self.declarator.ident_tok().is_some() {
            return last_of(self.specs.last_tok().into_iter().chain(Some(self.declarator.last_tok())));
        }
        match &self.declarator {
            Declarator::NoIdent { placeholder: None } => {
                self.specs.last_tok().unwrap_or_else(|| self.declarator.last_tok())
            }
            other => last_of(self.specs.last_tok().into_iter().chain(Some(other.last_tok()))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitItem {
    pub designators: Vec<AstTok>,
    pub value: Initializer,
    pub comma: Option<AstTok>,
}

#[derive(Debug, Clone)]
pub enum Initializer {
    Expr(Box<Expr>),
    List {
        lbrace: AstTok,
        items: Vec<InitItem>,
        rbrace: AstTok,
    },
}

impl Spanned for Initializer {
    fn first_tok(&self) -> &AstTok {
        match self {
            Initializer::Expr(e) => e.first_tok(),
            Initializer::List { lbrace, .. } => lbrace,
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            Initializer::Expr(e) => e.last_tok(),
            Initializer::List { rbrace, .. } => rbrace,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit {
        tok: AstTok,
    },
    CharLit {
        tok: AstTok,
    },
    /// Adjacent string literals are concatenated; `parts` holds every
    /// literal token that contributed.
    StringLit {
        parts: Vec<AstTok>,
    },
    Ident {
        tok: AstTok,
    },
    Paren {
        lparen: AstTok,
        inner: Box<Expr>,
        rparen: AstTok,
    },
    Unary {
        op: UnaryOp,
        op_tok: AstTok,
        operand: Box<Expr>,
    },
    Postfix {
        op: PostfixOp,
        op_tok: AstTok,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        op_tok: AstTok,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        quest: AstTok,
        then_branch: Box<Expr>,
        colon: AstTok,
        else_branch: Box<Expr>,
    },
    Comma {
        lhs: Box<Expr>,
        comma: AstTok,
        rhs: Box<Expr>,
    },
    Cast {
        lparen: AstTok,
        type_name: TypeName,
        rparen: AstTok,
        operand: Box<Expr>,
    },
    /// `sizeof expr` — per §4.2, `sizeof(IDENT)` always parses this way;
    /// the code generator reinterprets when `IDENT` names a type.
    SizeofExpr {
        kw: AstTok,
        operand: Box<Expr>,
    },
    SizeofType {
        kw: AstTok,
        lparen: AstTok,
        type_name: TypeName,
        rparen: AstTok,
    },
    Call {
        callee: Box<Expr>,
        lparen: AstTok,
        args: Vec<Expr>,
        commas: Vec<AstTok>,
        rparen: AstTok,
    },
    Index {
        base: Box<Expr>,
        lbracket: AstTok,
        index: Box<Expr>,
        rbracket: AstTok,
    },
    Member {
        base: Box<Expr>,
        dot: AstTok,
        name: AstTok,
    },
    Arrow {
        base: Box<Expr>,
        arrow: AstTok,
        name: AstTok,
    },
    CompoundLiteral {
        lparen: AstTok,
        type_name: TypeName,
        rparen: AstTok,
        init: Box<Initializer>,
    },
}

impl Spanned for Expr {
    fn first_tok(&self) -> &AstTok {
        match self {
            Expr::IntLit { tok } | Expr::CharLit { tok } | Expr::Ident { tok } => tok,
            Expr::StringLit { parts } => parts.first().expect("string literal has >=1 part"),
            Expr::Paren { lparen, .. } => lparen,
            Expr::Unary { op_tok, operand, .. } => first_of([op_tok, operand.first_tok()]),
            Expr::Postfix { operand, .. } => operand.first_tok(),
            Expr::Binary { lhs, .. } => lhs.first_tok(),
            Expr::Conditional { cond, .. } => cond.first_tok(),
            Expr::Comma { lhs, .. } => lhs.first_tok(),
            Expr::Cast { lparen, .. } => lparen,
            Expr::SizeofExpr { kw, .. } | Expr::SizeofType { kw, .. } => kw,
            Expr::Call { callee, .. } => callee.first_tok(),
            Expr::Index { base, .. } => base.first_tok(),
            Expr::Member { base, .. } => base.first_tok(),
            Expr::Arrow { base, .. } => base.first_tok(),
            Expr::CompoundLiteral { lparen, .. } => lparen,
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            Expr::IntLit { tok } | Expr::CharLit { tok } | Expr::Ident { tok } => tok,
            Expr::StringLit { parts } => parts.last().expect("string literal has >=1 part"),
            Expr::Paren { rparen, .. } => rparen,
            Expr::Unary { operand, .. } => operand.last_tok(),
            Expr::Postfix { op_tok, .. } => op_tok,
            Expr::Binary { rhs, .. } => rhs.last_tok(),
            Expr::Conditional { else_branch, .. } => else_branch.last_tok(),
            Expr::Comma { rhs, .. } => rhs.last_tok(),
            Expr::Cast { operand, .. } => operand.last_tok(),
            Expr::SizeofExpr { operand, .. } => operand.last_tok(),
            Expr::SizeofType { rparen, .. } => rparen,
            Expr::Call { rparen, .. } => rparen,
            Expr::Index { rbracket, .. } => rbracket,
            Expr::Member { name, .. } => name,
            Expr::Arrow { name, .. } => name,
            Expr::CompoundLiteral { init, .. } => init.last_tok(),
        }
    }
}
