//! Statement grammar nodes, per §4.2.

use crate::ast::declarator::InitDeclarator;
use crate::ast::expr::Expr;
use crate::ast::tokens::{last_of, AstTok, Spanned};
use crate::ast::types::DeclSpecs;

/// A local declaration inside a block: `specs init-declarator-list ;`.
#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub specs: DeclSpecs,
    pub declarators: Vec<InitDeclarator>,
    pub commas: Vec<AstTok>,
    pub semi: AstTok,
}

impl Spanned for LocalDecl {
    fn first_tok(&self) -> &AstTok {
        self.specs
            .first_tok()
            .or_else(|| self.declarators.first().map(|d| d.first_tok()))
            .unwrap_or(&self.semi)
    }

    fn last_tok(&self) -> &AstTok {
        &self.semi
    }
}

#[derive(Debug, Clone)]
pub enum BlockItem {
    Decl(LocalDecl),
    Stmt(Stmt),
}

/// `{ item* }` or a single statement standing in for a brace-less body
/// (e.g. `if (c) return 0;`).
#[derive(Debug, Clone)]
pub enum Block {
    Braced {
        lbrace: AstTok,
        items: Vec<BlockItem>,
        rbrace: AstTok,
    },
    Single(Box<Stmt>),
}

impl Spanned for Block {
    fn first_tok(&self) -> &AstTok {
        match self {
            Block::Braced { lbrace, .. } => lbrace,
            Block::Single(s) => s.first_tok(),
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            Block::Braced { rbrace, .. } => rbrace,
            Block::Single(s) => s.last_tok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseArm {
    pub kw: AstTok,
    pub value: Option<Box<Expr>>,
    pub colon: AstTok,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr {
        expr: Option<Box<Expr>>,
        semi: AstTok,
    },
    Compound(Block),
    Return {
        kw: AstTok,
        value: Option<Box<Expr>>,
        semi: AstTok,
    },
    If {
        kw: AstTok,
        lparen: AstTok,
        cond: Box<Expr>,
        rparen: AstTok,
        then_branch: Box<Block>,
        else_kw: Option<AstTok>,
        else_branch: Option<Box<Block>>,
    },
    While {
        kw: AstTok,
        lparen: AstTok,
        cond: Box<Expr>,
        rparen: AstTok,
        body: Box<Block>,
    },
    Do {
        kw: AstTok,
        body: Box<Block>,
        while_kw: AstTok,
        lparen: AstTok,
        cond: Box<Expr>,
        rparen: AstTok,
        semi: AstTok,
    },
    For {
        kw: AstTok,
        lparen: AstTok,
        init: Option<Box<ForInit>>,
        semi1: AstTok,
        cond: Option<Box<Expr>>,
        semi2: AstTok,
        step: Option<Box<Expr>>,
        rparen: AstTok,
        body: Box<Block>,
    },
    Switch {
        kw: AstTok,
        lparen: AstTok,
        scrutinee: Box<Expr>,
        rparen: AstTok,
        body: Box<Block>,
    },
    Case(CaseArm),
    Break {
        kw: AstTok,
        semi: AstTok,
    },
    Continue {
        kw: AstTok,
        semi: AstTok,
    },
    Goto {
        kw: AstTok,
        label: AstTok,
        semi: AstTok,
    },
    Label {
        name: AstTok,
        colon: AstTok,
    },
    Null {
        semi: AstTok,
    },
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Decl(LocalDecl),
    Expr(Box<Expr>),
}

impl Spanned for Stmt {
    fn first_tok(&self) -> &AstTok {
        match self {
            Stmt::Expr { expr, semi } => expr.as_ref().map(|e| e.first_tok()).unwrap_or(semi),
            Stmt::Compound(b) => b.first_tok(),
            Stmt::Return { kw, .. } => kw,
            Stmt::If { kw, .. } => kw,
            Stmt::While { kw, .. } => kw,
            Stmt::Do { kw, .. } => kw,
            Stmt::For { kw, .. } => kw,
            Stmt::Switch { kw, .. } => kw,
            Stmt::Case(c) => &c.kw,
            Stmt::Break { kw, .. } => kw,
            Stmt::Continue { kw, .. } => kw,
            Stmt::Goto { kw, .. } => kw,
            Stmt::Label { name, .. } => name,
            Stmt::Null { semi } => semi,
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            Stmt::Expr { semi, .. } => semi,
            Stmt::Compound(b) => b.last_tok(),
            Stmt::Return { semi, .. } => semi,
            Stmt::If {
                else_branch,
                then_branch,
                ..
            } => else_branch
                .as_ref()
                .map(|b| b.last_tok())
                .unwrap_or_else(|| then_branch.last_tok()),
            Stmt::While { body, .. } => body.last_tok(),
            Stmt::Do { semi, .. } => semi,
            Stmt::For { body, .. } => body.last_tok(),
            Stmt::Switch { body, .. } => body.last_tok(),
            Stmt::Case(c) => last_of([&c.kw, &c.colon]),
            Stmt::Break { semi, .. } => semi,
            Stmt::Continue { semi, .. } => semi,
            Stmt::Goto { semi, .. } => semi,
            Stmt::Label { colon, .. } => colon,
            Stmt::Null { semi } => semi,
        }
    }
}
