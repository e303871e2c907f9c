//! Top-level declarations and the module root.

use crate::ast::declarator::{Declarator, InitDeclarator};
use crate::ast::stmt::Block;
use crate::ast::tokens::{AstTok, Spanned};
use crate::ast::types::DeclSpecs;

/// `specs init-declarator-list ;` at file scope — may declare a typedef,
/// an extern/global variable, or merely define a record/enum tag.
#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub specs: DeclSpecs,
    pub declarators: Vec<InitDeclarator>,
    pub commas: Vec<AstTok>,
    pub semi: AstTok,
}

impl Spanned for GlobalDecl {
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
pub struct FunctionDef {
    pub specs: DeclSpecs,
    pub declarator: Declarator,
    pub body: Block,
}

impl Spanned for FunctionDef {
    fn first_tok(&self) -> &AstTok {
        self.specs.first_tok().unwrap_or_else(|| self.declarator.first_tok())
    }

    fn last_tok(&self) -> &AstTok {
        self.body.last_tok()
    }
}

#[derive(Debug, Clone)]
pub enum TopLevel {
    Decl(GlobalDecl),
    FunctionDef(FunctionDef),
}

impl Spanned for TopLevel {
    fn first_tok(&self) -> &AstTok {
        match self {
            TopLevel::Decl(d) => d.first_tok(),
            TopLevel::FunctionDef(f) => f.first_tok(),
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            TopLevel::Decl(d) => d.last_tok(),
            TopLevel::FunctionDef(f) => f.last_tok(),
        }
    }
}

/// The AST root: an ordered sequence of top-level declarations, in
/// source order (§5 ordering guarantees).
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub items: Vec<TopLevel>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}
