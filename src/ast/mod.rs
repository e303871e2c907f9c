//! The Abstract Syntax Tree (§3, §4.2).
//!
//! Node ownership is a plain tree: every child is owned by exactly one
//! parent (`Box`/`Vec`), replacing the source project's intrusive
//! doubly-linked list hooks per the Design Notes. Traversal that needs a
//! stable handle back to a node (the checker's token cross-links) goes
//! through the token-level `user_data` slot on [`tokens::AstTok`] instead
//! of raw back-pointers.

pub mod decl;
pub mod declarator;
pub mod expr;
pub mod stmt;
pub mod tokens;
pub mod types;

pub use decl::{FunctionDef, GlobalDecl, Module, TopLevel};
pub use declarator::{Declarator, InitDeclarator, ParamDecl};
pub use expr::{BinOp, Expr, Initializer, PostfixOp, TypeName, UnaryOp};
pub use stmt::{Block, BlockItem, ForInit, LocalDecl, Stmt};
pub use tokens::{AstTok, Spanned};
pub use types::{
    AttributeSpec, BasicTypeKw, DeclSpecs, EnumSpec, Enumerator, MemberDecl, RecordSpec,
    StorageClass, TypeQualifier, TypeSpec,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::TokType;
    use crate::pos::SourcePos;

    fn tok(tt: TokType, text: &str) -> AstTok {
        let p = SourcePos::new("t.c", 1, 1);
        AstTok::new(tt, p.clone(), p, text.to_string())
    }

    #[test]
    fn declarator_abstractness_matches_leaf() {
        let abs = Declarator::Pointer {
            star: tok(TokType::Star, "*"),
            qualifiers: vec![],
            inner: Box::new(Declarator::NoIdent { placeholder: None }),
        };
        assert!(abs.is_abstract());

        let named = Declarator::Pointer {
            star: tok(TokType::Star, "*"),
            qualifiers: vec![],
            inner: Box::new(Declarator::Ident {
                tok: tok(TokType::Ident, "x"),
            }),
        };
        assert!(!named.is_abstract());
        assert_eq!(named.ident_name(), Some("x"));
    }
}
