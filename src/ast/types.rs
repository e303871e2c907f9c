//! Declaration-specifier grammar nodes: storage class, qualifiers, type
//! specifiers, function specifier, attribute specifiers.

use crate::ast::tokens::{first_of, last_of, AstTok, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeQualifier {
    Const,
    Volatile,
    Restrict,
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicTypeKw {
    Void,
    Char,
    Short,
    Int,
    Long,
    Signed,
    Unsigned,
    Bool,
    Float,
    Double,
    Complex,
}

/// A record (struct/union) member, possibly a bitfield.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub specs: DeclSpecs,
    pub declarator: Option<crate::ast::declarator::Declarator>,
    pub colon: Option<AstTok>,
    pub bit_width: Option<Box<crate::ast::expr::Expr>>,
    pub semi: AstTok,
}

#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub is_union: bool,
    pub kw: AstTok,
    pub tag: Option<AstTok>,
    pub lbrace: Option<AstTok>,
    pub members: Vec<MemberDecl>,
    pub rbrace: Option<AstTok>,
}

impl RecordSpec {
    pub fn is_defining(&self) -> bool {
        self.lbrace.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: AstTok,
    pub eq: Option<AstTok>,
    pub value: Option<Box<crate::ast::expr::Expr>>,
    pub comma: Option<AstTok>,
}

#[derive(Debug, Clone)]
pub struct EnumSpec {
    pub kw: AstTok,
    pub tag: Option<AstTok>,
    pub lbrace: Option<AstTok>,
    pub enumerators: Vec<Enumerator>,
    pub rbrace: Option<AstTok>,
}

impl EnumSpec {
    pub fn is_defining(&self) -> bool {
        self.lbrace.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum TypeSpec {
    Basic(BasicTypeKw, AstTok),
    /// A previously-`typedef`'d name used as a type specifier.
    TypedefName(AstTok),
    Record(RecordSpec),
    Enum(EnumSpec),
}

impl Spanned for TypeSpec {
    fn first_tok(&self) -> &AstTok {
        match self {
            TypeSpec::Basic(_, t) | TypeSpec::TypedefName(t) => t,
            TypeSpec::Record(r) => &r.kw,
            TypeSpec::Enum(e) => &e.kw,
        }
    }

    fn last_tok(&self) -> &AstTok {
        match self {
            TypeSpec::Basic(_, t) | TypeSpec::TypedefName(t) => t,
            TypeSpec::Record(r) => r
                .rbrace
                .as_ref()
                .or(r.tag.as_ref())
                .unwrap_or(&r.kw),
            TypeSpec::Enum(e) => e.rbrace.as_ref().or(e.tag.as_ref()).unwrap_or(&e.kw),
        }
    }
}

/// `__attribute__((ident, ident, ...))`. Argument tokens beyond the bare
/// identifier list are captured verbatim in `raw` for faithful
/// reformatting; semantic meaning of attributes is not interpreted.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub kw: AstTok,
    pub lparen1: AstTok,
    pub lparen2: AstTok,
    pub idents: Vec<AstTok>,
    pub commas: Vec<AstTok>,
    pub rparen1: AstTok,
    pub rparen2: AstTok,
}

/// The accumulated declaration-specifier children, reduced by the code
/// generator into a `DSpec` (§4.3) but retained here in parsed form so
/// the AST stays faithful to source order and tokens.
#[derive(Debug, Clone, Default)]
pub struct DeclSpecs {
    /// Usually zero or one entry; more than one is a semantic violation
    /// the code generator reports (§4.3), not a parse error.
    pub storage_class: Vec<(StorageClass, AstTok)>,
    pub qualifiers: Vec<(TypeQualifier, AstTok)>,
    pub type_specs: Vec<TypeSpec>,
    pub is_inline: Option<AstTok>,
    pub attributes: Vec<AttributeSpec>,
}

impl DeclSpecs {
    pub fn first_tok(&self) -> Option<&AstTok> {
        let mut candidates: Vec<&AstTok> = Vec::new();
        candidates.extend(self.storage_class.iter().map(|(_, t)| t));
        candidates.extend(self.qualifiers.iter().map(|(_, t)| t));
        candidates.extend(self.type_specs.iter().map(|t| t.first_tok()));
        if let Some(t) = &self.is_inline {
            candidates.push(t);
        }
        candidates.extend(self.attributes.iter().map(|a| &a.kw));
        if candidates.is_empty() {
            None
        } else {
            Some(first_of(candidates))
        }
    }

    pub fn last_tok(&self) -> Option<&AstTok> {
        let mut candidates: Vec<&AstTok> = Vec::new();
        candidates.extend(self.storage_class.iter().map(|(_, t)| t));
        candidates.extend(self.qualifiers.iter().map(|(_, t)| t));
        candidates.extend(self.type_specs.iter().map(|t| t.last_tok()));
        if let Some(t) = &self.is_inline {
            candidates.push(t);
        }
        candidates.extend(self.attributes.iter().map(|a| &a.rparen2));
        if candidates.is_empty() {
            None
        } else {
            Some(last_of(candidates))
        }
    }
}
