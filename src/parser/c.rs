//! Recursive-descent parser for the C grammar subset (§4.2).

use crate::ast::*;
use crate::lexer::token::{TokType, Token};
use crate::parser::cursor::Cursor;
use crate::parser::error::{PResult, ParseError};
use crate::pos::SourceRange;

pub struct Parser<'t> {
    cur: Cursor<'t>,
    ident_is_type: Option<Box<dyn Fn(&str) -> bool + 't>>,
}

impl<'t> Parser<'t> {
    pub fn new(toks: &'t [Token<()>]) -> Self {
        Self {
            cur: Cursor::new(toks),
            ident_is_type: None,
        }
    }

    pub fn with_ident_is_type(toks: &'t [Token<()>], f: impl Fn(&str) -> bool + 't) -> Self {
        Self {
            cur: Cursor::new(toks),
            ident_is_type: Some(Box::new(f)),
        }
    }

    fn tt(&self) -> TokType {
        self.cur.peek().tok_type
    }

    fn at(&self, tt: TokType) -> bool {
        self.tt() == tt
    }

    fn range_here(&self) -> SourceRange {
        let t = self.cur.peek();
        SourceRange::new(t.begin_pos.clone(), t.end_pos.clone())
    }

    fn err(&self, expected: impl Into<String>) -> ParseError {
        let t = self.cur.peek();
        ParseError {
            range: self.range_here(),
            expected: expected.into(),
            found: format!("{:?} {:?}", t.tok_type, t.text),
        }
    }

    /// Consumes the current grammar token and returns it wrapped as an
    /// owned AST token carrying a fresh opaque id.
    fn bump(&mut self) -> AstTok {
        let id = self.cur.next_tok_data();
        let raw = self.cur.advance();
        let mut t = tokens::from_lexer(raw);
        t.user_data = Some(id);
        t
    }

    fn expect(&mut self, tt: TokType, what: &str) -> PResult<AstTok> {
        if self.at(tt) {
            Ok(self.bump())
        } else {
            Err(self.err(what))
        }
    }

    fn eat(&mut self, tt: TokType) -> Option<AstTok> {
        if self.at(tt) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn is_type_ident(&self, name: &str) -> bool {
        match &self.ident_is_type {
            Some(f) => f(name),
            // Heuristic fallback when the host gives us no symbol table:
            // an identifier that is itself the declaration-specifier and
            // is immediately followed by something that can only start a
            // declarator is treated as a typedef name.
            None => {
                matches!(
                    self.cur.peek_at(1).tok_type,
                    TokType::Ident | TokType::Star | TokType::LParen
                )
            }
        }
    }

    // ---------------------------------------------------------------
    // Module / top level
    // ---------------------------------------------------------------

    pub fn parse_module(&mut self) -> PResult<Module> {
        let mut module = Module::new();
        while !self.at(TokType::Eof) {
            module.items.push(self.parse_global_decln()?);
        }
        Ok(module)
    }

    pub fn parse_global_decln(&mut self) -> PResult<TopLevel> {
        let specs = self.parse_decl_specs()?;

        if let Some(semi) = self.eat(TokType::Semicolon) {
            return Ok(TopLevel::Decl(GlobalDecl {
                specs,
                declarators: Vec::new(),
                commas: Vec::new(),
                semi,
            }));
        }

        let first = self.parse_declarator()?;

        if matches!(first, Declarator::Function { .. }) && self.at(TokType::LBrace) {
            let body = self.parse_block()?;
            return Ok(TopLevel::FunctionDef(FunctionDef {
                specs,
                declarator: first,
                body,
            }));
        }

        let mut declarators = Vec::new();
        let eq = self.eat(TokType::Assign);
        let initializer = if eq.is_some() {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        declarators.push(InitDeclarator {
            declarator: first,
            eq,
            initializer,
        });

        let mut commas = Vec::new();
        while let Some(comma) = self.eat(TokType::Comma) {
            commas.push(comma);
            let d = self.parse_declarator()?;
            let eq = self.eat(TokType::Assign);
            let initializer = if eq.is_some() {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            declarators.push(InitDeclarator {
                declarator: d,
                eq,
                initializer,
            });
        }

        let semi = self.expect(TokType::Semicolon, "';'")?;
        Ok(TopLevel::Decl(GlobalDecl {
            specs,
            declarators,
            commas,
            semi,
        }))
    }

    // ---------------------------------------------------------------
    // Declaration specifiers
    // ---------------------------------------------------------------

    fn parse_decl_specs(&mut self) -> PResult<DeclSpecs> {
        let mut specs = DeclSpecs::default();
        loop {
            match self.tt() {
                TokType::Typedef => specs.storage_class.push((StorageClass::Typedef, self.bump())),
                TokType::Extern => specs.storage_class.push((StorageClass::Extern, self.bump())),
                TokType::Static => specs.storage_class.push((StorageClass::Static, self.bump())),
                TokType::Auto => specs.storage_class.push((StorageClass::Auto, self.bump())),
                TokType::Register => specs.storage_class.push((StorageClass::Register, self.bump())),

                TokType::Const => specs.qualifiers.push((TypeQualifier::Const, self.bump())),
                TokType::Volatile => specs.qualifiers.push((TypeQualifier::Volatile, self.bump())),
                TokType::Restrict => specs.qualifiers.push((TypeQualifier::Restrict, self.bump())),
                TokType::Atomic if self.cur.peek_at(1).tok_type != TokType::LParen => {
                    specs.qualifiers.push((TypeQualifier::Atomic, self.bump()))
                }

                TokType::Inline => specs.is_inline = Some(self.bump()),
                TokType::Attribute => specs.attributes.push(self.parse_attribute()?),

                TokType::Void => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Void, self.bump())),
                TokType::Char => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Char, self.bump())),
                TokType::Short => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Short, self.bump())),
                TokType::Int => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Int, self.bump())),
                TokType::Long => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Long, self.bump())),
                TokType::Signed => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Signed, self.bump())),
                TokType::Unsigned => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Unsigned, self.bump())),
                TokType::Bool => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Bool, self.bump())),
                TokType::Float => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Float, self.bump())),
                TokType::Double => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Double, self.bump())),
                TokType::Complex => specs.type_specs.push(TypeSpec::Basic(BasicTypeKw::Complex, self.bump())),

                TokType::Struct | TokType::Union => {
                    specs.type_specs.push(TypeSpec::Record(self.parse_record_spec()?))
                }
                TokType::Enum => specs.type_specs.push(TypeSpec::Enum(self.parse_enum_spec()?)),

                TokType::Ident if specs.type_specs.is_empty() && self.is_type_ident(&self.cur.peek().text.clone()) => {
                    specs.type_specs.push(TypeSpec::TypedefName(self.bump()))
                }

                _ => break,
            }
        }
        Ok(specs)
    }

    fn parse_attribute(&mut self) -> PResult<AttributeSpec> {
        let kw = self.bump();
        let lparen1 = self.expect(TokType::LParen, "'('")?;
        let lparen2 = self.expect(TokType::LParen, "'('")?;
        let mut idents = Vec::new();
        let mut commas = Vec::new();
        if !self.at(TokType::RParen) {
            idents.push(self.expect(TokType::Ident, "identifier")?);
            while let Some(c) = self.eat(TokType::Comma) {
                commas.push(c);
                idents.push(self.expect(TokType::Ident, "identifier")?);
            }
        }
        let rparen1 = self.expect(TokType::RParen, "')'")?;
        let rparen2 = self.expect(TokType::RParen, "')'")?;
        Ok(AttributeSpec {
            kw,
            lparen1,
            lparen2,
            idents,
            commas,
            rparen1,
            rparen2,
        })
    }

    fn parse_record_spec(&mut self) -> PResult<RecordSpec> {
        let is_union = self.at(TokType::Union);
        let kw = self.bump();
        let tag = self.eat(TokType::Ident);
        let mut lbrace = None;
        let mut members = Vec::new();
        let mut rbrace = None;
        if let Some(lb) = self.eat(TokType::LBrace) {
            lbrace = Some(lb);
            while !self.at(TokType::RBrace) && !self.at(TokType::Eof) {
                members.push(self.parse_member_decl()?);
            }
            rbrace = Some(self.expect(TokType::RBrace, "'}'")?);
        }
        Ok(RecordSpec {
            is_union,
            kw,
            tag,
            lbrace,
            members,
            rbrace,
        })
    }

    fn parse_member_decl(&mut self) -> PResult<MemberDecl> {
        let specs = self.parse_decl_specs()?;
        if self.at(TokType::Colon) {
            let colon = self.bump();
            let bit_width = Some(Box::new(self.parse_conditional_expr()?));
            let semi = self.expect(TokType::Semicolon, "';'")?;
            return Ok(MemberDecl {
                specs,
                declarator: None,
                colon: Some(colon),
                bit_width,
                semi,
            });
        }
        let declarator = self.parse_declarator()?;
        if self.at(TokType::Colon) {
            let colon = self.bump();
            let bit_width = Some(Box::new(self.parse_conditional_expr()?));
            let semi = self.expect(TokType::Semicolon, "';'")?;
            return Ok(MemberDecl {
                specs,
                declarator: Some(declarator),
                colon: Some(colon),
                bit_width,
                semi,
            });
        }
        let semi = self.expect(TokType::Semicolon, "';'")?;
        Ok(MemberDecl {
            specs,
            declarator: Some(declarator),
            colon: None,
            bit_width: None,
            semi,
        })
    }

    fn parse_enum_spec(&mut self) -> PResult<EnumSpec> {
        let kw = self.bump();
        let tag = self.eat(TokType::Ident);
        let mut lbrace = None;
        let mut enumerators = Vec::new();
        let mut rbrace = None;
        if let Some(lb) = self.eat(TokType::LBrace) {
            lbrace = Some(lb);
            while !self.at(TokType::RBrace) && !self.at(TokType::Eof) {
                let name = self.expect(TokType::Ident, "enumerator name")?;
                let eq = self.eat(TokType::Assign);
                let value = if eq.is_some() {
                    Some(Box::new(self.parse_conditional_expr()?))
                } else {
                    None
                };
                let comma = self.eat(TokType::Comma);
                let last = comma.is_none();
                enumerators.push(Enumerator {
                    name,
                    eq,
                    value,
                    comma,
                });
                if last {
                    break;
                }
            }
            rbrace = Some(self.expect(TokType::RBrace, "'}'")?);
        }
        Ok(EnumSpec {
            kw,
            tag,
            lbrace,
            enumerators,
            rbrace,
        })
    }

    // ---------------------------------------------------------------
    // Declarators
    // ---------------------------------------------------------------

    fn parse_declarator(&mut self) -> PResult<Declarator> {
        if self.at(TokType::Star) {
            let star = self.bump();
            let mut qualifiers = Vec::new();
            loop {
                match self.tt() {
                    TokType::Const => {
                        self.bump();
                        qualifiers.push(TypeQualifier::Const);
                    }
                    TokType::Volatile => {
                        self.bump();
                        qualifiers.push(TypeQualifier::Volatile);
                    }
                    TokType::Restrict => {
                        self.bump();
                        qualifiers.push(TypeQualifier::Restrict);
                    }
                    _ => break,
                }
            }
            let inner = Box::new(self.parse_declarator()?);
            return Ok(self.parse_declarator_suffix(Declarator::Pointer {
                star,
                qualifiers,
                inner,
            })?);
        }
        self.parse_direct_declarator()
    }

    fn parse_direct_declarator(&mut self) -> PResult<Declarator> {
        let base = if let Some(tok) = self.eat(TokType::Ident) {
            Declarator::Ident { tok }
        } else if let Some(lp) = self.eat(TokType::LParen) {
            if matches!(self.tt(), TokType::Star) {
                let inner = self.parse_declarator()?;
                let rparen = self.expect(TokType::RParen, "')'")?;
                Declarator::Parenthesized {
                    lparen: lp,
                    inner: Box::new(inner),
                    rparen,
                }
            } else {
                let inner = self.parse_declarator()?;
                let rparen = self.expect(TokType::RParen, "')'")?;
                Declarator::Parenthesized {
                    lparen: lp,
                    inner: Box::new(inner),
                    rparen,
                }
            }
        } else {
            Declarator::NoIdent { placeholder: None }
        };
        self.parse_declarator_suffix(base)
    }

    fn parse_declarator_suffix(&mut self, mut base: Declarator) -> PResult<Declarator> {
        loop {
            match self.tt() {
                TokType::LParen => {
                    let lparen = self.bump();
                    let mut params = Vec::new();
                    let mut commas = Vec::new();
                    let mut variadic = false;
                    let mut ellipsis = None;
                    if !self.at(TokType::RParen) {
                        params.push(self.parse_param_decl()?);
                        while let Some(c) = self.eat(TokType::Comma) {
                            if self.at(TokType::Ellipsis) {
                                ellipsis = Some(self.bump());
                                variadic = true;
                                commas.push(c);
                                break;
                            }
                            commas.push(c);
                            params.push(self.parse_param_decl()?);
                        }
                    }
                    let rparen = self.expect(TokType::RParen, "')'")?;
                    base = Declarator::Function {
                        inner: Box::new(base),
                        lparen,
                        params,
                        variadic,
                        commas,
                        ellipsis,
                        rparen,
                    };
                }
                TokType::LBracket => {
                    let lbracket = self.bump();
                    let size = if self.at(TokType::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    let rbracket = self.expect(TokType::RBracket, "']'")?;
                    base = Declarator::Array {
                        inner: Box::new(base),
                        lbracket,
                        size,
                        rbracket,
                    };
                }
                _ => break,
            }
        }
        Ok(base)
    }

    fn parse_param_decl(&mut self) -> PResult<ParamDecl> {
        let specs = self.parse_decl_specs()?;
        let declarator = self.parse_declarator()?;
        Ok(ParamDecl { specs, declarator })
    }

    fn parse_type_name(&mut self) -> PResult<TypeName> {
        let specs = self.parse_decl_specs()?;
        let declarator = self.parse_declarator()?;
        Ok(TypeName { specs, declarator })
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        if self.at(TokType::LBrace) {
            let lbrace = self.bump();
            let mut items = Vec::new();
            while !self.at(TokType::RBrace) && !self.at(TokType::Eof) {
                items.push(self.parse_block_item()?);
            }
            let rbrace = self.expect(TokType::RBrace, "'}'")?;
            Ok(Block::Braced {
                lbrace,
                items,
                rbrace,
            })
        } else {
            Ok(Block::Single(Box::new(self.parse_stmt()?)))
        }
    }

    fn parse_block_item(&mut self) -> PResult<BlockItem> {
        if self.starts_decl() {
            Ok(BlockItem::Decl(self.parse_local_decl()?))
        } else {
            Ok(BlockItem::Stmt(self.parse_stmt()?))
        }
    }

    fn starts_decl(&self) -> bool {
        match self.tt() {
            TokType::Typedef
            | TokType::Extern
            | TokType::Static
            | TokType::Auto
            | TokType::Register
            | TokType::Const
            | TokType::Volatile
            | TokType::Restrict
            | TokType::Inline
            | TokType::Attribute
            | TokType::Void
            | TokType::Char
            | TokType::Short
            | TokType::Int
            | TokType::Long
            | TokType::Signed
            | TokType::Unsigned
            | TokType::Bool
            | TokType::Float
            | TokType::Double
            | TokType::Complex
            | TokType::Struct
            | TokType::Union
            | TokType::Enum => true,
            TokType::Ident => self.is_type_ident(&self.cur.peek().text.clone()),
            _ => false,
        }
    }

    fn parse_local_decl(&mut self) -> PResult<LocalDecl> {
        let (specs, declarators, commas) = self.parse_decl_specs_and_declarators()?;
        let semi = self.expect(TokType::Semicolon, "';'")?;
        Ok(LocalDecl {
            specs,
            declarators,
            commas,
            semi,
        })
    }

    /// Shared by `parse_local_decl` and a `for`-loop init-clause: declaration
    /// specifiers plus an init-declarator-list, stopping short of the
    /// terminating `;` so callers can fold it into their own grammar.
    fn parse_decl_specs_and_declarators(
        &mut self,
    ) -> PResult<(DeclSpecs, Vec<InitDeclarator>, Vec<AstTok>)> {
        let specs = self.parse_decl_specs()?;
        let mut declarators = Vec::new();
        let mut commas = Vec::new();
        if !self.at(TokType::Semicolon) {
            let first = self.parse_declarator()?;
            let eq = self.eat(TokType::Assign);
            let initializer = if eq.is_some() {
                Some(self.parse_initializer()?)
            } else {
                None
            };
            declarators.push(InitDeclarator {
                declarator: first,
                eq,
                initializer,
            });
            while let Some(c) = self.eat(TokType::Comma) {
                commas.push(c);
                let d = self.parse_declarator()?;
                let eq = self.eat(TokType::Assign);
                let initializer = if eq.is_some() {
                    Some(self.parse_initializer()?)
                } else {
                    None
                };
                declarators.push(InitDeclarator {
                    declarator: d,
                    eq,
                    initializer,
                });
            }
        }
        Ok((specs, declarators, commas))
    }

    fn parse_initializer(&mut self) -> PResult<Initializer> {
        if self.at(TokType::LBrace) {
            let lbrace = self.bump();
            let mut items = Vec::new();
            while !self.at(TokType::RBrace) && !self.at(TokType::Eof) {
                let value = self.parse_initializer()?;
                let comma = self.eat(TokType::Comma);
                let last = comma.is_none();
                items.push(InitItem {
                    designators: Vec::new(),
                    value,
                    comma,
                });
                if last {
                    break;
                }
            }
            let rbrace = self.expect(TokType::RBrace, "'}'")?;
            Ok(Initializer::List {
                lbrace,
                items,
                rbrace,
            })
        } else {
            Ok(Initializer::Expr(Box::new(self.parse_assignment_expr()?)))
        }
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.tt() {
            TokType::LBrace => Ok(Stmt::Compound(self.parse_block()?)),
            TokType::Return => {
                let kw = self.bump();
                let value = if self.at(TokType::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Return { kw, value, semi })
            }
            TokType::If => {
                let kw = self.bump();
                let lparen = self.expect(TokType::LParen, "'('")?;
                let cond = Box::new(self.parse_expr()?);
                let rparen = self.expect(TokType::RParen, "')'")?;
                let then_branch = Box::new(self.parse_block()?);
                let (else_kw, else_branch) = if self.at(TokType::Else) {
                    let ek = self.bump();
                    (Some(ek), Some(Box::new(self.parse_block()?)))
                } else {
                    (None, None)
                };
                Ok(Stmt::If {
                    kw,
                    lparen,
                    cond,
                    rparen,
                    then_branch,
                    else_kw,
                    else_branch,
                })
            }
            TokType::While => {
                let kw = self.bump();
                let lparen = self.expect(TokType::LParen, "'('")?;
                let cond = Box::new(self.parse_expr()?);
                let rparen = self.expect(TokType::RParen, "')'")?;
                let body = Box::new(self.parse_block()?);
                Ok(Stmt::While {
                    kw,
                    lparen,
                    cond,
                    rparen,
                    body,
                })
            }
            TokType::Do => {
                let kw = self.bump();
                let body = Box::new(self.parse_block()?);
                let while_kw = self.expect(TokType::While, "'while'")?;
                let lparen = self.expect(TokType::LParen, "'('")?;
                let cond = Box::new(self.parse_expr()?);
                let rparen = self.expect(TokType::RParen, "')'")?;
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Do {
                    kw,
                    body,
                    while_kw,
                    lparen,
                    cond,
                    rparen,
                    semi,
                })
            }
            TokType::For => {
                let kw = self.bump();
                let lparen = self.expect(TokType::LParen, "'('")?;
                let mut init = None;
                let semi1 = if self.at(TokType::Semicolon) {
                    self.bump()
                } else if self.starts_decl() {
                    let (specs, declarators, commas) = self.parse_decl_specs_and_declarators()?;
                    let semi1 = self.expect(TokType::Semicolon, "';'")?;
                    init = Some(Box::new(ForInit::Decl(LocalDecl {
                        specs,
                        declarators,
                        commas,
                        semi: semi1.clone(),
                    })));
                    semi1
                } else {
                    let e = self.parse_expr()?;
                    init = Some(Box::new(ForInit::Expr(Box::new(e))));
                    self.expect(TokType::Semicolon, "';'")?
                };
                let cond = if self.at(TokType::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                let semi2 = self.expect(TokType::Semicolon, "';'")?;
                let step = if self.at(TokType::RParen) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                let rparen = self.expect(TokType::RParen, "')'")?;
                let body = Box::new(self.parse_block()?);
                Ok(Stmt::For {
                    kw,
                    lparen,
                    init,
                    semi1,
                    cond,
                    semi2,
                    step,
                    rparen,
                    body,
                })
            }
            TokType::Switch => {
                let kw = self.bump();
                let lparen = self.expect(TokType::LParen, "'('")?;
                let scrutinee = Box::new(self.parse_expr()?);
                let rparen = self.expect(TokType::RParen, "')'")?;
                let body = Box::new(self.parse_block()?);
                Ok(Stmt::Switch {
                    kw,
                    lparen,
                    scrutinee,
                    rparen,
                    body,
                })
            }
            TokType::Case => {
                let kw = self.bump();
                let value = Some(Box::new(self.parse_conditional_expr()?));
                let colon = self.expect(TokType::Colon, "':'")?;
                Ok(Stmt::Case(CaseArm { kw, value, colon }))
            }
            TokType::Default => {
                let kw = self.bump();
                let colon = self.expect(TokType::Colon, "':'")?;
                Ok(Stmt::Case(CaseArm {
                    kw,
                    value: None,
                    colon,
                }))
            }
            TokType::Break => {
                let kw = self.bump();
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Break { kw, semi })
            }
            TokType::Continue => {
                let kw = self.bump();
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Continue { kw, semi })
            }
            TokType::Goto => {
                let kw = self.bump();
                let label = self.expect(TokType::Ident, "label name")?;
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Goto { kw, label, semi })
            }
            TokType::Semicolon => Ok(Stmt::Null { semi: self.bump() }),
            TokType::Ident if self.cur.peek_at(1).tok_type == TokType::Colon => {
                let name = self.bump();
                let colon = self.bump();
                Ok(Stmt::Label { name, colon })
            }
            _ => {
                let expr = Box::new(self.parse_expr()?);
                let semi = self.expect(TokType::Semicolon, "';'")?;
                Ok(Stmt::Expr {
                    expr: Some(expr),
                    semi,
                })
            }
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        let first = self.parse_assignment_expr()?;
        if self.at(TokType::Comma) {
            let comma = self.bump();
            let rhs = self.parse_expr()?;
            Ok(Expr::Comma {
                lhs: Box::new(first),
                comma,
                rhs: Box::new(rhs),
            })
        } else {
            Ok(first)
        }
    }

    fn parse_assignment_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_conditional_expr()?;
        let op = match self.tt() {
            TokType::Assign => crate::ast::BinOp::Assign,
            TokType::MulAssign => crate::ast::BinOp::MulAssign,
            TokType::DivAssign => crate::ast::BinOp::DivAssign,
            TokType::ModAssign => crate::ast::BinOp::ModAssign,
            TokType::AddAssign => crate::ast::BinOp::AddAssign,
            TokType::SubAssign => crate::ast::BinOp::SubAssign,
            TokType::ShlAssign => crate::ast::BinOp::ShlAssign,
            TokType::ShrAssign => crate::ast::BinOp::ShrAssign,
            TokType::AndAssign => crate::ast::BinOp::AndAssign,
            TokType::XorAssign => crate::ast::BinOp::XorAssign,
            TokType::OrAssign => crate::ast::BinOp::OrAssign,
            _ => return Ok(lhs),
        };
        let op_tok = self.bump();
        let rhs = self.parse_assignment_expr()?;
        Ok(Expr::Binary {
            op,
            op_tok,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_conditional_expr(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary_expr(0)?;
        if self.at(TokType::Quest) {
            let quest = self.bump();
            let then_branch = Box::new(self.parse_expr()?);
            let colon = self.expect(TokType::Colon, "':'")?;
            let else_branch = Box::new(self.parse_conditional_expr()?);
            Ok(Expr::Conditional {
                cond: Box::new(cond),
                quest,
                then_branch,
                colon,
                else_branch,
            })
        } else {
            Ok(cond)
        }
    }

    /// Precedence-climbing over the binary operator levels, from `||`
    /// (lowest, level 0) down through `*`/`/`/`%` (level 9).
    fn parse_binary_expr(&mut self, min_level: u8) -> PResult<Expr> {
        let mut lhs = self.parse_cast_expr()?;
        loop {
            let Some((op, level)) = self.peek_binop() else {
                break;
            };
            if level < min_level {
                break;
            }
            let op_tok = self.bump();
            let rhs = self.parse_binary_expr(level + 1)?;
            lhs = Expr::Binary {
                op,
                op_tok,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn peek_binop(&self) -> Option<(crate::ast::BinOp, u8)> {
        use crate::ast::BinOp::*;
        Some(match self.tt() {
            TokType::LogOr => (LogOr, 0),
            TokType::LogAnd => (LogAnd, 1),
            TokType::Bar => (BitOr, 2),
            TokType::Xor => (BitXor, 3),
            TokType::Amp => (BitAnd, 4),
            TokType::Eq => (Eq, 5),
            TokType::Neq => (Neq, 5),
            TokType::Lt => (Lt, 6),
            TokType::Gt => (Gt, 6),
            TokType::Leq => (Leq, 6),
            TokType::Geq => (Geq, 6),
            TokType::Shl => (Shl, 7),
            TokType::Shr => (Shr, 7),
            TokType::Plus => (Add, 8),
            TokType::Minus => (Sub, 8),
            TokType::Star => (Mul, 9),
            TokType::Slash => (Div, 9),
            TokType::Percent => (Mod, 9),
            _ => return None,
        })
    }

    fn parse_cast_expr(&mut self) -> PResult<Expr> {
        if self.at(TokType::LParen) && self.looks_like_cast() {
            let lparen = self.bump();
            let type_name = self.parse_type_name()?;
            let rparen = self.expect(TokType::RParen, "')'")?;
            if self.at(TokType::LBrace) {
                let init = Box::new(self.parse_initializer()?);
                return Ok(Expr::CompoundLiteral {
                    lparen,
                    type_name,
                    rparen,
                    init,
                });
            }
            let operand = Box::new(self.parse_cast_expr()?);
            return Ok(Expr::Cast {
                lparen,
                type_name,
                rparen,
                operand,
            });
        }
        self.parse_unary_expr()
    }

    /// Resolves the `(IDENT) ...` / `(expr)` ambiguity from §4.2: try the
    /// host's `ident_is_type` callback first; otherwise do a cheap
    /// position-saving trial parse of a type-name.
    fn looks_like_cast(&mut self) -> bool {
        debug_assert!(self.at(TokType::LParen));
        if let Some(f) = &self.ident_is_type {
            if self.cur.peek_at(1).tok_type == TokType::Ident {
                return f(&self.cur.peek_at(1).text);
            }
        }
        if !self.starts_type_spec_at(1) {
            return false;
        }
        let mark = self.cur.mark();
        self.cur.advance(); // (
        let parsed = self.parse_type_name().is_ok() && self.at(TokType::RParen);
        self.cur.reset(mark);
        parsed
    }

    fn starts_type_spec_at(&self, n: usize) -> bool {
        matches!(
            self.cur.peek_at(n).tok_type,
            TokType::Void
                | TokType::Char
                | TokType::Short
                | TokType::Int
                | TokType::Long
                | TokType::Signed
                | TokType::Unsigned
                | TokType::Bool
                | TokType::Float
                | TokType::Double
                | TokType::Complex
                | TokType::Struct
                | TokType::Union
                | TokType::Enum
                | TokType::Const
                | TokType::Volatile
        ) || (self.cur.peek_at(n).tok_type == TokType::Ident
            && self
                .ident_is_type
                .as_ref()
                .map(|f| f(&self.cur.peek_at(n).text))
                .unwrap_or(false))
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let op = match self.tt() {
            TokType::Plus => Some(crate::ast::UnaryOp::Plus),
            TokType::Minus => Some(crate::ast::UnaryOp::Minus),
            TokType::Excl => Some(crate::ast::UnaryOp::Not),
            TokType::Tilde => Some(crate::ast::UnaryOp::BitNot),
            TokType::Star => Some(crate::ast::UnaryOp::Deref),
            TokType::Amp => Some(crate::ast::UnaryOp::AddrOf),
            TokType::Inc => Some(crate::ast::UnaryOp::PreInc),
            TokType::Dec => Some(crate::ast::UnaryOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            let op_tok = self.bump();
            let operand = Box::new(self.parse_cast_expr()?);
            return Ok(Expr::Unary { op, op_tok, operand });
        }
        if self.at(TokType::Sizeof) {
            let kw = self.bump();
            if self.at(TokType::LParen) && self.starts_type_spec_at(1) {
                let lparen = self.bump();
                let type_name = self.parse_type_name()?;
                let rparen = self.expect(TokType::RParen, "')'")?;
                return Ok(Expr::SizeofType {
                    kw,
                    lparen,
                    type_name,
                    rparen,
                });
            }
            // `sizeof(IDENT)` and `sizeof expr` both land here, per §4.2;
            // the code generator reinterprets the parenthesized-identifier
            // case once it knows whether IDENT names a type.
            let operand = Box::new(self.parse_unary_expr()?);
            return Ok(Expr::SizeofExpr { kw, operand });
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> PResult<Expr> {
        let mut e = self.parse_primary_expr()?;
        loop {
            match self.tt() {
                TokType::LBracket => {
                    let lbracket = self.bump();
                    let index = Box::new(self.parse_expr()?);
                    let rbracket = self.expect(TokType::RBracket, "']'")?;
                    e = Expr::Index {
                        base: Box::new(e),
                        lbracket,
                        index,
                        rbracket,
                    };
                }
                TokType::LParen => {
                    let lparen = self.bump();
                    let mut args = Vec::new();
                    let mut commas = Vec::new();
                    if !self.at(TokType::RParen) {
                        args.push(self.parse_assignment_expr()?);
                        while let Some(c) = self.eat(TokType::Comma) {
                            commas.push(c);
                            args.push(self.parse_assignment_expr()?);
                        }
                    }
                    let rparen = self.expect(TokType::RParen, "')'")?;
                    e = Expr::Call {
                        callee: Box::new(e),
                        lparen,
                        args,
                        commas,
                        rparen,
                    };
                }
                TokType::Dot => {
                    let dot = self.bump();
                    let name = self.expect(TokType::Ident, "member name")?;
                    e = Expr::Member {
                        base: Box::new(e),
                        dot,
                        name,
                    };
                }
                TokType::Arrow => {
                    let arrow = self.bump();
                    let name = self.expect(TokType::Ident, "member name")?;
                    e = Expr::Arrow {
                        base: Box::new(e),
                        arrow,
                        name,
                    };
                }
                TokType::Inc => {
                    let op_tok = self.bump();
                    e = Expr::Postfix {
                        op: crate::ast::PostfixOp::PostInc,
                        op_tok,
                        operand: Box::new(e),
                    };
                }
                TokType::Dec => {
                    let op_tok = self.bump();
                    e = Expr::Postfix {
                        op: crate::ast::PostfixOp::PostDec,
                        op_tok,
                        operand: Box::new(e),
                    };
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        match self.tt() {
            TokType::Number => Ok(Expr::IntLit { tok: self.bump() }),
            TokType::CharLit => Ok(Expr::CharLit { tok: self.bump() }),
            TokType::StringLit => {
                let mut parts = vec![self.bump()];
                while self.at(TokType::StringLit) {
                    parts.push(self.bump());
                }
                Ok(Expr::StringLit { parts })
            }
            TokType::Ident => Ok(Expr::Ident { tok: self.bump() }),
            TokType::LParen => {
                let lparen = self.bump();
                let inner = Box::new(self.parse_expr()?);
                let rparen = self.expect(TokType::RParen, "')'")?;
                Ok(Expr::Paren {
                    lparen,
                    inner,
                    rparen,
                })
            }
            _ => Err(self.err("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::pos::StrReader;
    use rstest::rstest;

    fn parse(src: &str) -> (Vec<Token<()>>, ) {
        let lexer = Lexer::new(StrReader::new("t.c", src), "t.c");
        (crate::parser::cursor::lex_all(lexer).unwrap(),)
    }

    /// The outermost declarator of a source's first top-level item, for
    /// asserting on declarator *shape* without resolving a full `CgType`.
    fn first_declarator(src: &str) -> Declarator {
        let (toks,) = parse(src);
        let mut p = Parser::new(&toks);
        let m = p.parse_module().unwrap();
        match &m.items[0] {
            TopLevel::Decl(d) => d.declarators[0].declarator.clone(),
            TopLevel::FunctionDef(f) => f.declarator.clone(),
        }
    }

    #[test]
    fn minimal_function() {
        let (toks,) = parse("int main(void) { return 0; }");
        let mut p = Parser::new(&toks);
        let m = p.parse_module().unwrap();
        assert_eq!(m.items.len(), 1);
        match &m.items[0] {
            TopLevel::FunctionDef(f) => {
                assert_eq!(f.declarator.ident_name(), Some("main"));
            }
            _ => panic!("expected function def"),
        }
    }

    #[test]
    fn typedef_and_pointer() {
        let (toks,) = parse("typedef int *ip; ip p;");
        let ident_is_type = std::cell::RefCell::new(std::collections::HashSet::<String>::new());
        ident_is_type.borrow_mut().insert("ip".to_string());
        let table = ident_is_type;
        let mut p = Parser::with_ident_is_type(&toks, move |name| table.borrow().contains(name));
        let m = p.parse_module().unwrap();
        assert_eq!(m.items.len(), 2);
    }

    fn shape(d: &Declarator) -> &'static str {
        match d {
            Declarator::Ident { .. } => "ident",
            Declarator::NoIdent { .. } => "noident",
            Declarator::Pointer { .. } => "pointer",
            Declarator::Parenthesized { .. } => "parenthesized",
            Declarator::Function { .. } => "function",
            Declarator::Array { .. } => "array",
        }
    }

    /// Table-driven check that the declarator grammar stacks `Pointer`/
    /// `Array`/`Function`/`Parenthesized` nodes in the order C's
    /// declarator-suffix precedence demands: `[]`/`()` bind to the
    /// identifier before an un-parenthesized leading `*` wraps around the
    /// result, so `int *a[3]` and `int (*a)[3]` end up with differently
    /// shaped (and, per `build_type`, differently typed) declarator trees.
    #[rstest]
    #[case::plain_ident("int a;", "ident")]
    #[case::pointer("int *a;", "pointer")]
    #[case::array("int a[3];", "array")]
    #[case::array_of_pointer("int *a[3];", "pointer")]
    #[case::pointer_to_array("int (*a)[3];", "array")]
    #[case::function("int f(void);", "function")]
    #[case::pointer_to_function("int (*f)(void);", "function")]
    #[case::function_returning_pointer("int *f(void);", "pointer")]
    #[case::parenthesized_ident("int (a);", "parenthesized")]
    fn declarator_outer_shape_matches_c_precedence(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(shape(&first_declarator(src)), expected);
    }

    #[test]
    fn struct_with_bitfields() {
        let (toks,) = parse("struct s { unsigned a:3; unsigned b:5; int c; };");
        let mut p = Parser::new(&toks);
        let m = p.parse_module().unwrap();
        match &m.items[0] {
            TopLevel::Decl(d) => match &d.specs.type_specs[0] {
                TypeSpec::Record(r) => assert_eq!(r.members.len(), 3),
                _ => panic!("expected record"),
            },
            _ => panic!("expected decl"),
        }
    }

    #[test]
    fn operator_precedence() {
        let (toks,) = parse("a + b * c;");
        let mut p = Parser::new(&toks);
        let e = p.parse_expr().unwrap();
        match e {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(op, crate::ast::BinOp::Add);
                assert!(matches!(*rhs, Expr::Binary { op: crate::ast::BinOp::Mul, .. }));
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn if_else_chain() {
        let (toks,) = parse("if (a) b; else if (c) d; else e;");
        let mut p = Parser::new(&toks);
        let s = p.parse_stmt().unwrap();
        assert!(matches!(s, Stmt::If { .. }));
    }

    #[test]
    fn sizeof_paren_ident_parses_as_sizeof_expr() {
        let (toks,) = parse("sizeof(x);");
        let mut p = Parser::new(&toks);
        let e = p.parse_expr().unwrap();
        assert!(matches!(e, Expr::SizeofExpr { .. }));
    }

    #[test]
    fn string_literal_concatenation() {
        let (toks,) = parse(r#""a" "b";"#);
        let mut p = Parser::new(&toks);
        let e = p.parse_expr().unwrap();
        match e {
            Expr::StringLit { parts } => assert_eq!(parts.len(), 2),
            _ => panic!("expected string lit"),
        }
    }
}
