//! Recursive-descent parser for the textual IR format (§4.4).

use crate::ir::lexer::{IrKeyword, IrLexer, IrLexError, IrToken, IrTokType};
use crate::ir::model::*;
use crate::pos::{ByteReader, SourceRange};
use std::fmt;

#[derive(Debug)]
pub struct IrParseError {
    pub range: SourceRange,
    pub message: String,
}

impl fmt::Display for IrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.range, self.message)
    }
}
impl std::error::Error for IrParseError {}

pub type IrPResult<T> = Result<T, IrParseError>;

pub fn lex_all<R: ByteReader>(mut lexer: IrLexer<R>) -> Result<Vec<IrToken>, IrLexError> {
    let mut out = Vec::new();
    loop {
        let t = lexer.next_token()?;
        let eof = t.tok_type == IrTokType::Eof;
        out.push(t);
        if eof {
            break;
        }
    }
    Ok(out)
}

pub struct IrParser<'t> {
    toks: &'t [IrToken],
    pos: usize,
}

impl<'t> IrParser<'t> {
    pub fn new(toks: &'t [IrToken]) -> Self {
        let mut p = Self { toks, pos: 0 };
        p.skip_ignorable();
        p
    }

    fn skip_ignorable(&mut self) {
        while self.pos + 1 < self.toks.len() && self.toks[self.pos].tok_type.is_ignorable() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> &IrToken {
        &self.toks[self.pos]
    }

    fn bump(&mut self) -> IrToken {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        self.skip_ignorable();
        t
    }

    fn err(&self, message: impl Into<String>) -> IrParseError {
        let t = self.peek();
        IrParseError {
            range: SourceRange::new(t.begin_pos.clone(), t.end_pos.clone()),
            message: message.into(),
        }
    }

    fn at(&self, tt: IrTokType) -> bool {
        self.peek().tok_type == tt
    }

    fn eat(&mut self, tt: IrTokType) -> Option<IrToken> {
        if self.at(tt) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, tt: IrTokType, what: &str) -> IrPResult<IrToken> {
        if self.at(tt) {
            Ok(self.bump())
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self) -> IrPResult<String> {
        if self.at(IrTokType::Ident) {
            Ok(self.bump().text)
        } else {
            Err(self.err("expected an identifier"))
        }
    }

    pub fn parse_module(&mut self) -> IrPResult<IrModule> {
        let mut module = IrModule::new();
        while !self.at(IrTokType::Eof) {
            module.decls.push(self.parse_decl()?);
        }
        Ok(module)
    }

    fn parse_decl(&mut self) -> IrPResult<IrDecl> {
        match self.peek().tok_type {
            IrTokType::Kw(IrKeyword::Proc) => self.parse_proc().map(IrDecl::Proc),
            IrTokType::Kw(IrKeyword::Var) => self.parse_var().map(IrDecl::Var),
            IrTokType::Kw(IrKeyword::Record) | IrTokType::Kw(IrKeyword::Union) => {
                self.parse_record().map(IrDecl::Record)
            }
            _ => Err(self.err("expected 'proc', 'var', 'record', or 'union'")),
        }
    }

    fn parse_linkage(&mut self) -> Linkage {
        if self.eat(IrTokType::Kw(IrKeyword::Extern)).is_some() {
            Linkage::Extern
        } else if self.eat(IrTokType::Kw(IrKeyword::Global)).is_some() {
            Linkage::Global
        } else {
            Linkage::Default
        }
    }

    fn parse_proc(&mut self) -> IrPResult<IrProc> {
        self.bump(); // proc
        let ident = self.expect_ident()?;
        self.expect(IrTokType::LParen, "'('")?;
        let mut args = Vec::new();
        let mut variadic = false;
        if !self.at(IrTokType::RParen) {
            loop {
                if self.eat(IrTokType::Ellipsis).is_some() {
                    variadic = true;
                    break;
                }
                let name = self.expect_ident()?;
                self.expect(IrTokType::Colon, "':'")?;
                let ty = self.parse_texpr()?;
                args.push((name, ty));
                if self.eat(IrTokType::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(IrTokType::RParen, "')'")?;
        let _ = variadic;
        let ret = if self.eat(IrTokType::Colon).is_some() {
            Some(self.parse_texpr()?)
        } else {
            None
        };
        let mut attrs = Vec::new();
        if self.eat(IrTokType::Kw(IrKeyword::Attr)).is_some() {
            self.expect(IrTokType::LParen, "'('")?;
            attrs.push(self.expect_ident()?);
            while self.eat(IrTokType::Comma).is_some() {
                attrs.push(self.expect_ident()?);
            }
            self.expect(IrTokType::RParen, "')'")?;
        }
        let linkage = self.parse_linkage();
        let mut locals = Vec::new();
        if self.eat(IrTokType::Kw(IrKeyword::Lvar)).is_some() {
            while self.at(IrTokType::Ident) {
                let name = self.expect_ident()?;
                self.expect(IrTokType::Colon, "':'")?;
                let ty = self.parse_texpr()?;
                self.expect(IrTokType::Semicolon, "';'")?;
                locals.push((name, ty));
            }
        }
        let body = if self.eat(IrTokType::Kw(IrKeyword::Begin)).is_some() {
            let lblock = self.parse_lblock()?;
            self.expect(IrTokType::Kw(IrKeyword::End), "'end'")?;
            Some(lblock)
        } else {
            None
        };
        self.expect(IrTokType::Semicolon, "';'")?;
        Ok(IrProc {
            ident,
            args,
            ret,
            attrs,
            linkage,
            locals,
            body,
        })
    }

    fn parse_var(&mut self) -> IrPResult<IrVar> {
        self.bump(); // var
        let ident = self.expect_ident()?;
        self.expect(IrTokType::Colon, "':'")?;
        let ty = self.parse_texpr()?;
        let linkage = self.parse_linkage();
        self.expect(IrTokType::Kw(IrKeyword::Begin), "'begin'")?;
        let dblock = self.parse_dblock()?;
        self.expect(IrTokType::Kw(IrKeyword::End), "'end'")?;
        self.expect(IrTokType::Semicolon, "';'")?;
        Ok(IrVar {
            ident,
            ty,
            linkage,
            dblock,
        })
    }

    fn parse_record(&mut self) -> IrPResult<IrRecordDef> {
        let is_union = self.at(IrTokType::Kw(IrKeyword::Union));
        self.bump();
        let ident = self.expect_ident()?;
        self.expect(IrTokType::Kw(IrKeyword::Begin), "'begin'")?;
        let mut members = Vec::new();
        while self.at(IrTokType::Ident) {
            let name = self.expect_ident()?;
            self.expect(IrTokType::Colon, "':'")?;
            let ty = self.parse_texpr()?;
            self.expect(IrTokType::Semicolon, "';'")?;
            members.push((name, ty));
        }
        self.expect(IrTokType::Kw(IrKeyword::End), "'end'")?;
        self.expect(IrTokType::Semicolon, "';'")?;
        Ok(IrRecordDef {
            ident,
            is_union,
            members,
        })
    }

    fn parse_texpr(&mut self) -> IrPResult<TypeExpr> {
        if self.eat(IrTokType::Kw(IrKeyword::Int)).is_some() {
            self.expect(IrTokType::Dot, "'.'")?;
            let n = self.expect_number()?;
            return Ok(TypeExpr::Int(n as u32));
        }
        if self.eat(IrTokType::Kw(IrKeyword::Ptr)).is_some() {
            self.expect(IrTokType::Dot, "'.'")?;
            let n = self.expect_number()?;
            return Ok(TypeExpr::Ptr(n as u32));
        }
        let ident = self.expect_ident()?;
        Ok(TypeExpr::Ident(ident))
    }

    fn expect_number(&mut self) -> IrPResult<i64> {
        if self.at(IrTokType::Number) {
            let t = self.bump();
            t.text.parse().map_err(|_| IrParseError {
                range: SourceRange::new(t.begin_pos.clone(), t.end_pos.clone()),
                message: "invalid integer literal".to_string(),
            })
        } else {
            Err(self.err("expected an integer literal"))
        }
    }

    fn parse_lblock(&mut self) -> IrPResult<LBlock> {
        let mut entries = Vec::new();
        loop {
            if self.at(IrTokType::Kw(IrKeyword::End)) {
                break;
            }
            let label = if self.at(IrTokType::Ident) && self.toks[self.next_grammar_index()].tok_type == IrTokType::Colon
            {
                let name = self.expect_ident()?;
                self.expect(IrTokType::Colon, "':'")?;
                Some(name)
            } else {
                None
            };
            let instr = if self.at(IrTokType::Kw(IrKeyword::End)) || self.at(IrTokType::Eof) {
                None
            } else if matches!(self.peek().tok_type, IrTokType::Kw(IrKeyword::Op(_))) {
                Some(self.parse_instr()?)
            } else {
                None
            };
            if label.is_none() && instr.is_none() {
                break;
            }
            entries.push(LEntry { label, instr });
        }
        Ok(entries)
    }

    /// Index of the first non-ignorable token after the current one,
    /// used to look one grammar token ahead for the `IDENT ':'` label
    /// lookahead without disturbing `self.pos`.
    fn next_grammar_index(&self) -> usize {
        let mut i = self.pos + 1;
        while i + 1 < self.toks.len() && self.toks[i].tok_type.is_ignorable() {
            i += 1;
        }
        i.min(self.toks.len() - 1)
    }

    fn parse_instr(&mut self) -> IrPResult<Instr> {
        let op = match self.bump().tok_type {
            IrTokType::Kw(IrKeyword::Op(op)) => op,
            _ => unreachable!("caller checked this is an op keyword"),
        };
        let width_bits = if self.eat(IrTokType::Dot).is_some() {
            self.expect_number()? as u32
        } else {
            0
        };
        let mut operands = Vec::new();
        if !self.at(IrTokType::Semicolon) {
            operands.push(self.parse_operand()?);
            while self.eat(IrTokType::Comma).is_some() {
                operands.push(self.parse_operand()?);
            }
        }
        self.expect(IrTokType::Semicolon, "';'")?;
        let mut it = operands.into_iter();
        Ok(Instr {
            op,
            width_bits,
            dest: it.next(),
            op1: it.next(),
            op2: it.next(),
            type_operand: None,
        })
    }

    fn parse_operand(&mut self) -> IrPResult<Operand> {
        if self.eat(IrTokType::Kw(IrKeyword::Nil)).is_some() {
            return Ok(Operand::Nil);
        }
        if self.at(IrTokType::Number) {
            let t = self.bump();
            let v: i64 = t.text.parse().map_err(|_| IrParseError {
                range: SourceRange::new(t.begin_pos.clone(), t.end_pos.clone()),
                message: "invalid integer literal".to_string(),
            })?;
            return Ok(Operand::Immediate(v));
        }
        if self.at(IrTokType::Ident) {
            return Ok(Operand::Variable(self.bump().text));
        }
        if self.at(IrTokType::LBrace) {
            self.bump();
            let mut items = Vec::new();
            if !self.at(IrTokType::RBrace) {
                items.push(self.parse_operand()?);
                while self.eat(IrTokType::Comma).is_some() {
                    items.push(self.parse_operand()?);
                }
            }
            self.expect(IrTokType::RBrace, "'}'")?;
            return Ok(Operand::List(items));
        }
        Err(self.err("expected an operand"))
    }

    fn parse_dblock(&mut self) -> IrPResult<DBlock> {
        let mut entries = Vec::new();
        while matches!(self.peek().tok_type, IrTokType::Kw(IrKeyword::Int) | IrTokType::Kw(IrKeyword::Ptr)) {
            if self.eat(IrTokType::Kw(IrKeyword::Int)).is_some() {
                self.expect(IrTokType::Dot, "'.'")?;
                let width_bits = self.expect_number()? as u32;
                let value = self.expect_number()?;
                self.expect(IrTokType::Semicolon, "';'")?;
                entries.push(DataEntry::Int { width_bits, value });
            } else {
                self.bump(); // ptr
                self.expect(IrTokType::Dot, "'.'")?;
                let width_bits = self.expect_number()? as u32;
                let symbol = self.expect_ident()?;
                self.expect(IrTokType::Comma, "','")?;
                let offset = self.expect_number()?;
                self.expect(IrTokType::Semicolon, "';'")?;
                entries.push(DataEntry::Ptr {
                    width_bits,
                    symbol,
                    offset,
                });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::lexer::IrLexer;
    use crate::pos::StrReader;

    fn parse(src: &str) -> IrModule {
        let lexer = IrLexer::new(StrReader::new("t.ir", src), "t.ir");
        let toks = lex_all(lexer).unwrap();
        IrParser::new(&toks).parse_module().unwrap()
    }

    #[test]
    fn parses_add_proc() {
        let m = parse(
            "proc @add(%0:int.16,%1:int.16):int.16 begin add.16 %2,%0,%1; retv.16 %2; end;",
        );
        assert_eq!(m.decls.len(), 1);
        match &m.decls[0] {
            IrDecl::Proc(p) => {
                assert_eq!(p.ident, "@add");
                assert_eq!(p.args.len(), 2);
                let body = p.body.as_ref().unwrap();
                assert_eq!(body.len(), 2);
            }
            _ => panic!("expected proc"),
        }
    }

    #[test]
    fn parses_var_with_data_block() {
        let m = parse("var @p : ptr.16 begin int.16 0; end;");
        match &m.decls[0] {
            IrDecl::Var(v) => assert_eq!(v.dblock.len(), 1),
            _ => panic!("expected var"),
        }
    }
}
