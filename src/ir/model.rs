//! The IR data model: declarations, labeled/data blocks, instructions,
//! operands, and type expressions (§3).
//!
//! Deliberately self-contained from [`crate::sema`] — the textual codec
//! in [`crate::ir::lexer`]/[`crate::ir::parser`]/[`crate::ir::printer`]
//! round-trips this model on its own, independent of the C frontend that
//! happens to produce it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Default,
    Global,
    Extern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Int(u32),
    Ptr(u32),
    Array(u64, Box<TypeExpr>),
    Ident(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Immediate(i64),
    Variable(String),
    List(Vec<Operand>),
    Nil,
}

/// The full IR opcode set, taken as the superset across coexisting
/// variants per the Design Notes' Open Question (i).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    And,
    Bnot,
    Call,
    Calli,
    Copy,
    Eq,
    Gt,
    Gtu,
    Gteq,
    Gteu,
    Imm,
    Jmp,
    Jnz,
    Jz,
    Lt,
    Ltu,
    Lteq,
    Lteu,
    Lvarptr,
    Mul,
    Neg,
    Neq,
    Nop,
    Or,
    Ptridx,
    Read,
    Reccopy,
    Ret,
    Retv,
    Sdiv,
    Sgnext,
    Shl,
    Shra,
    Shrl,
    Smod,
    Sub,
    Trunc,
    Udiv,
    Umod,
    Varptr,
    Write,
    Xor,
    Zrext,
}

impl Op {
    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            Add => "add",
            And => "and",
            Bnot => "bnot",
            Call => "call",
            Calli => "calli",
            Copy => "copy",
            Eq => "eq",
            Gt => "gt",
            Gtu => "gtu",
            Gteq => "gteq",
            Gteu => "gteu",
            Imm => "imm",
            Jmp => "jmp",
            Jnz => "jnz",
            Jz => "jz",
            Lt => "lt",
            Ltu => "ltu",
            Lteq => "lteq",
            Lteu => "lteu",
            Lvarptr => "lvarptr",
            Mul => "mul",
            Neg => "neg",
            Neq => "neq",
            Nop => "nop",
            Or => "or",
            Ptridx => "ptridx",
            Read => "read",
            Reccopy => "reccopy",
            Ret => "ret",
            Retv => "retv",
            Sdiv => "sdiv",
            Sgnext => "sgnext",
            Shl => "shl",
            Shra => "shra",
            Shrl => "shrl",
            Smod => "smod",
            Sub => "sub",
            Trunc => "trunc",
            Udiv => "udiv",
            Umod => "umod",
            Varptr => "varptr",
            Write => "write",
            Xor => "xor",
            Zrext => "zrext",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Op> {
        use Op::*;
        Some(match s {
            "add" => Add,
            "and" => And,
            "bnot" => Bnot,
            "call" => Call,
            "calli" => Calli,
            "copy" => Copy,
            "eq" => Eq,
            "gt" => Gt,
            "gtu" => Gtu,
            "gteq" => Gteq,
            "gteu" => Gteu,
            "imm" => Imm,
            "jmp" => Jmp,
            "jnz" => Jnz,
            "jz" => Jz,
            "lt" => Lt,
            "ltu" => Ltu,
            "lteq" => Lteq,
            "lteu" => Lteu,
            "lvarptr" => Lvarptr,
            "mul" => Mul,
            "neg" => Neg,
            "neq" => Neq,
            "nop" => Nop,
            "or" => Or,
            "ptridx" => Ptridx,
            "read" => Read,
            "reccopy" => Reccopy,
            "ret" => Ret,
            "retv" => Retv,
            "sdiv" => Sdiv,
            "sgnext" => Sgnext,
            "shl" => Shl,
            "shra" => Shra,
            "shrl" => Shrl,
            "smod" => Smod,
            "sub" => Sub,
            "trunc" => Trunc,
            "udiv" => Udiv,
            "umod" => Umod,
            "varptr" => Varptr,
            "write" => Write,
            "xor" => Xor,
            "zrext" => Zrext,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub op: Op,
    pub width_bits: u32,
    pub dest: Option<Operand>,
    pub op1: Option<Operand>,
    pub op2: Option<Operand>,
    pub type_operand: Option<TypeExpr>,
}

impl Instr {
    pub fn operands(&self) -> Vec<&Operand> {
        [&self.dest, &self.op1, &self.op2]
            .into_iter()
            .filter_map(|o| o.as_ref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LEntry {
    pub label: Option<String>,
    pub instr: Option<Instr>,
}

pub type LBlock = Vec<LEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEntry {
    Int { width_bits: u32, value: i64 },
    Ptr { width_bits: u32, symbol: String, offset: i64 },
}

pub type DBlock = Vec<DataEntry>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrVar {
    pub ident: String,
    pub ty: TypeExpr,
    pub linkage: Linkage,
    pub dblock: DBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrProc {
    pub ident: String,
    pub args: Vec<(String, TypeExpr)>,
    pub ret: Option<TypeExpr>,
    pub attrs: Vec<String>,
    pub linkage: Linkage,
    pub locals: Vec<(String, TypeExpr)>,
    pub body: Option<LBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrRecordDef {
    pub ident: String,
    pub is_union: bool,
    pub members: Vec<(String, TypeExpr)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrDecl {
    Var(IrVar),
    Proc(IrProc),
    Record(IrRecordDef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrModule {
    pub decls: Vec<IrDecl>,
}

impl IrModule {
    pub fn new() -> Self {
        Self::default()
    }
}
