//! The generic three-address IR: data model plus its textual codec
//! (lexer, parser, pretty-printer) used for round-trip testing and for
//! reading externally authored IR modules (§3, §4.4).

pub mod lexer;
pub mod model;
pub mod parser;
pub mod printer;

pub use model::{IrDecl, IrModule, IrProc, IrRecordDef, IrVar, Linkage, Op, Operand, TypeExpr};
pub use printer::print_module;
