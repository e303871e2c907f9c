//! External interfaces only (§1 names Z80 code generation and the
//! checker's stylistic rules as out of scope). This module defines the
//! trait surface a real backend would implement against and ships a
//! pass-through stub so `syc` stays runnable end to end.

use crate::ir::model::IrModule;
use crate::ir::print_module;
use std::fmt;

/// Opaque assembly text. A real backend would build this from selected
/// instructions; the stub backend builds it from the IR pretty printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asm(String);

impl Asm {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub enum BackendError {
    Unsupported(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unsupported(msg) => write!(f, "backend: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Lowers an IR module to Z80 assembly text. The only implementor in
/// this crate is [`StubBackend`]; a real instruction selector is outside
/// the scope this crate covers.
pub trait InstrSelect {
    fn select(&self, module: &IrModule) -> Result<Asm, BackendError>;
}

/// Named as documentation of the seam a real backend would need: mapping
/// IR temporaries onto the Z80's register file (`A`, `BC`, `DE`, `HL`,
/// the shadow set, `IX`/`IY`) and spilling the rest to memory. No
/// implementation ships here.
pub trait RegisterAllocator {
    fn allocate(&self, module: &IrModule);
}

/// Emits a comment header plus the IR pretty-printed as `; ir:` comment
/// lines. Never claims to produce runnable Z80 machine code.
#[derive(Debug, Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InstrSelect for StubBackend {
    fn select(&self, module: &IrModule) -> Result<Asm, BackendError> {
        let mut out = String::new();
        out.push_str("; stub backend: no instruction selection performed\n");
        out.push_str("; the lines below are the IR module, not Z80 assembly\n");
        for line in print_module(module).lines() {
            out.push_str("; ir: ");
            out.push_str(line);
            out.push('\n');
        }
        Ok(Asm(out))
    }
}

/// One checker finding: a location and a message, the smallest interface
/// a style rule needs to report through.
#[derive(Debug, Clone)]
pub struct Finding {
    pub range: crate::pos::SourceRange,
    pub message: String,
}

/// A single stylistic rule, given the raw token stream (so it can see
/// whitespace/comments the AST drops) and the parsed module (so it can
/// see structure). `ccheck` ships zero built-in rules; real rules are a
/// separate concern this crate only defines the contract for.
pub trait StyleRule {
    fn check(&self, toks: &[crate::lexer::token::Token<()>], module: &crate::ast::Module) -> Vec<Finding>;
}

/// An empty rule registry. `ccheck --fix` against this is a no-op
/// pass-through copy, matching the out-of-scope boundary in §1.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn StyleRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn run(&self, toks: &[crate::lexer::token::Token<()>], module: &crate::ast::Module) -> Vec<Finding> {
        self.rules.iter().flat_map(|r| r.check(toks, module)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{IrDecl, IrProc, Linkage};

    #[test]
    fn stub_backend_wraps_ir_as_comments() {
        let module = IrModule {
            decls: vec![IrDecl::Proc(IrProc {
                ident: "@main".to_string(),
                args: vec![],
                ret: None,
                attrs: vec![],
                linkage: Linkage::Global,
                locals: vec![],
                body: None,
            })],
        };
        let asm = StubBackend::new().select(&module).unwrap();
        assert!(asm.as_str().contains("; ir: proc @main()"));
    }

    #[test]
    fn empty_rule_registry_finds_nothing() {
        let registry = RuleRegistry::new();
        let module = crate::ast::Module::new();
        assert!(registry.run(&[], &module).is_empty());
    }
}
