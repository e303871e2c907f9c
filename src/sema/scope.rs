//! Nested scopes, the per-procedure label table, and the module-level
//! symbol index (§3).

use crate::ast::tokens::AstTok;
use crate::sema::types::CgType;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    GlobalSymbol,
    Argument,
    LocalVariable,
    Typedef,
    Record,
    Enum,
    EnumConstant,
}

#[derive(Debug, Clone)]
pub struct ScopeMember {
    pub ty: CgType,
    pub kind: SymbolKind,
    pub used: bool,
    pub def_tok: AstTok,
    /// The IR-level slot this symbol was lowered to: `@name` for a global,
    /// `%N` for a local/parameter/temporary. Typedef/record/enum tags
    /// carry no slot and leave this empty.
    pub ir_name: String,
}

#[derive(Debug)]
pub struct DuplicateError {
    pub name: String,
}

/// A chain of nested identifier tables. Lookup walks from the innermost
/// scope outward; shadowing across scopes is permitted, but inserting an
/// already-present name into the *same* scope fails.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, ScopeMember>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the module scope");
        self.scopes.pop();
    }

    pub fn insert(&mut self, name: impl Into<String>, member: ScopeMember) -> Result<(), DuplicateError> {
        let name = name.into();
        let top = self.scopes.last_mut().expect("scope stack is never empty");
        if top.contains_key(&name) {
            return Err(DuplicateError { name });
        }
        top.insert(name, member);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ScopeMember> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut ScopeMember> {
        self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name))
    }

    pub fn is_type_ident(&self, name: &str) -> bool {
        matches!(
            self.lookup(name),
            Some(ScopeMember {
                kind: SymbolKind::Typedef,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Default,
    Global,
    Extern,
}

/// Monotone symbol state: flags only ever move from `false` to `true`, so
/// a symbol may be upgraded (e.g. declared → defined) but never demoted.
#[derive(Debug, Clone, Default)]
pub struct SymbolRecord {
    pub declared: bool,
    pub defined: bool,
    pub is_extern: bool,
    pub used: bool,
    pub tok: Option<AstTok>,
    pub linkage: Option<Linkage>,
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    entries: HashMap<String, SymbolRecord>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&SymbolRecord> {
        self.entries.get(name)
    }

    pub fn declare(&mut self, name: impl Into<String>, tok: AstTok, linkage: Linkage) {
        let e = self.entries.entry(name.into()).or_default();
        e.declared = true;
        e.tok.get_or_insert(tok);
        e.linkage.get_or_insert(linkage);
        if linkage == Linkage::Extern {
            e.is_extern = true;
        }
    }

    pub fn define(&mut self, name: impl Into<String>, tok: AstTok, linkage: Linkage) {
        let e = self.entries.entry(name.into()).or_default();
        e.declared = true;
        e.defined = true;
        e.tok.get_or_insert(tok);
        e.linkage.get_or_insert(linkage);
    }

    pub fn mark_used(&mut self, name: &str) {
        if let Some(e) = self.entries.get_mut(name) {
            e.used = true;
        }
    }
}

/// Per-procedure goto-label table. A label may be used before it is
/// defined; inserting a definition twice for the same name fails.
#[derive(Debug, Default)]
pub struct LabelTable {
    labels: HashMap<String, LabelEntry>,
}

#[derive(Debug, Clone, Default)]
struct LabelEntry {
    defined: bool,
    used: bool,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str) -> Result<(), DuplicateError> {
        let e = self.labels.entry(name.to_string()).or_default();
        if e.defined {
            return Err(DuplicateError {
                name: name.to_string(),
            });
        }
        e.defined = true;
        Ok(())
    }

    pub fn mark_used(&mut self, name: &str) {
        self.labels.entry(name.to_string()).or_default().used = true;
    }

    /// Labels that were referenced by `goto` but never defined in this
    /// procedure — the code generator reports one error per entry.
    pub fn undefined_uses(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, e)| e.used && !e.defined)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::tokens::from_lexer;
    use crate::lexer::{Lexer, Token as RawToken};
    use crate::pos::StrReader;

    fn dummy_tok() -> AstTok {
        let mut lexer = Lexer::new(StrReader::new("t.c", "x"), "t.c");
        let tok: RawToken<()> = lexer.next_token().expect("lex one token");
        from_lexer(tok)
    }

    fn member(ty: CgType, kind: SymbolKind) -> ScopeMember {
        ScopeMember {
            ty,
            kind,
            used: false,
            def_tok: dummy_tok(),
            ir_name: String::new(),
        }
    }

    #[test]
    fn lookup_finds_innermost_shadowing_binding() {
        let mut scopes = ScopeStack::new();
        scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Int), SymbolKind::GlobalSymbol))
            .unwrap();
        scopes.push();
        scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Char), SymbolKind::LocalVariable))
            .unwrap();

        let found = scopes.lookup("x").unwrap();
        assert_eq!(found.kind, SymbolKind::LocalVariable);

        scopes.pop();
        let found = scopes.lookup("x").unwrap();
        assert_eq!(found.kind, SymbolKind::GlobalSymbol);
    }

    #[test]
    fn inserting_a_duplicate_in_the_same_scope_fails() {
        let mut scopes = ScopeStack::new();
        scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Int), SymbolKind::GlobalSymbol))
            .unwrap();
        let err = scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Int), SymbolKind::GlobalSymbol))
            .unwrap_err();
        assert_eq!(err.name, "x");
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut scopes = ScopeStack::new();
        scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Int), SymbolKind::GlobalSymbol))
            .unwrap();
        scopes.push();
        assert!(scopes
            .insert("x", member(CgType::Basic(crate::sema::types::ElementaryType::Int), SymbolKind::LocalVariable))
            .is_ok());
    }

    #[test]
    fn label_defined_twice_is_rejected_but_goto_before_definition_is_fine() {
        let mut labels = LabelTable::new();
        labels.mark_used("done");
        assert_eq!(labels.undefined_uses(), vec!["done"]);
        labels.define("done").unwrap();
        assert!(labels.undefined_uses().is_empty());
        assert!(labels.define("done").is_err());
    }

    #[test]
    fn symbol_index_state_only_ever_upgrades() {
        let mut idx = SymbolIndex::new();
        let tok = dummy_tok();
        idx.declare("f", tok.clone(), Linkage::Extern);
        assert!(idx.get("f").unwrap().declared);
        assert!(!idx.get("f").unwrap().defined);

        idx.define("f", tok, Linkage::Default);
        let rec = idx.get("f").unwrap();
        assert!(rec.declared);
        assert!(rec.defined);
        assert!(rec.is_extern, "first-seen linkage (extern) must stick");
    }
}
