//! Semantic analysis and the typed AST→IR lowering (§3, §4.3): nested
//! scopes and symbol tables, the CG type system, record/enum definitions,
//! usual arithmetic conversion, and the code generator itself.

pub mod codegen;
pub mod records;
pub mod scope;
pub mod types;
pub mod uac;

pub use codegen::{CgError, CodeGen};
pub use types::{CgType, ElementaryType};
