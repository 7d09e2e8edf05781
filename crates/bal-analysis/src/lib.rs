//! Name binding and type checking of Ballerina compilation units.

mod arena;
mod binder;
mod check;
mod env;
mod exports;
mod index;
mod lower;
mod name;
mod scope;
mod ty;

#[cfg(test)]
mod tests;

use bal_errors::Diagnostic;
use bal_inputs::Cancellation;
use bal_parse::{Parse, Status};

pub use arena::Idx;
pub use binder::{Bindings, bind};
pub use check::{TypeCheck, check};
pub use env::{RecordParts, TypeEnv};
pub use exports::{ExportedSymbol, ModuleExports, ModuleLookup, NoModules};
pub use index::SymbolIndex;
pub use name::Name;
pub use scope::{
    ExternalSymbol, Mutability, Namespace, Resolution, ScopeData, ScopeId, ScopeKind, SymbolData,
    SymbolId, SymbolKind, Target, Visibility,
};
pub use ty::{
    Field, FunctionTy, Method, ObjectTy, ParamTy, Primitive, RecordTy, Ty, TyKind, TypeName,
    UnionTy,
};

/// Everything known about a single unit after analysis.
#[derive(Debug)]
pub struct Analysis {
    pub parse: Parse,
    pub bindings: Bindings,
    pub check: TypeCheck,
    pub index: SymbolIndex,
}

impl Analysis {
    /// Parse, binding and type diagnostics, in that order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.parse
            .diagnostics()
            .iter()
            .chain(self.bindings.diagnostics())
            .chain(self.check.diagnostics())
    }

    pub fn status(&self) -> Status {
        match (self.parse.status(), self.bindings.status(), self.check.status()) {
            (Status::Complete, Status::Complete, Status::Complete) => Status::Complete,
            _ => Status::Cancelled,
        }
    }
}

/// Parses, binds and checks `text` in one go.
pub fn analyze(text: &str, lookup: &dyn ModuleLookup, cancellation: &dyn Cancellation) -> Analysis {
    let parse = bal_parse::parse_with(text, cancellation);
    let bindings = bind(&parse, lookup, cancellation);
    let check = check(&parse, &bindings, lookup, cancellation);
    let index = SymbolIndex::new(&bindings);
    Analysis { parse, bindings, check, index }
}
