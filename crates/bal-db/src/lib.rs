mod project;
mod workspace;

use std::sync::Arc;

use bal_analysis::{Bindings, ModuleExports, ModuleLookup, SymbolIndex, TypeCheck};
pub use bal_errors::Diagnostic;
use bal_inputs::{Cancellation, File, ModulePath};
use bal_parse::Parse;
use salsa::Database;

pub use project::{ProjectIndex, ProjectSymbol};
pub use workspace::{Outcome, UnitReport, Workspace, WorkspaceError};

#[salsa::db]
#[derive(Clone, Default)]
pub struct RootDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl Database for RootDatabase {}

/// The units taking part in cross-module resolution, in load order.
#[salsa::input(singleton, debug)]
pub struct Project {
    #[returns(ref)]
    pub files: Vec<File>,
}

/// Polls salsa's revision cancellation. A pending write unwinds the query
/// instead of producing a partial result.
struct Revision<'db>(&'db dyn Database);

impl Cancellation for Revision<'_> {
    fn is_cancelled(&self) -> bool {
        self.0.unwind_if_revision_cancelled();
        false
    }
}

/// Resolves imports against the units of the project. A module spread over
/// several units offers the union of their exports.
struct ProjectModules<'db> {
    db: &'db dyn Database,
}

impl ModuleLookup for ProjectModules<'_> {
    fn exports(&self, module: &ModulePath) -> Option<Arc<ModuleExports>> {
        let db = self.db;
        let project = Project::try_get(db)?;
        let mut units = project.files(db).iter().filter(|file| file.module(db).matches(module));

        let first = exports(db, *units.next()?);
        let mut rest = units.peekable();
        if rest.peek().is_none() {
            return Some(first.clone());
        }

        let mut merged = ModuleExports::clone(first);
        for &file in rest {
            merged.merge(exports(db, file));
        }
        Some(Arc::new(merged))
    }
}

#[salsa::tracked(returns(ref), no_eq)]
pub fn parse(db: &dyn Database, file: File) -> Parse {
    let _span = tracing::debug_span!("parse", path = %file.path(db)).entered();

    match file.tree(db) {
        Some(tree) => Parse::new(tree.green, tree.diagnostics),
        None => bal_parse::parse_with(file.text(db), &Revision(db)),
    }
}

/// Compares equal across edits that leave the module-level declarations
/// alone, so importers are not bound again.
#[salsa::tracked(returns(ref))]
pub fn exports(db: &dyn Database, file: File) -> Arc<ModuleExports> {
    Arc::new(ModuleExports::collect(&parse(db, file).module(), file.module(db)))
}

#[salsa::tracked(returns(ref), no_eq)]
pub fn bind(db: &dyn Database, file: File) -> Bindings {
    let _span = tracing::debug_span!("bind", path = %file.path(db)).entered();
    bal_analysis::bind(parse(db, file), &ProjectModules { db }, &Revision(db))
}

#[salsa::tracked(returns(ref), no_eq)]
pub fn check(db: &dyn Database, file: File) -> TypeCheck {
    let _span = tracing::debug_span!("check", path = %file.path(db)).entered();
    bal_analysis::check(parse(db, file), bind(db, file), &ProjectModules { db }, &Revision(db))
}

#[salsa::tracked(returns(ref), no_eq)]
pub fn symbol_index(db: &dyn Database, file: File) -> SymbolIndex {
    SymbolIndex::new(bind(db, file))
}

/// Parse, binding and type diagnostics of a unit, in that order.
#[salsa::tracked(returns(ref), no_eq)]
pub fn check_file(db: &dyn Database, file: File) -> Vec<Diagnostic> {
    let _span = tracing::debug_span!("check_file", path = %file.path(db)).entered();

    let mut diagnostics = parse(db, file).diagnostics().to_vec();
    diagnostics.extend_from_slice(bind(db, file).diagnostics());
    diagnostics.extend_from_slice(check(db, file).diagnostics());

    tracing::debug!(diagnostics = diagnostics.len(), "checked unit");
    diagnostics
}
