//! A project-wide view of module-level declarations.

use bal_analysis::{Name, SymbolKind, Visibility};
use bal_inputs::{File, ModulePath};
use bal_yellow::TextRange;
use camino::Utf8PathBuf;
use rustc_hash::FxHashMap;
use salsa::Database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSymbol {
    pub file: File,
    pub path: Utf8PathBuf,
    pub module: ModulePath,
    pub name: Name,
    pub kind: SymbolKind,
    pub visibility: Visibility,
    pub name_range: TextRange,
}

/// An immutable snapshot, published after every unit of the project has
/// been bound. A newer snapshot replaces it wholesale.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    symbols: Vec<ProjectSymbol>,
    by_name: FxHashMap<Name, Vec<usize>>,
}

impl ProjectIndex {
    pub(crate) fn build(db: &dyn Database, files: &[File]) -> Self {
        let mut index = Self::default();

        for &file in files {
            let bindings = crate::bind(db, file);
            let module_scope = bindings.module_scope();
            for (_, data) in bindings.symbols() {
                if data.scope != module_scope || data.kind == SymbolKind::Import {
                    continue;
                }
                index.by_name.entry(data.name.clone()).or_default().push(index.symbols.len());
                index.symbols.push(ProjectSymbol {
                    file,
                    path: file.path(db).clone(),
                    module: file.module(db).clone(),
                    name: data.name.clone(),
                    kind: data.kind,
                    visibility: data.visibility,
                    name_range: data.name_range,
                });
            }
        }

        tracing::debug!(units = files.len(), symbols = index.symbols.len(), "built project index");
        index
    }

    /// Every module-level symbol, grouped by unit in load order.
    pub fn symbols(&self) -> &[ProjectSymbol] {
        &self.symbols
    }

    pub fn lookup(&self, name: &str) -> impl Iterator<Item = &ProjectSymbol> {
        self.by_name
            .get(&Name::new(name))
            .into_iter()
            .flatten()
            .map(|&symbol| &self.symbols[symbol])
    }

    pub fn module_symbols<'a>(
        &'a self,
        module: &'a ModulePath,
    ) -> impl Iterator<Item = &'a ProjectSymbol> {
        self.symbols.iter().filter(move |symbol| &symbol.module == module)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
