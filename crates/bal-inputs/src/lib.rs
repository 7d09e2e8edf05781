mod cancel;
mod edit;
mod module_path;

use bal_errors::Diagnostic;
use bal_yellow::GreenNode;
pub use cancel::{Cancellation, CancellationFlag, NeverCancel};
pub use edit::TextEdit;
pub use line_index::{LineCol, LineIndex};
pub use module_path::ModulePath;

/// A tree parsed ahead of time, with the diagnostics found while parsing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxTree {
    pub green: GreenNode,
    pub diagnostics: Vec<Diagnostic>,
}

/// One compilation unit: a source file and the module it belongs to.
///
/// `tree` lets a caller hand over a tree it already parsed for exactly this
/// text, e.g. after an incremental reparse.
#[salsa::input(debug)]
pub struct File {
    #[returns(ref)]
    pub path: camino::Utf8PathBuf,
    #[returns(ref)]
    pub module: ModulePath,
    #[returns(deref)]
    pub text: String,
    pub tree: Option<SyntaxTree>,
}

#[salsa::tracked]
impl File {
    #[salsa::tracked(returns(ref), no_eq)]
    pub fn line_index(self, db: &dyn salsa::Database) -> LineIndex {
        LineIndex::new(self.text(db))
    }
}
