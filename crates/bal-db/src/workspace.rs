//! Loading units and checking them in parallel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bal_errors::Diagnostic;
use bal_inputs::{Cancellation as _, CancellationFlag, File, ModulePath, SyntaxTree, TextEdit};
use camino::{Utf8Path, Utf8PathBuf};
use crossbeam_channel::Receiver;
use rustc_hash::FxHashMap;
use salsa::Setter as _;

use crate::{Project, ProjectIndex, RootDatabase, check_file, parse};

/// Stack size of checking workers. Syntax trees are bounded in depth, but
/// the walks over them recurse once per level.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("unknown file `{0}`")]
    UnknownFile(Utf8PathBuf),
    #[error("failed to read `{path}`")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid thread count {0}: at least one thread is needed")]
    InvalidThreadCount(usize),
    #[error("the edit does not fit the text of `{0}`")]
    InvalidEdit(Utf8PathBuf),
    #[error("failed to spawn a checking worker")]
    Spawn(#[source] std::io::Error),
    #[error("a checking worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Checked(Vec<Diagnostic>),
    /// The unit was not checked, or its check was abandoned.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub file: File,
    pub path: Utf8PathBuf,
    pub outcome: Outcome,
}

impl UnitReport {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match &self.outcome {
            Outcome::Checked(diagnostics) => diagnostics,
            Outcome::Cancelled => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == Outcome::Cancelled
    }
}

/// The units of a project together with the database that analyzes them.
#[derive(Default)]
pub struct Workspace {
    db: RootDatabase,
    files: FxHashMap<Utf8PathBuf, File>,
    index: Arc<ProjectIndex>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn db(&self) -> &RootDatabase {
        &self.db
    }

    /// The loaded units, in load order.
    pub fn files(&self) -> &[File] {
        Project::try_get(&self.db).map_or(&[], |project| project.files(&self.db).as_slice())
    }

    pub fn file(&self, path: &Utf8Path) -> Result<File, WorkspaceError> {
        self.files.get(path).copied().ok_or_else(|| WorkspaceError::UnknownFile(path.to_owned()))
    }

    /// Adds a unit, or replaces the module and text of a loaded one.
    pub fn add_file(
        &mut self,
        path: impl Into<Utf8PathBuf>,
        module: ModulePath,
        text: impl Into<String>,
    ) -> File {
        let path = path.into();
        let text = text.into();

        if let Some(&file) = self.files.get(&path) {
            file.set_module(&mut self.db).to(module);
            file.set_text(&mut self.db).to(text);
            file.set_tree(&mut self.db).to(None);
            return file;
        }

        let file = File::new(&self.db, path.clone(), module, text, None);
        self.files.insert(path, file);

        let mut files = self.files().to_vec();
        files.push(file);
        match Project::try_get(&self.db) {
            Some(project) => {
                project.set_files(&mut self.db).to(files);
            }
            None => {
                Project::new(&self.db, files);
            }
        }
        file
    }

    /// Reads a unit from disk. Its module is named after the file stem.
    pub fn load(&mut self, path: &Utf8Path) -> Result<File, WorkspaceError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| WorkspaceError::Unreadable { path: path.to_owned(), source })?;
        let names = path.file_stem().into_iter().map(str::to_owned).collect();
        Ok(self.add_file(path, ModulePath::new(None, names), text))
    }

    pub fn set_text(&mut self, path: &Utf8Path, text: impl Into<String>) -> Result<(), WorkspaceError> {
        let file = self.file(path)?;
        file.set_text(&mut self.db).to(text.into());
        file.set_tree(&mut self.db).to(None);
        Ok(())
    }

    /// Applies `edit` to a unit, handing the database a tree reparsed from
    /// the previous one.
    pub fn apply_edit(&mut self, path: &Utf8Path, edit: &TextEdit) -> Result<(), WorkspaceError> {
        let file = self.file(path)?;
        let text = edit
            .apply(file.text(&self.db))
            .ok_or_else(|| WorkspaceError::InvalidEdit(path.to_owned()))?;
        let tree = parse(&self.db, file).reparse(edit).map(|parse| {
            let (green, diagnostics) = parse.into_parts();
            SyntaxTree { green, diagnostics }
        });

        file.set_text(&mut self.db).to(text);
        file.set_tree(&mut self.db).to(tree);
        Ok(())
    }

    /// The latest snapshot published by [`Workspace::check_all`].
    pub fn index(&self) -> Arc<ProjectIndex> {
        Arc::clone(&self.index)
    }

    /// Checks every unit on `threads` workers, each with its own handle to
    /// the database. Units not started before `cancellation` fires, and
    /// units abandoned by salsa, are reported as cancelled.
    pub fn check_all(
        &mut self,
        threads: usize,
        cancellation: &CancellationFlag,
    ) -> Result<Vec<UnitReport>, WorkspaceError> {
        if threads == 0 {
            return Err(WorkspaceError::InvalidThreadCount(threads));
        }
        let files = self.files().to_vec();
        let _span = tracing::debug_span!("check_all", units = files.len(), threads).entered();

        let (sender, receiver) = crossbeam_channel::unbounded();
        for job in files.iter().copied().enumerate() {
            if sender.send(job).is_err() {
                break;
            }
        }
        drop(sender);

        let mut outcomes = vec![None; files.len()];
        std::thread::scope(|scope| {
            let workers = (0..threads.min(files.len()))
                .map(|worker| {
                    let db = self.db.clone();
                    let receiver = receiver.clone();
                    std::thread::Builder::new()
                        .name(format!("bal-check-{worker}"))
                        .stack_size(WORKER_STACK_SIZE)
                        .spawn_scoped(scope, move || run_worker(worker, &db, &receiver, cancellation))
                        .map_err(WorkspaceError::Spawn)
                })
                .collect::<Result<Vec<_>, _>>()?;

            for worker in workers {
                let Ok(done) = worker.join() else {
                    return Err(WorkspaceError::WorkerPanicked);
                };
                for (slot, outcome) in done {
                    outcomes[slot] = Some(outcome);
                }
            }
            Ok::<_, WorkspaceError>(())
        })?;

        let reports: Vec<_> = files
            .iter()
            .zip(outcomes)
            .map(|(&file, outcome)| UnitReport {
                file,
                path: file.path(&self.db).clone(),
                outcome: outcome.unwrap_or(Outcome::Cancelled),
            })
            .collect();

        let cancelled = reports.iter().filter(|report| report.is_cancelled()).count();
        if cancelled == 0 {
            self.index = Arc::new(ProjectIndex::build(&self.db, &files));
        }
        tracing::debug!(checked = reports.len() - cancelled, cancelled, "checked workspace");
        Ok(reports)
    }
}

fn run_worker(
    worker: usize,
    db: &RootDatabase,
    queue: &Receiver<(usize, File)>,
    cancellation: &CancellationFlag,
) -> Vec<(usize, Outcome)> {
    let _span = tracing::debug_span!("worker", worker).entered();

    queue
        .iter()
        .map(|(slot, file)| {
            if cancellation.is_cancelled() {
                return (slot, Outcome::Cancelled);
            }
            let outcome = salsa::Cancelled::catch(AssertUnwindSafe(|| check_file(db, file).clone()))
                .map_or(Outcome::Cancelled, Outcome::Checked);
            (slot, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEO: &str = "public type Point record { int x; int y; };\n\
                       public function origin() returns Point { return { x: 0, y: 0 }; }\n";
    const APP: &str = "import geo;\n\
                       function main() { geo:Point p = geo:origin(); int x = p.x; }\n";

    fn workspace() -> Workspace {
        let mut workspace = Workspace::new();
        workspace.add_file("geo.bal", ModulePath::new(None, vec!["geo".to_owned()]), GEO);
        workspace.add_file("app.bal", ModulePath::new(None, vec!["app".to_owned()]), APP);
        workspace
    }

    #[test]
    fn checks_every_unit_in_load_order() {
        let mut workspace = workspace();
        let reports = workspace.check_all(2, &CancellationFlag::new()).unwrap();

        let paths: Vec<_> = reports.iter().map(|report| report.path.as_str()).collect();
        assert_eq!(paths, ["geo.bal", "app.bal"]);
        for report in &reports {
            assert_eq!(report.diagnostics(), &[], "{}", report.path);
        }
    }

    #[test]
    fn publishes_a_project_index() {
        let mut workspace = workspace();
        assert!(workspace.index().is_empty());
        workspace.check_all(1, &CancellationFlag::new()).unwrap();

        let index = workspace.index();
        let origin: Vec<_> = index.lookup("origin").collect();
        assert_eq!(origin.len(), 1);
        assert_eq!(origin[0].path, "geo.bal");
        assert_eq!(origin[0].module.to_string(), "geo");
        assert!(index.lookup("main").any(|symbol| symbol.path == "app.bal"));
        assert_eq!(index.lookup("p").count(), 0);
    }

    #[test]
    fn cancelled_runs_report_every_unit() {
        let mut workspace = workspace();
        let cancellation = CancellationFlag::new();
        cancellation.cancel();

        let reports = workspace.check_all(3, &cancellation).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(UnitReport::is_cancelled));
        assert!(workspace.index().is_empty());
    }

    #[test]
    fn long_operator_chains_are_checked() {
        let mut workspace = Workspace::new();
        let text = format!("function f() {{ int x = 1{}; }}\n", " + 1".repeat(5000));
        workspace.add_file("chain.bal", ModulePath::new(None, vec!["chain".to_owned()]), text);

        let reports = workspace.check_all(1, &CancellationFlag::new()).unwrap();
        let messages: Vec<_> =
            reports[0].diagnostics().iter().map(|diag| diag.message().to_owned()).collect();
        assert_eq!(messages, ["nesting too deep"]);
    }

    #[test]
    fn rejects_zero_threads() {
        let mut workspace = workspace();
        let error = workspace.check_all(0, &CancellationFlag::new()).unwrap_err();
        assert!(matches!(error, WorkspaceError::InvalidThreadCount(0)));
    }

    #[test]
    fn unknown_and_unreadable_files() {
        let mut workspace = workspace();
        let missing = Utf8Path::new("missing.bal");
        assert!(matches!(workspace.file(missing), Err(WorkspaceError::UnknownFile(_))));
        assert!(matches!(
            workspace.load(Utf8Path::new("/nonexistent/dir/missing.bal")),
            Err(WorkspaceError::Unreadable { .. })
        ));
    }

    #[test]
    fn edits_update_the_importers() {
        let mut workspace = workspace();
        let geo = Utf8Path::new("geo.bal");
        let start = GEO.find("origin").unwrap();
        let range = bal_yellow::TextRange::at((start as u32).into(), 6.into());
        workspace.apply_edit(geo, &TextEdit::replace(range, "center")).unwrap();

        let app = workspace.file(Utf8Path::new("app.bal")).unwrap();
        let messages: Vec<_> =
            check_file(workspace.db(), app).iter().map(|diag| diag.message().to_owned()).collect();
        assert_eq!(messages, ["module `geo` has no symbol `origin`"]);

        let reparsed = parse(workspace.db(), workspace.file(geo).unwrap());
        assert_eq!(reparsed.syntax_node().text(), GEO.replacen("origin", "center", 1));
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let mut workspace = workspace();
        let range = bal_yellow::TextRange::at(10_000.into(), 1.into());
        let error = workspace.apply_edit(Utf8Path::new("app.bal"), &TextEdit::delete(range));
        assert!(matches!(error, Err(WorkspaceError::InvalidEdit(_))));
    }
}
