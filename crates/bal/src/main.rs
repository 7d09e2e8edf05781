use std::num::NonZeroUsize;

use anyhow::Context as _;
use bal_db::{Workspace, bind, check};
use bal_errors::{Diagnostic, Renderer, Severity};
use bal_inputs::CancellationFlag;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(about = "Checks Ballerina source files")]
enum Options {
    /// Parses, binds and type checks every file.
    Check {
        #[arg(required = true)]
        paths: Vec<Utf8PathBuf>,
        /// Worker threads, defaults to the available parallelism.
        #[arg(long)]
        threads: Option<usize>,
        /// Fail when any warning is reported.
        #[arg(long)]
        deny_warnings: bool,
    },
    /// Reports syntax errors and optionally dumps the tree.
    Parse {
        path: Utf8PathBuf,
        #[arg(long)]
        tree: bool,
    },
    /// Lists the symbols a file declares with their types.
    Symbols { path: Utf8PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Options::parse() {
        Options::Check { paths, threads, deny_warnings } => {
            run_check(&paths, threads, deny_warnings)
        }
        Options::Parse { path, tree } => run_parse(&path, tree),
        Options::Symbols { path } => run_symbols(&path),
    }
}

fn run_check(paths: &[Utf8PathBuf], threads: Option<usize>, deny_warnings: bool) -> anyhow::Result<()> {
    let mut workspace = Workspace::new();
    for path in paths {
        workspace.load(path).with_context(|| format!("failed to load `{path}`"))?;
    }

    let threads = threads.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    });
    let reports = workspace
        .check_all(threads, &CancellationFlag::new())
        .context("failed to check the workspace")?;

    let renderer = Renderer::styled();
    let (mut errors, mut warnings) = (0, 0);
    for report in &reports {
        let text = report.file.text(workspace.db());
        for diagnostic in report.diagnostics() {
            match diagnostic.severity() {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Info | Severity::Hint => {}
            }
            eprintln!("{}", diagnostic.render(&renderer, report.path.as_str(), text));
        }
    }
    tracing::debug!(units = reports.len(), errors, warnings, "check finished");

    if errors > 0 || (deny_warnings && warnings > 0) {
        anyhow::bail!("found {errors} error(s) and {warnings} warning(s)");
    }
    Ok(())
}

fn run_parse(path: &Utf8Path, tree: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))?;
    let parse = bal_parse::parse(&text);

    if tree {
        print!("{}", parse.syntax_node().debug_dump());
    }
    report(parse.diagnostics(), path, &text)
}

fn run_symbols(path: &Utf8Path) -> anyhow::Result<()> {
    let mut workspace = Workspace::new();
    let file = workspace.load(path).with_context(|| format!("failed to load `{path}`"))?;
    let db = workspace.db();

    let bindings = bind(db, file);
    let types = check(db, file);
    let line_index = file.line_index(db);
    for (symbol, data) in bindings.symbols() {
        let mut depth = 0;
        let mut scope = bindings.scope(data.scope).parent;
        while let Some(parent) = scope {
            depth += 1;
            scope = bindings.scope(parent).parent;
        }

        let position = line_index.line_col(data.name_range.start());
        let ty = match types.symbol_type(symbol).or(data.ty.as_ref()) {
            Some(ty) => format!(": {ty}"),
            None => String::new(),
        };
        println!(
            "{:indent$}{}:{} {} {}{ty}",
            "",
            position.line + 1,
            position.col + 1,
            data.kind.as_str(),
            data.name,
            indent = depth * 2,
        );
    }
    Ok(())
}

fn report(diagnostics: &[Diagnostic], path: &Utf8Path, text: &str) -> anyhow::Result<()> {
    let renderer = Renderer::styled();
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.render(&renderer, path.as_str(), text));
    }
    let errors = diagnostics.iter().filter(|diagnostic| diagnostic.is_error()).count();
    if errors > 0 {
        anyhow::bail!("found {errors} syntax error(s)");
    }
    Ok(())
}
