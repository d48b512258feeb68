//! luau-analyze - type check Luau files and answer editor queries

mod config;
mod error;
mod files;
mod report;
mod tracing_config;

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use luau_ast::Position;
use luau_checker::{Mode, SolverKind};
use luau_frontend::{protocol, AnalysisSession, ConfigState};

use crate::config::{LuauRc, Settings};
use crate::error::CliError;
use crate::files::SourceFile;
use crate::report::FileReport;

#[derive(Parser)]
#[command(name = "luau-analyze")]
#[command(about = "Luau type checker and editor query tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CheckFlags {
    /// Strictness: strict, nonstrict or nocheck (overrides .luaurc)
    #[arg(long)]
    mode: Option<Mode>,
    /// Type solver: new or old (overrides .luaurc)
    #[arg(long)]
    solver: Option<SolverKind>,
    /// Config file to use instead of ./.luaurc
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip lint passes
    #[arg(long)]
    no_lint: bool,
    /// Constraint dispatch budget per module (overrides .luaurc)
    #[arg(long)]
    max_solver_iterations: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Type check files and directories
    Check {
        /// Files or directories (searched for .luau and .lua files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[command(flatten)]
        flags: CheckFlags,
    },
    /// Show the type at a 0-indexed line and column
    Hover {
        file: PathBuf,
        line: u32,
        col: u32,
        /// Other modules the file may require
        #[arg(long = "module", num_args = 1..)]
        modules: Vec<PathBuf>,
        #[command(flatten)]
        flags: CheckFlags,
    },
    /// List completions at a 0-indexed line and column
    Complete {
        file: PathBuf,
        line: u32,
        col: u32,
        /// Other modules the file may require
        #[arg(long = "module", num_args = 1..)]
        modules: Vec<PathBuf>,
        #[command(flatten)]
        flags: CheckFlags,
    },
    /// Answer JSON requests, one per line, on stdin
    Serve,
}

fn main() -> ExitCode {
    tracing_config::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { paths, format, flags } => cmd_check(&paths, format, &flags),
        Commands::Hover {
            file,
            line,
            col,
            modules,
            flags,
        } => cmd_hover(&file, Position::new(line, col), &modules, &flags),
        Commands::Complete {
            file,
            line,
            col,
            modules,
            flags,
        } => cmd_complete(&file, Position::new(line, col), &modules, &flags),
        Commands::Serve => cmd_serve(),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(2)
        }
    }
}

fn settings(flags: &CheckFlags) -> Result<Settings, CliError> {
    let dir = env::current_dir()?;
    let rc = LuauRc::discover(flags.config.as_deref(), &dir)?;
    let mut settings = Settings::resolve(&rc, flags.mode, flags.solver, flags.no_lint);
    if let Some(iterations) = flags.max_solver_iterations {
        settings.limits.max_solver_iterations = iterations;
    }
    Ok(settings)
}

/// A session holding every file, configured from flags and `.luaurc`
fn load_session(files: &[SourceFile], flags: &CheckFlags) -> Result<AnalysisSession, CliError> {
    let settings = settings(flags)?;
    let mut session = AnalysisSession::new()
        .with_config(ConfigState::new(settings.mode, settings.solver))
        .with_lint(settings.lint)
        .with_limits(settings.limits);
    for file in files {
        session.set_source(&file.name, &file.text);
    }
    Ok(session)
}

fn cmd_check(paths: &[PathBuf], format: OutputFormat, flags: &CheckFlags) -> Result<ExitCode, CliError> {
    let files = files::collect(paths)?;
    let mut session = load_session(&files, flags)?;

    let mut failed = false;
    let mut reports = Vec::new();
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    for file in &files {
        let diagnostics = session.diagnostics(&file.name);
        failed |= diagnostics.iter().any(|d| d.is_error());
        match format {
            OutputFormat::Pretty => {
                report::write_pretty(&mut stderr.lock(), &file.name, &file.text, &diagnostics, color)?;
            }
            OutputFormat::Json => reports.push(FileReport::new(&file.name, &diagnostics)),
        }
    }

    match format {
        OutputFormat::Pretty => {
            let status = if failed { "errors found" } else { "ok" };
            eprintln!("checked {} file(s): {}", files.len(), status);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// The queried file first, then the extra modules
fn query_session(file: &Path, modules: &[PathBuf], flags: &CheckFlags) -> Result<(AnalysisSession, String), CliError> {
    let mut paths = vec![file.to_path_buf()];
    paths.extend(modules.iter().cloned());
    let files = files::collect(&paths)?;
    let session = load_session(&files, flags)?;
    let name = files
        .iter()
        .find(|f| f.path == file)
        .map(|f| f.name.clone())
        .unwrap_or_default();
    Ok((session, name))
}

fn cmd_hover(file: &Path, position: Position, modules: &[PathBuf], flags: &CheckFlags) -> Result<ExitCode, CliError> {
    let (mut session, name) = query_session(file, modules, flags)?;
    match session.hover(&name, position) {
        Some(content) => {
            println!("{}", content);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("no type information at {}:{}", position.line, position.column);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_complete(file: &Path, position: Position, modules: &[PathBuf], flags: &CheckFlags) -> Result<ExitCode, CliError> {
    let (mut session, name) = query_session(file, modules, flags)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for item in session.autocomplete(&name, position) {
        let mut line = format!("{}\t{}", item.label, item.kind.as_str());
        if let Some(detail) = &item.detail {
            line.push('\t');
            line.push_str(detail);
        }
        if item.deprecated {
            line.push_str("\t(deprecated)");
        }
        writeln!(out, "{}", line)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_serve() -> Result<ExitCode, CliError> {
    let _span = tracing::info_span!("serve").entered();
    let mut session = AnalysisSession::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = protocol::handle_line(&mut session, &line);
        writeln!(out, "{}", response)?;
        out.flush()?;
    }
    Ok(ExitCode::SUCCESS)
}
