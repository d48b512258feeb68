//! The analysis session: sources, configuration and cached results for one
//! playground, answering one request at a time
//!
//! Queries first bring the queried module and everything it requires up to
//! date (see `orderer`), then read the fresh results. Each module check runs
//! under `catch_unwind`; a panic leaves that module's previous results in
//! place and surfaces as a single internal error diagnostic.

use std::panic::{self, AssertUnwindSafe};

use luau_ast::{Position, Range, Span};
use luau_checker::{
    check_for_autocomplete, check_module, CheckOptions, Diagnostic, Limits, Mode, ModuleCheck,
    ModuleImport, ModuleImports, Severity, SolverKind,
};
use rustc_hash::FxHashMap;

use crate::config::ConfigState;
use crate::error::SessionError;
use crate::orderer::{dependency_stamps, needs_check, plan_check, DependencyStamp, Plan};
use crate::query::{self, CompletionItem, SignatureHelp};
use crate::resolver::resolve;
use crate::source_table::{normalize, CheckedModule, SourceTable};

/// Version reported by the `version` request
pub const VERSION: &str = "1.0.0";

/// Names of the entry module, which `modules()` leaves out
const ENTRY_MODULES: [&str; 2] = ["main", "main.luau"];

#[derive(Debug, Clone)]
pub struct AnalysisSession {
    sources: SourceTable,
    config: ConfigState,
    /// Run lint passes in diagnostics checks
    lint: bool,
    limits: Limits,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            sources: SourceTable::new(),
            config: ConfigState::default(),
            lint: true,
            limits: Limits::default(),
        }
    }

    pub fn with_config(mut self, config: ConfigState) -> Self {
        self.config = config;
        self
    }

    pub fn with_lint(mut self, lint: bool) -> Self {
        self.lint = lint;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    pub fn set_source(&mut self, name: &str, text: &str) {
        self.sources.set_source(name, text);
    }

    pub fn get_source(&self, name: &str) -> Result<&str, SessionError> {
        self.sources
            .get_source(name)
            .ok_or_else(|| SessionError::UnknownModule(name.to_string()))
    }

    /// Forget every module and result; configuration is kept
    pub fn reset(&mut self) {
        tracing::debug!(modules = self.sources.len(), "session reset");
        self.sources.reset();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
        self.sources.mark_all_dirty();
        tracing::debug!(%mode, "mode changed");
    }

    pub fn set_solver(&mut self, solver: SolverKind) {
        self.config.solver = solver;
        self.sources.mark_all_dirty();
        tracing::debug!(%solver, "solver changed");
    }

    pub fn config(&self) -> ConfigState {
        self.config
    }

    /// Display names of every module except the entry module
    pub fn modules(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|(key, _)| !ENTRY_MODULES.contains(key))
            .map(|(_, module)| module.name.clone())
            .collect()
    }

    fn options(&self) -> CheckOptions {
        self.config.check_options(self.lint, self.limits)
    }

    /// Bring `name` and its dependencies up to date and return its results
    pub fn check(&mut self, name: &str) -> Result<&ModuleCheck, SessionError> {
        let key = self.key_of(name)?;
        self.refresh(&key);
        let module = self
            .sources
            .get(&key)
            .ok_or_else(|| SessionError::UnknownModule(name.to_string()))?;
        if let Some(message) = &module.failure {
            return Err(SessionError::Internal {
                module: key,
                message: message.clone(),
            });
        }
        module
            .check()
            .ok_or_else(|| SessionError::NotChecked(name.to_string()))
    }

    /// Diagnostics of `name` alone; dependencies are checked silently
    pub fn diagnostics(&mut self, name: &str) -> Vec<Diagnostic> {
        let _span = tracing::info_span!("diagnostics", module = name).entered();
        match self.check(name) {
            Ok(check) => check.diagnostics.clone(),
            Err(err @ SessionError::Internal { .. }) => vec![internal_error(&err)],
            Err(err) => {
                tracing::debug!(%err, "no diagnostics");
                Vec::new()
            }
        }
    }

    pub fn autocomplete(&mut self, name: &str, position: Position) -> Vec<CompletionItem> {
        let _span = tracing::info_span!("autocomplete", module = name).entered();
        let requesting = normalize(name).to_string();
        let modules: Vec<String> = self
            .sources
            .iter()
            .filter(|(key, _)| *key != requesting)
            .map(|(_, module)| module.name.clone())
            .collect();
        self.with_query_check(name, position, |check, source, offset| {
            query::autocomplete(check, source, offset, &modules)
        })
        .unwrap_or_default()
    }

    pub fn hover(&mut self, name: &str, position: Position) -> Option<String> {
        let _span = tracing::info_span!("hover", module = name).entered();
        self.with_query_check(name, position, |check, _, offset| query::hover(check, offset))
            .flatten()
    }

    pub fn signature_help(&mut self, name: &str, position: Position) -> Option<SignatureHelp> {
        let _span = tracing::info_span!("signature_help", module = name).entered();
        self.with_query_check(name, position, query::signature_help)
            .flatten()
    }

    /// Run an editor query against a fresh autocomplete check of `name`.
    /// `None` when the module is unknown, its check failed or the position
    /// is outside the source.
    fn with_query_check<T>(
        &mut self,
        name: &str,
        position: Position,
        query: impl FnOnce(&ModuleCheck, &str, usize) -> T,
    ) -> Option<T> {
        let key = self.key_of(name).ok()?;
        let plan = self.refresh(&key);
        let check = self.check_for_query(&key, &plan)?;

        let module = self.sources.get_mut(&key)?;
        module.autocomplete = Some(check);
        let check = module.autocomplete.as_ref()?;
        let offset = check.lines.offset(position)?;
        Some(query(check, &module.source, offset))
    }

    fn check_for_query(&self, key: &str, plan: &Plan) -> Option<ModuleCheck> {
        let module = self.sources.get(key)?;
        let imports = SessionImports {
            table: &self.sources,
            from: key,
            cycles: plan.cycles_of(key),
        };
        let options = self.options();
        let source = module.source.as_str();
        match panic::catch_unwind(AssertUnwindSafe(|| check_for_autocomplete(source, &options, &imports))) {
            Ok(check) => Some(check),
            Err(payload) => {
                tracing::error!(module = key, message = %panic_message(&*payload), "query check panicked");
                None
            }
        }
    }

    fn key_of(&self, name: &str) -> Result<String, SessionError> {
        let key = normalize(name);
        if self.sources.contains_key(key) {
            Ok(key.to_string())
        } else {
            Err(SessionError::UnknownModule(name.to_string()))
        }
    }

    /// Check every stale module `key` depends on, then `key` itself
    fn refresh(&mut self, key: &str) -> Plan {
        let plan = plan_check(&self.sources, key);
        for module in &plan.order {
            let stamps = dependency_stamps(&self.sources, &plan, module);
            let stale = self
                .sources
                .get(module)
                .is_some_and(|m| needs_check(m, &stamps));
            if stale {
                self.check_one(module, &plan, stamps);
            } else {
                tracing::trace!(module = module.as_str(), "reusing cached check");
            }
        }
        plan
    }

    fn check_one(&mut self, key: &str, plan: &Plan, stamps: Vec<DependencyStamp>) {
        let _span = tracing::debug_span!("check", module = key).entered();
        let Some(module) = self.sources.get(key) else {
            return;
        };
        let imports = SessionImports {
            table: &self.sources,
            from: key,
            cycles: plan.cycles_of(key),
        };
        let options = self.options();
        let source = module.source.as_str();
        let result = panic::catch_unwind(AssertUnwindSafe(|| check_module(source, &options, &imports)));

        let Some(module) = self.sources.get_mut(key) else {
            return;
        };
        match result {
            Ok(check) => {
                tracing::debug!(
                    mode = %check.mode,
                    diagnostics = check.diagnostics.len(),
                    "module checked"
                );
                module.checked = Some(CheckedModule {
                    check,
                    dependencies: stamps,
                });
                module.generation += 1;
                module.dirty = false;
                module.failure = None;
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                tracing::error!(%message, "module check panicked");
                module.failure = Some(message);
            }
        }
    }
}

/// How a module being checked sees the modules it requires
struct SessionImports<'a> {
    table: &'a SourceTable,
    from: &'a str,
    cycles: Option<&'a FxHashMap<String, String>>,
}

impl ModuleImports for SessionImports<'_> {
    fn import(&self, path: &str) -> ModuleImport<'_> {
        if let Some(cycle) = self.cycles.and_then(|cycles| cycles.get(path)) {
            return ModuleImport::Cyclic(cycle);
        }
        let Ok(target) = resolve(self.from, path, self.table) else {
            return ModuleImport::Unresolved;
        };
        let Some((key, module)) = self.table.iter().find(|(key, _)| *key == target) else {
            return ModuleImport::Unresolved;
        };
        match module.check() {
            Some(check) if check.mode != Mode::NoCheck && !check.graph.parse_failed => {
                ModuleImport::Resolved {
                    name: key,
                    graph: &check.graph,
                }
            }
            _ => ModuleImport::Unavailable,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn internal_error(err: &SessionError) -> Diagnostic {
    let start = Position::new(0, 0);
    Diagnostic {
        severity: Severity::Error,
        code: err.code().to_string(),
        message: err.to_string(),
        range: Range::new(start, start),
        span: Span::dummy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session(modules: &[(&str, &str)]) -> AnalysisSession {
        let mut session = AnalysisSession::new();
        for (name, source) in modules {
            session.set_source(name, source);
        }
        session
    }

    fn generation(session: &AnalysisSession, name: &str) -> u64 {
        session.sources().get(name).unwrap().generation
    }

    #[test]
    fn test_get_source() {
        let session = session(&[("./util", "return 1")]);
        assert_eq!(session.get_source("util"), Ok("return 1"));
        assert_eq!(
            session.get_source("nope"),
            Err(SessionError::UnknownModule("nope".to_string()))
        );
    }

    #[test]
    fn test_unknown_module_queries_are_empty() {
        let mut session = session(&[]);
        assert!(session.diagnostics("main").is_empty());
        assert!(session.autocomplete("main", Position::new(0, 0)).is_empty());
        assert_eq!(session.hover("main", Position::new(0, 0)), None);
    }

    #[test]
    fn test_clean_modules_are_reused() {
        let mut session = session(&[("util", "return 1"), ("main", "local u = require('util')")]);
        session.diagnostics("main");
        assert_eq!(generation(&session, "util"), 1);
        assert_eq!(generation(&session, "main"), 1);

        session.diagnostics("main");
        assert_eq!(generation(&session, "util"), 1);
        assert_eq!(generation(&session, "main"), 1);
    }

    #[test]
    fn test_dependency_edit_rechecks_dependents() {
        let mut session = session(&[("util", "return 1"), ("main", "local u = require('util')")]);
        session.diagnostics("main");
        session.set_source("util", "return 2");
        session.diagnostics("main");
        assert_eq!(generation(&session, "util"), 2);
        assert_eq!(generation(&session, "main"), 2);
    }

    #[test]
    fn test_edit_does_not_recheck_dependencies() {
        let mut session = session(&[("util", "return 1"), ("main", "local u = require('util')")]);
        session.diagnostics("main");
        session.set_source("main", "local u = require('util')\nprint(u)");
        session.diagnostics("main");
        assert_eq!(generation(&session, "util"), 1);
        assert_eq!(generation(&session, "main"), 2);
    }

    #[test]
    fn test_config_change_marks_everything_dirty() {
        let mut session = session(&[("util", "return 1"), ("main", "local u = require('util')")]);
        session.diagnostics("main");
        session.set_mode(Mode::Strict);
        assert!(session.sources().iter().all(|(_, m)| m.dirty));
        session.diagnostics("main");
        session.set_solver(SolverKind::Old);
        assert!(session.sources().iter().all(|(_, m)| m.dirty));
        assert_eq!(session.config(), ConfigState::new(Mode::Strict, SolverKind::Old));
    }

    #[test]
    fn test_modules_skip_entry() {
        let session = session(&[("main", ""), ("util", ""), ("main.luau", ""), ("./lib/x", "")]);
        assert_eq!(session.modules(), vec!["util", "./lib/x"]);
    }

    #[test]
    fn test_unrelated_modules_are_left_alone() {
        let mut session = session(&[
            ("main", "local u = require('util')"),
            ("util", "return 1"),
            ("scratch", "local = broken"),
        ]);
        session.diagnostics("main");
        assert_eq!(generation(&session, "util"), 1);
        assert_eq!(generation(&session, "scratch"), 0);
        assert!(session.sources().get("scratch").unwrap().check().is_none());
    }

    #[test]
    fn test_cycle_is_reported_once() {
        let mut session = session(&[
            ("a", "local b = require('b')\nreturn {}"),
            ("b", "local a = require('a')\nreturn {}"),
        ]);
        let diagnostics = session.diagnostics("a");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let b = session.check("b").unwrap();
        let messages: Vec<&str> = b.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Cyclic module dependency: a -> b -> a"]);
    }

    #[test]
    fn test_autocomplete_result_is_stored() {
        let mut session = session(&[("main", "local x = 1\n")]);
        let items = session.autocomplete("main", Position::new(1, 0));
        assert!(items.iter().any(|i| i.label == "x"));
        assert!(session.sources().get("main").unwrap().autocomplete.is_some());
    }

    #[test]
    fn test_internal_error_diagnostic() {
        let err = SessionError::Internal {
            module: "main".to_string(),
            message: "boom".to_string(),
        };
        let diagnostic = internal_error(&err);
        assert_eq!(diagnostic.code, "InternalError");
        assert_eq!(diagnostic.message, "internal error while checking 'main': boom");
        assert!(diagnostic.is_error());
    }
}
