//! Dependency-ordered planning of module checks
//!
//! Planning follows `require` edges from the queried module only, so
//! modules it cannot reach are never parsed. Edges are rediscovered on every
//! plan: clean modules reuse the requires recorded by their last check,
//! dirty ones are re-parsed.
//!
//! Cycles are broken per strongly connected component. Within a component
//! the walk starts at its earliest-inserted module and follows requires in
//! source order; the back edges of that walk are the cyclic edges. The
//! choice depends only on the component, so a cycle is closed on the same
//! edge whichever module is queried. With those edges removed the modules
//! are emitted in postorder, every module after the modules it requires.
//!
//! A module is re-checked when it is dirty, has never been checked, or when
//! any of its requires now resolves differently (another module, another
//! generation of the same module, or a changed cycle).

use luau_checker::find_requires;
use rustc_hash::FxHashMap;

use crate::resolver::resolve;
use crate::source_table::{normalize, Module, SourceTable};

/// What one `require` path pointed at when a module was checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    Resolved { module: String, generation: u64 },
    /// The edge closes a cycle, described as `a -> b -> a`
    Cyclic(String),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStamp {
    pub path: String,
    pub target: DependencyTarget,
}

/// Modules to visit for one query, in dependency order
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Canonical names, every module after the modules it requires
    pub order: Vec<String>,
    /// Require paths of each planned module, deduplicated in source order
    pub requires: FxHashMap<String, Vec<String>>,
    /// Edges that close a cycle: module -> require path -> cycle
    pub cycles: FxHashMap<String, FxHashMap<String, String>>,
}

impl Plan {
    pub fn cycle(&self, module: &str, path: &str) -> Option<&str> {
        self.cycles.get(module)?.get(path).map(String::as_str)
    }

    pub fn cycles_of(&self, module: &str) -> Option<&FxHashMap<String, String>> {
        self.cycles.get(module)
    }
}

/// Visit state for the depth-first walks
#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Completed,
}

/// Resolved requires of every module reachable from the root
struct Graph {
    /// Reachable modules in discovery order, root first
    modules: Vec<String>,
    /// Require path and target of each resolved edge, in source order
    edges: FxHashMap<String, Vec<(String, String)>>,
}

impl Graph {
    fn targets(&self, module: &str) -> impl Iterator<Item = &(String, String)> {
        self.edges.get(module).into_iter().flatten()
    }
}

/// Plan the checks needed before `root` can be queried. An unknown root
/// yields an empty plan.
pub fn plan_check(table: &SourceTable, root: &str) -> Plan {
    let mut plan = Plan::default();
    let root = normalize(root);
    if !table.contains_key(root) {
        return plan;
    }

    let graph = discover(table, root, &mut plan);
    for component in components(&graph) {
        break_cycles(table, &graph, &component, &mut plan);
    }

    let mut state: FxHashMap<String, VisitState> = FxHashMap::default();
    for module in &graph.modules {
        if !state.contains_key(module) {
            emit(&graph, module, &mut state, &mut plan);
        }
    }
    tracing::debug!(root, modules = plan.order.len(), cycles = plan.cycles.len(), "planned check");
    plan
}

/// Walk resolved requires outward from `root`, recording each module's
/// require paths in `plan`
fn discover(table: &SourceTable, root: &str, plan: &mut Plan) -> Graph {
    let mut graph = Graph {
        modules: vec![root.to_string()],
        edges: FxHashMap::default(),
    };
    let mut next = 0;
    while let Some(module) = graph.modules.get(next).cloned() {
        next += 1;
        let requires = table.get(&module).map(module_requires).unwrap_or_default();
        let mut edges = Vec::new();
        for require in &requires {
            // Unresolved requires are reported by the checker
            if let Ok(target) = resolve(&module, require, table) {
                if !graph.modules.contains(&target) {
                    graph.modules.push(target.clone());
                }
                edges.push((require.clone(), target));
            }
        }
        graph.edges.insert(module.clone(), edges);
        plan.requires.insert(module, requires);
    }
    graph
}

/// Strongly connected components of the graph (Tarjan)
fn components(graph: &Graph) -> Vec<Vec<String>> {
    struct Tarjan<'g> {
        graph: &'g Graph,
        index: FxHashMap<&'g str, usize>,
        low: FxHashMap<&'g str, usize>,
        stack: Vec<&'g str>,
        on_stack: FxHashMap<&'g str, bool>,
        out: Vec<Vec<String>>,
    }

    impl<'g> Tarjan<'g> {
        fn visit(&mut self, node: &'g str) {
            let index = self.index.len();
            self.index.insert(node, index);
            self.low.insert(node, index);
            self.stack.push(node);
            self.on_stack.insert(node, true);

            for (_, target) in self.graph.targets(node) {
                let target = target.as_str();
                if !self.index.contains_key(target) {
                    self.visit(target);
                    let low = self.low[node].min(self.low[target]);
                    self.low.insert(node, low);
                } else if self.on_stack.get(target).copied().unwrap_or(false) {
                    let low = self.low[node].min(self.index[target]);
                    self.low.insert(node, low);
                }
            }

            if self.low[node] == self.index[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.insert(member, false);
                    component.push(member.to_string());
                    if member == node {
                        break;
                    }
                }
                self.out.push(component);
            }
        }
    }

    let mut tarjan = Tarjan {
        graph,
        index: FxHashMap::default(),
        low: FxHashMap::default(),
        stack: Vec::new(),
        on_stack: FxHashMap::default(),
        out: Vec::new(),
    };
    for module in &graph.modules {
        if !tarjan.index.contains_key(module.as_str()) {
            tarjan.visit(module);
        }
    }
    tarjan.out
}

/// Record the back edges of a walk over `component` from its
/// earliest-inserted member
fn break_cycles(table: &SourceTable, graph: &Graph, component: &[String], plan: &mut Plan) {
    let Some(start) = component
        .iter()
        .min_by_key(|m| table.index_of(m).unwrap_or(usize::MAX))
    else {
        return;
    };
    let mut state: FxHashMap<String, VisitState> = FxHashMap::default();
    let mut path: Vec<String> = Vec::new();
    walk_component(graph, component, start, &mut state, &mut path, plan);
}

fn walk_component(
    graph: &Graph,
    component: &[String],
    node: &str,
    state: &mut FxHashMap<String, VisitState>,
    path: &mut Vec<String>,
    plan: &mut Plan,
) {
    state.insert(node.to_string(), VisitState::InProgress);
    path.push(node.to_string());

    for (require, target) in graph.targets(node) {
        if !component.contains(target) {
            continue;
        }
        match state.get(target) {
            Some(VisitState::InProgress) => {
                let start = path.iter().position(|m| m == target).unwrap_or(0);
                let cycle = format!("{} -> {}", path[start..].join(" -> "), target);
                tracing::debug!(module = node, %cycle, "require cycle");
                plan.cycles
                    .entry(node.to_string())
                    .or_default()
                    .insert(require.clone(), cycle);
            }
            Some(VisitState::Completed) => {}
            None => walk_component(graph, component, target, state, path, plan),
        }
    }

    path.pop();
    state.insert(node.to_string(), VisitState::Completed);
}

/// Postorder over the edges that do not close a cycle
fn emit(graph: &Graph, node: &str, state: &mut FxHashMap<String, VisitState>, plan: &mut Plan) {
    state.insert(node.to_string(), VisitState::InProgress);
    for (require, target) in graph.targets(node) {
        if plan.cycle(node, require).is_some() || state.contains_key(target) {
            continue;
        }
        emit(graph, target, state, plan);
    }
    state.insert(node.to_string(), VisitState::Completed);
    plan.order.push(node.to_string());
}

/// Require paths of a module, from its last check when that is still
/// current and from a fresh parse otherwise
fn module_requires(module: &Module) -> Vec<String> {
    let paths: Vec<String> = match module.check() {
        Some(check) if !module.dirty => check.requires.iter().map(|r| r.path.clone()).collect(),
        _ => {
            let parsed = luau_parser::parse(&module.source);
            find_requires(&parsed.chunk).into_iter().map(|r| r.path).collect()
        }
    };
    let mut unique: Vec<String> = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
}

/// Current resolution of every require of `module`. Must be computed after
/// the module's dependencies in `plan` have been brought up to date.
pub fn dependency_stamps(table: &SourceTable, plan: &Plan, module: &str) -> Vec<DependencyStamp> {
    let Some(requires) = plan.requires.get(module) else {
        return Vec::new();
    };
    requires
        .iter()
        .map(|path| {
            let target = if let Some(cycle) = plan.cycle(module, path) {
                DependencyTarget::Cyclic(cycle.to_string())
            } else {
                match resolve(module, path, table) {
                    Ok(name) => DependencyTarget::Resolved {
                        generation: table.get(&name).map_or(0, |m| m.generation),
                        module: name,
                    },
                    Err(_) => DependencyTarget::Unresolved,
                }
            };
            DependencyStamp {
                path: path.clone(),
                target,
            }
        })
        .collect()
}

/// Whether the cached results of `module` are stale
pub fn needs_check(module: &Module, stamps: &[DependencyStamp]) -> bool {
    if module.dirty {
        return true;
    }
    match &module.checked {
        Some(checked) => checked.dependencies != stamps,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(modules: &[(&str, &str)]) -> SourceTable {
        let mut table = SourceTable::new();
        for (name, source) in modules {
            table.set_source(name, source);
        }
        table
    }

    #[test]
    fn test_dependencies_come_first() {
        let table = table(&[
            ("main", "local a = require('a')\nlocal b = require('b')"),
            ("a", "local c = require('c')\nreturn {}"),
            ("b", "local c = require('c')\nreturn {}"),
            ("c", "return {}"),
            ("unused", "return {}"),
        ]);
        let plan = plan_check(&table, "main");
        assert_eq!(plan.order, vec!["c", "a", "b", "main"]);
        assert!(plan.cycles.is_empty());
    }

    #[test]
    fn test_cycle_is_recorded_on_closing_edge() {
        let table = table(&[
            ("main", "local a = require('a')"),
            ("a", "local b = require('b')\nreturn {}"),
            ("b", "local a = require('./a')\nreturn {}"),
        ]);
        let plan = plan_check(&table, "main");
        assert_eq!(plan.order, vec!["b", "a", "main"]);
        assert_eq!(plan.cycle("b", "./a"), Some("a -> b -> a"));
        assert_eq!(plan.cycle("a", "b"), None);
    }

    #[test]
    fn test_cycle_edge_does_not_depend_on_root() {
        let table = table(&[
            ("a", "local b = require('b')\nreturn {}"),
            ("b", "local a = require('a')\nreturn {}"),
        ]);
        for root in ["a", "b"] {
            let plan = plan_check(&table, root);
            assert_eq!(plan.cycle("b", "a"), Some("a -> b -> a"), "root {}", root);
            assert_eq!(plan.cycle("a", "b"), None, "root {}", root);
        }
        assert_eq!(plan_check(&table, "b").order, vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_entered_from_outside() {
        let table = table(&[
            ("main", "local a = require('a')"),
            ("b", "local a = require('a')\nreturn {}"),
            ("a", "local b = require('b')\nreturn {}"),
        ]);
        for root in ["main", "a", "b"] {
            let plan = plan_check(&table, root);
            assert_eq!(plan.cycle("a", "b"), Some("b -> a -> b"), "root {}", root);
            assert_eq!(plan.cycle("b", "a"), None, "root {}", root);
        }
        assert_eq!(plan_check(&table, "main").order, vec!["a", "main", "b"]);
        assert_eq!(plan_check(&table, "b").order, vec!["a", "b"]);
    }

    #[test]
    fn test_unreachable_modules_are_not_planned() {
        let table = table(&[
            ("main", "local u = require('util')"),
            ("util", "return {}"),
            ("scratch", "local x = require('main')\nlocal = broken"),
        ]);
        let plan = plan_check(&table, "main");
        assert_eq!(plan.order, vec!["util", "main"]);
        let mut planned: Vec<&String> = plan.requires.keys().collect();
        planned.sort();
        assert_eq!(planned, vec!["main", "util"]);
    }

    #[test]
    fn test_self_require() {
        let table = table(&[("main", "local m = require('main')")]);
        let plan = plan_check(&table, "main");
        assert_eq!(plan.order, vec!["main"]);
        assert_eq!(plan.cycle("main", "main"), Some("main -> main"));
    }

    #[test]
    fn test_unresolved_requires_are_skipped() {
        let table = table(&[("main", "local m = require('missing')\nlocal m2 = require('missing')")]);
        let plan = plan_check(&table, "main");
        assert_eq!(plan.order, vec!["main"]);
        assert_eq!(plan.requires["main"], vec!["missing"]);
        let stamps = dependency_stamps(&table, &plan, "main");
        assert_eq!(
            stamps,
            vec![DependencyStamp {
                path: "missing".to_string(),
                target: DependencyTarget::Unresolved,
            }]
        );
    }

    #[test]
    fn test_unknown_root() {
        let table = table(&[("a", "return 1")]);
        let plan = plan_check(&table, "nope");
        assert!(plan.order.is_empty());
    }

    #[test]
    fn test_stamps_follow_generation() {
        let mut table = table(&[("main", "local u = require('util')"), ("util", "return 1")]);
        let plan = plan_check(&table, "main");
        let before = dependency_stamps(&table, &plan, "main");
        table.get_mut("util").unwrap().generation += 1;
        let after = dependency_stamps(&table, &plan, "main");
        assert_eq!(
            after[0].target,
            DependencyTarget::Resolved {
                module: "util".to_string(),
                generation: 1
            }
        );
        assert!(before != after);
    }
}
