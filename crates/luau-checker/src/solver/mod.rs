//! The two interchangeable inference strategies
//!
//! Both take a parsed chunk and produce a `TypeGraph` plus type errors. They
//! share the typing rules in `InferCtx` and differ in when those rules run.

mod new;
mod old;

pub use new::NewSolver;
pub use old::OldSolver;

use luau_ast::Chunk;

use crate::ctx::SolveConfig;
use crate::error::TypeError;
use crate::graph::TypeGraph;
use crate::options::SolverKind;
use crate::types::{TypeArena, TypeId, TypePack};

pub trait Solver {
    /// Name of this solver for logging
    fn name(&self) -> &'static str;

    fn check(&self, chunk: &Chunk, config: &SolveConfig<'_>) -> (TypeGraph, Vec<TypeError>);
}

/// The strategy selected by `kind`
pub fn solver_for(kind: SolverKind) -> &'static dyn Solver {
    match kind {
        SolverKind::New => &NewSolver,
        SolverKind::Old => &OldSolver,
    }
}

/// Combine the packs of every `return` in a function into one pack,
/// position by position
pub(crate) fn merge_return_packs(arena: &mut TypeArena, packs: &[TypePack]) -> TypePack {
    match packs {
        [] => TypePack::default(),
        [only] => only.clone(),
        _ => {
            let len = packs.iter().map(|p| p.head.len()).max().unwrap_or(0);
            let head = (0..len)
                .map(|i| {
                    let parts = packs.iter().map(|p| p.get(i)).collect();
                    arena.union(parts)
                })
                .collect();
            let tails: Vec<TypeId> = packs.iter().filter_map(|p| p.tail).collect();
            let tail = (!tails.is_empty()).then(|| arena.union(tails));
            TypePack { head, tail }
        }
    }
}

/// The value a module exports: its single returned value, if it has one
pub(crate) fn module_value(pack: &TypePack) -> Option<TypeId> {
    match (pack.head.as_slice(), pack.tail) {
        ([only], None) => Some(*only),
        ([], Some(tail)) => Some(tail),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
