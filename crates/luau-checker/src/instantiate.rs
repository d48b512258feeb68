//! Copying types: instantiating and generalizing generic functions, and
//! importing types from another module's arena

use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::*;

/// Rewrites a type, replacing ids found in `map`. Tables and functions are
/// copied; everything else is shared.
struct Substitution<'m> {
    map: &'m FxHashMap<TypeId, TypeId>,
    copied: FxHashMap<TypeId, TypeId>,
}

impl Substitution<'_> {
    fn apply(&mut self, arena: &mut TypeArena, ty: TypeId) -> TypeId {
        let ty = arena.follow(ty);
        if let Some(&to) = self.map.get(&ty) {
            return to;
        }
        if let Some(&to) = self.copied.get(&ty) {
            return to;
        }

        match arena.get(ty).clone() {
            TypeKind::Function(func) => {
                let placeholder = arena.add(TypeKind::Any);
                self.copied.insert(ty, placeholder);
                let generics = func
                    .generics
                    .iter()
                    .copied()
                    .filter(|g| !self.map.contains_key(&arena.follow(*g)))
                    .collect();
                let copy = FunctionType {
                    generics,
                    params: self.apply_pack(arena, &func.params),
                    param_names: func.param_names,
                    returns: self.apply_pack(arena, &func.returns),
                };
                arena.set(placeholder, TypeKind::Function(copy));
                placeholder
            }
            TypeKind::Table(table) => {
                let placeholder = arena.add(TypeKind::Any);
                self.copied.insert(ty, placeholder);
                let mut copy = TableType {
                    props: Default::default(),
                    indexer: None,
                    state: table.state,
                    name: table.name.clone(),
                    metatable: None,
                };
                for (name, prop) in &table.props {
                    let value = self.apply(arena, prop.ty);
                    copy.props.insert(name.clone(), Property { ty: value, deprecated: prop.deprecated });
                }
                if let Some((key, value)) = table.indexer {
                    copy.indexer = Some((self.apply(arena, key), self.apply(arena, value)));
                }
                copy.metatable = table.metatable.map(|mt| self.apply(arena, mt));
                arena.set(placeholder, TypeKind::Table(copy));
                placeholder
            }
            TypeKind::Union(parts) => {
                let parts = parts.into_iter().map(|p| self.apply(arena, p)).collect();
                arena.union(parts)
            }
            TypeKind::Intersection(parts) => {
                let parts = parts.into_iter().map(|p| self.apply(arena, p)).collect();
                arena.add(TypeKind::Intersection(parts))
            }
            _ => ty,
        }
    }

    fn apply_pack(&mut self, arena: &mut TypeArena, pack: &TypePack) -> TypePack {
        TypePack {
            head: pack.head.iter().map(|&t| self.apply(arena, t)).collect(),
            tail: pack.tail.map(|t| self.apply(arena, t)),
        }
    }
}

/// Replace every type in `map` inside `ty`
pub fn substitute(arena: &mut TypeArena, ty: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
    if map.is_empty() {
        return ty;
    }
    Substitution { map, copied: FxHashMap::default() }.apply(arena, ty)
}

/// Fresh copy of a generic function with its generics replaced by free
/// types at `level`. Non-generic types are returned unchanged.
pub fn instantiate(arena: &mut TypeArena, ty: TypeId, level: u32) -> TypeId {
    let generics = match arena.as_function(ty) {
        Some(func) if !func.generics.is_empty() => func.generics.clone(),
        _ => return ty,
    };
    let map: FxHashMap<TypeId, TypeId> = generics
        .into_iter()
        .map(|g| (arena.follow(g), arena.fresh(level)))
        .collect();
    substitute(arena, ty, &map)
}

/// Turn the free types of a function signature that belong to `level` or
/// deeper into named generics
pub fn generalize(arena: &mut TypeArena, func_ty: TypeId, level: u32) {
    let Some(func) = arena.as_function(func_ty).cloned() else {
        return;
    };

    let mut frees = Vec::new();
    let mut visited = FxHashSet::default();
    for &ty in func.params.head.iter().chain(&func.params.tail) {
        collect_frees(arena, ty, level, &mut frees, &mut visited);
    }
    for &ty in func.returns.head.iter().chain(&func.returns.tail) {
        collect_frees(arena, ty, level, &mut frees, &mut visited);
    }
    if frees.is_empty() {
        return;
    }

    let taken: FxHashSet<String> = func
        .generics
        .iter()
        .filter_map(|&g| match arena.kind(g) {
            TypeKind::Generic(name) => Some(name.clone()),
            _ => None,
        })
        .collect();
    let mut names = generic_names().filter(|n| !taken.contains(n));

    let mut generics = func.generics;
    for free in frees {
        let name = names.next().unwrap_or_default();
        let generic = arena.add(TypeKind::Generic(name));
        arena.bind(free, generic);
        generics.push(generic);
    }
    if let TypeKind::Function(f) = arena.get_mut(func_ty) {
        f.generics = generics;
    }
}

/// "a", "b", ... "z", "a1", "b1", ...
fn generic_names() -> impl Iterator<Item = String> {
    (0usize..).map(|i| {
        let letter = (b'a' + (i % 26) as u8) as char;
        match i / 26 {
            0 => letter.to_string(),
            round => format!("{}{}", letter, round),
        }
    })
}

pub fn collect_frees(
    arena: &TypeArena,
    ty: TypeId,
    level: u32,
    out: &mut Vec<TypeId>,
    visited: &mut FxHashSet<TypeId>,
) {
    let ty = arena.follow(ty);
    if !visited.insert(ty) {
        return;
    }
    match arena.get(ty) {
        TypeKind::Free { level: l } if *l >= level => out.push(ty),
        TypeKind::Function(func) => {
            let nested: Vec<TypeId> = func
                .params
                .head
                .iter()
                .chain(&func.params.tail)
                .chain(&func.returns.head)
                .chain(&func.returns.tail)
                .copied()
                .collect();
            for t in nested {
                collect_frees(arena, t, level, out, visited);
            }
        }
        TypeKind::Table(table) => {
            let mut nested: Vec<TypeId> = table.props.values().map(|p| p.ty).collect();
            if let Some((k, v)) = table.indexer {
                nested.push(k);
                nested.push(v);
            }
            for t in nested {
                collect_frees(arena, t, level, out, visited);
            }
        }
        TypeKind::Union(parts) | TypeKind::Intersection(parts) => {
            for &t in parts.iter() {
                collect_frees(arena, t, level, out, visited);
            }
        }
        _ => {}
    }
}

/// Copies types out of another module's arena. Unresolved types in the
/// source become `any`.
pub struct TypeImporter<'a> {
    from: &'a TypeArena,
    copied: FxHashMap<TypeId, TypeId>,
    depth: usize,
    max_depth: usize,
    pub too_complex: bool,
}

impl<'a> TypeImporter<'a> {
    pub fn new(from: &'a TypeArena, max_depth: usize) -> Self {
        Self {
            from,
            copied: FxHashMap::default(),
            depth: 0,
            max_depth,
            too_complex: false,
        }
    }

    pub fn import(&mut self, to: &mut TypeArena, ty: TypeId) -> TypeId {
        let ty = self.from.follow(ty);
        if ty.index() <= TypeId::ERROR.index() {
            return ty;
        }
        if let Some(&copy) = self.copied.get(&ty) {
            return copy;
        }
        if self.depth >= self.max_depth {
            self.too_complex = true;
            return TypeId::ANY;
        }

        self.depth += 1;
        let copy = match self.from.get(ty).clone() {
            TypeKind::Free { .. } | TypeKind::Blocked | TypeKind::Bound(_) => TypeId::ANY,
            TypeKind::Function(func) => {
                let placeholder = to.add(TypeKind::Any);
                self.copied.insert(ty, placeholder);
                let copy = FunctionType {
                    generics: func.generics.iter().map(|&g| self.import(to, g)).collect(),
                    params: self.import_pack(to, &func.params),
                    param_names: func.param_names,
                    returns: self.import_pack(to, &func.returns),
                };
                to.set(placeholder, TypeKind::Function(copy));
                placeholder
            }
            TypeKind::Table(table) => {
                let placeholder = to.add(TypeKind::Any);
                self.copied.insert(ty, placeholder);
                let mut copy = TableType::new(TableState::Sealed);
                copy.name = table.name.clone();
                for (name, prop) in &table.props {
                    let value = self.import(to, prop.ty);
                    copy.props.insert(name.clone(), Property { ty: value, deprecated: prop.deprecated });
                }
                if let Some((key, value)) = table.indexer {
                    copy.indexer = Some((self.import(to, key), self.import(to, value)));
                }
                copy.metatable = table.metatable.map(|mt| self.import(to, mt));
                to.set(placeholder, TypeKind::Table(copy));
                placeholder
            }
            TypeKind::Union(parts) => {
                let parts = parts.into_iter().map(|p| self.import(to, p)).collect();
                to.union(parts)
            }
            TypeKind::Intersection(parts) => {
                let parts = parts.into_iter().map(|p| self.import(to, p)).collect();
                to.add(TypeKind::Intersection(parts))
            }
            other => to.add(other),
        };
        self.depth -= 1;
        self.copied.insert(ty, copy);
        copy
    }

    fn import_pack(&mut self, to: &mut TypeArena, pack: &TypePack) -> TypePack {
        TypePack {
            head: pack.head.iter().map(|&t| self.import(to, t)).collect(),
            tail: pack.tail.map(|t| self.import(to, t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::display;

    fn identity(arena: &mut TypeArena) -> TypeId {
        let t = arena.add(TypeKind::Generic("T".into()));
        arena.function(FunctionType {
            generics: vec![t],
            params: TypePack::new(vec![t]),
            param_names: vec![Some("x".into())],
            returns: TypePack::new(vec![t]),
        })
    }

    #[test]
    fn test_instantiate_replaces_generics() {
        let mut arena = TypeArena::new();
        let id = identity(&mut arena);
        let inst = instantiate(&mut arena, id, 1);
        assert_ne!(inst, id);
        let func = arena.as_function(inst).cloned().unwrap();
        assert!(func.generics.is_empty());
        assert!(arena.is_free(func.params.head[0]));
        assert_eq!(arena.follow(func.params.head[0]), arena.follow(func.returns.head[0]));
        // the original stays generic
        assert_eq!(display(&arena, id), "<T>(x: T) -> T");
    }

    #[test]
    fn test_generalize_names_free_types() {
        let mut arena = TypeArena::new();
        let a = arena.fresh(1);
        let f = arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(vec![a]),
            param_names: vec![Some("x".into())],
            returns: TypePack::new(vec![a]),
        });
        generalize(&mut arena, f, 1);
        assert_eq!(display(&arena, f), "<a>(x: a) -> a");
    }

    #[test]
    fn test_generalize_skips_outer_levels() {
        let mut arena = TypeArena::new();
        let outer = arena.fresh(0);
        let f = arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(vec![outer]),
            param_names: vec![None],
            returns: TypePack::default(),
        });
        generalize(&mut arena, f, 1);
        assert!(arena.is_free(outer));
    }

    #[test]
    fn test_import_copies_structure() {
        let mut source = TypeArena::new();
        let mut table = TableType::new(TableState::Unsealed);
        table.props.insert("greet".into(), Property::new(TypeId::STRING));
        let t = source.table(table);

        let mut target = TypeArena::new();
        let mut importer = TypeImporter::new(&source, 100);
        let copy = importer.import(&mut target, t);
        assert_eq!(display(&target, copy), "{ greet: string }");
        assert_eq!(target.as_table(copy).map(|t| t.state), Some(TableState::Sealed));
    }

    #[test]
    fn test_import_handles_cycles() {
        let mut source = TypeArena::new();
        let t = source.table(TableType::new(TableState::Sealed));
        source.as_table_mut(t).map(|tt| tt.props.insert("me".into(), Property::new(t)));

        let mut target = TypeArena::new();
        let copy = TypeImporter::new(&source, 100).import(&mut target, t);
        let me = target.as_table(copy).map(|tt| tt.props["me"].ty);
        assert_eq!(me, Some(copy));
    }
}
