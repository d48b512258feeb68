//! Luau-style rendering of types

use rustc_hash::FxHashMap;

use crate::types::*;

/// Render a type the way Luau prints it in diagnostics and hovers
pub fn display(arena: &TypeArena, id: TypeId) -> String {
    TypeDisplay::new(arena).ty(id)
}

/// Render a return pack: `number`, `(number, string)` or `()`
pub fn display_pack(arena: &TypeArena, pack: &TypePack) -> String {
    TypeDisplay::new(arena).pack(pack, false)
}

const MAX_DISPLAY_DEPTH: usize = 40;

struct TypeDisplay<'a> {
    arena: &'a TypeArena,
    /// Types currently being printed, for cycle detection
    stack: Vec<TypeId>,
    free_names: FxHashMap<TypeId, String>,
}

impl<'a> TypeDisplay<'a> {
    fn new(arena: &'a TypeArena) -> Self {
        Self {
            arena,
            stack: Vec::new(),
            free_names: FxHashMap::default(),
        }
    }

    fn ty(&mut self, id: TypeId) -> String {
        let arena = self.arena;
        let id = arena.follow(id);
        if self.stack.contains(&id) {
            return "*CYCLE*".to_string();
        }
        if self.stack.len() > MAX_DISPLAY_DEPTH {
            return "*TOO COMPLEX*".to_string();
        }

        self.stack.push(id);
        let out = match arena.get(id) {
            TypeKind::Primitive(prim) => prim.name().to_string(),
            TypeKind::Any => "any".to_string(),
            TypeKind::Unknown => "unknown".to_string(),
            TypeKind::Never => "never".to_string(),
            TypeKind::Error => "*error-type*".to_string(),
            TypeKind::Singleton(Singleton::Bool(b)) => b.to_string(),
            TypeKind::Singleton(Singleton::String(s)) => format!("\"{}\"", s),
            TypeKind::Free { .. } => self.free_name(id),
            TypeKind::Bound(inner) => self.ty(*inner),
            TypeKind::Blocked => "*blocked*".to_string(),
            TypeKind::Generic(name) => name.clone(),
            TypeKind::Function(func) => self.function(func),
            TypeKind::Table(table) => self.table(table),
            TypeKind::Union(parts) => self.union(parts),
            TypeKind::Intersection(parts) => parts
                .iter()
                .map(|&p| self.wrapped(p))
                .collect::<Vec<_>>()
                .join(" & "),
        };
        self.stack.pop();
        out
    }

    fn free_name(&mut self, id: TypeId) -> String {
        let next = self.free_names.len();
        self.free_names
            .entry(id)
            .or_insert_with(|| {
                let letter = (b'a' + (next % 26) as u8) as char;
                match next / 26 {
                    0 => letter.to_string(),
                    n => format!("{}{}", letter, n),
                }
            })
            .clone()
    }

    /// Parenthesize types that would be ambiguous inside unions
    fn wrapped(&mut self, id: TypeId) -> String {
        let text = self.ty(id);
        match self.arena.kind(id) {
            TypeKind::Function(_) | TypeKind::Union(_) | TypeKind::Intersection(_) => {
                format!("({})", text)
            }
            _ => text,
        }
    }

    fn union(&mut self, parts: &[TypeId]) -> String {
        let has_nil = parts.iter().any(|&p| self.arena.follow(p) == TypeId::NIL);
        let rest: Vec<TypeId> = parts
            .iter()
            .copied()
            .filter(|&p| self.arena.follow(p) != TypeId::NIL)
            .collect();

        if !has_nil {
            return rest
                .iter()
                .map(|&p| self.wrapped_in_union(p))
                .collect::<Vec<_>>()
                .join(" | ");
        }

        match rest.len() {
            0 => "nil".to_string(),
            1 => format!("{}?", self.wrapped(rest[0])),
            _ => {
                let inner = rest
                    .iter()
                    .map(|&p| self.wrapped_in_union(p))
                    .collect::<Vec<_>>()
                    .join(" | ");
                format!("({})?", inner)
            }
        }
    }

    fn wrapped_in_union(&mut self, id: TypeId) -> String {
        match self.arena.kind(id) {
            TypeKind::Function(_) | TypeKind::Intersection(_) => self.wrapped(id),
            _ => self.ty(id),
        }
    }

    fn function(&mut self, func: &FunctionType) -> String {
        let mut out = String::new();
        if !func.generics.is_empty() {
            let names: Vec<String> = func.generics.iter().map(|&g| self.ty(g)).collect();
            out.push('<');
            out.push_str(&names.join(", "));
            out.push('>');
        }

        let mut params = Vec::new();
        for (i, &param) in func.params.head.iter().enumerate() {
            let ty = self.ty(param);
            match func.param_names.get(i).and_then(|n| n.as_deref()) {
                Some(name) => params.push(format!("{}: {}", name, ty)),
                None => params.push(ty),
            }
        }
        if let Some(tail) = func.params.tail {
            params.push(format!("...{}", self.ty(tail)));
        }
        out.push('(');
        out.push_str(&params.join(", "));
        out.push_str(") -> ");
        out.push_str(&self.pack(&func.returns, true));
        out
    }

    fn pack(&mut self, pack: &TypePack, in_return: bool) -> String {
        if pack.head.len() == 1 && pack.tail.is_none() {
            let only = pack.head[0];
            // a lone function return reads as a curried arrow
            return if in_return || !self.arena.is_function(only) {
                self.ty(only)
            } else {
                format!("({})", self.ty(only))
            };
        }
        if pack.head.is_empty() {
            if let Some(tail) = pack.tail {
                return format!("...{}", self.ty(tail));
            }
        }
        let mut parts: Vec<String> = pack.head.iter().map(|&t| self.ty(t)).collect();
        if let Some(tail) = pack.tail {
            parts.push(format!("...{}", self.ty(tail)));
        }
        format!("({})", parts.join(", "))
    }

    fn table(&mut self, table: &TableType) -> String {
        if let Some(name) = &table.name {
            return name.clone();
        }

        if table.props.is_empty() {
            if let Some((key, value)) = table.indexer {
                if self.arena.follow(key) == TypeId::NUMBER {
                    return format!("{{{}}}", self.ty(value));
                }
            }
        }

        let mut fields = Vec::new();
        if let Some((key, value)) = table.indexer {
            fields.push(format!("[{}]: {}", self.ty(key), self.ty(value)));
        }
        let mut names: Vec<&String> = table.props.keys().collect();
        names.sort();
        for name in names {
            let ty = self.ty(table.props[name].ty);
            fields.push(format!("{}: {}", name, ty));
        }

        if fields.is_empty() {
            "{  }".to_string()
        } else {
            format!("{{ {} }}", fields.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn func(arena: &mut TypeArena, params: Vec<TypeId>, returns: Vec<TypeId>) -> TypeId {
        let names = vec![None; params.len()];
        arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(params),
            param_names: names,
            returns: TypePack::new(returns),
        })
    }

    #[test]
    fn test_primitives_and_optional() {
        let mut arena = TypeArena::new();
        let opt = arena.optional(TypeId::NUMBER);
        assert_eq!(display(&arena, opt), "number?");
        let union = arena.union(vec![TypeId::NUMBER, TypeId::STRING, TypeId::NIL]);
        assert_eq!(display(&arena, union), "(number | string)?");
        assert_eq!(display(&arena, TypeId::ERROR), "*error-type*");
    }

    #[test]
    fn test_functions() {
        let mut arena = TypeArena::new();
        let unit = func(&mut arena, vec![], vec![]);
        assert_eq!(display(&arena, unit), "() -> ()");
        let f = arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(vec![TypeId::NUMBER]),
            param_names: vec![Some("x".to_string())],
            returns: TypePack::new(vec![TypeId::STRING, TypeId::BOOLEAN]),
        });
        assert_eq!(display(&arena, f), "(x: number) -> (string, boolean)");
        let opt = arena.optional(unit);
        assert_eq!(display(&arena, opt), "(() -> ())?");
    }

    #[test]
    fn test_tables() {
        let mut arena = TypeArena::new();
        let unit = func(&mut arena, vec![], vec![]);
        let mut table = TableType::new(TableState::Unsealed);
        table.props.insert("f".to_string(), Property::new(unit));
        let t = arena.table(table);
        assert_eq!(display(&arena, t), "{ f: () -> () }");

        let mut array = TableType::new(TableState::Sealed);
        array.indexer = Some((TypeId::NUMBER, TypeId::STRING));
        let a = arena.table(array);
        assert_eq!(display(&arena, a), "{string}");

        let empty = arena.table(TableType {
            props: IndexMap::new(),
            indexer: None,
            state: TableState::Unsealed,
            name: None,
            metatable: None,
        });
        assert_eq!(display(&arena, empty), "{  }");
    }

    #[test]
    fn test_generic_function() {
        let mut arena = TypeArena::new();
        let a = arena.add(TypeKind::Generic("a".to_string()));
        let f = arena.function(FunctionType {
            generics: vec![a],
            params: TypePack::new(vec![a]),
            param_names: vec![None],
            returns: TypePack::new(vec![a]),
        });
        assert_eq!(display(&arena, f), "<a>(a) -> a");
    }

    #[test]
    fn test_recursive_table_terminates() {
        let mut arena = TypeArena::new();
        let t = arena.table(TableType::new(TableState::Unsealed));
        if let Some(table) = arena.as_table_mut(t) {
            table.props.insert("self".to_string(), Property::new(t));
        }
        assert_eq!(display(&arena, t), "{ self: *CYCLE* }");
    }
}
