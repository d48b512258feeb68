//! Structural subtyping with eager binding of free types
//!
//! `Unifier::unify` answers "is `sub` a subtype of `sup`" and, while doing
//! so, binds free types and grows tables whose shape is still being
//! inferred. `Unifier::is_subtype` runs the same rules without side effects.

use rustc_hash::FxHashSet;

use crate::instantiate::instantiate;
use crate::types::*;

pub struct Unifier<'a> {
    arena: &'a mut TypeArena,
    max_depth: usize,
    depth: usize,
    /// Pairs assumed to hold while comparing recursive types
    assumptions: FxHashSet<(TypeId, TypeId)>,
    bind: bool,
    pub too_complex: bool,
}

impl<'a> Unifier<'a> {
    pub fn new(arena: &'a mut TypeArena, max_depth: usize) -> Self {
        Self {
            arena,
            max_depth,
            depth: 0,
            assumptions: FxHashSet::default(),
            bind: true,
            too_complex: false,
        }
    }

    /// Check `sub <: sup`, binding free types along the way
    pub fn unify(&mut self, sub: TypeId, sup: TypeId) -> bool {
        self.bind = true;
        self.relate(sub, sup)
    }

    /// Check `sub <: sup` without changing any type
    pub fn is_subtype(&mut self, sub: TypeId, sup: TypeId) -> bool {
        self.bind = false;
        self.relate(sub, sup)
    }

    /// Try a relation without side effects, restoring the binding mode after
    fn trial(&mut self, sub: TypeId, sup: TypeId) -> bool {
        let bind = self.bind;
        self.bind = false;
        let ok = self.relate(sub, sup);
        self.bind = bind;
        ok
    }

    fn relate(&mut self, sub: TypeId, sup: TypeId) -> bool {
        let sub = self.arena.follow(sub);
        let sup = self.arena.follow(sup);
        if sub == sup {
            return true;
        }
        if self.depth >= self.max_depth {
            self.too_complex = true;
            return true;
        }
        if !self.assumptions.insert((sub, sup)) {
            return true;
        }

        self.depth += 1;
        let ok = self.relate_kinds(sub, sup);
        self.depth -= 1;
        self.assumptions.remove(&(sub, sup));
        ok
    }

    fn relate_kinds(&mut self, sub: TypeId, sup: TypeId) -> bool {
        match (self.arena.get(sub), self.arena.get(sup)) {
            (TypeKind::Free { .. }, _) => {
                if self.bind {
                    self.arena.bind(sub, sup);
                }
                true
            }
            (_, TypeKind::Free { .. }) => {
                if self.bind {
                    self.arena.bind(sup, sub);
                }
                true
            }
            (TypeKind::Blocked, _) | (_, TypeKind::Blocked) => true,
            (TypeKind::Any | TypeKind::Error, _) | (_, TypeKind::Any | TypeKind::Error) => true,
            (_, TypeKind::Unknown) | (TypeKind::Never, _) => true,
            (TypeKind::Unknown, _) => false,
            (TypeKind::Union(parts), _) => {
                let parts = parts.clone();
                parts.into_iter().fold(true, |ok, part| self.relate(part, sup) && ok)
            }
            (_, TypeKind::Union(options)) => {
                let options = options.clone();
                self.relate_to_any(sub, &options)
            }
            (TypeKind::Intersection(parts), _) => {
                let parts = parts.clone();
                self.relate_from_any(&parts, sup)
            }
            (_, TypeKind::Intersection(parts)) => {
                let parts = parts.clone();
                parts.into_iter().fold(true, |ok, part| self.relate(sub, part) && ok)
            }
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => a == b,
            (TypeKind::Singleton(Singleton::Bool(_)), TypeKind::Primitive(Primitive::Boolean)) => true,
            (TypeKind::Singleton(Singleton::String(_)), TypeKind::Primitive(Primitive::String)) => true,
            (TypeKind::Singleton(a), TypeKind::Singleton(b)) => a == b,
            (TypeKind::Generic(a), TypeKind::Generic(b)) => a == b,
            (TypeKind::Function(_), TypeKind::Function(_)) => self.relate_functions(sub, sup),
            (TypeKind::Table(_), TypeKind::Table(_)) => self.relate_tables(sub, sup),
            _ => false,
        }
    }

    /// `sub` must fit one of the options; the first fitting one is committed
    fn relate_to_any(&mut self, sub: TypeId, options: &[TypeId]) -> bool {
        match options.iter().copied().find(|&option| self.trial(sub, option)) {
            Some(option) => self.relate(sub, option),
            None => false,
        }
    }

    fn relate_from_any(&mut self, parts: &[TypeId], sup: TypeId) -> bool {
        match parts.iter().copied().find(|&part| self.trial(part, sup)) {
            Some(part) => self.relate(part, sup),
            None => false,
        }
    }

    fn relate_functions(&mut self, sub: TypeId, sup: TypeId) -> bool {
        let sub = if self.bind {
            instantiate(self.arena, sub, u32::MAX)
        } else {
            sub
        };
        let (Some(f), Some(g)) = (self.arena.as_function(sub), self.arena.as_function(sup)) else {
            return false;
        };
        let (f, g) = (f.clone(), g.clone());

        let mut ok = true;
        // parameters are contravariant; extra parameters of `sub` are fine
        for (i, &wanted) in g.params.head.iter().enumerate() {
            let accepted = f.params.head.get(i).copied().or(f.params.tail);
            if let Some(accepted) = accepted {
                ok &= self.relate(wanted, accepted);
            }
        }
        if let (Some(wanted), Some(accepted)) = (g.params.tail, f.params.tail) {
            ok &= self.relate(wanted, accepted);
        }
        for (i, &promised) in g.returns.head.iter().enumerate() {
            ok &= self.relate(f.returns.get(i), promised);
        }
        ok
    }

    fn relate_tables(&mut self, sub: TypeId, sup: TypeId) -> bool {
        let (Some(a), Some(b)) = (self.arena.as_table(sub), self.arena.as_table(sup)) else {
            return false;
        };
        let (a, b) = (a.clone(), b.clone());
        let growable = a.state == TableState::Free;

        let mut ok = true;
        for (name, prop) in &b.props {
            if let Some(own) = a.props.get(name) {
                ok &= self.relate(own.ty, prop.ty);
            } else if let Some((_, value)) = a.indexer.filter(|&(key, _)| self.trial(TypeId::STRING, key)) {
                ok &= self.relate(value, prop.ty);
            } else if self.accepts_nil(prop.ty) {
                continue;
            } else if growable && self.bind {
                if let Some(table) = self.arena.as_table_mut(sub) {
                    table.props.insert(name.clone(), prop.clone());
                }
            } else if !growable {
                ok = false;
            }
        }

        if let Some((key, value)) = b.indexer {
            match a.indexer {
                Some((own_key, own_value)) => {
                    ok &= self.relate(key, own_key) && self.relate(own_value, value);
                }
                None if a.props.is_empty() && a.state != TableState::Sealed => {
                    if self.bind {
                        if let Some(table) = self.arena.as_table_mut(sub) {
                            table.indexer = Some((key, value));
                        }
                    }
                }
                None if a.state != TableState::Sealed => {
                    for prop in a.props.values() {
                        ok &= self.relate(prop.ty, value);
                    }
                    ok &= self.trial(TypeId::STRING, key);
                }
                None => ok = false,
            }
        }

        ok
    }

    fn accepts_nil(&mut self, ty: TypeId) -> bool {
        !self.arena.is_free(ty) && self.trial(TypeId::NIL, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(arena: &mut TypeArena, state: TableState, props: &[(&str, TypeId)]) -> TypeId {
        let mut table = TableType::new(state);
        for (name, ty) in props {
            table.props.insert(name.to_string(), Property::new(*ty));
        }
        arena.table(table)
    }

    #[test]
    fn test_primitive_rules() {
        let mut arena = TypeArena::new();
        let hello = arena.string_singleton("hello");
        let mut u = Unifier::new(&mut arena, 100);
        assert!(u.is_subtype(TypeId::NUMBER, TypeId::NUMBER));
        assert!(!u.is_subtype(TypeId::STRING, TypeId::NUMBER));
        assert!(u.is_subtype(hello, TypeId::STRING));
        assert!(!u.is_subtype(TypeId::STRING, hello));
        assert!(u.is_subtype(TypeId::STRING, TypeId::UNKNOWN));
        assert!(!u.is_subtype(TypeId::UNKNOWN, TypeId::STRING));
        assert!(u.is_subtype(TypeId::NEVER, TypeId::STRING));
        assert!(u.is_subtype(TypeId::ANY, TypeId::STRING));
    }

    #[test]
    fn test_unions() {
        let mut arena = TypeArena::new();
        let opt = arena.optional(TypeId::NUMBER);
        let mut u = Unifier::new(&mut arena, 100);
        assert!(u.is_subtype(TypeId::NIL, opt));
        assert!(u.is_subtype(TypeId::NUMBER, opt));
        assert!(!u.is_subtype(opt, TypeId::NUMBER));
    }

    #[test]
    fn test_free_types_are_bound() {
        let mut arena = TypeArena::new();
        let free = arena.fresh(1);
        {
            let mut u = Unifier::new(&mut arena, 100);
            assert!(u.unify(free, TypeId::NUMBER));
        }
        assert_eq!(arena.follow(free), TypeId::NUMBER);
    }

    #[test]
    fn test_is_subtype_does_not_bind() {
        let mut arena = TypeArena::new();
        let free = arena.fresh(1);
        {
            let mut u = Unifier::new(&mut arena, 100);
            assert!(u.is_subtype(free, TypeId::NUMBER));
        }
        assert!(arena.is_free(free));
    }

    #[test]
    fn test_sealed_width_subtyping() {
        let mut arena = TypeArena::new();
        let wide = table(&mut arena, TableState::Sealed, &[("x", TypeId::NUMBER), ("y", TypeId::NUMBER)]);
        let narrow = table(&mut arena, TableState::Sealed, &[("x", TypeId::NUMBER)]);
        let mut u = Unifier::new(&mut arena, 100);
        assert!(u.is_subtype(wide, narrow));
        assert!(!u.is_subtype(narrow, wide));
    }

    #[test]
    fn test_free_table_grows() {
        let mut arena = TypeArena::new();
        let inferred = table(&mut arena, TableState::Free, &[]);
        let wanted = table(&mut arena, TableState::Sealed, &[("name", TypeId::STRING)]);
        {
            let mut u = Unifier::new(&mut arena, 100);
            assert!(u.unify(inferred, wanted));
        }
        assert!(arena.as_table(inferred).is_some_and(|t| t.props.contains_key("name")));
    }

    #[test]
    fn test_function_variance() {
        let mut arena = TypeArena::new();
        let opt = arena.optional(TypeId::NUMBER);
        let takes_opt = arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(vec![opt]),
            param_names: vec![None],
            returns: TypePack::new(vec![TypeId::NUMBER]),
        });
        let takes_number = arena.function(FunctionType {
            generics: Vec::new(),
            params: TypePack::new(vec![TypeId::NUMBER]),
            param_names: vec![None],
            returns: TypePack::new(vec![opt]),
        });
        let mut u = Unifier::new(&mut arena, 100);
        assert!(u.is_subtype(takes_opt, takes_number));
        assert!(!u.is_subtype(takes_number, takes_opt));
    }

    #[test]
    fn test_recursive_tables_terminate() {
        let mut arena = TypeArena::new();
        let a = table(&mut arena, TableState::Sealed, &[]);
        let b = table(&mut arena, TableState::Sealed, &[]);
        arena.as_table_mut(a).map(|t| t.props.insert("next".into(), Property::new(a)));
        arena.as_table_mut(b).map(|t| t.props.insert("next".into(), Property::new(b)));
        let mut u = Unifier::new(&mut arena, 100);
        assert!(u.is_subtype(a, b));
    }

    #[test]
    fn test_depth_limit_flags_complexity() {
        let mut arena = TypeArena::new();
        let a = table(&mut arena, TableState::Sealed, &[]);
        let b = table(&mut arena, TableState::Sealed, &[]);
        arena.as_table_mut(a).map(|t| t.props.insert("next".into(), Property::new(a)));
        arena.as_table_mut(b).map(|t| t.props.insert("next".into(), Property::new(b)));
        let mut u = Unifier::new(&mut arena, 1);
        assert!(u.is_subtype(a, b));
        assert!(u.too_complex);
    }
}
