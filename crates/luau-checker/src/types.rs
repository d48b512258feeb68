//! Type representation and the per-module type arena

use indexmap::IndexMap;

/// Index of a type inside a `TypeArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub const NIL: TypeId = TypeId(0);
    pub const BOOLEAN: TypeId = TypeId(1);
    pub const NUMBER: TypeId = TypeId(2);
    pub const STRING: TypeId = TypeId(3);
    pub const THREAD: TypeId = TypeId(4);
    pub const BUFFER: TypeId = TypeId(5);
    pub const ANY: TypeId = TypeId(6);
    pub const UNKNOWN: TypeId = TypeId(7);
    pub const NEVER: TypeId = TypeId(8);
    pub const ERROR: TypeId = TypeId(9);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Nil,
    Boolean,
    Number,
    String,
    Thread,
    Buffer,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Nil => "nil",
            Primitive::Boolean => "boolean",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Thread => "thread",
            Primitive::Buffer => "buffer",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "nil" => Primitive::Nil,
            "boolean" => Primitive::Boolean,
            "number" => Primitive::Number,
            "string" => Primitive::String,
            "thread" => Primitive::Thread,
            "buffer" => Primitive::Buffer,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Singleton {
    Bool(bool),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Primitive(Primitive),
    Any,
    Unknown,
    Never,
    /// Produced after a reported error; behaves as `any`
    Error,
    Singleton(Singleton),
    /// Inference variable, bound once something is learned about it
    Free { level: u32 },
    Bound(TypeId),
    /// Result of a constraint that has not been solved yet
    Blocked,
    Generic(String),
    Function(FunctionType),
    Table(TableType),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
}

/// A list of values with an optional variadic tail element type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypePack {
    pub head: Vec<TypeId>,
    pub tail: Option<TypeId>,
}

impl TypePack {
    pub fn new(head: Vec<TypeId>) -> Self {
        Self { head, tail: None }
    }

    pub fn variadic(tail: TypeId) -> Self {
        Self {
            head: Vec::new(),
            tail: Some(tail),
        }
    }

    /// Type of the value at `index`, `nil` past the end
    pub fn get(&self, index: usize) -> TypeId {
        self.head
            .get(index)
            .copied()
            .or(self.tail)
            .unwrap_or(TypeId::NIL)
    }

    pub fn first(&self) -> TypeId {
        self.get(0)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub generics: Vec<TypeId>,
    pub params: TypePack,
    /// Parameter names, parallel to `params.head`
    pub param_names: Vec<Option<String>>,
    pub returns: TypePack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Shape is fixed (annotations, imports)
    Sealed,
    /// Table literals; assignment may add properties
    Unsealed,
    /// Shape inferred from how a free type is used; unification may add
    /// properties too
    Free,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub ty: TypeId,
    pub deprecated: bool,
}

impl Property {
    pub fn new(ty: TypeId) -> Self {
        Self { ty, deprecated: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableType {
    pub props: IndexMap<String, Property>,
    pub indexer: Option<(TypeId, TypeId)>,
    pub state: TableState,
    /// Display name for named tables such as library tables
    pub name: Option<String>,
    pub metatable: Option<TypeId>,
}

impl TableType {
    pub fn new(state: TableState) -> Self {
        Self {
            props: IndexMap::new(),
            indexer: None,
            state,
            name: None,
            metatable: None,
        }
    }
}

/// Storage for all types of one module
#[derive(Debug, Clone)]
pub struct TypeArena {
    types: Vec<TypeKind>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> Self {
        let types = vec![
            TypeKind::Primitive(Primitive::Nil),
            TypeKind::Primitive(Primitive::Boolean),
            TypeKind::Primitive(Primitive::Number),
            TypeKind::Primitive(Primitive::String),
            TypeKind::Primitive(Primitive::Thread),
            TypeKind::Primitive(Primitive::Buffer),
            TypeKind::Any,
            TypeKind::Unknown,
            TypeKind::Never,
            TypeKind::Error,
        ];
        Self { types }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Overwrite an entry in place, used to fill placeholders
    pub fn set(&mut self, id: TypeId, kind: TypeKind) {
        if id.index() > TypeId::ERROR.index() {
            self.types[id.index()] = kind;
        }
    }

    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    pub fn primitive(prim: Primitive) -> TypeId {
        match prim {
            Primitive::Nil => TypeId::NIL,
            Primitive::Boolean => TypeId::BOOLEAN,
            Primitive::Number => TypeId::NUMBER,
            Primitive::String => TypeId::STRING,
            Primitive::Thread => TypeId::THREAD,
            Primitive::Buffer => TypeId::BUFFER,
        }
    }

    /// Raw entry, without following bindings
    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeKind {
        let id = self.follow(id);
        &mut self.types[id.index()]
    }

    /// Follow `Bound` links to the representative type
    pub fn follow(&self, mut id: TypeId) -> TypeId {
        for _ in 0..self.types.len() {
            match self.types[id.index()] {
                TypeKind::Bound(next) if next != id => id = next,
                _ => return id,
            }
        }
        id
    }

    /// Kind of the representative type
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        self.get(self.follow(id))
    }

    /// Point an unresolved type at `to`
    pub fn bind(&mut self, id: TypeId, to: TypeId) {
        let id = self.follow(id);
        let to = self.follow(to);
        if id != to && id.index() > TypeId::ERROR.index() {
            self.types[id.index()] = TypeKind::Bound(to);
        }
    }

    pub fn fresh(&mut self, level: u32) -> TypeId {
        self.add(TypeKind::Free { level })
    }

    pub fn blocked(&mut self) -> TypeId {
        self.add(TypeKind::Blocked)
    }

    pub fn is_free(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Free { .. })
    }

    pub fn is_blocked(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Blocked)
    }

    /// `any`, `*error-type*` and friends that accept everything
    pub fn is_any_like(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Any | TypeKind::Error)
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Function(_))
    }

    pub fn function(&mut self, func: FunctionType) -> TypeId {
        self.add(TypeKind::Function(func))
    }

    pub fn table(&mut self, table: TableType) -> TypeId {
        self.add(TypeKind::Table(table))
    }

    pub fn string_singleton(&mut self, value: &str) -> TypeId {
        self.add(TypeKind::Singleton(Singleton::String(value.to_string())))
    }

    pub fn bool_singleton(&mut self, value: bool) -> TypeId {
        self.add(TypeKind::Singleton(Singleton::Bool(value)))
    }

    pub fn as_table(&self, id: TypeId) -> Option<&TableType> {
        match self.kind(id) {
            TypeKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self, id: TypeId) -> Option<&mut TableType> {
        match self.get_mut(id) {
            TypeKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_function(&self, id: TypeId) -> Option<&FunctionType> {
        match self.kind(id) {
            TypeKind::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Union of `parts`, flattened and deduplicated. A single part is
    /// returned as is, and `any` absorbs everything.
    pub fn union(&mut self, parts: Vec<TypeId>) -> TypeId {
        let mut flat: Vec<TypeId> = Vec::new();
        for part in parts {
            let part = self.follow(part);
            match self.get(part) {
                TypeKind::Any | TypeKind::Error => return part,
                TypeKind::Never => {}
                TypeKind::Union(inner) => {
                    for &t in inner.iter() {
                        let t = self.follow(t);
                        if !self.contains_equivalent(&flat, t) {
                            flat.push(t);
                        }
                    }
                }
                _ => {
                    if !self.contains_equivalent(&flat, part) {
                        flat.push(part);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => self.add(TypeKind::Union(flat)),
        }
    }

    fn contains_equivalent(&self, list: &[TypeId], ty: TypeId) -> bool {
        list.iter().any(|&other| {
            other == ty
                || match (self.get(other), self.get(ty)) {
                    (TypeKind::Singleton(a), TypeKind::Singleton(b)) => a == b,
                    _ => false,
                }
        })
    }

    /// `T?`
    pub fn optional(&mut self, id: TypeId) -> TypeId {
        self.union(vec![id, TypeId::NIL])
    }

    pub fn is_optional(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Union(parts) => parts.iter().any(|&p| self.follow(p) == TypeId::NIL),
            _ => false,
        }
    }

    /// Remove `nil` from a union
    pub fn strip_nil(&mut self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Union(parts) => {
                let rest: Vec<TypeId> = parts
                    .iter()
                    .copied()
                    .filter(|&p| self.follow(p) != TypeId::NIL)
                    .collect();
                self.union(rest)
            }
            _ => self.follow(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids() {
        let arena = TypeArena::new();
        assert_eq!(arena.get(TypeId::NUMBER), &TypeKind::Primitive(Primitive::Number));
        assert_eq!(arena.get(TypeId::ERROR), &TypeKind::Error);
    }

    #[test]
    fn test_bind_and_follow() {
        let mut arena = TypeArena::new();
        let a = arena.fresh(0);
        let b = arena.fresh(0);
        arena.bind(a, b);
        arena.bind(b, TypeId::STRING);
        assert_eq!(arena.follow(a), TypeId::STRING);
    }

    #[test]
    fn test_builtins_cannot_be_rebound() {
        let mut arena = TypeArena::new();
        arena.bind(TypeId::NUMBER, TypeId::STRING);
        assert_eq!(arena.follow(TypeId::NUMBER), TypeId::NUMBER);
    }

    #[test]
    fn test_union_flattens_and_dedupes() {
        let mut arena = TypeArena::new();
        let inner = arena.union(vec![TypeId::NUMBER, TypeId::STRING]);
        let outer = arena.union(vec![inner, TypeId::NUMBER, TypeId::NIL]);
        match arena.kind(outer) {
            TypeKind::Union(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected union, got {:?}", other),
        }
        assert!(arena.is_optional(outer));
        assert_eq!(arena.union(vec![TypeId::NUMBER, TypeId::ANY]), TypeId::ANY);
        assert_eq!(arena.union(vec![TypeId::NUMBER]), TypeId::NUMBER);
    }

    #[test]
    fn test_strip_nil() {
        let mut arena = TypeArena::new();
        let opt = arena.optional(TypeId::NUMBER);
        assert_eq!(arena.strip_nil(opt), TypeId::NUMBER);
    }
}
