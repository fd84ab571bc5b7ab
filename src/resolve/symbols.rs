//! Symbol table implementation
//!
//! A stack of scopes over an arena of symbol records. Scopes come and go
//! with lexical blocks; the records themselves stay in the arena so
//! identifier nodes can hold on to [`SymbolId`] handles across both
//! analysis passes. Struct definitions own a field scope of their own,
//! reachable only through the defining symbol.

use crate::common::Pos;
use crate::types::Type;
use id_arena::{Arena, Id as ArenaId};
use indexmap::IndexMap;
use miette::Diagnostic;
use thiserror::Error;

/// Handle to a symbol record in the table's arena.
pub type SymbolId = ArenaId<Symbol>;

/// Failure modes of the table itself.
///
/// `Duplicate` is the only kind a well-formed analyzer run translates into
/// a user diagnostic; the others indicate an analyzer bug.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum SymbolTableError {
    #[error("symbol table has no open scope")]
    EmptyTable,

    #[error("duplicate declaration of `{name}` in the current scope")]
    Duplicate { name: String },

    #[error("symbol table operation on an empty name")]
    InvalidArgument,
}

/// One declared name.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Position of the declaring occurrence.
    pub pos: Pos,
    pub kind: SymbolKind,
}

/// Binding payload of a symbol.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// Ordinary value binding: locals, globals, formals, non-struct fields.
    Var { ty: Type },
    /// Function binding. `formals` is populated exactly once, after the
    /// function's formal declarations have been analyzed.
    Fn { formals: Vec<Type>, ret: Type },
    /// Variable (or field) of struct type, referencing the definition.
    StructVar { def: SymbolId },
    /// Struct definition owning its field scope. Fields are reachable only
    /// through this symbol, never by unqualified lookup.
    StructDef { fields: Scope },
}

/// A single level of the scope stack: the names bound at one lexical level.
///
/// Insertion order is preserved so dumps and struct field listings stay
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: IndexMap<String, SymbolId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` in this scope; a name already bound here is rejected.
    pub fn insert(&mut self, name: &str, id: SymbolId) -> Result<(), SymbolTableError> {
        if name.is_empty() {
            return Err(SymbolTableError::InvalidArgument);
        }
        if self.bindings.contains_key(name) {
            return Err(SymbolTableError::Duplicate {
                name: name.to_string(),
            });
        }
        self.bindings.insert(name.to_string(), id);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.bindings.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.bindings.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Symbol table: scope stack plus symbol arena.
///
/// Lookup walks the stack innermost-first; shadowing across scopes is
/// permitted, duplicates within one scope are not.
#[derive(Debug, Default)]
pub struct SymbolTable {
    arena: Arena<Symbol>,
    scopes: Vec<Scope>,
}

impl SymbolTable {
    /// Create a table with no open scope; the name-analysis walk opens the
    /// outermost scope itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new empty scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the innermost scope.
    pub fn pop_scope(&mut self) -> Result<Scope, SymbolTableError> {
        self.scopes.pop().ok_or(SymbolTableError::EmptyTable)
    }

    /// Whether no scope is open.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Current scope depth.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Allocate a symbol record; binding it to a name is a separate step.
    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        self.arena.alloc(symbol)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.arena[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id]
    }

    /// Bind `name` in the innermost scope.
    pub fn add_decl(&mut self, name: &str, id: SymbolId) -> Result<(), SymbolTableError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or(SymbolTableError::EmptyTable)?;
        scope.insert(name, id)
    }

    /// Look `name` up in the innermost scope only.
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.scopes.last().and_then(|scope| scope.get(name))
    }

    /// Look `name` up from the innermost scope outward.
    pub fn lookup_global(&self, name: &str) -> Result<Option<SymbolId>, SymbolTableError> {
        if self.scopes.is_empty() {
            return Err(SymbolTableError::EmptyTable);
        }
        Ok(self.scopes.iter().rev().find_map(|scope| scope.get(name)))
    }

    /// The outermost scope, holding the program's global bindings.
    pub fn global_scope(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    /// The static type a symbol binds.
    pub fn type_of(&self, id: SymbolId) -> Type {
        match &self.arena[id].kind {
            SymbolKind::Var { ty } => ty.clone(),
            SymbolKind::Fn { formals, ret } => Type::Fn {
                formals: formals.clone(),
                ret: Box::new(ret.clone()),
            },
            SymbolKind::StructVar { def } => Type::Struct(self.arena[*def].name.clone()),
            SymbolKind::StructDef { .. } => Type::StructDef(self.arena[id].name.clone()),
        }
    }

    /// Field scope of a struct-definition symbol.
    pub fn fields_of(&self, id: SymbolId) -> Option<&Scope> {
        match &self.arena[id].kind {
            SymbolKind::StructDef { fields } => Some(fields),
            _ => None,
        }
    }
}
