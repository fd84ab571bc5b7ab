//! Name analysis: binding every identifier occurrence to a declaration.

pub mod resolver;
pub mod symbols;

pub use resolver::{Resolver, resolve};
pub use symbols::{Scope, Symbol, SymbolId, SymbolKind, SymbolTable, SymbolTableError};
