//! Name resolution pass
//!
//! Walks the program in syntactic order, binding declarations into the
//! scope stack and linking every identifier occurrence to its symbol.
//! User-level faults (duplicates, undeclared uses, bad field accesses) go
//! to the injected [`Reporter`]; the walk itself never unwinds on them, so
//! every independent fault in a program surfaces in one run.

use super::symbols::{Scope, Symbol, SymbolId, SymbolKind, SymbolTable};
use crate::ast::*;
use crate::diagnostics::Reporter;
use crate::types::Type;
use miette::Result;

/// Resolve every identifier in `program` and return the populated table.
///
/// The `Err` path is reserved for analyzer bugs (scope stack underflow and
/// the like), not for faults in the input program.
pub fn resolve(program: &mut Program, reporter: &mut Reporter) -> Result<SymbolTable> {
    let mut resolver = Resolver::new(reporter);
    resolver.resolve_program(program)?;
    Ok(resolver.into_table())
}

/// Name resolver. Owns the symbol table being built.
pub struct Resolver<'r> {
    symbols: SymbolTable,
    reporter: &'r mut Reporter,
}

impl<'r> Resolver<'r> {
    pub fn new(reporter: &'r mut Reporter) -> Self {
        Self {
            symbols: SymbolTable::new(),
            reporter,
        }
    }

    pub fn into_table(self) -> SymbolTable {
        self.symbols
    }

    /// Walk the whole program. The outermost scope stays open afterwards so
    /// later phases can reach the global bindings.
    pub fn resolve_program(&mut self, program: &mut Program) -> Result<()> {
        tracing::debug!(decls = program.decls.len(), "name analysis");
        self.symbols.push_scope();
        for decl in &mut program.decls {
            match decl {
                Decl::Var(decl) => self.resolve_var_decl(decl, None)?,
                Decl::Fn(decl) => self.resolve_fn_decl(decl)?,
                Decl::Struct(decl) => self.resolve_struct_decl(decl)?,
            }
        }
        Ok(())
    }

    /// Declaration of a variable or struct field. `fields` is the struct's
    /// own scope when the declaration is a field; duplicates are then
    /// judged against that scope, while struct type names still resolve
    /// through the enclosing scopes.
    fn resolve_var_decl(&mut self, decl: &mut VarDecl, fields: Option<&mut Scope>) -> Result<()> {
        let mut bad = false;
        let mut struct_def = None;

        match &mut decl.ty {
            TypeNode::Void => {
                self.reporter
                    .fatal(decl.name.pos, "Non-function declared void");
                bad = true;
            }
            TypeNode::Struct(type_id) => match self.symbols.lookup_global(&type_id.name)? {
                Some(def) if self.symbols.fields_of(def).is_some() => {
                    type_id.sym = Some(def);
                    struct_def = Some(def);
                }
                _ => {
                    self.reporter
                        .fatal(type_id.pos, "Invalid name of struct type");
                    bad = true;
                }
            },
            TypeNode::Int | TypeNode::Bool => {}
        }

        let duplicate = match &fields {
            Some(scope) => scope.contains(&decl.name.name),
            None => self.symbols.lookup_local(&decl.name.name).is_some(),
        };
        if duplicate {
            self.reporter
                .fatal(decl.name.pos, "Multiply declared identifier");
            bad = true;
        }

        if bad {
            return Ok(());
        }

        let kind = match struct_def {
            Some(def) => SymbolKind::StructVar { def },
            None => SymbolKind::Var {
                ty: decl.ty.to_type(),
            },
        };
        let sym = self.symbols.alloc(Symbol {
            name: decl.name.name.clone(),
            pos: decl.name.pos,
            kind,
        });
        match fields {
            Some(scope) => scope.insert(&decl.name.name, sym)?,
            None => self.symbols.add_decl(&decl.name.name, sym)?,
        }
        decl.name.sym = Some(sym);
        Ok(())
    }

    /// Formal parameter. Returns the declared type when the formal was
    /// actually bound, so the caller can assemble the function signature.
    fn resolve_formal_decl(&mut self, decl: &mut FormalDecl) -> Result<Option<Type>> {
        let mut bad = false;
        if matches!(decl.ty, TypeNode::Void) {
            self.reporter
                .fatal(decl.name.pos, "Non-function declared void");
            bad = true;
        }
        if self.symbols.lookup_local(&decl.name.name).is_some() {
            self.reporter
                .fatal(decl.name.pos, "Multiply declared identifier");
            bad = true;
        }
        if bad {
            return Ok(None);
        }

        let ty = decl.ty.to_type();
        let sym = self.symbols.alloc(Symbol {
            name: decl.name.name.clone(),
            pos: decl.name.pos,
            kind: SymbolKind::Var { ty: ty.clone() },
        });
        self.symbols.add_decl(&decl.name.name, sym)?;
        decl.name.sym = Some(sym);
        Ok(Some(ty))
    }

    /// Function declaration. A duplicate name is reported but the formals
    /// and body are still analyzed, in a scope of their own.
    fn resolve_fn_decl(&mut self, decl: &mut FnDecl) -> Result<()> {
        let mut fn_sym = None;
        if self.symbols.lookup_local(&decl.name.name).is_some() {
            self.reporter
                .fatal(decl.name.pos, "Multiply declared identifier");
        } else {
            let sym = self.symbols.alloc(Symbol {
                name: decl.name.name.clone(),
                pos: decl.name.pos,
                kind: SymbolKind::Fn {
                    formals: Vec::new(),
                    ret: decl.ret.to_type(),
                },
            });
            self.symbols.add_decl(&decl.name.name, sym)?;
            decl.name.sym = Some(sym);
            fn_sym = Some(sym);
        }

        // The body shares the formals' scope.
        self.symbols.push_scope();
        let mut formal_types = Vec::with_capacity(decl.formals.len());
        for formal in &mut decl.formals {
            if let Some(ty) = self.resolve_formal_decl(formal)? {
                formal_types.push(ty);
            }
        }
        if let Some(sym) = fn_sym
            && let SymbolKind::Fn { formals, .. } = &mut self.symbols.symbol_mut(sym).kind
        {
            *formals = formal_types;
        }
        self.resolve_block_in_current_scope(&mut decl.body)?;
        self.symbols.pop_scope()?;
        Ok(())
    }

    /// Struct declaration. Fields are analyzed into the struct's own scope
    /// either way; the definition is only bound when the name is fresh.
    fn resolve_struct_decl(&mut self, decl: &mut StructDecl) -> Result<()> {
        let duplicate = self.symbols.lookup_local(&decl.name.name).is_some();
        if duplicate {
            self.reporter
                .fatal(decl.name.pos, "Multiply declared identifier");
        }

        let mut fields = Scope::new();
        for field in &mut decl.fields {
            self.resolve_var_decl(field, Some(&mut fields))?;
        }

        if duplicate {
            return Ok(());
        }
        let sym = self.symbols.alloc(Symbol {
            name: decl.name.name.clone(),
            pos: decl.name.pos,
            kind: SymbolKind::StructDef { fields },
        });
        self.symbols.add_decl(&decl.name.name, sym)?;
        decl.name.sym = Some(sym);
        Ok(())
    }

    /// A nested block: if/else arms, while and repeat bodies.
    fn resolve_block(&mut self, block: &mut Block) -> Result<()> {
        self.symbols.push_scope();
        self.resolve_block_in_current_scope(block)?;
        self.symbols.pop_scope()?;
        Ok(())
    }

    fn resolve_block_in_current_scope(&mut self, block: &mut Block) -> Result<()> {
        for decl in &mut block.decls {
            self.resolve_var_decl(decl, None)?;
        }
        for stmt in &mut block.stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign(assign) => {
                self.resolve_expr(&mut assign.lhs)?;
                self.resolve_expr(&mut assign.rhs)?;
            }
            Stmt::PostInc(loc) | Stmt::PostDec(loc) => self.resolve_expr(loc)?,
            Stmt::Read(loc) => self.resolve_expr(loc)?,
            Stmt::Write(value) => self.resolve_expr(value)?,
            Stmt::If { cond, body } => {
                self.resolve_expr(cond)?;
                self.resolve_block(body)?;
            }
            Stmt::IfElse {
                cond,
                then_body,
                else_body,
            } => {
                self.resolve_expr(cond)?;
                self.resolve_block(then_body)?;
                self.resolve_block(else_body)?;
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond)?;
                self.resolve_block(body)?;
            }
            Stmt::Repeat { count, body } => {
                self.resolve_expr(count)?;
                self.resolve_block(body)?;
            }
            Stmt::Call(call) => self.resolve_call(call)?,
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expr(value)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::IntLit { .. } | Expr::StrLit { .. } | Expr::True { .. } | Expr::False { .. } => {}
            Expr::Id(id) => self.resolve_id(id)?,
            Expr::Dot(dot) => self.resolve_dot(dot)?,
            Expr::Assign(assign) => {
                self.resolve_expr(&mut assign.lhs)?;
                self.resolve_expr(&mut assign.rhs)?;
            }
            Expr::Call(call) => self.resolve_call(call)?,
            Expr::Unary { operand, .. } => self.resolve_expr(operand)?,
            Expr::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs)?;
                self.resolve_expr(rhs)?;
            }
        }
        Ok(())
    }

    /// Identifier use: link on hit, report once and leave unlinked on miss.
    fn resolve_id(&mut self, id: &mut Id) -> Result<()> {
        match self.symbols.lookup_global(&id.name)? {
            Some(sym) => id.sym = Some(sym),
            None => self.reporter.fatal(id.pos, "Undeclared identifier"),
        }
        Ok(())
    }

    fn resolve_call(&mut self, call: &mut CallExpr) -> Result<()> {
        self.resolve_id(&mut call.callee)?;
        for arg in &mut call.args {
            self.resolve_expr(arg)?;
        }
        Ok(())
    }

    /// Field access. Establishes which struct's field scope the right-hand
    /// id resolves in; the chain is marked `bad_access` after its first
    /// fault so one broken link yields exactly one diagnostic.
    fn resolve_dot(&mut self, dot: &mut DotAccess) -> Result<()> {
        let loc_pos = dot.loc.pos();
        let owner: Option<SymbolId> = match dot.loc.as_mut() {
            Expr::Id(id) => {
                self.resolve_id(id)?;
                match id.sym {
                    // Undeclared: already reported, stay silent.
                    None => {
                        dot.bad_access = true;
                        None
                    }
                    Some(sym) => match &self.symbols.symbol(sym).kind {
                        SymbolKind::StructVar { def } => Some(*def),
                        _ => {
                            self.reporter
                                .fatal(id.pos, "Dot-access of non-struct type");
                            dot.bad_access = true;
                            None
                        }
                    },
                }
            }
            Expr::Dot(inner) => {
                self.resolve_dot(inner)?;
                if inner.bad_access {
                    dot.bad_access = true;
                    None
                } else if let Some(def) = inner.struct_def {
                    Some(def)
                } else {
                    self.reporter
                        .fatal(loc_pos, "Dot-access of non-struct type");
                    dot.bad_access = true;
                    None
                }
            }
            other => {
                self.resolve_expr(other)?;
                self.reporter
                    .fatal(loc_pos, "Dot-access of non-struct type");
                dot.bad_access = true;
                None
            }
        };

        let Some(owner) = owner else {
            return Ok(());
        };

        let field_sym = self
            .symbols
            .fields_of(owner)
            .and_then(|fields| fields.get(&dot.field.name));
        match field_sym {
            None => {
                self.reporter
                    .fatal(dot.field.pos, "Invalid struct field name");
                dot.bad_access = true;
            }
            Some(sym) => {
                dot.field.sym = Some(sym);
                // A struct-typed field can anchor a further access.
                if let SymbolKind::StructVar { def } = &self.symbols.symbol(sym).kind {
                    dot.struct_def = Some(*def);
                }
            }
        }
        Ok(())
    }
}
