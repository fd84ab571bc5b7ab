//! Type checker for C--
//!
//! Top-down recursion over a name-analyzed AST: every expression yields a
//! [`Type`], every statement an ok-flag. `Type::Error` absorbs silently, so
//! one fault in a subexpression never produces a second diagnostic further
//! up. The walk keeps going after a failing statement; the result is the
//! conjunction of every statement's outcome.

use crate::ast::*;
use crate::common::Pos;
use crate::diagnostics::Reporter;
use crate::resolve::symbols::{SymbolKind, SymbolTable};
use crate::types::Type;
use miette::{Result, miette};

/// Type check `program`, reporting every violation through `reporter`.
///
/// Returns whether the program checked clean. Expects a successfully
/// name-analyzed AST: an unlinked identifier is a resolver bug and
/// surfaces as `Err`, not as a user diagnostic.
pub fn check(program: &Program, symbols: &SymbolTable, reporter: &mut Reporter) -> Result<bool> {
    let mut checker = TypeChecker { symbols, reporter };
    checker.check_program(program)
}

/// Type checker state.
pub struct TypeChecker<'c> {
    symbols: &'c SymbolTable,
    reporter: &'c mut Reporter,
}

impl TypeChecker<'_> {
    pub fn check_program(&mut self, program: &Program) -> Result<bool> {
        tracing::debug!(decls = program.decls.len(), "type check");
        let mut ok = true;
        for decl in &program.decls {
            // Variable and struct declarations have nothing left to check
            // after name analysis.
            if let Decl::Fn(decl) = decl {
                ok &= self.check_fn(decl)?;
            }
        }
        Ok(ok)
    }

    fn check_fn(&mut self, decl: &FnDecl) -> Result<bool> {
        let ret = decl.ret.to_type();
        self.check_block(&decl.body, &ret)
    }

    fn check_block(&mut self, block: &Block, ret: &Type) -> Result<bool> {
        let mut ok = true;
        for stmt in &block.stmts {
            ok &= self.check_stmt(stmt, ret)?;
        }
        Ok(ok)
    }

    fn check_stmt(&mut self, stmt: &Stmt, ret: &Type) -> Result<bool> {
        match stmt {
            Stmt::Assign(assign) => Ok(!self.check_assign(assign)?.is_error()),

            Stmt::PostInc(loc) | Stmt::PostDec(loc) => {
                let ty = self.check_expr(loc)?;
                if ty == Type::Int {
                    return Ok(true);
                }
                if !ty.is_error() {
                    self.reporter.fatal(
                        loc.pos(),
                        "Arithmetic operator applied to non-numeric operand",
                    );
                }
                Ok(false)
            }

            Stmt::Read(loc) => {
                let ty = self.check_expr(loc)?;
                let message = match ty {
                    Type::Fn { .. } => Some("Attempt to read a function"),
                    Type::StructDef(_) => Some("Attempt to read a struct name"),
                    Type::Struct(_) => Some("Attempt to read a struct variable"),
                    _ => None,
                };
                if let Some(message) = message {
                    self.reporter.fatal(loc.pos(), message);
                    return Ok(false);
                }
                Ok(!ty.is_error())
            }

            Stmt::Write(value) => {
                let ty = self.check_expr(value)?;
                let message = match ty {
                    Type::Fn { .. } => Some("Attempt to write a function"),
                    Type::StructDef(_) => Some("Attempt to write a struct name"),
                    Type::Struct(_) => Some("Attempt to write a struct variable"),
                    Type::Void => Some("Attempt to write void"),
                    _ => None,
                };
                if let Some(message) = message {
                    self.reporter.fatal(value.pos(), message);
                    return Ok(false);
                }
                Ok(!ty.is_error())
            }

            Stmt::If { cond, body } => {
                let cond_ok = self.check_cond(cond, "Non-bool expression used as an if condition")?;
                let body_ok = self.check_block(body, ret)?;
                Ok(cond_ok && body_ok)
            }

            Stmt::IfElse {
                cond,
                then_body,
                else_body,
            } => {
                let cond_ok = self.check_cond(cond, "Non-bool expression used as an if condition")?;
                let then_ok = self.check_block(then_body, ret)?;
                let else_ok = self.check_block(else_body, ret)?;
                Ok(cond_ok && then_ok && else_ok)
            }

            Stmt::While { cond, body } => {
                let cond_ok =
                    self.check_cond(cond, "Non-bool expression used as a while condition")?;
                let body_ok = self.check_block(body, ret)?;
                Ok(cond_ok && body_ok)
            }

            Stmt::Repeat { count, body } => {
                let ty = self.check_expr(count)?;
                let mut count_ok = true;
                if ty != Type::Int {
                    if !ty.is_error() {
                        self.reporter.fatal(
                            count.pos(),
                            "Non-integer expression used as a repeat clause",
                        );
                    }
                    count_ok = false;
                }
                let body_ok = self.check_block(body, ret)?;
                Ok(count_ok && body_ok)
            }

            Stmt::Call(call) => Ok(!self.check_call(call)?.is_error()),

            Stmt::Return(value) => self.check_return(value.as_ref(), ret),
        }
    }

    fn check_cond(&mut self, cond: &Expr, message: &str) -> Result<bool> {
        let ty = self.check_expr(cond)?;
        if ty == Type::Bool {
            return Ok(true);
        }
        if !ty.is_error() {
            self.reporter.fatal(cond.pos(), message);
        }
        Ok(false)
    }

    fn check_return(&mut self, value: Option<&Expr>, ret: &Type) -> Result<bool> {
        match value {
            None => {
                if *ret != Type::Void {
                    // A value-less return in a non-void function has no
                    // carrier token to anchor to.
                    self.reporter.fatal(Pos::ZERO, "Missing return value");
                    return Ok(false);
                }
                Ok(true)
            }
            Some(value) => {
                let ty = self.check_expr(value)?;
                if *ret == Type::Void {
                    self.reporter
                        .fatal(value.pos(), "Return with a value in a void function");
                    return Ok(false);
                }
                if ty.is_error() {
                    return Ok(false);
                }
                if ty != *ret {
                    self.reporter.fatal(value.pos(), "Bad return value");
                    return Ok(false);
                }
                Ok(true)
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type> {
        match expr {
            Expr::IntLit { .. } => Ok(Type::Int),
            Expr::StrLit { .. } => Ok(Type::Str),
            Expr::True { .. } | Expr::False { .. } => Ok(Type::Bool),
            Expr::Id(id) => self.type_of_id(id),
            Expr::Dot(dot) => self.type_of_id(&dot.field),
            Expr::Assign(assign) => self.check_assign(assign),
            Expr::Call(call) => self.check_call(call),
            Expr::Unary { op, operand } => self.check_unary(*op, operand),
            Expr::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs),
        }
    }

    /// Every reachable id is linked once name analysis succeeds; a gap here
    /// is a bug in the resolver, not in the input program.
    fn type_of_id(&self, id: &Id) -> Result<Type> {
        let sym = id.sym.ok_or_else(|| {
            miette!(
                "internal error: unresolved identifier `{}` at {}",
                id.name,
                id.pos
            )
        })?;
        Ok(self.symbols.type_of(sym))
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Type> {
        let ty = self.check_expr(operand)?;
        if ty.is_error() {
            return Ok(Type::Error);
        }
        match op {
            UnaryOp::Neg => {
                if ty == Type::Int {
                    Ok(Type::Int)
                } else {
                    self.reporter.fatal(
                        operand.pos(),
                        "Arithmetic operator applied to non-numeric operand",
                    );
                    Ok(Type::Error)
                }
            }
            UnaryOp::Not => {
                if ty == Type::Bool {
                    Ok(Type::Bool)
                } else {
                    self.reporter
                        .fatal(operand.pos(), "Logical operator applied to non-bool operand");
                    Ok(Type::Error)
                }
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Type> {
        use BinaryOp::*;
        match op {
            Plus | Minus | Times | Divide => self.check_operands(
                lhs,
                rhs,
                Type::Int,
                Type::Int,
                "Arithmetic operator applied to non-numeric operand",
            ),
            Less | Greater | LessEq | GreaterEq => self.check_operands(
                lhs,
                rhs,
                Type::Int,
                Type::Bool,
                "Relational operator applied to non-numeric operand",
            ),
            And | Or => self.check_operands(
                lhs,
                rhs,
                Type::Bool,
                Type::Bool,
                "Logical operator applied to non-bool operand",
            ),
            Eq | NotEq => self.check_equality(lhs, rhs),
        }
    }

    /// Shared operand discipline: both operands must have `operand_ty`, and
    /// each violating operand gets its own diagnostic at its own position.
    fn check_operands(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        operand_ty: Type,
        result: Type,
        message: &str,
    ) -> Result<Type> {
        let lt = self.check_expr(lhs)?;
        let rt = self.check_expr(rhs)?;
        let mut ok = true;
        if !lt.is_error() && lt != operand_ty {
            self.reporter.fatal(lhs.pos(), message);
            ok = false;
        }
        if !rt.is_error() && rt != operand_ty {
            self.reporter.fatal(rhs.pos(), message);
            ok = false;
        }
        if ok && !lt.is_error() && !rt.is_error() {
            Ok(result)
        } else {
            Ok(Type::Error)
        }
    }

    /// Equality diagnostics follow a fixed priority; at most one fires,
    /// anchored at the left operand.
    fn check_equality(&mut self, lhs: &Expr, rhs: &Expr) -> Result<Type> {
        let lt = self.check_expr(lhs)?;
        let rt = self.check_expr(rhs)?;

        let message = if lt == Type::Void && rt == Type::Void {
            Some("Equality operator applied to void functions")
        } else if lt.is_fn() && rt.is_fn() {
            Some("Equality operator applied to functions")
        } else if lt.is_struct_def() && rt.is_struct_def() {
            Some("Equality operator applied to struct names")
        } else if lt.is_struct_var() && rt.is_struct_var() {
            Some("Equality operator applied to struct variables")
        } else {
            None
        };
        if let Some(message) = message {
            self.reporter.fatal(lhs.pos(), message);
            return Ok(Type::Error);
        }
        if lt.is_error() || rt.is_error() {
            return Ok(Type::Error);
        }
        if lt != rt {
            self.reporter.fatal(lhs.pos(), "Type mismatch");
            return Ok(Type::Error);
        }
        Ok(Type::Bool)
    }

    fn check_assign(&mut self, assign: &AssignExpr) -> Result<Type> {
        let lt = self.check_expr(&assign.lhs)?;
        let rt = self.check_expr(&assign.rhs)?;
        let pos = assign.lhs.pos();

        let message = if lt.is_fn() && rt.is_fn() {
            Some("Function assignment")
        } else if lt.is_struct_def() && rt.is_struct_def() {
            Some("Struct name assignment")
        } else if lt.is_struct_var() && rt.is_struct_var() {
            Some("Struct variable assignment")
        } else {
            None
        };
        if let Some(message) = message {
            self.reporter.fatal(pos, message);
            return Ok(Type::Error);
        }
        if lt.is_error() || rt.is_error() {
            return Ok(Type::Error);
        }
        if lt != rt {
            self.reporter.fatal(pos, "Type mismatch");
            return Ok(Type::Error);
        }
        Ok(lt)
    }

    fn check_call(&mut self, call: &CallExpr) -> Result<Type> {
        let symbols = self.symbols;
        let sym = call.callee.sym.ok_or_else(|| {
            miette!(
                "internal error: unresolved identifier `{}` at {}",
                call.callee.name,
                call.callee.pos
            )
        })?;

        let SymbolKind::Fn { formals, ret } = &symbols.symbol(sym).kind else {
            self.reporter
                .fatal(call.callee.pos, "Attempt to call a non-function");
            return Ok(Type::Error);
        };

        if call.args.len() != formals.len() {
            self.reporter
                .fatal(call.callee.pos, "Function call with wrong number of args");
            return Ok(Type::Error);
        }

        let mut ok = true;
        for (arg, formal) in call.args.iter().zip(formals) {
            let ty = self.check_expr(arg)?;
            if ty.is_error() {
                ok = false;
                continue;
            }
            if ty != *formal {
                self.reporter
                    .fatal(arg.pos(), "Type of actual does not match type of formal");
                ok = false;
            }
        }
        if ok { Ok(ret.clone()) } else { Ok(Type::Error) }
    }
}
