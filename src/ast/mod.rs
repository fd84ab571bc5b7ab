//! Abstract Syntax Tree for C--
//!
//! This module defines the AST types produced by the parsing stage. Nodes
//! travel between stages as JSON; name analysis then annotates them in
//! place, linking each resolved identifier to its symbol.

use crate::common::Pos;
use crate::resolve::symbols::SymbolId;
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// Root of a parsed C-- compilation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
}

// ==================== DECLARATIONS ====================

/// Top-level declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
    Struct(StructDecl),
}

/// Variable declaration: at top level, in a block, or as a struct field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: TypeNode,
    pub name: Id,
}

/// Function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    pub ret: TypeNode,
    pub name: Id,
    pub formals: Vec<FormalDecl>,
    pub body: Block,
}

/// Formal parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormalDecl {
    pub ty: TypeNode,
    pub name: Id,
}

/// Struct definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Id,
    pub fields: Vec<VarDecl>,
}

// ==================== TYPES ====================

/// Surface type annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeNode {
    Int,
    Bool,
    Void,
    /// `struct <name>`; the id resolves to the struct's definition.
    Struct(Id),
}

impl TypeNode {
    /// The static type this annotation denotes.
    pub fn to_type(&self) -> Type {
        match self {
            TypeNode::Int => Type::Int,
            TypeNode::Bool => Type::Bool,
            TypeNode::Void => Type::Void,
            TypeNode::Struct(id) => Type::Struct(id.name.clone()),
        }
    }
}

// ==================== STATEMENTS ====================

/// Declarations followed by statements; introduces a scope except as a
/// function body, which shares the formals' scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub decls: Vec<VarDecl>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Assign(AssignExpr),
    PostInc(Expr),
    PostDec(Expr),
    Read(Expr),
    Write(Expr),
    If { cond: Expr, body: Block },
    IfElse { cond: Expr, then_body: Block, else_body: Block },
    While { cond: Expr, body: Block },
    Repeat { count: Expr, body: Block },
    Call(CallExpr),
    Return(Option<Expr>),
}

// ==================== EXPRESSIONS ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    IntLit { pos: Pos, value: i32 },
    StrLit { pos: Pos, value: String },
    True { pos: Pos },
    False { pos: Pos },
    Id(Id),
    Dot(DotAccess),
    Assign(AssignExpr),
    Call(CallExpr),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    /// Position a diagnostic about this expression is anchored to: the
    /// leftmost identifier or literal.
    pub fn pos(&self) -> Pos {
        match self {
            Expr::IntLit { pos, .. }
            | Expr::StrLit { pos, .. }
            | Expr::True { pos }
            | Expr::False { pos } => *pos,
            Expr::Id(id) => id.pos,
            Expr::Dot(dot) => dot.loc.pos(),
            Expr::Assign(assign) => assign.lhs.pos(),
            Expr::Call(call) => call.callee.pos,
            Expr::Unary { operand, .. } => operand.pos(),
            Expr::Binary { lhs, .. } => lhs.pos(),
        }
    }
}

/// Identifier occurrence.
///
/// `sym` is filled in by name analysis; it stays `None` only for
/// occurrences reported as undeclared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Id {
    pub name: String,
    pub pos: Pos,
    #[serde(skip)]
    pub sym: Option<SymbolId>,
}

impl Id {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        Self {
            name: name.into(),
            pos,
            sym: None,
        }
    }
}

/// Field selection `loc.field`.
///
/// `struct_def` links a struct-typed result to its definition so the node
/// can serve as the left side of a further access; `bad_access` marks the
/// chain once a fault has been reported, suppressing cascades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotAccess {
    pub loc: Box<Expr>,
    pub field: Id,
    #[serde(skip)]
    pub struct_def: Option<SymbolId>,
    #[serde(skip)]
    pub bad_access: bool,
}

/// Assignment `lhs = rhs`; usable both as an expression and, wrapped, as a
/// statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignExpr {
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

/// Call `callee(args)`; usable both as an expression and as a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Id,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    // Logical
    And,
    Or,
    // Equality
    Eq,
    NotEq,
    // Relational
    Less,
    Greater,
    LessEq,
    GreaterEq,
}
