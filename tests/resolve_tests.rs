//! Name analysis tests
//!
//! The scanner and parser are separate front-end stages, so programs are
//! assembled directly as ASTs here.

use cminus::ast::*;
use cminus::common::Pos;
use cminus::diagnostics::Reporter;
use cminus::resolve::{SymbolKind, SymbolTable, resolve};
use cminus::types::Type;
use pretty_assertions::assert_eq;

fn id(name: &str, line: u32, col: u32) -> Id {
    Id::new(name, Pos::new(line, col))
}

fn var_decl(ty: TypeNode, name: &str, line: u32, col: u32) -> VarDecl {
    VarDecl {
        ty,
        name: id(name, line, col),
    }
}

fn formal(ty: TypeNode, name: &str, line: u32, col: u32) -> FormalDecl {
    FormalDecl {
        ty,
        name: id(name, line, col),
    }
}

fn block(decls: Vec<VarDecl>, stmts: Vec<Stmt>) -> Block {
    Block { decls, stmts }
}

fn fn_decl(
    ret: TypeNode,
    name: &str,
    line: u32,
    col: u32,
    formals: Vec<FormalDecl>,
    body: Block,
) -> Decl {
    Decl::Fn(FnDecl {
        ret,
        name: id(name, line, col),
        formals,
        body,
    })
}

fn struct_decl(name: &str, line: u32, col: u32, fields: Vec<VarDecl>) -> Decl {
    Decl::Struct(StructDecl {
        name: id(name, line, col),
        fields,
    })
}

fn use_id(name: &str, line: u32, col: u32) -> Expr {
    Expr::Id(id(name, line, col))
}

fn int_lit(line: u32, col: u32, value: i32) -> Expr {
    Expr::IntLit {
        pos: Pos::new(line, col),
        value,
    }
}

fn dot(loc: Expr, field: Id) -> Expr {
    Expr::Dot(DotAccess {
        loc: Box::new(loc),
        field,
        struct_def: None,
        bad_access: false,
    })
}

fn assign(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::Assign(AssignExpr {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn run(program: &mut Program) -> (SymbolTable, Reporter) {
    let mut reporter = Reporter::new();
    let symbols = resolve(program, &mut reporter).expect("name analysis must not fail internally");
    (symbols, reporter)
}

fn messages(reporter: &Reporter) -> Vec<String> {
    reporter
        .diagnostics()
        .iter()
        .map(|d| d.to_string())
        .collect()
}

#[test]
fn test_use_links_to_declaration() {
    let mut program = Program {
        decls: vec![
            Decl::Var(var_decl(TypeNode::Int, "x", 1, 5)),
            fn_decl(
                TypeNode::Void,
                "main",
                2,
                6,
                vec![],
                block(vec![], vec![assign(use_id("x", 3, 3), int_lit(3, 7, 1))]),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(messages(&reporter), Vec::<String>::new());

    let Decl::Var(decl) = &program.decls[0] else {
        unreachable!()
    };
    let Decl::Fn(f) = &program.decls[1] else {
        unreachable!()
    };
    let Stmt::Assign(stmt) = &f.body.stmts[0] else {
        unreachable!()
    };
    let Expr::Id(use_site) = stmt.lhs.as_ref() else {
        unreachable!()
    };
    assert!(decl.name.sym.is_some());
    assert_eq!(use_site.sym, decl.name.sym);
}

#[test]
fn test_multiply_declared_keeps_first_binding() {
    let mut program = Program {
        decls: vec![
            Decl::Var(var_decl(TypeNode::Int, "x", 1, 5)),
            Decl::Var(var_decl(TypeNode::Bool, "x", 2, 6)),
        ],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["2:6 ***ERROR*** Multiply declared identifier"]
    );

    let sym = symbols.lookup_global("x").unwrap().expect("x stays bound");
    assert_eq!(symbols.type_of(sym), Type::Int);
}

#[test]
fn test_undeclared_identifier_left_unlinked() {
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Void,
            "main",
            1,
            6,
            vec![],
            block(vec![], vec![assign(use_id("y", 2, 3), int_lit(2, 7, 0))]),
        )],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["2:3 ***ERROR*** Undeclared identifier"]
    );

    let Decl::Fn(f) = &program.decls[0] else {
        unreachable!()
    };
    let Stmt::Assign(stmt) = &f.body.stmts[0] else {
        unreachable!()
    };
    let Expr::Id(use_site) = stmt.lhs.as_ref() else {
        unreachable!()
    };
    assert!(use_site.sym.is_none());
}

#[test]
fn test_shadowing_across_scopes_is_silent() {
    let inner = block(
        vec![var_decl(TypeNode::Int, "x", 3, 9)],
        vec![assign(use_id("x", 4, 5), int_lit(4, 9, 2))],
    );
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Void,
            "main",
            1,
            6,
            vec![],
            block(
                vec![var_decl(TypeNode::Int, "x", 2, 7)],
                vec![Stmt::If {
                    cond: Expr::True {
                        pos: Pos::new(3, 7),
                    },
                    body: inner,
                }],
            ),
        )],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(messages(&reporter), Vec::<String>::new());

    // The inner use binds to the inner declaration.
    let Decl::Fn(f) = &program.decls[0] else {
        unreachable!()
    };
    let outer_sym = f.body.decls[0].name.sym;
    let Stmt::If { body, .. } = &f.body.stmts[0] else {
        unreachable!()
    };
    let inner_sym = body.decls[0].name.sym;
    let Stmt::Assign(stmt) = &body.stmts[0] else {
        unreachable!()
    };
    let Expr::Id(use_site) = stmt.lhs.as_ref() else {
        unreachable!()
    };
    assert!(inner_sym.is_some());
    assert_eq!(use_site.sym, inner_sym);
    assert_ne!(use_site.sym, outer_sym);
}

#[test]
fn test_variable_declared_void() {
    let mut program = Program {
        decls: vec![Decl::Var(var_decl(TypeNode::Void, "v", 1, 6))],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["1:6 ***ERROR*** Non-function declared void"]
    );
    assert_eq!(symbols.lookup_global("v").unwrap(), None);
}

#[test]
fn test_formal_declared_void() {
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Int,
            "f",
            1,
            5,
            vec![formal(TypeNode::Void, "p", 1, 12)],
            block(vec![], vec![]),
        )],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["1:12 ***ERROR*** Non-function declared void"]
    );

    // The bad formal contributes nothing to the signature.
    let sym = symbols.lookup_global("f").unwrap().unwrap();
    let SymbolKind::Fn { formals, .. } = &symbols.symbol(sym).kind else {
        panic!("f should be a function symbol")
    };
    assert!(formals.is_empty());
}

#[test]
fn test_invalid_struct_type_name() {
    let mut program = Program {
        decls: vec![Decl::Var(var_decl(
            TypeNode::Struct(id("S", 1, 8)),
            "s",
            1,
            10,
        ))],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["1:8 ***ERROR*** Invalid name of struct type"]
    );
    assert_eq!(symbols.lookup_global("s").unwrap(), None);
}

#[test]
fn test_struct_cannot_reference_itself() {
    // The definition is not in scope while its own fields are analyzed.
    let mut program = Program {
        decls: vec![struct_decl(
            "S",
            1,
            8,
            vec![var_decl(TypeNode::Struct(id("S", 2, 10)), "next", 2, 12)],
        )],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["2:10 ***ERROR*** Invalid name of struct type"]
    );

    // The definition itself still gets bound, with no fields.
    let sym = symbols.lookup_global("S").unwrap().unwrap();
    assert!(symbols.fields_of(sym).unwrap().is_empty());
}

#[test]
fn test_fields_not_visible_unqualified() {
    let mut program = Program {
        decls: vec![
            struct_decl("S", 1, 8, vec![var_decl(TypeNode::Int, "a", 1, 16)]),
            fn_decl(
                TypeNode::Void,
                "main",
                2,
                6,
                vec![],
                block(vec![], vec![assign(use_id("a", 3, 3), int_lit(3, 7, 1))]),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["3:3 ***ERROR*** Undeclared identifier"]
    );
}

#[test]
fn test_dot_access_links_field() {
    let mut program = Program {
        decls: vec![
            struct_decl("S", 1, 8, vec![var_decl(TypeNode::Int, "a", 1, 16)]),
            Decl::Var(var_decl(TypeNode::Struct(id("S", 2, 8)), "s", 2, 10)),
            fn_decl(
                TypeNode::Void,
                "main",
                3,
                6,
                vec![],
                block(
                    vec![],
                    vec![assign(
                        dot(use_id("s", 4, 3), id("a", 4, 5)),
                        int_lit(4, 9, 1),
                    )],
                ),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(messages(&reporter), Vec::<String>::new());

    let Decl::Fn(f) = &program.decls[2] else {
        unreachable!()
    };
    let Stmt::Assign(stmt) = &f.body.stmts[0] else {
        unreachable!()
    };
    let Expr::Dot(access) = stmt.lhs.as_ref() else {
        unreachable!()
    };
    assert!(access.field.sym.is_some());
    assert!(!access.bad_access);
}

#[test]
fn test_invalid_struct_field_name() {
    let mut program = Program {
        decls: vec![
            struct_decl("S", 1, 8, vec![var_decl(TypeNode::Int, "a", 1, 16)]),
            Decl::Var(var_decl(TypeNode::Struct(id("S", 2, 8)), "s", 2, 10)),
            fn_decl(
                TypeNode::Void,
                "main",
                3,
                6,
                vec![],
                block(
                    vec![],
                    vec![assign(
                        dot(use_id("s", 4, 3), id("b", 4, 5)),
                        int_lit(4, 9, 1),
                    )],
                ),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["4:5 ***ERROR*** Invalid struct field name"]
    );
}

#[test]
fn test_chained_dot_access() {
    let mut program = Program {
        decls: vec![
            struct_decl("Inner", 1, 8, vec![var_decl(TypeNode::Int, "v", 1, 20)]),
            struct_decl(
                "Outer",
                2,
                8,
                vec![var_decl(TypeNode::Struct(id("Inner", 2, 23)), "i", 2, 29)],
            ),
            Decl::Var(var_decl(TypeNode::Struct(id("Outer", 3, 8)), "o", 3, 14)),
            fn_decl(
                TypeNode::Void,
                "main",
                4,
                6,
                vec![],
                block(
                    vec![],
                    vec![assign(
                        dot(dot(use_id("o", 5, 3), id("i", 5, 5)), id("v", 5, 7)),
                        int_lit(5, 11, 1),
                    )],
                ),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(messages(&reporter), Vec::<String>::new());

    let Decl::Fn(f) = &program.decls[3] else {
        unreachable!()
    };
    let Stmt::Assign(stmt) = &f.body.stmts[0] else {
        unreachable!()
    };
    let Expr::Dot(outer_access) = stmt.lhs.as_ref() else {
        unreachable!()
    };
    let Expr::Dot(inner_access) = outer_access.loc.as_ref() else {
        unreachable!()
    };
    // The inner access carries the struct-definition link the outer one
    // resolved through.
    assert!(inner_access.struct_def.is_some());
    assert!(outer_access.field.sym.is_some());
}

#[test]
fn test_dot_access_of_non_struct() {
    let mut program = Program {
        decls: vec![
            Decl::Var(var_decl(TypeNode::Int, "x", 1, 5)),
            fn_decl(
                TypeNode::Void,
                "main",
                2,
                6,
                vec![],
                block(
                    vec![],
                    vec![assign(
                        dot(use_id("x", 3, 3), id("a", 3, 5)),
                        int_lit(3, 9, 1),
                    )],
                ),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["3:3 ***ERROR*** Dot-access of non-struct type"]
    );
}

#[test]
fn test_undeclared_dot_base_reports_once() {
    // Only the undeclared base is reported; the access itself stays silent.
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Void,
            "main",
            1,
            6,
            vec![],
            block(
                vec![],
                vec![assign(
                    dot(use_id("q", 2, 3), id("a", 2, 5)),
                    int_lit(2, 9, 1),
                )],
            ),
        )],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["2:3 ***ERROR*** Undeclared identifier"]
    );
}

#[test]
fn test_bad_chain_reports_once() {
    let mut program = Program {
        decls: vec![
            struct_decl("Outer", 1, 8, vec![var_decl(TypeNode::Int, "n", 1, 20)]),
            Decl::Var(var_decl(TypeNode::Struct(id("Outer", 2, 8)), "o", 2, 14)),
            fn_decl(
                TypeNode::Void,
                "main",
                3,
                6,
                vec![],
                block(
                    vec![],
                    vec![assign(
                        dot(dot(use_id("o", 4, 3), id("bad", 4, 5)), id("v", 4, 9)),
                        int_lit(4, 13, 1),
                    )],
                ),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["4:5 ***ERROR*** Invalid struct field name"]
    );
}

#[test]
fn test_duplicate_function_body_still_analyzed() {
    let mut program = Program {
        decls: vec![
            fn_decl(TypeNode::Void, "f", 1, 6, vec![], block(vec![], vec![])),
            fn_decl(
                TypeNode::Void,
                "f",
                2,
                6,
                vec![],
                block(vec![], vec![assign(use_id("y", 3, 3), int_lit(3, 7, 0))]),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec![
            "2:6 ***ERROR*** Multiply declared identifier",
            "3:3 ***ERROR*** Undeclared identifier",
        ]
    );
}

#[test]
fn test_formal_types_recorded_in_order() {
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Int,
            "h",
            1,
            5,
            vec![
                formal(TypeNode::Int, "a", 1, 11),
                formal(TypeNode::Bool, "b", 1, 19),
            ],
            block(vec![], vec![]),
        )],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(messages(&reporter), Vec::<String>::new());

    let sym = symbols.lookup_global("h").unwrap().unwrap();
    let SymbolKind::Fn { formals, ret } = &symbols.symbol(sym).kind else {
        panic!("h should be a function symbol")
    };
    assert_eq!(formals, &vec![Type::Int, Type::Bool]);
    assert_eq!(ret, &Type::Int);
}

#[test]
fn test_duplicate_formal() {
    let mut program = Program {
        decls: vec![fn_decl(
            TypeNode::Int,
            "f",
            1,
            5,
            vec![
                formal(TypeNode::Int, "a", 1, 11),
                formal(TypeNode::Bool, "a", 1, 19),
            ],
            block(vec![], vec![]),
        )],
    };
    let (symbols, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec!["1:19 ***ERROR*** Multiply declared identifier"]
    );

    let sym = symbols.lookup_global("f").unwrap().unwrap();
    let SymbolKind::Fn { formals, .. } = &symbols.symbol(sym).kind else {
        panic!("f should be a function symbol")
    };
    assert_eq!(formals, &vec![Type::Int]);
}

#[test]
fn test_diagnostics_in_source_order() {
    let mut program = Program {
        decls: vec![
            Decl::Var(var_decl(TypeNode::Int, "x", 1, 5)),
            Decl::Var(var_decl(TypeNode::Bool, "x", 2, 6)),
            Decl::Var(var_decl(TypeNode::Void, "v", 3, 6)),
            fn_decl(
                TypeNode::Void,
                "main",
                4,
                6,
                vec![],
                block(vec![], vec![assign(use_id("y", 5, 3), use_id("z", 5, 7))]),
            ),
        ],
    };
    let (_, reporter) = run(&mut program);
    assert_eq!(
        messages(&reporter),
        vec![
            "2:6 ***ERROR*** Multiply declared identifier",
            "3:6 ***ERROR*** Non-function declared void",
            "5:3 ***ERROR*** Undeclared identifier",
            "5:7 ***ERROR*** Undeclared identifier",
        ]
    );
}
