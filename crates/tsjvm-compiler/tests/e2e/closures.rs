//! Arrow functions, captures and holders

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::AssignOp;

#[test]
fn test_arrow_with_expression_body() {
    expect_i32(
        vec![
            const_("double", None, arrow(vec![("x", Some(t_int()))], mul(ident("x"), int(2)))),
            ret(call_fn("double", vec![int(21)])),
        ],
        42,
    );
}

#[test]
fn test_arrow_with_block_body() {
    expect_i32(
        vec![
            const_(
                "clamp",
                None,
                arrow_block(
                    vec![("x", Some(t_int()))],
                    Some(t_int()),
                    vec![
                        if_(gt(ident("x"), int(10)), vec![ret(int(10))], None),
                        ret(ident("x")),
                    ],
                ),
            ),
            ret(add(call_fn("clamp", vec![int(50)]), call_fn("clamp", vec![int(3)]))),
        ],
        13,
    );
}

#[test]
fn test_capture_of_unchanged_local() {
    expect_i32(
        vec![
            const_("base", None, int(100)),
            const_(
                "offset",
                None,
                arrow(vec![("x", Some(t_int()))], add(ident("x"), ident("base"))),
            ),
            ret(call_fn("offset", vec![int(5)])),
        ],
        105,
    );
}

#[test]
fn test_reassignment_after_capture_is_visible() {
    // let n = 1; const read = () => n; n = 7; return read();
    expect_i32(
        vec![
            let_("n", None, int(1)),
            const_("read", None, arrow_block(vec![], Some(t_int()), vec![ret(ident("n"))])),
            expr_stmt(assign(ident("n"), int(7))),
            ret(call_fn("read", vec![])),
        ],
        7,
    );
}

#[test]
fn test_write_inside_arrow_is_shared() {
    // let count = 0; const bump = () => { count += 1 }; bump(); bump(); return count;
    expect_i32(
        vec![
            let_("count", None, int(0)),
            const_(
                "bump",
                None,
                arrow_block(
                    vec![],
                    None,
                    vec![expr_stmt(assign_op(AssignOp::AddAssign, ident("count"), int(1)))],
                ),
            ),
            expr_stmt(call_fn("bump", vec![])),
            expr_stmt(call_fn("bump", vec![])),
            ret(ident("count")),
        ],
        2,
    );
}

#[test]
fn test_nested_arrows() {
    // const adder = (a: int) => (b: int) => a + b
    let body = vec![
        const_(
            "add5",
            None,
            call_fn(
                "make",
                vec![int(5)],
            ),
        ),
        ret(call_fn("add5", vec![int(4)])),
    ];
    let make = function(
        "make",
        vec![param("a", Some(t_int()))],
        Some(t_fn(vec![("b", t_int())], t_int())),
        vec![ret(arrow(vec![("b", Some(t_int()))], add(ident("a"), ident("b"))))],
    );
    expect_i32_with(vec![make], body, 9);
}

#[test]
fn test_function_typed_parameter() {
    let apply = function(
        "apply",
        vec![
            param("f", Some(t_fn(vec![("x", t_int())], t_int()))),
            param("v", Some(t_int())),
        ],
        Some(t_int()),
        vec![ret(call_fn("f", vec![ident("v")]))],
    );
    expect_i32_with(
        vec![apply],
        vec![ret(call_fn(
            "apply",
            vec![arrow(vec![("x", Some(t_int()))], mul(ident("x"), ident("x"))), int(6)],
        ))],
        36,
    );
}

#[test]
fn test_local_function_declaration() {
    expect_i32(
        vec![
            function(
                "triple",
                vec![param("x", Some(t_int()))],
                Some(t_int()),
                vec![ret(mul(ident("x"), int(3)))],
            ),
            ret(call_fn("triple", vec![int(4)])),
        ],
        12,
    );
}

#[test]
fn test_lambda_classes_are_numbered_per_outer_class() {
    let classes = compile_ok(vec![main_fn(
        t_int(),
        vec![
            const_("a", None, arrow(vec![("x", Some(t_int()))], ident("x"))),
            const_("b", None, arrow(vec![("x", Some(t_int()))], neg(ident("x")))),
            ret(add(call_fn("a", vec![int(1)]), call_fn("b", vec![int(1)]))),
        ],
    )]);
    assert!(classes.contains_key("$$Lambda$0"));
    assert!(classes.contains_key("$$Lambda$1"));
}
