//! Loops, labels, break and continue

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::AssignOp;

fn add_to(name: &str, value: tsjvm_ast::Expr) -> tsjvm_ast::Stmt {
    expr_stmt(assign_op(AssignOp::AddAssign, ident(name), value))
}

#[test]
fn test_for_loop_sum() {
    // let sum = 0; for (let i = 0; i < 10; i++) sum += i; return sum;
    expect_i32(
        vec![
            let_("sum", None, int(0)),
            for_let(
                "i",
                int(0),
                lt(ident("i"), int(10)),
                post_inc(ident("i")),
                vec![add_to("sum", ident("i"))],
            ),
            ret(ident("sum")),
        ],
        45,
    );
}

#[test]
fn test_while_loop() {
    expect_i32(
        vec![
            let_("n", None, int(1)),
            while_(
                lt(ident("n"), int(100)),
                vec![expr_stmt(assign(ident("n"), mul(ident("n"), int(3))))],
            ),
            ret(ident("n")),
        ],
        243,
    );
}

#[test]
fn test_do_while_runs_body_once() {
    expect_i32(
        vec![
            let_("count", None, int(0)),
            do_while(vec![expr_stmt(post_inc(ident("count")))], bool_(false)),
            ret(ident("count")),
        ],
        1,
    );
}

#[test]
fn test_for_of_array() {
    expect_i32(
        vec![
            let_("result", Some(t_int()), int(0)),
            for_of(
                "value",
                array(vec![int(10), int(20), int(30)]),
                vec![add_to("result", ident("value"))],
            ),
            ret(ident("result")),
        ],
        60,
    );
}

#[test]
fn test_for_of_string() {
    // Count the 'a' characters of "banana"
    expect_i32(
        vec![
            let_("count", None, int(0)),
            for_of(
                "ch",
                str_("banana"),
                vec![if_(
                    eq(ident("ch"), str_("a")),
                    vec![expr_stmt(post_inc(ident("count")))],
                    None,
                )],
            ),
            ret(ident("count")),
        ],
        3,
    );
}

#[test]
fn test_break_and_continue() {
    // Sum of odd numbers below 10, stopping at 7
    expect_i32(
        vec![
            let_("sum", None, int(0)),
            for_let(
                "i",
                int(0),
                lt(ident("i"), int(10)),
                post_inc(ident("i")),
                vec![
                    if_(eq(rem(ident("i"), int(2)), int(0)), vec![continue_()], None),
                    if_(gt(ident("i"), int(7)), vec![break_()], None),
                    add_to("sum", ident("i")),
                ],
            ),
            ret(ident("sum")),
        ],
        16,
    );
}

#[test]
fn test_labeled_break_leaves_outer_loop() {
    expect_i32(
        vec![
            let_("hits", None, int(0)),
            labeled(
                "outer",
                for_let(
                    "i",
                    int(0),
                    lt(ident("i"), int(5)),
                    post_inc(ident("i")),
                    vec![for_let(
                        "j",
                        int(0),
                        lt(ident("j"), int(5)),
                        post_inc(ident("j")),
                        vec![
                            if_(eq(ident("j"), int(3)), vec![continue_to("outer")], None),
                            if_(eq(ident("i"), int(2)), vec![break_to("outer")], None),
                            expr_stmt(post_inc(ident("hits"))),
                        ],
                    )],
                ),
            ),
            ret(ident("hits")),
        ],
        // i = 0 and 1 count j = 0..2, i = 2 breaks out
        6,
    );
}

#[test]
fn test_labeled_block_break() {
    expect_i32(
        vec![
            let_("x", None, int(1)),
            labeled(
                "done",
                block(vec![
                    expr_stmt(assign(ident("x"), int(2))),
                    if_(bool_(true), vec![break_to("done")], None),
                    expr_stmt(assign(ident("x"), int(3))),
                ]),
            ),
            ret(ident("x")),
        ],
        2,
    );
}

#[test]
fn test_unknown_label_is_an_error() {
    let err = expect_compile_error(vec![main_fn(
        t_int(),
        vec![while_(bool_(true), vec![break_to("missing")]), ret(int(0))],
    )]);
    assert!(err.to_string().contains("missing"), "{}", err);
}

#[test]
fn test_shadowing_keeps_outer_binding() {
    expect_i32(
        vec![
            let_("x", None, int(1)),
            block(vec![let_("x", None, int(5)), expr_stmt(post_inc(ident("x")))]),
            ret(ident("x")),
        ],
        1,
    );
}

#[test]
fn test_for_in_object_keys_in_insertion_order() {
    expect_str(
        vec![
            const_("scores", None, object(vec![("b", int(2)), ("a", int(1)), ("c", int(3))])),
            let_("keys", None, str_("")),
            for_in("key", ident("scores"), vec![add_to("keys", ident("key"))]),
            ret(ident("keys")),
        ],
        "bac",
    );
}

#[test]
fn test_for_in_array_indices_are_strings() {
    expect_str(
        vec![
            let_("out", None, str_("")),
            for_in(
                "i",
                array(vec![int(7), int(8), int(9)]),
                vec![add_to("out", add(ident("i"), str_(";")))],
            ),
            ret(ident("out")),
        ],
        "0;1;2;",
    );
}

#[test]
fn test_for_in_string_with_break() {
    expect_str(
        vec![
            let_("out", None, str_("")),
            for_in(
                "i",
                str_("hello"),
                vec![
                    if_(eq(ident("i"), str_("3")), vec![break_()], None),
                    add_to("out", ident("i")),
                ],
            ),
            ret(ident("out")),
        ],
        "012",
    );
}

#[test]
fn test_for_in_over_number_is_rejected() {
    let err = expect_compile_error(vec![main_fn(
        t_int(),
        vec![for_in("k", int(5), vec![]), ret(int(0))],
    )]);
    assert!(err.to_string().contains("for...in"), "{}", err);
}
