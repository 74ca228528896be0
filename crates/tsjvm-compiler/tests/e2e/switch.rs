//! switch statements

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::{Expr, Stmt};

fn classify(value: Expr) -> Vec<Stmt> {
    vec![
        let_("out", None, int(0)),
        switch(
            value,
            vec![
                (Some(int(1)), vec![expr_stmt(assign(ident("out"), int(10))), break_()]),
                (Some(int(2)), vec![]),
                (Some(int(3)), vec![expr_stmt(assign(ident("out"), int(23))), break_()]),
                (None, vec![expr_stmt(assign(ident("out"), neg(int(1))))]),
            ],
        ),
        ret(ident("out")),
    ]
}

#[test]
fn test_switch_matching_case() {
    expect_i32(classify(int(1)), 10);
}

#[test]
fn test_switch_fallthrough() {
    expect_i32(classify(int(2)), 23);
}

#[test]
fn test_switch_default() {
    expect_i32(classify(int(9)), -1);
}

#[test]
fn test_switch_on_strings() {
    expect_i32(
        vec![
            const_("cmd", None, str_("stop")),
            switch(
                ident("cmd"),
                vec![
                    (Some(str_("go")), vec![ret(int(1))]),
                    (Some(str_("stop")), vec![ret(int(2))]),
                ],
            ),
            ret(int(0)),
        ],
        2,
    );
}

#[test]
fn test_default_in_the_middle() {
    // Cases before and after default are still tested first
    expect_i32(
        vec![
            let_("out", None, int(0)),
            switch(
                int(5),
                vec![
                    (None, vec![expr_stmt(assign(ident("out"), int(1))), break_()]),
                    (Some(int(5)), vec![expr_stmt(assign(ident("out"), int(5))), break_()]),
                ],
            ),
            ret(ident("out")),
        ],
        5,
    );
}

#[test]
fn test_continue_inside_switch_targets_loop() {
    expect_i32(
        vec![
            let_("sum", None, int(0)),
            for_let(
                "i",
                int(0),
                lt(ident("i"), int(5)),
                post_inc(ident("i")),
                vec![
                    switch(ident("i"), vec![(Some(int(2)), vec![continue_()])]),
                    expr_stmt(assign(ident("sum"), add(ident("sum"), ident("i")))),
                ],
            ),
            ret(ident("sum")),
        ],
        8,
    );
}
