//! throw, try/catch/finally

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_interp::{VmError, Vm};

#[test]
fn test_try_catch_no_throw() {
    expect_i32(
        vec![
            let_("result", None, int(0)),
            try_(
                vec![expr_stmt(assign(ident("result"), int(42)))],
                Some((Some("e"), vec![expr_stmt(assign(ident("result"), int(0)))])),
                None,
            ),
            ret(ident("result")),
        ],
        42,
    );
}

#[test]
fn test_catch_runs_after_throw() {
    expect_i32(
        vec![
            let_("result", None, int(1)),
            try_(
                vec![
                    throw(new_("Error", vec![str_("boom")])),
                    expr_stmt(assign(ident("result"), int(2))),
                ],
                Some((Some("e"), vec![expr_stmt(assign(ident("result"), int(3)))])),
                None,
            ),
            ret(ident("result")),
        ],
        3,
    );
}

#[test]
fn test_caught_error_message() {
    expect_str(
        vec![
            let_("message", None, str_("none")),
            try_(
                vec![throw(new_("TypeError", vec![str_("bad type")]))],
                Some((
                    Some("e"),
                    vec![expr_stmt(assign(ident("message"), member(ident("e"), "message")))],
                )),
                None,
            ),
            ret(ident("message")),
        ],
        "bad type",
    );
}

#[test]
fn test_throwing_a_string_is_wrapped() {
    expect_str(
        vec![try_(
            vec![throw(str_("plain"))],
            Some((Some("e"), vec![ret(member(ident("e"), "message"))])),
            None,
        )],
        "plain",
    );
}

#[test]
fn test_finally_runs_on_normal_exit() {
    expect_i32(
        vec![
            let_("result", None, int(0)),
            try_(
                vec![expr_stmt(assign(ident("result"), int(40)))],
                None,
                Some(vec![expr_stmt(assign(ident("result"), add(ident("result"), int(2))))]),
            ),
            ret(ident("result")),
        ],
        42,
    );
}

#[test]
fn test_finally_return_overrides_try_return() {
    // try { return 1 } finally { return 2 }
    expect_i32(vec![try_(vec![ret(int(1))], None, Some(vec![ret(int(2))]))], 2);
}

#[test]
fn test_finally_runs_before_break() {
    // while (true) { try { break } finally { result = 99 } } return result
    expect_i32(
        vec![
            let_("result", None, int(0)),
            while_(
                bool_(true),
                vec![try_(
                    vec![break_()],
                    None,
                    Some(vec![expr_stmt(assign(ident("result"), int(99)))]),
                )],
            ),
            ret(ident("result")),
        ],
        99,
    );
}

#[test]
fn test_finally_runs_on_continue() {
    expect_i32(
        vec![
            let_("runs", None, int(0)),
            for_let(
                "i",
                int(0),
                lt(ident("i"), int(4)),
                post_inc(ident("i")),
                vec![try_(
                    vec![continue_()],
                    None,
                    Some(vec![expr_stmt(post_inc(ident("runs")))]),
                )],
            ),
            ret(ident("runs")),
        ],
        4,
    );
}

#[test]
fn test_return_value_is_fixed_before_finally() {
    // let x = 1; try { return x } finally { x = 5 }
    expect_i32(
        vec![
            let_("x", None, int(1)),
            try_(vec![ret(ident("x"))], None, Some(vec![expr_stmt(assign(ident("x"), int(5)))])),
        ],
        1,
    );
}

#[test]
fn test_finally_runs_once_when_catch_handles() {
    expect_i32(
        vec![
            let_("steps", None, int(0)),
            try_(
                vec![throw(new_("Error", vec![str_("x")]))],
                Some((
                    Some("e"),
                    vec![expr_stmt(assign(ident("steps"), add(ident("steps"), int(10))))],
                )),
                Some(vec![expr_stmt(post_inc(ident("steps")))]),
            ),
            ret(ident("steps")),
        ],
        11,
    );
}

#[test]
fn test_nested_finally_order() {
    // Inner finally runs before the outer one
    expect_i32(
        vec![
            let_("trace", None, int(0)),
            try_(
                vec![try_(
                    vec![expr_stmt(assign(ident("trace"), int(1)))],
                    None,
                    Some(vec![expr_stmt(assign(ident("trace"), mul(ident("trace"), int(10))))]),
                )],
                None,
                Some(vec![expr_stmt(assign(ident("trace"), add(ident("trace"), int(2))))]),
            ),
            ret(ident("trace")),
        ],
        12,
    );
}

#[test]
fn test_uncaught_error_reaches_the_caller() {
    let classes = compile_ok(vec![main_fn(
        t_int(),
        vec![throw(new_("RangeError", vec![str_("out of range")]))],
    )]);
    let mut vm = Vm::new();
    vm.load_all(&classes).unwrap();
    let err = vm.invoke_static(CONTAINER, "main", &[]).unwrap_err();
    assert_eq!(
        err,
        VmError::Uncaught {
            class: "tsjvm.runtime.JsRangeError".to_string(),
            message: Some("out of range".to_string()),
        }
    );
}

#[test]
fn test_exception_in_finally_is_not_caught_by_its_own_try() {
    let classes = compile_ok(vec![main_fn(
        t_int(),
        vec![
            try_(
                vec![expr_stmt(int(1))],
                Some((Some("e"), vec![ret(int(7))])),
                Some(vec![throw(new_("Error", vec![str_("from finally")]))]),
            ),
            ret(int(0)),
        ],
    )]);
    let mut vm = Vm::new();
    vm.load_all(&classes).unwrap();
    let err = vm.invoke_static(CONTAINER, "main", &[]).unwrap_err();
    assert!(matches!(
        err,
        VmError::Uncaught { ref message, .. } if message.as_deref() == Some("from finally")
    ));
}
