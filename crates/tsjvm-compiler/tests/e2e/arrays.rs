//! Typed array literals and mixed numeric arithmetic

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::AssignOp;

#[test]
fn test_number_array_from_int_literals() {
    expect_f64(
        vec![
            let_("a", Some(t_array(t_number())), array(vec![int(1), int(2)])),
            ret(add(index(ident("a"), int(0)), index(ident("a"), int(1)))),
        ],
        3.0,
    );
}

#[test]
fn test_empty_int_array() {
    expect_i32(
        vec![
            let_("a", Some(t_array(t_int())), array(vec![])),
            ret(member(ident("a"), "length")),
        ],
        0,
    );
}

#[test]
fn test_string_array_literal() {
    expect_str(
        vec![
            const_("words", Some(t_array(t_string())), array(vec![str_("x"), str_("y")])),
            ret(add(index(ident("words"), int(1)), index(ident("words"), int(0)))),
        ],
        "yx",
    );
}

#[test]
fn test_array_literal_argument_takes_param_type() {
    let sum = function(
        "sum",
        vec![param("xs", Some(t_array(t_number())))],
        Some(t_number()),
        vec![
            let_("total", Some(t_number()), int(0)),
            for_of(
                "x",
                ident("xs"),
                vec![expr_stmt(assign_op(AssignOp::AddAssign, ident("total"), ident("x")))],
            ),
            ret(ident("total")),
        ],
    );
    expect_f64_with(
        vec![sum],
        vec![ret(call_fn("sum", vec![array(vec![int(1), int(2), int(3)])]))],
        6.0,
    );
}

#[test]
fn test_array_literal_returned_as_declared_type() {
    let make = function(
        "make",
        vec![],
        Some(t_array(t_int())),
        vec![ret(array(vec![int(4), int(5), int(6)]))],
    );
    expect_i32_with(
        vec![make],
        vec![
            const_("xs", None, call_fn("make", vec![])),
            ret(add(index(ident("xs"), int(2)), member(ident("xs"), "length"))),
        ],
        9,
    );
}

#[test]
fn test_typed_array_element_assignment() {
    expect_f64(
        vec![
            let_("a", Some(t_array(t_number())), array(vec![int(1), int(2)])),
            expr_stmt(assign(index(ident("a"), int(0)), num(0.5))),
            ret(add(index(ident("a"), int(0)), index(ident("a"), int(1)))),
        ],
        2.5,
    );
}

#[test]
fn test_int_float_long_promote_to_float() {
    expect_f64(
        vec![
            let_("i", Some(t_int()), int(1)),
            let_("f", Some(t_float()), num(2.5)),
            let_("l", Some(t_long()), int(4)),
            ret(add(add(ident("i"), ident("f")), ident("l"))),
        ],
        7.5,
    );
}

#[test]
fn test_long_arithmetic_beyond_int_range() {
    expect_f64(
        vec![
            let_("big", Some(t_long()), int(3_000_000)),
            let_("square", Some(t_long()), mul(ident("big"), ident("big"))),
            ret(div(ident("square"), int(1_000_000))),
        ],
        9_000_000.0,
    );
}

#[test]
fn test_int_and_number_mix_to_double() {
    expect_f64(
        vec![
            let_("count", Some(t_int()), int(3)),
            ret(mul(ident("count"), num(0.5))),
        ],
        1.5,
    );
}
