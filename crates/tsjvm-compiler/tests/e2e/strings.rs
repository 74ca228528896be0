//! String concatenation and library calls

use super::harness::*;
use tsjvm_ast::factory::*;

#[test]
fn test_concat_with_numbers() {
    expect_str(vec![ret(add(add(str_("a"), int(1)), int(2)))], "a12");
}

#[test]
fn test_numbers_added_before_concat() {
    expect_str(vec![ret(add(add(int(1), int(2)), str_("x")))], "3x");
}

#[test]
fn test_concat_double() {
    expect_str(vec![ret(add(str_("v="), num(2.5)))], "v=2.5");
}

#[test]
fn test_string_length() {
    expect_i32(
        vec![const_("s", None, str_("hello")), ret(member(ident("s"), "length"))],
        5,
    );
}

#[test]
fn test_string_methods() {
    expect_str(
        vec![ret(method_call(
            method_call(str_("  Mixed  "), "trim", vec![]),
            "toUpperCase",
            vec![],
        ))],
        "MIXED",
    );
}

#[test]
fn test_includes_maps_to_contains() {
    expect_bool(vec![ret(method_call(str_("typescript"), "includes", vec![str_("script")]))], true);
}

#[test]
fn test_char_at() {
    expect_str(vec![ret(method_call(str_("xyz"), "charAt", vec![int(1)]))], "y");
}

#[test]
fn test_string_equality_by_value() {
    expect_bool(
        vec![
            let_("a", None, add(str_("ab"), str_("c"))),
            ret(eq(ident("a"), str_("abc"))),
        ],
        true,
    );
}

#[test]
fn test_conditional_expression() {
    expect_str(
        vec![
            const_("n", None, int(4)),
            ret(cond(eq(rem(ident("n"), int(2)), int(0)), str_("even"), str_("odd"))),
        ],
        "even",
    );
}

#[test]
fn test_double_arithmetic() {
    expect_f64(
        vec![
            let_("total", Some(t_number()), int(1)),
            expr_stmt(assign(ident("total"), div(ident("total"), int(4)))),
            ret(ident("total")),
        ],
        0.25,
    );
}

#[test]
fn test_template_literal_substitutions() {
    expect_str(
        vec![
            const_("name", None, str_("ada")),
            const_("n", Some(t_int()), int(3)),
            ret(tpl(vec!["hi ", ", you have ", " items"], vec![ident("name"), ident("n")])),
        ],
        "hi ada, you have 3 items",
    );
}

#[test]
fn test_template_literal_without_substitutions() {
    expect_str(vec![ret(tpl(vec!["plain"], vec![]))], "plain");
}

#[test]
fn test_template_literal_mixed_operands() {
    // `${1.5}${true}${"x"}` with empty quasis in between
    expect_str(
        vec![ret(tpl(vec!["", "", "", "!"], vec![num(1.5), bool_(true), str_("x")]))],
        "1.5truex!",
    );
}

#[test]
fn test_template_literal_length() {
    expect_i32(
        vec![
            const_("s", None, tpl(vec!["<", ">"], vec![add(int(40), int(2))])),
            ret(member(ident("s"), "length")),
        ],
        4,
    );
}
