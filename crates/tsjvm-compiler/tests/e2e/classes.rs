//! Classes, inheritance, interfaces and accessors

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::Stmt;

fn counter() -> Stmt {
    class("Counter")
        .prop("count", Some(t_int()), Some(int(0)))
        .method(
            "increment",
            vec![],
            Some(t_void()),
            vec![expr_stmt(post_inc(member(this(), "count")))],
        )
        .method("get", vec![], Some(t_int()), vec![ret(member(this(), "count"))])
        .build()
}

#[test]
fn test_field_initializer_and_methods() {
    expect_i32_with(
        vec![counter()],
        vec![
            const_("c", None, new_("Counter", vec![])),
            expr_stmt(method_call(ident("c"), "increment", vec![])),
            expr_stmt(method_call(ident("c"), "increment", vec![])),
            ret(method_call(ident("c"), "get", vec![])),
        ],
        2,
    );
}

#[test]
fn test_constructor_parameters() {
    let point = class("Point")
        .prop("x", Some(t_int()), None)
        .prop("y", Some(t_int()), None)
        .ctor(
            vec![param("x", Some(t_int())), param("y", Some(t_int()))],
            vec![
                expr_stmt(assign(member(this(), "x"), ident("x"))),
                expr_stmt(assign(member(this(), "y"), ident("y"))),
            ],
        )
        .method(
            "sum",
            vec![],
            Some(t_int()),
            vec![ret(add(member(this(), "x"), member(this(), "y")))],
        )
        .build();
    expect_i32_with(
        vec![point],
        vec![ret(method_call(new_("Point", vec![int(3), int(4)]), "sum", vec![]))],
        7,
    );
}

#[test]
fn test_inheritance_and_override() {
    let animal = class("Animal")
        .method("legs", vec![], Some(t_int()), vec![ret(int(4))])
        .method(
            "describe",
            vec![],
            Some(t_int()),
            vec![ret(mul(method_call(this(), "legs", vec![]), int(10)))],
        )
        .build();
    let bird = class("Bird")
        .extends("Animal")
        .method("legs", vec![], Some(t_int()), vec![ret(int(2))])
        .build();
    expect_i32_with(
        vec![animal, bird],
        vec![
            const_("a", Some(t_named("Animal")), new_("Bird", vec![])),
            ret(method_call(ident("a"), "describe", vec![])),
        ],
        20,
    );
}

#[test]
fn test_super_constructor_and_method() {
    let base = class("Base")
        .prop("value", Some(t_int()), None)
        .ctor(
            vec![param("value", Some(t_int()))],
            vec![expr_stmt(assign(member(this(), "value"), ident("value")))],
        )
        .method("score", vec![], Some(t_int()), vec![ret(member(this(), "value"))])
        .build();
    let derived = class("Derived")
        .extends("Base")
        .ctor(
            vec![param("v", Some(t_int()))],
            vec![expr_stmt(super_call(vec![mul(ident("v"), int(2))]))],
        )
        .method(
            "score",
            vec![],
            Some(t_int()),
            vec![ret(add(method_call(super_(), "score", vec![]), int(1)))],
        )
        .build();
    expect_i32_with(
        vec![base, derived],
        vec![ret(method_call(new_("Derived", vec![int(5)]), "score", vec![]))],
        11,
    );
}

#[test]
fn test_getter_and_setter() {
    let temp = class("Temperature")
        .prop("celsius", Some(t_int()), Some(int(0)))
        .getter(
            "fahrenheit",
            Some(t_int()),
            vec![ret(add(mul(member(this(), "celsius"), int(9)), int(160)))],
        )
        .getter("degrees", Some(t_int()), vec![ret(member(this(), "celsius"))])
        .setter(
            "degrees",
            param("value", Some(t_int())),
            vec![expr_stmt(assign(member(this(), "celsius"), ident("value")))],
        )
        .build();
    expect_i32_with(
        vec![temp],
        vec![
            const_("t", None, new_("Temperature", vec![])),
            expr_stmt(assign(member(ident("t"), "degrees"), int(5))),
            ret(member(ident("t"), "fahrenheit")),
        ],
        205,
    );
}

#[test]
fn test_static_members() {
    let registry = class("Ids")
        .static_prop("next", Some(t_int()), Some(int(100)))
        .static_method(
            "take",
            vec![],
            Some(t_int()),
            vec![ret(post_inc(member(ident("Ids"), "next")))],
        )
        .build();
    expect_i32_with(
        vec![registry],
        vec![
            expr_stmt(call(member(ident("Ids"), "take"), vec![])),
            ret(call(member(ident("Ids"), "take"), vec![])),
        ],
        101,
    );
}

#[test]
fn test_interface_property_through_field() {
    let named = interface("Named").prop("name", t_string()).build();
    let user = class("User")
        .implements("Named")
        .prop("name", Some(t_string()), Some(str_("ada")))
        .build();
    expect_str_with(
        vec![named, user],
        vec![
            const_("n", Some(t_named("Named")), new_("User", vec![])),
            ret(member(ident("n"), "name")),
        ],
        "ada",
    );
}

#[test]
fn test_abstract_method_dispatch() {
    let shape = class("Shape")
        .abstract_()
        .abstract_method("area", vec![], Some(t_int()))
        .method(
            "twice",
            vec![],
            Some(t_int()),
            vec![ret(mul(method_call(this(), "area", vec![]), int(2)))],
        )
        .build();
    let square = class("Square")
        .extends("Shape")
        .prop("side", Some(t_int()), Some(int(3)))
        .method(
            "area",
            vec![],
            Some(t_int()),
            vec![ret(mul(member(this(), "side"), member(this(), "side")))],
        )
        .build();
    expect_i32_with(
        vec![shape, square],
        vec![ret(method_call(new_("Square", vec![]), "twice", vec![]))],
        18,
    );
}

#[test]
fn test_this_captured_by_arrow() {
    let holder = class("Holder")
        .prop("base", Some(t_int()), Some(int(10)))
        .method(
            "adder",
            vec![],
            Some(t_fn(vec![("x", t_int())], t_int())),
            vec![ret(arrow(vec![("x", Some(t_int()))], add(ident("x"), member(this(), "base"))))],
        )
        .build();
    expect_i32_with(
        vec![holder],
        vec![
            const_("f", None, method_call(new_("Holder", vec![]), "adder", vec![])),
            ret(call_fn("f", vec![int(5)])),
        ],
        15,
    );
}
