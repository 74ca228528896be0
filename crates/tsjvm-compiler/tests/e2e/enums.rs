//! Enum declarations

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_ast::Stmt;
use tsjvm_classfile::{access, ClassFile};

fn color() -> Stmt {
    enum_("Color", vec![("Red", None), ("Green", None), ("Blue", None)])
}

#[test]
fn test_ordinals_follow_declaration_order() {
    expect_i32_with(
        vec![color()],
        vec![ret(method_call(member(ident("Color"), "Blue"), "ordinal", vec![]))],
        2,
    );
}

#[test]
fn test_explicit_initializers_do_not_change_ordinals() {
    let level = enum_("Level", vec![("Low", Some(int(10))), ("High", Some(int(20)))]);
    expect_i32_with(
        vec![level],
        vec![ret(method_call(member(ident("Level"), "High"), "ordinal", vec![]))],
        1,
    );
}

#[test]
fn test_enum_name() {
    expect_str_with(
        vec![color()],
        vec![ret(method_call(member(ident("Color"), "Green"), "name", vec![]))],
        "GREEN",
    );
}

#[test]
fn test_values_length() {
    expect_i32_with(
        vec![color()],
        vec![ret(member(call(member(ident("Color"), "values"), vec![]), "length"))],
        3,
    );
}

#[test]
fn test_enum_identity_comparison() {
    expect_bool_with(
        vec![color()],
        vec![
            const_("c", None, member(ident("Color"), "Red")),
            ret(eq(ident("c"), member(ident("Color"), "Red"))),
        ],
        true,
    );
}

#[test]
fn test_enum_class_shape() {
    let classes = compile_ok(vec![color()]);
    let class = ClassFile::parse(&classes["Color"]).unwrap();
    assert_eq!(class.super_class.as_deref(), Some("java/lang/Enum"));
    assert_ne!(class.access & access::ENUM, 0);
    assert_ne!(class.access & access::FINAL, 0);
    for name in ["RED", "GREEN", "BLUE"] {
        let field = class.field(name).unwrap();
        assert_eq!(field.descriptor, "LColor;");
        assert!(field.is_static());
    }
    assert!(class.field("$VALUES").is_some());
    assert!(class.method("values", "()[LColor;").is_some());
    assert!(class.method("valueOf", "(Ljava/lang/String;)LColor;").is_some());
    assert!(class.method("<clinit>", "()V").is_some());
}

#[test]
fn test_empty_enum_is_rejected() {
    let err = expect_compile_error(vec![enum_("Nothing", vec![])]);
    assert!(err.to_string().contains("Nothing"), "{}", err);
}
