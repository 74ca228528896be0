//! Shape of the emitted class files

use super::harness::*;
use tsjvm_ast::factory::*;
use tsjvm_classfile::{access, ClassFile};
use tsjvm_compiler::{ByteCodeCompiler, ByteCodeCompilerOptions, JdkVersion};

#[test]
fn test_class_version_follows_jdk() {
    let decls = || vec![main_fn(t_int(), vec![ret(int(1))])];
    for (jdk, major) in [(JdkVersion::Jdk8, 52), (JdkVersion::Jdk17, 61), (JdkVersion::Jdk21, 65)] {
        let options = ByteCodeCompilerOptions::default().with_jdk_version(jdk).with_debug(true);
        let classes = ByteCodeCompiler::new(options).compile(&module(decls())).unwrap();
        let class = ClassFile::parse(&classes["$"]).unwrap();
        assert_eq!(class.version.major, major);
    }
}

#[test]
fn test_package_prefix() {
    let options = ByteCodeCompilerOptions::default().with_package_prefix("com.example");
    let classes = ByteCodeCompiler::new(options)
        .compile(&module(vec![class("Widget").build(), main_fn(t_int(), vec![ret(int(0))])]))
        .unwrap();
    assert!(classes.contains_key("com.example.Widget"));
    assert!(classes.contains_key("com.example.$"));
    let class = ClassFile::parse(&classes["com.example.Widget"]).unwrap();
    assert_eq!(class.this_class, "com/example/Widget");
}

#[test]
fn test_container_members() {
    let classes = compile_ok(vec![
        const_("limit", Some(t_int()), int(3)),
        function(
            "scale",
            vec![param("x", Some(t_int()))],
            Some(t_int()),
            vec![ret(mul(ident("x"), ident("limit")))],
        ),
    ]);
    let class = ClassFile::parse(&classes["$"]).unwrap();
    let limit = class.field("limit").unwrap();
    assert_eq!(limit.descriptor, "I");
    assert_ne!(limit.access & access::STATIC, 0);
    assert_ne!(limit.access & access::FINAL, 0);
    let scale = class.method("scale", "(I)I").unwrap();
    assert!(scale.is_static());
    assert!(class.method("<clinit>", "()V").is_some());
}

#[test]
fn test_globals_are_initialized_before_use() {
    expect_i32_with(
        vec![
            let_("base", Some(t_int()), int(20)),
            const_("derived", None, add(ident("base"), int(1))),
        ],
        vec![ret(mul(ident("derived"), int(2)))],
        42,
    );
}

#[test]
fn test_interface_is_abstract() {
    let classes = compile_ok(vec![interface("Sized")
        .method("size", vec![], t_int())
        .build()]);
    let class = ClassFile::parse(&classes["Sized"]).unwrap();
    assert!(class.is_interface());
    assert_ne!(class.access & access::ABSTRACT, 0);
    let size = class.method("size", "()I").unwrap();
    assert!(size.is_abstract());
    assert!(size.code.is_none());
}

#[test]
fn test_interface_signature_members() {
    let classes = compile_ok(vec![interface("Table")
        .index("i", t_number(), t_string(), false)
        .call_signature(vec![("x", t_int())], t_int())
        .construct_signature(vec![("size", t_int())], t_named("Table"))
        .build()]);
    let class = ClassFile::parse(&classes["Table"]).unwrap();
    assert!(class.is_interface());
    for (name, descriptor) in [
        ("get", "(I)Ljava/lang/String;"),
        ("set", "(ILjava/lang/String;)V"),
        ("call", "(I)I"),
        ("create", "(I)LTable;"),
    ] {
        let method = class
            .method(name, descriptor)
            .unwrap_or_else(|| panic!("missing {}{}", name, descriptor));
        assert!(method.is_abstract());
        assert!(method.code.is_none());
    }
}

#[test]
fn test_readonly_index_signature_has_no_setter() {
    let classes = compile_ok(vec![interface("Lookup")
        .index("key", t_string(), t_number(), true)
        .build()]);
    let class = ClassFile::parse(&classes["Lookup"]).unwrap();
    assert!(class.method("get", "(Ljava/lang/String;)D").is_some());
    assert!(class.methods_named("set").next().is_none());
}

#[test]
fn test_class_implements_and_extends() {
    let classes = compile_ok(vec![
        interface("Sized").method("size", vec![], t_int()).build(),
        class("Base").build(),
        class("Box")
            .extends("Base")
            .implements("Sized")
            .method("size", vec![], Some(t_int()), vec![ret(int(1))])
            .build(),
    ]);
    let class = ClassFile::parse(&classes["Box"]).unwrap();
    assert_eq!(class.super_class.as_deref(), Some("Base"));
    assert_eq!(class.interfaces, vec!["Sized".to_string()]);
    assert!(class.method("<init>", "()V").is_some());
}

#[test]
fn test_namespace_classes() {
    let classes = compile_ok(vec![namespace(
        "geo",
        vec![
            class("Point").build(),
            function("origin", vec![], Some(t_int()), vec![ret(int(0))]),
        ],
    )]);
    assert!(classes.contains_key("geo.Point"));
    assert!(classes.contains_key("geo.$"));
}

#[test]
fn test_compile_is_deterministic() {
    let decls = || {
        vec![
            class("Acc")
                .prop("total", Some(t_int()), Some(int(0)))
                .method(
                    "add",
                    vec![param("n", Some(t_int()))],
                    Some(t_void()),
                    vec![expr_stmt(assign(
                        member(this(), "total"),
                        add(member(this(), "total"), ident("n")),
                    ))],
                )
                .build(),
            main_fn(
                t_int(),
                vec![
                    const_("acc", None, new_("Acc", vec![])),
                    const_("f", None, arrow(vec![("x", Some(t_int()))], add(ident("x"), int(1)))),
                    try_(
                        vec![expr_stmt(method_call(
                            ident("acc"),
                            "add",
                            vec![call_fn("f", vec![int(1)])],
                        ))],
                        Some((Some("e"), vec![])),
                        Some(vec![]),
                    ),
                    ret(member(ident("acc"), "total")),
                ],
            ),
        ]
    };
    let mut compiler = ByteCodeCompiler::new(ByteCodeCompilerOptions::default());
    let first = compiler.compile(&module(decls())).unwrap();
    let second = compiler.compile(&module(decls())).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.keys().cloned().collect::<Vec<_>>(), vec!["$", "$$Lambda$0", "Acc"]);
}

#[test]
fn test_error_names_the_declaration() {
    let err = expect_compile_error(vec![main_fn(t_int(), vec![ret(ident("nowhere"))])]);
    let message = err.to_string();
    assert!(message.contains("main"), "{}", message);
    assert!(message.contains("nowhere"), "{}", message);
}
