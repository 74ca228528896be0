//! Shared helpers: compile a module, run `main` on the interpreter

use tsjvm_ast::factory::*;
use tsjvm_ast::{Stmt, TsType};
use tsjvm_compiler::{ByteCodeCompiler, ByteCodeCompilerOptions, ClassMap, CompileError};
use tsjvm_interp::{Value, Vm};

/// Container class of the root namespace
pub const CONTAINER: &str = "$";

/// `function main(): ret { body }`
pub fn main_fn(ret: TsType, body: Vec<Stmt>) -> Stmt {
    function("main", vec![], Some(ret), body)
}

/// Compile declarations with verification of every emitted class
pub fn compile(decls: Vec<Stmt>) -> Result<ClassMap, CompileError> {
    let options = ByteCodeCompilerOptions::default().with_debug(true);
    ByteCodeCompiler::new(options).compile(&module(decls))
}

pub fn compile_ok(decls: Vec<Stmt>) -> ClassMap {
    match compile(decls) {
        Ok(classes) => classes,
        Err(err) => panic!("compilation failed: {}", err),
    }
}

/// Compile, load everything and call `$.main()`
pub fn run(decls: Vec<Stmt>) -> (Vm, Option<Value>) {
    let classes = compile_ok(decls);
    let mut vm = Vm::new();
    vm.load_all(&classes).expect("classes should load");
    let result = vm
        .invoke_static(CONTAINER, "main", &[])
        .unwrap_or_else(|err| panic!("main failed: {}", err));
    (vm, result)
}

fn with_main(mut decls: Vec<Stmt>, ret: TsType, body: Vec<Stmt>) -> Vec<Stmt> {
    decls.push(main_fn(ret, body));
    decls
}

pub fn expect_i32(body: Vec<Stmt>, expected: i32) {
    expect_i32_with(vec![], body, expected);
}

/// `main(): int` next to other declarations
pub fn expect_i32_with(decls: Vec<Stmt>, body: Vec<Stmt>, expected: i32) {
    let (_, result) = run(with_main(decls, t_int(), body));
    assert_eq!(result, Some(Value::Int(expected)));
}

pub fn expect_f64(body: Vec<Stmt>, expected: f64) {
    expect_f64_with(vec![], body, expected);
}

pub fn expect_f64_with(decls: Vec<Stmt>, body: Vec<Stmt>, expected: f64) {
    let (_, result) = run(with_main(decls, t_number(), body));
    match result {
        Some(Value::Double(actual)) => assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        ),
        other => panic!("expected a double, got {:?}", other),
    }
}

pub fn expect_str(body: Vec<Stmt>, expected: &str) {
    expect_str_with(vec![], body, expected);
}

pub fn expect_str_with(decls: Vec<Stmt>, body: Vec<Stmt>, expected: &str) {
    let (vm, result) = run(with_main(decls, t_string(), body));
    let value = result.expect("main should return a value");
    assert_eq!(vm.string_value(&value).as_deref(), Some(expected));
}

pub fn expect_bool(body: Vec<Stmt>, expected: bool) {
    expect_bool_with(vec![], body, expected);
}

pub fn expect_bool_with(decls: Vec<Stmt>, body: Vec<Stmt>, expected: bool) {
    let (_, result) = run(with_main(decls, t_boolean(), body));
    assert_eq!(result, Some(Value::Int(expected as i32)));
}

/// Compilation must fail; returns the error for further checks
pub fn expect_compile_error(decls: Vec<Stmt>) -> CompileError {
    match compile(decls) {
        Ok(classes) => panic!("expected a compile error, got {} classes", classes.len()),
        Err(err) => err,
    }
}
