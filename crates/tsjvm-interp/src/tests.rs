use crate::{Vm, VmError, Value};
use tsjvm_classfile::{access, ClassVersion, ClassWriter, CodeBuilder, LocalKind, Opcode};

fn class(name: &str) -> ClassWriter {
    ClassWriter::new(
        ClassVersion::JAVA_17,
        access::PUBLIC | access::SUPER,
        name,
        "java/lang/Object",
    )
}

fn static_method(class: &mut ClassWriter, name: &str, desc: &str, code: CodeBuilder) {
    class
        .add_method_code(access::PUBLIC | access::STATIC, name, desc, code, 0)
        .unwrap();
}

fn default_ctor(class: &mut ClassWriter) {
    let mut code = CodeBuilder::new();
    code.load(LocalKind::Reference, 0);
    let init = class.pool().method_ref("java/lang/Object", "<init>", "()V");
    code.invoke_special(init);
    code.emit(Opcode::Return);
    class
        .add_method_code(access::PUBLIC, "<init>", "()V", code, 0)
        .unwrap();
}

fn load(classes: Vec<ClassWriter>) -> Vm {
    let mut vm = Vm::new();
    for mut class in classes {
        vm.load_class(&class.to_bytes().unwrap()).unwrap();
    }
    vm
}

#[test]
fn test_add_arguments() {
    let mut c = class("demo/Calc");
    let mut code = CodeBuilder::new();
    code.load(LocalKind::Int, 0);
    code.load(LocalKind::Int, 1);
    code.emit(Opcode::Iadd);
    code.emit(Opcode::Ireturn);
    static_method(&mut c, "add", "(II)I", code);
    let mut vm = load(vec![c]);
    let result = vm
        .invoke_static("demo.Calc", "add", &[Value::Int(2), Value::Int(3)])
        .unwrap();
    assert_eq!(result, Some(Value::Int(5)));
}

#[test]
fn test_loop_sums_to_45() {
    // int sum = 0; for (int i = 0; i < 10; i++) sum += i; return sum;
    let mut c = class("demo/Loop");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    code.push_int(pool, 0);
    code.store(LocalKind::Int, 0);
    code.push_int(pool, 0);
    code.store(LocalKind::Int, 1);
    let head = code.offset();
    code.load(LocalKind::Int, 1);
    code.push_int(pool, 10);
    let exit = code.jump(Opcode::IfIcmpge);
    code.load(LocalKind::Int, 0);
    code.load(LocalKind::Int, 1);
    code.emit(Opcode::Iadd);
    code.store(LocalKind::Int, 0);
    code.iinc(1, 1);
    code.jump_to(Opcode::Goto, head).unwrap();
    let end = code.offset();
    code.patch_jump(exit, end).unwrap();
    code.load(LocalKind::Int, 0);
    code.emit(Opcode::Ireturn);
    static_method(&mut c, "sum", "()I", code);
    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo/Loop", "sum", &[]).unwrap(),
        Some(Value::Int(45))
    );
}

#[test]
fn test_double_arithmetic_and_wide_locals() {
    // double a = 1.5; long n = 4; return a * n;
    let mut c = class("demo/Wide");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    code.push_double(pool, 1.5);
    code.store(LocalKind::Double, 0);
    code.push_long(pool, 4);
    code.store(LocalKind::Long, 2);
    code.load(LocalKind::Double, 0);
    code.load(LocalKind::Long, 2);
    code.emit(Opcode::L2d);
    code.emit(Opcode::Dmul);
    code.emit(Opcode::Dreturn);
    static_method(&mut c, "run", "()D", code);
    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo.Wide", "run", &[]).unwrap(),
        Some(Value::Double(6.0))
    );
}

#[test]
fn test_string_builder_concatenation() {
    // return new StringBuilder().append("x=").append(1.5).append(true).toString();
    let mut c = class("demo/Concat");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    let sb = pool.class("java/lang/StringBuilder");
    let init = pool.method_ref("java/lang/StringBuilder", "<init>", "()V");
    let append_str = pool.method_ref(
        "java/lang/StringBuilder",
        "append",
        "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
    );
    let append_d = pool.method_ref(
        "java/lang/StringBuilder",
        "append",
        "(D)Ljava/lang/StringBuilder;",
    );
    let append_z = pool.method_ref(
        "java/lang/StringBuilder",
        "append",
        "(Z)Ljava/lang/StringBuilder;",
    );
    let to_string = pool.method_ref("java/lang/StringBuilder", "toString", "()Ljava/lang/String;");
    code.new_object(sb);
    code.emit(Opcode::Dup);
    code.invoke_special(init);
    code.push_string(pool, "x=");
    code.invoke_virtual(append_str);
    code.push_double(pool, 1.5);
    code.invoke_virtual(append_d);
    code.push_int(pool, 1);
    code.invoke_virtual(append_z);
    code.invoke_virtual(to_string);
    code.emit(Opcode::Areturn);
    static_method(&mut c, "text", "()Ljava/lang/String;", code);
    let mut vm = load(vec![c]);
    let result = vm.invoke_static("demo.Concat", "text", &[]).unwrap().unwrap();
    assert_eq!(vm.string_value(&result).as_deref(), Some("x=1.5true"));
}

#[test]
fn test_caught_division_by_zero() {
    // try { return 1 / 0; } catch (ArithmeticException e) { return -1; }
    let mut c = class("demo/Catch");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    let start = code.offset();
    code.push_int(pool, 1);
    code.push_int(pool, 0);
    code.emit(Opcode::Idiv);
    code.emit(Opcode::Ireturn);
    let end = code.offset();
    code.store(LocalKind::Reference, 0);
    code.push_int(pool, -1);
    code.emit(Opcode::Ireturn);
    let catch = pool.class("java/lang/ArithmeticException");
    code.add_exception_handler(start, end, end, catch);
    static_method(&mut c, "run", "()I", code);
    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo.Catch", "run", &[]).unwrap(),
        Some(Value::Int(-1))
    );
}

#[test]
fn test_uncaught_runtime_error() {
    // throw new JsError("boom");
    let mut c = class("demo/Throw");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    let error = pool.class("tsjvm/runtime/JsError");
    let init = pool.method_ref("tsjvm/runtime/JsError", "<init>", "(Ljava/lang/String;)V");
    code.new_object(error);
    code.emit(Opcode::Dup);
    code.push_string(pool, "boom");
    code.invoke_special(init);
    code.emit(Opcode::Athrow);
    static_method(&mut c, "run", "()V", code);
    let mut vm = load(vec![c]);
    let err = vm.invoke_static("demo.Throw", "run", &[]).unwrap_err();
    assert_eq!(
        err,
        VmError::Uncaught {
            class: "tsjvm.runtime.JsError".to_string(),
            message: Some("boom".to_string()),
        }
    );
}

#[test]
fn test_step_limit() {
    let mut c = class("demo/Spin");
    let mut code = CodeBuilder::new();
    let head = code.offset();
    code.emit(Opcode::Nop);
    code.jump_to(Opcode::Goto, head).unwrap();
    static_method(&mut c, "run", "()V", code);
    let mut vm = load(vec![c]);
    vm.set_step_limit(1000);
    assert_eq!(
        vm.invoke_static("demo.Spin", "run", &[]).unwrap_err(),
        VmError::StepLimitExceeded(1000)
    );
}

#[test]
fn test_fields_and_static_init() {
    // class Point { int x; static int created = 40; }
    // static int run() { Point p = new Point(); p.x = 2; return p.x + created; }
    let mut c = class("demo/Point");
    c.add_field(access::PUBLIC, "x", "I");
    c.add_field(access::PUBLIC | access::STATIC, "created", "I");
    default_ctor(&mut c);

    let mut clinit = CodeBuilder::new();
    let pool = c.pool();
    let created = pool.field_ref("demo/Point", "created", "I");
    clinit.push_int(pool, 40);
    clinit.put_static(created);
    clinit.emit(Opcode::Return);
    c.add_method_code(access::STATIC, "<clinit>", "()V", clinit, 0)
        .unwrap();

    let mut code = CodeBuilder::new();
    let pool = c.pool();
    let point = pool.class("demo/Point");
    let init = pool.method_ref("demo/Point", "<init>", "()V");
    let x = pool.field_ref("demo/Point", "x", "I");
    code.new_object(point);
    code.emit(Opcode::Dup);
    code.invoke_special(init);
    code.store(LocalKind::Reference, 0);
    code.load(LocalKind::Reference, 0);
    code.push_int(pool, 2);
    code.put_field(x);
    code.load(LocalKind::Reference, 0);
    code.get_field(x);
    code.get_static(created);
    code.emit(Opcode::Iadd);
    code.emit(Opcode::Ireturn);
    static_method(&mut c, "run", "()I", code);

    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo.Point", "run", &[]).unwrap(),
        Some(Value::Int(42))
    );
}

#[test]
fn test_virtual_dispatch_to_override() {
    // class Base { int value() { return 1; } }
    // class Derived extends Base { int value() { return 2; } }
    let mut base = class("demo/Base");
    default_ctor(&mut base);
    let mut code = CodeBuilder::new();
    code.push_int(base.pool(), 1);
    code.emit(Opcode::Ireturn);
    base.add_method_code(access::PUBLIC, "value", "()I", code, 0)
        .unwrap();

    let mut derived = ClassWriter::new(
        ClassVersion::JAVA_17,
        access::PUBLIC | access::SUPER,
        "demo/Derived",
        "demo/Base",
    );
    let mut ctor = CodeBuilder::new();
    ctor.load(LocalKind::Reference, 0);
    let super_init = derived.pool().method_ref("demo/Base", "<init>", "()V");
    ctor.invoke_special(super_init);
    ctor.emit(Opcode::Return);
    derived
        .add_method_code(access::PUBLIC, "<init>", "()V", ctor, 0)
        .unwrap();
    let mut code = CodeBuilder::new();
    code.push_int(derived.pool(), 2);
    code.emit(Opcode::Ireturn);
    derived
        .add_method_code(access::PUBLIC, "value", "()I", code, 0)
        .unwrap();

    // static int run() { Base b = new Derived(); return b.value(); }
    let mut code = CodeBuilder::new();
    let pool = derived.pool();
    let cls = pool.class("demo/Derived");
    let init = pool.method_ref("demo/Derived", "<init>", "()V");
    let value = pool.method_ref("demo/Base", "value", "()I");
    code.new_object(cls);
    code.emit(Opcode::Dup);
    code.invoke_special(init);
    code.invoke_virtual(value);
    code.emit(Opcode::Ireturn);
    static_method(&mut derived, "run", "()I", code);

    let mut vm = load(vec![base, derived]);
    assert_eq!(
        vm.invoke_static("demo.Derived", "run", &[]).unwrap(),
        Some(Value::Int(2))
    );
}

#[test]
fn test_array_store_and_bounds() {
    // int[] a = new int[2]; a[1] = 9; return a[1] + a.length;
    let mut c = class("demo/Arr");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    code.push_int(pool, 2);
    code.new_array(10);
    code.store(LocalKind::Reference, 0);
    code.load(LocalKind::Reference, 0);
    code.push_int(pool, 1);
    code.push_int(pool, 9);
    code.emit(Opcode::Iastore);
    code.load(LocalKind::Reference, 0);
    code.push_int(pool, 1);
    code.emit(Opcode::Iaload);
    code.load(LocalKind::Reference, 0);
    code.emit(Opcode::Arraylength);
    code.emit(Opcode::Iadd);
    code.emit(Opcode::Ireturn);
    static_method(&mut c, "run", "()I", code);

    // return new int[1][3];
    let mut bad = CodeBuilder::new();
    let pool = c.pool();
    bad.push_int(pool, 1);
    bad.new_array(10);
    bad.push_int(pool, 3);
    bad.emit(Opcode::Iaload);
    bad.emit(Opcode::Ireturn);
    static_method(&mut c, "bad", "()I", bad);

    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo.Arr", "run", &[]).unwrap(),
        Some(Value::Int(11))
    );
    assert!(matches!(
        vm.invoke_static("demo.Arr", "bad", &[]),
        Err(VmError::Uncaught { class, .. }) if class == "java.lang.ArrayIndexOutOfBoundsException"
    ));
}

#[test]
fn test_string_equality_via_objects_equals() {
    // return Objects.equals("ab", "a".concat("b"));
    let mut c = class("demo/Eq");
    let mut code = CodeBuilder::new();
    let pool = c.pool();
    let concat = pool.method_ref(
        "java/lang/String",
        "concat",
        "(Ljava/lang/String;)Ljava/lang/String;",
    );
    let equals = pool.method_ref(
        "java/util/Objects",
        "equals",
        "(Ljava/lang/Object;Ljava/lang/Object;)Z",
    );
    code.push_string(pool, "ab");
    code.push_string(pool, "a");
    code.push_string(pool, "b");
    code.invoke_virtual(concat);
    code.invoke_static(equals);
    code.emit(Opcode::Ireturn);
    static_method(&mut c, "run", "()Z", code);
    let mut vm = load(vec![c]);
    assert_eq!(
        vm.invoke_static("demo.Eq", "run", &[]).unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn test_display() {
    let mut vm = Vm::new();
    let s = vm.new_string("hi");
    assert_eq!(vm.display(&s), "hi");
    assert_eq!(vm.display(&Value::Double(60.0)), "60.0");
    assert_eq!(vm.display(&Value::Null), "null");
}
