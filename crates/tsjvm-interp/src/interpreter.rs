//! Bytecode execution

use crate::error::VmError;
use crate::value::{Object, Value};
use crate::vm::{Exec, Trap, Vm, MAX_CALL_DEPTH};
use std::rc::Rc;
use tsjvm_classfile::code::array_type_descriptor;
use tsjvm_classfile::descriptor::{self, parse_method};
use tsjvm_classfile::reader::CodeInfo;
use tsjvm_classfile::{ClassFile, Constant, Instruction, Opcode, Operand};

/// Locals and operand stack of one activation
struct Frame {
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Exec<Value> {
        self.stack.pop().ok_or(Trap::Fatal(VmError::StackUnderflow))
    }

    fn pop_int(&mut self) -> Exec<i32> {
        match self.pop()? {
            Value::Int(v) => Ok(v),
            other => Err(confused("int", other)),
        }
    }

    fn pop_long(&mut self) -> Exec<i64> {
        match self.pop()? {
            Value::Long(v) => Ok(v),
            other => Err(confused("long", other)),
        }
    }

    fn pop_float(&mut self) -> Exec<f32> {
        match self.pop()? {
            Value::Float(v) => Ok(v),
            other => Err(confused("float", other)),
        }
    }

    fn pop_double(&mut self) -> Exec<f64> {
        match self.pop()? {
            Value::Double(v) => Ok(v),
            other => Err(confused("double", other)),
        }
    }

    /// Pop a reference; `None` for null
    fn pop_ref(&mut self) -> Exec<Option<usize>> {
        match self.pop()? {
            Value::Ref(r) => Ok(Some(r)),
            Value::Null => Ok(None),
            other => Err(confused("reference", other)),
        }
    }

    fn load(&self, slot: u16) -> Exec<Value> {
        self.locals.get(slot as usize).copied().ok_or_else(|| {
            Trap::Fatal(VmError::TypeConfusion(format!("local {} out of range", slot)))
        })
    }

    fn store(&mut self, slot: u16, value: Value) -> Exec<()> {
        let slot = slot as usize;
        let needed = slot + if value.is_wide() { 2 } else { 1 };
        if needed > self.locals.len() {
            self.locals.resize(needed, Value::Null);
        }
        self.locals[slot] = value;
        Ok(())
    }
}

fn confused(expected: &str, found: Value) -> Trap {
    Trap::Fatal(VmError::TypeConfusion(format!(
        "expected {}, found {:?}",
        expected, found
    )))
}

/// What the next instruction is
enum Flow {
    Next,
    Jump(usize),
    Return(Option<Value>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum InvokeKind {
    Static,
    Special,
    Virtual,
}

impl Vm {
    /// Execute a method of a loaded class with arguments in declaration order
    /// (receiver first for instance methods)
    pub(crate) fn run_method(
        &mut self,
        class: &Rc<ClassFile>,
        index: usize,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let method = Vm::member(class, index)?;
        let code = method.code.as_ref().ok_or_else(|| VmError::UnknownMethod {
            owner: class.this_class.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        })?;

        if self.depth >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow.into());
        }
        self.depth += 1;

        let mut frame = Frame {
            locals: vec![Value::Null; code.max_locals as usize],
            stack: Vec::with_capacity(code.max_stack as usize),
        };
        let mut slot = 0u16;
        for arg in args {
            let wide = arg.is_wide();
            frame.store(slot, arg)?;
            slot += if wide { 2 } else { 1 };
        }

        let result = self.execute(class, code, &mut frame);
        self.depth -= 1;
        result
    }

    fn execute(
        &mut self,
        class: &ClassFile,
        code: &CodeInfo,
        frame: &mut Frame,
    ) -> Exec<Option<Value>> {
        let mut pc = 0usize;
        loop {
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(VmError::StepLimitExceeded(self.step_limit).into());
            }
            let insn = Instruction::decode(&code.code, pc)
                .map_err(|e| VmError::Malformed(format!("{} at {}", e, pc)))?;
            match self.step(class, &insn, frame) {
                Ok(Flow::Next) => pc = insn.next_pc(),
                Ok(Flow::Jump(target)) => pc = target,
                Ok(Flow::Return(value)) => return Ok(value),
                Err(Trap::Throw(exc)) => match self.find_handler(class, code, pc, exc)? {
                    Some(handler) => {
                        frame.stack.clear();
                        frame.push(Value::Ref(exc));
                        pc = handler;
                    }
                    None => return Err(Trap::Throw(exc)),
                },
                Err(fatal) => return Err(fatal),
            }
        }
    }

    fn find_handler(
        &self,
        class: &ClassFile,
        code: &CodeInfo,
        pc: usize,
        exc: usize,
    ) -> Exec<Option<usize>> {
        let thrown = self.class_of(exc)?;
        for entry in &code.exception_table {
            if pc < entry.start_pc as usize || pc >= entry.end_pc as usize {
                continue;
            }
            if entry.catch_type == 0 {
                return Ok(Some(entry.handler_pc as usize));
            }
            let catch = class
                .pool
                .class_name_at(entry.catch_type)
                .ok_or_else(|| {
                    VmError::Malformed(format!("bad catch type #{}", entry.catch_type))
                })?;
            if self.is_subclass(&thrown, catch) {
                return Ok(Some(entry.handler_pc as usize));
            }
        }
        Ok(None)
    }

    fn step(&mut self, class: &ClassFile, insn: &Instruction, frame: &mut Frame) -> Exec<Flow> {
        use Opcode::*;
        let op = insn.opcode;
        match op {
            Nop => {}
            AconstNull => frame.push(Value::Null),
            IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => {
                frame.push(Value::Int(op.to_u8() as i32 - Iconst0.to_u8() as i32))
            }
            Lconst0 | Lconst1 => frame.push(Value::Long((op.to_u8() - Lconst0.to_u8()) as i64)),
            Fconst0 | Fconst1 | Fconst2 => {
                frame.push(Value::Float((op.to_u8() - Fconst0.to_u8()) as f32))
            }
            Dconst0 | Dconst1 => frame.push(Value::Double((op.to_u8() - Dconst0.to_u8()) as f64)),
            Bipush | Sipush => match insn.operand {
                Operand::Byte(v) => frame.push(Value::Int(v as i32)),
                Operand::Short(v) => frame.push(Value::Int(v as i32)),
                _ => return Err(bad_operand(insn)),
            },
            Ldc | LdcW | Ldc2W => {
                let index = constant_index(insn)?;
                let value = self.load_constant(class, index)?;
                frame.push(value);
            }

            Iload | Lload | Fload | Dload | Aload | Iload0 | Iload1 | Iload2 | Iload3 | Lload0
            | Lload1 | Lload2 | Lload3 | Fload0 | Fload1 | Fload2 | Fload3 | Dload0 | Dload1
            | Dload2 | Dload3 | Aload0 | Aload1 | Aload2 | Aload3 => {
                let slot = insn.local_index().ok_or_else(|| bad_operand(insn))?;
                let value = frame.load(slot)?;
                frame.push(value);
            }
            Istore | Lstore | Fstore | Dstore | Astore | Istore0 | Istore1 | Istore2 | Istore3
            | Lstore0 | Lstore1 | Lstore2 | Lstore3 | Fstore0 | Fstore1 | Fstore2 | Fstore3
            | Dstore0 | Dstore1 | Dstore2 | Dstore3 | Astore0 | Astore1 | Astore2 | Astore3 => {
                let slot = insn.local_index().ok_or_else(|| bad_operand(insn))?;
                let value = frame.pop()?;
                frame.store(slot, value)?;
            }
            Iinc => match insn.operand {
                Operand::Iinc { local, delta } => {
                    let value = match frame.load(local)? {
                        Value::Int(v) => v,
                        other => return Err(confused("int", other)),
                    };
                    frame.store(local, Value::Int(value.wrapping_add(delta as i32)))?;
                }
                _ => return Err(bad_operand(insn)),
            },

            Iaload | Laload | Faload | Daload | Aaload | Baload | Caload | Saload => {
                let index = frame.pop_int()?;
                let array = frame.pop_ref()?;
                let value = self.array_load(array, index)?;
                frame.push(value);
            }
            Iastore | Lastore | Fastore | Dastore | Aastore | Bastore | Castore | Sastore => {
                let value = frame.pop()?;
                let index = frame.pop_int()?;
                let array = frame.pop_ref()?;
                self.array_store(array, index, value)?;
            }
            Arraylength => {
                let array = frame.pop_ref()?.ok_or_else(|| self.null_pointer())?;
                match self.heap.get(array)? {
                    Object::Array { values, .. } => frame.push(Value::Int(values.len() as i32)),
                    _ => {
                        return Err(VmError::TypeConfusion("arraylength on non-array".into()).into())
                    }
                }
            }

            Pop => {
                frame.pop()?;
            }
            Pop2 => {
                if !frame.pop()?.is_wide() {
                    frame.pop()?;
                }
            }
            Dup => {
                let v = frame.pop()?;
                frame.push(v);
                frame.push(v);
            }
            DupX1 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                push_all(frame, &[v1, v2, v1]);
            }
            DupX2 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                if v2.is_wide() {
                    push_all(frame, &[v1, v2, v1]);
                } else {
                    let v3 = frame.pop()?;
                    push_all(frame, &[v1, v3, v2, v1]);
                }
            }
            Dup2 => {
                let v1 = frame.pop()?;
                if v1.is_wide() {
                    push_all(frame, &[v1, v1]);
                } else {
                    let v2 = frame.pop()?;
                    push_all(frame, &[v2, v1, v2, v1]);
                }
            }
            Dup2X1 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                if v1.is_wide() {
                    push_all(frame, &[v1, v2, v1]);
                } else {
                    let v3 = frame.pop()?;
                    push_all(frame, &[v2, v1, v3, v2, v1]);
                }
            }
            Dup2X2 => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                if v1.is_wide() {
                    if v2.is_wide() {
                        push_all(frame, &[v1, v2, v1]);
                    } else {
                        let v3 = frame.pop()?;
                        push_all(frame, &[v1, v3, v2, v1]);
                    }
                } else {
                    let v3 = frame.pop()?;
                    if v3.is_wide() {
                        push_all(frame, &[v2, v1, v3, v2, v1]);
                    } else {
                        let v4 = frame.pop()?;
                        push_all(frame, &[v2, v1, v4, v3, v2, v1]);
                    }
                }
            }
            Swap => {
                let v1 = frame.pop()?;
                let v2 = frame.pop()?;
                push_all(frame, &[v1, v2]);
            }

            Iadd | Isub | Imul | Idiv | Irem | Ishl | Ishr | Iushr | Iand | Ior | Ixor => {
                let b = frame.pop_int()?;
                let a = frame.pop_int()?;
                if matches!(op, Idiv | Irem) && b == 0 {
                    return Err(self.throw_new("java/lang/ArithmeticException", Some("/ by zero")));
                }
                frame.push(Value::Int(int_op(op, a, b)));
            }
            Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor => {
                let b = frame.pop_long()?;
                let a = frame.pop_long()?;
                if matches!(op, Ldiv | Lrem) && b == 0 {
                    return Err(self.throw_new("java/lang/ArithmeticException", Some("/ by zero")));
                }
                frame.push(Value::Long(long_op(op, a, b)));
            }
            Lshl | Lshr | Lushr => {
                let shift = frame.pop_int()? as u32 & 63;
                let a = frame.pop_long()?;
                frame.push(Value::Long(match op {
                    Lshl => a.wrapping_shl(shift),
                    Lshr => a.wrapping_shr(shift),
                    _ => ((a as u64) >> shift) as i64,
                }));
            }
            Fadd | Fsub | Fmul | Fdiv | Frem => {
                let b = frame.pop_float()?;
                let a = frame.pop_float()?;
                frame.push(Value::Float(match op {
                    Fadd => a + b,
                    Fsub => a - b,
                    Fmul => a * b,
                    Fdiv => a / b,
                    _ => a % b,
                }));
            }
            Dadd | Dsub | Dmul | Ddiv | Drem => {
                let b = frame.pop_double()?;
                let a = frame.pop_double()?;
                frame.push(Value::Double(match op {
                    Dadd => a + b,
                    Dsub => a - b,
                    Dmul => a * b,
                    Ddiv => a / b,
                    _ => a % b,
                }));
            }
            Ineg => {
                let v = frame.pop_int()?;
                frame.push(Value::Int(v.wrapping_neg()));
            }
            Lneg => {
                let v = frame.pop_long()?;
                frame.push(Value::Long(v.wrapping_neg()));
            }
            Fneg => {
                let v = frame.pop_float()?;
                frame.push(Value::Float(-v));
            }
            Dneg => {
                let v = frame.pop_double()?;
                frame.push(Value::Double(-v));
            }

            I2l | I2f | I2d | I2b | I2c | I2s => {
                let v = frame.pop_int()?;
                frame.push(match op {
                    I2l => Value::Long(v as i64),
                    I2f => Value::Float(v as f32),
                    I2d => Value::Double(v as f64),
                    I2b => Value::Int(v as i8 as i32),
                    I2c => Value::Int(v as u16 as i32),
                    _ => Value::Int(v as i16 as i32),
                });
            }
            L2i | L2f | L2d => {
                let v = frame.pop_long()?;
                frame.push(match op {
                    L2i => Value::Int(v as i32),
                    L2f => Value::Float(v as f32),
                    _ => Value::Double(v as f64),
                });
            }
            F2i | F2l | F2d => {
                let v = frame.pop_float()?;
                frame.push(match op {
                    F2i => Value::Int(v as i32),
                    F2l => Value::Long(v as i64),
                    _ => Value::Double(v as f64),
                });
            }
            D2i | D2l | D2f => {
                let v = frame.pop_double()?;
                frame.push(match op {
                    D2i => Value::Int(v as i32),
                    D2l => Value::Long(v as i64),
                    _ => Value::Float(v as f32),
                });
            }

            Lcmp => {
                let b = frame.pop_long()?;
                let a = frame.pop_long()?;
                frame.push(Value::Int(a.cmp(&b) as i32));
            }
            Fcmpl | Fcmpg => {
                let b = frame.pop_float()?;
                let a = frame.pop_float()?;
                frame.push(Value::Int(compare_floats(
                    a.partial_cmp(&b),
                    op == Fcmpg,
                )));
            }
            Dcmpl | Dcmpg => {
                let b = frame.pop_double()?;
                let a = frame.pop_double()?;
                frame.push(Value::Int(compare_floats(
                    a.partial_cmp(&b),
                    op == Dcmpg,
                )));
            }

            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => {
                let v = frame.pop_int()?;
                let taken = match op {
                    Ifeq => v == 0,
                    Ifne => v != 0,
                    Iflt => v < 0,
                    Ifge => v >= 0,
                    Ifgt => v > 0,
                    _ => v <= 0,
                };
                return branch(insn, taken);
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => {
                let b = frame.pop_int()?;
                let a = frame.pop_int()?;
                let taken = match op {
                    IfIcmpeq => a == b,
                    IfIcmpne => a != b,
                    IfIcmplt => a < b,
                    IfIcmpge => a >= b,
                    IfIcmpgt => a > b,
                    _ => a <= b,
                };
                return branch(insn, taken);
            }
            IfAcmpeq | IfAcmpne => {
                let b = frame.pop_ref()?;
                let a = frame.pop_ref()?;
                return branch(insn, (a == b) == (op == IfAcmpeq));
            }
            Ifnull | Ifnonnull => {
                let v = frame.pop_ref()?;
                return branch(insn, v.is_none() == (op == Ifnull));
            }
            Goto | GotoW => return branch(insn, true),

            Ireturn | Lreturn | Freturn | Dreturn | Areturn => {
                return Ok(Flow::Return(Some(frame.pop()?)))
            }
            Return => return Ok(Flow::Return(None)),

            Getstatic | Putstatic => {
                let (owner, name) = field_ref(class, insn)?;
                self.ensure_initialized(&owner)?;
                let declaring = self.static_owner(&owner, &name).ok_or_else(|| {
                    VmError::UnknownField {
                        owner: owner.clone(),
                        name: name.clone(),
                    }
                })?;
                if op == Getstatic {
                    let value = self.static_value(&declaring, &name)?;
                    frame.push(value);
                } else {
                    let value = frame.pop()?;
                    self.set_static(&declaring, &name, value);
                }
            }
            Getfield => {
                let (owner, name) = field_ref(class, insn)?;
                let target = frame.pop_ref()?.ok_or_else(|| self.null_pointer())?;
                let value = match self.heap.get(target)? {
                    Object::Instance { fields, .. } => fields.get(&name).copied(),
                    _ => None,
                };
                frame.push(value.ok_or(VmError::UnknownField { owner, name })?);
            }
            Putfield => {
                let (owner, name) = field_ref(class, insn)?;
                let value = frame.pop()?;
                let target = frame.pop_ref()?.ok_or_else(|| self.null_pointer())?;
                match self.heap.get_mut(target)? {
                    Object::Instance { fields, .. } => {
                        fields.insert(name, value);
                    }
                    _ => return Err(VmError::UnknownField { owner, name }.into()),
                }
            }

            Invokevirtual | Invokeinterface => {
                self.invoke(class, insn, frame, InvokeKind::Virtual)?
            }
            Invokespecial => self.invoke(class, insn, frame, InvokeKind::Special)?,
            Invokestatic => self.invoke(class, insn, frame, InvokeKind::Static)?,

            New => {
                let name = class_ref(class, insn)?;
                let r = if self.classes.contains_key(&name) {
                    self.ensure_initialized(&name)?;
                    self.instantiate(&name)
                } else {
                    self.new_builtin(&name)?
                };
                frame.push(Value::Ref(r));
            }
            Newarray | Anewarray => {
                let elem = match insn.operand {
                    Operand::ArrayType(code) => array_type_descriptor(code)
                        .ok_or_else(|| bad_operand(insn))?
                        .to_string(),
                    _ => descriptor::object_descriptor(&class_ref(class, insn)?),
                };
                let len = frame.pop_int()?;
                if len < 0 {
                    return Err(self.throw_new(
                        "java/lang/NegativeArraySizeException",
                        Some(&len.to_string()),
                    ));
                }
                let values = vec![Value::default_for(&elem); len as usize];
                let r = self.heap.alloc(Object::Array { elem, values });
                frame.push(Value::Ref(r));
            }
            Athrow => {
                let exc = frame.pop_ref()?.ok_or_else(|| self.null_pointer())?;
                return Err(Trap::Throw(exc));
            }
            Checkcast => {
                let target = class_ref(class, insn)?;
                let value = frame.pop()?;
                if let Value::Ref(r) = value {
                    let actual = self.class_of(r)?;
                    if !self.is_subclass(&actual, &target) {
                        let message = format!(
                            "class {} cannot be cast to class {}",
                            actual.replace('/', "."),
                            target.replace('/', ".")
                        );
                        return Err(self.throw_new("java/lang/ClassCastException", Some(&message)));
                    }
                }
                frame.push(value);
            }
            Instanceof => {
                let target = class_ref(class, insn)?;
                let result = match frame.pop_ref()? {
                    Some(r) => self.is_subclass(&self.class_of(r)?, &target),
                    None => false,
                };
                frame.push(Value::Int(result as i32));
            }
            Wide => return Err(bad_operand(insn)),
        }
        Ok(Flow::Next)
    }

    fn load_constant(&mut self, class: &ClassFile, index: u16) -> Exec<Value> {
        let constant = class
            .pool
            .get(index)
            .ok_or_else(|| VmError::Malformed(format!("bad constant #{}", index)))?;
        Ok(match constant {
            Constant::Integer(v) => Value::Int(*v),
            Constant::Float(bits) => Value::Float(f32::from_bits(*bits)),
            Constant::Long(v) => Value::Long(*v),
            Constant::Double(bits) => Value::Double(f64::from_bits(*bits)),
            Constant::String(_) => {
                let s = class
                    .pool
                    .string_at(index)
                    .ok_or_else(|| VmError::Malformed(format!("bad string #{}", index)))?
                    .to_string();
                Value::Ref(self.intern(&s))
            }
            Constant::Class(_) => {
                let name = class
                    .pool
                    .class_name_at(index)
                    .ok_or_else(|| VmError::Malformed(format!("bad class #{}", index)))?
                    .to_string();
                Value::Ref(self.class_object(&name))
            }
            other => {
                return Err(VmError::Malformed(format!("cannot ldc {:?}", other)).into());
            }
        })
    }

    fn array_load(&mut self, array: Option<usize>, index: i32) -> Exec<Value> {
        let array = array.ok_or_else(|| self.null_pointer())?;
        let found = match self.heap.get(array)? {
            Object::Array { values, .. } => usize::try_from(index)
                .ok()
                .and_then(|i| values.get(i).copied()),
            _ => return Err(VmError::TypeConfusion("element load from non-array".into()).into()),
        };
        match found {
            Some(value) => Ok(value),
            None => Err(self.index_out_of_bounds(array, index)),
        }
    }

    fn array_store(&mut self, array: Option<usize>, index: i32, value: Value) -> Exec<()> {
        let array = array.ok_or_else(|| self.null_pointer())?;
        let stored = match self.heap.get_mut(array)? {
            Object::Array { elem, values } => {
                let value = match (elem.as_str(), value) {
                    ("Z", Value::Int(v)) => Value::Int(v & 1),
                    ("B", Value::Int(v)) => Value::Int(v as i8 as i32),
                    ("C", Value::Int(v)) => Value::Int(v as u16 as i32),
                    ("S", Value::Int(v)) => Value::Int(v as i16 as i32),
                    (_, v) => v,
                };
                match usize::try_from(index).ok().and_then(|i| values.get_mut(i)) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                }
            }
            _ => return Err(VmError::TypeConfusion("element store to non-array".into()).into()),
        };
        if stored {
            Ok(())
        } else {
            Err(self.index_out_of_bounds(array, index))
        }
    }

    fn index_out_of_bounds(&mut self, array: usize, index: i32) -> Trap {
        let len = match self.heap.get(array) {
            Ok(Object::Array { values, .. }) => values.len(),
            _ => 0,
        };
        let message = format!("Index {} out of bounds for length {}", index, len);
        self.throw_new("java/lang/ArrayIndexOutOfBoundsException", Some(&message))
    }

    fn invoke(
        &mut self,
        class: &ClassFile,
        insn: &Instruction,
        frame: &mut Frame,
        kind: InvokeKind,
    ) -> Exec<()> {
        let index = constant_index(insn)?;
        let member = class
            .pool
            .member_ref_at(index)
            .ok_or_else(|| VmError::Malformed(format!("bad method ref #{}", index)))?;
        let (owner, name, desc) = (
            member.owner.to_string(),
            member.name.to_string(),
            member.descriptor.to_string(),
        );
        let (params, ret) = parse_method(&desc)
            .ok_or_else(|| VmError::Malformed(format!("bad descriptor {}", desc)))?;
        let returns = ret != "V";

        let mut args = Vec::with_capacity(params.len() + 1);
        for _ in 0..params.len() {
            args.push(frame.pop()?);
        }
        if kind != InvokeKind::Static {
            let receiver = frame.pop()?;
            if receiver == Value::Null {
                return Err(self.null_pointer());
            }
            args.push(receiver);
        }
        args.reverse();

        let result = match kind {
            InvokeKind::Static => self.call_static(&owner, &name, &desc, args)?,
            InvokeKind::Special => self.call_special(&owner, &name, &desc, args)?,
            InvokeKind::Virtual => self.call_virtual(&owner, &name, &desc, args)?,
        };
        if returns {
            let value = result.ok_or_else(|| {
                VmError::TypeConfusion(format!("{}.{}{} returned nothing", owner, name, desc))
            })?;
            frame.push(value);
        }
        Ok(())
    }

    pub(crate) fn call_static(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        if self.classes.contains_key(owner) {
            self.ensure_initialized(owner)?;
            let (file, index) = self
                .find_method(owner, name, desc)
                .ok_or_else(|| unknown_method(owner, name, desc))?;
            return self.run_method(&file, index, args);
        }
        self.native_static(owner, name, desc, args)
    }

    fn call_special(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        if let Some((file, index)) = self.find_method(owner, name, desc) {
            return self.run_method(&file, index, args);
        }
        if self.classes.contains_key(owner) && name == "<init>" {
            return Err(unknown_method(owner, name, desc).into());
        }
        if name == "<init>" {
            self.native_init(owner, desc, args)?;
            return Ok(None);
        }
        self.native_virtual(owner, name, desc, args)
    }

    pub(crate) fn call_virtual(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let receiver = args
            .first()
            .and_then(Value::as_ref)
            .ok_or_else(|| VmError::TypeConfusion("virtual call without receiver".into()))?;
        let runtime = self.class_of(receiver)?;
        if let Some((file, index)) = self.find_method(&runtime, name, desc) {
            return self.run_method(&file, index, args);
        }
        self.native_virtual(owner, name, desc, args)
    }
}

fn push_all(frame: &mut Frame, values: &[Value]) {
    frame.stack.extend_from_slice(values);
}

fn int_op(op: Opcode, a: i32, b: i32) -> i32 {
    match op {
        Opcode::Iadd => a.wrapping_add(b),
        Opcode::Isub => a.wrapping_sub(b),
        Opcode::Imul => a.wrapping_mul(b),
        Opcode::Idiv => a.wrapping_div(b),
        Opcode::Irem => a.wrapping_rem(b),
        Opcode::Ishl => a.wrapping_shl(b as u32 & 31),
        Opcode::Ishr => a.wrapping_shr(b as u32 & 31),
        Opcode::Iushr => ((a as u32) >> (b as u32 & 31)) as i32,
        Opcode::Iand => a & b,
        Opcode::Ior => a | b,
        _ => a ^ b,
    }
}

fn long_op(op: Opcode, a: i64, b: i64) -> i64 {
    match op {
        Opcode::Ladd => a.wrapping_add(b),
        Opcode::Lsub => a.wrapping_sub(b),
        Opcode::Lmul => a.wrapping_mul(b),
        Opcode::Ldiv => a.wrapping_div(b),
        Opcode::Lrem => a.wrapping_rem(b),
        Opcode::Land => a & b,
        Opcode::Lor => a | b,
        _ => a ^ b,
    }
}

/// `fcmpg`/`dcmpg` push 1 for NaN, the `l` forms push -1
fn compare_floats(ordering: Option<std::cmp::Ordering>, nan_is_greater: bool) -> i32 {
    match ordering {
        Some(ordering) => ordering as i32,
        None if nan_is_greater => 1,
        None => -1,
    }
}

fn branch(insn: &Instruction, taken: bool) -> Exec<Flow> {
    if !taken {
        return Ok(Flow::Next);
    }
    insn.branch_target()
        .map(Flow::Jump)
        .ok_or_else(|| bad_operand(insn))
}

fn constant_index(insn: &Instruction) -> Exec<u16> {
    match insn.operand {
        Operand::Constant(index) | Operand::Interface { index, .. } => Ok(index),
        _ => Err(bad_operand(insn)),
    }
}

fn field_ref(class: &ClassFile, insn: &Instruction) -> Exec<(String, String)> {
    let index = constant_index(insn)?;
    let member = class
        .pool
        .member_ref_at(index)
        .ok_or_else(|| VmError::Malformed(format!("bad field ref #{}", index)))?;
    Ok((member.owner.to_string(), member.name.to_string()))
}

fn class_ref(class: &ClassFile, insn: &Instruction) -> Exec<String> {
    let index = constant_index(insn)?;
    class
        .pool
        .class_name_at(index)
        .map(str::to_string)
        .ok_or_else(|| VmError::Malformed(format!("bad class ref #{}", index)).into())
}

fn bad_operand(insn: &Instruction) -> Trap {
    Trap::Fatal(VmError::Malformed(format!(
        "unexpected operand for {} at {}",
        insn.opcode.name(),
        insn.pc
    )))
}

pub(crate) fn unknown_method(owner: &str, name: &str, desc: &str) -> VmError {
    VmError::UnknownMethod {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: desc.to_string(),
    }
}
