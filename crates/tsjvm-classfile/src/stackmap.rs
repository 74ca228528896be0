//! Stack-map frame and max-stack computation
//!
//! A worklist data-flow pass over the decoded instructions. Each reachable
//! instruction gets an incoming frame; states flowing into an instruction
//! from several predecessors are merged. Frames are recorded at branch
//! targets and handler entry points, which is what the class-file format
//! requires from version 50 on.
//!
//! Unreachable instructions cannot be described by a frame the verifier
//! would accept, so they are overwritten with `nop ... athrow`, given a frame
//! of `[] / [Throwable]`, and cut out of every exception range.

use crate::code::ExceptionEntry;
use crate::constants::{Constant, ConstantPool};
use crate::descriptor;
use crate::error::ClassFileError;
use crate::frame::{StackMapFrame, VerificationType};
use crate::instruction::{decode_all, Instruction, Operand};
use crate::opcode::Opcode;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

const OBJECT: &str = "java/lang/Object";
const THROWABLE: &str = "java/lang/Throwable";

/// Superclass lookup used when two object types meet at a merge point
pub trait ClassHierarchy {
    /// Direct superclass of a class, `None` when unknown or `java/lang/Object`
    fn super_class(&self, internal_name: &str) -> Option<String>;

    /// Nearest class both types extend
    fn common_superclass(&self, a: &str, b: &str) -> String {
        if a == b {
            return a.to_string();
        }
        if a.starts_with('[') || b.starts_with('[') {
            return OBJECT.to_string();
        }
        let mut chain = vec![a.to_string()];
        let mut current = a.to_string();
        while let Some(parent) = self.super_class(&current) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        let mut current = b.to_string();
        let mut seen = 0;
        loop {
            if chain.contains(&current) {
                return current;
            }
            match self.super_class(&current) {
                Some(parent) if seen < 64 => {
                    current = parent;
                    seen += 1;
                }
                _ => return OBJECT.to_string(),
            }
        }
    }
}

/// Hierarchy that knows nothing: distinct classes merge to `java/lang/Object`
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHierarchy;

impl ClassHierarchy for ObjectHierarchy {
    fn super_class(&self, _internal_name: &str) -> Option<String> {
        None
    }
}

/// Result of analyzing one method body
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Code with unreachable ranges replaced
    pub code: Vec<u8>,
    /// Exception table with unreachable ranges removed
    pub exception_table: Vec<ExceptionEntry>,
    /// Frames sorted by offset
    pub frames: Vec<StackMapFrame>,
}

#[derive(Debug, Clone, PartialEq)]
struct State {
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
}

impl State {
    fn stack_slots(&self) -> usize {
        self.stack.iter().map(|t| t.size()).sum()
    }
}

/// Computes frames for the methods of one class
pub struct FrameAnalyzer<'a> {
    pool: &'a ConstantPool,
    this_class: &'a str,
    hierarchy: &'a dyn ClassHierarchy,
}

impl<'a> FrameAnalyzer<'a> {
    pub fn new(pool: &'a ConstantPool, this_class: &'a str) -> Self {
        Self {
            pool,
            this_class,
            hierarchy: &ObjectHierarchy,
        }
    }

    pub fn with_hierarchy(mut self, hierarchy: &'a dyn ClassHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Locals on method entry, slot-indexed
    pub fn initial_locals(
        &self,
        name: &str,
        method_descriptor: &str,
        is_static: bool,
    ) -> Result<Vec<VerificationType>, ClassFileError> {
        let (params, _) = descriptor::parse_method(method_descriptor)
            .ok_or_else(|| {
                ClassFileError::frame(0, format!("bad descriptor {}", method_descriptor))
            })?;
        let mut locals = Vec::new();
        if !is_static {
            if name == "<init>" && self.this_class != OBJECT {
                locals.push(VerificationType::UninitializedThis);
            } else {
                locals.push(VerificationType::object(self.this_class));
            }
        }
        for param in params {
            let ty = VerificationType::from_descriptor(param);
            let wide = ty.is_wide();
            locals.push(ty);
            if wide {
                locals.push(VerificationType::Top);
            }
        }
        Ok(locals)
    }

    /// Analyze a method body
    pub fn analyze(
        &self,
        name: &str,
        method_descriptor: &str,
        is_static: bool,
        code: &[u8],
        exception_table: &[ExceptionEntry],
    ) -> Result<FrameAnalysis, ClassFileError> {
        let insns =
            decode_all(code).map_err(|e| ClassFileError::frame(0, format!("decode: {}", e)))?;
        let index_of: FxHashMap<usize, usize> =
            insns.iter().enumerate().map(|(i, insn)| (insn.pc, i)).collect();
        let lookup = |pc: usize, at: usize| {
            index_of
                .get(&pc)
                .copied()
                .ok_or_else(|| {
                    ClassFileError::frame(at, format!("target {} is not an instruction", pc))
                })
        };

        let initial = self.initial_locals(name, method_descriptor, is_static)?;
        let mut max_locals = initial.len();
        let mut max_stack = 0usize;

        let mut frame_points = BTreeSet::new();
        for insn in &insns {
            if let Some(target) = insn.branch_target() {
                lookup(target, insn.pc)?;
                frame_points.insert(target);
            }
        }
        for entry in exception_table {
            lookup(entry.handler_pc as usize, entry.handler_pc as usize)?;
            frame_points.insert(entry.handler_pc as usize);
        }

        let mut states: Vec<Option<State>> = vec![None; insns.len()];
        let mut worklist = Vec::new();
        if insns.is_empty() {
            return Err(ClassFileError::frame(0, "empty code"));
        }
        states[0] = Some(State {
            locals: initial,
            stack: Vec::new(),
        });
        worklist.push(0usize);

        while let Some(idx) = worklist.pop() {
            let insn = insns[idx];
            let before = match &states[idx] {
                Some(state) => state.clone(),
                None => continue,
            };
            max_stack = max_stack.max(before.stack_slots());
            let mut after = before.clone();
            self.execute(&insn, &mut after)?;
            max_stack = max_stack.max(after.stack_slots());
            max_locals = max_locals.max(after.locals.len());

            let mut successors = Vec::new();
            if let Some(target) = insn.branch_target() {
                successors.push((lookup(target, insn.pc)?, after.clone()));
            }
            if !insn.opcode.is_terminator() {
                let next = insn.next_pc();
                if next >= code.len() {
                    return Err(ClassFileError::frame(insn.pc, "falls off the end of the code"));
                }
                successors.push((lookup(next, insn.pc)?, after.clone()));
            }
            for entry in exception_table {
                let pc = insn.pc as u16;
                if pc < entry.start_pc || pc >= entry.end_pc {
                    continue;
                }
                let catch = if entry.catch_type == 0 {
                    THROWABLE.to_string()
                } else {
                    self.pool
                        .class_name_at(entry.catch_type)
                        .ok_or(ClassFileError::BadConstantRef(entry.catch_type))?
                        .to_string()
                };
                let handler = lookup(entry.handler_pc as usize, insn.pc)?;
                let stack = vec![VerificationType::Object(catch)];
                let merged_locals = self.merge_locals(&before.locals, &after.locals);
                successors.push((
                    handler,
                    State {
                        locals: merged_locals,
                        stack,
                    },
                ));
                max_stack = max_stack.max(1);
            }

            for (succ, incoming) in successors {
                let merged = match &states[succ] {
                    None => incoming,
                    Some(existing) => {
                        if existing.stack.len() != incoming.stack.len() {
                            return Err(ClassFileError::frame(
                                insns[succ].pc,
                                "stack height differs between predecessors",
                            ));
                        }
                        let merged = State {
                            locals: self.merge_locals(&existing.locals, &incoming.locals),
                            stack: existing
                                .stack
                                .iter()
                                .zip(&incoming.stack)
                                .map(|(a, b)| self.merge_type(a, b))
                                .collect(),
                        };
                        if &merged == existing {
                            continue;
                        }
                        merged
                    }
                };
                states[succ] = Some(merged);
                worklist.push(succ);
            }
        }

        // ===== Dead code =====
        let mut patched = code.to_vec();
        let mut dead_ranges = Vec::new();
        let mut i = 0;
        while i < insns.len() {
            if states[i].is_some() {
                i += 1;
                continue;
            }
            let start = insns[i].pc;
            while i < insns.len() && states[i].is_none() {
                i += 1;
            }
            let end = insns.get(i).map(|insn| insn.pc).unwrap_or(code.len());
            for byte in &mut patched[start..end - 1] {
                *byte = Opcode::Nop.to_u8();
            }
            patched[end - 1] = Opcode::Athrow.to_u8();
            dead_ranges.push((start, end));
        }
        if !dead_ranges.is_empty() {
            tracing::debug!(
                method = name,
                ranges = dead_ranges.len(),
                "replaced unreachable code"
            );
            max_stack = max_stack.max(1);
        }

        let exception_table = remove_ranges(exception_table, &dead_ranges);

        // ===== Frames =====
        let mut frames = Vec::new();
        for &pc in &frame_points {
            let idx = lookup(pc, pc)?;
            if let Some(state) = &states[idx] {
                frames.push(StackMapFrame::from_slots(pc, &state.locals, &state.stack));
            }
        }
        for &(start, _) in &dead_ranges {
            frames.push(StackMapFrame {
                offset: start,
                locals: Vec::new(),
                stack: vec![VerificationType::object(THROWABLE)],
            });
        }
        frames.sort_by_key(|f| f.offset);
        frames.dedup_by_key(|f| f.offset);

        if max_stack > u16::MAX as usize || max_locals > u16::MAX as usize {
            return Err(ClassFileError::TooMany {
                what: "stack or local slots",
                count: max_stack.max(max_locals),
            });
        }

        Ok(FrameAnalysis {
            max_stack: max_stack as u16,
            max_locals: max_locals as u16,
            code: patched,
            exception_table,
            frames,
        })
    }

    fn merge_type(&self, a: &VerificationType, b: &VerificationType) -> VerificationType {
        use VerificationType::*;
        match (a, b) {
            _ if a == b => a.clone(),
            (Null, Object(_)) => b.clone(),
            (Object(_), Null) => a.clone(),
            (Object(x), Object(y)) => Object(self.hierarchy.common_superclass(x, y)),
            _ => Top,
        }
    }

    fn merge_locals(
        &self,
        a: &[VerificationType],
        b: &[VerificationType],
    ) -> Vec<VerificationType> {
        let len = a.len().max(b.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let ty = match (a.get(i), b.get(i)) {
                (Some(x), Some(y)) => self.merge_type(x, y),
                _ => VerificationType::Top,
            };
            out.push(ty);
        }
        // a wide type whose second half did not survive is unusable
        for i in 0..len {
            if out[i].is_wide() && out.get(i + 1) != Some(&VerificationType::Top) {
                out[i] = VerificationType::Top;
            }
        }
        out
    }

    fn constant(&self, insn: &Instruction) -> Result<&'a Constant, ClassFileError> {
        let index = match insn.operand {
            Operand::Constant(index) | Operand::Interface { index, .. } => index,
            _ => return Err(ClassFileError::frame(insn.pc, "missing constant operand")),
        };
        self.pool.get(index).ok_or(ClassFileError::BadConstantRef(index))
    }

    fn class_operand(&self, insn: &Instruction) -> Result<&'a str, ClassFileError> {
        match insn.operand {
            Operand::Constant(index) => self
                .pool
                .class_name_at(index)
                .ok_or(ClassFileError::BadConstantRef(index)),
            _ => Err(ClassFileError::frame(insn.pc, "missing class operand")),
        }
    }

    fn execute(&self, insn: &Instruction, state: &mut State) -> Result<(), ClassFileError> {
        use Opcode::*;
        use VerificationType as V;
        let pc = insn.pc;
        let pop = |state: &mut State| {
            state
                .stack
                .pop()
                .ok_or_else(|| ClassFileError::frame(pc, "stack underflow"))
        };

        match insn.opcode {
            Nop | Iinc | Goto | GotoW | Return | Wide => {}
            AconstNull => state.stack.push(V::Null),
            IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 | Bipush
            | Sipush => state.stack.push(V::Integer),
            Lconst0 | Lconst1 => state.stack.push(V::Long),
            Fconst0 | Fconst1 | Fconst2 => state.stack.push(V::Float),
            Dconst0 | Dconst1 => state.stack.push(V::Double),
            Ldc | LdcW | Ldc2W => {
                let ty = match self.constant(insn)? {
                    Constant::Integer(_) => V::Integer,
                    Constant::Float(_) => V::Float,
                    Constant::Long(_) => V::Long,
                    Constant::Double(_) => V::Double,
                    Constant::String(_) => V::object("java/lang/String"),
                    Constant::Class(_) => V::object("java/lang/Class"),
                    _ => return Err(ClassFileError::frame(pc, "ldc of unloadable constant")),
                };
                state.stack.push(ty);
            }

            // ===== Locals =====
            Iload | Iload0 | Iload1 | Iload2 | Iload3 => state.stack.push(V::Integer),
            Lload | Lload0 | Lload1 | Lload2 | Lload3 => state.stack.push(V::Long),
            Fload | Fload0 | Fload1 | Fload2 | Fload3 => state.stack.push(V::Float),
            Dload | Dload0 | Dload1 | Dload2 | Dload3 => state.stack.push(V::Double),
            Aload | Aload0 | Aload1 | Aload2 | Aload3 => {
                let slot = insn.local_index().unwrap_or(0) as usize;
                let ty = state
                    .locals
                    .get(slot)
                    .cloned()
                    .filter(|t| t.is_reference())
                    .ok_or_else(|| {
                        ClassFileError::frame(pc, format!("aload of non-reference slot {}", slot))
                    })?;
                state.stack.push(ty);
            }
            Istore | Istore0 | Istore1 | Istore2 | Istore3 | Lstore | Lstore0 | Lstore1
            | Lstore2 | Lstore3 | Fstore | Fstore0 | Fstore1 | Fstore2 | Fstore3 | Dstore
            | Dstore0 | Dstore1 | Dstore2 | Dstore3 | Astore | Astore0 | Astore1 | Astore2
            | Astore3 => {
                let value = pop(state)?;
                let slot = insn.local_index().unwrap_or(0) as usize;
                store_local(&mut state.locals, slot, value);
            }

            // ===== Arrays =====
            Iaload | Baload | Caload | Saload => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Integer);
            }
            Laload => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Long);
            }
            Faload => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Float);
            }
            Daload => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Double);
            }
            Aaload => {
                pop(state)?;
                let array = pop(state)?;
                let elem = match array {
                    V::Object(desc) if desc.starts_with('[') => {
                        V::from_descriptor(&desc[1..])
                    }
                    _ => V::Null,
                };
                state.stack.push(elem);
            }
            Iastore | Lastore | Fastore | Dastore | Aastore | Bastore | Castore | Sastore => {
                pop(state)?;
                pop(state)?;
                pop(state)?;
            }

            // ===== Stack =====
            Pop => {
                pop(state)?;
            }
            Pop2 => {
                let top = pop(state)?;
                if !top.is_wide() {
                    pop(state)?;
                }
            }
            Dup => {
                let top = state
                    .stack
                    .last()
                    .cloned()
                    .ok_or_else(|| ClassFileError::frame(pc, "stack underflow"))?;
                state.stack.push(top);
            }
            DupX1 => {
                let v1 = pop(state)?;
                let v2 = pop(state)?;
                state.stack.extend([v1.clone(), v2, v1]);
            }
            DupX2 => {
                let v1 = pop(state)?;
                let v2 = pop(state)?;
                if v2.is_wide() {
                    state.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v3 = pop(state)?;
                    state.stack.extend([v1.clone(), v3, v2, v1]);
                }
            }
            Dup2 => {
                let v1 = pop(state)?;
                if v1.is_wide() {
                    state.stack.extend([v1.clone(), v1]);
                } else {
                    let v2 = pop(state)?;
                    state.stack.extend([v2.clone(), v1.clone(), v2, v1]);
                }
            }
            Dup2X1 => {
                let v1 = pop(state)?;
                let v2 = pop(state)?;
                if v1.is_wide() {
                    state.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v3 = pop(state)?;
                    state.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            Dup2X2 => {
                let v1 = pop(state)?;
                let v2 = pop(state)?;
                match (v1.is_wide(), v2.is_wide()) {
                    (true, true) => state.stack.extend([v1.clone(), v2, v1]),
                    (true, false) => {
                        let v3 = pop(state)?;
                        state.stack.extend([v1.clone(), v3, v2, v1]);
                    }
                    (false, _) => {
                        let v3 = pop(state)?;
                        if v3.is_wide() {
                            state.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                        } else {
                            let v4 = pop(state)?;
                            state.stack.extend([v2.clone(), v1.clone(), v4, v3, v2, v1]);
                        }
                    }
                }
            }
            Swap => {
                let v1 = pop(state)?;
                let v2 = pop(state)?;
                state.stack.extend([v1, v2]);
            }

            // ===== Arithmetic =====
            Iadd | Isub | Imul | Idiv | Irem | Ishl | Ishr | Iushr | Iand | Ior | Ixor => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Integer);
            }
            Ladd | Lsub | Lmul | Ldiv | Lrem | Lshl | Lshr | Lushr | Land | Lor | Lxor => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Long);
            }
            Fadd | Fsub | Fmul | Fdiv | Frem => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Float);
            }
            Dadd | Dsub | Dmul | Ddiv | Drem => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Double);
            }
            Ineg | Lneg | Fneg | Dneg => {
                let v = pop(state)?;
                state.stack.push(v);
            }

            // ===== Conversions =====
            L2i | F2i | D2i | I2b | I2c | I2s => {
                pop(state)?;
                state.stack.push(V::Integer);
            }
            I2l | F2l | D2l => {
                pop(state)?;
                state.stack.push(V::Long);
            }
            I2f | L2f | D2f => {
                pop(state)?;
                state.stack.push(V::Float);
            }
            I2d | L2d | F2d => {
                pop(state)?;
                state.stack.push(V::Double);
            }
            Lcmp | Fcmpl | Fcmpg | Dcmpl | Dcmpg => {
                pop(state)?;
                pop(state)?;
                state.stack.push(V::Integer);
            }

            // ===== Branches and returns =====
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle | Ifnull | Ifnonnull => {
                pop(state)?;
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple | IfAcmpeq
            | IfAcmpne => {
                pop(state)?;
                pop(state)?;
            }
            Ireturn | Lreturn | Freturn | Dreturn | Areturn | Athrow => {
                pop(state)?;
            }

            // ===== Fields =====
            Getstatic | Getfield | Putstatic | Putfield => {
                let member = self.member(insn)?;
                if matches!(insn.opcode, Putstatic | Putfield) {
                    pop(state)?;
                }
                if matches!(insn.opcode, Getfield | Putfield) {
                    pop(state)?;
                }
                if matches!(insn.opcode, Getstatic | Getfield) {
                    state.stack.push(V::from_descriptor(member.2));
                }
            }

            // ===== Invocation =====
            Invokevirtual | Invokespecial | Invokestatic | Invokeinterface => {
                let (owner, name, desc) = self.member(insn)?;
                let (params, ret) = descriptor::parse_method(desc)
                    .ok_or_else(|| ClassFileError::frame(pc, format!("bad descriptor {}", desc)))?;
                for _ in 0..params.len() {
                    pop(state)?;
                }
                if insn.opcode != Invokestatic {
                    let receiver = pop(state)?;
                    if insn.opcode == Invokespecial && name == "<init>" {
                        let initialized = match receiver {
                            V::UninitializedThis => Some(V::object(self.this_class)),
                            V::Uninitialized(_) => Some(V::object(owner)),
                            _ => None,
                        };
                        if let Some(init) = initialized {
                            for slot in state.locals.iter_mut().chain(state.stack.iter_mut()) {
                                if *slot == receiver {
                                    *slot = init.clone();
                                }
                            }
                        }
                    }
                }
                if ret != "V" {
                    state.stack.push(V::from_descriptor(ret));
                }
            }

            // ===== Objects =====
            New => {
                self.class_operand(insn)?;
                state.stack.push(V::Uninitialized(pc as u16));
            }
            Newarray => {
                pop(state)?;
                let code = match insn.operand {
                    Operand::ArrayType(code) => code,
                    _ => 0,
                };
                let elem = crate::code::array_type_descriptor(code)
                    .ok_or_else(|| ClassFileError::frame(pc, format!("bad array type {}", code)))?;
                state.stack.push(V::Object(format!("[{}", elem)));
            }
            Anewarray => {
                let class = self.class_operand(insn)?;
                pop(state)?;
                state
                    .stack
                    .push(V::Object(format!("[{}", descriptor::object_descriptor(class))));
            }
            Arraylength | Instanceof => {
                pop(state)?;
                state.stack.push(V::Integer);
            }
            Checkcast => {
                let class = self.class_operand(insn)?;
                pop(state)?;
                state.stack.push(V::object(class));
            }
        }
        Ok(())
    }

    fn member(&self, insn: &Instruction) -> Result<(&'a str, &'a str, &'a str), ClassFileError> {
        let index = match insn.operand {
            Operand::Constant(index) | Operand::Interface { index, .. } => index,
            _ => return Err(ClassFileError::frame(insn.pc, "missing member operand")),
        };
        let member = self
            .pool
            .member_ref_at(index)
            .ok_or(ClassFileError::BadConstantRef(index))?;
        Ok((member.owner, member.name, member.descriptor))
    }
}

fn store_local(locals: &mut Vec<VerificationType>, slot: usize, value: VerificationType) {
    let needed = slot + value.size();
    if locals.len() < needed {
        locals.resize(needed, VerificationType::Top);
    }
    // overwriting the second half of a wide value invalidates it
    if slot > 0 && locals[slot - 1].is_wide() {
        locals[slot - 1] = VerificationType::Top;
    }
    // overwriting the first half of a wide value leaves a stale second half
    if locals[slot].is_wide() && !value.is_wide() && slot + 1 < locals.len() {
        locals[slot + 1] = VerificationType::Top;
    }
    let wide = value.is_wide();
    locals[slot] = value;
    if wide {
        locals[slot + 1] = VerificationType::Top;
    }
}

/// Cut `[start, end)` ranges out of every exception entry
fn remove_ranges(entries: &[ExceptionEntry], ranges: &[(usize, usize)]) -> Vec<ExceptionEntry> {
    let mut out: Vec<ExceptionEntry> = entries.to_vec();
    for &(dead_start, dead_end) in ranges {
        let mut next = Vec::with_capacity(out.len());
        for entry in out {
            let (start, end) = (entry.start_pc as usize, entry.end_pc as usize);
            if (entry.handler_pc as usize) >= dead_start && (entry.handler_pc as usize) < dead_end {
                continue;
            }
            if dead_end <= start || dead_start >= end {
                next.push(entry);
                continue;
            }
            if start < dead_start {
                next.push(ExceptionEntry {
                    end_pc: dead_start as u16,
                    ..entry
                });
            }
            if dead_end < end {
                next.push(ExceptionEntry {
                    start_pc: dead_end as u16,
                    ..entry
                });
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{CodeBuilder, LocalKind};

    fn analyze(
        pool: &ConstantPool,
        descriptor: &str,
        code: CodeBuilder,
    ) -> Result<FrameAnalysis, ClassFileError> {
        let (bytes, table) = code.finish()?;
        FrameAnalyzer::new(pool, "Test").analyze("m", descriptor, true, &bytes, &table)
    }

    #[test]
    fn test_straight_line_max_stack() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        code.push_double(&mut pool, 2.5);
        code.push_double(&mut pool, 3.5);
        code.emit(Opcode::Dadd);
        code.emit(Opcode::Dreturn);
        let result = analyze(&pool, "()D", code).unwrap();
        assert_eq!(result.max_stack, 4);
        assert_eq!(result.max_locals, 0);
        assert!(result.frames.is_empty());
    }

    #[test]
    fn test_loop_frame_at_back_edge_target() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        // int i = 0; while (i < 10) i++; return i;
        code.push_int(&mut pool, 0);
        code.store(LocalKind::Int, 0);
        let head = code.offset();
        code.load(LocalKind::Int, 0);
        code.push_int(&mut pool, 10);
        let exit = code.jump(Opcode::IfIcmpge);
        code.iinc(0, 1);
        code.jump_to(Opcode::Goto, head).unwrap();
        let end = code.offset();
        code.patch_jump(exit, end).unwrap();
        code.load(LocalKind::Int, 0);
        code.emit(Opcode::Ireturn);

        let result = analyze(&pool, "()I", code).unwrap();
        assert_eq!(result.max_stack, 2);
        assert_eq!(result.max_locals, 1);
        let offsets: Vec<_> = result.frames.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![head, end]);
        assert_eq!(result.frames[0].locals, vec![VerificationType::Integer]);
    }

    #[test]
    fn test_dead_code_is_replaced() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        code.push_int(&mut pool, 1);
        code.emit(Opcode::Ireturn);
        let dead = code.offset();
        code.push_int(&mut pool, 2);
        code.emit(Opcode::Ireturn);

        let result = analyze(&pool, "()I", code).unwrap();
        assert_eq!(
            &result.code[dead..],
            &[Opcode::Nop.to_u8(), Opcode::Athrow.to_u8()]
        );
        assert_eq!(result.frames.len(), 1);
        assert_eq!(result.frames[0].offset, dead);
        assert_eq!(
            result.frames[0].stack,
            vec![VerificationType::object(THROWABLE)]
        );
    }

    #[test]
    fn test_handler_frame_and_range_split() {
        let mut pool = ConstantPool::new();
        let mut code = CodeBuilder::new();
        let start = code.offset();
        code.push_int(&mut pool, 1);
        code.store(LocalKind::Int, 0);
        let after_try = code.jump(Opcode::Goto);
        let dead = code.offset();
        code.emit(Opcode::Nop);
        let end = code.offset();
        let handler = code.offset();
        code.store(LocalKind::Reference, 1);
        let exit = code.offset();
        code.patch_jump(after_try, exit).unwrap();
        code.emit(Opcode::Return);
        let catch = pool.class("java/lang/Exception");
        code.add_exception_handler(start, end, handler, catch);

        let result = analyze(&pool, "()V", code).unwrap();
        assert_eq!(result.exception_table.len(), 1);
        assert_eq!(result.exception_table[0].end_pc as usize, dead);
        // handler is the dead nop's successor, only reachable as a handler
        let handler_frame = result
            .frames
            .iter()
            .find(|f| f.offset == handler)
            .unwrap();
        assert_eq!(
            handler_frame.stack,
            vec![VerificationType::object("java/lang/Exception")]
        );
    }

    #[test]
    fn test_constructor_receiver_becomes_initialized() {
        let mut pool = ConstantPool::new();
        let init = pool.method_ref("java/lang/Object", "<init>", "()V");
        let mut code = CodeBuilder::new();
        code.load(LocalKind::Reference, 0);
        code.invoke_special(init);
        code.emit(Opcode::Return);
        let (bytes, table) = code.finish().unwrap();
        let analyzer = FrameAnalyzer::new(&pool, "Test");
        let locals = analyzer.initial_locals("<init>", "()V", false).unwrap();
        assert_eq!(locals, vec![VerificationType::UninitializedThis]);
        let result = analyzer.analyze("<init>", "()V", false, &bytes, &table).unwrap();
        assert_eq!(result.max_stack, 1);
        assert_eq!(result.max_locals, 1);
    }

    struct Chain;

    impl ClassHierarchy for Chain {
        fn super_class(&self, name: &str) -> Option<String> {
            match name {
                "Dog" | "Cat" => Some("Animal".to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_common_superclass() {
        assert_eq!(Chain.common_superclass("Dog", "Cat"), "Animal");
        assert_eq!(Chain.common_superclass("Dog", "Animal"), "Animal");
        assert_eq!(Chain.common_superclass("Dog", "String"), OBJECT);
        assert_eq!(ObjectHierarchy.common_superclass("A", "B"), OBJECT);
    }
}
