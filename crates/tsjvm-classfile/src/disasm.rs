//! javap-style disassembly

use crate::class_writer::access;
use crate::constants::Constant;
use crate::descriptor;
use crate::instruction::{decode_all, Instruction, Operand};
use crate::reader::{ClassFile, Member};
use std::fmt::Write;

/// Render a whole class
pub fn disassemble(class: &ClassFile) -> String {
    let mut out = String::new();
    if let Some(file) = &class.source_file {
        let _ = writeln!(out, "Compiled from \"{}\"", file);
    }
    let kind = if class.is_interface() {
        "interface"
    } else {
        "class"
    };
    let flags = access::class_flags(class.access & !(access::SUPER | access::INTERFACE));
    if !flags.is_empty() {
        out.push_str(&flags);
        out.push(' ');
    }
    let _ = write!(out, "{} {}", kind, class.this_class.replace('/', "."));
    if let Some(sup) = &class.super_class {
        if sup != "java/lang/Object" {
            let _ = write!(out, " extends {}", sup.replace('/', "."));
        }
    }
    if !class.interfaces.is_empty() {
        let names: Vec<_> = class.interfaces.iter().map(|i| i.replace('/', ".")).collect();
        let _ = write!(out, " implements {}", names.join(", "));
    }
    let _ = writeln!(out, " {{");
    let _ = writeln!(out, "  // version {}.{}", class.version.major, class.version.minor);

    for field in &class.fields {
        let _ = writeln!(out, "  {};", member_header(field, None));
    }
    for method in &class.methods {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {};", member_header(method, Some(&class.this_class)));
        if let Some(code) = &method.code {
            let _ = writeln!(
                out,
                "    Code: stack={}, locals={}",
                code.max_stack, code.max_locals
            );
            match decode_all(&code.code) {
                Ok(insns) => {
                    for insn in &insns {
                        let _ = writeln!(out, "      {}", format_instruction(class, insn));
                    }
                }
                Err(err) => {
                    let _ = writeln!(out, "      <undecodable: {}>", err);
                }
            }
            if !code.exception_table.is_empty() {
                let _ = writeln!(out, "    Exception table:");
                for entry in &code.exception_table {
                    let catch = if entry.catch_type == 0 {
                        "any".to_string()
                    } else {
                        class
                            .pool
                            .class_name_at(entry.catch_type)
                            .unwrap_or("?")
                            .to_string()
                    };
                    let _ = writeln!(
                        out,
                        "      from {} to {} target {} type {}",
                        entry.start_pc, entry.end_pc, entry.handler_pc, catch
                    );
                }
            }
            if let Ok(frames) = class.frames(method) {
                if !frames.is_empty() {
                    let _ = writeln!(out, "    StackMapTable:");
                }
                for frame in frames {
                    let locals: Vec<_> = frame.locals.iter().map(|t| t.to_string()).collect();
                    let stack: Vec<_> = frame.stack.iter().map(|t| t.to_string()).collect();
                    let _ = writeln!(
                        out,
                        "      @{}: locals=[{}] stack=[{}]",
                        frame.offset,
                        locals.join(", "),
                        stack.join(", ")
                    );
                }
            }
        }
    }
    let _ = writeln!(out, "}}");
    out
}

fn member_header(member: &Member, method_owner: Option<&str>) -> String {
    let flags = access::member_flags(member.access);
    let prefix = if flags.is_empty() {
        String::new()
    } else {
        format!("{} ", flags)
    };
    match method_owner {
        None => format!(
            "{}{} {}",
            prefix,
            descriptor::pretty(&member.descriptor),
            member.name
        ),
        Some(owner) => {
            let Some((params, ret)) = descriptor::parse_method(&member.descriptor) else {
                return format!("{}{} {}", prefix, member.name, member.descriptor);
            };
            let params: Vec<_> = params.iter().map(|p| descriptor::pretty(p)).collect();
            match member.name.as_str() {
                "<init>" => format!("{}{}({})", prefix, owner.replace('/', "."), params.join(", ")),
                "<clinit>" => "static {}".to_string(),
                name => format!(
                    "{}{} {}({})",
                    prefix,
                    descriptor::pretty(ret),
                    name,
                    params.join(", ")
                ),
            }
        }
    }
}

/// One instruction as `pc: mnemonic operands`
pub fn format_instruction(class: &ClassFile, insn: &Instruction) -> String {
    let operand = match insn.operand {
        Operand::None => String::new(),
        Operand::Byte(v) => v.to_string(),
        Operand::Short(v) => v.to_string(),
        Operand::Local(idx) => idx.to_string(),
        Operand::Iinc { local, delta } => format!("{}, {}", local, delta),
        Operand::Constant(idx) | Operand::Interface { index: idx, .. } => {
            format!("#{} // {}", idx, describe_constant(class, idx))
        }
        Operand::ArrayType(code) => crate::code::array_type_descriptor(code)
            .map(descriptor::pretty)
            .unwrap_or_else(|| code.to_string()),
        Operand::Branch(_) => insn
            .branch_target()
            .map(|t| t.to_string())
            .unwrap_or_default(),
    };
    let mnemonic = if insn.wide {
        format!("wide {}", insn.opcode.name())
    } else {
        insn.opcode.name().to_string()
    };
    if operand.is_empty() {
        format!("{:>4}: {}", insn.pc, mnemonic)
    } else {
        format!("{:>4}: {} {}", insn.pc, mnemonic, operand)
    }
}

fn describe_constant(class: &ClassFile, index: u16) -> String {
    let pool = &class.pool;
    if let Some(member) = pool.member_ref_at(index) {
        return format!("{}.{}:{}", member.owner, member.name, member.descriptor);
    }
    match pool.get(index) {
        Some(Constant::Class(_)) => format!("class {}", pool.class_name_at(index).unwrap_or("?")),
        Some(Constant::String(_)) => format!("String {:?}", pool.string_at(index).unwrap_or("?")),
        Some(Constant::Integer(v)) => format!("int {}", v),
        Some(Constant::Float(bits)) => format!("float {}", f32::from_bits(*bits)),
        Some(Constant::Long(v)) => format!("long {}", v),
        Some(Constant::Double(bits)) => format!("double {}", f64::from_bits(*bits)),
        Some(other) => format!("{:?}", other),
        None => "<invalid>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_writer::{ClassVersion, ClassWriter};
    use crate::code::{CodeBuilder, LocalKind};
    use crate::opcode::Opcode;

    #[test]
    fn test_disassemble_method() {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_17,
            access::PUBLIC | access::SUPER,
            "demo/Greeter",
            "java/lang/Object",
        );
        let mut code = CodeBuilder::new();
        code.push_string(class.pool(), "hi");
        code.store(LocalKind::Reference, 0);
        code.load(LocalKind::Reference, 0);
        code.emit(Opcode::Areturn);
        class
            .add_method_code(
                access::PUBLIC | access::STATIC,
                "greet",
                "()Ljava/lang/String;",
                code,
                0,
            )
            .unwrap();
        let parsed = ClassFile::parse(&class.to_bytes().unwrap()).unwrap();
        let text = disassemble(&parsed);
        assert!(text.contains("public class demo.Greeter {"));
        assert!(text.contains("public static java.lang.String greet();"));
        assert!(text.contains("ldc #2 // String \"hi\""));
        assert!(text.contains("astore_0"));
    }
}
