//! Class-file decoding
//!
//! Reads back what [`crate::ClassWriter`] produces (and ordinary javac output)
//! for the disassembler, the verifier and the interpreter. Attributes other
//! than `Code`, `StackMapTable` and `SourceFile` are skipped.

use crate::class_writer::{access, ClassVersion};
use crate::code::ExceptionEntry;
use crate::constants::ConstantPool;
use crate::encoder::{ByteReader, DecodeError};
use crate::frame::{decode_table, StackMapFrame, VerificationType};
use crate::MAGIC;

/// Decoded `Code` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInfo {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    /// Raw StackMapTable body, decoded on demand with [`ClassFile::frames`]
    pub stack_map: Option<Vec<u8>>,
}

/// Decoded field or method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<CodeInfo>,
}

impl Member {
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & access::ABSTRACT != 0
    }
}

/// A decoded class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: ClassVersion,
    pub access: u16,
    pub this_class: String,
    /// `None` only for `java/lang/Object`
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub source_file: Option<String>,
    pub pool: ConstantPool,
}

impl ClassFile {
    pub fn parse(data: &[u8]) -> Result<ClassFile, DecodeError> {
        let mut r = ByteReader::new(data);
        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let minor = r.read_u16()?;
        let major = r.read_u16()?;
        let pool = ConstantPool::decode(&mut r)?;

        let access = r.read_u16()?;
        let this_class = class_name(&pool, r.read_u16()?)?.to_string();
        let super_index = r.read_u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(class_name(&pool, super_index)?.to_string())
        };
        let interface_count = r.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(class_name(&pool, r.read_u16()?)?.to_string());
        }

        let fields = read_members(&mut r, &pool)?;
        let methods = read_members(&mut r, &pool)?;

        let mut source_file = None;
        let attr_count = r.read_u16()?;
        for _ in 0..attr_count {
            let name = utf8(&pool, r.read_u16()?)?;
            let len = r.read_u32()? as usize;
            let body = r.read_bytes(len)?;
            if name == "SourceFile" {
                let mut br = ByteReader::new(body);
                source_file = Some(utf8(&pool, br.read_u16()?)?.to_string());
            }
        }

        Ok(ClassFile {
            version: ClassVersion { major, minor },
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            source_file,
            pool,
        })
    }

    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }

    /// Method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Member> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// All overloads with a name
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Member> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Member> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Decoded stack-map frames of a method, empty when it has none
    pub fn frames(&self, method: &Member) -> Result<Vec<StackMapFrame>, DecodeError> {
        let Some(table) = method.code.as_ref().and_then(|c| c.stack_map.as_ref()) else {
            return Ok(Vec::new());
        };
        let mut initial = Vec::new();
        if !method.is_static() {
            if method.name == "<init>" && self.this_class != "java/lang/Object" {
                initial.push(VerificationType::UninitializedThis);
            } else {
                initial.push(VerificationType::Object(self.this_class.clone()));
            }
        }
        let (params, _) = crate::descriptor::parse_method(&method.descriptor)
            .ok_or(DecodeError::MalformedAttribute("descriptor"))?;
        initial.extend(params.into_iter().map(VerificationType::from_descriptor));
        decode_table(table, &self.pool, &initial)
    }
}

fn utf8(pool: &ConstantPool, index: u16) -> Result<&str, DecodeError> {
    pool.utf8_at(index).ok_or(DecodeError::BadConstantRef {
        index,
        expected: "Utf8",
    })
}

fn class_name(pool: &ConstantPool, index: u16) -> Result<&str, DecodeError> {
    pool.class_name_at(index).ok_or(DecodeError::BadConstantRef {
        index,
        expected: "Class",
    })
}

fn read_members(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Member>, DecodeError> {
    let count = r.read_u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access = r.read_u16()?;
        let name = utf8(pool, r.read_u16()?)?.to_string();
        let descriptor = utf8(pool, r.read_u16()?)?.to_string();
        let mut code = None;
        let attr_count = r.read_u16()?;
        for _ in 0..attr_count {
            let attr_name = utf8(pool, r.read_u16()?)?;
            let len = r.read_u32()? as usize;
            let body = r.read_bytes(len)?;
            if attr_name == "Code" {
                code = Some(read_code(body, pool)?);
            }
        }
        members.push(Member {
            access,
            name,
            descriptor,
            code,
        });
    }
    Ok(members)
}

fn read_code(body: &[u8], pool: &ConstantPool) -> Result<CodeInfo, DecodeError> {
    let mut r = ByteReader::new(body);
    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let code_len = r.read_u32()? as usize;
    let code = r.read_bytes(code_len)?.to_vec();
    let table_len = r.read_u16()?;
    let mut exception_table = Vec::with_capacity(table_len as usize);
    for _ in 0..table_len {
        exception_table.push(ExceptionEntry {
            start_pc: r.read_u16()?,
            end_pc: r.read_u16()?,
            handler_pc: r.read_u16()?,
            catch_type: r.read_u16()?,
        });
    }
    let mut stack_map = None;
    let attr_count = r.read_u16()?;
    for _ in 0..attr_count {
        let name = utf8(pool, r.read_u16()?)?;
        let len = r.read_u32()? as usize;
        let data = r.read_bytes(len)?;
        if name == "StackMapTable" {
            stack_map = Some(data.to_vec());
        }
    }
    if !r.is_at_end() {
        return Err(DecodeError::MalformedAttribute("Code"));
    }
    Ok(CodeInfo {
        max_stack,
        max_locals,
        code,
        exception_table,
        stack_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_writer::ClassWriter;
    use crate::code::{CodeBuilder, LocalKind};
    use crate::opcode::Opcode;

    fn sample_class() -> Vec<u8> {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_17,
            access::PUBLIC | access::SUPER,
            "demo/Counter",
            "java/lang/Object",
        );
        class.add_interface("java/lang/Runnable");
        class.add_field(access::PUBLIC, "count", "I");
        class.source_file = Some("counter.ts".to_string());

        let mut code = CodeBuilder::new();
        let pool = class.pool();
        // static int clamp(int x) { return x < 0 ? 0 : x; }
        code.load(LocalKind::Int, 0);
        let positive = code.jump(Opcode::Ifge);
        code.push_int(pool, 0);
        code.emit(Opcode::Ireturn);
        let target = code.offset();
        code.patch_jump(positive, target).unwrap();
        code.load(LocalKind::Int, 0);
        code.emit(Opcode::Ireturn);
        class
            .add_method_code(access::PUBLIC | access::STATIC, "clamp", "(I)I", code, 0)
            .unwrap();
        class.to_bytes().unwrap()
    }

    #[test]
    fn test_parse_written_class() {
        let class = ClassFile::parse(&sample_class()).unwrap();
        assert_eq!(class.version.major, 61);
        assert_eq!(class.this_class, "demo/Counter");
        assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.interfaces, vec!["java/lang/Runnable".to_string()]);
        assert_eq!(class.source_file.as_deref(), Some("counter.ts"));
        assert_eq!(class.field("count").unwrap().descriptor, "I");

        let clamp = class.method("clamp", "(I)I").unwrap();
        assert!(clamp.is_static());
        let code = clamp.code.as_ref().unwrap();
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.max_stack, 1);
    }

    #[test]
    fn test_frames_decode_back() {
        let class = ClassFile::parse(&sample_class()).unwrap();
        let clamp = class.method("clamp", "(I)I").unwrap();
        let frames = class.frames(clamp).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].offset, 6);
        assert_eq!(frames[0].locals, vec![VerificationType::Integer]);
    }

    #[test]
    fn test_bad_magic() {
        let err = ClassFile::parse(&[0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, DecodeError::BadMagic(0));
    }
}
