//! Class serialization
//!
//! `ClassWriter` owns the constant pool for one class. Method bodies are
//! handed over as a finished [`CodeBuilder`]; [`ClassWriter::add_method_code`]
//! runs the frame analyzer so every `Code` attribute carries correct
//! `max_stack`, `max_locals` and, for class version 50 and up, a
//! `StackMapTable`.

use crate::code::{CodeBuilder, ExceptionEntry};
use crate::constants::ConstantPool;
use crate::encoder::ByteWriter;
use crate::error::ClassFileError;
use crate::frame::{encode_table, StackMapFrame};
use crate::stackmap::{ClassHierarchy, FrameAnalyzer, ObjectHierarchy};
use crate::MAGIC;

/// Access flags for classes, fields and methods
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    /// Class flag; shares its bit with `SYNCHRONIZED` on methods
    pub const SUPER: u16 = 0x0020;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const VARARGS: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const STRICT: u16 = 0x0800;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;

    /// Space-separated flag names for a class
    pub fn class_flags(flags: u16) -> String {
        describe(
            flags,
            &[
                (PUBLIC, "public"),
                (FINAL, "final"),
                (SUPER, "super"),
                (INTERFACE, "interface"),
                (ABSTRACT, "abstract"),
                (SYNTHETIC, "synthetic"),
                (ANNOTATION, "annotation"),
                (ENUM, "enum"),
            ],
        )
    }

    /// Space-separated flag names for a field or method
    pub fn member_flags(flags: u16) -> String {
        describe(
            flags,
            &[
                (PUBLIC, "public"),
                (PRIVATE, "private"),
                (PROTECTED, "protected"),
                (STATIC, "static"),
                (FINAL, "final"),
                (NATIVE, "native"),
                (ABSTRACT, "abstract"),
                (SYNTHETIC, "synthetic"),
                (ENUM, "enum"),
            ],
        )
    }

    fn describe(flags: u16, names: &[(u16, &str)]) -> String {
        names
            .iter()
            .filter(|(bit, _)| flags & bit != 0)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Class-file format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    pub const JAVA_8: ClassVersion = ClassVersion::new(52);
    pub const JAVA_11: ClassVersion = ClassVersion::new(55);
    pub const JAVA_17: ClassVersion = ClassVersion::new(61);
    pub const JAVA_21: ClassVersion = ClassVersion::new(65);

    pub const fn new(major: u16) -> Self {
        Self { major, minor: 0 }
    }

    /// Stack-map frames are mandatory from version 50
    pub fn requires_stack_map(self) -> bool {
        self.major >= 50
    }
}

impl Default for ClassVersion {
    fn default() -> Self {
        ClassVersion::JAVA_17
    }
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
}

/// Assembled `Code` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    pub frames: Vec<StackMapFrame>,
}

/// A method declaration; abstract methods have no code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<CodeAttribute>,
}

/// One class under construction
pub struct ClassWriter {
    pub version: ClassVersion,
    pub access: u16,
    pub this_class: String,
    pub super_class: String,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub source_file: Option<String>,
    pool: ConstantPool,
}

impl ClassWriter {
    pub fn new(version: ClassVersion, access: u16, this_class: &str, super_class: &str) -> Self {
        Self {
            version,
            access,
            this_class: this_class.to_string(),
            super_class: super_class.to_string(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
            pool: ConstantPool::new(),
        }
    }

    /// Constant pool shared by all method bodies of this class
    pub fn pool(&mut self) -> &mut ConstantPool {
        &mut self.pool
    }

    pub fn add_interface(&mut self, internal_name: &str) {
        if !self.interfaces.iter().any(|i| i == internal_name) {
            self.interfaces.push(internal_name.to_string());
        }
    }

    pub fn add_field(&mut self, access: u16, name: &str, descriptor: &str) {
        self.fields.push(FieldDef {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn has_method(&self, name: &str, descriptor: &str) -> bool {
        self.methods
            .iter()
            .any(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Declare a method without a body
    pub fn add_abstract_method(&mut self, access: u16, name: &str, descriptor: &str) {
        self.methods.push(MethodDef {
            access: access | access::ABSTRACT,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: None,
        });
    }

    /// Finish a method body and add it
    ///
    /// `min_locals` lets the caller reserve slots the analyzer would not see,
    /// such as locals that are declared but never stored.
    pub fn add_method_code(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: CodeBuilder,
        min_locals: u16,
    ) -> Result<(), ClassFileError> {
        self.add_method_code_with(access, name, descriptor, code, min_locals, &ObjectHierarchy)
    }

    /// [`ClassWriter::add_method_code`] with a class hierarchy for frame merges
    pub fn add_method_code_with(
        &mut self,
        access: u16,
        name: &str,
        descriptor: &str,
        code: CodeBuilder,
        min_locals: u16,
        hierarchy: &dyn ClassHierarchy,
    ) -> Result<(), ClassFileError> {
        let (bytes, exception_table) = code.finish()?;
        let analysis = FrameAnalyzer::new(&self.pool, &self.this_class)
            .with_hierarchy(hierarchy)
            .analyze(
                name,
                descriptor,
                access & access::STATIC != 0,
                &bytes,
                &exception_table,
            )?;
        tracing::trace!(
            class = %self.this_class,
            method = name,
            max_stack = analysis.max_stack,
            max_locals = analysis.max_locals,
            frames = analysis.frames.len(),
            "assembled method"
        );
        let frames = if self.version.requires_stack_map() {
            analysis.frames
        } else {
            Vec::new()
        };
        self.methods.push(MethodDef {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: Some(CodeAttribute {
                max_stack: analysis.max_stack,
                max_locals: analysis.max_locals.max(min_locals),
                code: analysis.code,
                exception_table: analysis.exception_table,
                frames,
            }),
        });
        Ok(())
    }

    /// Serialize the class
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ClassFileError> {
        // Everything the body references must be interned before the pool is written
        let this_index = self.pool.class(&self.this_class);
        let super_index = self.pool.class(&self.super_class);
        let interface_indices: Vec<u16> = self
            .interfaces
            .iter()
            .map(|name| self.pool.class(name))
            .collect();

        let mut body = ByteWriter::new();
        body.emit_u16(self.access);
        body.emit_u16(this_index);
        body.emit_u16(super_index);
        body.emit_u16(interface_indices.len() as u16);
        for idx in interface_indices {
            body.emit_u16(idx);
        }

        body.emit_u16(self.fields.len() as u16);
        for field in &self.fields {
            body.emit_u16(field.access);
            body.emit_u16(self.pool.utf8(&field.name));
            body.emit_u16(self.pool.utf8(&field.descriptor));
            body.emit_u16(0);
        }

        if self.methods.len() > u16::MAX as usize {
            return Err(ClassFileError::TooMany {
                what: "methods",
                count: self.methods.len(),
            });
        }
        body.emit_u16(self.methods.len() as u16);
        for method in &self.methods {
            body.emit_u16(method.access);
            body.emit_u16(self.pool.utf8(&method.name));
            body.emit_u16(self.pool.utf8(&method.descriptor));
            match &method.code {
                None => body.emit_u16(0),
                Some(code) => {
                    body.emit_u16(1);
                    write_code(&mut body, &mut self.pool, code);
                }
            }
        }

        match &self.source_file {
            Some(file) => {
                body.emit_u16(1);
                body.emit_u16(self.pool.utf8("SourceFile"));
                body.emit_u32(2);
                body.emit_u16(self.pool.utf8(file));
            }
            None => body.emit_u16(0),
        }

        let mut out = ByteWriter::with_capacity(body.offset() + 1024);
        out.emit_u32(MAGIC);
        out.emit_u16(self.version.minor);
        out.emit_u16(self.version.major);
        self.pool.write(&mut out)?;
        out.emit_bytes(body.buffer());
        Ok(out.into_bytes())
    }
}

fn write_code(w: &mut ByteWriter, pool: &mut ConstantPool, code: &CodeAttribute) {
    let name = pool.utf8("Code");
    let stack_map = if code.frames.is_empty() {
        None
    } else {
        Some((pool.utf8("StackMapTable"), encode_table(&code.frames, pool)))
    };

    let mut attr = ByteWriter::new();
    attr.emit_u16(code.max_stack);
    attr.emit_u16(code.max_locals);
    attr.emit_u32(code.code.len() as u32);
    attr.emit_bytes(&code.code);
    attr.emit_u16(code.exception_table.len() as u16);
    for entry in &code.exception_table {
        attr.emit_u16(entry.start_pc);
        attr.emit_u16(entry.end_pc);
        attr.emit_u16(entry.handler_pc);
        attr.emit_u16(entry.catch_type);
    }
    match stack_map {
        Some((name, table)) => {
            attr.emit_u16(1);
            attr.emit_u16(name);
            attr.emit_u32(table.len() as u32);
            attr.emit_bytes(&table);
        }
        None => attr.emit_u16(0),
    }

    w.emit_u16(name);
    w.emit_u32(attr.offset() as u32);
    w.emit_bytes(attr.buffer());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::LocalKind;
    use crate::opcode::Opcode;

    fn default_constructor(class: &mut ClassWriter) {
        let init = class.pool().method_ref("java/lang/Object", "<init>", "()V");
        let mut code = CodeBuilder::new();
        code.load(LocalKind::Reference, 0);
        code.invoke_special(init);
        code.emit(Opcode::Return);
        class
            .add_method_code(access::PUBLIC, "<init>", "()V", code, 0)
            .unwrap();
    }

    #[test]
    fn test_header_layout() {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_17,
            access::PUBLIC | access::SUPER,
            "demo/Hello",
            "java/lang/Object",
        );
        default_constructor(&mut class);
        let bytes = class.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 61]);
    }

    #[test]
    fn test_constructor_code_attribute() {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_8,
            access::PUBLIC | access::SUPER,
            "Point",
            "java/lang/Object",
        );
        default_constructor(&mut class);
        let code = class.methods[0].code.as_ref().unwrap();
        assert_eq!(code.max_stack, 1);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0x2a, 0xb7, 0x00, 0x06, 0xb1]);
    }

    #[test]
    fn test_abstract_method_has_no_code() {
        let mut class = ClassWriter::new(
            ClassVersion::JAVA_17,
            access::PUBLIC | access::ABSTRACT,
            "Shape",
            "java/lang/Object",
        );
        class.add_abstract_method(access::PUBLIC, "area", "()D");
        assert!(class.methods[0].code.is_none());
        assert_ne!(class.methods[0].access & access::ABSTRACT, 0);
        assert!(class.has_method("area", "()D"));
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(
            access::class_flags(access::PUBLIC | access::FINAL | access::ENUM),
            "public final enum"
        );
        assert_eq!(access::member_flags(access::PRIVATE | access::STATIC), "private static");
    }
}
