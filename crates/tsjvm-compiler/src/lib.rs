//! tsjvm Compiler - TypeScript syntax tree to JVM class files
//!
//! Compilation runs in two passes over one module:
//!
//! 1. **Collect**: every class, interface, enum, namespace, alias, free
//!    function and global is registered in a [`TypeRegistry`], so code in
//!    any declaration can refer to any other regardless of source order.
//! 2. **Generate**: each declaration is compiled into a class, plus one
//!    container class per namespace with functions or top-level statements
//!    and one class per arrow function.
//!
//! ```ignore
//! let mut compiler = ByteCodeCompiler::new(ByteCodeCompilerOptions::default());
//! let classes = compiler.compile(&module)?;
//! for (name, bytes) in &classes {
//!     println!("{} ({} bytes)", name, bytes.len());
//! }
//! ```

pub mod capture;
pub mod collect;
mod codegen;
pub mod context;
pub mod error;
pub mod functional;
pub mod locals;
pub mod options;
pub mod registry;
pub mod types;

pub use collect::CONTAINER_NAME;
pub use error::{CompileError, CompileResult};
pub use options::{ByteCodeCompilerOptions, JdkVersion};
pub use registry::{EnumRegistry, JavaTypeInfo, TypeKind, TypeRegistry};

use std::collections::BTreeMap;
use std::time::Instant;
use tsjvm_ast::Module;

/// Compiled classes keyed by dotted class name, in name order
pub type ClassMap = BTreeMap<String, Vec<u8>>;

/// Main compiler entry point
///
/// A compiler owns one registry and can be reused for several modules in
/// sequence; each [`compile`](Self::compile) starts from an empty registry.
#[derive(Debug, Default)]
pub struct ByteCodeCompiler {
    options: ByteCodeCompilerOptions,
    registry: TypeRegistry,
}

impl ByteCodeCompiler {
    pub fn new(options: ByteCodeCompilerOptions) -> Self {
        Self {
            options,
            registry: TypeRegistry::new(),
        }
    }

    pub fn options(&self) -> &ByteCodeCompilerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ByteCodeCompilerOptions {
        &mut self.options
    }

    /// Declarations of the last compiled module
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Compile a module into class files
    pub fn compile(&mut self, module: &Module) -> CompileResult<ClassMap> {
        let started = Instant::now();
        self.registry.reset();
        collect::collect_module(&mut self.registry, &self.options, module)?;
        tracing::debug!(
            target: "tsjvm::collect",
            types = self.registry.types().count(),
            "collected declarations"
        );
        let classes = codegen::generate(&self.registry, &self.options, module)?;
        tracing::info!(
            classes = classes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compilation finished"
        );
        Ok(classes)
    }
}

/// Compile a module with the given options
pub fn compile_module(
    module: &Module,
    options: ByteCodeCompilerOptions,
) -> CompileResult<ClassMap> {
    ByteCodeCompiler::new(options).compile(module)
}
