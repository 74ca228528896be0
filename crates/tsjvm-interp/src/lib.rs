//! Class-file interpreter for tsjvm output
//!
//! Runs the classes the compiler produces without a JVM: the instruction
//! subset tsjvm emits, exception tables, static initialization, virtual
//! dispatch over loaded classes, and a simulated slice of `java.lang` and
//! `java.util`. The end-to-end tests and `tsjvm run` execute through it.
//!
//! ```ignore
//! let mut vm = Vm::new();
//! vm.load_all(&classes)?;
//! let result = vm.invoke_static("demo.$", "main", &[])?;
//! ```

pub mod builtins;
pub mod error;
pub mod format;
mod interpreter;
pub mod value;
pub mod vm;

pub use error::{VmError, VmResult};
pub use format::{format_double, format_float};
pub use value::{Heap, Object, Value};
pub use vm::{Vm, DEFAULT_STEP_LIMIT};

#[cfg(test)]
mod tests;
