//! Virtual machine state: loaded classes, statics, heap

use crate::builtins;
use crate::error::{VmError, VmResult};
use crate::format::{format_double, format_float};
use crate::value::{Heap, Object, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::rc::Rc;
use tsjvm_classfile::reader::Member;
use tsjvm_classfile::ClassFile;

/// Default number of instructions one entry call may execute
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Maximum nesting of method frames
pub const MAX_CALL_DEPTH: usize = 512;

/// Non-local exit from a frame
#[derive(Debug)]
pub(crate) enum Trap {
    /// A Java exception in flight
    Throw(usize),
    /// Execution cannot continue
    Fatal(VmError),
}

impl From<VmError> for Trap {
    fn from(err: VmError) -> Self {
        Trap::Fatal(err)
    }
}

pub(crate) type Exec<T> = Result<T, Trap>;

/// Class-file interpreter
///
/// Executes the subset of the JVM that tsjvm emits, plus the handful of
/// `java.lang`/`java.util` library methods generated code calls.
pub struct Vm {
    /// Loaded classes by internal name
    pub(crate) classes: FxHashMap<String, Rc<ClassFile>>,

    /// Static field values, keyed `owner.name`
    pub(crate) statics: FxHashMap<String, Value>,

    /// Classes whose `<clinit>` has started
    pub(crate) initialized: FxHashSet<String>,

    /// Object store
    pub(crate) heap: Heap,

    /// Interned string literals
    pub(crate) interned: FxHashMap<String, usize>,

    /// `Class` objects by internal name
    pub(crate) class_objects: FxHashMap<String, usize>,

    pub(crate) step_limit: u64,
    pub(crate) steps: u64,
    pub(crate) depth: usize,
}

impl Vm {
    /// Create an empty VM
    pub fn new() -> Self {
        Self {
            classes: FxHashMap::default(),
            statics: FxHashMap::default(),
            initialized: FxHashSet::default(),
            heap: Heap::default(),
            interned: FxHashMap::default(),
            class_objects: FxHashMap::default(),
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
            depth: 0,
        }
    }

    /// Limit the instructions a single [`Vm::invoke_static`] may run
    pub fn set_step_limit(&mut self, limit: u64) {
        self.step_limit = limit;
    }

    /// Decode and register a class, returning its internal name
    pub fn load_class(&mut self, bytes: &[u8]) -> VmResult<String> {
        let class = ClassFile::parse(bytes).map_err(|e| VmError::Malformed(e.to_string()))?;
        let name = class.this_class.clone();
        for field in class.fields.iter().filter(|f| f.is_static()) {
            self.statics.insert(
                static_key(&name, &field.name),
                Value::default_for(&field.descriptor),
            );
        }
        tracing::debug!(
            target: "tsjvm::interp",
            class = %name,
            methods = class.methods.len(),
            "loaded class"
        );
        self.classes.insert(name.clone(), Rc::new(class));
        Ok(name)
    }

    /// Load every class of a compilation result
    pub fn load_all(&mut self, classes: &BTreeMap<String, Vec<u8>>) -> VmResult<()> {
        for bytes in classes.values() {
            self.load_class(bytes)?;
        }
        Ok(())
    }

    /// True when a class with this internal or dotted name is loaded
    pub fn is_loaded(&self, class: &str) -> bool {
        self.classes.contains_key(&class.replace('.', "/"))
    }

    /// Call a static method by class and name
    ///
    /// `class` may be dotted or internal. When the name is overloaded the
    /// overload whose parameter count matches `args` is chosen.
    pub fn invoke_static(
        &mut self,
        class: &str,
        name: &str,
        args: &[Value],
    ) -> VmResult<Option<Value>> {
        let internal = class.replace('.', "/");
        let file = self
            .classes
            .get(&internal)
            .cloned()
            .ok_or_else(|| VmError::UnknownClass(class.to_string()))?;
        let method = file
            .methods
            .iter()
            .find(|m| {
                m.name == name
                    && m.is_static()
                    && tsjvm_classfile::descriptor::parse_method(&m.descriptor)
                        .is_some_and(|(params, _)| params.len() == args.len())
            })
            .ok_or_else(|| VmError::UnknownMethod {
                owner: internal.clone(),
                name: name.to_string(),
                descriptor: format!("({} args)", args.len()),
            })?;
        let descriptor = method.descriptor.clone();

        self.steps = 0;
        self.depth = 0;
        let outcome = self
            .ensure_initialized(&internal)
            .and_then(|_| self.call_static(&internal, name, &descriptor, args.to_vec()));
        match outcome {
            Ok(value) => Ok(value),
            Err(Trap::Fatal(err)) => Err(err),
            Err(Trap::Throw(exc)) => Err(self.uncaught(exc)),
        }
    }

    /// Allocate a string, for passing arguments
    pub fn new_string(&mut self, s: &str) -> Value {
        Value::Ref(self.heap.alloc(Object::Str(s.to_string())))
    }

    /// Contents of a `String` reference
    pub fn string_value(&self, value: &Value) -> Option<String> {
        match self.heap.get(value.as_ref()?).ok()? {
            Object::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Object behind a reference
    pub fn object(&self, value: &Value) -> Option<&Object> {
        self.heap.get(value.as_ref()?).ok()
    }

    /// Human-readable rendering of a value, without running any Java code
    pub fn display(&self, value: &Value) -> String {
        match value {
            Value::Int(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Double(d) => format_double(*d),
            Value::Null => "null".to_string(),
            Value::Ref(r) => match self.heap.get(*r) {
                Ok(object) => self.display_object(*r, object),
                Err(_) => "<dangling>".to_string(),
            },
        }
    }

    fn display_object(&self, r: usize, object: &Object) -> String {
        match object {
            Object::Str(s) | Object::Builder(s) => s.clone(),
            Object::Boxed { class, value } => builtins::format_boxed(class, *value),
            Object::Array { elem, values } => {
                let items: Vec<String> = values
                    .iter()
                    .map(|v| {
                        builtins::format_primitive(elem, *v).unwrap_or_else(|| self.display(v))
                    })
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Object::Map(entries) => {
                let items: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", self.display(k), self.display(v)))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Object::KeySet(keys) => {
                let items: Vec<String> = keys.iter().map(|k| self.display(k)).collect();
                format!("[{}]", items.join(", "))
            }
            Object::KeyIter { .. } => format!("{}@{:x}", object.class_name().replace('/', "."), r),
            Object::Class(name) => format!("class {}", name.replace('/', ".")),
            Object::Instance { class, fields } => {
                if let Some(name) = fields.get("$name").and_then(|v| self.string_value(v)) {
                    return name;
                }
                let dotted = class.replace('/', ".");
                if self.is_subclass(class, "java/lang/Throwable") {
                    match fields.get("$message").and_then(|v| self.string_value(v)) {
                        Some(message) => format!("{}: {}", dotted, message),
                        None => dotted,
                    }
                } else {
                    format!("{}@{:x}", dotted, r)
                }
            }
        }
    }

    pub(crate) fn uncaught(&self, exc: usize) -> VmError {
        let (class, message) = match self.heap.get(exc) {
            Ok(Object::Instance { class, fields }) => (
                class.replace('/', "."),
                fields.get("$message").and_then(|v| self.string_value(v)),
            ),
            Ok(other) => (other.class_name().replace('/', "."), None),
            Err(err) => return err,
        };
        VmError::Uncaught { class, message }
    }

    /// Loaded class by internal name
    pub(crate) fn class(&self, name: &str) -> Option<Rc<ClassFile>> {
        self.classes.get(name).cloned()
    }

    /// Run `<clinit>` of a loaded class (superclass first) if it has not run
    pub(crate) fn ensure_initialized(&mut self, name: &str) -> Exec<()> {
        let Some(class) = self.class(name) else {
            return Ok(());
        };
        if !self.initialized.insert(name.to_string()) {
            return Ok(());
        }
        if let Some(sup) = &class.super_class {
            self.ensure_initialized(sup)?;
        }
        if let Some(index) = class
            .methods
            .iter()
            .position(|m| m.name == "<clinit>" && m.is_static())
        {
            tracing::trace!(target: "tsjvm::interp", class = %name, "running <clinit>");
            self.run_method(&class, index, Vec::new())?;
        }
        Ok(())
    }

    /// Superclass of a loaded or built-in class
    pub(crate) fn super_of(&self, name: &str) -> Option<String> {
        match self.classes.get(name) {
            Some(class) => class.super_class.clone(),
            None => builtins::builtin_super(name).map(str::to_string),
        }
    }

    /// Subtype check covering loaded classes, built-ins, interfaces and arrays
    pub(crate) fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == "java/lang/Object" {
            return true;
        }
        if let Some(elem) = sub.strip_prefix('[') {
            return match sup.strip_prefix('[') {
                Some(sup_elem) => match (elem_class(elem), elem_class(sup_elem)) {
                    (Some(a), Some(b)) => self.is_subclass(a, b),
                    _ => elem == sup_elem,
                },
                None => matches!(sup, "java/lang/Cloneable" | "java/io/Serializable"),
            };
        }
        let interfaces: Vec<String> = match self.classes.get(sub) {
            Some(class) => class.interfaces.clone(),
            None => builtins::builtin_interfaces(sub)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        if interfaces.iter().any(|i| self.is_subclass(i, sup)) {
            return true;
        }
        match self.super_of(sub) {
            Some(parent) => self.is_subclass(&parent, sup),
            None => false,
        }
    }

    /// Concrete method by name and descriptor, searching up from `class`
    ///
    /// Stops at the first class that is not loaded; built-in methods are
    /// handled separately.
    pub(crate) fn find_method(
        &self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Option<(Rc<ClassFile>, usize)> {
        let mut current = class.to_string();
        loop {
            let file = self.class(&current)?;
            if let Some(index) = file
                .methods
                .iter()
                .position(|m| m.name == name && m.descriptor == descriptor && m.code.is_some())
            {
                return Some((file, index));
            }
            current = file.super_class.clone()?;
        }
    }

    /// Class declaring a static field, searching up from `class`
    pub(crate) fn static_owner(&self, class: &str, field: &str) -> Option<String> {
        let mut current = class.to_string();
        loop {
            if self.statics.contains_key(&static_key(&current, field)) {
                return Some(current);
            }
            current = self.class(&current)?.super_class.clone()?;
        }
    }

    /// Fresh instance of a loaded class with every field at its default
    pub(crate) fn instantiate(&mut self, class: &str) -> usize {
        let mut fields = FxHashMap::default();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let Some(file) = self.class(&name) else {
                break;
            };
            for field in file.fields.iter().filter(|f| !f.is_static()) {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| Value::default_for(&field.descriptor));
            }
            current = file.super_class.clone();
        }
        self.heap.alloc(Object::Instance {
            class: class.to_string(),
            fields,
        })
    }

    /// Interned string for an `ldc`
    pub(crate) fn intern(&mut self, s: &str) -> usize {
        if let Some(&r) = self.interned.get(s) {
            return r;
        }
        let r = self.heap.alloc(Object::Str(s.to_string()));
        self.interned.insert(s.to_string(), r);
        r
    }

    /// Shared `Class` object for an `ldc` of a class constant
    pub(crate) fn class_object(&mut self, name: &str) -> usize {
        if let Some(&r) = self.class_objects.get(name) {
            return r;
        }
        let r = self.heap.alloc(Object::Class(name.to_string()));
        self.class_objects.insert(name.to_string(), r);
        r
    }

    /// Allocate a built-in exception and return it as a trap
    pub(crate) fn throw_new(&mut self, class: &str, message: Option<&str>) -> Trap {
        let mut fields = FxHashMap::default();
        if let Some(message) = message {
            let m = self.heap.alloc(Object::Str(message.to_string()));
            fields.insert("$message".to_string(), Value::Ref(m));
        }
        let r = self.heap.alloc(Object::Instance {
            class: class.to_string(),
            fields,
        });
        Trap::Throw(r)
    }

    pub(crate) fn null_pointer(&mut self) -> Trap {
        self.throw_new("java/lang/NullPointerException", None)
    }

    /// Runtime class of a reference
    pub(crate) fn class_of(&self, r: usize) -> VmResult<String> {
        Ok(self.heap.get(r)?.class_name())
    }

    pub(crate) fn static_value(&self, owner: &str, name: &str) -> VmResult<Value> {
        self.statics
            .get(&static_key(owner, name))
            .copied()
            .ok_or_else(|| VmError::UnknownField {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    pub(crate) fn set_static(&mut self, owner: &str, name: &str, value: Value) {
        self.statics.insert(static_key(owner, name), value);
    }

    /// Method entry of a loaded class
    pub(crate) fn member(class: &ClassFile, index: usize) -> VmResult<&Member> {
        class.methods.get(index).ok_or_else(|| VmError::UnknownMethod {
            owner: class.this_class.clone(),
            name: format!("#{}", index),
            descriptor: String::new(),
        })
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn static_key(owner: &str, name: &str) -> String {
    format!("{}.{}", owner, name)
}

/// Class name of a reference array element descriptor
fn elem_class(elem: &str) -> Option<&str> {
    if elem.starts_with('[') {
        Some(elem)
    } else {
        elem.strip_prefix('L').and_then(|s| s.strip_suffix(';'))
    }
}
