//! Runtime values and the object heap

use crate::error::{VmError, VmResult};
use rustc_hash::FxHashMap;

/// A JVM value as it sits in a local slot or on the operand stack
///
/// `boolean`, `byte`, `char` and `short` are all carried as [`Value::Int`],
/// exactly as the JVM does. Wide values take one stack entry here; the
/// interpreter accounts for their second slot where instructions care.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// int, boolean, byte, char, short
    Int(i32),
    /// long
    Long(i64),
    /// float
    Float(f32),
    /// double
    Double(f64),
    /// null reference
    Null,
    /// Reference into the heap
    Ref(usize),
}

impl Value {
    /// Long and double count as two slots for `pop2`/`dup2`
    pub fn is_wide(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    /// Default value for a field or array element of this descriptor
    pub fn default_for(descriptor: &str) -> Value {
        match descriptor.as_bytes().first() {
            Some(b'Z' | b'B' | b'C' | b'S' | b'I') => Value::Int(0),
            Some(b'J') => Value::Long(0),
            Some(b'F') => Value::Float(0.0),
            Some(b'D') => Value::Double(0.0),
            _ => Value::Null,
        }
    }

    /// Heap index of a reference
    pub fn as_ref(&self) -> Option<usize> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

/// Runtime class of a map's key set
pub const KEY_SET_CLASS: &str = "java/util/LinkedHashMap$LinkedKeySet";

/// Runtime class of a key-set iterator
pub const KEY_ITERATOR_CLASS: &str = "java/util/LinkedHashMap$LinkedKeyIterator";

/// A heap object
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Instance of a loaded class, or of a built-in class with plain state
    /// (throwables keep `$message`, enums `$name` and `$ordinal`)
    Instance {
        /// Runtime class (internal name)
        class: String,
        /// Field values by name
        fields: FxHashMap<String, Value>,
    },
    /// Array with its element descriptor
    Array {
        /// Element descriptor
        elem: String,
        /// Elements
        values: Vec<Value>,
    },
    /// `java.lang.String`
    Str(String),
    /// `java.lang.StringBuilder`
    Builder(String),
    /// Boxed primitive (`java/lang/Integer`, ...)
    Boxed {
        /// Box class (internal name)
        class: &'static str,
        /// Unboxed value
        value: Value,
    },
    /// `java.util.LinkedHashMap`, kept in insertion order
    Map(Vec<(Value, Value)>),
    /// `keySet()` of a map: a snapshot of its keys
    KeySet(Vec<Value>),
    /// Iterator over a key set
    KeyIter {
        /// Keys being iterated
        keys: Vec<Value>,
        /// Position of the next key
        next: usize,
    },
    /// `java.lang.Class` constant
    Class(String),
}

impl Object {
    /// Runtime class name as `getClass().getName()` would report it, in
    /// internal form
    pub fn class_name(&self) -> String {
        match self {
            Object::Instance { class, .. } => class.clone(),
            Object::Array { elem, .. } => format!("[{}", elem),
            Object::Str(_) => "java/lang/String".to_string(),
            Object::Builder(_) => "java/lang/StringBuilder".to_string(),
            Object::Boxed { class, .. } => (*class).to_string(),
            Object::Map(_) => "java/util/LinkedHashMap".to_string(),
            Object::KeySet(_) => KEY_SET_CLASS.to_string(),
            Object::KeyIter { .. } => KEY_ITERATOR_CLASS.to_string(),
            Object::Class(_) => "java/lang/Class".to_string(),
        }
    }
}

/// Append-only object store
///
/// Programs run by the test suite and `tsjvm run` are short-lived, so
/// nothing is ever collected.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    /// Store an object and return its reference
    pub fn alloc(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Object behind a reference
    pub fn get(&self, r: usize) -> VmResult<&Object> {
        self.objects
            .get(r)
            .ok_or_else(|| VmError::TypeConfusion(format!("dangling reference {}", r)))
    }

    /// Mutable object behind a reference
    pub fn get_mut(&mut self, r: usize) -> VmResult<&mut Object> {
        self.objects
            .get_mut(r)
            .ok_or_else(|| VmError::TypeConfusion(format!("dangling reference {}", r)))
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_descriptor() {
        assert_eq!(Value::default_for("Z"), Value::Int(0));
        assert_eq!(Value::default_for("J"), Value::Long(0));
        assert_eq!(Value::default_for("D"), Value::Double(0.0));
        assert_eq!(Value::default_for("[I"), Value::Null);
        assert_eq!(Value::default_for("Ljava/lang/String;"), Value::Null);
    }

    #[test]
    fn test_class_names() {
        assert_eq!(Object::Str("a".into()).class_name(), "java/lang/String");
        let arr = Object::Array {
            elem: "I".into(),
            values: vec![],
        };
        assert_eq!(arr.class_name(), "[I");
    }

    #[test]
    fn test_heap_alloc() {
        let mut heap = Heap::default();
        let r = heap.alloc(Object::Builder(String::new()));
        assert_eq!(heap.len(), 1);
        assert!(matches!(heap.get(r), Ok(Object::Builder(_))));
        assert!(heap.get(r + 1).is_err());
    }
}
