//! Built-in classes and library methods
//!
//! Generated code links against a small slice of the Java platform:
//! `StringBuilder` for concatenation, a few `String` methods, boxing,
//! `Objects.equals`, `LinkedHashMap`, `Enum`, `Math` and the exception
//! hierarchy including the `tsjvm/runtime` error classes. They are
//! simulated here instead of being loaded from class files.

use crate::format::{format_double, format_float};
use crate::interpreter::unknown_method;
use crate::value::{Object, Value, KEY_ITERATOR_CLASS, KEY_SET_CLASS};
use crate::vm::{Exec, Trap, Vm};
use crate::VmError;
use rustc_hash::FxHashMap;

const OBJECT: &str = "java/lang/Object";

/// Superclass of a built-in class
pub fn builtin_super(name: &str) -> Option<&'static str> {
    Some(match name {
        OBJECT => return None,
        "java/lang/Exception" | "java/lang/Error" => "java/lang/Throwable",
        "java/lang/RuntimeException" => "java/lang/Exception",
        "java/lang/ArithmeticException"
        | "java/lang/NullPointerException"
        | "java/lang/ClassCastException"
        | "java/lang/IllegalArgumentException"
        | "java/lang/IllegalStateException"
        | "java/lang/IndexOutOfBoundsException"
        | "java/lang/NegativeArraySizeException"
        | "java/lang/UnsupportedOperationException"
        | "java/util/NoSuchElementException"
        | "tsjvm/runtime/JsError" => "java/lang/RuntimeException",
        "java/lang/ArrayIndexOutOfBoundsException"
        | "java/lang/StringIndexOutOfBoundsException" => {
            "java/lang/IndexOutOfBoundsException"
        }
        "java/lang/NumberFormatException" => "java/lang/IllegalArgumentException",
        "tsjvm/runtime/JsTypeError"
        | "tsjvm/runtime/JsRangeError"
        | "tsjvm/runtime/JsReferenceError"
        | "tsjvm/runtime/JsSyntaxError"
        | "tsjvm/runtime/JsURIError"
        | "tsjvm/runtime/JsEvalError"
        | "tsjvm/runtime/JsAggregateError" => "tsjvm/runtime/JsError",
        "java/lang/Integer" | "java/lang/Long" | "java/lang/Float" | "java/lang/Double"
        | "java/lang/Short" | "java/lang/Byte" => "java/lang/Number",
        "java/util/LinkedHashMap" => "java/util/HashMap",
        "java/util/HashMap" => "java/util/AbstractMap",
        _ => OBJECT,
    })
}

/// Interfaces a built-in class implements directly
pub fn builtin_interfaces(name: &str) -> &'static [&'static str] {
    match name {
        "java/lang/String" => &[
            "java/lang/CharSequence",
            "java/lang/Comparable",
            "java/io/Serializable",
        ],
        "java/lang/StringBuilder" => &["java/lang/CharSequence"],
        "java/util/HashMap" | "java/util/AbstractMap" => &["java/util/Map"],
        KEY_SET_CLASS => &["java/util/Set"],
        KEY_ITERATOR_CLASS => &["java/util/Iterator"],
        "java/lang/Integer" | "java/lang/Long" | "java/lang/Float" | "java/lang/Double"
        | "java/lang/Short" | "java/lang/Byte" | "java/lang/Boolean" | "java/lang/Character"
        | "java/lang/Enum" => &["java/lang/Comparable"],
        "java/lang/Throwable" | "java/lang/Number" => &["java/io/Serializable"],
        _ => &[],
    }
}

/// Box class for a primitive descriptor
pub fn box_class(descriptor: &str) -> Option<&'static str> {
    Some(match descriptor {
        "I" => "java/lang/Integer",
        "J" => "java/lang/Long",
        "F" => "java/lang/Float",
        "D" => "java/lang/Double",
        "Z" => "java/lang/Boolean",
        "C" => "java/lang/Character",
        "S" => "java/lang/Short",
        "B" => "java/lang/Byte",
        _ => return None,
    })
}

/// `String.valueOf` of a primitive with this descriptor; `None` for references
pub fn format_primitive(descriptor: &str, value: Value) -> Option<String> {
    Some(match (descriptor, value) {
        ("Z", Value::Int(v)) => (v != 0).to_string(),
        ("C", Value::Int(v)) => char_of(v).to_string(),
        ("I" | "S" | "B", Value::Int(v)) => v.to_string(),
        ("J", Value::Long(v)) => v.to_string(),
        ("F", Value::Float(v)) => format_float(v),
        ("D", Value::Double(v)) => format_double(v),
        _ => return None,
    })
}

/// `toString` of a boxed value
pub fn format_boxed(class: &str, value: Value) -> String {
    let descriptor = match class {
        "java/lang/Boolean" => "Z",
        "java/lang/Character" => "C",
        "java/lang/Long" => "J",
        "java/lang/Float" => "F",
        "java/lang/Double" => "D",
        _ => "I",
    };
    format_primitive(descriptor, value).unwrap_or_else(|| format!("{:?}", value))
}

fn char_of(code: i32) -> char {
    char::from_u32(code as u32 & 0xffff).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Primitive conversion used by `Number.xValue()`
fn convert(value: Value, target: &str) -> Option<Value> {
    let as_f64 = match value {
        Value::Int(v) => v as f64,
        Value::Long(v) => v as f64,
        Value::Float(v) => v as f64,
        Value::Double(v) => v,
        _ => return None,
    };
    Some(match (target, value) {
        ("I", Value::Long(v)) => Value::Int(v as i32),
        ("I", Value::Int(v)) => Value::Int(v),
        ("I", _) => Value::Int(as_f64 as i32),
        ("J", Value::Int(v)) => Value::Long(v as i64),
        ("J", Value::Long(v)) => Value::Long(v),
        ("J", _) => Value::Long(as_f64 as i64),
        ("F", Value::Float(v)) => Value::Float(v),
        ("F", Value::Long(v)) => Value::Float(v as f32),
        ("F", Value::Int(v)) => Value::Float(v as f32),
        ("F", _) => Value::Float(as_f64 as f32),
        ("S", _) => Value::Int(as_f64 as i32 as i16 as i32),
        ("B", _) => Value::Int(as_f64 as i32 as i8 as i32),
        _ => Value::Double(as_f64),
    })
}

fn bool_value(b: bool) -> Option<Value> {
    Some(Value::Int(b as i32))
}

impl Vm {
    fn string_arg(&self, value: Value) -> Exec<Option<String>> {
        match value {
            Value::Null => Ok(None),
            Value::Ref(r) => match self.heap.get(r)? {
                Object::Str(s) => Ok(Some(s.clone())),
                Object::Builder(s) => Ok(Some(s.clone())),
                other => Err(VmError::TypeConfusion(format!(
                    "expected a string, found {}",
                    other.class_name()
                ))
                .into()),
            },
            other => {
                Err(VmError::TypeConfusion(format!("expected a string, found {:?}", other)).into())
            }
        }
    }

    fn alloc_str(&mut self, s: String) -> Value {
        Value::Ref(self.heap.alloc(Object::Str(s)))
    }

    fn alloc_box(&mut self, class: &'static str, value: Value) -> Value {
        Value::Ref(self.heap.alloc(Object::Boxed { class, value }))
    }

    /// Allocate an object of a built-in class for `new`
    pub(crate) fn new_builtin(&mut self, class: &str) -> Exec<usize> {
        let object = match class {
            "java/lang/StringBuilder" => Object::Builder(String::new()),
            "java/util/LinkedHashMap" | "java/util/HashMap" => Object::Map(Vec::new()),
            OBJECT => Object::Instance {
                class: class.to_string(),
                fields: FxHashMap::default(),
            },
            _ if self.is_subclass(class, "java/lang/Throwable") => Object::Instance {
                class: class.to_string(),
                fields: FxHashMap::default(),
            },
            _ => return Err(VmError::UnknownClass(class.to_string()).into()),
        };
        Ok(self.heap.alloc(object))
    }

    /// Constructor of a built-in superclass or a built-in object
    pub(crate) fn native_init(&mut self, owner: &str, desc: &str, args: Vec<Value>) -> Exec<()> {
        let this = args
            .first()
            .and_then(Value::as_ref)
            .ok_or_else(|| VmError::TypeConfusion("constructor without receiver".into()))?;
        match (owner, desc) {
            (OBJECT, "()V") => Ok(()),
            ("java/lang/StringBuilder", "()V") => Ok(()),
            ("java/lang/StringBuilder", "(Ljava/lang/String;)V") => {
                let initial = self.string_arg(args[1])?.unwrap_or_default();
                if let Object::Builder(s) = self.heap.get_mut(this)? {
                    *s = initial;
                }
                Ok(())
            }
            ("java/util/LinkedHashMap" | "java/util/HashMap", "()V") => Ok(()),
            ("java/lang/Enum", "(Ljava/lang/String;I)V") => {
                self.set_field(this, "$name", args[1])?;
                self.set_field(this, "$ordinal", args[2])
            }
            (_, "()V") if self.is_subclass(owner, "java/lang/Throwable") => Ok(()),
            (_, "(Ljava/lang/String;)V") if self.is_subclass(owner, "java/lang/Throwable") => {
                self.set_field(this, "$message", args[1])
            }
            (_, "(Ljava/lang/String;Ljava/lang/Throwable;)V")
                if self.is_subclass(owner, "java/lang/Throwable") =>
            {
                self.set_field(this, "$message", args[1])?;
                self.set_field(this, "$cause", args[2])
            }
            _ => Err(unknown_method(owner, "<init>", desc).into()),
        }
    }

    fn set_field(&mut self, r: usize, name: &str, value: Value) -> Exec<()> {
        match self.heap.get_mut(r)? {
            Object::Instance { fields, .. } => {
                fields.insert(name.to_string(), value);
                Ok(())
            }
            other => Err(VmError::TypeConfusion(format!(
                "cannot set {} on {}",
                name,
                other.class_name()
            ))
            .into()),
        }
    }

    fn field(&self, r: usize, name: &str) -> Exec<Value> {
        match self.heap.get(r)? {
            Object::Instance { fields, .. } => Ok(fields.get(name).copied().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }

    /// Static library methods
    pub(crate) fn native_static(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let param = desc
            .strip_prefix('(')
            .and_then(|d| d.split_once(')'))
            .map(|(p, _)| p)
            .unwrap_or_default();
        let result = match (owner, name) {
            ("java/lang/String", "valueOf") => {
                let text = match format_primitive(param, args[0]) {
                    Some(text) => text,
                    None => self.to_java_string(args[0])?,
                };
                Some(self.alloc_str(text))
            }
            (_, "valueOf") if box_class(param) == Some(owner) => {
                let class = box_class(param).unwrap_or(OBJECT);
                Some(self.alloc_box(class, args[0]))
            }
            ("java/util/Objects", "equals") => {
                let equal = self.java_equals(args[0], args[1])?;
                bool_value(equal)
            }
            ("java/util/Objects", "hashCode") => Some(Value::Int(self.hash_code(args[0])?)),
            ("java/lang/Enum", "valueOf") => Some(self.enum_value_of(args[0], args[1])?),
            ("java/lang/Math", _) => Some(
                math(name, desc, &args).ok_or_else(|| unknown_method(owner, name, desc))?,
            ),
            ("java/lang/Integer", "parseInt") => {
                let text = self.string_arg(args[0])?.unwrap_or_default();
                match text.trim().parse::<i32>() {
                    Ok(v) => Some(Value::Int(v)),
                    Err(_) => {
                        let message = format!("For input string: \"{}\"", text);
                        return Err(self.throw_new(
                            "java/lang/NumberFormatException",
                            Some(&message),
                        ));
                    }
                }
            }
            ("java/lang/Double", "parseDouble") => {
                let text = self.string_arg(args[0])?.unwrap_or_default();
                match text.trim().parse::<f64>() {
                    Ok(v) => Some(Value::Double(v)),
                    Err(_) => {
                        let message = format!("For input string: \"{}\"", text);
                        return Err(self.throw_new(
                            "java/lang/NumberFormatException",
                            Some(&message),
                        ));
                    }
                }
            }
            _ => return Err(unknown_method(owner, name, desc).into()),
        };
        Ok(result)
    }

    fn enum_value_of(&mut self, class: Value, name: Value) -> Exec<Value> {
        let class_name = match class.as_ref().map(|r| self.heap.get(r)).transpose()? {
            Some(Object::Class(name)) => name.clone(),
            _ => return Err(VmError::TypeConfusion("Enum.valueOf without a class".into()).into()),
        };
        let Some(member) = self.string_arg(name)? else {
            return Err(self.throw_new("java/lang/NullPointerException", Some("Name is null")));
        };
        self.ensure_initialized(&class_name)?;
        let descriptor = format!("L{};", class_name);
        let declared = self.class(&class_name).is_some_and(|file| {
            file.fields
                .iter()
                .any(|f| f.is_static() && f.name == member && f.descriptor == descriptor)
        });
        if declared {
            return Ok(self.static_value(&class_name, &member)?);
        }
        let message = format!(
            "No enum constant {}.{}",
            class_name.replace('/', "."),
            member
        );
        Err(self.throw_new("java/lang/IllegalArgumentException", Some(&message)))
    }

    /// Instance library methods, dispatched on the receiver object
    pub(crate) fn native_virtual(
        &mut self,
        owner: &str,
        name: &str,
        desc: &str,
        args: Vec<Value>,
    ) -> Exec<Option<Value>> {
        let this = args
            .first()
            .and_then(Value::as_ref)
            .ok_or_else(|| VmError::TypeConfusion("method call without receiver".into()))?;
        let receiver = self.heap.get(this)?.clone();

        let result = match (&receiver, name, desc) {
            (_, "toString", "()Ljava/lang/String;") => {
                let text = self.to_java_string(args[0])?;
                Some(self.alloc_str(text))
            }
            (_, "equals", "(Ljava/lang/Object;)Z") => {
                bool_value(self.builtin_equals(args[0], args[1])?)
            }
            (_, "hashCode", "()I") => Some(Value::Int(self.hash_code(args[0])?)),

            (Object::Str(s), _, _) => self.string_method(s, name, desc, &args)?,
            (Object::Builder(_), "append", _) => {
                let param = &desc[1..desc.find(')').unwrap_or(1)];
                let text = match format_primitive(param, args[1]) {
                    Some(text) => text,
                    None => self.to_java_string(args[1])?,
                };
                if let Object::Builder(s) = self.heap.get_mut(this)? {
                    s.push_str(&text);
                }
                Some(Value::Ref(this))
            }
            (Object::Builder(s), "length", "()I") => Some(Value::Int(utf16(s).len() as i32)),
            (Object::Boxed { value, .. }, _, _) => match (name, *value) {
                ("booleanValue", v) | ("charValue", v) => Some(v),
                ("intValue", v) => convert(v, "I"),
                ("longValue", v) => convert(v, "J"),
                ("floatValue", v) => convert(v, "F"),
                ("doubleValue", v) => convert(v, "D"),
                ("shortValue", v) => convert(v, "S"),
                ("byteValue", v) => convert(v, "B"),
                _ => return Err(unknown_method(owner, name, desc).into()),
            },
            (Object::Map(entries), _, _) => {
                let entries = entries.clone();
                self.map_method(this, entries, name, desc, &args)?
            }
            (Object::KeySet(keys), "iterator", "()Ljava/util/Iterator;") => {
                let iter = Object::KeyIter {
                    keys: keys.clone(),
                    next: 0,
                };
                Some(Value::Ref(self.heap.alloc(iter)))
            }
            (Object::KeySet(keys), "size", "()I") => Some(Value::Int(keys.len() as i32)),
            (Object::KeyIter { keys, next }, "hasNext", "()Z") => bool_value(*next < keys.len()),
            (Object::KeyIter { keys, next }, "next", "()Ljava/lang/Object;") => {
                let Some(key) = keys.get(*next).copied() else {
                    return Err(self.throw_new("java/util/NoSuchElementException", None));
                };
                if let Object::KeyIter { next, .. } = self.heap.get_mut(this)? {
                    *next += 1;
                }
                Some(key)
            }
            (Object::Array { elem, values }, "clone", "()Ljava/lang/Object;") => {
                let copy = Object::Array {
                    elem: elem.clone(),
                    values: values.clone(),
                };
                Some(Value::Ref(self.heap.alloc(copy)))
            }
            (
                Object::Instance { .. },
                "getMessage" | "getLocalizedMessage",
                "()Ljava/lang/String;",
            ) => {
                Some(self.field(this, "$message")?)
            }
            (Object::Instance { .. }, "getCause", "()Ljava/lang/Throwable;") => {
                Some(self.field(this, "$cause")?)
            }
            (Object::Instance { .. }, "name", "()Ljava/lang/String;") => {
                Some(self.field(this, "$name")?)
            }
            (Object::Instance { .. }, "ordinal", "()I") => Some(self.field(this, "$ordinal")?),
            (Object::Instance { .. }, "compareTo", _) => {
                let Value::Int(a) = self.field(this, "$ordinal")? else {
                    return Err(unknown_method(owner, name, desc).into());
                };
                let other = args[1].as_ref().ok_or_else(|| self.null_pointer())?;
                let Value::Int(b) = self.field(other, "$ordinal")? else {
                    return Err(unknown_method(owner, name, desc).into());
                };
                Some(Value::Int(a - b))
            }
            _ => return Err(unknown_method(owner, name, desc).into()),
        };
        Ok(result)
    }

    fn string_method(
        &mut self,
        s: &str,
        name: &str,
        desc: &str,
        args: &[Value],
    ) -> Exec<Option<Value>> {
        let units = utf16(s);
        let int_arg = |i: usize| match args.get(i) {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(Trap::Fatal(VmError::TypeConfusion(format!(
                "String.{}{} expects an int argument",
                name, desc
            )))),
        };
        Ok(match name {
            "length" => Some(Value::Int(units.len() as i32)),
            "isEmpty" => bool_value(units.is_empty()),
            "charAt" => {
                let index = int_arg(1)?;
                match usize::try_from(index).ok().and_then(|i| units.get(i)) {
                    Some(unit) => Some(Value::Int(*unit as i32)),
                    None => return Err(self.string_index(index, units.len())),
                }
            }
            "substring" => {
                let begin = int_arg(1)?;
                let end = if args.len() > 2 {
                    int_arg(2)?
                } else {
                    units.len() as i32
                };
                if begin < 0 || end > units.len() as i32 || begin > end {
                    let message = format!("begin {}, end {}, length {}", begin, end, units.len());
                    return Err(self.throw_new(
                        "java/lang/StringIndexOutOfBoundsException",
                        Some(&message),
                    ));
                }
                let text = String::from_utf16_lossy(&units[begin as usize..end as usize]);
                Some(self.alloc_str(text))
            }
            "indexOf" | "lastIndexOf" => {
                let needle = utf16(&self.string_arg(args[1])?.unwrap_or_default());
                let found = if needle.len() > units.len() {
                    None
                } else {
                    let mut starts = 0..=units.len() - needle.len();
                    let matches = |i: &usize| units[*i..*i + needle.len()] == needle[..];
                    if name == "indexOf" {
                        starts.find(matches)
                    } else {
                        starts.rev().find(matches)
                    }
                };
                Some(Value::Int(found.map_or(-1, |i| i as i32)))
            }
            "toUpperCase" => Some(self.alloc_str(s.to_uppercase())),
            "toLowerCase" => Some(self.alloc_str(s.to_lowercase())),
            "trim" => Some(self.alloc_str(s.trim_matches(|c: char| c <= ' ').to_string())),
            "startsWith" | "endsWith" | "contains" => {
                let other = self.string_arg(args[1])?.unwrap_or_default();
                bool_value(match name {
                    "startsWith" => s.starts_with(&other),
                    "endsWith" => s.ends_with(&other),
                    _ => s.contains(&other),
                })
            }
            "concat" => {
                let other = self.string_arg(args[1])?.unwrap_or_default();
                Some(self.alloc_str(format!("{}{}", s, other)))
            }
            "compareTo" => {
                let other = utf16(&self.string_arg(args[1])?.unwrap_or_default());
                let diff = units
                    .iter()
                    .zip(other.iter())
                    .find(|(a, b)| a != b)
                    .map(|(a, b)| *a as i32 - *b as i32)
                    .unwrap_or(units.len() as i32 - other.len() as i32);
                Some(Value::Int(diff))
            }
            _ => return Err(unknown_method("java/lang/String", name, desc).into()),
        })
    }

    fn string_index(&mut self, index: i32, len: usize) -> Trap {
        let message = format!("index {}, length {}", index, len);
        self.throw_new("java/lang/StringIndexOutOfBoundsException", Some(&message))
    }

    fn map_method(
        &mut self,
        this: usize,
        mut entries: Vec<(Value, Value)>,
        name: &str,
        desc: &str,
        args: &[Value],
    ) -> Exec<Option<Value>> {
        let mut position = None;
        if let Some(key) = args.get(1) {
            for (i, (k, _)) in entries.iter().enumerate() {
                if self.builtin_equals(*k, *key)? {
                    position = Some(i);
                    break;
                }
            }
        }
        let result = match name {
            "size" => Some(Value::Int(entries.len() as i32)),
            "isEmpty" => bool_value(entries.is_empty()),
            "get" => Some(position.map_or(Value::Null, |i| entries[i].1)),
            "containsKey" => bool_value(position.is_some()),
            "keySet" => {
                let keys = entries.iter().map(|(k, _)| *k).collect();
                Some(Value::Ref(self.heap.alloc(Object::KeySet(keys))))
            }
            "put" => {
                let previous = match position {
                    Some(i) => std::mem::replace(&mut entries[i].1, args[2]),
                    None => {
                        entries.push((args[1], args[2]));
                        Value::Null
                    }
                };
                Some(previous)
            }
            "remove" => Some(match position {
                Some(i) => entries.remove(i).1,
                None => Value::Null,
            }),
            _ => return Err(unknown_method("java/util/LinkedHashMap", name, desc).into()),
        };
        if let Object::Map(stored) = self.heap.get_mut(this)? {
            *stored = entries;
        }
        Ok(result)
    }

    /// `String.valueOf(Object)`; runs a user-defined `toString`
    pub(crate) fn to_java_string(&mut self, value: Value) -> Exec<String> {
        let Value::Ref(r) = value else {
            return Ok(self.display(&value));
        };
        let class = self.class_of(r)?;
        if self.classes.contains_key(&class) {
            if let Some((file, index)) =
                self.find_method(&class, "toString", "()Ljava/lang/String;")
            {
                let result = self.run_method(&file, index, vec![value])?;
                return Ok(match result {
                    Some(v) => self.string_arg(v)?.unwrap_or_else(|| "null".to_string()),
                    None => "null".to_string(),
                });
            }
        }
        Ok(self.display(&value))
    }

    /// `Object.equals` on built-in objects: content for strings and boxes,
    /// identity otherwise
    fn builtin_equals(&self, a: Value, b: Value) -> Exec<bool> {
        if a == b {
            return Ok(true);
        }
        let (Value::Ref(x), Value::Ref(y)) = (a, b) else {
            return Ok(false);
        };
        Ok(match (self.heap.get(x)?, self.heap.get(y)?) {
            (Object::Str(p), Object::Str(q)) => p == q,
            (Object::Boxed { class: c1, value: v1 }, Object::Boxed { class: c2, value: v2 }) => {
                c1 == c2 && v1 == v2
            }
            _ => false,
        })
    }

    /// `Objects.equals`; runs a user-defined `equals`
    pub(crate) fn java_equals(&mut self, a: Value, b: Value) -> Exec<bool> {
        if a == b {
            return Ok(true);
        }
        let Value::Ref(r) = a else {
            return Ok(false);
        };
        if b == Value::Null {
            return Ok(false);
        }
        let class = self.class_of(r)?;
        if let Some((file, index)) = self.find_method(&class, "equals", "(Ljava/lang/Object;)Z") {
            let result = self.run_method(&file, index, vec![a, b])?;
            return Ok(matches!(result, Some(Value::Int(v)) if v != 0));
        }
        self.builtin_equals(a, b)
    }

    fn hash_code(&self, value: Value) -> Exec<i32> {
        let Value::Ref(r) = value else {
            return Ok(0);
        };
        Ok(match self.heap.get(r)? {
            Object::Str(s) => utf16(s)
                .iter()
                .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(*c as i32)),
            Object::Boxed { value: Value::Int(v), .. } => *v,
            _ => r as i32,
        })
    }
}

/// `java.lang.Math` methods used by generated code
fn math(name: &str, desc: &str, args: &[Value]) -> Option<Value> {
    Some(match (name, desc, args) {
        ("abs", "(I)I", [Value::Int(v)]) => Value::Int(v.wrapping_abs()),
        ("abs", "(J)J", [Value::Long(v)]) => Value::Long(v.wrapping_abs()),
        ("abs", "(D)D", [Value::Double(v)]) => Value::Double(v.abs()),
        ("max", "(II)I", [Value::Int(a), Value::Int(b)]) => Value::Int(*a.max(b)),
        ("min", "(II)I", [Value::Int(a), Value::Int(b)]) => Value::Int(*a.min(b)),
        ("max", "(DD)D", [Value::Double(a), Value::Double(b)]) => Value::Double(a.max(*b)),
        ("min", "(DD)D", [Value::Double(a), Value::Double(b)]) => Value::Double(a.min(*b)),
        ("floor", _, [Value::Double(v)]) => Value::Double(v.floor()),
        ("ceil", _, [Value::Double(v)]) => Value::Double(v.ceil()),
        ("sqrt", _, [Value::Double(v)]) => Value::Double(v.sqrt()),
        ("pow", _, [Value::Double(a), Value::Double(b)]) => Value::Double(a.powf(*b)),
        ("round", "(D)J", [Value::Double(v)]) => Value::Long((v + 0.5).floor() as i64),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_hierarchy() {
        let vm = Vm::new();
        assert!(vm.is_subclass("tsjvm/runtime/JsTypeError", "tsjvm/runtime/JsError"));
        assert!(vm.is_subclass("tsjvm/runtime/JsTypeError", "java/lang/RuntimeException"));
        assert!(vm.is_subclass("java/lang/ArithmeticException", "java/lang/Throwable"));
        assert!(!vm.is_subclass("java/lang/Exception", "java/lang/RuntimeException"));
    }

    #[test]
    fn test_interfaces_and_arrays() {
        let vm = Vm::new();
        assert!(vm.is_subclass("java/lang/String", "java/lang/CharSequence"));
        assert!(vm.is_subclass("java/lang/Integer", "java/lang/Number"));
        assert!(vm.is_subclass("[Ljava/lang/String;", "[Ljava/lang/Object;"));
        assert!(!vm.is_subclass("[I", "[J"));
    }

    #[test]
    fn test_primitive_formatting() {
        assert_eq!(format_primitive("Z", Value::Int(1)).as_deref(), Some("true"));
        assert_eq!(format_primitive("C", Value::Int(65)).as_deref(), Some("A"));
        assert_eq!(format_primitive("D", Value::Double(2.0)).as_deref(), Some("2.0"));
        assert_eq!(format_primitive("Ljava/lang/Object;", Value::Null), None);
    }

    #[test]
    fn test_unboxing_conversions() {
        assert_eq!(convert(Value::Double(3.9), "I"), Some(Value::Int(3)));
        assert_eq!(convert(Value::Int(7), "D"), Some(Value::Double(7.0)));
        assert_eq!(convert(Value::Int(7), "J"), Some(Value::Long(7)));
    }

    #[test]
    fn test_math() {
        assert_eq!(
            math("max", "(II)I", &[Value::Int(3), Value::Int(9)]),
            Some(Value::Int(9))
        );
        assert_eq!(
            math("floor", "(D)D", &[Value::Double(2.7)]),
            Some(Value::Double(2.0))
        );
    }
}
