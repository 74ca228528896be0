//! Descriptor constants and predicates

pub const OBJECT: &str = "Ljava/lang/Object;";
pub const STRING: &str = "Ljava/lang/String;";
pub const THROWABLE: &str = "Ljava/lang/Throwable;";
pub const LINKED_HASH_MAP: &str = "Ljava/util/LinkedHashMap;";
pub const MAP_INTERFACE: &str = "Ljava/util/Map;";
pub const ITERATOR: &str = "Ljava/util/Iterator;";

pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";
pub const THROWABLE_CLASS: &str = "java/lang/Throwable";
pub const ENUM_CLASS: &str = "java/lang/Enum";
pub const MAP_CLASS: &str = "java/util/LinkedHashMap";
pub const BUILDER_CLASS: &str = "java/lang/StringBuilder";
pub const OBJECTS_CLASS: &str = "java/util/Objects";
pub const ITERATOR_CLASS: &str = "java/util/Iterator";
pub const JS_ERROR_CLASS: &str = "tsjvm/runtime/JsError";

pub fn is_primitive(desc: &str) -> bool {
    matches!(desc, "Z" | "B" | "C" | "S" | "I" | "J" | "F" | "D")
}

pub fn is_reference(desc: &str) -> bool {
    desc.starts_with('L') || desc.starts_with('[')
}

pub fn is_array(desc: &str) -> bool {
    desc.starts_with('[')
}

/// Map types whose keys `for...in` walks
pub fn is_map(desc: &str) -> bool {
    matches!(desc, LINKED_HASH_MAP | MAP_INTERFACE | "Ljava/util/HashMap;")
}

pub fn is_string(desc: &str) -> bool {
    desc == STRING
}

pub fn is_wide(desc: &str) -> bool {
    matches!(desc, "J" | "D")
}

/// Primitive that takes part in arithmetic
pub fn is_numeric(desc: &str) -> bool {
    matches!(desc, "B" | "C" | "S" | "I" | "J" | "F" | "D")
}

/// Computes as `int` on the operand stack
pub fn is_int_like(desc: &str) -> bool {
    matches!(desc, "Z" | "B" | "C" | "S" | "I")
}

pub fn array_element(desc: &str) -> Option<&str> {
    desc.strip_prefix('[')
}

/// `Lfoo/Bar;` to `foo/Bar`; array descriptors are their own class name
pub fn class_name(desc: &str) -> &str {
    desc.strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .unwrap_or(desc)
}

pub fn object_of(internal: &str) -> String {
    format!("L{};", internal)
}

pub fn method_descriptor(params: &[String], ret: &str) -> String {
    format!("({}){}", params.concat(), ret)
}

/// Stack type a primitive computes in: `I`, `J`, `F` or `D`
pub fn computational(desc: &str) -> &'static str {
    match desc {
        "J" => "J",
        "F" => "F",
        "D" => "D",
        _ => "I",
    }
}

/// Kind of a shift or bitwise operand: `J` for longs, boxed or not, `I` otherwise
pub fn integral_kind(desc: &str) -> &'static str {
    match unboxed(desc).unwrap_or(desc) {
        "J" => "J",
        _ => "I",
    }
}

fn rank(desc: &str) -> Option<u8> {
    match desc {
        "Z" | "B" | "C" | "S" | "I" => Some(0),
        "J" => Some(1),
        "F" => Some(2),
        "D" => Some(3),
        _ => None,
    }
}

/// Binary numeric promotion of two operand types, unboxing first
pub fn promote(a: &str, b: &str) -> &'static str {
    let a = unboxed(a).unwrap_or(a);
    let b = unboxed(b).unwrap_or(b);
    match rank(a).unwrap_or(3).max(rank(b).unwrap_or(3)) {
        0 => "I",
        1 => "J",
        2 => "F",
        _ => "D",
    }
}

/// Box class for a primitive
pub fn box_class(desc: &str) -> Option<&'static str> {
    Some(match desc {
        "Z" => "java/lang/Boolean",
        "B" => "java/lang/Byte",
        "C" => "java/lang/Character",
        "S" => "java/lang/Short",
        "I" => "java/lang/Integer",
        "J" => "java/lang/Long",
        "F" => "java/lang/Float",
        "D" => "java/lang/Double",
        _ => return None,
    })
}

/// Primitive held by a box descriptor
pub fn unboxed(desc: &str) -> Option<&'static str> {
    Some(match desc {
        "Ljava/lang/Boolean;" => "Z",
        "Ljava/lang/Byte;" => "B",
        "Ljava/lang/Character;" => "C",
        "Ljava/lang/Short;" => "S",
        "Ljava/lang/Integer;" => "I",
        "Ljava/lang/Long;" => "J",
        "Ljava/lang/Float;" => "F",
        "Ljava/lang/Double;" => "D",
        _ => return None,
    })
}

/// Reference form of a descriptor: primitives become their box
pub fn boxed(desc: &str) -> String {
    match box_class(desc) {
        Some(class) => object_of(class),
        None => desc.to_string(),
    }
}

/// `xValue` accessor returning a primitive
pub fn unbox_method(desc: &str) -> Option<(&'static str, &'static str)> {
    Some(match desc {
        "Z" => ("booleanValue", "()Z"),
        "B" => ("byteValue", "()B"),
        "C" => ("charValue", "()C"),
        "S" => ("shortValue", "()S"),
        "I" => ("intValue", "()I"),
        "J" => ("longValue", "()J"),
        "F" => ("floatValue", "()F"),
        "D" => ("doubleValue", "()D"),
        _ => return None,
    })
}

/// `StringBuilder.append` overload for a value type
pub fn append_descriptor(desc: &str) -> &'static str {
    match desc {
        "Z" => "(Z)Ljava/lang/StringBuilder;",
        "C" => "(C)Ljava/lang/StringBuilder;",
        "B" | "S" | "I" => "(I)Ljava/lang/StringBuilder;",
        "J" => "(J)Ljava/lang/StringBuilder;",
        "F" => "(F)Ljava/lang/StringBuilder;",
        "D" => "(D)Ljava/lang/StringBuilder;",
        STRING => "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        _ => "(Ljava/lang/Object;)Ljava/lang/StringBuilder;",
    }
}

/// `String.valueOf` overload for a value type
pub fn value_of_descriptor(desc: &str) -> &'static str {
    match desc {
        "Z" => "(Z)Ljava/lang/String;",
        "C" => "(C)Ljava/lang/String;",
        "B" | "S" | "I" => "(I)Ljava/lang/String;",
        "J" => "(J)Ljava/lang/String;",
        "F" => "(F)Ljava/lang/String;",
        "D" => "(D)Ljava/lang/String;",
        _ => "(Ljava/lang/Object;)Ljava/lang/String;",
    }
}

/// Java type name (`int`, `java.lang.String`, `int[]`) to a descriptor
pub fn java_type_descriptor(name: &str) -> String {
    if let Some(elem) = name.strip_suffix("[]") {
        return format!("[{}", java_type_descriptor(elem));
    }
    match name {
        "boolean" => "Z".into(),
        "byte" => "B".into(),
        "char" => "C".into(),
        "short" => "S".into(),
        "int" => "I".into(),
        "long" => "J".into(),
        "float" => "F".into(),
        "double" => "D".into(),
        "void" => "V".into(),
        other => object_of(&other.replace('.', "/")),
    }
}

/// Widest of several element types, used for array literals
pub fn widest<'a>(types: impl IntoIterator<Item = &'a str>) -> String {
    let mut result: Option<String> = None;
    for ty in types {
        result = Some(match result {
            None => ty.to_string(),
            Some(current) if current == ty => current,
            Some(current) if is_numeric(&current) && is_numeric(ty) => {
                promote(&current, ty).to_string()
            }
            Some(_) => OBJECT.to_string(),
        });
    }
    result.unwrap_or_else(|| OBJECT.to_string())
}

/// Getter name for a property: `getX`, or `isX` for booleans
pub fn getter_name(prop: &str, desc: &str) -> String {
    if desc == "Z" {
        if prop.starts_with("is") || prop.starts_with("has") || prop.starts_with("can") {
            return prop.to_string();
        }
        return format!("is{}", capitalize(prop));
    }
    format!("get{}", capitalize(prop))
}

pub fn setter_name(prop: &str) -> String {
    format!("set{}", capitalize(prop))
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion() {
        assert_eq!(promote("I", "I"), "I");
        assert_eq!(promote("I", "J"), "J");
        assert_eq!(promote("J", "F"), "F");
        assert_eq!(promote("F", "D"), "D");
        assert_eq!(promote("Z", "S"), "I");
        assert_eq!(promote("Ljava/lang/Integer;", "I"), "I");
        assert_eq!(promote(OBJECT, "I"), "D");
    }

    #[test]
    fn test_integral_kind() {
        assert_eq!(integral_kind("J"), "J");
        assert_eq!(integral_kind("Ljava/lang/Long;"), "J");
        assert_eq!(integral_kind("D"), "I");
        assert_eq!(integral_kind("I"), "I");
    }

    #[test]
    fn test_boxing_tables() {
        assert_eq!(boxed("I"), "Ljava/lang/Integer;");
        assert_eq!(boxed(STRING), STRING);
        assert_eq!(unboxed("Ljava/lang/Double;"), Some("D"));
        assert_eq!(unbox_method("J"), Some(("longValue", "()J")));
    }

    #[test]
    fn test_java_type_names() {
        assert_eq!(java_type_descriptor("int"), "I");
        assert_eq!(java_type_descriptor("java.lang.String"), STRING);
        assert_eq!(java_type_descriptor("long[]"), "[J");
    }

    #[test]
    fn test_widest() {
        assert_eq!(widest(["I", "I"]), "I");
        assert_eq!(widest(["I", "D"]), "D");
        assert_eq!(widest([STRING, "I"]), OBJECT);
        assert_eq!(widest(Vec::<&str>::new()), OBJECT);
    }

    #[test]
    fn test_accessor_names() {
        assert_eq!(getter_name("name", STRING), "getName");
        assert_eq!(getter_name("active", "Z"), "isActive");
        assert_eq!(getter_name("hasChildren", "Z"), "hasChildren");
        assert_eq!(setter_name("active"), "setActive");
        assert_eq!(class_name("Ljava/lang/String;"), "java/lang/String");
        assert_eq!(class_name("[I"), "[I");
    }
}
