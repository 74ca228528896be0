//! Field and method descriptor parsing

/// Split a method descriptor into parameter descriptors and the return descriptor
///
/// `(I[Ljava/lang/String;J)V` gives `["I", "[Ljava/lang/String;", "J"]` and `"V"`.
pub fn parse_method(descriptor: &str) -> Option<(Vec<&str>, &str)> {
    let rest = descriptor.strip_prefix('(')?;
    let close = rest.find(')')?;
    let (params_str, ret) = (&rest[..close], &rest[close + 1..]);
    let mut params = Vec::new();
    let mut pos = 0;
    while pos < params_str.len() {
        let len = field_len(&params_str[pos..])?;
        params.push(&params_str[pos..pos + len]);
        pos += len;
    }
    if ret != "V" && field_len(ret) != Some(ret.len()) {
        return None;
    }
    Some((params, ret))
}

/// Length of the field descriptor at the start of `s`
fn field_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'Z' | b'B' | b'C' | b'S' | b'I' | b'J' | b'F' | b'D' => Some(i + 1),
        b'L' => Some(i + s[i..].find(';')? + 1),
        _ => None,
    }
}

/// Slots a value of this field descriptor occupies
pub fn slot_size(descriptor: &str) -> u16 {
    match descriptor {
        "J" | "D" => 2,
        "V" => 0,
        _ => 1,
    }
}

/// Slots taken by the parameters of a method descriptor, without the receiver
pub fn param_slots(descriptor: &str) -> Option<u16> {
    let (params, _) = parse_method(descriptor)?;
    Some(params.iter().map(|p| slot_size(p)).sum())
}

/// Internal name behind an object descriptor (`Lfoo/Bar;` gives `foo/Bar`);
/// array descriptors are returned unchanged
pub fn internal_name(descriptor: &str) -> &str {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .unwrap_or(descriptor)
}

/// Descriptor for an internal name or array descriptor
pub fn object_descriptor(internal_name: &str) -> String {
    if internal_name.starts_with('[') {
        internal_name.to_string()
    } else {
        format!("L{};", internal_name)
    }
}

/// Human-readable rendering (`[Ljava/lang/String;` gives `java.lang.String[]`)
pub fn pretty(descriptor: &str) -> String {
    let dims = descriptor.bytes().take_while(|b| *b == b'[').count();
    let base = match &descriptor[dims..] {
        "Z" => "boolean".to_string(),
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "S" => "short".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        "V" => "void".to_string(),
        other => internal_name(other).replace('/', "."),
    };
    format!("{}{}", base, "[]".repeat(dims))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method() {
        let (params, ret) = parse_method("(I[Ljava/lang/String;J)V").unwrap();
        assert_eq!(params, vec!["I", "[Ljava/lang/String;", "J"]);
        assert_eq!(ret, "V");
        assert_eq!(param_slots("(I[Ljava/lang/String;J)V"), Some(4));
        assert!(parse_method("(Q)V").is_none());
        assert!(parse_method("()").is_none());
    }

    #[test]
    fn test_pretty() {
        assert_eq!(pretty("[[I"), "int[][]");
        assert_eq!(pretty("Ljava/util/List;"), "java.util.List");
        assert_eq!(internal_name("[I"), "[I");
        assert_eq!(object_descriptor("java/lang/Object"), "Ljava/lang/Object;");
    }
}
