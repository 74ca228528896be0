//! `java.util.function` interfaces used for function types and arrows
//!
//! A function shape is classified per slot: `int`, `long`, `double`,
//! `boolean` or reference. Reference slots are erased to `Object`.

use crate::error::{CompileError, CompileResult};
use crate::types::descriptor::{is_reference, OBJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionalInterface {
    pub internal_name: &'static str,
    pub method: &'static str,
    /// Erased descriptor of the abstract method
    pub descriptor: &'static str,
}

impl FunctionalInterface {
    pub fn type_descriptor(&self) -> String {
        format!("L{};", self.internal_name)
    }

    pub fn params(&self) -> Vec<&'static str> {
        tsjvm_classfile::descriptor::parse_method(self.descriptor)
            .map(|(params, _)| params)
            .unwrap_or_default()
    }

    pub fn return_descriptor(&self) -> &'static str {
        self.descriptor
            .rsplit_once(')')
            .map(|(_, ret)| ret)
            .unwrap_or("V")
    }
}

const fn fi(
    internal_name: &'static str,
    method: &'static str,
    descriptor: &'static str,
) -> FunctionalInterface {
    FunctionalInterface {
        internal_name,
        method,
        descriptor,
    }
}

const TABLE: &[FunctionalInterface] = &[
    fi("java/lang/Runnable", "run", "()V"),
    fi("java/util/function/Supplier", "get", "()Ljava/lang/Object;"),
    fi("java/util/function/IntSupplier", "getAsInt", "()I"),
    fi("java/util/function/LongSupplier", "getAsLong", "()J"),
    fi("java/util/function/DoubleSupplier", "getAsDouble", "()D"),
    fi("java/util/function/BooleanSupplier", "getAsBoolean", "()Z"),
    fi("java/util/function/Consumer", "accept", "(Ljava/lang/Object;)V"),
    fi("java/util/function/IntConsumer", "accept", "(I)V"),
    fi("java/util/function/LongConsumer", "accept", "(J)V"),
    fi("java/util/function/DoubleConsumer", "accept", "(D)V"),
    fi("java/util/function/BiConsumer", "accept", "(Ljava/lang/Object;Ljava/lang/Object;)V"),
    fi("java/util/function/Function", "apply", "(Ljava/lang/Object;)Ljava/lang/Object;"),
    fi(
        "java/util/function/BiFunction",
        "apply",
        "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
    ),
    fi("java/util/function/IntFunction", "apply", "(I)Ljava/lang/Object;"),
    fi("java/util/function/ToIntFunction", "applyAsInt", "(Ljava/lang/Object;)I"),
    fi("java/util/function/ToDoubleFunction", "applyAsDouble", "(Ljava/lang/Object;)D"),
    fi("java/util/function/IntUnaryOperator", "applyAsInt", "(I)I"),
    fi("java/util/function/LongUnaryOperator", "applyAsLong", "(J)J"),
    fi("java/util/function/DoubleUnaryOperator", "applyAsDouble", "(D)D"),
    fi("java/util/function/IntBinaryOperator", "applyAsInt", "(II)I"),
    fi("java/util/function/LongBinaryOperator", "applyAsLong", "(JJ)J"),
    fi("java/util/function/DoubleBinaryOperator", "applyAsDouble", "(DD)D"),
    fi("java/util/function/IntToDoubleFunction", "applyAsDouble", "(I)D"),
    fi("java/util/function/Predicate", "test", "(Ljava/lang/Object;)Z"),
    fi("java/util/function/IntPredicate", "test", "(I)Z"),
    fi("java/util/function/DoublePredicate", "test", "(D)Z"),
];

/// Slot class of a descriptor; `None` for shapes no interface takes
fn erase(desc: &str) -> Option<&'static str> {
    Some(match desc {
        "V" => "V",
        "Z" => "Z",
        "B" | "C" | "S" | "I" => "I",
        "J" => "J",
        "D" => "D",
        d if is_reference(d) => OBJECT,
        _ => return None,
    })
}

/// Interface for a function shape
pub fn select(params: &[String], ret: &str) -> CompileResult<&'static FunctionalInterface> {
    let unsupported = || CompileError::UnsupportedFunctionalSignature {
        descriptor: format!("({}){}", params.concat(), ret),
    };
    let mut erased = String::from("(");
    for param in params {
        match erase(param) {
            Some("V") | None => return Err(unsupported()),
            Some(e) => erased.push_str(e),
        }
    }
    erased.push(')');
    erased.push_str(erase(ret).ok_or_else(unsupported)?);
    TABLE
        .iter()
        .find(|fi| fi.descriptor == erased)
        .ok_or_else(unsupported)
}

/// Interface by internal name, when the name is one of ours
pub fn by_internal_name(internal_name: &str) -> Option<&'static FunctionalInterface> {
    TABLE.iter().find(|fi| fi.internal_name == internal_name)
}

pub fn by_descriptor(desc: &str) -> Option<&'static FunctionalInterface> {
    desc.strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .and_then(by_internal_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(params: &[&str], ret: &str) -> &'static str {
        let params: Vec<String> = params.iter().map(|s| s.to_string()).collect();
        select(&params, ret).map(|fi| fi.internal_name).unwrap_or("none")
    }

    #[test]
    fn test_selection() {
        assert_eq!(pick(&[], "V"), "java/lang/Runnable");
        assert_eq!(pick(&[], "I"), "java/util/function/IntSupplier");
        assert_eq!(pick(&[], "Ljava/lang/String;"), "java/util/function/Supplier");
        assert_eq!(pick(&["I", "I"], "I"), "java/util/function/IntBinaryOperator");
        assert_eq!(pick(&["Ljava/lang/String;"], "Z"), "java/util/function/Predicate");
        assert_eq!(pick(&["D"], "D"), "java/util/function/DoubleUnaryOperator");
        assert_eq!(pick(&["I"], "D"), "java/util/function/IntToDoubleFunction");
        assert_eq!(pick(&["[I", "Ljava/lang/Object;"], "V"), "java/util/function/BiConsumer");
    }

    #[test]
    fn test_unmatched_shape_is_an_error() {
        let params = vec!["I".to_string(), "D".to_string()];
        assert!(matches!(
            select(&params, "I"),
            Err(CompileError::UnsupportedFunctionalSignature { .. })
        ));
        let three = vec!["I".to_string(); 3];
        assert!(select(&three, "V").is_err());
    }

    #[test]
    fn test_lookup_by_descriptor() {
        let fi = by_descriptor("Ljava/util/function/IntSupplier;").unwrap();
        assert_eq!(fi.method, "getAsInt");
        assert_eq!(fi.return_descriptor(), "I");
        assert!(fi.params().is_empty());
        assert!(by_descriptor("Ljava/lang/String;").is_none());
    }
}
