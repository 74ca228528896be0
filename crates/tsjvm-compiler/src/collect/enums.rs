//! Enum declarations
//!
//! Ordinals follow declaration order; initializers written in source are
//! ignored.

use super::internal_name;
use crate::error::CompileResult;
use crate::options::ByteCodeCompilerOptions;
use crate::registry::{
    qualify, EnumRegistry, FieldInfo, JavaTypeInfo, MethodInfo, TypeKind, TypeRegistry,
};
use crate::types::{object_of, STRING};
use tsjvm_ast::{Decl, EnumDecl};

pub(super) fn declare_type(
    registry: &mut TypeRegistry,
    options: &ByteCodeCompilerOptions,
    namespace: &str,
    decl: &EnumDecl,
) -> CompileResult<()> {
    let qualified = qualify(namespace, decl.ident.as_str());
    let members: Vec<String> = decl.members.iter().map(|m| m.id.name.clone()).collect();
    if decl.members.iter().any(|m| m.init.is_some()) {
        tracing::debug!(
            target: "tsjvm::collect",
            %qualified,
            "enum initializers ignored, ordinals follow declaration order"
        );
    }
    registry.enums.register(&qualified, members)?;
    registry.register_type(JavaTypeInfo::new(
        decl.ident.as_str(),
        namespace,
        &internal_name(options, &qualified),
        TypeKind::Enum,
    ));
    Ok(())
}

/// Constant fields plus the `values`/`valueOf` pair every JVM enum has
pub(super) fn declare_members(registry: &mut TypeRegistry, decls: &[(String, &Decl)]) {
    for (namespace, decl) in decls {
        let Decl::Enum(e) = decl else {
            continue;
        };
        let qualified = qualify(namespace, e.ident.as_str());
        let Some(members) = registry.enums.members(&qualified).map(<[String]>::to_vec) else {
            continue;
        };
        let Some(info) = registry.get_mut(&qualified) else {
            continue;
        };
        let self_desc = object_of(&info.internal_name);
        for member in members {
            info.add_field(FieldInfo {
                name: EnumRegistry::field_name(&member),
                descriptor: self_desc.clone(),
                is_static: true,
                readonly: true,
            });
        }
        info.add_method(MethodInfo::new("values", &format!("()[{}", self_desc), true, false));
        info.add_method(MethodInfo::new(
            "valueOf",
            &format!("({}){}", STRING, self_desc),
            true,
            false,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::super::collect_module;
    use super::*;
    use crate::error::CompileError;
    use tsjvm_ast::factory::*;

    #[test]
    fn test_ordinals_ignore_initializers() {
        let mut registry = TypeRegistry::new();
        collect_module(
            &mut registry,
            &ByteCodeCompilerOptions::default(),
            &module(vec![enum_(
                "Level",
                vec![("Low", Some(int(10))), ("Mid", None), ("High", Some(int(2)))],
            )]),
        )
        .unwrap();
        assert_eq!(registry.enums.ordinal("Level", "Low"), Some(0));
        assert_eq!(registry.enums.ordinal("Level", "High"), Some(2));
        let info = registry.get("Level").unwrap();
        assert_eq!(info.kind, TypeKind::Enum);
        assert_eq!(info.super_internal, "java/lang/Enum");
        assert_eq!(info.field("MID").unwrap().descriptor, "LLevel;");
        assert_eq!(info.method("values").unwrap().descriptor, "()[LLevel;");
    }

    #[test]
    fn test_case_collision_is_rejected() {
        let mut registry = TypeRegistry::new();
        let err = collect_module(
            &mut registry,
            &ByteCodeCompilerOptions::default(),
            &module(vec![enum_("Dup", vec![("on", None), ("ON", None)])]),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::EnumError { ref name, .. } if name == "Dup"));
        assert!(!registry.contains("Dup"));
    }
}
