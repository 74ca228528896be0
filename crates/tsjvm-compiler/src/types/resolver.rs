//! Source type syntax to descriptors

use super::descriptor::*;
use super::{GenericTypeInfo, TypeEnv};
use crate::error::CompileResult;
use crate::functional;
use crate::registry::{JavaTypeInfo, TypeRegistry};
use std::collections::BTreeMap;
use tsjvm_ast::{TsKeywordType, TsType, TsTypeRef};

/// Pure function over (syntax, environment, registries); never mutates
#[derive(Clone, Copy)]
pub struct TypeResolver<'a> {
    pub registry: &'a TypeRegistry,
    aliases: &'a BTreeMap<String, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a TypeRegistry, aliases: &'a BTreeMap<String, String>) -> Self {
        Self { registry, aliases }
    }

    pub fn resolve(&self, ty: &TsType, env: &dyn TypeEnv) -> CompileResult<String> {
        self.resolve_inner(ty, env, &mut Vec::new())
    }

    /// Annotation if present, otherwise `Object`
    pub fn resolve_or_object(
        &self,
        ty: Option<&TsType>,
        env: &dyn TypeEnv,
    ) -> CompileResult<String> {
        match ty {
            Some(ty) => self.resolve(ty, env),
            None => Ok(OBJECT.to_string()),
        }
    }

    fn resolve_inner(
        &self,
        ty: &TsType,
        env: &dyn TypeEnv,
        visiting: &mut Vec<String>,
    ) -> CompileResult<String> {
        Ok(match ty {
            TsType::Keyword(keyword) => keyword_descriptor(*keyword).to_string(),
            TsType::Array(elem) => format!("[{}", self.resolve_inner(elem, env, visiting)?),
            TsType::Union(members) => {
                let present: Vec<&TsType> = members.iter().filter(|t| !t.is_nullish()).collect();
                match present.as_slice() {
                    [single] if present.len() < members.len() => {
                        boxed(&self.resolve_inner(single, env, visiting)?)
                    }
                    [single] => self.resolve_inner(single, env, visiting)?,
                    _ => OBJECT.to_string(),
                }
            }
            TsType::Fn(f) => {
                let mut params = Vec::with_capacity(f.params.len());
                for param in &f.params {
                    params.push(match &param.type_ann {
                        Some(t) => self.resolve_inner(t, env, visiting)?,
                        None => OBJECT.to_string(),
                    });
                }
                let ret = self.resolve_inner(&f.return_type, env, visiting)?;
                functional::select(&params, &ret)?.type_descriptor()
            }
            TsType::Ref(r) => self.resolve_ref(r, env, visiting)?,
        })
    }

    fn resolve_ref(
        &self,
        r: &TsTypeRef,
        env: &dyn TypeEnv,
        visiting: &mut Vec<String>,
    ) -> CompileResult<String> {
        match (r.name.as_str(), r.type_args.as_slice()) {
            ("Array", [elem]) => {
                return Ok(format!("[{}", self.resolve_inner(elem, env, visiting)?))
            }
            ("Record" | "Map", _) => return Ok(LINKED_HASH_MAP.to_string()),
            _ => {}
        }
        if let Some(java) = self.aliases.get(&r.name) {
            return Ok(java_type_descriptor(java));
        }
        if let Some((qualified, target)) = self.registry.lookup_alias(&r.name, env.namespace()) {
            if visiting.contains(&qualified) {
                tracing::debug!(target: "tsjvm::collect", alias = %qualified, "cyclic type alias");
                return Ok(OBJECT.to_string());
            }
            visiting.push(qualified);
            let resolved = self.resolve_inner(target, env, visiting);
            visiting.pop();
            return resolved;
        }
        if let Some(info) = self.registry.lookup_type(&r.name, env.namespace()) {
            return Ok(object_of(&info.internal_name));
        }
        if let Some(erased) = env.generic(&r.name) {
            return Ok(erased.to_string());
        }
        Ok(OBJECT.to_string())
    }

    /// Class a name refers to in a `new`, `extends` or static access
    pub fn lookup_class(&self, name: &str, env: &dyn TypeEnv) -> Option<&'a JavaTypeInfo> {
        self.registry.lookup_type(name, env.namespace())
    }

    /// Internal name of a library class reachable through the alias table
    pub fn alias_class(&self, name: &str) -> Option<String> {
        let java = self.aliases.get(name)?;
        let desc = java_type_descriptor(java);
        desc.starts_with('L').then(|| class_name(&desc).to_string())
    }

    /// Key/value descriptors of a map annotation
    pub fn generic_info(
        &self,
        ty: &TsType,
        env: &dyn TypeEnv,
    ) -> CompileResult<Option<GenericTypeInfo>> {
        self.generic_info_inner(ty, env, 0)
    }

    fn generic_info_inner(
        &self,
        ty: &TsType,
        env: &dyn TypeEnv,
        depth: usize,
    ) -> CompileResult<Option<GenericTypeInfo>> {
        if depth > 16 {
            return Ok(None);
        }
        let TsType::Ref(r) = ty else {
            return Ok(None);
        };
        match (r.name.as_str(), r.type_args.as_slice()) {
            ("Record" | "Map", [key, value]) => {
                let mut info =
                    GenericTypeInfo::new(self.resolve(key, env)?, self.resolve(value, env)?);
                if let Some(nested) = self.generic_info_inner(value, env, depth + 1)? {
                    info = info.with_nested(nested);
                }
                Ok(Some(info))
            }
            _ => match self.registry.lookup_alias(&r.name, env.namespace()) {
                Some((_, target)) => self.generic_info_inner(target, env, depth + 1),
                None => Ok(None),
            },
        }
    }

    /// Erased descriptors of declared generic parameters
    pub fn erase_type_params(
        &self,
        params: &[tsjvm_ast::TypeParam],
        env: &dyn TypeEnv,
    ) -> CompileResult<Vec<(String, String)>> {
        let mut erased = Vec::with_capacity(params.len());
        for param in params {
            let desc = match &param.constraint {
                Some(bound) => self.resolve(bound, env)?,
                None => OBJECT.to_string(),
            };
            erased.push((param.name.name.clone(), desc));
        }
        Ok(erased)
    }
}

pub fn keyword_descriptor(keyword: TsKeywordType) -> &'static str {
    match keyword {
        TsKeywordType::Number => "D",
        TsKeywordType::Boolean => "Z",
        TsKeywordType::String => STRING,
        TsKeywordType::Void => "V",
        TsKeywordType::BigInt => "J",
        TsKeywordType::Any
        | TsKeywordType::Unknown
        | TsKeywordType::Object
        | TsKeywordType::Null
        | TsKeywordType::Undefined
        | TsKeywordType::Never
        | TsKeywordType::Symbol => OBJECT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::default_type_aliases;
    use crate::registry::TypeKind;
    use crate::types::DeclEnv;
    use tsjvm_ast::factory::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register_namespace("geo");
        registry.register_type(JavaTypeInfo::new("Point", "geo", "geo/Point", TypeKind::Class));
        registry.register_alias("geo.Coord", t_named("Point"));
        registry.register_alias("Loop", t_named("Loop"));
        registry.register_alias("Scores", t_generic("Record", vec![t_string(), t_number()]));
        registry
    }

    #[test]
    fn test_keywords_and_arrays() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("");
        assert_eq!(resolver.resolve(&t_number(), &env).unwrap(), "D");
        assert_eq!(resolver.resolve(&t_int(), &env).unwrap(), "I");
        assert_eq!(resolver.resolve(&t_array(t_string()), &env).unwrap(), "[Ljava/lang/String;");
        assert_eq!(
            resolver.resolve(&t_generic("Array", vec![t_boolean()]), &env).unwrap(),
            "[Z"
        );
        assert_eq!(resolver.resolve(&t_named("Error"), &env).unwrap(), "Ltsjvm/runtime/JsError;");
    }

    #[test]
    fn test_registry_aliases_and_cycles() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("geo");
        assert_eq!(resolver.resolve(&t_named("Coord"), &env).unwrap(), "Lgeo/Point;");
        assert_eq!(resolver.resolve(&t_named("Loop"), &env).unwrap(), OBJECT);
        assert_eq!(resolver.resolve(&t_named("Nowhere"), &env).unwrap(), OBJECT);
    }

    #[test]
    fn test_nullable_union_boxes() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("");
        let nullable = t_union(vec![t_number(), t_null()]);
        assert_eq!(resolver.resolve(&nullable, &env).unwrap(), "Ljava/lang/Double;");
        let mixed = t_union(vec![t_number(), t_string()]);
        assert_eq!(resolver.resolve(&mixed, &env).unwrap(), OBJECT);
    }

    #[test]
    fn test_generic_erasure() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let mut env = DeclEnv::new("");
        env.generics.insert("T".into(), STRING.into());
        assert_eq!(resolver.resolve(&t_named("T"), &env).unwrap(), STRING);
        assert_eq!(resolver.resolve(&t_array(t_named("T")), &env).unwrap(), "[Ljava/lang/String;");
    }

    #[test]
    fn test_function_types() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("");
        let ty = t_fn(vec![("a", t_int()), ("b", t_int())], t_int());
        assert_eq!(
            resolver.resolve(&ty, &env).unwrap(),
            "Ljava/util/function/IntBinaryOperator;"
        );
        let bad = t_fn(vec![("a", t_int()), ("b", t_number())], t_int());
        assert!(resolver.resolve(&bad, &env).is_err());
    }

    #[test]
    fn test_generic_info() {
        let registry = registry();
        let aliases = default_type_aliases();
        let resolver = TypeResolver::new(&registry, &aliases);
        let env = DeclEnv::new("");
        let nested = t_generic(
            "Record",
            vec![t_string(), t_generic("Record", vec![t_string(), t_int()])],
        );
        let info = resolver.generic_info(&nested, &env).unwrap().unwrap();
        assert_eq!(info.key, STRING);
        assert_eq!(info.value, LINKED_HASH_MAP);
        assert_eq!(info.nested.as_ref().unwrap().value, "I");

        let via_alias = resolver.generic_info(&t_named("Scores"), &env).unwrap().unwrap();
        assert_eq!(via_alias.value, "D");
        assert!(resolver.generic_info(&t_string(), &env).unwrap().is_none());
    }
}
