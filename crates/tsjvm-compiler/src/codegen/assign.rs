//! Assignment and update expressions

use super::expr::arithmetic_op;
use super::MethodGen;
use crate::error::{CompileError, CompileResult};
use crate::types::*;
use tsjvm_ast::{AssignExpr, BinaryOp, Expr, MemberExpr, UpdateExpr, UpdateOp};
use tsjvm_classfile::Opcode;

/// Storage location written by an assignment
#[derive(Debug, Clone, PartialEq)]
enum Place {
    Local { slot: u16, desc: String },
    /// Element 0 of a holder array
    Holder { slot: u16, desc: String },
    Static { owner: String, name: String, desc: String },
    Field { owner: String, name: String, desc: String },
    /// Interface-style property written through `setX`
    Setter {
        getter: (String, String, String),
        owner: String,
        name: String,
        desc: String,
        interface: bool,
    },
    ArrayElement { element: String },
    MapEntry { value: String },
}

impl Place {
    /// Type of the value stored
    fn descriptor(&self) -> &str {
        match self {
            Place::Local { desc, .. }
            | Place::Holder { desc, .. }
            | Place::Static { desc, .. }
            | Place::Field { desc, .. }
            | Place::Setter { desc, .. } => desc,
            Place::ArrayElement { element } => element,
            Place::MapEntry { value } => value,
        }
    }

    /// Stack words pushed by `prepare_place` below the value
    fn operands(&self) -> u8 {
        match self {
            Place::Local { .. } | Place::Static { .. } => 0,
            Place::Field { .. } | Place::Setter { .. } => 1,
            Place::Holder { .. } | Place::ArrayElement { .. } | Place::MapEntry { .. } => 2,
        }
    }
}

impl MethodGen<'_, '_> {
    /// `left = right` and compound forms; returns the value's descriptor when `keep`
    pub fn compile_assign(&mut self, assign: &AssignExpr, keep: bool) -> CompileResult<String> {
        let place = self.prepare_place(&assign.left)?;
        let target = place.descriptor().to_string();
        match assign.op.to_binary() {
            None => self.compile_expr_as(&assign.right, &target)?,
            Some(op) => {
                self.dup_operands(&place);
                self.load_place(&place)?;
                self.compile_compound(op, &target, &assign.right)?;
            }
        }
        if keep {
            self.dup_below(&target, place.operands());
        }
        self.store_place(&place)?;
        Ok(if keep { target } else { "V".to_string() })
    }

    /// Apply `op` to the loaded place value and `right`, leaving a value of the place's type
    fn compile_compound(&mut self, op: BinaryOp, target: &str, right: &Expr) -> CompileResult<()> {
        if op == BinaryOp::Add && target == STRING {
            let desc = self.compile_expr(right)?;
            if desc != STRING {
                self.invoke_static(STRING_CLASS, "valueOf", value_of_descriptor(&desc));
            }
            self.invoke_virtual(STRING_CLASS, "concat", "(Ljava/lang/String;)Ljava/lang/String;");
            return Ok(());
        }
        let value = unboxed(target).unwrap_or(target);
        let kind = if op.is_shift() || op.is_bitwise() {
            if value == "J" {
                "J"
            } else {
                "I"
            }
        } else {
            let right_desc = self.infer_or_object(right);
            promote(value, &right_desc)
        };
        self.coerce(target, kind)?;
        self.compile_expr_as(right, if op.is_shift() { "I" } else { kind })?;
        self.emit(arithmetic_op(op, kind)?);
        self.coerce(kind, target)
    }

    /// `++x`, `x--` and friends
    pub fn compile_update(&mut self, update: &UpdateExpr, keep: bool) -> CompileResult<String> {
        let delta: i16 = if update.op == UpdateOp::Incr { 1 } else { -1 };
        if let Some(name) = update.arg.unparen().as_ident() {
            if let Some(var) = self.ctx.locals.lookup(name) {
                if var.descriptor == "I" && !var.boxed {
                    if !var.mutable {
                        return Err(CompileError::AssignToConst { name: name.to_string() });
                    }
                    let slot = var.slot;
                    if keep && !update.prefix {
                        self.load("I", slot);
                    }
                    self.code.iinc(slot, delta);
                    if keep && update.prefix {
                        self.load("I", slot);
                    }
                    return Ok(if keep { "I" } else { "V" }.to_string());
                }
            }
        }

        let place = self.prepare_place(&update.arg)?;
        let target = place.descriptor().to_string();
        let value = unboxed(&target).unwrap_or(&target);
        let kind = if is_numeric(value) {
            computational(value)
        } else {
            "D"
        };
        self.dup_operands(&place);
        self.load_place(&place)?;
        self.coerce(&target, kind)?;
        if keep && !update.prefix {
            self.dup_below(kind, place.operands());
        }
        self.push_number(1.0, kind);
        let op = if delta > 0 {
            BinaryOp::Add
        } else {
            BinaryOp::Sub
        };
        self.emit(arithmetic_op(op, kind)?);
        if keep && update.prefix {
            self.dup_below(kind, place.operands());
        }
        self.coerce(kind, &target)?;
        self.store_place(&place)?;
        Ok(if keep { kind } else { "V" }.to_string())
    }

    /// Store the value on the stack into an existing variable
    pub fn store_to_variable(&mut self, name: &str, desc: &str) -> CompileResult<()> {
        let temp = self.ctx.locals.allocate_temp(desc)?;
        self.store(desc, temp);
        let place = self.prepare_variable(name)?;
        self.load(desc, temp);
        self.coerce(desc, place.descriptor())?;
        self.store_place(&place)
    }

    /// Resolve an assignment target and push its receiver and index
    fn prepare_place(&mut self, target: &Expr) -> CompileResult<Place> {
        match target.unparen() {
            Expr::Ident(id) => self.prepare_variable(&id.name),
            Expr::Member(member) => self.prepare_member(member),
            other => Err(CompileError::unsupported(format!(
                "assignment to {}",
                other.kind_name()
            ))),
        }
    }

    fn prepare_variable(&mut self, name: &str) -> CompileResult<Place> {
        if let Some(var) = self.ctx.locals.lookup(name) {
            if !var.mutable {
                return Err(CompileError::AssignToConst { name: name.to_string() });
            }
            let (slot, desc) = (var.slot, var.descriptor.clone());
            if var.boxed {
                self.load(OBJECT, slot);
                self.emit(Opcode::Iconst0);
                return Ok(Place::Holder { slot, desc });
            }
            return Ok(Place::Local { slot, desc });
        }
        if let Some((container, field)) = self.registry.lookup_global(name, &self.ctx.namespace) {
            if field.readonly {
                return Err(CompileError::AssignToConst { name: name.to_string() });
            }
            return Ok(Place::Static {
                owner: container.internal_name.clone(),
                name: field.name.clone(),
                desc: field.descriptor.clone(),
            });
        }
        Err(CompileError::UndefinedVariable { name: name.to_string() })
    }

    fn prepare_member(&mut self, member: &MemberExpr) -> CompileResult<Place> {
        let resolver = self.ctx.resolver;
        let Some(target) = resolver.resolve_member(member, &self.ctx) else {
            return Err(self.unknown_member(member));
        };
        let place = match &target {
            MemberTarget::StaticField { owner, name, descriptor } => Place::Static {
                owner: owner.clone(),
                name: name.clone(),
                desc: descriptor.clone(),
            },
            MemberTarget::Field { owner, name, descriptor } => Place::Field {
                owner: owner.clone(),
                name: name.clone(),
                desc: descriptor.clone(),
            },
            MemberTarget::Getter {
                owner,
                name,
                descriptor,
                ..
            } => self.setter_place(member, owner, name, descriptor)?,
            MemberTarget::ArrayElement { element } => Place::ArrayElement {
                element: element.clone(),
            },
            MemberTarget::MapEntry { value } => Place::MapEntry { value: value.clone() },
            MemberTarget::EnumConstant { field, .. } => {
                return Err(CompileError::AssignToConst { name: field.clone() })
            }
            MemberTarget::ArrayLength
            | MemberTarget::StringLength
            | MemberTarget::ErrorMessage { .. }
            | MemberTarget::MapSize
            | MemberTarget::StringChar => {
                return Err(CompileError::unsupported(format!(
                    "assignment to '{}'",
                    member.prop_name().unwrap_or("[]")
                )))
            }
        };
        self.compile_member_object(member, &target)?;
        Ok(place)
    }

    fn setter_place(
        &self,
        member: &MemberExpr,
        owner: &str,
        getter: &str,
        getter_desc: &str,
    ) -> CompileResult<Place> {
        let prop = member.prop_name().unwrap_or_default();
        let info = self.registry.by_internal(owner).ok_or_else(|| CompileError::UnknownField {
            owner: owner.to_string(),
            name: prop.to_string(),
        })?;
        let (setter_owner, setter) = self
            .registry
            .find_method(&info.qualified_name, &setter_name(prop), 1)
            .filter(|(_, m)| !m.is_static)
            .ok_or_else(|| CompileError::AssignToConst { name: prop.to_string() })?;
        let desc = setter
            .param_descriptors()
            .into_iter()
            .next()
            .ok_or_else(|| {
                CompileError::internal(format!("setter {} takes no value", setter.name))
            })?;
        Ok(Place::Setter {
            getter: (owner.to_string(), getter.to_string(), getter_desc.to_string()),
            owner: setter_owner.internal_name.clone(),
            name: setter.name.clone(),
            desc,
            interface: setter_owner.is_interface(),
        })
    }

    /// Duplicate the receiver/index so the place can be read and then written
    fn dup_operands(&mut self, place: &Place) {
        match place.operands() {
            0 => {}
            1 => self.emit(Opcode::Dup),
            _ => self.emit(Opcode::Dup2),
        }
    }

    /// Read the place, consuming one copy of its operands
    fn load_place(&mut self, place: &Place) -> CompileResult<()> {
        match place {
            Place::Local { slot, desc } => self.load(desc, *slot),
            Place::Holder { desc, .. } => self.array_load(desc),
            Place::Static { owner, name, desc } => self.get_static(owner, name, desc),
            Place::Field { owner, name, desc } => self.get_field(owner, name, desc),
            Place::Setter {
                getter: (owner, name, desc),
                interface,
                ..
            } => {
                if *interface {
                    self.invoke_interface(owner, name, desc);
                } else {
                    self.invoke_virtual(owner, name, desc);
                }
            }
            Place::ArrayElement { element } => self.array_load(element),
            Place::MapEntry { value } => {
                self.invoke_virtual(MAP_CLASS, "get", "(Ljava/lang/Object;)Ljava/lang/Object;");
                self.coerce(OBJECT, value)?;
            }
        }
        Ok(())
    }

    /// Copy the value on top of the stack below `operands` stack words
    fn dup_below(&mut self, desc: &str, operands: u8) {
        let wide = is_wide(desc);
        self.emit(match (operands, wide) {
            (0, false) => Opcode::Dup,
            (0, true) => Opcode::Dup2,
            (1, false) => Opcode::DupX1,
            (1, true) => Opcode::Dup2X1,
            (_, false) => Opcode::DupX2,
            (_, true) => Opcode::Dup2X2,
        });
    }

    fn store_place(&mut self, place: &Place) -> CompileResult<()> {
        match place {
            Place::Local { slot, desc } => self.store(desc, *slot),
            Place::Holder { desc, .. } => self.array_store(desc),
            Place::Static { owner, name, desc } => self.put_static(owner, name, desc),
            Place::Field { owner, name, desc } => self.put_field(owner, name, desc),
            Place::Setter {
                owner,
                name,
                desc,
                interface,
                ..
            } => {
                let descriptor = format!("({})V", desc);
                if *interface {
                    self.invoke_interface(owner, name, &descriptor);
                } else {
                    self.invoke_virtual(owner, name, &descriptor);
                }
            }
            Place::ArrayElement { element } => self.array_store(element),
            Place::MapEntry { value } => {
                self.coerce(value, OBJECT)?;
                self.invoke_virtual(
                    MAP_CLASS,
                    "put",
                    "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                );
                self.emit(Opcode::Pop);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_operands() {
        let local = Place::Local {
            slot: 1,
            desc: "I".into(),
        };
        assert_eq!(local.operands(), 0);
        assert_eq!(local.descriptor(), "I");
        let field = Place::Field {
            owner: "Point".into(),
            name: "x".into(),
            desc: "D".into(),
        };
        assert_eq!(field.operands(), 1);
        let entry = Place::MapEntry { value: OBJECT.into() };
        assert_eq!(entry.operands(), 2);
        assert_eq!(entry.descriptor(), OBJECT);
    }
}
