//! Expressions
//!
//! Every `compile_*` method leaves the expression's value on the operand
//! stack and returns its descriptor (`V` when nothing was pushed). Callers
//! that need a particular type go through [`MethodGen::compile_expr_as`],
//! which converts with [`MethodGen::coerce`].

use super::MethodGen;
use crate::error::{CompileError, CompileResult};
use crate::types::infer::{literal_descriptor, widen};
use crate::types::*;
use tsjvm_ast::{
    ArrayLit, BinExpr, BinaryOp, CondExpr, Expr, Lit, MemberExpr, ObjectLit, TplExpr, UnaryExpr,
    UnaryOp,
};
use tsjvm_classfile::Opcode;

impl MethodGen<'_, '_> {
    pub fn compile_expr(&mut self, expr: &Expr) -> CompileResult<String> {
        match expr {
            Expr::Lit(lit) => Ok(self.compile_lit(lit)),
            Expr::Ident(id) => self.compile_ident(&id.name),
            Expr::This(_) => self.compile_this(),
            Expr::Super(_) => Err(CompileError::unsupported("'super' as a value")),
            Expr::Array(a) => self.compile_array(a),
            Expr::Object(o) => self.compile_object(o),
            Expr::Unary(u) => self.compile_unary(expr, u),
            Expr::Update(u) => self.compile_update(u, true),
            Expr::Bin(b) => self.compile_binary(expr, b),
            Expr::Assign(a) => self.compile_assign(a, true),
            Expr::Cond(c) => self.compile_cond(expr, c),
            Expr::Call(c) => self.compile_call(c),
            Expr::New(n) => self.compile_new(n),
            Expr::Member(m) => self.compile_member(m),
            Expr::Arrow(a) => self.compile_arrow(a),
            Expr::Paren(p) => self.compile_expr(&p.expr),
            Expr::As(a) => {
                let resolver = self.ctx.resolver;
                let target = resolver.resolve(&a.type_ann, &self.ctx)?;
                let actual = self.compile_expr(&a.expr)?;
                self.coerce(&actual, &target)?;
                Ok(target)
            }
            Expr::Tpl(t) => self.compile_template(t),
        }
    }

    /// Compile and convert to `target`; literals are pushed in the target type directly
    pub fn compile_expr_as(&mut self, expr: &Expr, target: &str) -> CompileResult<()> {
        match expr.unparen() {
            Expr::Lit(Lit::Num(n)) if is_numeric(target) => {
                self.push_number(n.value, computational(target));
                Ok(())
            }
            Expr::Array(array) if is_array(target) => {
                let element = array_element(target).unwrap_or(OBJECT);
                self.compile_array_of(array, element)
            }
            Expr::Lit(Lit::Null(_)) => {
                if is_primitive(target) {
                    self.push_default(target);
                } else if target != "V" {
                    self.emit(Opcode::AconstNull);
                }
                Ok(())
            }
            _ => {
                let actual = self.compile_expr(expr)?;
                self.coerce(&actual, target)
            }
        }
    }

    /// Evaluate for side effects only
    pub fn compile_discard(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr.unparen() {
            Expr::Assign(a) => {
                let desc = self.compile_assign(a, false)?;
                self.pop(&desc);
                Ok(())
            }
            Expr::Update(u) => {
                let desc = self.compile_update(u, false)?;
                self.pop(&desc);
                Ok(())
            }
            other => {
                let desc = self.compile_expr(other)?;
                self.pop(&desc);
                Ok(())
            }
        }
    }

    /// Push a numeric constant as `I`, `J`, `F` or `D`
    pub fn push_number(&mut self, value: f64, kind: &str) {
        match kind {
            "J" => self.push_long(value as i64),
            "F" => self.push_float(value as f32),
            "D" => self.push_double(value),
            _ => self.push_int(value as i32),
        }
    }

    fn compile_lit(&mut self, lit: &Lit) -> String {
        match lit {
            Lit::Str(s) => {
                self.push_string(&s.value);
                STRING.to_string()
            }
            Lit::Num(n) => {
                let desc = literal_descriptor(n);
                self.push_number(n.value, desc);
                desc.to_string()
            }
            Lit::Bool(b) => {
                self.emit(if b.value {
                    Opcode::Iconst1
                } else {
                    Opcode::Iconst0
                });
                "Z".to_string()
            }
            Lit::Null(_) => {
                self.emit(Opcode::AconstNull);
                OBJECT.to_string()
            }
        }
    }

    fn compile_ident(&mut self, name: &str) -> CompileResult<String> {
        if let Some(var) = self.ctx.locals.lookup(name) {
            let (desc, slot, boxed) = (var.descriptor.clone(), var.slot, var.boxed);
            if boxed {
                self.load(OBJECT, slot);
                self.emit(Opcode::Iconst0);
                self.array_load(&desc);
            } else {
                self.load(&desc, slot);
            }
            return Ok(desc);
        }
        if let Some((container, field)) = self.registry.lookup_global(name, &self.ctx.namespace) {
            let (owner, desc) = (container.internal_name.clone(), field.descriptor.clone());
            self.get_static(&owner, name, &desc);
            return Ok(desc);
        }
        match name {
            "undefined" => {
                self.emit(Opcode::AconstNull);
                Ok(OBJECT.to_string())
            }
            "NaN" => {
                self.push_double(f64::NAN);
                Ok("D".to_string())
            }
            "Infinity" => {
                self.push_double(f64::INFINITY);
                Ok("D".to_string())
            }
            _ => Err(CompileError::UndefinedVariable { name: name.to_string() }),
        }
    }

    pub fn compile_this(&mut self) -> CompileResult<String> {
        let slot = self
            .ctx
            .this_slot
            .ok_or_else(|| CompileError::unsupported("'this' outside of a class"))?;
        let desc = self.this_descriptor().unwrap_or_else(|| OBJECT.to_string());
        self.load(OBJECT, slot);
        Ok(desc)
    }

    fn compile_array(&mut self, array: &ArrayLit) -> CompileResult<String> {
        let elems: Vec<String> = array.elems.iter().map(|e| self.infer_or_object(e)).collect();
        let element = widest(elems.iter().map(String::as_str));
        self.compile_array_of(array, &element)?;
        Ok(format!("[{}", element))
    }

    /// Array literal allocated with a known element type
    fn compile_array_of(&mut self, array: &ArrayLit, element: &str) -> CompileResult<()> {
        self.push_int(array.elems.len() as i32);
        self.new_array(element);
        for (i, elem) in array.elems.iter().enumerate() {
            self.emit(Opcode::Dup);
            self.push_int(i as i32);
            self.compile_expr_as(elem, element)?;
            self.array_store(element);
        }
        Ok(())
    }

    fn compile_object(&mut self, object: &ObjectLit) -> CompileResult<String> {
        self.new_default(MAP_CLASS);
        for prop in &object.props {
            self.emit(Opcode::Dup);
            self.push_string(prop.key.as_str());
            self.compile_expr_as(&prop.value, OBJECT)?;
            self.invoke_virtual(
                MAP_CLASS,
                "put",
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
            );
            self.emit(Opcode::Pop);
        }
        Ok(LINKED_HASH_MAP.to_string())
    }

    fn compile_unary(&mut self, whole: &Expr, unary: &UnaryExpr) -> CompileResult<String> {
        match unary.op {
            UnaryOp::Not => {
                self.materialize_bool(whole)?;
                Ok("Z".to_string())
            }
            UnaryOp::Minus | UnaryOp::Plus => {
                let arg = self.infer_or_object(&unary.arg);
                let prim = unboxed(&arg).unwrap_or(&arg);
                let kind = if is_numeric(prim) {
                    computational(prim)
                } else {
                    "D"
                };
                self.compile_expr_as(&unary.arg, kind)?;
                if unary.op == UnaryOp::Minus {
                    self.emit(match kind {
                        "J" => Opcode::Lneg,
                        "F" => Opcode::Fneg,
                        "D" => Opcode::Dneg,
                        _ => Opcode::Ineg,
                    });
                }
                Ok(kind.to_string())
            }
            UnaryOp::BitNot => {
                let arg = self.infer_or_object(&unary.arg);
                if unboxed(&arg).unwrap_or(&arg) == "J" {
                    self.compile_expr_as(&unary.arg, "J")?;
                    self.push_long(-1);
                    self.emit(Opcode::Lxor);
                    Ok("J".to_string())
                } else {
                    self.compile_expr_as(&unary.arg, "I")?;
                    self.emit(Opcode::IconstM1);
                    self.emit(Opcode::Ixor);
                    Ok("I".to_string())
                }
            }
            UnaryOp::TypeOf => {
                let arg = self.infer_or_object(&unary.arg);
                self.compile_discard(&unary.arg)?;
                self.push_string(type_of(&arg));
                Ok(STRING.to_string())
            }
            UnaryOp::Void => {
                self.compile_discard(&unary.arg)?;
                self.emit(Opcode::AconstNull);
                Ok(OBJECT.to_string())
            }
        }
    }

    fn compile_binary(&mut self, whole: &Expr, bin: &BinExpr) -> CompileResult<String> {
        if bin.op.is_comparison() {
            self.materialize_bool(whole)?;
            return Ok("Z".to_string());
        }
        let left = self.infer_or_object(&bin.left);
        let right = self.infer_or_object(&bin.right);
        match bin.op {
            BinaryOp::Add if left == STRING || right == STRING => self.compile_concat(whole),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                if left == "Z" && right == "Z" {
                    self.materialize_bool(whole)?;
                    return Ok("Z".to_string());
                }
                self.compile_logical_value(bin, &widen(&left, &right))
            }
            op if op.is_shift() => {
                let kind = integral_kind(&left);
                self.compile_expr_as(&bin.left, kind)?;
                self.compile_expr_as(&bin.right, "I")?;
                self.emit(arithmetic_op(op, kind)?);
                Ok(kind.to_string())
            }
            op if op.is_bitwise() => {
                let kind = if left == "Z" && right == "Z" {
                    "Z"
                } else if promote(&left, &right) == "J" {
                    "J"
                } else {
                    "I"
                };
                self.compile_expr_as(&bin.left, kind)?;
                self.compile_expr_as(&bin.right, kind)?;
                self.emit(arithmetic_op(op, computational(kind))?);
                Ok(kind.to_string())
            }
            op => {
                let kind = promote(&left, &right);
                self.compile_expr_as(&bin.left, kind)?;
                self.compile_expr_as(&bin.right, kind)?;
                self.emit(arithmetic_op(op, kind)?);
                Ok(kind.to_string())
            }
        }
    }

    /// `a + b + c` with at least one string operand, through a `StringBuilder`
    fn compile_concat(&mut self, whole: &Expr) -> CompileResult<String> {
        let mut operands = Vec::new();
        self.flatten_concat(whole, &mut operands);
        self.new_default(BUILDER_CLASS);
        for operand in operands {
            let desc = self.compile_expr(operand)?;
            if desc == "V" {
                self.emit(Opcode::AconstNull);
            }
            self.invoke_virtual(BUILDER_CLASS, "append", append_descriptor(&desc));
        }
        self.invoke_virtual(BUILDER_CLASS, "toString", "()Ljava/lang/String;");
        Ok(STRING.to_string())
    }

    /// `` `a${x}b` `` through the same `StringBuilder` chain as string `+`
    fn compile_template(&mut self, tpl: &TplExpr) -> CompileResult<String> {
        if tpl.quasis.len() != tpl.exprs.len() + 1 {
            return Err(CompileError::internal("template literal with mismatched quasis"));
        }
        if tpl.exprs.is_empty() {
            self.push_string(&tpl.quasis[0]);
            return Ok(STRING.to_string());
        }
        self.new_default(BUILDER_CLASS);
        for (i, quasi) in tpl.quasis.iter().enumerate() {
            if !quasi.is_empty() {
                self.push_string(quasi);
                self.invoke_virtual(BUILDER_CLASS, "append", append_descriptor(STRING));
            }
            let Some(expr) = tpl.exprs.get(i) else { continue };
            let desc = self.compile_expr(expr)?;
            if desc == "V" {
                self.emit(Opcode::AconstNull);
            }
            self.invoke_virtual(BUILDER_CLASS, "append", append_descriptor(&desc));
        }
        self.invoke_virtual(BUILDER_CLASS, "toString", "()Ljava/lang/String;");
        Ok(STRING.to_string())
    }

    /// Left-nested string additions become one operand list; `1 + 2 + "x"` keeps `1 + 2` whole
    fn flatten_concat<'e>(&self, expr: &'e Expr, out: &mut Vec<&'e Expr>) {
        if let Expr::Bin(b) = expr {
            if b.op == BinaryOp::Add && self.infer(expr).as_deref() == Some(STRING) {
                self.flatten_concat(&b.left, out);
                out.push(&b.right);
                return;
            }
        }
        out.push(expr);
    }

    /// `a || b` / `a && b` producing one of the operands
    fn compile_logical_value(&mut self, bin: &BinExpr, kind: &str) -> CompileResult<String> {
        let temp = self.ctx.locals.allocate_temp(kind)?;
        self.compile_expr_as(&bin.left, kind)?;
        self.store(kind, temp);
        self.load(kind, temp);
        // `||` keeps a truthy left side, `&&` a falsy one
        let keep_left = self.truthy_jumps(kind, bin.op == BinaryOp::LogicalOr)?;
        self.compile_expr_as(&bin.right, kind)?;
        let end = self.goto_forward();
        self.patch_here(&keep_left)?;
        self.load(kind, temp);
        self.patch_here(&[end])?;
        Ok(kind.to_string())
    }

    fn compile_cond(&mut self, whole: &Expr, cond: &CondExpr) -> CompileResult<String> {
        let kind = self.infer_or_object(whole);
        let to_alt = self.branch_if(&cond.test, false)?;
        self.compile_expr_as(&cond.cons, &kind)?;
        let end = self.goto_forward();
        self.patch_here(&to_alt)?;
        self.compile_expr_as(&cond.alt, &kind)?;
        self.patch_here(&[end])?;
        Ok(kind)
    }

    fn compile_member(&mut self, member: &MemberExpr) -> CompileResult<String> {
        let resolver = self.ctx.resolver;
        let Some(target) = resolver.resolve_member(member, &self.ctx) else {
            return Err(self.unknown_member(member));
        };
        self.read_member(member, &target)?;
        Ok(target.descriptor())
    }

    /// Error for a property that resolves to nothing
    pub fn unknown_member(&self, member: &MemberExpr) -> CompileError {
        let owner = match self.infer(&member.obj) {
            Some(desc) => class_name(&desc).to_string(),
            None => {
                if let Some(name) = member.obj.unparen().as_ident() {
                    if self.ctx.locals.lookup(name).is_none() {
                        return CompileError::UndefinedVariable { name: name.to_string() };
                    }
                }
                OBJECT_CLASS.to_string()
            }
        };
        CompileError::UnknownField {
            owner,
            name: member.prop_name().unwrap_or("[]").to_string(),
        }
    }

    /// Push the receiver (and index) of an instance member, if it has one
    pub fn compile_member_object(
        &mut self,
        member: &MemberExpr,
        target: &MemberTarget,
    ) -> CompileResult<()> {
        match target {
            MemberTarget::EnumConstant { .. } | MemberTarget::StaticField { .. } => Ok(()),
            _ => {
                let actual = self.compile_expr(&member.obj)?;
                let expected = match target {
                    MemberTarget::Field { owner, .. }
                    | MemberTarget::Getter { owner, .. }
                    | MemberTarget::ErrorMessage { owner } => object_of(owner),
                    MemberTarget::StringLength | MemberTarget::StringChar => STRING.to_string(),
                    MemberTarget::MapEntry { .. } | MemberTarget::MapSize => {
                        LINKED_HASH_MAP.to_string()
                    }
                    MemberTarget::ArrayLength | MemberTarget::ArrayElement { .. } => actual.clone(),
                    MemberTarget::EnumConstant { .. } | MemberTarget::StaticField { .. } => {
                        OBJECT.to_string()
                    }
                };
                self.coerce(&actual, &expected)?;
                if let tsjvm_ast::MemberProp::Computed(index) = &member.prop {
                    match target {
                        MemberTarget::ArrayElement { .. } | MemberTarget::StringChar => {
                            self.compile_expr_as(index, "I")?
                        }
                        _ => self.compile_expr_as(index, OBJECT)?,
                    }
                } else if let MemberTarget::MapEntry { .. } = target {
                    self.push_string(member.prop_name().unwrap_or_default());
                }
                Ok(())
            }
        }
    }

    /// Read a resolved member
    fn read_member(&mut self, member: &MemberExpr, target: &MemberTarget) -> CompileResult<()> {
        self.compile_member_object(member, target)?;
        match target {
            MemberTarget::EnumConstant {
                owner,
                field,
                descriptor,
            } => self.get_static(owner, field, descriptor),
            MemberTarget::StaticField {
                owner,
                name,
                descriptor,
            } => self.get_static(owner, name, descriptor),
            MemberTarget::Field {
                owner,
                name,
                descriptor,
            } => self.get_field(owner, name, descriptor),
            MemberTarget::Getter {
                owner,
                name,
                descriptor,
                interface,
            } => {
                if *interface {
                    self.invoke_interface(owner, name, descriptor);
                } else {
                    self.invoke_virtual(owner, name, descriptor);
                }
            }
            MemberTarget::ArrayLength => self.emit(Opcode::Arraylength),
            MemberTarget::StringLength => self.invoke_virtual(STRING_CLASS, "length", "()I"),
            MemberTarget::ErrorMessage { owner } => {
                self.invoke_virtual(owner, "getMessage", "()Ljava/lang/String;")
            }
            MemberTarget::MapEntry { value } => {
                self.invoke_virtual(MAP_CLASS, "get", "(Ljava/lang/Object;)Ljava/lang/Object;");
                self.coerce(OBJECT, value)?;
            }
            MemberTarget::MapSize => self.invoke_virtual(MAP_CLASS, "size", "()I"),
            MemberTarget::ArrayElement { element } => self.array_load(element),
            MemberTarget::StringChar => {
                self.invoke_virtual(STRING_CLASS, "charAt", "(I)C");
                self.invoke_static(STRING_CLASS, "valueOf", "(C)Ljava/lang/String;");
            }
        }
        Ok(())
    }

    // ===== Conversions =====

    /// Convert the value on top of the stack from one descriptor to another
    pub fn coerce(&mut self, from: &str, to: &str) -> CompileResult<()> {
        if from == to {
            return Ok(());
        }
        if to == "V" {
            self.pop(from);
            return Ok(());
        }
        if from == "V" {
            self.push_default(to);
            return Ok(());
        }
        match (is_primitive(from), is_primitive(to)) {
            (true, true) => {
                self.convert_primitive(from, to);
                Ok(())
            }
            (true, false) => self.box_value(from, to),
            (false, true) => self.unbox_value(from, to),
            (false, false) => {
                if !self.is_assignable(from, to) {
                    self.checkcast(to);
                }
                Ok(())
            }
        }
    }

    fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to || to == OBJECT {
            return true;
        }
        let (sub, sup) = (class_name(from), class_name(to));
        if self.registry.is_assignable(sub, sup) {
            return true;
        }
        if to == THROWABLE && self.registry.is_throwable(sub) {
            return true;
        }
        to == "Ljava/lang/Number;" && unboxed(from).is_some_and(|p| p != "Z" && p != "C")
    }

    fn convert_primitive(&mut self, from: &str, to: &str) {
        let op = match (computational(from), computational(to)) {
            ("I", "J") => Some(Opcode::I2l),
            ("I", "F") => Some(Opcode::I2f),
            ("I", "D") => Some(Opcode::I2d),
            ("J", "I") => Some(Opcode::L2i),
            ("J", "F") => Some(Opcode::L2f),
            ("J", "D") => Some(Opcode::L2d),
            ("F", "I") => Some(Opcode::F2i),
            ("F", "J") => Some(Opcode::F2l),
            ("F", "D") => Some(Opcode::F2d),
            ("D", "I") => Some(Opcode::D2i),
            ("D", "J") => Some(Opcode::D2l),
            ("D", "F") => Some(Opcode::D2f),
            _ => None,
        };
        if let Some(op) = op {
            self.emit(op);
        }
        match to {
            "B" => self.emit(Opcode::I2b),
            "C" => self.emit(Opcode::I2c),
            "S" => self.emit(Opcode::I2s),
            _ => {}
        }
    }

    fn box_value(&mut self, from: &str, to: &str) -> CompileResult<()> {
        if let Some(prim) = unboxed(to) {
            self.convert_primitive(from, prim);
            self.emit_box(prim);
            return Ok(());
        }
        if to == STRING {
            self.invoke_static(STRING_CLASS, "valueOf", value_of_descriptor(from));
            return Ok(());
        }
        self.emit_box(from);
        let boxed_desc = boxed(from);
        self.coerce(&boxed_desc, to)
    }

    fn emit_box(&mut self, prim: &str) {
        if let Some(class) = box_class(prim) {
            self.invoke_static(class, "valueOf", &format!("({}){}", prim, object_of(class)));
        }
    }

    fn unbox_value(&mut self, from: &str, to: &str) -> CompileResult<()> {
        if let Some(prim) = unboxed(from) {
            if let Some((name, desc)) = unbox_method(prim) {
                self.invoke_virtual(class_name(from), name, desc);
            }
            self.convert_primitive(prim, to);
            return Ok(());
        }
        if to == "Z" {
            self.checkcast("Ljava/lang/Boolean;");
            self.invoke_virtual("java/lang/Boolean", "booleanValue", "()Z");
            return Ok(());
        }
        if !is_numeric(to) || is_array(from) || from == STRING {
            return Err(CompileError::TypeMismatch {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let kind = computational(to);
        if from != "Ljava/lang/Number;" {
            self.checkcast("Ljava/lang/Number;");
        }
        if let Some((name, desc)) = unbox_method(kind) {
            self.invoke_virtual("java/lang/Number", name, desc);
        }
        self.convert_primitive(kind, to);
        Ok(())
    }
}

/// `typeof` result for a static type
fn type_of(desc: &str) -> &'static str {
    let prim = unboxed(desc).unwrap_or(desc);
    match prim {
        "Z" => "boolean",
        p if is_numeric(p) => "number",
        STRING => "string",
        d if crate::functional::by_descriptor(d).is_some() => "function",
        _ => "object",
    }
}

/// Arithmetic, bitwise or shift instruction for a computational type
pub(super) fn arithmetic_op(op: BinaryOp, kind: &str) -> CompileResult<Opcode> {
    use BinaryOp::*;
    let pick = |i, l, f, d| match kind {
        "J" => l,
        "F" => f,
        "D" => d,
        _ => i,
    };
    Ok(match op {
        Add => pick(Opcode::Iadd, Opcode::Ladd, Opcode::Fadd, Opcode::Dadd),
        Sub => pick(Opcode::Isub, Opcode::Lsub, Opcode::Fsub, Opcode::Dsub),
        Mul => pick(Opcode::Imul, Opcode::Lmul, Opcode::Fmul, Opcode::Dmul),
        Div => pick(Opcode::Idiv, Opcode::Ldiv, Opcode::Fdiv, Opcode::Ddiv),
        Mod => pick(Opcode::Irem, Opcode::Lrem, Opcode::Frem, Opcode::Drem),
        BitAnd | BitOr | BitXor | LShift | RShift | ZeroFillRShift if matches!(kind, "F" | "D") => {
            return Err(CompileError::TypeMismatch {
                from: kind.to_string(),
                to: "I".to_string(),
            })
        }
        BitAnd => pick(Opcode::Iand, Opcode::Land, Opcode::Iand, Opcode::Iand),
        BitOr => pick(Opcode::Ior, Opcode::Lor, Opcode::Ior, Opcode::Ior),
        BitXor => pick(Opcode::Ixor, Opcode::Lxor, Opcode::Ixor, Opcode::Ixor),
        LShift => pick(Opcode::Ishl, Opcode::Lshl, Opcode::Ishl, Opcode::Ishl),
        RShift => pick(Opcode::Ishr, Opcode::Lshr, Opcode::Ishr, Opcode::Ishr),
        ZeroFillRShift => pick(Opcode::Iushr, Opcode::Lushr, Opcode::Iushr, Opcode::Iushr),
        other => {
            return Err(CompileError::internal(format!(
                "'{}' is not arithmetic",
                other.as_str()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_ops() {
        assert_eq!(arithmetic_op(BinaryOp::Add, "I").unwrap(), Opcode::Iadd);
        assert_eq!(arithmetic_op(BinaryOp::Mod, "D").unwrap(), Opcode::Drem);
        assert_eq!(arithmetic_op(BinaryOp::ZeroFillRShift, "J").unwrap(), Opcode::Lushr);
        assert!(arithmetic_op(BinaryOp::BitAnd, "D").is_err());
        assert!(arithmetic_op(BinaryOp::Lt, "I").is_err());
    }

    #[test]
    fn test_type_of() {
        assert_eq!(type_of("I"), "number");
        assert_eq!(type_of("Ljava/lang/Double;"), "number");
        assert_eq!(type_of("Z"), "boolean");
        assert_eq!(type_of(STRING), "string");
        assert_eq!(type_of("Ljava/util/function/IntUnaryOperator;"), "function");
        assert_eq!(type_of(LINKED_HASH_MAP), "object");
    }
}
