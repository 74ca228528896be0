//! Conditions
//!
//! Conditions are compiled as jumps: [`MethodGen::branch_if`] emits code that
//! branches when the condition's truthiness equals `when` and falls through
//! otherwise. The returned offsets are patched by the caller.

use super::MethodGen;
use crate::error::CompileResult;
use crate::types::*;
use tsjvm_ast::{BinExpr, BinaryOp, Expr, Lit, UnaryOp};
use tsjvm_classfile::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cond {
    fn of(op: BinaryOp) -> Option<Self> {
        Some(match op {
            BinaryOp::EqEq | BinaryOp::EqEqEq => Cond::Eq,
            BinaryOp::NotEq | BinaryOp::NotEqEq => Cond::Ne,
            BinaryOp::Lt => Cond::Lt,
            BinaryOp::LtEq => Cond::Le,
            BinaryOp::Gt => Cond::Gt,
            BinaryOp::GtEq => Cond::Ge,
            _ => return None,
        })
    }

    fn negate(self) -> Self {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Le => Cond::Gt,
            Cond::Gt => Cond::Le,
        }
    }

    /// Compare the int on the stack against zero
    fn zero_op(self) -> Opcode {
        match self {
            Cond::Eq => Opcode::Ifeq,
            Cond::Ne => Opcode::Ifne,
            Cond::Lt => Opcode::Iflt,
            Cond::Le => Opcode::Ifle,
            Cond::Gt => Opcode::Ifgt,
            Cond::Ge => Opcode::Ifge,
        }
    }

    fn int_op(self) -> Opcode {
        match self {
            Cond::Eq => Opcode::IfIcmpeq,
            Cond::Ne => Opcode::IfIcmpne,
            Cond::Lt => Opcode::IfIcmplt,
            Cond::Le => Opcode::IfIcmple,
            Cond::Gt => Opcode::IfIcmpgt,
            Cond::Ge => Opcode::IfIcmpge,
        }
    }

    /// `fcmpg`/`dcmpg` for `<`, `<=` so that NaN compares false either way
    fn uses_cmpg(self) -> bool {
        matches!(self, Cond::Lt | Cond::Le)
    }
}

impl MethodGen<'_, '_> {
    /// Branch when `expr` is truthy (`when == true`) or falsy
    pub fn branch_if(&mut self, expr: &Expr, when: bool) -> CompileResult<Vec<usize>> {
        match expr.unparen() {
            Expr::Lit(Lit::Bool(b)) => {
                if b.value == when {
                    Ok(vec![self.goto_forward()])
                } else {
                    Ok(Vec::new())
                }
            }
            Expr::Unary(u) if u.op == UnaryOp::Not => self.branch_if(&u.arg, !when),
            Expr::Bin(b) if b.op == BinaryOp::LogicalAnd => {
                if when {
                    let skip = self.branch_if(&b.left, false)?;
                    let jumps = self.branch_if(&b.right, true)?;
                    self.patch_here(&skip)?;
                    Ok(jumps)
                } else {
                    let mut jumps = self.branch_if(&b.left, false)?;
                    jumps.extend(self.branch_if(&b.right, false)?);
                    Ok(jumps)
                }
            }
            Expr::Bin(b) if b.op == BinaryOp::LogicalOr => {
                if when {
                    let mut jumps = self.branch_if(&b.left, true)?;
                    jumps.extend(self.branch_if(&b.right, true)?);
                    Ok(jumps)
                } else {
                    let skip = self.branch_if(&b.left, true)?;
                    let jumps = self.branch_if(&b.right, false)?;
                    self.patch_here(&skip)?;
                    Ok(jumps)
                }
            }
            Expr::Bin(b) => match Cond::of(b.op) {
                Some(cond) => self.branch_compare(b, cond, when),
                None => {
                    let desc = self.compile_expr(expr)?;
                    self.truthy_jumps(&desc, when)
                }
            },
            other => {
                let desc = self.compile_expr(other)?;
                self.truthy_jumps(&desc, when)
            }
        }
    }

    /// Push `1` or `0` for a condition
    pub fn materialize_bool(&mut self, expr: &Expr) -> CompileResult<()> {
        let falsy = self.branch_if(expr, false)?;
        self.emit(Opcode::Iconst1);
        let end = self.goto_forward();
        self.patch_here(&falsy)?;
        self.emit(Opcode::Iconst0);
        self.patch_here(&[end])
    }

    /// Consume the value on the stack and branch on its truthiness
    pub fn truthy_jumps(&mut self, desc: &str, when: bool) -> CompileResult<Vec<usize>> {
        if desc == "V" {
            return Ok(if when {
                Vec::new()
            } else {
                vec![self.goto_forward()]
            });
        }
        if is_int_like(desc) {
            return Ok(vec![self.code.jump(if when { Opcode::Ifne } else { Opcode::Ifeq })]);
        }
        if is_reference(desc) && desc != STRING && unboxed(desc).is_none() {
            let op = if when {
                Opcode::Ifnonnull
            } else {
                Opcode::Ifnull
            };
            return Ok(vec![self.code.jump(op)]);
        }
        let falsy = self.falsy_jumps(desc)?;
        if when {
            let truthy = self.goto_forward();
            self.patch_here(&falsy)?;
            Ok(vec![truthy])
        } else {
            Ok(falsy)
        }
    }

    /// Branches taken when the value is `0`, `NaN`, `""`, `false` or null
    fn falsy_jumps(&mut self, desc: &str) -> CompileResult<Vec<usize>> {
        match desc {
            "J" => {
                self.emit(Opcode::Lconst0);
                self.emit(Opcode::Lcmp);
                Ok(vec![self.code.jump(Opcode::Ifeq)])
            }
            "F" | "D" => {
                let temp = self.ctx.locals.allocate_temp(desc)?;
                self.store(desc, temp);
                let (zero, cmp) = if desc == "F" {
                    (Opcode::Fconst0, Opcode::Fcmpl)
                } else {
                    (Opcode::Dconst0, Opcode::Dcmpl)
                };
                self.load(desc, temp);
                self.emit(zero);
                self.emit(cmp);
                let is_zero = self.code.jump(Opcode::Ifeq);
                self.load(desc, temp);
                self.load(desc, temp);
                self.emit(cmp);
                let is_nan = self.code.jump(Opcode::Ifne);
                Ok(vec![is_zero, is_nan])
            }
            d if is_int_like(d) => Ok(vec![self.code.jump(Opcode::Ifeq)]),
            _ => {
                let temp = self.ctx.locals.allocate_temp(OBJECT)?;
                self.store(OBJECT, temp);
                self.load(OBJECT, temp);
                let mut jumps = vec![self.code.jump(Opcode::Ifnull)];
                self.load(OBJECT, temp);
                if desc == STRING {
                    self.invoke_virtual(STRING_CLASS, "length", "()I");
                    jumps.push(self.code.jump(Opcode::Ifeq));
                } else if let Some(prim) = unboxed(desc) {
                    self.coerce(desc, prim)?;
                    jumps.extend(self.falsy_jumps(prim)?);
                } else {
                    self.emit(Opcode::Pop);
                }
                Ok(jumps)
            }
        }
    }

    fn branch_compare(
        &mut self,
        bin: &BinExpr,
        cond: Cond,
        when: bool,
    ) -> CompileResult<Vec<usize>> {
        let equality = matches!(cond, Cond::Eq | Cond::Ne);
        if equality {
            let nullish = |e: &Expr| self.is_nullish(e);
            let other = match (nullish(&bin.left), nullish(&bin.right)) {
                (true, true) => None,
                (true, false) => Some(&bin.right),
                (false, true) => Some(&bin.left),
                (false, false) => return self.branch_equality(bin, cond, when),
            };
            let Some(other) = other else {
                let holds = cond == Cond::Eq;
                return Ok(if holds == when {
                    vec![self.goto_forward()]
                } else {
                    Vec::new()
                });
            };
            self.compile_expr_as(other, OBJECT)?;
            let is_null = (cond == Cond::Eq) == when;
            let op = if is_null {
                Opcode::Ifnull
            } else {
                Opcode::Ifnonnull
            };
            return Ok(vec![self.code.jump(op)]);
        }

        let left = self.infer_or_object(&bin.left);
        let right = self.infer_or_object(&bin.right);
        if left == STRING && right == STRING {
            self.compile_expr(&bin.left)?;
            self.compile_expr(&bin.right)?;
            self.invoke_virtual(STRING_CLASS, "compareTo", "(Ljava/lang/String;)I");
            let cond = if when { cond } else { cond.negate() };
            return Ok(vec![self.code.jump(cond.zero_op())]);
        }
        let kind = promote(&left, &right);
        self.compile_expr_as(&bin.left, kind)?;
        self.compile_expr_as(&bin.right, kind)?;
        Ok(vec![self.compare_numbers(kind, cond, when)])
    }

    fn branch_equality(
        &mut self,
        bin: &BinExpr,
        cond: Cond,
        when: bool,
    ) -> CompileResult<Vec<usize>> {
        let left = self.infer_or_object(&bin.left);
        let right = self.infer_or_object(&bin.right);
        let lp = unboxed(&left).unwrap_or(&left).to_string();
        let rp = unboxed(&right).unwrap_or(&right).to_string();
        let any_primitive = is_primitive(&left) || is_primitive(&right);

        if any_primitive && is_numeric(&lp) && is_numeric(&rp) {
            let kind = promote(&lp, &rp);
            self.compile_expr_as(&bin.left, kind)?;
            self.compile_expr_as(&bin.right, kind)?;
            return Ok(vec![self.compare_numbers(kind, cond, when)]);
        }
        if any_primitive && lp == "Z" && rp == "Z" {
            self.compile_expr_as(&bin.left, "Z")?;
            self.compile_expr_as(&bin.right, "Z")?;
            return Ok(vec![self.compare_numbers("I", cond, when)]);
        }

        let by_value =
            |d: &str| d == STRING || unboxed(d).is_some() || is_primitive(d) || d == OBJECT;
        self.compile_expr_as(&bin.left, if is_primitive(&left) { OBJECT } else { &left })?;
        self.compile_expr_as(&bin.right, if is_primitive(&right) { OBJECT } else { &right })?;
        let cond = if when { cond } else { cond.negate() };
        if by_value(&left) || by_value(&right) {
            self.invoke_static(OBJECTS_CLASS, "equals", "(Ljava/lang/Object;Ljava/lang/Object;)Z");
            Ok(vec![self.code.jump(if cond == Cond::Eq {
                Opcode::Ifne
            } else {
                Opcode::Ifeq
            })])
        } else {
            Ok(vec![self.code.jump(if cond == Cond::Eq {
                Opcode::IfAcmpeq
            } else {
                Opcode::IfAcmpne
            })])
        }
    }

    /// Compare two values of computational type `kind`
    fn compare_numbers(&mut self, kind: &str, cond: Cond, when: bool) -> usize {
        let cmpg = cond.uses_cmpg();
        let cond = if when { cond } else { cond.negate() };
        match kind {
            "J" => {
                self.emit(Opcode::Lcmp);
                self.code.jump(cond.zero_op())
            }
            "F" => {
                self.emit(if cmpg { Opcode::Fcmpg } else { Opcode::Fcmpl });
                self.code.jump(cond.zero_op())
            }
            "D" => {
                self.emit(if cmpg { Opcode::Dcmpg } else { Opcode::Dcmpl });
                self.code.jump(cond.zero_op())
            }
            _ => self.code.jump(cond.int_op()),
        }
    }

    /// `null`, or `undefined` when no local shadows it
    fn is_nullish(&self, expr: &Expr) -> bool {
        match expr.unparen() {
            Expr::Lit(Lit::Null(_)) => true,
            Expr::Ident(id) => {
                id.name == "undefined" && self.ctx.locals.lookup("undefined").is_none()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_is_an_involution() {
        for cond in [Cond::Eq, Cond::Ne, Cond::Lt, Cond::Le, Cond::Gt, Cond::Ge] {
            assert_eq!(cond.negate().negate(), cond);
            assert_ne!(cond.negate(), cond);
        }
    }

    #[test]
    fn test_comparison_opcodes() {
        assert_eq!(Cond::of(BinaryOp::EqEqEq), Some(Cond::Eq));
        assert_eq!(Cond::of(BinaryOp::Add), None);
        assert_eq!(Cond::Lt.int_op(), Opcode::IfIcmplt);
        assert_eq!(Cond::Lt.negate().zero_op(), Opcode::Ifge);
        assert!(Cond::Le.uses_cmpg());
        assert!(!Cond::Gt.uses_cmpg());
    }
}
