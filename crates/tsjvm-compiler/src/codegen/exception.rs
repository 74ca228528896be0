//! `throw`, `try`/`catch`/`finally`
//!
//! A `finally` block is copied onto every path that leaves its `try`: the
//! normal exits of the body and the handler, each `return`, `break` and
//! `continue` crossing it, and a catch-all handler that rethrows. The copies
//! are cut out of the protected ranges so an exception raised inside a
//! finalizer is not caught by the `try` it belongs to.

use super::MethodGen;
use crate::context::TryFrame;
use crate::error::{CompileError, CompileResult};
use crate::types::*;
use tsjvm_ast::{Expr, Pat, TryStmt};
use tsjvm_classfile::Opcode;

impl MethodGen<'_, '_> {
    pub fn has_finalizers(&self) -> bool {
        self.ctx.try_frames.iter().any(|frame| frame.finalizer.is_some())
    }

    /// Run the finalizers of every `try` above `depth`, innermost first
    ///
    /// Frames are popped while their finalizer is emitted, which keeps a
    /// `break` inside a finalizer from targeting loops of the `try` body.
    pub fn inline_finalizers(&mut self, depth: usize) -> CompileResult<()> {
        let mut popped: Vec<TryFrame> = Vec::new();
        let mut result = Ok(());
        while self.ctx.try_frames.len() > depth {
            let Some(frame) = self.ctx.try_frames.pop() else {
                break;
            };
            let finalizer = frame.finalizer.clone();
            popped.push(frame);
            let Some(finalizer) = finalizer else {
                continue;
            };
            let start = self.code.offset();
            result = self.compile_block(&finalizer);
            let end = self.code.offset();
            for frame in &mut popped {
                frame.gaps.push((start, end));
            }
            if result.is_err() || !self.ctx.reachable {
                break;
            }
        }
        while let Some(frame) = popped.pop() {
            self.ctx.try_frames.push(frame);
        }
        result
    }

    pub fn compile_try(&mut self, stmt: &TryStmt) -> CompileResult<()> {
        if stmt.handler.is_none() && stmt.finalizer.is_none() {
            return self.compile_block(&stmt.block);
        }
        let depth = self.ctx.try_frames.len();
        self.ctx.try_frames.push(TryFrame {
            finalizer: stmt.finalizer.clone(),
            gaps: Vec::new(),
        });

        let start = self.code.offset();
        self.compile_block(&stmt.block)?;
        let try_end = self.code.offset();
        let mut done = Vec::new();
        self.leave_try(depth, &mut done)?;

        if let Some(handler) = &stmt.handler {
            let catch_start = self.code.offset();
            self.ctx.reachable = true;
            self.ctx.enter_scope();
            let body = self
                .bind_exception(handler.param.as_ref())
                .and_then(|_| self.compile_stmts(&handler.body.stmts));
            self.ctx.exit_scope();
            body?;
            self.leave_try(depth, &mut done)?;

            let catch_type = self.writer.pool().class(THROWABLE_CLASS);
            let gaps = self.current_gaps()?;
            for (from, to) in protected_ranges(start, try_end, &gaps) {
                self.code.add_exception_handler(from, to, catch_start, catch_type);
            }
        }
        let protected_end = self.code.offset();

        let frame = self
            .ctx
            .try_frames
            .pop()
            .ok_or_else(|| CompileError::internal("try frame stack underflow"))?;
        if let Some(finalizer) = &stmt.finalizer {
            let handler_start = self.code.offset();
            self.ctx.reachable = true;
            let exception = self.ctx.locals.allocate_temp(THROWABLE)?;
            self.store(THROWABLE, exception);
            self.compile_block(finalizer)?;
            if self.ctx.reachable {
                self.load(THROWABLE, exception);
                self.emit(Opcode::Athrow);
                self.ctx.reachable = false;
            }
            for (from, to) in protected_ranges(start, protected_end, &frame.gaps) {
                self.code.add_exception_handler(from, to, handler_start, 0);
            }
        }
        self.patch_here(&done)
    }

    /// Normal exit from a `try` body or handler: run the finalizer, then skip ahead
    fn leave_try(&mut self, depth: usize, done: &mut Vec<usize>) -> CompileResult<()> {
        if !self.ctx.reachable {
            return Ok(());
        }
        self.inline_finalizers(depth)?;
        if self.ctx.reachable {
            done.push(self.goto_forward());
        }
        Ok(())
    }

    fn current_gaps(&self) -> CompileResult<Vec<(usize, usize)>> {
        self.ctx
            .try_frames
            .last()
            .map(|frame| frame.gaps.clone())
            .ok_or_else(|| CompileError::internal("try frame stack underflow"))
    }

    /// Bind the caught exception (on the stack) to the catch parameter
    fn bind_exception(&mut self, param: Option<&Pat>) -> CompileResult<()> {
        match param {
            Some(Pat::Ident(binding)) => self.store_new_local(binding.id.as_str(), THROWABLE, true),
            Some(_) => Err(CompileError::unsupported("destructuring a catch parameter")),
            None => {
                self.emit(Opcode::Pop);
                Ok(())
            }
        }
    }

    /// `throw value`; values that are not throwables are wrapped in a `JsError`
    /// carrying their string form
    pub fn compile_throw(&mut self, arg: &Expr) -> CompileResult<()> {
        let desc = self.compile_expr(arg)?;
        if is_reference(&desc)
            && !is_array(&desc)
            && self.registry.is_throwable(class_name(&desc))
        {
            self.emit(Opcode::Athrow);
        } else if desc == OBJECT {
            let value = self.ctx.locals.allocate_temp(OBJECT)?;
            self.store(OBJECT, value);
            self.load(OBJECT, value);
            let throwable = self.writer.pool().class(THROWABLE_CLASS);
            self.code.instance_of(throwable);
            let wrap = self.code.jump(Opcode::Ifeq);
            self.load(OBJECT, value);
            self.checkcast(THROWABLE);
            self.emit(Opcode::Athrow);
            self.patch_here(&[wrap])?;
            self.throw_wrapped(OBJECT, value);
        } else {
            let value = self.ctx.locals.allocate_temp(&desc)?;
            self.store(&desc, value);
            self.throw_wrapped(&desc, value);
        }
        self.ctx.reachable = false;
        Ok(())
    }

    fn throw_wrapped(&mut self, desc: &str, slot: u16) {
        self.new_object(JS_ERROR_CLASS);
        self.emit(Opcode::Dup);
        self.load(desc, slot);
        if desc != STRING {
            self.invoke_static(STRING_CLASS, "valueOf", value_of_descriptor(desc));
        }
        self.invoke_special(JS_ERROR_CLASS, "<init>", "(Ljava/lang/String;)V");
        self.emit(Opcode::Athrow);
    }
}

/// `[start, end)` with the gaps cut out
fn protected_ranges(start: usize, end: usize, gaps: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut gaps: Vec<(usize, usize)> = gaps.iter().copied().filter(|(s, e)| s < e).collect();
    gaps.sort_unstable();
    let mut ranges = Vec::new();
    let mut from = start;
    for (gap_start, gap_end) in gaps {
        if gap_end <= from || gap_start >= end {
            continue;
        }
        if gap_start > from {
            ranges.push((from, gap_start));
        }
        from = from.max(gap_end);
    }
    if from < end {
        ranges.push((from, end));
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_ranges_without_gaps() {
        assert_eq!(protected_ranges(0, 10, &[]), vec![(0, 10)]);
        assert!(protected_ranges(4, 4, &[]).is_empty());
    }

    #[test]
    fn test_protected_ranges_cut_gaps() {
        assert_eq!(protected_ranges(0, 20, &[(12, 15), (3, 6)]), vec![(0, 3), (6, 12), (15, 20)]);
        // Gaps outside the range or touching its ends
        assert_eq!(protected_ranges(5, 10, &[(0, 5), (10, 12), (7, 7)]), vec![(5, 10)]);
        assert_eq!(protected_ranges(5, 10, &[(0, 7), (9, 30)]), vec![(7, 9)]);
    }
}
