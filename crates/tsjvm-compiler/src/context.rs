//! Per-method compilation state
//!
//! Locals, generic scope, the jump-label arena for `break`/`continue`, the
//! stack of enclosing `try` constructs and a reachability flag. One context
//! is created per method body and dropped when the method is finished.

use crate::error::{CompileError, CompileResult};
use crate::locals::LocalVariableTable;
use crate::types::{GenericTypeInfo, TypeEnv, TypeResolver};
use rustc_hash::{FxHashMap, FxHashSet};
use tsjvm_ast::BlockStmt;

/// Handle into the label arena
pub type LabelId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Loop,
    Switch,
    /// Labeled statement that is not a loop
    Block,
}

/// A jump target whose offset may not be known yet
#[derive(Debug, Clone)]
pub struct LoopLabelInfo {
    pub name: Option<String>,
    pub target: Option<usize>,
    /// Opcode offsets of branches waiting for `target`
    pub patches: Vec<usize>,
}

/// A construct `break`/`continue` can leave
#[derive(Debug, Clone)]
struct ControlEntry {
    names: Vec<String>,
    kind: LabelKind,
    break_label: LabelId,
    continue_label: Option<LabelId>,
    /// Open `try` frames when the construct was entered
    try_depth: usize,
}

/// Where a `break`/`continue` jumps and how many `finally` blocks it leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    pub label: LabelId,
    pub try_depth: usize,
}

/// An enclosing `try` whose finalizer runs on every exit
#[derive(Debug, Clone, Default)]
pub struct TryFrame {
    pub finalizer: Option<BlockStmt>,
    /// Inlined finalizer copies, excluded from this frame's handler ranges
    pub gaps: Vec<(usize, usize)>,
}

pub struct CompilationContext<'a> {
    pub resolver: TypeResolver<'a>,
    pub namespace: String,
    /// Qualified name of the class `this` refers to
    pub class_name: Option<String>,
    /// Internal name of the class the method is emitted into
    pub owner: String,
    /// Class lambdas created here are numbered under
    pub lambda_root: String,
    pub is_static: bool,
    pub return_descriptor: String,
    pub locals: LocalVariableTable,
    pub generics: FxHashMap<String, String>,
    /// Locals that live in a holder array
    pub holders: FxHashSet<String>,
    /// Slot holding `this` (0 in instance methods, a copy in lambdas)
    pub this_slot: Option<u16>,
    pub try_frames: Vec<TryFrame>,
    /// Whether the next instruction can be reached
    pub reachable: bool,
    labels: Vec<LoopLabelInfo>,
    controls: Vec<ControlEntry>,
    /// Labels waiting for the statement they prefix
    pending_labels: Vec<String>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(resolver: TypeResolver<'a>, namespace: &str, owner: &str, is_static: bool) -> Self {
        Self {
            resolver,
            namespace: namespace.to_string(),
            class_name: None,
            owner: owner.to_string(),
            lambda_root: owner.to_string(),
            is_static,
            return_descriptor: "V".to_string(),
            locals: LocalVariableTable::new(if is_static { 0 } else { 1 }),
            generics: FxHashMap::default(),
            holders: FxHashSet::default(),
            this_slot: (!is_static).then_some(0),
            try_frames: Vec::new(),
            reachable: true,
            labels: Vec::new(),
            controls: Vec::new(),
            pending_labels: Vec::new(),
        }
    }

    pub fn with_class(mut self, class_name: Option<&str>) -> Self {
        self.class_name = class_name.map(str::to_string);
        self
    }

    pub fn with_return(mut self, descriptor: &str) -> Self {
        self.return_descriptor = descriptor.to_string();
        self
    }

    pub fn with_generics(mut self, generics: impl IntoIterator<Item = (String, String)>) -> Self {
        self.generics.extend(generics);
        self
    }

    // ===== Labels =====

    pub fn new_label(&mut self, name: Option<&str>) -> LabelId {
        self.labels.push(LoopLabelInfo {
            name: name.map(str::to_string),
            target: None,
            patches: Vec::new(),
        });
        self.labels.len() - 1
    }

    pub fn label(&self, id: LabelId) -> Option<&LoopLabelInfo> {
        self.labels.get(id)
    }

    /// Record a branch to a label; returns the target when it is already bound
    pub fn add_patch(&mut self, id: LabelId, at: usize) -> CompileResult<Option<usize>> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or_else(|| CompileError::internal(format!("unknown label handle {}", id)))?;
        match label.target {
            Some(target) => Ok(Some(target)),
            None => {
                label.patches.push(at);
                Ok(None)
            }
        }
    }

    /// Fix a label's offset; returns the branches to rewrite
    pub fn bind_label(&mut self, id: LabelId, offset: usize) -> CompileResult<Vec<usize>> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or_else(|| CompileError::internal(format!("unknown label handle {}", id)))?;
        label.target = Some(offset);
        Ok(std::mem::take(&mut label.patches))
    }

    /// Attach a statement label to the next construct
    pub fn push_pending_label(&mut self, name: &str) {
        self.pending_labels.push(name.to_string());
    }

    pub fn take_pending_labels(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_labels)
    }

    /// Enter a construct `break`/`continue` can target
    pub fn push_control(
        &mut self,
        names: Vec<String>,
        kind: LabelKind,
        break_label: LabelId,
        continue_label: Option<LabelId>,
    ) {
        self.controls.push(ControlEntry {
            names,
            kind,
            break_label,
            continue_label,
            try_depth: self.try_frames.len(),
        });
    }

    pub fn pop_control(&mut self) {
        self.controls.pop();
    }

    /// Constructs a jump can reach from the current position
    ///
    /// While a finalizer is inlined the `try` frames above it are popped, so
    /// constructs entered inside that `try` are out of reach.
    fn visible_controls(&self) -> impl Iterator<Item = &ControlEntry> {
        let depth = self.try_frames.len();
        self.controls.iter().rev().filter(move |c| c.try_depth <= depth)
    }

    pub fn resolve_break(&self, label: Option<&str>) -> CompileResult<JumpTarget> {
        let entry = match label {
            Some(name) => self
                .visible_controls()
                .find(|c| c.names.iter().any(|n| n == name))
                .ok_or_else(|| CompileError::UnknownLabel {
                    label: name.to_string(),
                })?,
            None => self
                .visible_controls()
                .find(|c| matches!(c.kind, LabelKind::Loop | LabelKind::Switch))
                .ok_or(CompileError::InvalidBreak)?,
        };
        Ok(JumpTarget {
            label: entry.break_label,
            try_depth: entry.try_depth,
        })
    }

    pub fn resolve_continue(&self, label: Option<&str>) -> CompileResult<JumpTarget> {
        let entry = match label {
            Some(name) => self
                .visible_controls()
                .find(|c| c.names.iter().any(|n| n == name))
                .ok_or_else(|| CompileError::UnknownLabel {
                    label: name.to_string(),
                })?,
            None => self
                .visible_controls()
                .find(|c| c.kind == LabelKind::Loop)
                .ok_or(CompileError::InvalidContinue)?,
        };
        let label = entry.continue_label.ok_or(CompileError::InvalidContinue)?;
        Ok(JumpTarget {
            label,
            try_depth: entry.try_depth,
        })
    }

    // ===== Scopes =====

    pub fn enter_scope(&mut self) {
        self.locals.enter_scope();
    }

    pub fn exit_scope(&mut self) {
        self.locals.exit_scope();
    }

    pub fn is_holder(&self, name: &str) -> bool {
        self.holders.contains(name)
    }
}

impl TypeEnv for CompilationContext<'_> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn generic(&self, name: &str) -> Option<&str> {
        self.generics.get(name).map(String::as_str)
    }

    fn variable(&self, name: &str) -> Option<&str> {
        self.locals.lookup(name).map(|v| v.descriptor.as_str())
    }

    fn this_class(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    fn variable_generic(&self, name: &str) -> Option<&GenericTypeInfo> {
        self.locals.lookup(name).and_then(|v| v.generic.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use std::collections::BTreeMap;

    fn with_context(f: impl FnOnce(&mut CompilationContext)) {
        let registry = TypeRegistry::new();
        let aliases = BTreeMap::new();
        let resolver = TypeResolver::new(&registry, &aliases);
        let mut ctx = CompilationContext::new(resolver, "", "Main", true);
        f(&mut ctx);
    }

    #[test]
    fn test_unlabeled_break_skips_blocks() {
        with_context(|ctx| {
            let loop_break = ctx.new_label(None);
            let loop_continue = ctx.new_label(None);
            ctx.push_control(vec![], LabelKind::Loop, loop_break, Some(loop_continue));
            let block_break = ctx.new_label(Some("b"));
            ctx.push_control(vec!["b".into()], LabelKind::Block, block_break, None);

            assert_eq!(ctx.resolve_break(None).unwrap().label, loop_break);
            assert_eq!(ctx.resolve_break(Some("b")).unwrap().label, block_break);
            assert_eq!(ctx.resolve_continue(None).unwrap().label, loop_continue);
            assert_eq!(ctx.resolve_continue(Some("b")), Err(CompileError::InvalidContinue));
            assert_eq!(
                ctx.resolve_break(Some("missing")),
                Err(CompileError::UnknownLabel {
                    label: "missing".into()
                })
            );
        });
    }

    #[test]
    fn test_break_outside_loop() {
        with_context(|ctx| {
            assert_eq!(ctx.resolve_break(None), Err(CompileError::InvalidBreak));
            assert_eq!(ctx.resolve_continue(None), Err(CompileError::InvalidContinue));
            let switch_break = ctx.new_label(None);
            ctx.push_control(vec![], LabelKind::Switch, switch_break, None);
            assert!(ctx.resolve_break(None).is_ok());
            assert_eq!(ctx.resolve_continue(None), Err(CompileError::InvalidContinue));
        });
    }

    #[test]
    fn test_label_patches() {
        with_context(|ctx| {
            let id = ctx.new_label(Some("outer"));
            assert_eq!(ctx.add_patch(id, 4).unwrap(), None);
            assert_eq!(ctx.add_patch(id, 9).unwrap(), None);
            assert_eq!(ctx.bind_label(id, 20).unwrap(), vec![4, 9]);
            assert_eq!(ctx.add_patch(id, 30).unwrap(), Some(20));
            assert_eq!(ctx.label(id).unwrap().name.as_deref(), Some("outer"));
        });
    }

    #[test]
    fn test_try_depth_recorded() {
        with_context(|ctx| {
            ctx.try_frames.push(TryFrame::default());
            let brk = ctx.new_label(None);
            ctx.push_control(vec![], LabelKind::Loop, brk, None);
            ctx.try_frames.push(TryFrame::default());
            assert_eq!(ctx.resolve_break(None).unwrap().try_depth, 1);
        });
    }

    #[test]
    fn test_inlined_finalizer_cannot_reach_inner_loops() {
        with_context(|ctx| {
            let outer = ctx.new_label(Some("outer"));
            ctx.push_control(vec!["outer".into()], LabelKind::Loop, outer, None);
            ctx.try_frames.push(TryFrame::default());
            let inner = ctx.new_label(None);
            ctx.push_control(vec!["inner".into()], LabelKind::Loop, inner, None);
            assert_eq!(ctx.resolve_break(None).unwrap().label, inner);

            let saved = ctx.try_frames.split_off(0);
            assert_eq!(ctx.resolve_break(None).unwrap().label, outer);
            assert!(ctx.resolve_break(Some("inner")).is_err());
            ctx.try_frames.extend(saved);
            assert_eq!(ctx.resolve_break(Some("inner")).unwrap().label, inner);
        });
    }
}
