//! Local variable slots
//!
//! Slots are handed out monotonically and never reused, so a slot keeps one
//! verification type for the whole method.

use crate::error::{CompileError, CompileResult};
use crate::types::GenericTypeInfo;
use tsjvm_classfile::{ClassFileError, LocalKind};

/// A named local or parameter
#[derive(Debug, Clone)]
pub struct LocalVariable {
    pub name: String,
    /// Declared type of the value, not of its holder
    pub descriptor: String,
    pub slot: u16,
    pub mutable: bool,
    /// Stored in a one-element array shared with closures
    pub boxed: bool,
    pub generic: Option<GenericTypeInfo>,
}

/// Where a variable's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarStorage {
    Direct(u16),
    /// Slot of the holder array; the value is element 0
    Boxed(u16),
}

impl LocalVariable {
    pub fn storage(&self) -> VarStorage {
        if self.boxed {
            VarStorage::Boxed(self.slot)
        } else {
            VarStorage::Direct(self.slot)
        }
    }

    pub fn kind(&self) -> LocalKind {
        LocalKind::from_descriptor(&self.descriptor)
    }

    /// Holder array descriptor for a boxed variable
    pub fn holder_descriptor(&self) -> String {
        format!("[{}", self.descriptor)
    }
}

/// Lexical scopes of one method body
#[derive(Debug, Clone)]
pub struct LocalVariableTable {
    /// Indices into `all`, one list per open scope
    scopes: Vec<Vec<usize>>,
    all: Vec<LocalVariable>,
    next_slot: u16,
}

impl LocalVariableTable {
    /// Table whose first free slot is `first_slot` (after `this`, if any)
    pub fn new(first_slot: u16) -> Self {
        Self {
            scopes: vec![Vec::new()],
            all: Vec::new(),
            next_slot: first_slot,
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn reserve(&mut self, width: u16) -> CompileResult<u16> {
        let slot = self.next_slot;
        self.next_slot = slot
            .checked_add(width)
            .ok_or(CompileError::ClassFile(ClassFileError::TooMany {
                what: "local variable slots",
                count: slot as usize + width as usize,
            }))?;
        Ok(slot)
    }

    /// Declare a variable in the innermost scope
    pub fn declare(
        &mut self,
        name: &str,
        descriptor: &str,
        mutable: bool,
        boxed: bool,
    ) -> CompileResult<&LocalVariable> {
        let depth = self.scopes.len() - 1;
        self.declare_at(depth, name, descriptor, mutable, boxed)
    }

    /// Declare a variable in the method's outermost scope (`var` hoisting)
    pub fn declare_hoisted(
        &mut self,
        name: &str,
        descriptor: &str,
        boxed: bool,
    ) -> CompileResult<&LocalVariable> {
        self.declare_at(0, name, descriptor, true, boxed)
    }

    fn declare_at(
        &mut self,
        depth: usize,
        name: &str,
        descriptor: &str,
        mutable: bool,
        boxed: bool,
    ) -> CompileResult<&LocalVariable> {
        let width = if boxed {
            1
        } else {
            LocalKind::from_descriptor(descriptor).slots()
        };
        let slot = self.reserve(width)?;
        let index = self.all.len();
        self.all.push(LocalVariable {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            slot,
            mutable,
            boxed,
            generic: None,
        });
        self.scopes[depth].push(index);
        Ok(&self.all[index])
    }

    /// Anonymous slot for a value of this descriptor
    pub fn allocate_temp(&mut self, descriptor: &str) -> CompileResult<u16> {
        self.reserve(LocalKind::from_descriptor(descriptor).slots())
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVariable> {
        self.find(name).map(|i| &self.all[i])
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut LocalVariable> {
        self.find(name).map(move |i| &mut self.all[i])
    }

    /// Re-admit an earlier binding of `name` into the innermost scope
    ///
    /// Succeeds only when a binding with exactly this descriptor exists and
    /// the innermost scope does not already hold it.
    pub fn add_existing_variable_to_current_scope(&mut self, name: &str, descriptor: &str) -> bool {
        let Some(index) = self
            .all
            .iter()
            .rposition(|v| v.name == name && v.descriptor == descriptor)
        else {
            return false;
        };
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        if scope.contains(&index) {
            return false;
        }
        scope.push(index);
        true
    }

    /// Declared only in the innermost scope
    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|&i| self.all[i].name == name))
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .copied()
            .find(|&i| self.all[i].name == name)
    }

    /// Slots used so far
    pub fn max_locals(&self) -> u16 {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_slots_and_scopes() {
        let mut table = LocalVariableTable::new(1);
        assert_eq!(table.declare("a", "J", true, false).unwrap().slot, 1);
        assert_eq!(table.declare("b", "I", true, false).unwrap().slot, 3);

        table.enter_scope();
        let inner = table.declare("a", "Ljava/lang/String;", false, false).unwrap().slot;
        assert_eq!(inner, 4);
        assert_eq!(table.lookup("a").unwrap().descriptor, "Ljava/lang/String;");
        table.exit_scope();

        assert_eq!(table.lookup("a").unwrap().descriptor, "J");
        assert_eq!(table.max_locals(), 5);
    }

    #[test]
    fn test_boxed_variables_take_one_slot() {
        let mut table = LocalVariableTable::new(0);
        let var = table.declare("n", "D", true, true).unwrap();
        assert_eq!(var.storage(), VarStorage::Boxed(0));
        assert_eq!(var.holder_descriptor(), "[D");
        assert_eq!(table.allocate_temp("I").unwrap(), 1);
    }

    #[test]
    fn test_hoisted_declarations_outlive_blocks() {
        let mut table = LocalVariableTable::new(0);
        table.enter_scope();
        table.declare_hoisted("v", "I", false).unwrap();
        table.declare("w", "I", true, false).unwrap();
        table.exit_scope();
        assert!(table.lookup("v").is_some());
        assert!(table.lookup("w").is_none());
    }

    #[test]
    fn test_readmitting_existing_binding() {
        let mut table = LocalVariableTable::new(0);
        let slot = table.declare("total", "I", true, false).unwrap().slot;
        table.enter_scope();
        table.declare("total", "D", true, false).unwrap();
        assert!(!table.add_existing_variable_to_current_scope("total", "J"));
        assert!(table.add_existing_variable_to_current_scope("total", "I"));
        assert_eq!(table.lookup("total").unwrap().slot, slot);
        assert!(!table.add_existing_variable_to_current_scope("total", "I"));
    }
}
