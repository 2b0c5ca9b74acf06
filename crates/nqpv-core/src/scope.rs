//! The inductive, tree-structured symbol table used while evaluating a
//! module and computing the weakest liberal precondition.
//!
//! A `Scope` owns a flat table of named [`Operator`]s and an optional link
//! to a parent scope. Lookup walks up the chain (child entries shadow
//! parent entries of the same name); `append` optionally walks the same
//! chain to deduplicate within EPS before minting a fresh `VARk` name.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult, Pos};
use crate::operator::{Operator, OperatorId};
use crate::settings::Settings;

#[derive(Debug, Default)]
struct ScopeData {
    vars: IndexMap<String, Operator>,
    auto_naming_no: usize,
}

/// A node in the scope tree. Cheap to clone: clones share the same
/// underlying table via `Rc`.
#[derive(Debug, Clone)]
pub struct Scope {
    label: String,
    parent: Option<Rc<Scope>>,
    data: Rc<RefCell<ScopeData>>,
}

impl Scope {
    /// A fresh root scope with no parent.
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parent: None,
            data: Rc::new(RefCell::new(ScopeData::default())),
        }
    }

    /// A child scope nested under `self`.
    pub fn child(self: &Rc<Self>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            parent: Some(Rc::clone(self)),
            data: Rc::new(RefCell::new(ScopeData::default())),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_deref()
    }

    /// The dotted path from the root scope to this one.
    pub fn prefix(&self) -> String {
        match &self.parent {
            Some(p) => format!("{}{}.", p.prefix(), self.label),
            None => format!("{}.", self.label),
        }
    }

    /// Looks up `name` in this scope, then ancestors, innermost first.
    pub fn lookup(&self, name: &str) -> Option<Operator> {
        if let Some(op) = self.data.borrow().vars.get(name) {
            return Some(op.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Like [`Scope::lookup`], returning a [`CoreError::UndeclaredIdentifier`]
    /// rather than `None`.
    pub fn require(&self, name: &str, pos: Pos) -> CoreResult<Operator> {
        self.lookup(name).ok_or_else(|| CoreError::UndeclaredIdentifier {
            name: name.to_string(),
            pos,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.borrow().vars.contains_key(name) || self.parent.as_ref().is_some_and(|p| p.contains(name))
    }

    /// Binds `value` to an explicit `name` in this scope, shadowing any
    /// ancestor entry of the same name.
    pub fn insert(&self, name: impl Into<String>, value: Operator) {
        self.data.borrow_mut().vars.insert(name.into(), value);
    }

    /// Removes `name` from this scope only (not ancestors).
    pub fn remove(&self, name: &str) -> Option<Operator> {
        self.data.borrow_mut().vars.shift_remove(name)
    }

    /// Binds a freshly computed operator under an auto-generated name.
    ///
    /// Under `IDENTICAL_VAR_CHECK`, walks this scope and its ancestors and
    /// returns the name of an existing entry that equals `value` within
    /// EPS rather than inserting a duplicate. Otherwise mints `VARk` with a
    /// monotonically increasing `k` local to this scope and installs it.
    pub fn append(&self, value: Operator, settings: &Settings) -> OperatorId {
        if settings.identical_var_check {
            if let Some(name) = self.find_equal(&value, settings.eps) {
                return name;
            }
        }
        let name = self.auto_name();
        self.data.borrow_mut().vars.insert(name.clone(), value);
        name
    }

    fn find_equal(&self, value: &Operator, eps: f64) -> Option<OperatorId> {
        if let Some((name, _)) = self
            .data
            .borrow()
            .vars
            .iter()
            .find(|(_, stored)| stored.approx_eq(value, eps))
        {
            return Some(name.clone());
        }
        self.parent.as_ref().and_then(|p| p.find_equal(value, eps))
    }

    fn auto_name(&self) -> OperatorId {
        let mut data = self.data.borrow_mut();
        loop {
            let candidate = format!("VAR{}", data.auto_naming_no);
            data.auto_naming_no += 1;
            if !data.vars.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Bulk-copies every binding of `other` into `self`, overwriting
    /// existing names. Used when injecting a standard-library module's
    /// bindings into a fresh scope.
    pub fn inject(&self, other: &Scope) {
        for (name, op) in other.data.borrow().vars.iter() {
            self.data.borrow_mut().vars.insert(name.clone(), op.clone());
        }
    }

    pub fn local_len(&self) -> usize {
        self.data.borrow().vars.len()
    }

    /// Local names only, in insertion order; does not include ancestors.
    pub fn local_names(&self) -> Vec<String> {
        self.data.borrow().vars.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    #[test]
    fn child_sees_parent_bindings() {
        let root = Rc::new(Scope::root("global"));
        root.insert("I", Operator::new(Tensor::eye(1)));
        let child = root.child("block");
        assert!(child.lookup("I").is_some());
        assert!(child.contains("I"));
    }

    #[test]
    fn child_shadows_parent_binding_of_same_name() {
        let root = Rc::new(Scope::root("global"));
        root.insert("VAR0", Operator::new(Tensor::eye(1)));
        let child = root.child("block");
        child.insert("VAR0", Operator::new(Tensor::eye(2)));
        assert_eq!(child.local_len(), 1);
        assert_eq!(root.local_len(), 1);
    }

    #[test]
    fn append_dedups_across_ancestors_under_identical_var_check() {
        let root = Rc::new(Scope::root("global"));
        let settings = Settings::default();
        let name1 = root.append(Operator::new(Tensor::eye(1)), &settings);
        let child = root.child("block");
        let name2 = child.append(Operator::new(Tensor::eye(1)), &settings);
        assert_eq!(name1, name2);
        assert_eq!(child.local_len(), 0);
    }

    #[test]
    fn append_without_check_always_inserts_locally() {
        let root = Rc::new(Scope::root("global"));
        let mut settings = Settings::default();
        settings.identical_var_check = false;
        root.append(Operator::new(Tensor::eye(1)), &settings);
        root.append(Operator::new(Tensor::eye(1)), &settings);
        assert_eq!(root.local_len(), 2);
    }

    #[test]
    fn inject_copies_bindings_without_removing_originals() {
        let lib = Rc::new(Scope::root("lib"));
        lib.insert("H", Operator::new(Tensor::eye(1)));
        let target = Scope::root("main");
        target.inject(&lib);
        assert!(target.contains("H"));
        assert!(lib.contains("H"));
    }
}
