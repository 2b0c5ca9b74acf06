//! The operator wrapper (with memoised property flags) and the
//! content-addressed operator store.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, Pos};
use crate::settings::Settings;
use crate::tensor::Tensor;

/// The canonical name of a stored operator, assigned by [`OperatorStore::append`].
pub type OperatorId = String;

/// A property an [`Operator`] may or may not have, memoised once checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatorProperty {
    Unitary,
    HermitianPredicate,
    Measurement,
}

impl OperatorProperty {
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorProperty::Unitary => "unitary",
            OperatorProperty::HermitianPredicate => "hermitian predicate",
            OperatorProperty::Measurement => "measurement",
        }
    }
}

/// A tensor paired with a cache of its checked property flags. Equality is
/// element-wise within tolerance (`Tensor::approx_eq`), so two `Operator`s
/// with different flag caches but numerically equal data still compare equal.
#[derive(Debug, Clone)]
pub struct Operator {
    tensor: Tensor,
    flags: RefCell<HashMap<OperatorProperty, bool>>,
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.tensor == other.tensor
    }
}

impl Operator {
    pub fn new(tensor: Tensor) -> Self {
        Self {
            tensor,
            flags: RefCell::new(HashMap::new()),
        }
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Checks (and memoises) whether this operator has `property`, under the
    /// tolerances in `settings`.
    pub fn check_property(&self, property: OperatorProperty, settings: &Settings) -> CoreResult<bool> {
        if let Some(&cached) = self.flags.borrow().get(&property) {
            return Ok(cached);
        }
        let result = match property {
            OperatorProperty::Unitary => self.tensor.check_unitary(settings.eps),
            OperatorProperty::HermitianPredicate => {
                self.tensor.check_hermitian_predicate(settings.eps)
            }
            OperatorProperty::Measurement => self.tensor.check_measurement(settings.eps),
        }?;
        self.flags.borrow_mut().insert(property, result);
        Ok(result)
    }

    /// Requires `property`, returning a [`CoreError::PropertyViolation`] if
    /// the operator (named `name`, at `pos`) does not have it.
    pub fn require_property(
        &self,
        property: OperatorProperty,
        name: &str,
        settings: &Settings,
        pos: Pos,
    ) -> CoreResult<()> {
        if self.check_property(property, settings)? {
            Ok(())
        } else {
            Err(CoreError::PropertyViolation {
                name: name.to_string(),
                property: property.as_str(),
                pos,
            })
        }
    }

    pub fn approx_eq(&self, other: &Operator, eps: f64) -> bool {
        self.tensor.approx_eq(&other.tensor, eps)
    }
}

/// A content-addressed table of tensors with symbolic names and property
/// caches. `append` optionally deduplicates by EPS-equality, per
/// `IDENTICAL_VAR_CHECK` in [`Settings`].
#[derive(Debug, Default)]
pub struct OperatorStore {
    entries: indexmap::IndexMap<OperatorId, Operator>,
    next_auto: usize,
}

impl OperatorStore {
    pub fn new() -> Self {
        Self {
            entries: indexmap::IndexMap::new(),
            next_auto: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Operator> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Operator> {
        self.entries.shift_remove(id)
    }

    /// Inserts `op` under an explicit `name`, overwriting any prior entry.
    pub fn insert(&mut self, name: impl Into<String>, op: Operator) -> OperatorId {
        let name = name.into();
        self.entries.insert(name.clone(), op);
        name
    }

    /// If `IDENTICAL_VAR_CHECK` is set and an entry equal to `op` within EPS
    /// already exists, returns its name; otherwise auto-names `op` as
    /// `VARk` (monotonically increasing `k`) and installs it.
    pub fn append(&mut self, op: Operator, settings: &Settings) -> OperatorId {
        if settings.identical_var_check {
            if let Some((existing, _)) = self
                .entries
                .iter()
                .find(|(_, stored)| stored.approx_eq(&op, settings.eps))
            {
                return existing.clone();
            }
        }
        let name = self.auto_name();
        self.entries.insert(name.clone(), op);
        name
    }

    fn auto_name(&mut self) -> OperatorId {
        loop {
            let candidate = format!("VAR{}", self.next_auto);
            self.next_auto += 1;
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperatorId, &Operator)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_dedups_under_identical_var_check() {
        let mut store = OperatorStore::new();
        let mut settings = Settings::default();
        settings.identical_var_check = true;
        let id = Tensor::eye(1);
        let name1 = store.append(Operator::new(id.clone()), &settings);
        let name2 = store.append(Operator::new(id), &settings);
        assert_eq!(name1, name2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_without_dedup_always_fresh_name() {
        let mut store = OperatorStore::new();
        let mut settings = Settings::default();
        settings.identical_var_check = false;
        let id = Tensor::eye(1);
        let name1 = store.append(Operator::new(id.clone()), &settings);
        let name2 = store.append(Operator::new(id), &settings);
        assert_ne!(name1, name2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn check_property_is_memoised() {
        let settings = Settings::default();
        let op = Operator::new(Tensor::eye(1));
        assert!(op.check_property(OperatorProperty::Unitary, &settings).unwrap());
        // second call hits the cache, still returns the same answer.
        assert!(op.check_property(OperatorProperty::Unitary, &settings).unwrap());
    }
}
