//! Qubit registers and qubit-variable lists (QVLs).

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, Pos};

/// An ordered sequence of distinct qubit names. The register order defines
/// the canonical tensor axis order for every operator over the whole system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Register {
    pub fn new(names: Vec<String>) -> CoreResult<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(CoreError::InvalidQvl {
                    message: format!("duplicate qubit name '{name}' in register"),
                    pos: Pos::synthetic(),
                });
            }
        }
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// An ordered sequence of distinct names, each present in a [`Register`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QVarList {
    names: Vec<String>,
}

impl QVarList {
    /// The empty QVL, the identity of [`QVarList::join`].
    pub fn empty() -> Self {
        Self { names: Vec::new() }
    }

    /// Builds a QVL, checking every name is distinct and present in `reg`.
    pub fn new(reg: &Register, names: Vec<String>) -> CoreResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(names.len());
        for name in &names {
            if !reg.contains(name) {
                return Err(CoreError::InvalidQvl {
                    message: format!("'{name}' is not a qubit in the register"),
                    pos: Pos::synthetic(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(CoreError::InvalidQvl {
                    message: format!("duplicate variable '{name}' in qubit-variable list"),
                    pos: Pos::synthetic(),
                });
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Axis positions of this QVL's names within `reg`, in the QVL's order.
    pub fn positions(&self, reg: &Register) -> CoreResult<Vec<usize>> {
        self.names
            .iter()
            .map(|n| {
                reg.position(n).ok_or_else(|| CoreError::InvalidQvl {
                    message: format!("'{n}' is not a qubit in the register"),
                    pos: Pos::synthetic(),
                })
            })
            .collect()
    }

    /// Substitution by a name-to-name mapping.
    pub fn substitute(&self, map: &HashMap<String, String>) -> Self {
        let names = self
            .names
            .iter()
            .map(|n| map.get(n).cloned().unwrap_or_else(|| n.clone()))
            .collect();
        Self { names }
    }

    /// `cover(A,B)`: every name of `other` appears in `self`.
    pub fn covers(&self, other: &QVarList) -> bool {
        other.names.iter().all(|n| self.names.contains(n))
    }

    /// `join(A,B)`: `self` with names of `other` not already in `self`
    /// appended, in `other`'s order.
    pub fn join(&self, other: &QVarList) -> Self {
        let mut names = self.names.clone();
        for n in &other.names {
            if !names.contains(n) {
                names.push(n.clone());
            }
        }
        Self { names }
    }

    /// Whether this QVL names every qubit in `reg`, in the register's order.
    pub fn is_full(&self, reg: &Register) -> bool {
        self.names.as_slice() == reg.names()
    }
}

impl std::fmt::Display for QVarList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.names.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg() -> Register {
        Register::new(vec!["q0".into(), "q1".into(), "q2".into()]).unwrap()
    }

    #[test]
    fn rejects_unknown_name() {
        let r = reg();
        assert!(QVarList::new(&r, vec!["q9".into()]).is_err());
    }

    #[test]
    fn rejects_duplicate_name() {
        let r = reg();
        assert!(QVarList::new(&r, vec!["q0".into(), "q0".into()]).is_err());
    }

    #[test]
    fn join_appends_missing_names_in_order() {
        let r = reg();
        let a = QVarList::new(&r, vec!["q0".into()]).unwrap();
        let b = QVarList::new(&r, vec!["q1".into(), "q0".into(), "q2".into()]).unwrap();
        let joined = a.join(&b);
        assert_eq!(joined.names(), &["q0", "q1", "q2"]);
    }

    #[test]
    fn covers_checks_subset() {
        let r = reg();
        let a = QVarList::new(&r, vec!["q0".into(), "q1".into()]).unwrap();
        let b = QVarList::new(&r, vec!["q1".into()]).unwrap();
        assert!(a.covers(&b));
        assert!(!b.covers(&a));
    }

    #[test]
    fn positions_match_register_order() {
        let r = reg();
        let v = QVarList::new(&r, vec!["q2".into(), "q0".into()]).unwrap();
        assert_eq!(v.positions(&r).unwrap(), vec![2, 0]);
    }
}
