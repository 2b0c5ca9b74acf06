//! Quantum predicates: finite ordered sets of Hermitian-predicate OVPs,
//! interpreted disjunctively under the Löwner order.

use std::collections::HashMap;

use crate::error::CoreResult;
use crate::operator::OperatorProperty;
use crate::pair::OpVarPair;
use crate::qvar::{QVarList, Register};
use crate::settings::Settings;

/// A finite ordered sequence of Hermitian-predicate OVPs. Every pair must
/// satisfy [`OperatorProperty::HermitianPredicate`]; construction checks
/// this eagerly so a `Qpre` is always well-formed once built.
#[derive(Debug, Clone)]
pub struct Qpre {
    pairs: Vec<OpVarPair>,
}

impl Qpre {
    /// Builds a `Qpre` from `pairs`, checking each is a Hermitian predicate
    /// and collapsing duplicates (within EPS) when `IDENTICAL_VAR_CHECK` is
    /// on.
    pub fn new(pairs: Vec<OpVarPair>, settings: &Settings) -> CoreResult<Self> {
        for p in &pairs {
            p.require_property(OperatorProperty::HermitianPredicate, settings)?;
        }
        let mut qpre = Self { pairs: Vec::new() };
        for p in pairs {
            qpre.push_dedup(p, settings);
        }
        Ok(qpre)
    }

    pub fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    pub fn pairs(&self) -> &[OpVarPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn push_dedup(&mut self, pair: OpVarPair, settings: &Settings) {
        if settings.identical_var_check && self.pairs.iter().any(|p| p.approx_eq(&pair, settings.eps)) {
            return;
        }
        self.pairs.push(pair);
    }

    /// `all_qvarls(Qpre) = ⋃ qvls(pair)`, in first-seen order.
    pub fn all_qvarls(&self) -> QVarList {
        self.pairs.iter().fold(QVarList::empty(), |acc, p| acc.join(p.qvls()))
    }

    /// Concatenation, with duplicate collapsing under `IDENTICAL_VAR_CHECK`.
    pub fn union(&self, other: &Self, settings: &Settings) -> Self {
        let mut result = self.clone();
        for p in &other.pairs {
            result.push_dedup(p.clone(), settings);
        }
        result
    }

    /// Extends every pair in this `Qpre` to act over `target`.
    pub fn extend_to(&self, target: &QVarList, reg: &Register) -> CoreResult<Self> {
        let pairs = self
            .pairs
            .iter()
            .map(|p| p.extend_to(target, reg))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    /// Substitutes qubit names per `map` in every pair.
    pub fn substitute(&self, map: &HashMap<String, String>) -> Self {
        Self {
            pairs: self.pairs.iter().map(|p| p.substitute(map)).collect(),
        }
    }
}

impl std::fmt::Display for Qpre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ ")?;
        for (i, p) in self.pairs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Pos;
    use crate::operator::Operator;
    use crate::tensor::Tensor;

    fn reg() -> Register {
        Register::new(vec!["q0".into(), "q1".into()]).unwrap()
    }

    fn pair(reg: &Register, names: Vec<String>) -> OpVarPair {
        OpVarPair::new(
            Operator::new(Tensor::eye(names.len())),
            QVarList::new(reg, names).unwrap(),
            OperatorProperty::HermitianPredicate,
            Pos::synthetic(),
        )
        .unwrap()
    }

    #[test]
    fn all_qvarls_is_union_in_first_seen_order() {
        let reg = reg();
        let settings = Settings::default();
        let q = Qpre::new(
            vec![pair(&reg, vec!["q1".into()]), pair(&reg, vec!["q0".into()])],
            &settings,
        )
        .unwrap();
        assert_eq!(q.all_qvarls().names(), &["q1", "q0"]);
    }

    #[test]
    fn union_dedups_under_identical_var_check() {
        let reg = reg();
        let settings = Settings::default();
        let a = Qpre::new(vec![pair(&reg, vec!["q0".into()])], &settings).unwrap();
        let b = Qpre::new(vec![pair(&reg, vec!["q0".into()])], &settings).unwrap();
        let u = a.union(&b, &settings);
        assert_eq!(u.len(), 1);
    }

    #[test]
    fn union_without_check_keeps_duplicates() {
        let reg = reg();
        let mut settings = Settings::default();
        settings.identical_var_check = false;
        let a = Qpre::new(vec![pair(&reg, vec!["q0".into()])], &settings).unwrap();
        let b = Qpre::new(vec![pair(&reg, vec!["q0".into()])], &settings).unwrap();
        let u = a.union(&b, &settings);
        assert_eq!(u.len(), 2);
    }
}
