//! Operator/variable pairs (OVPs): an [`Operator`] paired with the
//! [`QVarList`] of qubits it acts on.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, Pos};
use crate::operator::{Operator, OperatorProperty};
use crate::qvar::{QVarList, Register};
use crate::settings::Settings;

/// An operator paired with the qubits it acts on. `opt.qnum() == qvls.len()`
/// is an invariant enforced at construction time.
#[derive(Debug, Clone)]
pub struct OpVarPair {
    opt: Operator,
    qvls: QVarList,
    pos: Pos,
}

impl OpVarPair {
    /// Pairs `opt` with `qvls`, checking their ranks agree.
    ///
    /// `opt`'s qubit count is inferred from its required property: a
    /// measurement tensor reserves one extra axis for the outcome index, so
    /// `qnum = (rank - 1) / 2`; any other pair type uses `qnum = rank / 2`.
    pub fn new(opt: Operator, qvls: QVarList, property: OperatorProperty, pos: Pos) -> CoreResult<Self> {
        let rank = opt.tensor().rank();
        let qnum = match property {
            OperatorProperty::Measurement => {
                if rank == 0 || rank % 2 == 0 {
                    return Err(CoreError::ShapeMismatch {
                        message: format!("measurement tensor must have odd rank, got {rank}"),
                        pos,
                    });
                }
                (rank - 1) / 2
            }
            OperatorProperty::Unitary | OperatorProperty::HermitianPredicate => {
                if rank % 2 != 0 {
                    return Err(CoreError::ShapeMismatch {
                        message: format!("operator tensor must have even rank, got {rank}"),
                        pos,
                    });
                }
                rank / 2
            }
        };
        if qnum != qvls.len() {
            return Err(CoreError::ShapeMismatch {
                message: format!(
                    "operator acts on {qnum} qubit(s) but {} were named in {qvls}",
                    qvls.len()
                ),
                pos,
            });
        }
        Ok(Self { opt, qvls, pos })
    }

    pub fn opt(&self) -> &Operator {
        &self.opt
    }

    pub fn qvls(&self) -> &QVarList {
        &self.qvls
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    /// Whether this pair has `property`: the underlying operator has it,
    /// and (checked at construction) its rank matches `qvls`.
    pub fn check_property(&self, property: OperatorProperty, settings: &Settings) -> CoreResult<bool> {
        self.opt.check_property(property, settings)
    }

    pub fn require_property(&self, property: OperatorProperty, settings: &Settings) -> CoreResult<()> {
        self.opt.require_property(property, "<pair>", settings, self.pos)
    }

    /// The dagger of this pair: `opt†` over the same qubits.
    pub fn dagger(&self) -> CoreResult<Self> {
        Ok(Self {
            opt: Operator::new(self.opt.tensor().dagger()?),
            qvls: self.qvls.clone(),
            pos: self.pos,
        })
    }

    /// Substitutes qubit names per `map`, leaving the operator untouched.
    pub fn substitute(&self, map: &HashMap<String, String>) -> Self {
        Self {
            opt: self.opt.clone(),
            qvls: self.qvls.substitute(map),
            pos: self.pos,
        }
    }

    /// Extends this pair's operator to act over `target` (which must cover
    /// this pair's `qvls`), tensoring with identity on the newly named
    /// qubits and permuting axes to match `target`'s order.
    pub fn extend_to(&self, target: &QVarList, reg: &Register) -> CoreResult<Self> {
        if !target.covers(&self.qvls) {
            return Err(CoreError::InvalidQvl {
                message: format!("{target} does not cover {}", self.qvls),
                pos: self.pos,
            });
        }
        if target.names() == self.qvls.names() {
            return Ok(self.clone());
        }
        let h_idx: Vec<usize> = self
            .qvls
            .names()
            .iter()
            .map(|n| target.names().iter().position(|m| m == n).expect("covered above"))
            .collect();
        let extended = self.opt.tensor().hermitian_extend(target.len(), &h_idx)?;
        let _ = reg;
        Ok(Self {
            opt: Operator::new(extended),
            qvls: target.clone(),
            pos: self.pos,
        })
    }

    /// Adds two Hermitian-predicate pairs, automatically extending both to
    /// the join of their qubit lists first.
    pub fn add(&self, other: &Self, reg: &Register, settings: &Settings) -> CoreResult<Self> {
        self.require_property(OperatorProperty::HermitianPredicate, settings)?;
        other.require_property(OperatorProperty::HermitianPredicate, settings)?;
        let target = self.qvls.join(&other.qvls);
        let lhs = self.extend_to(&target, reg)?;
        let rhs = other.extend_to(&target, reg)?;
        Ok(Self {
            opt: Operator::new(lhs.opt.tensor().add(rhs.opt.tensor())?),
            qvls: target,
            pos: self.pos,
        })
    }

    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.qvls == other.qvls && self.opt.approx_eq(&other.opt, eps)
    }
}

impl std::fmt::Display for OpVarPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qvls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn reg3() -> Register {
        Register::new(vec!["q0".into(), "q1".into(), "q2".into()]).unwrap()
    }

    #[test]
    fn rejects_rank_qvl_mismatch() {
        let op = Operator::new(Tensor::eye(1));
        let reg = reg3();
        let qvls = QVarList::new(&reg, vec!["q0".into(), "q1".into()]).unwrap();
        let err = OpVarPair::new(op, qvls, OperatorProperty::HermitianPredicate, Pos::synthetic());
        assert!(err.is_err());
    }

    #[test]
    fn extend_to_widens_qvls_and_preserves_identity() {
        let reg = reg3();
        let op = Operator::new(Tensor::eye(1));
        let qvls = QVarList::new(&reg, vec!["q0".into()]).unwrap();
        let pair = OpVarPair::new(op, qvls, OperatorProperty::HermitianPredicate, Pos::synthetic()).unwrap();
        let target = QVarList::new(&reg, vec!["q0".into(), "q1".into()]).unwrap();
        let extended = pair.extend_to(&target, &reg).unwrap();
        assert_eq!(extended.qvls().names(), target.names());
        assert!(extended.opt().tensor().approx_eq(&Tensor::eye(2), 1e-9));
    }

    #[test]
    fn add_extends_to_join_before_combining() {
        let reg = reg3();
        let settings = Settings::default();
        let a = OpVarPair::new(
            Operator::new(Tensor::eye(1)),
            QVarList::new(&reg, vec!["q0".into()]).unwrap(),
            OperatorProperty::HermitianPredicate,
            Pos::synthetic(),
        )
        .unwrap();
        let b = OpVarPair::new(
            Operator::new(Tensor::eye(1)),
            QVarList::new(&reg, vec!["q1".into()]).unwrap(),
            OperatorProperty::HermitianPredicate,
            Pos::synthetic(),
        )
        .unwrap();
        let sum = a.add(&b, &reg, &settings).unwrap();
        assert_eq!(sum.qvls().names(), &["q0", "q1"]);
    }
}
