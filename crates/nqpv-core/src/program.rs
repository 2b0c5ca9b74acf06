//! The program abstract syntax tree: a single sum type over the eight
//! constructs of the nondeterministic quantum while-language, each node
//! caching the union of every qubit name it (transitively) mentions.
//!
//! Per §9's "deep class hierarchy" redesign note, there is no
//! `ProgSttTerm` base class: `all_qvarls`, substitution and printing are
//! total functions over [`ProgramKind`]'s variants instead of virtual
//! dispatch.

use std::rc::Rc;

use crate::error::Pos;
use crate::pair::OpVarPair;
use crate::qvar::QVarList;

/// A program term, immutable and cheap to clone (an `Rc` handle).
#[derive(Debug, Clone)]
pub struct Program(Rc<ProgramInner>);

#[derive(Debug)]
struct ProgramInner {
    kind: ProgramKind,
    vars: QVarList,
    pos: Pos,
}

/// The eight program constructs of the while-language.
#[derive(Debug, Clone)]
pub enum ProgramKind {
    Skip,
    Abort,
    /// `<qvls> :=0`
    Init(QVarList),
    /// `<qvls> *= <opt>`
    Unitary(OpVarPair),
    /// `if <opt><qvls> then S1 else S0 end`
    If {
        measure: OpVarPair,
        then_branch: Program,
        else_branch: Program,
    },
    /// `while <opt><qvls> do S end`
    While { measure: OpVarPair, body: Program },
    /// `(S1 # S2 # ...)`
    Choice(Vec<Program>),
    /// `S1 ; S2 ; ...`
    Seq(Vec<Program>),
}

impl Program {
    pub fn kind(&self) -> &ProgramKind {
        &self.0.kind
    }

    pub fn pos(&self) -> Pos {
        self.0.pos
    }

    /// `all_qvarls(S)`: every qubit name mentioned anywhere in this term.
    pub fn all_qvarls(&self) -> &QVarList {
        &self.0.vars
    }

    pub fn skip(pos: Pos) -> Self {
        Self::build(ProgramKind::Skip, QVarList::empty(), pos)
    }

    pub fn abort(pos: Pos) -> Self {
        Self::build(ProgramKind::Abort, QVarList::empty(), pos)
    }

    pub fn init(vls: QVarList, pos: Pos) -> Self {
        let vars = vls.clone();
        Self::build(ProgramKind::Init(vls), vars, pos)
    }

    pub fn unitary(ovp: OpVarPair, pos: Pos) -> Self {
        let vars = ovp.qvls().clone();
        Self::build(ProgramKind::Unitary(ovp), vars, pos)
    }

    pub fn if_then_else(measure: OpVarPair, then_branch: Program, else_branch: Program, pos: Pos) -> Self {
        let vars = measure
            .qvls()
            .join(then_branch.all_qvarls())
            .join(else_branch.all_qvarls());
        Self::build(
            ProgramKind::If {
                measure,
                then_branch,
                else_branch,
            },
            vars,
            pos,
        )
    }

    pub fn while_loop(measure: OpVarPair, body: Program, pos: Pos) -> Self {
        let vars = measure.qvls().join(body.all_qvarls());
        Self::build(ProgramKind::While { measure, body }, vars, pos)
    }

    pub fn choice(branches: Vec<Program>, pos: Pos) -> Self {
        let vars = branches
            .iter()
            .fold(QVarList::empty(), |acc, p| acc.join(p.all_qvarls()));
        Self::build(ProgramKind::Choice(branches), vars, pos)
    }

    /// Builds a sequential composition, flattening nested `Seq` nodes so
    /// `seq(S1; seq(S2; S3))` and `seq(S1; S2; S3)` are represented
    /// identically.
    pub fn seq(stmts: Vec<Program>, pos: Pos) -> Self {
        let mut flat = Vec::with_capacity(stmts.len());
        for s in stmts {
            match s.kind() {
                ProgramKind::Seq(inner) => flat.extend(inner.iter().cloned()),
                _ => flat.push(s),
            }
        }
        if flat.len() == 1 {
            return flat.into_iter().next().unwrap();
        }
        let vars = flat
            .iter()
            .fold(QVarList::empty(), |acc, p| acc.join(p.all_qvarls()));
        Self::build(ProgramKind::Seq(flat), vars, pos)
    }

    fn build(kind: ProgramKind, vars: QVarList, pos: Pos) -> Self {
        Self(Rc::new(ProgramInner { kind, vars, pos }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Pos;
    use crate::operator::{Operator, OperatorProperty};
    use crate::qvar::Register;
    use crate::tensor::Tensor;

    fn reg() -> Register {
        Register::new(vec!["q0".into(), "q1".into()]).unwrap()
    }

    fn unitary_pair(reg: &Register, name: &str) -> OpVarPair {
        OpVarPair::new(
            Operator::new(Tensor::eye(1)),
            QVarList::new(reg, vec![name.into()]).unwrap(),
            OperatorProperty::Unitary,
            Pos::synthetic(),
        )
        .unwrap()
    }

    #[test]
    fn seq_flattens_nested_sequences() {
        let reg = reg();
        let u0 = Program::unitary(unitary_pair(&reg, "q0"), Pos::synthetic());
        let u1 = Program::unitary(unitary_pair(&reg, "q1"), Pos::synthetic());
        let nested = Program::seq(vec![u0.clone(), u1.clone()], Pos::synthetic());
        let flat = Program::seq(vec![u0, nested], Pos::synthetic());
        match flat.kind() {
            ProgramKind::Seq(stmts) => assert_eq!(stmts.len(), 3),
            _ => panic!("expected Seq"),
        }
    }

    #[test]
    fn if_all_qvarls_unions_measure_and_both_branches() {
        let reg = reg();
        let then_branch = Program::unitary(unitary_pair(&reg, "q0"), Pos::synthetic());
        let else_branch = Program::unitary(unitary_pair(&reg, "q1"), Pos::synthetic());
        let measure = unitary_pair(&reg, "q0");
        let node = Program::if_then_else(measure, then_branch, else_branch, Pos::synthetic());
        assert_eq!(node.all_qvarls().names(), &["q0", "q1"]);
    }
}
