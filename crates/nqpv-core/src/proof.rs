//! The proof-hint abstract syntax tree (a program annotated with loop
//! invariants, explicit assertions and (Union) composition) and the
//! annotated proof-statement value the WLP transformer produces from it.

use std::rc::Rc;

use crate::error::Pos;
use crate::pair::OpVarPair;
use crate::qpre::Qpre;
use crate::qvar::QVarList;

/// A proof-hint term: mirrors [`crate::program::ProgramKind`] plus
/// `assert` and `union`.
#[derive(Debug, Clone)]
pub struct ProofHint(Rc<ProofHintInner>);

#[derive(Debug)]
struct ProofHintInner {
    kind: ProofHintKind,
    vars: QVarList,
    pos: Pos,
}

#[derive(Debug, Clone)]
pub enum ProofHintKind {
    Skip,
    Abort,
    Init(QVarList),
    Unitary(OpVarPair),
    If {
        measure: OpVarPair,
        then_branch: ProofHint,
        else_branch: ProofHint,
    },
    /// `while` additionally carries the user-supplied loop invariant.
    While {
        measure: OpVarPair,
        invariant: Qpre,
        body: ProofHint,
    },
    Choice(Vec<ProofHint>),
    Seq(Vec<ProofHint>),
    /// `{ pair1 pair2 ... }`: a pre/post-condition hint.
    Assert(Qpre),
    /// `(S1, S2, ...)`: several proofs of the same program, composed by
    /// union of their preconditions.
    Union(Vec<ProofHint>),
}

impl ProofHint {
    pub fn kind(&self) -> &ProofHintKind {
        &self.0.kind
    }

    pub fn pos(&self) -> Pos {
        self.0.pos
    }

    pub fn all_qvarls(&self) -> &QVarList {
        &self.0.vars
    }

    pub fn skip(pos: Pos) -> Self {
        Self::build(ProofHintKind::Skip, QVarList::empty(), pos)
    }

    pub fn abort(pos: Pos) -> Self {
        Self::build(ProofHintKind::Abort, QVarList::empty(), pos)
    }

    pub fn init(vls: QVarList, pos: Pos) -> Self {
        let vars = vls.clone();
        Self::build(ProofHintKind::Init(vls), vars, pos)
    }

    pub fn unitary(ovp: OpVarPair, pos: Pos) -> Self {
        let vars = ovp.qvls().clone();
        Self::build(ProofHintKind::Unitary(ovp), vars, pos)
    }

    pub fn if_then_else(measure: OpVarPair, then_branch: ProofHint, else_branch: ProofHint, pos: Pos) -> Self {
        let vars = measure
            .qvls()
            .join(then_branch.all_qvarls())
            .join(else_branch.all_qvarls());
        Self::build(
            ProofHintKind::If {
                measure,
                then_branch,
                else_branch,
            },
            vars,
            pos,
        )
    }

    pub fn while_loop(measure: OpVarPair, invariant: Qpre, body: ProofHint, pos: Pos) -> Self {
        let vars = measure
            .qvls()
            .join(&invariant.all_qvarls())
            .join(body.all_qvarls());
        Self::build(
            ProofHintKind::While {
                measure,
                invariant,
                body,
            },
            vars,
            pos,
        )
    }

    pub fn choice(branches: Vec<ProofHint>, pos: Pos) -> Self {
        let vars = branches
            .iter()
            .fold(QVarList::empty(), |acc, p| acc.join(p.all_qvarls()));
        Self::build(ProofHintKind::Choice(branches), vars, pos)
    }

    pub fn seq(stmts: Vec<ProofHint>, pos: Pos) -> Self {
        let mut flat = Vec::with_capacity(stmts.len());
        for s in stmts {
            match s.kind() {
                ProofHintKind::Seq(inner) => flat.extend(inner.iter().cloned()),
                _ => flat.push(s),
            }
        }
        if flat.len() == 1 {
            return flat.into_iter().next().unwrap();
        }
        let vars = flat
            .iter()
            .fold(QVarList::empty(), |acc, p| acc.join(p.all_qvarls()));
        Self::build(ProofHintKind::Seq(flat), vars, pos)
    }

    pub fn assert_hint(pre: Qpre, pos: Pos) -> Self {
        let vars = pre.all_qvarls();
        Self::build(ProofHintKind::Assert(pre), vars, pos)
    }

    pub fn union(proofs: Vec<ProofHint>, pos: Pos) -> Self {
        let vars = proofs
            .iter()
            .fold(QVarList::empty(), |acc, p| acc.join(p.all_qvarls()));
        Self::build(ProofHintKind::Union(proofs), vars, pos)
    }

    fn build(kind: ProofHintKind, vars: QVarList, pos: Pos) -> Self {
        Self(Rc::new(ProofHintInner { kind, vars, pos }))
    }
}

/// A fully annotated proof: mirrors [`ProofHintKind`]'s structure, but every
/// node additionally carries the concrete precondition and postcondition
/// `Qpre` computed for it by the WLP transformer.
#[derive(Debug, Clone)]
pub struct ProofStatement(Rc<ProofStatementInner>);

#[derive(Debug)]
struct ProofStatementInner {
    kind: ProofStatementKind,
    pre: Qpre,
    post: Qpre,
    pos: Pos,
}

#[derive(Debug, Clone)]
pub enum ProofStatementKind {
    Skip,
    Abort,
    Init(QVarList),
    Unitary(OpVarPair),
    If {
        measure: OpVarPair,
        then_branch: ProofStatement,
        else_branch: ProofStatement,
    },
    While {
        measure: OpVarPair,
        invariant: Qpre,
        body: ProofStatement,
    },
    Choice(Vec<ProofStatement>),
    Seq(Vec<ProofStatement>),
    Assert,
    Union(Vec<ProofStatement>),
}

impl ProofStatement {
    pub fn new(kind: ProofStatementKind, pre: Qpre, post: Qpre, pos: Pos) -> Self {
        Self(Rc::new(ProofStatementInner { kind, pre, post, pos }))
    }

    pub fn kind(&self) -> &ProofStatementKind {
        &self.0.kind
    }

    pub fn pre(&self) -> &Qpre {
        &self.0.pre
    }

    pub fn post(&self) -> &Qpre {
        &self.0.post
    }

    pub fn pos(&self) -> Pos {
        self.0.pos
    }
}
