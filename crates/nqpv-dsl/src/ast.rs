//! Surface syntax tree produced by the parser, one level above the
//! `nqpv-core` value model: identifiers are still dotted paths and operator
//! references are still names, not yet resolved against a scope.

use nqpv_core::error::Pos;

/// A dotted identifier path, e.g. `lib.gates.H`.
pub type VarPath = Vec<String>;

/// A bracketed qubit-variable list, `[q0 q1 q2]`.
pub type QVarLit = Vec<String>;

/// `{ pair1 pair2 ... }`: a set of named-operator/qvar-list pairs.
pub type PredicateLit = Vec<(VarPath, QVarLit)>;

#[derive(Debug, Clone)]
pub struct Module {
    pub cmds: Vec<Cmd>,
}

#[derive(Debug, Clone)]
pub enum Cmd {
    Def { name: String, expr: Expr, pos: Pos },
    Show { expr: Expr, pos: Pos },
    /// `axiom id : pre program <qvls> post end` — asserts a signature for an
    /// externally declared (unverified) program, bound as a callable symbol.
    Axiom {
        name: String,
        pre: PredicateLit,
        qvars: QVarLit,
        post: PredicateLit,
        pos: Pos,
    },
    Setting { key: SettingKey, value: SettingValue, pos: Pos },
    Save { var: VarPath, path: String, pos: Pos },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Eps,
    SdpPrecision,
    Silent,
    IdenticalVarCheck,
    OptPreserving,
}

#[derive(Debug, Clone)]
pub enum SettingValue {
    Float(f64),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Scope(Vec<Cmd>),
    Load(String),
    Import(String),
    Program { qvars: QVarLit, body: Prog },
    Proof {
        qvars: QVarLit,
        pre: PredicateLit,
        body: Vec<ProofStmt>,
        post: PredicateLit,
    },
    Var(VarPath),
}

/// A `;`-separated sequence of program statements.
#[derive(Debug, Clone, Default)]
pub struct Prog(pub Vec<ProgStmt>);

#[derive(Debug, Clone)]
pub enum ProgStmt {
    Skip(Pos),
    Abort(Pos),
    /// `<qvls> :=0`
    Init(QVarLit, Pos),
    /// `<qvls> *= <opt>`
    Unitary { opt: VarPath, qvars: QVarLit, pos: Pos },
    /// `if <opt><qvls> then S1 else S0 end`
    If {
        opt: VarPath,
        qvars: QVarLit,
        then_branch: Prog,
        else_branch: Prog,
        pos: Pos,
    },
    /// `while <opt><qvls> do S end`
    While { opt: VarPath, qvars: QVarLit, body: Prog, pos: Pos },
    /// `(S1 # S2 # ...)`
    Nondet(Vec<Prog>, Pos),
    /// Bare `var qvar_ls`: a subprogram call by name.
    Call { name: VarPath, qvars: QVarLit, pos: Pos },
}

#[derive(Debug, Clone)]
pub enum ProofStmt {
    Skip(Pos),
    Abort(Pos),
    Init(QVarLit, Pos),
    Unitary { opt: VarPath, qvars: QVarLit, pos: Pos },
    If {
        opt: VarPath,
        qvars: QVarLit,
        then_branch: Vec<ProofStmt>,
        else_branch: Vec<ProofStmt>,
        pos: Pos,
    },
    /// `{ inv: pair ... } ; while <opt><qvls> do S end`
    While {
        invariant: PredicateLit,
        opt: VarPath,
        qvars: QVarLit,
        body: Vec<ProofStmt>,
        pos: Pos,
    },
    Nondet(Vec<Vec<ProofStmt>>, Pos),
    /// `(S1, S2, ...)`: several proofs of the same program.
    Union(Vec<Vec<ProofStmt>>, Pos),
    Call { name: VarPath, qvars: QVarLit, pos: Pos },
    /// A bracketed predicate appearing mid-sequence: an explicit assertion.
    Assert(PredicateLit, Pos),
}
