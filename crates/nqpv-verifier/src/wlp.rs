//! The weakest liberal precondition (WLP) backward transformer:
//! turns a proof hint and a target postcondition into a fully annotated
//! [`ProofStatement`], checking loop invariants, assertions and (Union)
//! compositions as it goes.
//!
//! Every construct's rule reads the current postcondition `Qpre` elementwise
//! (skip/abort/init/unitary just map each pair through a transformation and
//! re-union the results, exactly as §4.4 states); only `if` and `while` ever
//! combine several pairs into one. Testable property 5 (the "(Union) break"
//! equivalence) is what licenses reading the `if`/`while` rules literally —
//! full cross product of `pre1 x pre0` rather than a per-singleton loop —
//! since both give the same `Qpre`.

use nqpv_core::error::{CoreError, CoreResult, Pos};
use nqpv_core::operator::{Operator, OperatorProperty};
use nqpv_core::pair::OpVarPair;
use nqpv_core::proof::{ProofHint, ProofHintKind, ProofStatement, ProofStatementKind};
use nqpv_core::qpre::Qpre;
use nqpv_core::qvar::{QVarList, Register};
use nqpv_core::scope::Scope;
use nqpv_core::settings::Settings;
use nqpv_core::tensor::Tensor;

use crate::order;

/// The register, scope and tolerances a WLP pass runs under. Every freshly
/// computed operator is registered in `scope` (temporaries for
/// deeper postconditions appear in the scope before those for shallower
/// ones" — guaranteed here since we recurse postcondition-to-precondition,
/// i.e. tail-to-head through a `Seq`).
pub struct WlpContext<'a> {
    pub reg: &'a Register,
    pub scope: &'a Scope,
    pub settings: &'a Settings,
}

/// Computes the weakest liberal precondition of `hint` with respect to
/// `post`, building the full annotated [`ProofStatement`] tree.
pub fn wlp(hint: &ProofHint, post: &Qpre, ctx: &WlpContext<'_>) -> CoreResult<ProofStatement> {
    let pos = hint.pos();
    match hint.kind() {
        ProofHintKind::Skip => Ok(ProofStatement::new(ProofStatementKind::Skip, post.clone(), post.clone(), pos)),

        ProofHintKind::Abort => {
            let pre = abort_pre(post, ctx, pos)?;
            Ok(ProofStatement::new(ProofStatementKind::Abort, pre, post.clone(), pos))
        }

        ProofHintKind::Init(v) => {
            let pre = elementwise_map(post, ctx, |pair| init_transform(pair, v, ctx, pos))?;
            Ok(ProofStatement::new(ProofStatementKind::Init(v.clone()), pre, post.clone(), pos))
        }

        ProofHintKind::Unitary(ovp) => {
            let pre = elementwise_map(post, ctx, |pair| unitary_transform(pair, ovp, ctx, pos))?;
            Ok(ProofStatement::new(ProofStatementKind::Unitary(ovp.clone()), pre, post.clone(), pos))
        }

        ProofHintKind::If { measure, then_branch, else_branch } => {
            let then_stmt = wlp(then_branch, post, ctx)?;
            let else_stmt = wlp(else_branch, post, ctx)?;
            let pre = if_cross(measure, then_stmt.pre(), else_stmt.pre(), ctx, pos)?;
            Ok(ProofStatement::new(
                ProofStatementKind::If {
                    measure: measure.clone(),
                    then_branch: then_stmt,
                    else_branch: else_stmt,
                },
                pre,
                post.clone(),
                pos,
            ))
        }

        ProofHintKind::While { measure, invariant, body } => {
            let proposed = while_proposed(measure, invariant, post, ctx, pos)?;
            let body_stmt = wlp(body, &proposed, ctx)?;
            let decision = order::sqsubseteq(invariant, body_stmt.pre(), ctx.reg, ctx.settings)?;
            if !decision.holds {
                tracing::debug!(?pos, "loop invariant failed inductiveness check");
                return Err(invariant_error(&decision, pos));
            }
            Ok(ProofStatement::new(
                ProofStatementKind::While {
                    measure: measure.clone(),
                    invariant: invariant.clone(),
                    body: body_stmt,
                },
                proposed,
                post.clone(),
                pos,
            ))
        }

        ProofHintKind::Choice(branches) => {
            let mut stmts = Vec::with_capacity(branches.len());
            let mut pre = Qpre::empty();
            for b in branches {
                let stmt = wlp(b, post, ctx)?;
                pre = pre.union(stmt.pre(), ctx.settings);
                stmts.push(stmt);
            }
            Ok(ProofStatement::new(ProofStatementKind::Choice(stmts), pre, post.clone(), pos))
        }

        ProofHintKind::Seq(stmts) => {
            let mut cur_post = post.clone();
            let mut built = Vec::with_capacity(stmts.len());
            for s in stmts.iter().rev() {
                let stmt = wlp(s, &cur_post, ctx)?;
                cur_post = stmt.pre().clone();
                built.push(stmt);
            }
            built.reverse();
            Ok(ProofStatement::new(ProofStatementKind::Seq(built), cur_post, post.clone(), pos))
        }

        ProofHintKind::Assert(q) => {
            let decision = order::sqsubseteq(q, post, ctx.reg, ctx.settings)?;
            if !decision.holds {
                return Err(CoreError::AssertionFailed {
                    message: assertion_message(&decision),
                    pos,
                });
            }
            Ok(ProofStatement::new(ProofStatementKind::Assert, q.clone(), post.clone(), pos))
        }

        ProofHintKind::Union(proofs) => {
            let posts = proofs
                .iter()
                .map(terminating_assert)
                .collect::<CoreResult<Vec<_>>>()?;
            check_same_program(proofs, pos)?;
            let union_post = posts.iter().fold(Qpre::empty(), |acc, q| acc.union(q, ctx.settings));
            let decision = order::sqsubseteq(&union_post, post, ctx.reg, ctx.settings)?;
            if !decision.holds {
                return Err(CoreError::UnionMismatch {
                    message: format!(
                        "combined postcondition of the union does not entail the target: {}",
                        assertion_message(&decision)
                    ),
                    pos,
                });
            }
            let mut stmts = Vec::with_capacity(proofs.len());
            let mut pre = Qpre::empty();
            for (p, posti) in proofs.iter().zip(posts.iter()) {
                let stmt = wlp(p, posti, ctx)?;
                pre = pre.union(stmt.pre(), ctx.settings);
                stmts.push(stmt);
            }
            Ok(ProofStatement::new(ProofStatementKind::Union(stmts), pre, post.clone(), pos))
        }
    }
}

/// Applies `f` to every pair of `post` independently, unioning the results —
/// the shared shape of the skip/abort/init/unitary rules.
fn elementwise_map(
    post: &Qpre,
    ctx: &WlpContext<'_>,
    mut f: impl FnMut(&OpVarPair) -> CoreResult<OpVarPair>,
) -> CoreResult<Qpre> {
    let mut acc = Qpre::empty();
    for pair in post.pairs() {
        let mapped = f(pair)?;
        acc = acc.union(&Qpre::new(vec![mapped], ctx.settings)?, ctx.settings);
    }
    Ok(acc)
}

fn register_tensor(tensor: Tensor, ctx: &WlpContext<'_>) -> Operator {
    let op = Operator::new(tensor);
    let _name = ctx.scope.append(op.clone(), ctx.settings);
    op
}

fn abort_pre(post: &Qpre, ctx: &WlpContext<'_>, pos: Pos) -> CoreResult<Qpre> {
    let allv = post.all_qvarls();
    let op = register_tensor(Tensor::eye(allv.len()), ctx);
    let pair = OpVarPair::new(op, allv, OperatorProperty::HermitianPredicate, pos)?;
    Qpre::new(vec![pair], ctx.settings)
}

/// Extends `pair` to cover `extra` too, returning the extended pair and the
/// positions of `extra`'s names within its (possibly widened) qubit list.
fn extend_and_positions(pair: &OpVarPair, extra: &QVarList, ctx: &WlpContext<'_>) -> CoreResult<(OpVarPair, Vec<usize>)> {
    let target = pair.qvls().join(extra);
    let extended = pair.extend_to(&target, ctx.reg)?;
    let idx = idx_within(extended.qvls(), extra);
    Ok((extended, idx))
}

/// Positions of `sub`'s names within `target`, assuming `target` covers `sub`.
fn idx_within(target: &QVarList, sub: &QVarList) -> Vec<usize> {
    sub.names()
        .iter()
        .map(|n| target.names().iter().position(|t| t == n).expect("target covers sub"))
        .collect()
}

fn init_transform(pair: &OpVarPair, v: &QVarList, ctx: &WlpContext<'_>, pos: Pos) -> CoreResult<OpVarPair> {
    let (extended, idx) = extend_and_positions(pair, v, ctx)?;
    let new_tensor = extended.opt().tensor().hermitian_init(&idx)?;
    let op = register_tensor(new_tensor, ctx);
    OpVarPair::new(op, extended.qvls().clone(), OperatorProperty::HermitianPredicate, pos)
}

fn unitary_transform(pair: &OpVarPair, ovp: &OpVarPair, ctx: &WlpContext<'_>, pos: Pos) -> CoreResult<OpVarPair> {
    let (extended, idx) = extend_and_positions(pair, ovp.qvls(), ctx)?;
    let u_dagger = ovp.dagger()?;
    let new_tensor = extended.opt().tensor().hermitian_contract(&idx, u_dagger.opt().tensor())?;
    let op = register_tensor(new_tensor, ctx);
    OpVarPair::new(op, extended.qvls().clone(), OperatorProperty::HermitianPredicate, pos)
}

fn measure_outcomes_as_tensors(measure: &OpVarPair) -> CoreResult<(Tensor, Tensor)> {
    let n = measure.qvls().len();
    let (m0_mat, m1_mat) = measure.opt().tensor().measurement_outcomes()?;
    Ok((Tensor::from_matrix(m0_mat, n)?, Tensor::from_matrix(m1_mat, n)?))
}

/// `if(mea, P1, P0)`'s own rule: for every `(H1, ql1) in pre1`
/// and `(H0, ql0) in pre0`, emit `contract(H0, M0) + contract(H1, M1)`,
/// first extending `H0`/`H1` to cover both each other and the measured
/// qubits.
fn if_cross(measure: &OpVarPair, pre1: &Qpre, pre0: &Qpre, ctx: &WlpContext<'_>, pos: Pos) -> CoreResult<Qpre> {
    let (m0, m1) = measure_outcomes_as_tensors(measure)?;
    let mut acc = Qpre::empty();
    for h0 in pre0.pairs() {
        for h1 in pre1.pairs() {
            let target = h0.qvls().join(h1.qvls()).join(measure.qvls());
            let h0e = h0.extend_to(&target, ctx.reg)?;
            let h1e = h1.extend_to(&target, ctx.reg)?;
            let idx = idx_within(&target, measure.qvls());
            let t0 = h0e.opt().tensor().hermitian_contract(&idx, &m0)?;
            let t1 = h1e.opt().tensor().hermitian_contract(&idx, &m1)?;
            let sum = t0.add(&t1)?;
            let op = register_tensor(sum, ctx);
            let pair = OpVarPair::new(op, target.clone(), OperatorProperty::HermitianPredicate, pos)?;
            acc = acc.union(&Qpre::new(vec![pair], ctx.settings)?, ctx.settings);
        }
    }
    Ok(acc)
}

/// `while(mea, inv, S)`'s proposed precondition: for every
/// `(H, ql) in post` and `(I_k, qlk) in invariant`, emit
/// `contract(H, M0) + contract(I_k, M1)`.
fn while_proposed(measure: &OpVarPair, invariant: &Qpre, post: &Qpre, ctx: &WlpContext<'_>, pos: Pos) -> CoreResult<Qpre> {
    let (m0, m1) = measure_outcomes_as_tensors(measure)?;
    let mut acc = Qpre::empty();
    for h in post.pairs() {
        for invp in invariant.pairs() {
            let target = h.qvls().join(invp.qvls()).join(measure.qvls());
            let he = h.extend_to(&target, ctx.reg)?;
            let inve = invp.extend_to(&target, ctx.reg)?;
            let idx = idx_within(&target, measure.qvls());
            let t0 = he.opt().tensor().hermitian_contract(&idx, &m0)?;
            let t1 = inve.opt().tensor().hermitian_contract(&idx, &m1)?;
            let sum = t0.add(&t1)?;
            let op = register_tensor(sum, ctx);
            let pair = OpVarPair::new(op, target.clone(), OperatorProperty::HermitianPredicate, pos)?;
            acc = acc.union(&Qpre::new(vec![pair], ctx.settings)?, ctx.settings);
        }
    }
    Ok(acc)
}

/// Finds the `Qpre` a hint's proof ends on: the `Qpre` of its trailing
/// `assert`, following through `Seq` to the last statement.
fn terminating_assert(hint: &ProofHint) -> CoreResult<Qpre> {
    match hint.kind() {
        ProofHintKind::Assert(q) => Ok(q.clone()),
        ProofHintKind::Seq(stmts) => match stmts.last() {
            Some(last) => terminating_assert(last),
            None => Err(CoreError::UnionMismatch {
                message: "empty sequence has no terminating assertion".into(),
                pos: hint.pos(),
            }),
        },
        _ => Err(CoreError::UnionMismatch {
            message: "a (Union) branch must end in an explicit assertion".into(),
            pos: hint.pos(),
        }),
    }
}

/// Best-effort structural check that every branch of a (Union) proves the
/// same underlying program: recurses through the hint tree, ignoring
/// `assert`/invariant annotations (which legitimately differ between
/// branches) but requiring the same construct shape and operators elsewhere.
fn check_same_program(proofs: &[ProofHint], pos: Pos) -> CoreResult<()> {
    let mut iter = proofs.iter();
    let Some(first) = iter.next() else { return Ok(()) };
    for other in iter {
        if !same_shape(first, other) {
            return Err(CoreError::UnionMismatch {
                message: "(Union) branches do not prove the same program".into(),
                pos,
            });
        }
    }
    Ok(())
}

fn same_shape(a: &ProofHint, b: &ProofHint) -> bool {
    match (a.kind(), b.kind()) {
        (ProofHintKind::Assert(_), ProofHintKind::Assert(_)) => true,
        (ProofHintKind::Skip, ProofHintKind::Skip) | (ProofHintKind::Abort, ProofHintKind::Abort) => true,
        (ProofHintKind::Init(v1), ProofHintKind::Init(v2)) => v1.names() == v2.names(),
        (ProofHintKind::Unitary(u1), ProofHintKind::Unitary(u2)) => u1.approx_eq(u2, 1e-9),
        (
            ProofHintKind::If { measure: m1, then_branch: t1, else_branch: e1 },
            ProofHintKind::If { measure: m2, then_branch: t2, else_branch: e2 },
        ) => m1.approx_eq(m2, 1e-9) && same_shape(t1, t2) && same_shape(e1, e2),
        (
            ProofHintKind::While { measure: m1, body: b1, .. },
            ProofHintKind::While { measure: m2, body: b2, .. },
        ) => m1.approx_eq(m2, 1e-9) && same_shape(b1, b2),
        (ProofHintKind::Choice(c1), ProofHintKind::Choice(c2)) => {
            c1.len() == c2.len() && c1.iter().zip(c2).all(|(x, y)| same_shape(x, y))
        }
        (ProofHintKind::Seq(s1), ProofHintKind::Seq(s2)) => {
            s1.len() == s2.len() && s1.iter().zip(s2).all(|(x, y)| same_shape(x, y))
        }
        (ProofHintKind::Union(u1), ProofHintKind::Union(u2)) => {
            u1.len() == u2.len() && u1.iter().zip(u2).all(|(x, y)| same_shape(x, y))
        }
        _ => false,
    }
}

fn invariant_error(decision: &order::OrderOutcome, pos: Pos) -> CoreError {
    CoreError::InvariantNotInductive {
        message: assertion_message(decision),
        pos,
    }
}

fn assertion_message(decision: &order::OrderOutcome) -> String {
    match &decision.witness {
        Some(w) => format!("order relation does not hold; {w}"),
        None => "order relation does not hold".to_string(),
    }
}

/// Verifies a declared signature: `pre` must
/// refine `wlp(hint, post)` once both are extended to their combined qubit
/// list.
pub fn verify_signature(
    declared_pre: &Qpre,
    hint: &ProofHint,
    declared_post: &Qpre,
    ctx: &WlpContext<'_>,
) -> CoreResult<ProofStatement> {
    tracing::info!(pos = ?hint.pos(), "running wlp backward transformer over signature");
    let stmt = wlp(hint, declared_post, ctx)?;
    let decision = order::sqsubseteq(declared_pre, stmt.pre(), ctx.reg, ctx.settings)?;
    if !decision.holds {
        tracing::debug!(pos = ?hint.pos(), "precondition refinement failed");
        return Err(CoreError::RefinementFailed {
            message: assertion_message(&decision),
            pos: hint.pos(),
        });
    }
    Ok(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nqpv_core::error::Pos;

    fn reg2() -> Register {
        Register::new(vec!["q0".into(), "q1".into()]).unwrap()
    }

    fn herm_pair(reg: &Register, name: &str, t: Tensor) -> OpVarPair {
        OpVarPair::new(
            Operator::new(t),
            QVarList::new(reg, vec![name.into()]).unwrap(),
            OperatorProperty::HermitianPredicate,
            Pos::synthetic(),
        )
        .unwrap()
    }

    #[test]
    fn skip_wlp_is_identity_on_postcondition() {
        let reg = reg2();
        let settings = Settings::default();
        let root = Scope::root("test");
        let ctx = WlpContext { reg: &reg, scope: &root, settings: &settings };
        let post = Qpre::new(vec![herm_pair(&reg, "q0", Tensor::eye(1))], &settings).unwrap();
        let hint = ProofHint::skip(Pos::synthetic());
        let stmt = wlp(&hint, &post, &ctx).unwrap();
        assert_eq!(stmt.pre().len(), 1);
        assert_eq!(stmt.post().len(), 1);
    }

    #[test]
    fn abort_wlp_is_identity_on_all_qvarls() {
        let reg = reg2();
        let settings = Settings::default();
        let root = Scope::root("test");
        let ctx = WlpContext { reg: &reg, scope: &root, settings: &settings };
        let post = Qpre::new(vec![herm_pair(&reg, "q0", Tensor::eye(1))], &settings).unwrap();
        let hint = ProofHint::abort(Pos::synthetic());
        let stmt = wlp(&hint, &post, &ctx).unwrap();
        assert_eq!(stmt.pre().len(), 1);
        assert_eq!(stmt.pre().pairs()[0].qvls().names(), &["q0"]);
    }

    #[test]
    fn seq_recurses_tail_to_head() {
        let reg = reg2();
        let settings = Settings::default();
        let root = Scope::root("test");
        let ctx = WlpContext { reg: &reg, scope: &root, settings: &settings };
        let post = Qpre::new(vec![herm_pair(&reg, "q0", Tensor::eye(1))], &settings).unwrap();
        let hint = ProofHint::seq(
            vec![ProofHint::skip(Pos::synthetic()), ProofHint::skip(Pos::synthetic())],
            Pos::synthetic(),
        );
        let stmt = wlp(&hint, &post, &ctx).unwrap();
        assert_eq!(stmt.pre().len(), 1);
    }

    #[test]
    fn assert_requires_entailment_by_postcondition() {
        let reg = reg2();
        let settings = Settings::default();
        let root = Scope::root("test");
        let ctx = WlpContext { reg: &reg, scope: &root, settings: &settings };
        let post = Qpre::new(vec![herm_pair(&reg, "q0", Tensor::eye(1))], &settings).unwrap();
        let hint = ProofHint::assert_hint(post.clone(), Pos::synthetic());
        assert!(wlp(&hint, &post, &ctx).is_ok());
    }
}
