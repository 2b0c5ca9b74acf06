//! Module evaluator: lowers the surface AST into `nqpv-core` values, resolves
//! dotted-path references against a tree of environments, inlines named
//! program/proof calls by qubit-name substitution, and drives WLP
//! verification for `proof` expressions.
//!
//! Each top-level command is evaluated independently: a failure in one
//! `def`/`show`/`axiom`/`setting`/`save` does not prevent the remaining
//! commands in the same module from running, mirroring a script that reports
//! one error per statement rather than aborting the whole file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;

use nqpv_core::error::{CoreError, Pos};
use nqpv_core::operator::OperatorProperty;
use nqpv_core::pair::OpVarPair;
use nqpv_core::proof::ProofHintKind;
use nqpv_core::program::ProgramKind;
use nqpv_core::qpre::Qpre;
use nqpv_core::qvar::{QVarList, Register};
use nqpv_core::scope::Scope;
use nqpv_core::settings::Settings;
use nqpv_core::{Operator, Program, ProofHint};
use nqpv_verifier::{verify_signature, WlpContext};

use crate::ast::{Cmd, Expr, PredicateLit, Prog, ProgStmt, ProofStmt, QVarLit, SettingKey, SettingValue, VarPath};
use crate::{npy, parser, stdlib, DslError, DslResult};

/// A value bound to a name: either something the proof system understands
/// directly, an externally assumed signature, or a nested module.
#[derive(Clone)]
pub enum Value {
    Operator(Operator),
    Program(Program),
    Proof(ProofHint),
    /// An `axiom`-declared signature: assumed, not verified.
    Signature { pre: Qpre, qvars: QVarList, post: Qpre },
    Module(Rc<Environment>),
}

impl Value {
    /// The underlying operator tensor, if this value is one.
    pub fn as_operator(&self) -> Option<&Operator> {
        match self {
            Value::Operator(op) => Some(op),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Operator(op) => format!("operator (rank {})", op.tensor().rank()),
            Value::Program(p) => format!("program over {}", p.all_qvarls()),
            Value::Proof(h) => format!("proof hint over {}", h.all_qvarls()),
            Value::Signature { qvars, .. } => format!("assumed signature over {qvars}"),
            Value::Module(env) => format!("module '{}' ({} binding(s))", env.label, env.local_len()),
        }
    }
}

/// A node in the tree of module/scope environments evaluation builds as it
/// walks a `.nqpv` file: a dynamically-grown qubit register and tolerance
/// settings shared with every descendant, plus a local symbol table of its
/// own `def`/`axiom` bindings and a WLP scratch [`Scope`] for proof
/// temporaries.
pub struct Environment {
    label: String,
    parent: Option<Rc<Environment>>,
    register: Rc<RefCell<Register>>,
    settings: Rc<RefCell<Settings>>,
    core_scope: Rc<Scope>,
    values: RefCell<IndexMap<String, Value>>,
}

impl Environment {
    /// A fresh root environment with the standard operator library already
    /// bound under its plain names (`I`, `X`, `H`, `M01`, ...).
    pub fn new_root() -> DslResult<Rc<Self>> {
        Self::new_root_with_settings(Settings::default())
    }

    /// A fresh root environment seeded with `settings` instead of
    /// [`Settings::default`], so a persisted settings file can supply the
    /// starting tolerances before any in-module `setting` command runs.
    pub fn new_root_with_settings(settings: Settings) -> DslResult<Rc<Self>> {
        let env = Rc::new(Self {
            label: "root".to_string(),
            parent: None,
            register: Rc::new(RefCell::new(Register::new(Vec::new()).expect("empty register"))),
            settings: Rc::new(RefCell::new(settings)),
            core_scope: Rc::new(Scope::root("root")),
            values: RefCell::new(IndexMap::new()),
        });
        for (name, tensor, _property) in stdlib::entries().map_err(DslError::Core)? {
            let op = Operator::new(tensor);
            env.core_scope.insert(name, op.clone());
            env.values.borrow_mut().insert(name.to_string(), Value::Operator(op));
        }
        Ok(env)
    }

    fn child(self: &Rc<Self>, label: impl Into<String>) -> Rc<Self> {
        let label = label.into();
        Rc::new(Self {
            core_scope: Rc::new(self.core_scope.child(label.clone())),
            label,
            parent: Some(Rc::clone(self)),
            register: Rc::clone(&self.register),
            settings: Rc::clone(&self.settings),
            values: RefCell::new(IndexMap::new()),
        })
    }

    pub fn local_len(&self) -> usize {
        self.values.borrow().len()
    }

    /// `(name, description)` for every binding directly in this environment,
    /// in insertion order, for read-only scope inspection.
    pub fn describe_local_bindings(&self) -> Vec<(String, String)> {
        self.values.borrow().iter().map(|(name, value)| (name.clone(), value.describe())).collect()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolves a dotted path against this environment for read-only
    /// introspection (the CLI's `show`/`save` subcommands), reusing the same
    /// resolution rule `evaluate_expr` uses for `Expr::Var`.
    pub fn resolve(&self, path: &[String], pos: Pos) -> DslResult<Value> {
        self.resolve_path(path, pos)
    }

    fn bind(&self, name: impl Into<String>, value: Value) {
        self.values.borrow_mut().insert(name.into(), value);
    }

    fn lookup_local(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.lookup_local(name).or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    /// Resolves a dotted path: the first segment walks the parent chain like
    /// any other name; every following segment is looked up only in the
    /// preceding [`Value::Module`]'s own local table, never its ancestors.
    fn resolve_path(&self, path: &[String], pos: Pos) -> DslResult<Value> {
        let (head, tail) = path.split_first().expect("non-empty dotted path");
        let mut current = self
            .lookup(head)
            .ok_or_else(|| DslError::Core(CoreError::UndeclaredIdentifier { name: head.clone(), pos }))?;
        for seg in tail {
            let env = match &current {
                Value::Module(env) => env,
                other => {
                    return Err(DslError::Eval {
                        message: format!("'{head}' is not a module, cannot resolve '.{seg}' on a {}", other.describe()),
                        pos,
                    })
                }
            };
            current = env
                .lookup_local(seg)
                .ok_or_else(|| DslError::Core(CoreError::UndeclaredIdentifier { name: seg.clone(), pos }))?;
        }
        Ok(current)
    }

    /// Grows the shared register in place with any name in `names` not
    /// already present, since the surface grammar has no explicit
    /// register-declaration command: qubits come into existence the first
    /// time they are named.
    fn ensure_registered(&self, names: &[String]) {
        let mut reg = self.register.borrow_mut();
        if names.iter().all(|n| reg.contains(n)) {
            return;
        }
        let mut all: Vec<String> = reg.names().to_vec();
        for n in names {
            if !all.contains(n) {
                all.push(n.clone());
            }
        }
        *reg = Register::new(all).expect("names deduplicated above");
    }

    fn qvar_list(&self, names: &QVarLit) -> DslResult<QVarList> {
        self.ensure_registered(names);
        let reg = self.register.borrow();
        QVarList::new(&reg, names.clone()).map_err(DslError::Core)
    }

    fn register_snapshot(&self) -> Register {
        self.register.borrow().clone()
    }

    fn settings_snapshot(&self) -> Settings {
        *self.settings.borrow()
    }
}

/// The outcome of one evaluated top-level command.
pub enum CmdOutcome {
    /// A name was bound; `detail` summarises the value for the report.
    Bound { detail: String },
    /// A `show` command, carrying the printed form of the expression's value.
    Shown { detail: String },
    /// A `proof` expression's declared signature was verified.
    ProofHolds,
    /// A `proof` expression was evaluated but its signature does not hold.
    ProofFails { message: String },
    Saved { path: String },
    SettingApplied,
    /// Evaluating the command itself failed (undeclared identifier, bad
    /// arity, malformed operator file, property violation, ...).
    Failed { message: String },
}

pub struct CmdReport {
    pub description: String,
    pub outcome: CmdOutcome,
}

/// The result of evaluating a whole module: the root environment (for
/// introspection) and one report per top-level command, in source order.
pub struct EvalReport {
    pub root: Rc<Environment>,
    pub reports: Vec<CmdReport>,
}

/// Parses and evaluates a `.nqpv` module. `base_dir` anchors relative
/// `load`/`import`/`save` paths. A lex or parse failure is fatal for the
/// whole module (there is no partial command list to evaluate yet); once
/// parsing succeeds, each command's own failure is isolated.
pub fn evaluate_source(src: &str, base_dir: &Path) -> DslResult<EvalReport> {
    evaluate_source_with_settings(src, base_dir, Settings::default())
}

/// Same as [`evaluate_source`], but seeds the root environment's tolerances
/// from `settings` (e.g. loaded from a persisted `--config` file) instead of
/// [`Settings::default`].
pub fn evaluate_source_with_settings(src: &str, base_dir: &Path, settings: Settings) -> DslResult<EvalReport> {
    let module = parser::parse_module(src)?;
    let root = Environment::new_root_with_settings(settings)?;
    let reports = evaluate_cmds(&root, &module.cmds, base_dir);
    Ok(EvalReport { root, reports })
}

fn evaluate_cmds(env: &Rc<Environment>, cmds: &[Cmd], base_dir: &Path) -> Vec<CmdReport> {
    cmds.iter().map(|cmd| evaluate_cmd(env, cmd, base_dir)).collect()
}

fn evaluate_cmd(env: &Rc<Environment>, cmd: &Cmd, base_dir: &Path) -> CmdReport {
    let description = describe_cmd(cmd);
    match try_evaluate_cmd(env, cmd, base_dir) {
        Ok(outcome) => CmdReport { description, outcome },
        Err(e) => CmdReport {
            description,
            outcome: CmdOutcome::Failed { message: e.to_string() },
        },
    }
}

fn describe_cmd(cmd: &Cmd) -> String {
    match cmd {
        Cmd::Def { name, .. } => format!("def {name}"),
        Cmd::Show { .. } => "show".to_string(),
        Cmd::Axiom { name, .. } => format!("axiom {name}"),
        Cmd::Setting { .. } => "setting".to_string(),
        Cmd::Save { var, .. } => format!("save {}", var.join(".")),
    }
}

fn try_evaluate_cmd(env: &Rc<Environment>, cmd: &Cmd, base_dir: &Path) -> DslResult<CmdOutcome> {
    match cmd {
        Cmd::Def { name, expr, pos } => {
            let (value, outcome) = evaluate_expr(env, expr, *pos, base_dir)?;
            env.bind(name.clone(), value);
            Ok(outcome)
        }
        Cmd::Show { expr, pos } => {
            let (value, _) = evaluate_expr(env, expr, *pos, base_dir)?;
            Ok(CmdOutcome::Shown { detail: value.describe() })
        }
        Cmd::Axiom { name, pre, qvars, post, pos } => {
            let qvls = env.qvar_list(qvars)?;
            let pre_q = lower_predicate(env, pre, *pos)?;
            let post_q = lower_predicate(env, post, *pos)?;
            env.bind(
                name.clone(),
                Value::Signature { pre: pre_q, qvars: qvls, post: post_q },
            );
            Ok(CmdOutcome::Bound {
                detail: format!("assumed (unverified) signature for '{name}'"),
            })
        }
        Cmd::Setting { key, value, pos } => {
            apply_setting(env, *key, value, *pos)?;
            Ok(CmdOutcome::SettingApplied)
        }
        Cmd::Save { var, path, pos } => {
            let op = resolve_operator(env, var, *pos)?;
            let full_path = base_dir.join(path);
            npy::save(&full_path, op.tensor(), *pos)?;
            Ok(CmdOutcome::Saved { path: path.clone() })
        }
    }
}

fn apply_setting(env: &Environment, key: SettingKey, value: &SettingValue, pos: Pos) -> DslResult<()> {
    let mut settings = env.settings.borrow_mut();
    match (key, value) {
        (SettingKey::Eps, SettingValue::Float(v)) => settings.set_eps(*v).map_err(DslError::Core),
        (SettingKey::SdpPrecision, SettingValue::Float(v)) => settings.set_sdp_precision(*v).map_err(DslError::Core),
        (SettingKey::Silent, SettingValue::Bool(v)) => {
            settings.silent = *v;
            Ok(())
        }
        (SettingKey::IdenticalVarCheck, SettingValue::Bool(v)) => {
            settings.identical_var_check = *v;
            Ok(())
        }
        (SettingKey::OptPreserving, SettingValue::Bool(v)) => {
            settings.opt_preserving = *v;
            Ok(())
        }
        _ => Err(DslError::Eval {
            message: "setting value has the wrong type for its key".to_string(),
            pos,
        }),
    }
}

fn evaluate_expr(env: &Rc<Environment>, expr: &Expr, pos: Pos, base_dir: &Path) -> DslResult<(Value, CmdOutcome)> {
    match expr {
        Expr::Scope(cmds) => {
            let child = env.child("scope");
            let reports = evaluate_cmds(&child, cmds, base_dir);
            let failed = reports
                .iter()
                .filter(|r| matches!(r.outcome, CmdOutcome::Failed { .. } | CmdOutcome::ProofFails { .. }))
                .count();
            let detail = format!("nested scope: {} command(s), {failed} failed", reports.len());
            Ok((Value::Module(child), CmdOutcome::Bound { detail }))
        }
        Expr::Load(path) => {
            let tensor = npy::load(&base_dir.join(path), pos)?;
            let op = Operator::new(tensor);
            Ok((
                Value::Operator(op),
                CmdOutcome::Bound { detail: format!("loaded operator from '{path}'") },
            ))
        }
        Expr::Import(path) => {
            let full = base_dir.join(path);
            let src = std::fs::read_to_string(&full).map_err(|e| DslError::Io {
                path: full.display().to_string(),
                message: e.to_string(),
                pos,
            })?;
            let module = parser::parse_module(&src)?;
            let child = env.child(path.clone());
            let import_base = full.parent().unwrap_or(base_dir).to_path_buf();
            let reports = evaluate_cmds(&child, &module.cmds, &import_base);
            let failed = reports
                .iter()
                .filter(|r| matches!(r.outcome, CmdOutcome::Failed { .. } | CmdOutcome::ProofFails { .. }))
                .count();
            Ok((
                Value::Module(child),
                CmdOutcome::Bound {
                    detail: format!("imported '{path}': {} command(s), {failed} failed", reports.len()),
                },
            ))
        }
        Expr::Program { qvars, body } => {
            env.qvar_list(qvars)?;
            let prog = lower_prog(env, body)?;
            let detail = format!("program over {}", prog.all_qvarls());
            Ok((Value::Program(prog), CmdOutcome::Bound { detail }))
        }
        Expr::Proof { qvars, pre, body, post } => {
            env.qvar_list(qvars)?;
            let pre_q = lower_predicate(env, pre, pos)?;
            let post_q = lower_predicate(env, post, pos)?;
            let hint = lower_proof_mid(env, body, pos)?;
            let reg = env.register_snapshot();
            let settings = env.settings_snapshot();
            let ctx = WlpContext { reg: &reg, scope: &env.core_scope, settings: &settings };
            match verify_signature(&pre_q, &hint, &post_q, &ctx) {
                Ok(_stmt) => Ok((Value::Proof(hint), CmdOutcome::ProofHolds)),
                Err(e) => Ok((
                    Value::Proof(hint),
                    CmdOutcome::ProofFails { message: e.to_string() },
                )),
            }
        }
        Expr::Var(path) => {
            let value = env.resolve_path(path, pos)?;
            let detail = value.describe();
            Ok((value, CmdOutcome::Bound { detail }))
        }
    }
}

fn resolve_operator(env: &Environment, path: &VarPath, pos: Pos) -> DslResult<Operator> {
    match env.resolve_path(path, pos)? {
        Value::Operator(op) => Ok(op),
        other => Err(DslError::Eval {
            message: format!("'{}' is not an operator (it is a {})", path.join("."), other.describe()),
            pos,
        }),
    }
}

fn resolve_pair(env: &Environment, path: &VarPath, qvars: &QVarLit, property: OperatorProperty, pos: Pos) -> DslResult<OpVarPair> {
    let op = resolve_operator(env, path, pos)?;
    let qvls = env.qvar_list(qvars)?;
    OpVarPair::new(op, qvls, property, pos).map_err(DslError::Core)
}

fn lower_predicate(env: &Environment, pred: &PredicateLit, pos: Pos) -> DslResult<Qpre> {
    let mut pairs = Vec::with_capacity(pred.len());
    for (path, qvars) in pred {
        pairs.push(resolve_pair(env, path, qvars, OperatorProperty::HermitianPredicate, pos)?);
    }
    let settings = env.settings.borrow();
    Qpre::new(pairs, &settings).map_err(DslError::Core)
}

fn lower_prog(env: &Environment, prog: &Prog) -> DslResult<Program> {
    let stmts = prog.0.iter().map(|s| lower_prog_stmt(env, s)).collect::<DslResult<Vec<_>>>()?;
    let pos = stmts.first().map(|p: &Program| p.pos()).unwrap_or_else(Pos::synthetic);
    Ok(Program::seq(stmts, pos))
}

fn lower_prog_stmt(env: &Environment, stmt: &ProgStmt) -> DslResult<Program> {
    match stmt {
        ProgStmt::Skip(pos) => Ok(Program::skip(*pos)),
        ProgStmt::Abort(pos) => Ok(Program::abort(*pos)),
        ProgStmt::Init(qvars, pos) => Ok(Program::init(env.qvar_list(qvars)?, *pos)),
        ProgStmt::Unitary { opt, qvars, pos } => {
            let pair = resolve_pair(env, opt, qvars, OperatorProperty::Unitary, *pos)?;
            Ok(Program::unitary(pair, *pos))
        }
        ProgStmt::If { opt, qvars, then_branch, else_branch, pos } => {
            let measure = resolve_pair(env, opt, qvars, OperatorProperty::Measurement, *pos)?;
            let then_p = lower_prog(env, then_branch)?;
            let else_p = lower_prog(env, else_branch)?;
            Ok(Program::if_then_else(measure, then_p, else_p, *pos))
        }
        ProgStmt::While { opt, qvars, body, pos } => {
            let measure = resolve_pair(env, opt, qvars, OperatorProperty::Measurement, *pos)?;
            let body_p = lower_prog(env, body)?;
            Ok(Program::while_loop(measure, body_p, *pos))
        }
        ProgStmt::Nondet(branches, pos) => {
            let progs = branches.iter().map(|p| lower_prog(env, p)).collect::<DslResult<Vec<_>>>()?;
            Ok(Program::choice(progs, *pos))
        }
        ProgStmt::Call { name, qvars, pos } => {
            let callee = match env.resolve_path(name, *pos)? {
                Value::Program(p) => p,
                other => {
                    return Err(DslError::Eval {
                        message: format!("'{}' is not a program (it is a {})", name.join("."), other.describe()),
                        pos: *pos,
                    })
                }
            };
            let actual = env.qvar_list(qvars)?;
            let map = call_substitution(&name.join("."), callee.all_qvarls(), &actual, *pos)?;
            Ok(substitute_program(&callee, &map))
        }
    }
}

fn lower_proof_mid(env: &Environment, stmts: &[ProofStmt], fallback_pos: Pos) -> DslResult<ProofHint> {
    let hints = stmts.iter().map(|s| lower_proof_stmt(env, s)).collect::<DslResult<Vec<_>>>()?;
    let pos = hints.first().map(|h: &ProofHint| h.pos()).unwrap_or(fallback_pos);
    Ok(ProofHint::seq(hints, pos))
}

fn lower_proof_stmt(env: &Environment, stmt: &ProofStmt) -> DslResult<ProofHint> {
    match stmt {
        ProofStmt::Skip(pos) => Ok(ProofHint::skip(*pos)),
        ProofStmt::Abort(pos) => Ok(ProofHint::abort(*pos)),
        ProofStmt::Init(qvars, pos) => Ok(ProofHint::init(env.qvar_list(qvars)?, *pos)),
        ProofStmt::Unitary { opt, qvars, pos } => {
            let pair = resolve_pair(env, opt, qvars, OperatorProperty::Unitary, *pos)?;
            Ok(ProofHint::unitary(pair, *pos))
        }
        ProofStmt::If { opt, qvars, then_branch, else_branch, pos } => {
            let measure = resolve_pair(env, opt, qvars, OperatorProperty::Measurement, *pos)?;
            let then_h = lower_proof_mid(env, then_branch, *pos)?;
            let else_h = lower_proof_mid(env, else_branch, *pos)?;
            Ok(ProofHint::if_then_else(measure, then_h, else_h, *pos))
        }
        ProofStmt::While { invariant, opt, qvars, body, pos } => {
            let measure = resolve_pair(env, opt, qvars, OperatorProperty::Measurement, *pos)?;
            let inv_q = lower_predicate(env, invariant, *pos)?;
            let body_h = lower_proof_mid(env, body, *pos)?;
            Ok(ProofHint::while_loop(measure, inv_q, body_h, *pos))
        }
        ProofStmt::Nondet(branches, pos) => {
            let hints = branches
                .iter()
                .map(|b| lower_proof_mid(env, b, *pos))
                .collect::<DslResult<Vec<_>>>()?;
            Ok(ProofHint::choice(hints, *pos))
        }
        ProofStmt::Union(branches, pos) => {
            let hints = branches
                .iter()
                .map(|b| lower_proof_mid(env, b, *pos))
                .collect::<DslResult<Vec<_>>>()?;
            Ok(ProofHint::union(hints, *pos))
        }
        ProofStmt::Call { name, qvars, pos } => {
            let callee = match env.resolve_path(name, *pos)? {
                Value::Proof(h) => h,
                other => {
                    return Err(DslError::Eval {
                        message: format!("'{}' is not a proof (it is a {})", name.join("."), other.describe()),
                        pos: *pos,
                    })
                }
            };
            let actual = env.qvar_list(qvars)?;
            let map = call_substitution(&name.join("."), callee.all_qvarls(), &actual, *pos)?;
            Ok(substitute_hint(&callee, &map))
        }
        ProofStmt::Assert(pred, pos) => {
            let q = lower_predicate(env, pred, *pos)?;
            Ok(ProofHint::assert_hint(q, *pos))
        }
    }
}

/// Builds the formal-to-actual qubit-name map for inlining a call: the
/// callee's own `all_qvarls()` positions line up with the call site's named
/// qubits, in order.
fn call_substitution(callee_name: &str, formal: &QVarList, actual: &QVarList, pos: Pos) -> DslResult<HashMap<String, String>> {
    if formal.len() != actual.len() {
        return Err(DslError::Eval {
            message: format!(
                "'{callee_name}' is defined over {} qubit(s) but called with {}",
                formal.len(),
                actual.len()
            ),
            pos,
        });
    }
    Ok(formal.names().iter().cloned().zip(actual.names().iter().cloned()).collect())
}

/// Rebuilds `prog` with every qubit name substituted per `map`, using the
/// same public smart constructors the lowering functions use, so a call site
/// sees its own named qubits wherever the callee mentioned its formals.
fn substitute_program(prog: &Program, map: &HashMap<String, String>) -> Program {
    let pos = prog.pos();
    match prog.kind() {
        ProgramKind::Skip => Program::skip(pos),
        ProgramKind::Abort => Program::abort(pos),
        ProgramKind::Init(vls) => Program::init(vls.substitute(map), pos),
        ProgramKind::Unitary(ovp) => Program::unitary(ovp.substitute(map), pos),
        ProgramKind::If { measure, then_branch, else_branch } => Program::if_then_else(
            measure.substitute(map),
            substitute_program(then_branch, map),
            substitute_program(else_branch, map),
            pos,
        ),
        ProgramKind::While { measure, body } => Program::while_loop(measure.substitute(map), substitute_program(body, map), pos),
        ProgramKind::Choice(branches) => Program::choice(branches.iter().map(|p| substitute_program(p, map)).collect(), pos),
        ProgramKind::Seq(stmts) => Program::seq(stmts.iter().map(|p| substitute_program(p, map)).collect(), pos),
    }
}

fn substitute_hint(hint: &ProofHint, map: &HashMap<String, String>) -> ProofHint {
    let pos = hint.pos();
    match hint.kind() {
        ProofHintKind::Skip => ProofHint::skip(pos),
        ProofHintKind::Abort => ProofHint::abort(pos),
        ProofHintKind::Init(vls) => ProofHint::init(vls.substitute(map), pos),
        ProofHintKind::Unitary(ovp) => ProofHint::unitary(ovp.substitute(map), pos),
        ProofHintKind::If { measure, then_branch, else_branch } => ProofHint::if_then_else(
            measure.substitute(map),
            substitute_hint(then_branch, map),
            substitute_hint(else_branch, map),
            pos,
        ),
        ProofHintKind::While { measure, invariant, body } => {
            ProofHint::while_loop(measure.substitute(map), invariant.substitute(map), substitute_hint(body, map), pos)
        }
        ProofHintKind::Choice(branches) => ProofHint::choice(branches.iter().map(|p| substitute_hint(p, map)).collect(), pos),
        ProofHintKind::Seq(stmts) => ProofHint::seq(stmts.iter().map(|p| substitute_hint(p, map)).collect(), pos),
        ProofHintKind::Assert(q) => ProofHint::assert_hint(q.substitute(map), pos),
        ProofHintKind::Union(proofs) => ProofHint::union(proofs.iter().map(|p| substitute_hint(p, map)).collect(), pos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> EvalReport {
        evaluate_source(src, Path::new(".")).expect("module parses")
    }

    #[test]
    fn defines_and_verifies_a_trivial_proof() {
        let report = eval("def p := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end");
        assert_eq!(report.reports.len(), 1);
        assert!(matches!(report.reports[0].outcome, CmdOutcome::ProofHolds));
    }

    #[test]
    fn a_false_proof_is_reported_without_aborting_the_module() {
        let report = eval(
            r#"
            def bad := proof [q0] : { P0[q0] } ; skip ; { P1[q0] } end
            def ok := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end
            "#,
        );
        assert_eq!(report.reports.len(), 2);
        assert!(matches!(report.reports[0].outcome, CmdOutcome::ProofFails { .. }));
        assert!(matches!(report.reports[1].outcome, CmdOutcome::ProofHolds));
    }

    #[test]
    fn undeclared_operator_reference_fails_only_its_own_command() {
        let report = eval(
            r#"
            def a := proof [q0] : { Nope[q0] } ; skip ; { Nope[q0] } end
            def b := proof [q0] : { P0[q0] } ; skip ; { P0[q0] } end
            "#,
        );
        assert!(matches!(report.reports[0].outcome, CmdOutcome::Failed { .. }));
        assert!(matches!(report.reports[1].outcome, CmdOutcome::ProofHolds));
    }

    #[test]
    fn program_call_inlines_with_the_call_sites_qubit_names() {
        let report = eval(
            r#"
            def flip := program [a] : a *= X end
            def main := program [q0] : flip[q0] end
            show main end
            "#,
        );
        assert!(matches!(report.reports[1].outcome, CmdOutcome::Bound { .. }));
    }

    #[test]
    fn setting_rejects_a_non_positive_eps() {
        let report = eval("setting eps := 0.0 end");
        assert!(matches!(report.reports[0].outcome, CmdOutcome::Failed { .. }));
    }
}
