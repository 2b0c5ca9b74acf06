//! Recursive-descent parser building [`crate::ast`] values from a token
//! stream. The grammar mirrors the original PLY grammar's productions
//! (scope/cmd/definition/axiom/show/setting/save, program and proof
//! statement sequences, nondeterministic choice and (Union) composition).

use nqpv_core::error::Pos;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, thiserror::Error)]
#[error("{pos}: parse error: {message}")]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_module(mut self) -> PResult<Module> {
        let mut cmds = Vec::new();
        while !self.at(&TokenKind::Eof) {
            cmds.push(self.parse_cmd()?);
        }
        Ok(Module { cmds })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_pos(&self) -> Pos {
        self.peek().pos
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(ParseError {
                message: format!("expected {kind:?}, found {:?}", self.peek().kind),
                pos: self.peek_pos(),
            })
        }
    }

    fn expect_id(&mut self) -> PResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Id(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError {
                message: format!("expected identifier, found {other:?}"),
                pos: self.peek_pos(),
            }),
        }
    }

    // ---- top-level commands ----

    fn parse_cmd(&mut self) -> PResult<Cmd> {
        match self.peek().kind.clone() {
            TokenKind::Def => self.parse_def(),
            TokenKind::Show => self.parse_show(),
            TokenKind::Axiom => self.parse_axiom(),
            TokenKind::Setting => self.parse_setting(),
            TokenKind::Save => self.parse_save(),
            other => Err(ParseError {
                message: format!("expected a top-level command, found {other:?}"),
                pos: self.peek_pos(),
            }),
        }
    }

    fn parse_def(&mut self) -> PResult<Cmd> {
        let pos = self.expect(TokenKind::Def)?.pos;
        let name = self.expect_id()?;
        self.expect(TokenKind::Assign)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::End)?;
        Ok(Cmd::Def { name, expr, pos })
    }

    fn parse_show(&mut self) -> PResult<Cmd> {
        let pos = self.expect(TokenKind::Show)?.pos;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::End)?;
        Ok(Cmd::Show { expr, pos })
    }

    fn parse_axiom(&mut self) -> PResult<Cmd> {
        let pos = self.expect(TokenKind::Axiom)?.pos;
        let name = self.expect_id()?;
        self.expect(TokenKind::Colon)?;
        let pre = self.parse_predicate()?;
        self.expect(TokenKind::Program)?;
        let qvars = self.parse_qvar_ls()?;
        let post = self.parse_predicate()?;
        self.expect(TokenKind::End)?;
        Ok(Cmd::Axiom { name, pre, qvars, post, pos })
    }

    fn parse_setting(&mut self) -> PResult<Cmd> {
        let pos = self.expect(TokenKind::Setting)?.pos;
        let key = match self.peek().kind.clone() {
            TokenKind::Eps => {
                self.advance();
                SettingKey::Eps
            }
            TokenKind::SdpPrecision => {
                self.advance();
                SettingKey::SdpPrecision
            }
            TokenKind::Silent => {
                self.advance();
                SettingKey::Silent
            }
            TokenKind::Id(name) => {
                self.advance();
                match name.as_str() {
                    "identical_var_check" => SettingKey::IdenticalVarCheck,
                    "opt_preserving" => SettingKey::OptPreserving,
                    other => {
                        return Err(ParseError {
                            message: format!("unknown setting key '{other}'"),
                            pos,
                        })
                    }
                }
            }
            other => {
                return Err(ParseError {
                    message: format!("expected a setting key, found {other:?}"),
                    pos,
                })
            }
        };
        self.expect(TokenKind::Assign)?;
        let value = match self.peek().kind.clone() {
            TokenKind::FloatNum(n) => {
                self.advance();
                SettingValue::Float(n)
            }
            TokenKind::True => {
                self.advance();
                SettingValue::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                SettingValue::Bool(false)
            }
            other => {
                return Err(ParseError {
                    message: format!("expected a setting value, found {other:?}"),
                    pos: self.peek_pos(),
                })
            }
        };
        self.expect(TokenKind::End)?;
        Ok(Cmd::Setting { key, value, pos })
    }

    fn parse_save(&mut self) -> PResult<Cmd> {
        let pos = self.expect(TokenKind::Save)?.pos;
        let var = self.parse_var_path()?;
        self.expect(TokenKind::At)?;
        let path = match self.advance().kind {
            TokenKind::StringLit(s) => s,
            other => {
                return Err(ParseError {
                    message: format!("expected a string path, found {other:?}"),
                    pos,
                })
            }
        };
        self.expect(TokenKind::End)?;
        Ok(Cmd::Save { var, path, pos })
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> PResult<Expr> {
        match self.peek().kind.clone() {
            TokenKind::Scope => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let mut cmds = Vec::new();
                while !self.at(&TokenKind::RBrace) {
                    cmds.push(self.parse_cmd()?);
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::Scope(cmds))
            }
            TokenKind::Load => {
                self.advance();
                let path = self.expect_string()?;
                Ok(Expr::Load(path))
            }
            TokenKind::Import => {
                self.advance();
                let path = self.expect_string()?;
                Ok(Expr::Import(path))
            }
            TokenKind::Program => {
                self.advance();
                let qvars = self.parse_qvar_ls()?;
                self.expect(TokenKind::Colon)?;
                let body = self.parse_prog()?;
                Ok(Expr::Program { qvars, body })
            }
            TokenKind::Proof => {
                self.advance();
                let qvars = self.parse_qvar_ls()?;
                self.expect(TokenKind::Colon)?;
                let pre = self.parse_predicate()?;
                self.expect(TokenKind::Semi)?;
                // `parse_proof_mid` is greedy and consumes the mandatory
                // trailing postcondition as its own final `Assert` statement
                // (a bare `{ pred }` is indistinguishable from an assertion
                // until we see what follows it). Pop it back off as `post`.
                let mut body = self.parse_proof_mid()?;
                let post = match body.pop() {
                    Some(ProofStmt::Assert(pred, _)) => pred,
                    Some(other) => {
                        return Err(ParseError {
                            message: format!(
                                "proof must end with a postcondition predicate, found {other:?}"
                            ),
                            pos: self.peek_pos(),
                        })
                    }
                    None => unreachable!("parse_proof_mid always yields at least one statement"),
                };
                Ok(Expr::Proof { qvars, pre, body, post })
            }
            TokenKind::Id(_) => Ok(Expr::Var(self.parse_var_path()?)),
            other => Err(ParseError {
                message: format!("expected an expression, found {other:?}"),
                pos: self.peek_pos(),
            }),
        }
    }

    fn expect_string(&mut self) -> PResult<String> {
        match self.advance().kind {
            TokenKind::StringLit(s) => Ok(s),
            other => Err(ParseError {
                message: format!("expected a string literal, found {other:?}"),
                pos: self.peek_pos(),
            }),
        }
    }

    fn parse_var_path(&mut self) -> PResult<VarPath> {
        let mut path = vec![self.expect_id()?];
        while self.at(&TokenKind::Dot) {
            self.advance();
            path.push(self.expect_id()?);
        }
        Ok(path)
    }

    fn parse_qvar_ls(&mut self) -> PResult<QVarLit> {
        self.expect(TokenKind::LBracket)?;
        let mut names = Vec::new();
        while !self.at(&TokenKind::RBracket) {
            names.push(self.expect_id()?);
        }
        self.expect(TokenKind::RBracket)?;
        Ok(names)
    }

    fn parse_predicate(&mut self) -> PResult<PredicateLit> {
        self.expect(TokenKind::LBrace)?;
        let mut pairs = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let var = self.parse_var_path()?;
            let qvars = self.parse_qvar_ls()?;
            pairs.push((var, qvars));
        }
        self.expect(TokenKind::RBrace)?;
        Ok(pairs)
    }

    /// `{ inv : var qvar_ls ... }`
    fn parse_inv(&mut self) -> PResult<PredicateLit> {
        self.expect(TokenKind::LBrace)?;
        self.expect(TokenKind::Inv)?;
        self.expect(TokenKind::Colon)?;
        let mut pairs = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let var = self.parse_var_path()?;
            let qvars = self.parse_qvar_ls()?;
            pairs.push((var, qvars));
        }
        self.expect(TokenKind::RBrace)?;
        Ok(pairs)
    }

    // ---- programs ----

    fn parse_prog(&mut self) -> PResult<Prog> {
        let mut stmts = vec![self.parse_stmt()?];
        while self.at(&TokenKind::Semi) {
            self.advance();
            stmts.push(self.parse_stmt()?);
        }
        Ok(Prog(stmts))
    }

    fn parse_stmt(&mut self) -> PResult<ProgStmt> {
        let pos = self.peek_pos();
        match self.peek().kind.clone() {
            TokenKind::Skip => {
                self.advance();
                Ok(ProgStmt::Skip(pos))
            }
            TokenKind::Abort => {
                self.advance();
                Ok(ProgStmt::Abort(pos))
            }
            TokenKind::If => {
                self.advance();
                let opt = self.parse_var_path()?;
                let qvars = self.parse_qvar_ls()?;
                self.expect(TokenKind::Then)?;
                let then_branch = self.parse_prog()?;
                self.expect(TokenKind::Else)?;
                let else_branch = self.parse_prog()?;
                self.expect(TokenKind::End)?;
                Ok(ProgStmt::If { opt, qvars, then_branch, else_branch, pos })
            }
            TokenKind::While => {
                self.advance();
                let opt = self.parse_var_path()?;
                let qvars = self.parse_qvar_ls()?;
                self.expect(TokenKind::Do)?;
                let body = self.parse_prog()?;
                self.expect(TokenKind::End)?;
                Ok(ProgStmt::While { opt, qvars, body, pos })
            }
            TokenKind::LParen => {
                self.advance();
                let mut branches = vec![self.parse_prog()?];
                while self.at(&TokenKind::Hash) {
                    self.advance();
                    branches.push(self.parse_prog()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(ProgStmt::Nondet(branches, pos))
            }
            TokenKind::LBracket => {
                let qvars = self.parse_qvar_ls()?;
                match self.peek().kind.clone() {
                    TokenKind::Init => {
                        self.advance();
                        Ok(ProgStmt::Init(qvars, pos))
                    }
                    TokenKind::MulEq => {
                        self.advance();
                        let opt = self.parse_var_path()?;
                        Ok(ProgStmt::Unitary { opt, qvars, pos })
                    }
                    other => Err(ParseError {
                        message: format!("expected ':=0' or '*=' after qubit list, found {other:?}"),
                        pos,
                    }),
                }
            }
            TokenKind::Id(_) => {
                let name = self.parse_var_path()?;
                match self.peek().kind.clone() {
                    TokenKind::Init => {
                        self.advance();
                        Ok(ProgStmt::Init(name, pos))
                    }
                    TokenKind::MulEq => {
                        self.advance();
                        let opt = self.parse_var_path()?;
                        Ok(ProgStmt::Unitary { opt, qvars: name, pos })
                    }
                    TokenKind::LBracket => {
                        let qvars = self.parse_qvar_ls()?;
                        Ok(ProgStmt::Call { name, qvars, pos })
                    }
                    other => Err(ParseError {
                        message: format!("expected a qubit list or ':=0'/'*=' after '{}', found {other:?}", name.join(".")),
                        pos,
                    }),
                }
            }
            other => Err(ParseError {
                message: format!("expected a program statement, found {other:?}"),
                pos,
            }),
        }
    }

    // ---- proofs ----

    fn parse_proof_mid(&mut self) -> PResult<Vec<ProofStmt>> {
        let mut stmts = vec![self.parse_proof_stmt()?];
        while self.at(&TokenKind::Semi) {
            self.advance();
            stmts.push(self.parse_proof_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_proof_stmt(&mut self) -> PResult<ProofStmt> {
        let pos = self.peek_pos();
        match self.peek().kind.clone() {
            TokenKind::Skip => {
                self.advance();
                Ok(ProofStmt::Skip(pos))
            }
            TokenKind::Abort => {
                self.advance();
                Ok(ProofStmt::Abort(pos))
            }
            TokenKind::If => {
                self.advance();
                let opt = self.parse_var_path()?;
                let qvars = self.parse_qvar_ls()?;
                self.expect(TokenKind::Then)?;
                let then_branch = self.parse_proof_mid()?;
                self.expect(TokenKind::Else)?;
                let else_branch = self.parse_proof_mid()?;
                self.expect(TokenKind::End)?;
                Ok(ProofStmt::If { opt, qvars, then_branch, else_branch, pos })
            }
            TokenKind::LBrace => {
                // either `{ inv : ... } ; while ...` or a bare assertion predicate.
                if self.tokens[self.pos + 1].kind == TokenKind::Inv {
                    let invariant = self.parse_inv()?;
                    self.expect(TokenKind::Semi)?;
                    self.expect(TokenKind::While)?;
                    let opt = self.parse_var_path()?;
                    let qvars = self.parse_qvar_ls()?;
                    self.expect(TokenKind::Do)?;
                    let body = self.parse_proof_mid()?;
                    self.expect(TokenKind::End)?;
                    Ok(ProofStmt::While { invariant, opt, qvars, body, pos })
                } else {
                    let pred = self.parse_predicate()?;
                    Ok(ProofStmt::Assert(pred, pos))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let mut branches = vec![self.parse_proof_mid()?];
                let mut is_union = false;
                loop {
                    if self.at(&TokenKind::Hash) {
                        self.advance();
                        branches.push(self.parse_proof_mid()?);
                    } else if self.at(&TokenKind::Comma) {
                        is_union = true;
                        self.advance();
                        branches.push(self.parse_proof_mid()?);
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
                if is_union {
                    Ok(ProofStmt::Union(branches, pos))
                } else {
                    Ok(ProofStmt::Nondet(branches, pos))
                }
            }
            TokenKind::LBracket => {
                let qvars = self.parse_qvar_ls()?;
                match self.peek().kind.clone() {
                    TokenKind::Init => {
                        self.advance();
                        Ok(ProofStmt::Init(qvars, pos))
                    }
                    TokenKind::MulEq => {
                        self.advance();
                        let opt = self.parse_var_path()?;
                        Ok(ProofStmt::Unitary { opt, qvars, pos })
                    }
                    other => Err(ParseError {
                        message: format!("expected ':=0' or '*=' after qubit list, found {other:?}"),
                        pos,
                    }),
                }
            }
            TokenKind::Id(_) => {
                let name = self.parse_var_path()?;
                match self.peek().kind.clone() {
                    TokenKind::Init => {
                        self.advance();
                        Ok(ProofStmt::Init(name, pos))
                    }
                    TokenKind::MulEq => {
                        self.advance();
                        let opt = self.parse_var_path()?;
                        Ok(ProofStmt::Unitary { opt, qvars: name, pos })
                    }
                    TokenKind::LBracket => {
                        let qvars = self.parse_qvar_ls()?;
                        Ok(ProofStmt::Call { name, qvars, pos })
                    }
                    other => Err(ParseError {
                        message: format!("expected a qubit list or ':=0'/'*=' after '{}', found {other:?}", name.join(".")),
                        pos,
                    }),
                }
            }
            other => Err(ParseError {
                message: format!("expected a proof statement, found {other:?}"),
                pos,
            }),
        }
    }
}

/// Convenience entry point: tokenize and parse a complete module.
pub fn parse_module(src: &str) -> PResult<Module> {
    let tokens = crate::lexer::tokenize(src).map_err(|e| ParseError {
        message: e.message,
        pos: e.pos,
    })?;
    Parser::new(&tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_skip_program_definition() {
        let m = parse_module("def p := program [q0] : skip end").unwrap();
        assert_eq!(m.cmds.len(), 1);
        match &m.cmds[0] {
            Cmd::Def { name, expr: Expr::Program { qvars, body }, .. } => {
                assert_eq!(name, "p");
                assert_eq!(qvars, &["q0".to_string()]);
                assert_eq!(body.0.len(), 1);
            }
            other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn parses_unitary_and_init_statements() {
        let m = parse_module("def p := program [q0] : [q0] :=0 ; [q0] *= H end").unwrap();
        match &m.cmds[0] {
            Cmd::Def { expr: Expr::Program { body, .. }, .. } => {
                assert_eq!(body.0.len(), 2);
            }
            other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn parses_if_and_while() {
        let src = "def p := program [q0] : if M[q0] then skip else abort end ; while M[q0] do skip end end";
        let m = parse_module(src).unwrap();
        match &m.cmds[0] {
            Cmd::Def { expr: Expr::Program { body, .. }, .. } => assert_eq!(body.0.len(), 2),
            other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn parses_a_proof_with_invariant() {
        let src = r#"
            def p := proof [q0] : { I[q0] } ;
                { inv: Inv[q0] } ; while M[q0] do skip end
            ; { I[q0] } end"#;
        let m = parse_module(src).unwrap();
        match &m.cmds[0] {
            Cmd::Def { expr: Expr::Proof { body, .. }, .. } => {
                assert_eq!(body.len(), 1);
                match &body[0] {
                    ProofStmt::While { invariant, .. } => assert_eq!(invariant.len(), 1),
                    other => panic!("unexpected proof stmt: {other:?}"),
                }
            }
            other => panic!("unexpected cmd: {other:?}"),
        }
    }

    #[test]
    fn parses_axiom_and_setting_and_save() {
        let m = parse_module(
            r#"
            axiom ax1 : { I[q0] } program [q0] { I[q0] } end
            setting eps := 0.0001 end
            save lib.H at "out/h.npy" end
        "#,
        )
        .unwrap();
        assert_eq!(m.cmds.len(), 3);
        assert!(matches!(m.cmds[0], Cmd::Axiom { .. }));
        assert!(matches!(m.cmds[1], Cmd::Setting { .. }));
        assert!(matches!(m.cmds[2], Cmd::Save { .. }));
    }
}
