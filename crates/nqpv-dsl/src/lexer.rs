//! Hand-rolled lexer for the `.nqpv` surface syntax: reserved words, the
//! handful of multi-character operators, and the bracket/punctuation
//! literals the grammar uses directly.

use nqpv_core::error::Pos;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Id(String),
    StringLit(String),
    FloatNum(f64),

    // reserved words
    Import,
    Def,
    Axiom,
    Show,
    Wp,
    Operator,
    Scope,
    Program,
    Proof,
    Skip,
    Abort,
    If,
    Then,
    Else,
    While,
    Do,
    End,
    Inv,
    Setting,
    Save,
    At,
    Load,
    True,
    False,
    Eps,
    SdpPrecision,
    Silent,

    // multi-char operators
    Init,     // :=0
    Assign,   // :=
    MulEq,    // *=
    Ellipsis, // ...

    // single-char literals
    Dot,
    Comma,
    Semi,
    Hash,
    Colon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

#[derive(Debug, thiserror::Error)]
#[error("{pos}: lexer error: {message}")]
pub struct LexError {
    pub message: String,
    pub pos: Pos,
}

fn reserved(word: &str) -> Option<TokenKind> {
    Some(match word {
        "import" => TokenKind::Import,
        "def" => TokenKind::Def,
        "axiom" => TokenKind::Axiom,
        "show" => TokenKind::Show,
        "wp" => TokenKind::Wp,
        "operator" => TokenKind::Operator,
        "scope" => TokenKind::Scope,
        "program" => TokenKind::Program,
        "proof" => TokenKind::Proof,
        "skip" => TokenKind::Skip,
        "abort" => TokenKind::Abort,
        "if" => TokenKind::If,
        "then" => TokenKind::Then,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "end" => TokenKind::End,
        "inv" => TokenKind::Inv,
        "setting" => TokenKind::Setting,
        "save" => TokenKind::Save,
        "at" => TokenKind::At,
        "load" => TokenKind::Load,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "eps" => TokenKind::Eps,
        "sdp_precision" => TokenKind::SdpPrecision,
        "silent" => TokenKind::Silent,
        _ => return None,
    })
}

/// Scans `src` into a flat token stream, tracking line/column for diagnostics.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut col = 1usize;
    let mut tokens = Vec::new();

    macro_rules! advance {
        () => {{
            if chars[i] == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
            i += 1;
        }};
    }

    while i < chars.len() {
        let c = chars[i];
        let pos = Pos::new(line, col);

        if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
            advance!();
            continue;
        }

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                advance!();
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            advance!();
            advance!();
            loop {
                if i >= chars.len() {
                    return Err(LexError {
                        message: "unterminated block comment".into(),
                        pos,
                    });
                }
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    advance!();
                    advance!();
                    break;
                }
                advance!();
            }
            continue;
        }

        if c == '"' {
            advance!();
            let mut s = String::new();
            loop {
                if i >= chars.len() {
                    return Err(LexError {
                        message: "unterminated string literal".into(),
                        pos,
                    });
                }
                if chars[i] == '"' {
                    advance!();
                    break;
                }
                s.push(chars[i]);
                advance!();
            }
            tokens.push(Token {
                kind: TokenKind::StringLit(s),
                pos,
            });
            continue;
        }

        if c == ':' && chars.get(i + 1) == Some(&'=') && chars.get(i + 2) == Some(&'0') {
            advance!();
            advance!();
            advance!();
            tokens.push(Token { kind: TokenKind::Init, pos });
            continue;
        }
        if c == ':' && chars.get(i + 1) == Some(&'=') {
            advance!();
            advance!();
            tokens.push(Token { kind: TokenKind::Assign, pos });
            continue;
        }
        if c == '*' && chars.get(i + 1) == Some(&'=') {
            advance!();
            advance!();
            tokens.push(Token { kind: TokenKind::MulEq, pos });
            continue;
        }
        if c == '.' && chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
            advance!();
            advance!();
            advance!();
            tokens.push(Token { kind: TokenKind::Ellipsis, pos });
            continue;
        }

        if c.is_ascii_digit() {
            let mut num = String::new();
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == 'e' || chars[i] == 'E' || chars[i] == '-') {
                if chars[i] == '-' && !num.is_empty() && !num.ends_with(['e', 'E']) {
                    break;
                }
                num.push(chars[i]);
                advance!();
            }
            let value = num.parse::<f64>().map_err(|_| LexError {
                message: format!("invalid numeric literal '{num}'"),
                pos,
            })?;
            tokens.push(Token {
                kind: TokenKind::FloatNum(value),
                pos,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut word = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                word.push(chars[i]);
                advance!();
            }
            let kind = reserved(&word).unwrap_or(TokenKind::Id(word));
            tokens.push(Token { kind, pos });
            continue;
        }

        let single = match c {
            '.' => Some(TokenKind::Dot),
            ',' => Some(TokenKind::Comma),
            ';' => Some(TokenKind::Semi),
            '#' => Some(TokenKind::Hash),
            ':' => Some(TokenKind::Colon),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            _ => None,
        };
        match single {
            Some(kind) => {
                advance!();
                tokens.push(Token { kind, pos });
            }
            None => {
                return Err(LexError {
                    message: format!("unexpected character '{c}'"),
                    pos,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: Pos::new(line, col),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_unitary_statement() {
        let tokens = tokenize("[q0] *= H;").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::LBracket,
                TokenKind::Id("q0".into()),
                TokenKind::RBracket,
                TokenKind::MulEq,
                TokenKind::Id("H".into()),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_init_from_assign() {
        let tokens = tokenize("[q0] :=0 ; x := 1").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Init);
        assert_eq!(tokens[5].kind, TokenKind::Assign);
    }

    #[test]
    fn skips_comments() {
        let tokens = tokenize("// a line\nskip /* block */ end").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![TokenKind::Skip, TokenKind::End, TokenKind::Eof]
        );
    }

    #[test]
    fn reports_unterminated_string() {
        assert!(tokenize("\"unterminated").is_err());
    }
}
