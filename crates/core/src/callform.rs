//! Parser for the plain-call compiled body form.
//!
//! A compiled artifact body is a single factory assignment:
//!
//! ```text
//! SpinningLogo := stage({"background": "#101018"}, [text({"content": "LOGO",
//! "rotate": interpolate(frame, 0, 59, 0, 360)}, [])])
//! ```
//!
//! The grammar is deliberately tiny: literals, identifiers, calls, maps,
//! and lists. There is no import, no member access, no dynamic evaluation —
//! identifiers can only ever be resolved through an injected capability
//! table. Both the sanitizer (to validate the allowed-primitive invariant)
//! and the runtime interpreter (to evaluate) parse with this module, so a
//! construct the sanitizer cannot see cannot reach execution either.

use std::fmt;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// An expression in the compiled call form.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Num(f64),
    Bool(bool),
    /// A reference to an injected binding (e.g. `frame`).
    Ident(String),
    /// A call to an injected primitive.
    Call { target: String, args: Vec<Expr> },
    /// A property map: `{"key": value, ...}`.
    Map(Vec<(String, Expr)>),
    /// A child list: `[a, b, c]`.
    List(Vec<Expr>),
}

/// A parsed compiled body: `Name := expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryAssignment {
    pub name: String,
    pub body: Expr,
}

impl Expr {
    /// Collect every call target and free identifier in the tree.
    /// Used to enforce the allowed-primitive invariant.
    pub fn collect_names(&self, calls: &mut Vec<String>, idents: &mut Vec<String>) {
        match self {
            Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) => {}
            Expr::Ident(name) => idents.push(name.clone()),
            Expr::Call { target, args } => {
                calls.push(target.clone());
                for arg in args {
                    arg.collect_names(calls, idents);
                }
            }
            Expr::Map(entries) => {
                for (_, value) in entries {
                    value.collect_names(calls, idents);
                }
            }
            Expr::List(items) => {
                for item in items {
                    item.collect_names(calls, idents);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    /// Canonical textual form; round-trips through [`parse_assignment`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Expr::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Call { target, args } => {
                write!(f, "{target}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{key}\": {value}")?;
                }
                write!(f, "}}")
            }
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for FactoryAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.name, self.body)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A syntax error in a compiled body, with the offending snippet.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (near `{snippet}`)")]
pub struct ParseError {
    pub message: String,
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Assign, // :=
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
}

fn snippet_at(input: &str, pos: usize) -> String {
    let end = (pos + 24).min(input.len());
    // Stay on a char boundary.
    let mut end = end;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let mut start = pos.min(input.len());
    while !input.is_char_boundary(start) {
        start -= 1;
    }
    input[start..end].to_string()
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'=' {
                    tokens.push(Token::Assign);
                    i += 2;
                } else {
                    tokens.push(Token::Colon);
                    i += 1;
                }
            }
            '"' => {
                let mut value = String::new();
                let mut j = i + 1;
                let mut closed = false;
                while j < bytes.len() {
                    match bytes[j] as char {
                        '\\' if j + 1 < bytes.len() => {
                            value.push(bytes[j + 1] as char);
                            j += 2;
                        }
                        '"' => {
                            closed = true;
                            j += 1;
                            break;
                        }
                        _ => {
                            // Multi-byte chars: copy the full char.
                            let rest = &input[j..];
                            let ch = rest.chars().next().unwrap();
                            value.push(ch);
                            j += ch.len_utf8();
                        }
                    }
                }
                if !closed {
                    return Err(ParseError {
                        message: "unterminated string literal".into(),
                        snippet: snippet_at(input, i),
                    });
                }
                tokens.push(Token::Str(value));
                i = j;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.')
                {
                    i += 1;
                }
                let text = &input[start..i];
                let value: f64 = text.parse().map_err(|_| ParseError {
                    message: format!("invalid number '{text}'"),
                    snippet: snippet_at(input, start),
                })?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(input[start..i].to_string()));
            }
            other => {
                return Err(ParseError {
                    message: format!("unexpected character '{other}'"),
                    snippet: snippet_at(input, i),
                });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            snippet: snippet_at(self.input, self.input.len().saturating_sub(24)),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {what}, found {token:?}"))),
            None => Err(self.error(format!("expected {what}, found end of input"))),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) if name == "true" => Ok(Expr::Bool(true)),
            Some(Token::Ident(name)) if name == "false" => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.next(); // consume '('
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.expr()?);
                            match self.peek() {
                                Some(Token::Comma) => {
                                    self.next();
                                }
                                _ => break,
                            }
                        }
                    }
                    self.expect(Token::RParen, "')'")?;
                    Ok(Expr::Call { target: name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LBrace) => {
                let mut entries = Vec::new();
                if self.peek() != Some(&Token::RBrace) {
                    loop {
                        let key = match self.next() {
                            Some(Token::Str(key)) => key,
                            other => {
                                return Err(
                                    self.error(format!("expected map key string, found {other:?}"))
                                )
                            }
                        };
                        self.expect(Token::Colon, "':'")?;
                        entries.push((key, self.expr()?));
                        match self.peek() {
                            Some(Token::Comma) => {
                                self.next();
                            }
                            _ => break,
                        }
                    }
                }
                self.expect(Token::RBrace, "'}'")?;
                Ok(Expr::Map(entries))
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.expr()?);
                        match self.peek() {
                            Some(Token::Comma) => {
                                self.next();
                            }
                            _ => break,
                        }
                    }
                }
                self.expect(Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            other => Err(self.error(format!("expected expression, found {other:?}"))),
        }
    }
}

/// Parse a bare expression (used by the desugarer for attribute values).
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        input,
    };
    let expr = parser.expr()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing tokens after expression"));
    }
    Ok(expr)
}

/// Parse a full compiled body: `Name := expr`.
pub fn parse_assignment(input: &str) -> Result<FactoryAssignment, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        input,
    };

    let name = match parser.next() {
        Some(Token::Ident(name)) => name,
        other => {
            return Err(parser.error(format!("expected factory name, found {other:?}")));
        }
    };
    parser.expect(Token::Assign, "':='")?;
    let body = parser.expr()?;

    if parser.peek().is_some() {
        return Err(parser.error("trailing tokens after factory body"));
    }

    Ok(FactoryAssignment { name, body })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_assignment() {
        let parsed = parse_assignment("Logo := stage({}, [])").unwrap();
        assert_eq!(parsed.name, "Logo");
        assert_eq!(
            parsed.body,
            Expr::Call {
                target: "stage".into(),
                args: vec![Expr::Map(vec![]), Expr::List(vec![])],
            }
        );
    }

    #[test]
    fn parses_nested_calls_and_bindings() {
        let body = r##"Spin := stage({"background": "#101018"}, [text({"content": "LOGO", "rotate": interpolate(frame, 0, 59, 0, 360)}, [])])"##;
        let parsed = parse_assignment(body).unwrap();

        let mut calls = Vec::new();
        let mut idents = Vec::new();
        parsed.body.collect_names(&mut calls, &mut idents);
        assert_eq!(calls, vec!["stage", "text", "interpolate"]);
        assert_eq!(idents, vec!["frame"]);
    }

    #[test]
    fn parses_booleans_and_negative_numbers() {
        let parsed =
            parse_assignment(r#"X := box({"visible": true, "x": -12.5}, [])"#).unwrap();
        match parsed.body {
            Expr::Call { args, .. } => match &args[0] {
                Expr::Map(entries) => {
                    assert_eq!(entries[0].1, Expr::Bool(true));
                    assert_eq!(entries[1].1, Expr::Num(-12.5));
                }
                other => panic!("expected map, got {other:?}"),
            },
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn string_escapes_roundtrip() {
        let parsed = parse_assignment(r#"T := text({"content": "say \"hi\""}, [])"#).unwrap();
        let printed = parsed.to_string();
        let reparsed = parse_assignment(&printed).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn display_roundtrips() {
        let body = r##"Spin := stage({"background": "#101018"}, [sequence(0, 30, text({"content": "A"}, [])), sequence(30, 30, text({"content": "B"}, []))])"##;
        let parsed = parse_assignment(body).unwrap();
        let reparsed = parse_assignment(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn rejects_missing_assign() {
        assert!(parse_assignment("Logo stage({}, [])").is_err());
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse_assignment("Logo := stage({}, []) extra").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = parse_assignment(r#"Logo := text({"content": "oops}, [])"#).unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn rejects_unexpected_character() {
        let err = parse_assignment("Logo := stage({}, []) ; drop").unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn error_carries_snippet() {
        let err = parse_assignment("Logo := @bad").unwrap_err();
        assert!(!err.snippet.is_empty());
    }

    #[test]
    fn no_member_access_in_grammar() {
        // `Runtime.frame` cannot parse: '.' is not a token.
        assert!(parse_assignment("X := Runtime.frame").is_err());
    }
}
