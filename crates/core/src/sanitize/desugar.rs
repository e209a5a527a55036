//! Rule 4: markup lowers to plain calls over the primitive surface.
//!
//! `<Stage background="#101018"><Text content="LOGO" /></Stage>` becomes
//! `stage({"background": "#101018"}, [text({"content": "LOGO"}, [])])`.
//! Every element lowers to the same shape, `prim(props, children)`, so the
//! interpreter needs exactly one calling convention. Tags outside the fixed
//! surface fail the transform rather than lowering to an unknown call.

use std::sync::OnceLock;

use regex::Regex;

use crate::callform::{parse_expr, Expr};
use crate::capability::{is_allowed_binding, is_allowed_call};
use crate::sanitize::{TransformViolation, RULE_DESUGAR};

/// Markup tags and the primitives they lower to.
const TAG_PRIMITIVES: &[(&str, &str)] = &[
    ("Stage", "stage"),
    ("Box", "box"),
    ("Text", "text"),
    ("Sequence", "sequence"),
    ("Image", "image"),
    ("Video", "video"),
    ("Audio", "audio"),
    ("Font", "font"),
    ("Icon", "icon"),
];

fn primitive_for_tag(tag: &str) -> Option<&'static str> {
    TAG_PRIMITIVES
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, p)| *p)
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r":\s*(?:number|string|boolean|Element|Frame)\b").expect("static regex")
    })
}

/// Remove source-dialect type annotations. The compiled form is untyped;
/// values carry their own shape.
pub fn strip_type_annotations(source: &str) -> String {
    annotation_re().replace_all(source, "").into_owned()
}

/// Lower a markup block to a single call-form expression.
pub fn markup_to_expr(markup: &str) -> Result<Expr, TransformViolation> {
    let mut parser = MarkupParser {
        input: markup,
        pos: 0,
    };
    parser.skip_ws();
    let root = parser.element()?;
    parser.skip_ws();
    if parser.pos < parser.input.len() {
        return Err(parser.violation("trailing content after the root element"));
    }
    Ok(root)
}

/// Enforce the allowed-primitive invariant over a lowered expression:
/// every call target must be a surface primitive, every free identifier an
/// injected timing binding.
pub fn validate_surface(expr: &Expr) -> Result<(), TransformViolation> {
    let mut calls = Vec::new();
    let mut idents = Vec::new();
    expr.collect_names(&mut calls, &mut idents);

    for call in &calls {
        if !is_allowed_call(call) {
            return Err(TransformViolation::new(
                RULE_DESUGAR,
                call.as_str(),
                "call target is not an allowed primitive",
            ));
        }
    }
    for ident in &idents {
        if !is_allowed_binding(ident) {
            return Err(TransformViolation::new(
                RULE_DESUGAR,
                ident.as_str(),
                "identifier is not an injected timing binding",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Markup parser
// ---------------------------------------------------------------------------

struct MarkupParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> MarkupParser<'a> {
    fn bytes(&self) -> &[u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn violation(&self, detail: impl Into<String>) -> TransformViolation {
        let end = (self.pos + 32).min(self.input.len());
        let mut end = end;
        while !self.input.is_char_boundary(end) {
            end -= 1;
        }
        TransformViolation::new(RULE_DESUGAR, &self.input[self.pos..end], detail)
    }

    fn ident(&mut self) -> Result<String, TransformViolation> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.violation("expected an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn expect(&mut self, c: u8, what: &str) -> Result<(), TransformViolation> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.violation(format!("expected {what}")))
        }
    }

    /// `<Tag attrs*/>` or `<Tag attrs*>children</Tag>`.
    fn element(&mut self) -> Result<Expr, TransformViolation> {
        self.expect(b'<', "'<' opening an element")?;
        let tag = self.ident()?;
        let target = primitive_for_tag(&tag).ok_or_else(|| {
            TransformViolation::new(
                RULE_DESUGAR,
                tag.as_str(),
                "tag is not part of the allowed primitive surface",
            )
        })?;

        let mut props = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>', "'>' after '/'")?;
                    return Ok(call(target, props, Vec::new()));
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let name = self.ident()?;
                    self.expect(b'=', "'=' after attribute name")?;
                    props.push((name, self.attr_value()?));
                }
                None => return Err(self.violation("unterminated element")),
            }
        }

        let mut children = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'<') if self.bytes().get(self.pos + 1) == Some(&b'/') => {
                    self.pos += 2;
                    let closing = self.ident()?;
                    if closing != tag {
                        return Err(TransformViolation::new(
                            RULE_DESUGAR,
                            closing.as_str(),
                            format!("closing tag does not match '{tag}'"),
                        ));
                    }
                    self.skip_ws();
                    self.expect(b'>', "'>' closing the element")?;
                    return Ok(call(target, props, children));
                }
                Some(b'<') => children.push(self.element()?),
                Some(b'{') => children.push(self.brace_expr()?),
                Some(_) | None => return Err(self.violation("expected a child or closing tag")),
            }
        }
    }

    /// `"string"`, `{expr}`, a bare number, or a bare boolean.
    fn attr_value(&mut self) -> Result<Expr, TransformViolation> {
        match self.peek() {
            Some(b'"') => {
                let start = self.pos;
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        Some(b'\\') => {
                            self.pos += 1;
                            if let Some(c) = self.peek() {
                                value.push(c as char);
                                self.pos += 1;
                            }
                        }
                        Some(b'"') => {
                            self.pos += 1;
                            return Ok(Expr::Str(value));
                        }
                        Some(_) => {
                            let ch = self.input[self.pos..].chars().next().ok_or_else(|| {
                                self.violation("invalid utf-8 in string attribute")
                            })?;
                            value.push(ch);
                            self.pos += ch.len_utf8();
                        }
                        None => {
                            self.pos = start;
                            return Err(self.violation("unterminated string attribute"));
                        }
                    }
                }
            }
            Some(b'{') => self.brace_expr(),
            Some(c) if c.is_ascii_digit() || c == b'-' => {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
                    self.pos += 1;
                }
                let text = &self.input[start..self.pos];
                text.parse()
                    .map(Expr::Num)
                    .map_err(|_| TransformViolation::new(RULE_DESUGAR, text, "invalid number"))
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.ident()?;
                match word.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    other => Err(TransformViolation::new(
                        RULE_DESUGAR,
                        other,
                        "bare attribute value must be a boolean",
                    )),
                }
            }
            _ => Err(self.violation("expected an attribute value")),
        }
    }

    /// A `{...}` embedded expression, parsed with the call-form grammar.
    fn brace_expr(&mut self) -> Result<Expr, TransformViolation> {
        let open = self.pos;
        let bytes = self.bytes();
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &self.input[open + 1..i];
                        self.pos = i + 1;
                        return parse_expr(inner.trim()).map_err(|e| {
                            TransformViolation::new(RULE_DESUGAR, e.snippet, e.message)
                        });
                    }
                }
                b'"' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(self.violation("unbalanced embedded expression"))
    }
}

fn call(target: &str, props: Vec<(String, Expr)>, children: Vec<Expr>) -> Expr {
    Expr::Call {
        target: target.to_string(),
        args: vec![Expr::Map(props), Expr::List(children)],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
