//! Rule 2: ambient-global runtime references become local bindings.
//!
//! Generated source may reference the host runtime namespace ambiently
//! (`Runtime.frame`). Compiled artifacts must not: every timing value is
//! injected as a local binding at execution time, which removes the hidden
//! coupling between an artifact and whatever host happens to surround it.

use std::sync::OnceLock;

use regex::Regex;

use crate::sanitize::{TransformViolation, RULE_GLOBALS};

/// Known ambient references and the local bindings they lower to.
const AMBIENT_REWRITES: &[(&str, &str)] = &[
    ("Runtime.frame", "frame"),
    ("Runtime.fps", "fps"),
    ("Runtime.durationFrames", "duration_frames"),
];

/// Host namespaces that must not survive compilation in any form.
const FORBIDDEN_NAMESPACES: &[&str] = &["Runtime.", "window.", "globalThis.", "document."];

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:Runtime|window|globalThis|document)\.\w+").expect("static regex")
    })
}

/// Rewrite known ambient references to local bindings, then reject any
/// remaining host-namespace reference.
pub fn rewrite_ambient_globals(source: &str) -> Result<String, TransformViolation> {
    let mut out = source.to_string();
    for (ambient, local) in AMBIENT_REWRITES {
        out = out.replace(ambient, local);
    }

    if let Some(m) = namespace_re().find(&out) {
        return Err(TransformViolation::new(
            RULE_GLOBALS,
            m.as_str(),
            "ambient host reference cannot be lowered to a capability binding",
        ));
    }

    // Belt and braces: the find above catches `ns.ident`, this catches a
    // bare trailing `ns.` left by malformed source.
    for ns in FORBIDDEN_NAMESPACES {
        if out.contains(ns) {
            return Err(TransformViolation::new(
                RULE_GLOBALS,
                *ns,
                "ambient host reference cannot be lowered to a capability binding",
            ));
        }
    }

    Ok(out)
}
