//! Rule 3: the default export becomes a named factory assignment.
//!
//! Generated source declares exactly one component via
//! `export default component Name { <markup> }`. The sanitizer pulls the
//! markup block out so the desugarer can lower it, and the declared name
//! (if any) feeds the naming pass as a suggestion only; the caller's
//! assigned per-project name always wins.

use std::sync::OnceLock;

use regex::Regex;

use crate::sanitize::{TransformViolation, RULE_EXPORTS};

fn export_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"export\s+default\s+(?:component\s+([A-Za-z_][A-Za-z0-9_]*)\s*)?\{")
            .expect("static regex")
    })
}

/// The component name declared in the default export, if the generator
/// emitted one. Used only as a naming suggestion.
pub fn extract_declared_name(source: &str) -> Option<String> {
    export_re()
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the markup block of the single default export.
pub fn extract_markup(source: &str) -> Result<String, TransformViolation> {
    let mut matches = export_re().find_iter(source);

    let header = match matches.next() {
        Some(m) => m,
        None => {
            return Err(TransformViolation::new(
                RULE_EXPORTS,
                source.trim().chars().take(48).collect::<String>(),
                "source has no default component export",
            ));
        }
    };
    if matches.next().is_some() {
        return Err(TransformViolation::new(
            RULE_EXPORTS,
            "export default",
            "source declares more than one default export",
        ));
    }

    // The regex match ends on the opening brace; scan to its mate.
    let body_start = header.end();
    let body_end = matching_brace(source, header.end() - 1).ok_or_else(|| {
        TransformViolation::new(
            RULE_EXPORTS,
            source[header.start()..].chars().take(48).collect::<String>(),
            "default export block is not brace-balanced",
        )
    })?;

    Ok(source[body_start..body_end].trim().to_string())
}

/// Position of the `}` matching the `{` at `open`, string-aware.
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
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
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_markup_from_named_component() {
        let src = "export default component Logo {\n  <Stage background=\"#000\" />\n}";
        let markup = extract_markup(src).unwrap();
        assert_eq!(markup, "<Stage background=\"#000\" />");
    }

    #[test]
    fn extracts_markup_from_anonymous_export() {
        let src = "export default {\n  <Stage />\n}";
        assert_eq!(extract_markup(src).unwrap(), "<Stage />");
    }

    #[test]
    fn declared_name_is_reported() {
        let src = "export default component SpinningLogo { <Stage /> }";
        assert_eq!(extract_declared_name(src).as_deref(), Some("SpinningLogo"));
    }

    #[test]
    fn anonymous_export_has_no_declared_name() {
        assert_eq!(extract_declared_name("export default { <Stage /> }"), None);
    }

    #[test]
    fn missing_export_rejected() {
        let err = extract_markup("component X { <Stage /> }").unwrap_err();
        assert_eq!(err.rule, RULE_EXPORTS);
        assert!(err.detail.contains("no default"));
    }

    #[test]
    fn multiple_exports_rejected() {
        let src = "export default component A { <Stage /> }\nexport default component B { <Stage /> }";
        let err = extract_markup(src).unwrap_err();
        assert!(err.detail.contains("more than one"));
    }

    #[test]
    fn nested_braces_in_markup_are_balanced() {
        let src = "export default component X { <Text rotate={interpolate(frame, 0, 59, 0, 360)} /> }";
        let markup = extract_markup(src).unwrap();
        assert!(markup.contains("interpolate(frame"));
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let src = r#"export default component X { <Text content="curly } brace" /> }"#;
        let markup = extract_markup(src).unwrap();
        assert!(markup.contains("curly } brace"));
    }

    #[test]
    fn unbalanced_block_rejected() {
        let err = extract_markup("export default component X { <Stage ").unwrap_err();
        assert!(err.detail.contains("brace-balanced"));
    }
}
