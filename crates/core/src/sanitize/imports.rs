//! Rule 1: imports must stay inside the internal runtime namespace.

use std::sync::OnceLock;

use regex::Regex;

use crate::capability::RUNTIME_NAMESPACE;
use crate::sanitize::{TransformViolation, RULE_IMPORTS};

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*import\s+.*?\s+from\s+"([^"]+)"\s*;?\s*$"#).expect("static regex")
    })
}

fn require_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"require\(\s*"([^"]+)"\s*\)"#).expect("static regex"))
}

/// Reject any import/require referencing anything outside the runtime
/// namespace.
pub fn check_imports(source: &str) -> Result<(), TransformViolation> {
    for caps in import_re().captures_iter(source) {
        let path = &caps[1];
        if !path.starts_with(RUNTIME_NAMESPACE) {
            return Err(TransformViolation::new(
                RULE_IMPORTS,
                caps[0].trim(),
                format!("import of '{path}' is outside the runtime namespace"),
            ));
        }
    }
    for caps in require_re().captures_iter(source) {
        let path = &caps[1];
        if !path.starts_with(RUNTIME_NAMESPACE) {
            return Err(TransformViolation::new(
                RULE_IMPORTS,
                caps[0].trim(),
                format!("require of '{path}' is outside the runtime namespace"),
            ));
        }
    }
    Ok(())
}

/// Remove import lines. The compiled form resolves every name through the
/// injected capability table, so no import survives compilation.
pub fn strip_imports(source: &str) -> String {
    import_re().replace_all(source, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_namespace_import_passes() {
        let src = r#"import { Stage } from "@scenesmith/runtime";"#;
        assert!(check_imports(src).is_ok());
    }

    #[test]
    fn runtime_subpath_import_passes() {
        let src = r#"import { easings } from "@scenesmith/runtime/easings";"#;
        assert!(check_imports(src).is_ok());
    }

    #[test]
    fn foreign_import_rejected() {
        let src = r#"import fs from "fs";"#;
        let err = check_imports(src).unwrap_err();
        assert_eq!(err.rule, RULE_IMPORTS);
        assert!(err.detail.contains("'fs'"));
    }

    #[test]
    fn foreign_require_rejected() {
        let src = r#"const net = require("net");"#;
        let err = check_imports(src).unwrap_err();
        assert!(err.snippet.contains("net"));
    }

    #[test]
    fn mixed_imports_rejected_on_first_foreign() {
        let src = "import { Stage } from \"@scenesmith/runtime\";\nimport axios from \"axios\";";
        assert!(check_imports(src).is_err());
    }

    #[test]
    fn strip_removes_import_lines_only() {
        let src = "import { Stage } from \"@scenesmith/runtime\";\nexport default component X { <Stage /> }";
        let stripped = strip_imports(src);
        assert!(!stripped.contains("import"));
        assert!(stripped.contains("export default"));
    }
}
