//! Sanitizer/transformer: raw generated source to a restricted compiled body.
//!
//! The rules run in a fixed order and are independently testable:
//!
//! 1. [`imports`] — reject any import outside the internal runtime namespace.
//! 2. [`globals`] — rewrite ambient-global runtime references into local
//!    bindings resolved via capability injection.
//! 3. [`exports`] — rewrite the default export into a uniquely named
//!    factory assignment.
//! 4. [`desugar`] — lower markup into plain calls, strip type annotations,
//!    and enforce the allowed-primitive surface.
//! 5. [`stubs`] — replace convenience-only primitives with layout-preserving
//!    no-ops. Applied by restricted execution contexts only, not during the
//!    stored compile.
//!
//! Any rule that cannot complete fails the whole transform with the rule
//! number and an offending snippet.

pub mod desugar;
pub mod exports;
pub mod globals;
pub mod imports;
pub mod stubs;

use regex::Regex;

use crate::callform::FactoryAssignment;
use crate::error::PipelineError;
use crate::types::DEFAULT_FPS;

pub use exports::extract_declared_name;
pub use stubs::apply_restricted_stubs;

// ---------------------------------------------------------------------------
// Rule numbering
// ---------------------------------------------------------------------------

pub const RULE_IMPORTS: u8 = 1;
pub const RULE_GLOBALS: u8 = 2;
pub const RULE_EXPORTS: u8 = 3;
pub const RULE_DESUGAR: u8 = 4;
pub const RULE_STUBS: u8 = 5;

// ---------------------------------------------------------------------------
// Failure type
// ---------------------------------------------------------------------------

/// A sanitizer rule violation: the failing rule number plus the offending
/// snippet from the source.
#[derive(Debug, Clone, thiserror::Error)]
#[error("rule {rule}: {detail} (near `{snippet}`)")]
pub struct TransformViolation {
    pub rule: u8,
    pub snippet: String,
    pub detail: String,
}

impl TransformViolation {
    pub fn new(rule: u8, snippet: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule,
            snippet: snippet.into(),
            detail: detail.into(),
        }
    }
}

impl From<TransformViolation> for PipelineError {
    fn from(v: TransformViolation) -> Self {
        PipelineError::TransformFailed {
            rule: v.rule,
            snippet: v.snippet,
            detail: v.detail,
        }
    }
}

// ---------------------------------------------------------------------------
// Options / output
// ---------------------------------------------------------------------------

/// Per-compile options. `assigned_name` is the per-project unique component
/// name computed by the caller (see [`crate::naming`]).
#[derive(Debug, Clone)]
pub struct SanitizeOptions {
    pub assigned_name: String,
    /// Frame rate used to convert a frame-based duration pragma to seconds.
    pub fps: u32,
}

impl SanitizeOptions {
    pub fn new(assigned_name: impl Into<String>) -> Self {
        Self {
            assigned_name: assigned_name.into(),
            fps: DEFAULT_FPS,
        }
    }
}

/// The sanitizer output: the compiled body plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    /// Plain-call factory assignment, executable without further transforms.
    pub body: String,
    /// The unique per-project component name the factory was assigned.
    pub component_name: String,
    /// Duration override detected in the source, converted to seconds.
    pub duration_override_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run rules 1-4 over raw generated source.
///
/// Rule 5 (restricted stubs) is applied at execution time by restricted
/// contexts via [`apply_restricted_stubs`], so one stored artifact serves
/// both the interactive and the batch strategy.
pub fn sanitize(
    source: &str,
    opts: &SanitizeOptions,
) -> Result<CompiledArtifact, TransformViolation> {
    let duration_override_secs = detect_duration_override(source, opts.fps);

    // Rule 1: imports must stay inside the runtime namespace.
    imports::check_imports(source)?;
    let without_imports = imports::strip_imports(source);

    // Rule 2: ambient globals become local capability bindings.
    let localized = globals::rewrite_ambient_globals(&without_imports)?;

    // Rule 3: locate the default export and pull out its markup.
    let markup = exports::extract_markup(&localized)?;

    // Rule 4: markup to plain calls, annotations stripped, surface enforced.
    let stripped = desugar::strip_type_annotations(&markup);
    let body = desugar::markup_to_expr(&stripped)?;
    desugar::validate_surface(&body)?;

    let assignment = FactoryAssignment {
        name: opts.assigned_name.clone(),
        body,
    };

    Ok(CompiledArtifact {
        body: assignment.to_string(),
        component_name: opts.assigned_name.clone(),
        duration_override_secs,
    })
}

/// Detect a `// @duration: <n>s` or `// @duration: <n> frames` pragma.
fn detect_duration_override(source: &str, fps: u32) -> Option<f64> {
    let re = Regex::new(r"@duration:\s*([0-9]+(?:\.[0-9]+)?)\s*(s|secs|seconds|frames?)")
        .expect("static regex");
    let caps = re.captures(source)?;
    let value: f64 = caps[1].parse().ok()?;
    match &caps[2] {
        "s" | "secs" | "seconds" => Some(value),
        _ => Some(value / fps.max(1) as f64),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callform::parse_assignment;

    const VALID_SOURCE: &str = r##"
import { Stage, Text, interpolate } from "@scenesmith/runtime";

// @duration: 2s

export default component SpinningLogo {
  <Stage background="#101018">
    <Text content="LOGO" rotate={interpolate(Runtime.frame, 0, 59, 0, 360)} />
  </Stage>
}
"##;

    #[test]
    fn valid_source_compiles() {
        let compiled = sanitize(VALID_SOURCE, &SanitizeOptions::new("SpinningLogo")).unwrap();
        assert_eq!(compiled.component_name, "SpinningLogo");
        assert_eq!(compiled.duration_override_secs, Some(2.0));

        let parsed = parse_assignment(&compiled.body).unwrap();
        assert_eq!(parsed.name, "SpinningLogo");
    }

    #[test]
    fn assigned_name_wins_over_declared_name() {
        let compiled = sanitize(VALID_SOURCE, &SanitizeOptions::new("SpinningLogo1")).unwrap();
        assert!(compiled.body.starts_with("SpinningLogo1 := "));
    }

    #[test]
    fn compiled_body_needs_no_further_transform() {
        let compiled = sanitize(VALID_SOURCE, &SanitizeOptions::new("SpinningLogo")).unwrap();
        // No imports, no markup, no ambient references survive.
        assert!(!compiled.body.contains("import"));
        assert!(!compiled.body.contains('<'));
        assert!(!compiled.body.contains("Runtime."));
    }

    #[test]
    fn foreign_import_fails_rule_one() {
        let source = r#"
import { readFile } from "fs";
export default component X { <Stage /> }
"#;
        let err = sanitize(source, &SanitizeOptions::new("X")).unwrap_err();
        assert_eq!(err.rule, RULE_IMPORTS);
        assert!(err.snippet.contains("fs"));
    }

    #[test]
    fn unknown_ambient_reference_fails_rule_two() {
        let source = r#"
export default component X {
  <Stage width={Runtime.screenWidth} />
}
"#;
        let err = sanitize(source, &SanitizeOptions::new("X")).unwrap_err();
        assert_eq!(err.rule, RULE_GLOBALS);
    }

    #[test]
    fn missing_default_export_fails_rule_three() {
        let source = "component X { <Stage /> }";
        let err = sanitize(source, &SanitizeOptions::new("X")).unwrap_err();
        assert_eq!(err.rule, RULE_EXPORTS);
    }

    #[test]
    fn disallowed_tag_fails_rule_four() {
        let source = r#"
export default component X {
  <Marquee speed=3 />
}
"#;
        let err = sanitize(source, &SanitizeOptions::new("X")).unwrap_err();
        assert_eq!(err.rule, RULE_DESUGAR);
        assert!(err.snippet.contains("Marquee"));
    }

    #[test]
    fn duration_pragma_in_frames_converts_via_fps() {
        let source = r#"
// @duration: 90 frames
export default component X { <Stage /> }
"#;
        let compiled = sanitize(source, &SanitizeOptions::new("X")).unwrap();
        assert_eq!(compiled.duration_override_secs, Some(3.0));
    }

    #[test]
    fn no_pragma_means_no_override() {
        let source = "export default component X { <Stage /> }";
        let compiled = sanitize(source, &SanitizeOptions::new("X")).unwrap();
        assert_eq!(compiled.duration_override_secs, None);
    }
}
