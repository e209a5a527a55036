//! Deterministic placeholder artifact bodies.
//!
//! When generation or transformation fails permanently, the pipeline
//! stores a placeholder compiled body under the job's component name so
//! the timeline never gains a gap: the scene renders as a neutral card of
//! identical planned duration instead of disappearing.

use crate::callform::{parse_assignment, FactoryAssignment};

/// Background color of the placeholder card.
pub const PLACEHOLDER_BACKGROUND: &str = "#14141c";

/// Message shown on the placeholder card.
pub const PLACEHOLDER_MESSAGE: &str = "Scene unavailable";

/// Build the deterministic placeholder compiled body for a component.
///
/// The output is a valid compiled body using only container primitives, so
/// it executes identically in interactive and restricted contexts. Duration
/// is carried by the scene reference, not the body, so the planned duration
/// is preserved by construction.
pub fn placeholder_body(component_name: &str) -> String {
    format!(
        "{component_name} := stage({{\"background\": \"{PLACEHOLDER_BACKGROUND}\", \"placeholder\": true}}, \
         [text({{\"content\": \"{PLACEHOLDER_MESSAGE}\"}}, [])])"
    )
}

/// Parsed form of the placeholder, for callers that evaluate directly.
pub fn placeholder_assignment(component_name: &str) -> FactoryAssignment {
    parse_assignment(&placeholder_body(component_name))
        .expect("placeholder body is statically valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::is_allowed_call;

    #[test]
    fn placeholder_is_deterministic() {
        assert_eq!(placeholder_body("Intro"), placeholder_body("Intro"));
    }

    #[test]
    fn placeholder_parses_under_assigned_name() {
        let parsed = placeholder_assignment("SpinningLogo");
        assert_eq!(parsed.name, "SpinningLogo");
    }

    #[test]
    fn placeholder_uses_only_allowed_primitives() {
        let parsed = placeholder_assignment("X");
        let mut calls = Vec::new();
        let mut idents = Vec::new();
        parsed.body.collect_names(&mut calls, &mut idents);
        assert!(calls.iter().all(|c| is_allowed_call(c)), "{calls:?}");
        assert!(idents.is_empty());
    }

    #[test]
    fn different_names_differ_only_in_name() {
        let a = placeholder_assignment("A");
        let b = placeholder_assignment("B");
        assert_eq!(a.body, b.body);
        assert_ne!(a.name, b.name);
    }
}
