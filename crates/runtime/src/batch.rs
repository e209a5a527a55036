//! Restricted loading strategy for batch rendering.
//!
//! Batch contexts cannot load media, so configured media primitives are
//! rewritten to layout-preserving stubs before evaluation. Any failure
//! (corrupt body, evaluation error) yields a placeholder element of the
//! same slot instead of an error, so one broken scene never takes its
//! siblings down.

use scenesmith_core::callform::parse_assignment;
use scenesmith_core::capability::StubConfig;
use scenesmith_core::placeholder::{PLACEHOLDER_BACKGROUND, PLACEHOLDER_MESSAGE};
use scenesmith_core::sanitize::apply_restricted_stubs;

use crate::element::{Element, ElementKind};
use crate::interpreter::{evaluate, ExecContext};

/// Executes compiled bodies under the restricted surface.
pub struct BatchExecutor {
    stub_config: StubConfig,
}

impl BatchExecutor {
    pub fn new(stub_config: StubConfig) -> Self {
        Self { stub_config }
    }

    /// Execute one compiled body at a frame. Never fails: errors render
    /// as the placeholder card.
    pub fn execute(&self, compiled_body: &str, ctx: &ExecContext) -> Element {
        match self.try_execute(compiled_body, ctx) {
            Ok(element) => element,
            Err(detail) => {
                tracing::warn!(detail = %detail, "Scene failed in batch, rendering placeholder");
                placeholder_element()
            }
        }
    }

    /// Execute an ordered set of scenes at a frame. Each scene is
    /// isolated: a failure becomes that scene's placeholder only.
    pub fn execute_all(&self, compiled_bodies: &[&str], ctx: &ExecContext) -> Vec<Element> {
        compiled_bodies
            .iter()
            .map(|body| self.execute(body, ctx))
            .collect()
    }

    fn try_execute(&self, compiled_body: &str, ctx: &ExecContext) -> Result<Element, String> {
        let assignment = parse_assignment(compiled_body).map_err(|e| e.to_string())?;
        let restricted = apply_restricted_stubs(&assignment.body, &self.stub_config);
        evaluate(&restricted, ctx).map_err(|e| e.to_string())
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(StubConfig::default())
    }
}

/// The neutral card a failed scene renders as. Same card in every
/// context; duration is carried by the scene reference, not the body.
fn placeholder_element() -> Element {
    let mut stage_props = crate::element::Props::new();
    stage_props.insert("background".into(), PLACEHOLDER_BACKGROUND.into());
    stage_props.insert("placeholder".into(), true.into());

    let mut text_props = crate::element::Props::new();
    text_props.insert("content".into(), PLACEHOLDER_MESSAGE.into());

    Element::new(ElementKind::Stage)
        .with_props(stage_props)
        .with_children(vec![Element::new(ElementKind::Text).with_props(text_props)])
}
