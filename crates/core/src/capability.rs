//! The fixed primitive surface of the scene component dialect.
//!
//! Generated components may only reference the names enumerated here.
//! The sanitizer enforces this at compile time and the runtime resolves
//! every name through an injected capability table — never an ambient
//! lookup. The restricted-context stub set is configuration, not a
//! constant, because the product's convenience-feature list evolves.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Primitive surface
// ---------------------------------------------------------------------------

/// Container primitives that produce layout elements.
pub const CONTAINER_PRIMITIVES: &[&str] = &["stage", "box", "text"];

/// Timing bindings injected per execution (not callable).
pub const TIMING_BINDINGS: &[&str] = &["frame", "fps", "duration_frames"];

/// Interpolation primitives mapping frame ranges to value ranges.
pub const INTERPOLATION_PRIMITIVES: &[&str] = &["interpolate", "ease"];

/// Sequencing primitives that window children in time.
pub const SEQUENCING_PRIMITIVES: &[&str] = &["sequence"];

/// Convenience/media primitives. Active in interactive contexts,
/// replaced by layout-preserving stubs in restricted contexts.
pub const MEDIA_PRIMITIVES: &[&str] = &["image", "video", "audio", "font", "icon"];

/// The stub call emitted when a media primitive is replaced.
pub const MEDIA_STUB: &str = "media_stub";

/// The only import namespace generated source may reference.
pub const RUNTIME_NAMESPACE: &str = "@scenesmith/runtime";

/// Whether `name` is a callable primitive in the full (interactive) surface.
pub fn is_allowed_call(name: &str) -> bool {
    CONTAINER_PRIMITIVES.contains(&name)
        || INTERPOLATION_PRIMITIVES.contains(&name)
        || SEQUENCING_PRIMITIVES.contains(&name)
        || MEDIA_PRIMITIVES.contains(&name)
        || name == MEDIA_STUB
}

/// Whether `name` is an injected timing binding.
pub fn is_allowed_binding(name: &str) -> bool {
    TIMING_BINDINGS.contains(&name)
}

/// Validate that a name is part of the primitive surface (call or binding).
pub fn validate_primitive(name: &str) -> Result<(), CoreError> {
    if is_allowed_call(name) || is_allowed_binding(name) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'{name}' is not part of the allowed primitive surface"
        )))
    }
}

// ---------------------------------------------------------------------------
// Restricted-context stub configuration
// ---------------------------------------------------------------------------

/// The set of primitives replaced with no-op equivalents in restricted
/// execution contexts (batch render). Supplied by the caller; the default
/// covers the current convenience feature set.
#[derive(Debug, Clone)]
pub struct StubConfig {
    stubbed: Vec<String>,
}

impl StubConfig {
    /// Build a stub config from an explicit primitive list.
    ///
    /// Unknown names are rejected so a typo cannot silently leave a
    /// primitive live in a restricted context.
    pub fn new(stubbed: &[&str]) -> Result<Self, CoreError> {
        for name in stubbed {
            if !MEDIA_PRIMITIVES.contains(name) {
                return Err(CoreError::Validation(format!(
                    "'{name}' is not a stub-eligible media primitive"
                )));
            }
        }
        Ok(Self {
            stubbed: stubbed.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Whether calls to `name` should be replaced with a stub.
    pub fn is_stubbed(&self, name: &str) -> bool {
        self.stubbed.iter().any(|s| s == name)
    }
}

impl Default for StubConfig {
    /// Stub every media primitive: dynamic fonts, icon components, and
    /// audio/video/image embeds.
    fn default() -> Self {
        Self {
            stubbed: MEDIA_PRIMITIVES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
