//! Execution of compiled scene artifacts.
//!
//! Two loading strategies share one interpreter:
//!
//! - [`interactive`] — preview sessions mount artifacts under
//!   session-namespaced bindings with the full primitive surface.
//! - [`batch`] — restricted rendering applies media stubs before
//!   evaluation and substitutes a placeholder element on any error, so
//!   one broken scene never takes its siblings down.
//!
//! The [`registry`] composes executed scenes into a project timeline.

pub mod batch;
pub mod element;
pub mod interactive;
pub mod interpreter;
pub mod registry;

pub use batch::BatchExecutor;
pub use element::{Element, ElementKind};
pub use interactive::InteractiveSession;
pub use interpreter::{evaluate, ExecContext, ExecutionError};
pub use registry::{SceneRegistry, SceneSlot};
