//! Scripted generator for tests and offline development.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use scenesmith_core::job::GenerationRequest;

use crate::{GenerationError, SceneGenerator};

/// Default source emitted when no script is supplied.
pub const DEFAULT_MOCK_SOURCE: &str = r##"import { Stage, Text, interpolate } from "@scenesmith/runtime";

// @duration: 2s

export default component MockScene {
  <Stage background="#101018">
    <Text content="MOCK" rotate={interpolate(Runtime.frame, 0, 59, 0, 360)} />
  </Stage>
}
"##;

/// A generator that replays scripted responses and counts invocations.
///
/// Responses are consumed in order; once the script is exhausted, the
/// last entry repeats. An empty script replays [`DEFAULT_MOCK_SOURCE`].
pub struct MockSceneGenerator {
    script: Mutex<Vec<Result<String, String>>>,
    cursor: AtomicUsize,
    invocations: AtomicUsize,
}

impl MockSceneGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Queue a successful response.
    pub fn respond_with(self, source: impl Into<String>) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push(Ok(source.into()));
        self
    }

    /// Queue a transport failure.
    pub fn fail_with(self, detail: impl Into<String>) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push(Err(detail.into()));
        self
    }

    /// How many times `generate` has been called.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Default for MockSceneGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneGenerator for MockSceneGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        let script = self.script.lock().expect("mock script lock");
        if script.is_empty() {
            return Ok(DEFAULT_MOCK_SOURCE.to_string());
        }

        let index = self
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(script.len() - 1);
        match &script[index] {
            Ok(source) => Ok(source.clone()),
            Err(detail) => Err(GenerationError::Transport(detail.clone())),
        }
    }
}
