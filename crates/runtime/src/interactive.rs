//! Interactive loading strategy for preview sessions.
//!
//! A session mounts compiled artifacts under session-namespaced binding
//! names so two previews of the same component never collide. Mounting
//! the same URL twice is a no-op; mounting a new URL for an already
//! mounted component re-fetches and replaces the binding in place.
//! Interactive evaluation uses the full primitive surface, media included.

use std::collections::HashMap;
use std::sync::Arc;

use scenesmith_core::callform::{parse_assignment, FactoryAssignment};
use scenesmith_store::ArtifactStore;

use crate::element::Element;
use crate::interpreter::{evaluate, ExecContext, ExecutionError};

/// Errors surfaced to a preview session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Component '{0}' is not mounted")]
    NotMounted(String),

    #[error("Failed to fetch artifact: {0}")]
    Fetch(String),

    #[error("Artifact is not a valid compiled body: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

struct MountedScene {
    url: String,
    assignment: FactoryAssignment,
}

/// One preview session over an artifact store.
pub struct InteractiveSession {
    session_id: String,
    store: Arc<dyn ArtifactStore>,
    mounted: HashMap<String, MountedScene>,
    fetches: usize,
}

impl InteractiveSession {
    pub fn new(session_id: impl Into<String>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            mounted: HashMap::new(),
            fetches: 0,
        }
    }

    /// The session-namespaced binding a component mounts under.
    pub fn binding_name(&self, component_name: &str) -> String {
        format!("__scenesmith_preview_{}_{}", self.session_id, component_name)
    }

    /// Number of artifact fetches this session has performed.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn is_mounted(&self, component_name: &str) -> bool {
        self.mounted.contains_key(component_name)
    }

    /// Mount a component from its artifact URL. Re-mounting the same URL
    /// is free; a changed URL triggers a re-fetch and replaces the
    /// previous mount.
    pub async fn mount(&mut self, component_name: &str, url: &str) -> Result<(), SessionError> {
        if let Some(existing) = self.mounted.get(component_name) {
            if existing.url == url {
                return Ok(());
            }
        }

        let body = self
            .store
            .get(url)
            .await
            .map_err(|e| SessionError::Fetch(e.to_string()))?;
        self.fetches += 1;

        let assignment = parse_assignment(&body).map_err(|e| SessionError::Corrupt(e.to_string()))?;

        tracing::debug!(
            session = %self.session_id,
            component = component_name,
            binding = %self.binding_name(component_name),
            "Mounted artifact"
        );

        self.mounted.insert(
            component_name.to_string(),
            MountedScene {
                url: url.to_string(),
                assignment,
            },
        );
        Ok(())
    }

    /// Drop a mounted component and its binding.
    pub fn unmount(&mut self, component_name: &str) {
        if self.mounted.remove(component_name).is_some() {
            tracing::debug!(
                session = %self.session_id,
                component = component_name,
                "Unmounted artifact"
            );
        }
    }

    /// Evaluate a mounted component at a frame with the full surface.
    pub fn render(
        &self,
        component_name: &str,
        ctx: &ExecContext,
    ) -> Result<Element, SessionError> {
        let mounted = self
            .mounted
            .get(component_name)
            .ok_or_else(|| SessionError::NotMounted(component_name.to_string()))?;
        Ok(evaluate(&mounted.assignment.body, ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use scenesmith_store::MemoryArtifactStore;
    use uuid::Uuid;

    use crate::element::ElementKind;

    const BODY_V1: &str = r##"Logo := stage({"background": "#000"}, [image({"src": "logo.png"}, [])])"##;
    const BODY_V2: &str = r##"Logo := stage({"background": "#fff"}, [])"##;

    async fn store_with(bodies: &[&str]) -> (Arc<MemoryArtifactStore>, Vec<String>) {
        let store = Arc::new(MemoryArtifactStore::new());
        let project = Uuid::new_v4();
        let mut urls = Vec::new();
        for body in bodies {
            let stored = store.put(project, Uuid::new_v4(), body).await.unwrap();
            urls.push(stored.url);
        }
        (store, urls)
    }

    #[tokio::test]
    async fn mount_and_render_full_surface() {
        let (store, urls) = store_with(&[BODY_V1]).await;
        let mut session = InteractiveSession::new("s1", store);
        session.mount("Logo", &urls[0]).await.unwrap();

        let tree = session
            .render("Logo", &ExecContext::new(0.0, 30, 60))
            .unwrap();
        assert_eq!(tree.kind, ElementKind::Stage);
        // Interactive contexts keep media live.
        assert_eq!(tree.children[0].kind, ElementKind::Media("image".into()));
    }

    #[tokio::test]
    async fn remounting_same_url_skips_fetch() {
        let (store, urls) = store_with(&[BODY_V1]).await;
        let mut session = InteractiveSession::new("s1", store);

        session.mount("Logo", &urls[0]).await.unwrap();
        session.mount("Logo", &urls[0]).await.unwrap();
        assert_eq!(session.fetches(), 1);
    }

    #[tokio::test]
    async fn changed_url_refetches_and_replaces() {
        let (store, urls) = store_with(&[BODY_V1, BODY_V2]).await;
        let mut session = InteractiveSession::new("s1", store);

        session.mount("Logo", &urls[0]).await.unwrap();
        session.mount("Logo", &urls[1]).await.unwrap();
        assert_eq!(session.fetches(), 2);

        let tree = session
            .render("Logo", &ExecContext::new(0.0, 30, 60))
            .unwrap();
        assert_eq!(tree.props["background"], "#fff");
    }

    #[tokio::test]
    async fn unmounted_component_cannot_render() {
        let (store, urls) = store_with(&[BODY_V1]).await;
        let mut session = InteractiveSession::new("s1", store);
        session.mount("Logo", &urls[0]).await.unwrap();
        session.unmount("Logo");

        assert_matches!(
            session.render("Logo", &ExecContext::new(0.0, 30, 60)),
            Err(SessionError::NotMounted(_))
        );
    }

    #[tokio::test]
    async fn binding_names_are_session_scoped() {
        let store: Arc<MemoryArtifactStore> = Arc::new(MemoryArtifactStore::new());
        let a = InteractiveSession::new("alpha", store.clone());
        let b = InteractiveSession::new("beta", store);
        assert_eq!(a.binding_name("Logo"), "__scenesmith_preview_alpha_Logo");
        assert_ne!(a.binding_name("Logo"), b.binding_name("Logo"));
    }

    #[tokio::test]
    async fn missing_artifact_is_a_fetch_error() {
        let store: Arc<MemoryArtifactStore> = Arc::new(MemoryArtifactStore::new());
        let mut session = InteractiveSession::new("s1", store);
        assert_matches!(
            session.mount("Logo", "artifacts/p/missing.csc").await,
            Err(SessionError::Fetch(_))
        );
    }
}
