//! Scene registry: the per-project timeline of executed scenes.
//!
//! Each slot tracks the scene's planned duration, the measured duration
//! once a render reports one, and the artifact it points at. Assembly
//! lays the slots out with cumulative start offsets: an overrun in one
//! scene shifts every later scene by exactly the overrun delta.
//!
//! Each slot has its own async lock, so concurrent duration reports for
//! different scenes never contend and reports for the same scene are
//! serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use scenesmith_core::error::CoreError;
use scenesmith_core::timeline::{schedule, total_duration, ScheduledSlot, TimelineSlot};

/// One slot in the project timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSlot {
    pub id: Uuid,
    /// Zero-based timeline position.
    pub ordinal: u32,
    pub description: String,
    pub revision: i32,
    pub component_name: Option<String>,
    pub artifact_url: Option<String>,
    pub planned_secs: f64,
    pub realized_secs: Option<f64>,
    /// Free-form transition settings into the next scene.
    pub transition: Option<serde_json::Value>,
    /// A failed slot renders the placeholder but keeps its planned
    /// duration on the timeline.
    pub failed: bool,
}

impl SceneSlot {
    pub fn new(ordinal: u32, description: impl Into<String>, planned_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ordinal,
            description: description.into(),
            revision: 1,
            component_name: None,
            artifact_url: None,
            planned_secs,
            realized_secs: None,
            transition: None,
            failed: false,
        }
    }
}

/// The assembled view of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSlot {
    pub scene: SceneSlot,
    pub start_secs: f64,
    pub duration_secs: f64,
}

struct Entry {
    slot: Mutex<SceneSlot>,
}

/// Registry of scenes for one project.
#[derive(Default)]
pub struct SceneRegistry {
    entries: RwLock<BTreeMap<u32, Arc<Entry>>>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot at its ordinal. Rejects duplicate ordinals.
    pub async fn register(&self, slot: SceneSlot) -> Result<(), CoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&slot.ordinal) {
            return Err(CoreError::Conflict(format!(
                "Ordinal {} is already registered",
                slot.ordinal
            )));
        }
        entries.insert(
            slot.ordinal,
            Arc::new(Entry {
                slot: Mutex::new(slot),
            }),
        );
        Ok(())
    }

    async fn entry(&self, ordinal: u32) -> Result<Arc<Entry>, CoreError> {
        self.entries
            .read()
            .await
            .get(&ordinal)
            .cloned()
            .ok_or_else(|| CoreError::Validation(format!("No scene at ordinal {ordinal}")))
    }

    /// Point a slot at its compiled artifact.
    pub async fn attach_artifact(
        &self,
        ordinal: u32,
        component_name: impl Into<String>,
        artifact_url: impl Into<String>,
    ) -> Result<(), CoreError> {
        let entry = self.entry(ordinal).await?;
        let mut slot = entry.slot.lock().await;
        slot.component_name = Some(component_name.into());
        slot.artifact_url = Some(artifact_url.into());
        slot.failed = false;
        Ok(())
    }

    /// Mark a slot's build as permanently failed. The slot stays on the
    /// timeline with its planned duration.
    pub async fn mark_failed(&self, ordinal: u32) -> Result<(), CoreError> {
        let entry = self.entry(ordinal).await?;
        entry.slot.lock().await.failed = true;
        Ok(())
    }

    /// Record the measured duration reported after a render.
    pub async fn set_realized_duration(
        &self,
        ordinal: u32,
        realized_secs: f64,
    ) -> Result<(), CoreError> {
        if !realized_secs.is_finite() || realized_secs <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Realized duration must be positive, got {realized_secs}"
            )));
        }
        let entry = self.entry(ordinal).await?;
        let mut slot = entry.slot.lock().await;
        slot.realized_secs = Some(realized_secs);
        tracing::debug!(
            ordinal,
            realized_secs,
            planned_secs = slot.planned_secs,
            "Recorded realized duration"
        );
        Ok(())
    }

    /// Bump a slot's revision after a re-description. Clears the stale
    /// artifact pointer and realized duration.
    pub async fn revise(&self, ordinal: u32, description: impl Into<String>) -> Result<i32, CoreError> {
        let entry = self.entry(ordinal).await?;
        let mut slot = entry.slot.lock().await;
        slot.description = description.into();
        slot.revision += 1;
        slot.component_name = None;
        slot.artifact_url = None;
        slot.realized_secs = None;
        slot.failed = false;
        Ok(slot.revision)
    }

    /// Lay the timeline out in ordinal order with cumulative offsets.
    pub async fn assemble(&self) -> Vec<AssembledSlot> {
        let snapshot = self.snapshot().await;
        let timeline: Vec<TimelineSlot> = snapshot
            .iter()
            .map(|slot| TimelineSlot {
                order: slot.ordinal,
                planned_secs: slot.planned_secs,
                realized_secs: slot.realized_secs,
            })
            .collect();
        let scheduled: Vec<ScheduledSlot> = schedule(&timeline);

        snapshot
            .into_iter()
            .zip(scheduled)
            .map(|(scene, placed)| AssembledSlot {
                scene,
                start_secs: placed.start_secs,
                duration_secs: placed.duration_secs,
            })
            .collect()
    }

    /// Total duration of the assembled timeline.
    pub async fn total_secs(&self) -> f64 {
        let snapshot = self.snapshot().await;
        let timeline: Vec<TimelineSlot> = snapshot
            .iter()
            .map(|slot| TimelineSlot {
                order: slot.ordinal,
                planned_secs: slot.planned_secs,
                realized_secs: slot.realized_secs,
            })
            .collect();
        total_duration(&timeline)
    }

    async fn snapshot(&self) -> Vec<SceneSlot> {
        let entries = self.entries.read().await;
        let mut slots = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            slots.push(entry.slot.lock().await.clone());
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn registry_with(durations: &[f64]) -> SceneRegistry {
        let registry = SceneRegistry::new();
        for (i, secs) in durations.iter().enumerate() {
            registry
                .register(SceneSlot::new(i as u32, format!("scene {i}"), *secs))
                .await
                .unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn assemble_accumulates_offsets_in_ordinal_order() {
        let registry = registry_with(&[2.0, 3.0, 1.5]).await;
        let assembled = registry.assemble().await;

        assert_eq!(assembled[0].start_secs, 0.0);
        assert_eq!(assembled[1].start_secs, 2.0);
        assert_eq!(assembled[2].start_secs, 5.0);
        assert_eq!(registry.total_secs().await, 6.5);
    }

    #[tokio::test]
    async fn overrun_shifts_later_scenes_by_exactly_delta() {
        let registry = registry_with(&[2.0, 3.0, 1.0]).await;
        let before = registry.assemble().await;

        registry.set_realized_duration(0, 2.75).await.unwrap();
        let after = registry.assemble().await;

        for i in 1..3 {
            assert!((after[i].start_secs - before[i].start_secs - 0.75).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn failed_scene_keeps_planned_duration() {
        let registry = registry_with(&[2.0, 3.0]).await;
        registry.mark_failed(0).await.unwrap();

        let assembled = registry.assemble().await;
        assert!(assembled[0].scene.failed);
        assert_eq!(assembled[0].duration_secs, 2.0);
        assert_eq!(assembled[1].start_secs, 2.0);
    }

    #[tokio::test]
    async fn duplicate_ordinal_is_rejected() {
        let registry = registry_with(&[2.0]).await;
        let err = registry
            .register(SceneSlot::new(0, "again", 1.0))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Conflict(_));
    }

    #[tokio::test]
    async fn invalid_realized_duration_is_rejected() {
        let registry = registry_with(&[2.0]).await;
        assert!(registry.set_realized_duration(0, 0.0).await.is_err());
        assert!(registry.set_realized_duration(0, -1.0).await.is_err());
        assert!(registry.set_realized_duration(0, f64::NAN).await.is_err());
    }

    #[tokio::test]
    async fn revise_bumps_revision_and_clears_artifact() {
        let registry = registry_with(&[2.0]).await;
        registry
            .attach_artifact(0, "Logo", "artifacts/p/abc.csc")
            .await
            .unwrap();
        registry.set_realized_duration(0, 2.5).await.unwrap();

        let revision = registry.revise(0, "a different logo").await.unwrap();
        assert_eq!(revision, 2);

        let assembled = registry.assemble().await;
        assert_eq!(assembled[0].scene.artifact_url, None);
        assert_eq!(assembled[0].scene.realized_secs, None);
        assert_eq!(assembled[0].duration_secs, 2.0);
    }

    #[tokio::test]
    async fn concurrent_duration_reports_for_different_scenes() {
        let registry = Arc::new(registry_with(&[1.0, 1.0, 1.0, 1.0]).await);
        let mut handles = Vec::new();
        for i in 0..4u32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.set_realized_duration(i, 2.0).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(registry.total_secs().await, 8.0);
    }
}
