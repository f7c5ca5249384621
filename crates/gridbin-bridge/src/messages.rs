use gridbin_engine::{CacheStats, ModelMesh};
use gridbin_types::Outline;
use serde::{Deserialize, Serialize};

/// Outlines plus the bin heights of one build. Missing heights fall back to
/// the pipeline defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub outlines: Vec<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_height: Option<f64>,
}

impl BuildRequest {
    pub fn new(outlines: Vec<Outline>) -> Self {
        Self {
            outlines,
            total_height: None,
            base_height: None,
        }
    }

    pub fn with_heights(mut self, total_height: f64, base_height: f64) -> Self {
        self.total_height = Some(total_height);
        self.base_height = Some(base_height);
        self
    }
}

/// Messages from the UI (JavaScript main thread) to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiToEngine {
    /// Bootstrap the geometry kernel. Repeating it is a no-op.
    Initialize,
    IsReady,
    GenerateModel(BuildRequest),
    ExportStep(BuildRequest),
    ClearCache,
    CacheStats,
}

/// Messages from the engine to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineToUi {
    Initialized,

    ReadyState { ready: bool },

    /// Preview buffers of the rebuilt bin, `null` when there are no outlines.
    ModelGenerated { model: Option<ModelMesh> },

    /// STEP export is ready.
    ExportReady {
        #[serde(rename = "stepBase64")]
        step_base64: String,
    },

    CacheStats { stats: CacheStats, entries: usize },

    CacheCleared,

    /// An error occurred in the engine.
    Error { message: String },
}
