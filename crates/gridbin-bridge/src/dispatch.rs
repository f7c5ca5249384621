use base64::Engine as _;
use gridbin_kernel::Kernel;
use tracing::warn;

use crate::engine_state::{BridgeError, EngineState};
use crate::messages::{EngineToUi, UiToEngine};

/// Dispatch a UI message to the engine and return a response.
///
/// Failures are turned into [`EngineToUi::Error`]; the engine stays usable.
pub fn dispatch<K: Kernel + 'static>(state: &mut EngineState<K>, msg: UiToEngine) -> EngineToUi {
    match handle_message(state, msg) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "request failed");
            EngineToUi::Error {
                message: e.to_string(),
            }
        }
    }
}

fn handle_message<K: Kernel + 'static>(
    state: &mut EngineState<K>,
    msg: UiToEngine,
) -> Result<EngineToUi, BridgeError> {
    match msg {
        UiToEngine::Initialize => {
            state.initialize()?;
            Ok(EngineToUi::Initialized)
        }

        UiToEngine::IsReady => Ok(EngineToUi::ReadyState {
            ready: state.is_ready(),
        }),

        UiToEngine::GenerateModel(request) => {
            let model = state.generate_model(&request)?;
            Ok(EngineToUi::ModelGenerated { model })
        }

        UiToEngine::ExportStep(request) => {
            let bytes = state.export_step(&request)?;
            Ok(EngineToUi::ExportReady {
                step_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            })
        }

        UiToEngine::ClearCache => {
            state.clear_cache();
            Ok(EngineToUi::CacheCleared)
        }

        UiToEngine::CacheStats => Ok(EngineToUi::CacheStats {
            stats: state.cache_stats(),
            entries: state.cache_entries(),
        }),
    }
}

/// Process a JSON-serialized [`UiToEngine`] message and return a
/// JSON-serialized [`EngineToUi`] response.
pub fn process_json<K: Kernel + 'static>(state: &mut EngineState<K>, json_input: &str) -> String {
    let response = match serde_json::from_str::<UiToEngine>(json_input) {
        Ok(msg) => dispatch(state, msg),
        Err(e) => EngineToUi::Error {
            message: format!("Failed to parse message: {}", e),
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"type":"Error","message":"Serialization failed: {}"}}"#,
            e
        )
    })
}
