//! WASM entry points for the web worker.
//!
//! This module is only compiled for the `wasm32` target. The worker is
//! single-threaded, so the engine lives in a thread-local.

use std::cell::RefCell;

use gridbin_engine::PipelineConfig;
use gridbin_kernel::TruckKernel;
use wasm_bindgen::prelude::*;

use crate::dispatch;
use crate::engine_state::EngineState;

thread_local! {
    static ENGINE_STATE: RefCell<Option<EngineState<TruckKernel>>> = RefCell::new(None);
}

fn new_state(config: PipelineConfig) -> EngineState<TruckKernel> {
    EngineState::new(config, || Ok(TruckKernel::new()))
}

/// Set up the panic hook and the engine state with the default config.
/// The kernel itself is created by the first `Initialize` message.
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();

    ENGINE_STATE.with(|cell| {
        *cell.borrow_mut() = Some(new_state(PipelineConfig::default()));
    });
}

/// Like [`init`], with a JSON `PipelineConfig`.
#[wasm_bindgen]
pub fn init_with_config(config_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let config =
        PipelineConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    ENGINE_STATE.with(|cell| {
        *cell.borrow_mut() = Some(new_state(config));
    });
    Ok(())
}

/// Process a JSON message from the UI and return a JSON response.
///
/// This is the main entry point for the web worker's message handler.
#[wasm_bindgen]
pub fn process_message(json_input: &str) -> String {
    ENGINE_STATE.with(|cell| {
        let mut engine = cell.borrow_mut();
        let state = engine.get_or_insert_with(|| new_state(PipelineConfig::default()));
        dispatch::process_json(state, json_input)
    })
}

/// STEP bytes of the bin described by a JSON `BuildRequest`, without the
/// base64 round trip of [`process_message`].
#[wasm_bindgen]
pub fn export_step_bytes(request_json: &str) -> Result<js_sys::Uint8Array, JsValue> {
    let request: crate::messages::BuildRequest =
        serde_json::from_str(request_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    ENGINE_STATE.with(|cell| {
        let mut engine = cell.borrow_mut();
        let state = engine.get_or_insert_with(|| new_state(PipelineConfig::default()));
        let bytes = state
            .export_step(&request)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(js_sys::Uint8Array::from(bytes.as_slice()))
    })
}
