//! Request/response boundary between the UI and the bin pipeline.
//!
//! The UI talks to the engine with JSON messages ([`messages`]). On wasm32
//! they arrive through [`wasm_api::process_message`] in a web worker; natively
//! [`service::BinService`] runs the pipeline on a dedicated worker thread and
//! exposes it as async calls.

pub mod dispatch;
pub mod engine_state;
pub mod logging;
pub mod messages;

#[cfg(not(target_arch = "wasm32"))]
pub mod service;

#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

pub use dispatch::{dispatch, process_json};
pub use engine_state::{BridgeError, EngineState};
pub use messages::{BuildRequest, EngineToUi, UiToEngine};

#[cfg(not(target_arch = "wasm32"))]
pub use service::{BinService, ServiceError};
