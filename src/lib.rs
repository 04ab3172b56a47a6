//! Browser client for a multiplayer tower-defense server.
//!
//! The server is authoritative: this crate keeps the WebSocket open, turns
//! clicks and hotkeys into requests, stores whatever state the server
//! pushes, and redraws it on a fixed interval.

pub mod config;
pub mod error;
pub mod grid;
pub mod input;
pub mod protocol;
pub mod render;
pub mod scheduler;
pub mod selection;
pub mod state;
pub mod transport;
pub mod web;

use wasm_bindgen::prelude::*;

use crate::config::ClientConfig;
use crate::web::ClientHandle;

/// Page entry point. `config_json` may be omitted for the defaults.
#[wasm_bindgen]
pub fn run_client(config_json: Option<String>) -> Result<ClientHandle, JsValue> {
    console_error_panic_hook::set_once();

    let config = match config_json {
        Some(raw) => ClientConfig::from_json(&raw)?,
        None => ClientConfig::default(),
    };

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(config.max_log_level())
            .build(),
    );

    Ok(web::start(config)?)
}
