//! Graphics adapter signature (WebGL)
//!
//! Reads the unmasked renderer and vendor strings through the
//! `WEBGL_debug_renderer_info` extension. Absent without WebGL or without
//! the extension.

use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlRenderingContext};

use super::js_helpers;
use crate::error::{GateError, Result};
use crate::fingerprint::RawSignal;

const DEBUG_RENDERER_INFO: &str = "WEBGL_debug_renderer_info";
// UNMASKED_VENDOR_WEBGL / UNMASKED_RENDERER_WEBGL
const UNMASKED_VENDOR: u32 = 0x9245;
const UNMASKED_RENDERER: u32 = 0x9246;

pub fn collect() -> RawSignal {
    match adapter_strings() {
        Ok(signature) => Some(signature),
        Err(e) => super::absent("Graphics adapter", &e),
    }
}

fn adapter_strings() -> Result<String> {
    let canvas = js_helpers::create_canvas(None)?;
    let gl = open_context(&canvas)?;

    if gl.get_extension(DEBUG_RENDERER_INFO)?.is_none() {
        return Err(GateError::CollectorUnavailable(DEBUG_RENDERER_INFO.into()));
    }

    let renderer = gl.get_parameter(UNMASKED_RENDERER)?;
    let vendor = gl.get_parameter(UNMASKED_VENDOR)?;
    Ok(format!(
        "{} | {}",
        js_helpers::js_text(&renderer),
        js_helpers::js_text(&vendor)
    ))
}

fn open_context(canvas: &HtmlCanvasElement) -> Result<WebGlRenderingContext> {
    for context_id in ["webgl", "experimental-webgl"] {
        if let Ok(Some(ctx)) = canvas.get_context(context_id) {
            if let Ok(gl) = ctx.dyn_into::<WebGlRenderingContext>() {
                return Ok(gl);
            }
        }
    }
    Err(GateError::CollectorUnavailable("webgl context".into()))
}
