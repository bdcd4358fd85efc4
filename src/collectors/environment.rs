//! Navigator and screen readout.

use wasm_bindgen::JsValue;

use super::js_helpers::{get_global, get_property, js_string_list, js_text, js_u32};
use crate::error::{GateError, Result};
use crate::profile::DeclaredEnvironment;

/// Read the declared environment from `navigator` and `screen`.
pub fn read_declared_environment() -> Result<DeclaredEnvironment> {
    let navigator = get_global("navigator");
    if navigator.is_undefined() {
        return Err(GateError::CollectorUnavailable("navigator".into()));
    }
    let screen = get_global("screen");
    let nav = |prop: &str| get_property(&navigator, prop);
    let scr = |prop: &str| js_u32(&get_property(&screen, prop)).unwrap_or(0);

    Ok(DeclaredEnvironment {
        user_agent: js_text(&nav("userAgent")),
        platform: js_text(&nav("platform")),
        vendor: js_text(&nav("vendor")),
        hardware_concurrency: js_u32(&nav("hardwareConcurrency")).filter(|n| *n > 0),
        language: js_text(&nav("language")),
        languages: js_string_list(&nav("languages")),
        webdriver: nav("webdriver").as_bool(),
        plugins_count: plugins_count(&nav("plugins")),
        max_touch_points: js_u32(&nav("maxTouchPoints")).unwrap_or(0),
        color_depth: scr("colorDepth"),
        screen_width: scr("width"),
        screen_height: scr("height"),
    })
}

/// Environment signature for the fingerprint.
pub fn collect() -> String {
    match read_declared_environment() {
        Ok(env) => env.signature(),
        Err(e) => {
            log::warn!("⚠️ Environment readout failed, using unexposed environment: {}", e);
            DeclaredEnvironment::unexposed().signature()
        }
    }
}

fn plugins_count(plugins: &JsValue) -> u32 {
    js_u32(&get_property(plugins, "length")).unwrap_or(0)
}
