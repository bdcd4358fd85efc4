//! Reflect-based helpers for reading browser globals.
//!
//! Property reads go through `Reflect` so that a missing object or a
//! throwing getter reads as `undefined` instead of failing the collector.

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlCanvasElement};

use crate::error::{GateError, Result};
use crate::fingerprint::format_js_number;
use crate::profile::UNEXPOSED;

/// Get the current document.
pub fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| GateError::CollectorUnavailable("no document".into()))
}

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> JsValue {
    get_property(&js_sys::global(), prop)
}

/// Whether a global (usually a constructor) is defined.
pub fn has_global(prop: &str) -> bool {
    !get_global(prop).is_undefined()
}

/// `obj[prop]`, or `undefined` when it cannot be read.
pub fn get_property(obj: &JsValue, prop: &str) -> JsValue {
    if obj.is_undefined() || obj.is_null() {
        return JsValue::UNDEFINED;
    }
    Reflect::get(obj, &JsValue::from_str(prop)).unwrap_or(JsValue::UNDEFINED)
}

/// Text of a value as `String(value)` would produce it.
pub fn js_text(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if value.is_null() {
        return "null".into();
    }
    if value.is_undefined() {
        return UNEXPOSED.into();
    }
    if let Some(number) = value.as_f64() {
        return format_js_number(number);
    }
    if let Some(flag) = value.as_bool() {
        return flag.to_string();
    }
    value.unchecked_ref::<Object>().to_string().into()
}

/// Non-negative integral number, if the value is one.
pub fn js_u32(value: &JsValue) -> Option<u32> {
    value
        .as_f64()
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

/// Strings of an array-like value; empty when the value is not an array.
pub fn js_string_list(value: &JsValue) -> Vec<String> {
    if !Array::is_array(value) {
        return Vec::new();
    }
    value
        .unchecked_ref::<Array>()
        .iter()
        .map(|item| js_text(&item))
        .collect()
}

/// Create a detached canvas, optionally sized.
pub fn create_canvas(size: Option<(u32, u32)>) -> Result<HtmlCanvasElement> {
    let canvas: HtmlCanvasElement = document()?
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| GateError::CollectorUnavailable("canvas element".into()))?;
    if let Some((width, height)) = size {
        canvas.set_width(width);
        canvas.set_height(height);
    }
    Ok(canvas)
}
