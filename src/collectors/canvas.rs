//! Rendering signature (2D canvas)
//!
//! Draws a fixed scene on an 800x600 canvas and hashes its data URL. The
//! scene is identical everywhere; the pixels differ with the host's text
//! rendering and anti-aliasing stack, which is the entropy.

use std::f64::consts::TAU;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::CanvasRenderingContext2d;

use super::js_helpers;
use crate::error::{GateError, Result};
use crate::fingerprint::RawSignal;
use crate::hash::hash_str;

const CANVAS_WIDTH: u32 = 800;
const CANVAS_HEIGHT: u32 = 600;
const CANVAS_TEXT: &str = "Unique Canvas Fingerprint";

pub fn collect() -> RawSignal {
    match render_data_url() {
        Ok(data_url) => Some(hash_str(&data_url).to_string()),
        Err(e) => super::absent("Rendering", &e),
    }
}

fn render_data_url() -> Result<String> {
    let canvas = js_helpers::create_canvas(Some((CANVAS_WIDTH, CANVAS_HEIGHT)))?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| GateError::CollectorUnavailable("2d context".into()))?
        .dyn_into()
        .map_err(|_| GateError::CollectorUnavailable("2d context type".into()))?;

    draw_scene(&ctx)?;
    Ok(canvas.to_data_url()?)
}

fn draw_scene(ctx: &CanvasRenderingContext2d) -> std::result::Result<(), JsValue> {
    // Text
    ctx.set_text_baseline("alphabetic");
    ctx.set_font("italic 28px Verdana");
    ctx.set_fill_style_str("rgba(255, 0, 0, 0.8)");
    ctx.fill_text(CANVAS_TEXT, 20.0, 50.0)?;

    // Stroked horizontal line
    ctx.set_stroke_style_str("rgba(0, 255, 0, 0.6)");
    ctx.set_line_width(10.0);
    ctx.begin_path();
    ctx.move_to(50.0, 150.0);
    ctx.line_to(750.0, 150.0);
    ctx.stroke();

    // Filled circle
    ctx.set_fill_style_str("rgba(0, 0, 255, 0.5)");
    ctx.begin_path();
    ctx.arc(400.0, 300.0, 200.0, 0.0, TAU)?;
    ctx.fill();

    // Gradient band
    let gradient = ctx.create_linear_gradient(0.0, 0.0, 800.0, 600.0);
    gradient.add_color_stop(0.0, "yellow")?;
    gradient.add_color_stop(1.0, "purple")?;
    ctx.set_fill_style_canvas_gradient(&gradient);
    ctx.fill_rect(0.0, 500.0, 800.0, 100.0);

    Ok(())
}
