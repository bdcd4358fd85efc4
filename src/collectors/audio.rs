//! Audio signature (offline audio render)
//!
//! Renders one second of a 1 kHz sine through a gain stage and a low-pass
//! filter into an offline context, then sums the magnitudes of the first
//! 500 samples. Floating-point differences in the host's audio stack show
//! up in the low digits of the sum.

use futures::future::{select, Either};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioScheduledSourceNode, BiquadFilterType, OfflineAudioContext, OscillatorType};

use super::js_helpers;
use crate::error::{GateError, Result};
use crate::fingerprint::{format_js_number, RawSignal};

const CHANNELS: u32 = 1;
const SAMPLE_RATE: f32 = 44_100.0;
const RENDER_FRAMES: u32 = 44_100;
const TONE_HZ: f32 = 1_000.0;
const GAIN: f32 = 0.5;
const CUTOFF_HZ: f32 = 1_000.0;

/// Number of leading samples folded into the signature.
pub const SAMPLE_WINDOW: usize = 500;

/// Render and sum, bounded by `timeout_ms` when given.
pub async fn collect(timeout_ms: Option<u32>) -> RawSignal {
    let result = match timeout_ms {
        Some(ms) => render_with_timeout(ms).await,
        None => render_sum().await,
    };

    match result {
        Ok(sum) => Some(format_js_number(sum)),
        Err(e) => super::absent("Audio", &e),
    }
}

/// Sum of absolute values over the first [`SAMPLE_WINDOW`] samples.
pub fn sum_magnitudes(samples: &[f32]) -> f64 {
    samples
        .iter()
        .take(SAMPLE_WINDOW)
        .map(|sample| f64::from(sample.abs()))
        .sum()
}

async fn render_with_timeout(timeout_ms: u32) -> Result<f64> {
    let render = Box::pin(render_sum());
    let timer = Box::pin(TimeoutFuture::new(timeout_ms));
    match select(render, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(_) => Err(GateError::AudioTimeout(timeout_ms)),
    }
}

async fn render_sum() -> Result<f64> {
    let ctx = offline_context()?;

    let oscillator = ctx.create_oscillator()?;
    oscillator.set_type(OscillatorType::Sine);
    oscillator
        .frequency()
        .set_value_at_time(TONE_HZ, ctx.current_time())?;

    let gain = ctx.create_gain()?;
    gain.gain().set_value(GAIN);

    let filter = ctx.create_biquad_filter()?;
    filter.set_type(BiquadFilterType::Lowpass);
    filter.frequency().set_value(CUTOFF_HZ);

    oscillator.connect_with_audio_node(&gain)?;
    gain.connect_with_audio_node(&filter)?;
    filter.connect_with_audio_node(&ctx.destination())?;
    AudioScheduledSourceNode::start(&oscillator)?;

    let rendered = JsFuture::from(ctx.start_rendering()?).await?;
    let buffer: AudioBuffer = rendered
        .dyn_into()
        .map_err(|_| GateError::CollectorUnavailable("rendered audio buffer".into()))?;
    let samples = buffer.get_channel_data(0)?;

    Ok(sum_magnitudes(&samples))
}

fn offline_context() -> Result<OfflineAudioContext> {
    if js_helpers::has_global("OfflineAudioContext") {
        return Ok(
            OfflineAudioContext::new_with_number_of_channels_and_length_and_sample_rate(
                CHANNELS,
                RENDER_FRAMES,
                SAMPLE_RATE,
            )?,
        );
    }

    // Older WebKit only ships the prefixed constructor.
    let prefixed = js_helpers::get_global("webkitOfflineAudioContext");
    let ctor = prefixed
        .dyn_into::<Function>()
        .map_err(|_| GateError::CollectorUnavailable("OfflineAudioContext".into()))?;
    let args = Array::of3(
        &JsValue::from(CHANNELS),
        &JsValue::from(RENDER_FRAMES),
        &JsValue::from(SAMPLE_RATE),
    );
    Ok(Reflect::construct(&ctor, &args)?.unchecked_into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_uses_first_window_only() {
        let mut samples = vec![0.5f32; SAMPLE_WINDOW];
        samples.extend(vec![100.0f32; 10]);
        assert_eq!(sum_magnitudes(&samples), 250.0);
    }

    #[test]
    fn test_sum_takes_magnitudes() {
        assert_eq!(sum_magnitudes(&[-0.25, 0.25, -0.5]), 1.0);
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(sum_magnitudes(&[]), 0.0);
        assert_eq!(sum_magnitudes(&[0.125]), 0.125);
    }

    #[test]
    fn test_sum_accumulates_in_double_precision() {
        let samples = [0.1f32; 3];
        let expected = f64::from(0.1f32) * 3.0;
        assert!((sum_magnitudes(&samples) - expected).abs() < 1e-15);
    }
}
