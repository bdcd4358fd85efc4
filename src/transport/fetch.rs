//! Fetch-backed transport.

use async_trait::async_trait;
use js_sys::Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Request, RequestInit, RequestMode, Response, UrlSearchParams};

use crate::error::{GateError, Result};
use crate::submission::{FormPart, FormValue, Transport};

/// Transport over `window.fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl FetchTransport {
    pub fn new() -> Self {
        Self
    }

    /// Perform a single POST and return the body of a 2xx response.
    async fn send(&self, url: &str, body: &JsValue) -> Result<String> {
        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(body);

        let request = Request::new_with_str_and_init(url, &opts)
            .map_err(|e| transport_error("Request::new failed", &e))?;

        let window = web_sys::window()
            .ok_or_else(|| GateError::Transport("no window object".into()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| transport_error("fetch failed", &e))?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| GateError::Transport("response is not a Response".into()))?;

        if !resp.ok() {
            return Err(GateError::HttpStatus(resp.status()));
        }

        let text = JsFuture::from(
            resp.text()
                .map_err(|e| transport_error("text failed", &e))?,
        )
        .await
        .map_err(|e| transport_error("await text failed", &e))?;

        text.as_string()
            .ok_or_else(|| GateError::InvalidResponse("response body is not text".into()))
    }
}

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn post_urlencoded(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
        let params = UrlSearchParams::new()?;
        for (name, value) in fields {
            params.append(name, value);
        }
        self.send(url, &params.into()).await
    }

    async fn post_multipart(&self, url: &str, parts: &[FormPart]) -> Result<String> {
        let form = FormData::new()?;
        for part in parts {
            match &part.value {
                FormValue::Text(text) => form.append_with_str(&part.name, text)?,
                FormValue::File {
                    file_name,
                    content_type,
                    contents,
                } => {
                    let blob = text_blob(contents, content_type)?;
                    form.append_with_blob_and_filename(&part.name, &blob, file_name)?;
                }
            }
        }
        self.send(url, &form.into()).await
    }
}

fn text_blob(contents: &str, content_type: &str) -> Result<Blob> {
    let options = BlobPropertyBag::new();
    options.set_type(content_type);
    let chunks = Array::of1(&JsValue::from_str(contents));
    Ok(Blob::new_with_str_sequence_and_options(&chunks, &options)?)
}

fn transport_error(context: &str, value: &JsValue) -> GateError {
    GateError::Transport(format!("{}: {:?}", context, value))
}
