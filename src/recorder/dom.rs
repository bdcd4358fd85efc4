//! DOM-backed event source.
//!
//! Pointer moves and clicks are observed on the document. Field input is
//! observed on every `<input>` present when the subscription is made;
//! fields added to the page later are not picked up.

use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, EventTarget, HtmlInputElement, MouseEvent};

use super::{EventHandler, EventKind, EventSource, Observation, ObservedEvent, SubscriptionHandle};
use crate::error::{GateError, Result};

/// Event source over a page's document.
#[derive(Debug, Clone)]
pub struct DomEventSource {
    document: Document,
}

impl DomEventSource {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Source over the current window's document.
    pub fn from_window() -> Result<Self> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| GateError::Js("no document".into()))?;
        Ok(Self::new(document))
    }

    fn subscribe_pointer(&self, kind: EventKind, mut handler: EventHandler) -> Result<SubscriptionHandle> {
        let closure = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            handler(ObservedEvent::now(Observation::Pointer {
                x: event.client_x(),
                y: event.client_y(),
            }));
        });

        let target: EventTarget = self.document.clone().into();
        listen(vec![target], kind, closure)
    }

    fn subscribe_fields(&self, mut handler: EventHandler) -> Result<SubscriptionHandle> {
        let fields = self.document.query_selector_all("input")?;
        let targets: Vec<EventTarget> = (0..fields.length())
            .filter_map(|i| fields.item(i))
            .map(|node| node.unchecked_into::<EventTarget>())
            .collect();
        log::debug!("Observing input on {} fields", targets.len());

        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(field) = event
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            handler(ObservedEvent::now(Observation::Field {
                name: Some(field.name()),
                value: field.value(),
            }));
        });

        listen(targets, EventKind::Input, closure)
    }
}

impl EventSource for DomEventSource {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Result<SubscriptionHandle> {
        match kind {
            EventKind::PointerMove | EventKind::Click => self.subscribe_pointer(kind, handler),
            EventKind::Input => self.subscribe_fields(handler),
        }
    }
}

/// Attach one closure to every target; the handle removes it again.
///
/// If a registration fails, the listeners already added are removed before
/// the closure is released.
fn listen<T: WasmClosure + ?Sized + 'static>(
    targets: Vec<EventTarget>,
    kind: EventKind,
    closure: Closure<T>,
) -> Result<SubscriptionHandle> {
    let name = kind.dom_name();
    let mut registered = Vec::with_capacity(targets.len());
    let mut failure = None;
    for target in targets {
        match target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
            Ok(()) => registered.push(target),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let handle = SubscriptionHandle::new(kind, move || {
        for target in &registered {
            let _ = target
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
    });

    match failure {
        // Dropping the handle unregisters, then frees the closure.
        Some(e) => {
            drop(handle);
            Err(e.into())
        }
        None => Ok(handle),
    }
}
