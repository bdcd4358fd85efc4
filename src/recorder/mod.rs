//! Behavioral event capture.
//!
//! A [`BehaviorRecorder`] owns an append-only [`EventLog`] with separate
//! pointer and field buffers. It subscribes once to an [`EventSource`]
//! (the DOM in a browser, a hand-driven source in tests) and appends every
//! observed event in arrival order. Reading a snapshot never clears the
//! log; repeated submissions are cumulative unless the caller releases
//! what it already sent.

pub mod dom;
pub mod events;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;

pub use dom::DomEventSource;
pub use events::{EventKind, InteractionEvent, Observation, ObservedEvent};

/// Callback a source invokes for each observed event.
pub type EventHandler = Box<dyn FnMut(ObservedEvent)>;

/// Something that can deliver DOM-like events to a handler.
pub trait EventSource {
    /// Register `handler` for `kind`. The subscription lasts until the
    /// returned handle is dropped.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Result<SubscriptionHandle>;
}

/// Keeps a subscription alive; dropping it unsubscribes.
pub struct SubscriptionHandle {
    kind: EventKind,
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl SubscriptionHandle {
    pub fn new(kind: EventKind, unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            kind,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Append-only pointer and field buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    pointer_events: Vec<InteractionEvent>,
    field_events: Vec<InteractionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: InteractionEvent) {
        if event.is_pointer() {
            self.pointer_events.push(event);
        } else {
            self.field_events.push(event);
        }
    }

    pub fn pointer_events(&self) -> &[InteractionEvent] {
        &self.pointer_events
    }

    pub fn field_events(&self) -> &[InteractionEvent] {
        &self.field_events
    }

    pub fn len(&self) -> usize {
        self.pointer_events.len() + self.field_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.pointer_events.clear();
        self.field_events.clear();
    }

    /// Drop the oldest events that `sent` already covered, keeping any
    /// appended after it was taken.
    fn release(&mut self, sent: &EventLog) {
        let pointer = sent.pointer_events.len().min(self.pointer_events.len());
        let field = sent.field_events.len().min(self.field_events.len());
        self.pointer_events.drain(..pointer);
        self.field_events.drain(..field);
    }
}

/// Records interaction events for the lifetime of a page.
#[derive(Debug, Default)]
pub struct BehaviorRecorder {
    log: Rc<RefCell<EventLog>>,
    subscriptions: RefCell<Vec<SubscriptionHandle>>,
}

impl BehaviorRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to pointer moves, clicks and field input on `source`.
    ///
    /// Subscriptions happen once; attaching an already attached recorder
    /// is a no-op.
    pub fn attach<S: EventSource + ?Sized>(&self, source: &S) -> Result<()> {
        if !self.subscriptions.borrow().is_empty() {
            log::debug!("Behavior recorder already attached");
            return Ok(());
        }

        let mut handles = Vec::with_capacity(3);
        for kind in [EventKind::PointerMove, EventKind::Click, EventKind::Input] {
            let buffer = Rc::clone(&self.log);
            let handler: EventHandler = Box::new(move |observed| {
                match InteractionEvent::from_observation(kind, observed) {
                    Some(event) => buffer.borrow_mut().append(event),
                    None => log::debug!("Ignoring mismatched {} observation", kind.dom_name()),
                }
            });
            handles.push(source.subscribe(kind, handler)?);
        }

        log::debug!("Behavior recorder attached ({} subscriptions)", handles.len());
        *self.subscriptions.borrow_mut() = handles;
        Ok(())
    }

    /// Remove all subscriptions. Recorded events are kept.
    pub fn detach(&self) {
        self.subscriptions.borrow_mut().clear();
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.borrow().is_empty()
    }

    /// Append an event directly, bypassing any source.
    pub fn record(&self, event: InteractionEvent) {
        self.log.borrow_mut().append(event);
    }

    /// Copy of the buffers as they are now. Does not clear them.
    pub fn snapshot(&self) -> EventLog {
        self.log.borrow().clone()
    }

    /// Forget the events a submitted snapshot contained.
    pub fn release(&self, sent: &EventLog) {
        self.log.borrow_mut().release(sent);
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// `(pointer, field)` buffer lengths.
    pub fn counts(&self) -> (usize, usize) {
        let log = self.log.borrow();
        (log.pointer_events.len(), log.field_events.len())
    }
}
