//! Recorded interaction events.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Kind of DOM event the recorder listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    Click,
    Input,
}

impl EventKind {
    /// DOM event type name, also written as `eventType`.
    pub fn dom_name(self) -> &'static str {
        match self {
            EventKind::PointerMove => "mousemove",
            EventKind::Click => "click",
            EventKind::Input => "input",
        }
    }
}

/// Raw details an event source hands to the recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Client-area pointer coordinates.
    Pointer { x: i32, y: i32 },
    /// Name and current value of the field that fired `input`.
    Field { name: Option<String>, value: String },
}

/// One observed DOM event, stamped when it fired.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedEvent {
    pub at: DateTime<Utc>,
    pub detail: Observation,
}

impl ObservedEvent {
    pub fn now(detail: Observation) -> Self {
        Self { at: Utc::now(), detail }
    }
}

/// One recorded user action.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    PointerMove {
        timestamp: DateTime<Utc>,
        x: i32,
        y: i32,
    },
    PointerClick {
        timestamp: DateTime<Utc>,
        x: i32,
        y: i32,
    },
    FieldInput {
        timestamp: DateTime<Utc>,
        field_name: Option<String>,
        field_value: String,
    },
}

impl InteractionEvent {
    /// Build an event from what a source observed for `kind`.
    ///
    /// Returns `None` when the observation does not fit the kind.
    pub fn from_observation(kind: EventKind, observed: ObservedEvent) -> Option<Self> {
        let timestamp = observed.at;
        match (kind, observed.detail) {
            (EventKind::PointerMove, Observation::Pointer { x, y }) => {
                Some(Self::PointerMove { timestamp, x, y })
            }
            (EventKind::Click, Observation::Pointer { x, y }) => {
                Some(Self::PointerClick { timestamp, x, y })
            }
            (EventKind::Input, Observation::Field { name, value }) => Some(Self::FieldInput {
                timestamp,
                field_name: name,
                field_value: value,
            }),
            _ => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::PointerClick { .. } => EventKind::Click,
            Self::FieldInput { .. } => EventKind::Input,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PointerMove { timestamp, .. }
            | Self::PointerClick { timestamp, .. }
            | Self::FieldInput { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_pointer(&self) -> bool {
        !matches!(self, Self::FieldInput { .. })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointerRecord<'a> {
    event_type: &'static str,
    timestamp: &'a str,
    x: i32,
    y: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord<'a> {
    event_type: &'static str,
    timestamp: &'a str,
    field_name: Option<&'a str>,
    field_value: &'a str,
}

// Flat records, as the classifier reads them from CSV.
impl Serialize for InteractionEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let timestamp = self
            .timestamp()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let event_type = self.kind().dom_name();
        match self {
            Self::PointerMove { x, y, .. } | Self::PointerClick { x, y, .. } => PointerRecord {
                event_type,
                timestamp: &timestamp,
                x: *x,
                y: *y,
            }
            .serialize(serializer),
            Self::FieldInput {
                field_name,
                field_value,
                ..
            } => FieldRecord {
                event_type,
                timestamp: &timestamp,
                field_name: field_name.as_deref(),
                field_value,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_observation_conversion() {
        let pointer = ObservedEvent { at: at(), detail: Observation::Pointer { x: 10, y: 20 } };

        let moved = InteractionEvent::from_observation(EventKind::PointerMove, pointer.clone());
        assert_eq!(moved, Some(InteractionEvent::PointerMove { timestamp: at(), x: 10, y: 20 }));

        let clicked = InteractionEvent::from_observation(EventKind::Click, pointer.clone());
        assert_eq!(clicked.map(|e| e.kind()), Some(EventKind::Click));

        assert_eq!(InteractionEvent::from_observation(EventKind::Input, pointer), None);
    }

    #[test]
    fn test_pointer_record_json() {
        let event = InteractionEvent::PointerClick { timestamp: at(), x: 10, y: 20 };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"eventType":"click","timestamp":"2024-09-01T12:30:05.000Z","x":10,"y":20}"#
        );
    }

    #[test]
    fn test_field_record_json() {
        let event = InteractionEvent::FieldInput {
            timestamp: at(),
            field_name: Some("otp".into()),
            field_value: "123".into(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"eventType":"input","timestamp":"2024-09-01T12:30:05.000Z","fieldName":"otp","fieldValue":"123"}"#
        );
        assert!(!event.is_pointer());
    }
}
