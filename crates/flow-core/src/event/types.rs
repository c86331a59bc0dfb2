//! Tipos de evento y estructura `Event`.
//!
//! Rol en el pipeline:
//! - El motor de flujos produce `Event`s por sesión, en orden de emisión.
//! - `EventKind` es la unión cerrada de todo lo que el motor puede emitir; los
//!   handlers hacen `match` exhaustivo sobre ella en lugar de casts en runtime.
//! - `EventType` es el discriminante estable (snake_case) usado como clave en
//!   el `HandlerRegistry` y en los logs.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminante estable de `EventKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ContactNameChanged,
    ContactLanguageChanged,
    ContactFieldChanged,
    ContactGroupsChanged,
    MsgCreated,
    InputLabelsAdded,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 7] = [EventType::ContactNameChanged,
                                     EventType::ContactLanguageChanged,
                                     EventType::ContactFieldChanged,
                                     EventType::ContactGroupsChanged,
                                     EventType::MsgCreated,
                                     EventType::InputLabelsAdded,
                                     EventType::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ContactNameChanged => "contact_name_changed",
            EventType::ContactLanguageChanged => "contact_language_changed",
            EventType::ContactFieldChanged => "contact_field_changed",
            EventType::ContactGroupsChanged => "contact_groups_changed",
            EventType::MsgCreated => "msg_created",
            EventType::InputLabelsAdded => "input_labels_added",
            EventType::Error => "error",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referencia a un grupo de contactos (resuelta contra `OrgAssets`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub uuid: Uuid,
    pub name: String,
}

/// Referencia a una etiqueta de mensajes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRef {
    pub uuid: Uuid,
    pub name: String,
}

/// Referencia a un campo de contacto por su key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub key: String,
    pub name: String,
}

/// Mensaje saliente creado por el flujo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOut {
    pub uuid: Uuid,
    #[serde(default)]
    pub urn: Option<String>,
    pub text: String,
}

/// Payload tipado de cada evento soportado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// El nombre del contacto cambió.
    ContactNameChanged { name: String },
    /// El idioma del contacto cambió (cadena vacía = sin idioma).
    ContactLanguageChanged { language: String },
    /// Un campo del contacto cambió; `None` lo limpia.
    ContactFieldChanged {
        field: FieldRef,
        #[serde(default)]
        value: Option<String>,
    },
    /// El contacto entró y/o salió de grupos.
    ContactGroupsChanged {
        #[serde(default)]
        groups_added: Vec<GroupRef>,
        #[serde(default)]
        groups_removed: Vec<GroupRef>,
    },
    /// El flujo creó un mensaje saliente.
    MsgCreated { msg: MsgOut },
    /// Se etiquetó el mensaje de entrada que reanudó la sesión.
    InputLabelsAdded { input_uuid: Uuid, labels: Vec<LabelRef> },
    /// Error no fatal reportado por el motor.
    Error { text: String },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::ContactNameChanged { .. } => EventType::ContactNameChanged,
            EventKind::ContactLanguageChanged { .. } => EventType::ContactLanguageChanged,
            EventKind::ContactFieldChanged { .. } => EventType::ContactFieldChanged,
            EventKind::ContactGroupsChanged { .. } => EventType::ContactGroupsChanged,
            EventKind::MsgCreated { .. } => EventType::MsgCreated,
            EventKind::InputLabelsAdded { .. } => EventType::InputLabelsAdded,
            EventKind::Error { .. } => EventType::Error,
        }
    }
}

/// Evento inmutable emitido por una sesión.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub uuid: Uuid,
    pub created_on: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self { uuid: Uuid::new_v4(),
               created_on: Utc::now(),
               kind }
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_matches_serde_tag() {
        let ev = Event::new(EventKind::ContactNameChanged { name: "Ann".into() });
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], json!(ev.event_type().as_str()));
        assert_eq!(v["name"], json!("Ann"));
    }

    #[test]
    fn event_reads_engine_json() {
        let raw = json!({
            "uuid": "0b7a3c4e-4f67-4b8f-9c7b-3f0f1a6a0001",
            "created_on": "2024-05-02T10:00:00Z",
            "type": "contact_groups_changed",
            "groups_added": [{"uuid": "0b7a3c4e-4f67-4b8f-9c7b-3f0f1a6a0002", "name": "Testers"}]
        });
        let ev: Event = serde_json::from_value(raw).unwrap();
        assert_eq!(ev.event_type(), EventType::ContactGroupsChanged);
        match ev.kind {
            EventKind::ContactGroupsChanged { groups_added, groups_removed } => {
                assert_eq!(groups_added.len(), 1);
                assert!(groups_removed.is_empty());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn all_types_have_distinct_names() {
        let mut names: Vec<&str> = EventType::ALL.iter().map(|t| t.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EventType::ALL.len());
    }
}
