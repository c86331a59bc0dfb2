//! Sesión en curso y sus colas de eventos diferidos.
//!
//! Una `Session` vive sólo durante un batch: trae los eventos nuevos del turno
//! y acumula, por hook, los eventos que los handlers difieren. Las colas se
//! consumen una única vez en el commit (`take_pre_commit_events`).
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Event, EventKind};
use crate::hook::HookId;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(SessionId);
id_type!(ContactId);
id_type!(OrgId);

/// Eventos diferidos de una sesión, agrupados por hook en orden de emisión.
pub type HookQueue = BTreeMap<HookId, Vec<Event>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub org_id: OrgId,
    pub contact_id: ContactId,
    pub contact_uuid: Uuid,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(skip)]
    pre_commit: HookQueue,
    #[serde(skip)]
    post_commit: HookQueue,
}

impl Session {
    pub fn new(id: SessionId, org_id: OrgId, contact_id: ContactId, contact_uuid: Uuid) -> Self {
        Self { id,
               org_id,
               contact_id,
               contact_uuid,
               events: Vec::new(),
               pre_commit: BTreeMap::new(),
               post_commit: BTreeMap::new() }
    }

    /// Agrega un evento del turno actual (orden = orden de emisión).
    pub fn push_event(&mut self, kind: EventKind) -> &Event {
        self.events.push(Event::new(kind));
        &self.events[self.events.len() - 1]
    }

    pub fn with_events(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        for k in kinds {
            self.push_event(k);
        }
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Difiere `event` hasta el commit del batch, bajo `hook`.
    pub fn add_pre_commit_event(&mut self, hook: HookId, event: Event) {
        self.pre_commit.entry(hook).or_default().push(event);
    }

    /// Difiere `event` hasta después del commit (efectos no transaccionales).
    pub fn add_post_commit_event(&mut self, hook: HookId, event: Event) {
        self.post_commit.entry(hook).or_default().push(event);
    }

    pub fn pre_commit_events(&self) -> &HookQueue {
        &self.pre_commit
    }

    pub fn post_commit_events(&self) -> &HookQueue {
        &self.post_commit
    }

    pub fn take_pre_commit_events(&mut self) -> HookQueue {
        std::mem::take(&mut self.pre_commit)
    }

    pub fn take_post_commit_events(&mut self) -> HookQueue {
        std::mem::take(&mut self.post_commit)
    }

    /// Descarta colas de un intento previo fallido.
    pub(crate) fn clear_queues(&mut self) {
        self.pre_commit.clear();
        self.post_commit.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionId(1), OrgId(1), ContactId(10), Uuid::new_v4())
    }

    #[test]
    fn pre_commit_preserves_submission_order_per_hook() {
        let mut s = session();
        let a = Event::new(EventKind::ContactNameChanged { name: "A".into() });
        let lang = Event::new(EventKind::ContactLanguageChanged { language: "spa".into() });
        let b = Event::new(EventKind::ContactNameChanged { name: "B".into() });
        s.add_pre_commit_event(HookId::CommitNameChanges, a.clone());
        s.add_pre_commit_event(HookId::CommitLanguageChanges, lang.clone());
        s.add_pre_commit_event(HookId::CommitNameChanges, b.clone());

        let queued = s.pre_commit_events();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[&HookId::CommitNameChanges], vec![a, b]);
        assert_eq!(queued[&HookId::CommitLanguageChanges], vec![lang]);
    }

    #[test]
    fn take_consumes_queue_once() {
        let mut s = session();
        s.add_pre_commit_event(HookId::CommitNameChanges, Event::new(EventKind::ContactNameChanged { name: "A".into() }));
        assert_eq!(s.take_pre_commit_events().len(), 1);
        assert!(s.take_pre_commit_events().is_empty());
    }

    #[test]
    fn post_commit_queue_is_separate() {
        let mut s = session();
        s.add_post_commit_event(HookId::QueueMessages, Event::new(EventKind::Error { text: "x".into() }));
        assert!(s.pre_commit_events().is_empty());
        assert_eq!(s.post_commit_events().len(), 1);
        s.clear_queues();
        assert!(s.post_commit_events().is_empty());
    }
}
