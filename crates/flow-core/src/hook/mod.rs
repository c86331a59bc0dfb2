//! Hooks de commit y agrupación de eventos diferidos.
//!
//! Un hook es una estrategia sin estado que aplica, en la menor cantidad de
//! sentencias posible, todos los eventos diferidos bajo su `HookId` en un
//! batch, vengan de cuantas sesiones vengan.
//!
//! Invariantes de `group_by_hook`:
//! - Cada hook aparece una sola vez, con todas sus sesiones.
//! - Dentro de una sesión, los eventos mantienen el orden de emisión.
//! - Sesiones sin eventos para un hook no aparecen bajo ese hook.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::session::{HookQueue, Session};
use crate::store::{BatchWrites, CachePool};

/// Identidad estable de un hook. Es la clave de agrupación (no la identidad
/// de un objeto), así que dos handlers que difieren bajo el mismo `HookId`
/// comparten invocación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookId {
    CommitNameChanges,
    CommitLanguageChanges,
    CommitFieldChanges,
    CommitGroupChanges,
    CommitMessages,
    QueueMessages,
}

impl HookId {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookId::CommitNameChanges => "commit_name_changes",
            HookId::CommitLanguageChanges => "commit_language_changes",
            HookId::CommitFieldChanges => "commit_field_changes",
            HookId::CommitGroupChanges => "commit_group_changes",
            HookId::CommitMessages => "commit_messages",
            HookId::QueueMessages => "queue_messages",
        }
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eventos que una sesión aportó a un hook, en orden de emisión.
#[derive(Debug)]
pub struct SessionEvents<'s> {
    pub session: &'s Session,
    pub events: Vec<Event>,
}

/// Estrategia bulk de un hook.
pub trait CommitHook: Send + Sync {
    fn id(&self) -> HookId;

    /// Aplica todos los eventos del batch destinados a este hook. Cada
    /// implementación documenta su política de reducción.
    fn apply(&self,
             ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             cache: &dyn CachePool,
             org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError>;
}

/// Agrupación global `hook -> sesión -> eventos` de un batch.
#[derive(Debug, Default)]
pub struct HookGrouping<'s> {
    hooks: BTreeMap<HookId, Vec<SessionEvents<'s>>>,
}

impl<'s> HookGrouping<'s> {
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn hook_ids(&self) -> impl Iterator<Item = HookId> + '_ {
        self.hooks.keys().copied()
    }

    pub fn get(&self, hook: HookId) -> Option<&[SessionEvents<'s>]> {
        self.hooks.get(&hook).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HookId, &[SessionEvents<'s>])> + '_ {
        self.hooks.iter().map(|(h, s)| (*h, s.as_slice()))
    }

    pub fn event_count(&self) -> usize {
        self.hooks.values().flatten().map(|s| s.events.len()).sum()
    }
}

/// Invierte las colas por sesión (`queues[i]` pertenece a `sessions[i]`) en
/// una agrupación por hook. Fold en memoria, sin IO.
pub fn group_by_hook<'s>(sessions: &'s [Session], queues: Vec<HookQueue>) -> HookGrouping<'s> {
    debug_assert_eq!(sessions.len(), queues.len(), "one queue per session");
    let mut hooks: BTreeMap<HookId, Vec<SessionEvents<'s>>> = BTreeMap::new();
    for (session, queue) in sessions.iter().zip(queues) {
        for (hook, events) in queue {
            if events.is_empty() {
                continue;
            }
            hooks.entry(hook).or_default().push(SessionEvents { session, events });
        }
    }
    HookGrouping { hooks }
}

/// Extrae el payload de cada evento con `pick`; un evento de otro tipo bajo
/// este hook es un error de programación del handler.
pub(crate) fn payloads<'e, T>(events: &'e [Event],
                              expected: EventType,
                              pick: impl Fn(&'e EventKind) -> Option<T>)
                              -> Result<Vec<T>, EffectError> {
    events.iter()
          .map(|e| pick(&e.kind).ok_or(EffectError::UnexpectedPayload { expected,
                                                                         found: e.event_type() }))
          .collect()
}
