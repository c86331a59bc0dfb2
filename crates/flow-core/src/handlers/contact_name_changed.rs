//! `contact_name_changed`: el nombre se escribe en bulk al final del batch.
use std::collections::BTreeMap;

use log::debug;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::hook::{payloads, CommitHook, HookId, SessionEvents};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, NameUpdate};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::ContactNameChanged, apply_contact_name_changed);
    builder.register_hook(CommitNameChanges);
}

/// Hook de cambios de nombre.
///
/// Reducción: last write wins. De cada sesión sólo importa el último nombre
/// encolado; el resto se descarta. Si dos sesiones comparten contacto gana la
/// última del batch. Una sola sentencia para todo el batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitNameChanges;

impl CommitHook for CommitNameChanges {
    fn id(&self) -> HookId {
        HookId::CommitNameChanges
    }

    fn apply(&self,
             _ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             _cache: &dyn CachePool,
             _org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        let mut latest = BTreeMap::new();
        for s in sessions {
            let names = payloads(&s.events, EventType::ContactNameChanged, |k| match k {
                EventKind::ContactNameChanged { name } => Some(name),
                _ => None,
            })?;
            if let Some(last) = names.last() {
                latest.insert(s.session.contact_id, (*last).clone());
            }
        }
        let updates: Vec<NameUpdate> = latest.into_iter()
                                             .map(|(contact_id, name)| NameUpdate { contact_id, name })
                                             .collect();
        if updates.is_empty() {
            return Ok(());
        }
        let rows = tx.update_contact_names(&updates)?;
        debug!("commit_name_changes:done contacts={} rows={rows}", updates.len());
        Ok(())
    }
}

fn apply_contact_name_changed(_ctx: &CommitContext,
                              _tx: &mut dyn BatchWrites,
                              _cache: &dyn CachePool,
                              _org: &OrgAssets,
                              session: &mut Session,
                              event: &Event)
                              -> Result<(), EffectError> {
    let EventKind::ContactNameChanged { name } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::ContactNameChanged,
                                                    found: event.event_type() });
    };
    debug!("changing contact name contact_uuid={} session_id={} name={name}",
           session.contact_uuid,
           session.id);
    session.add_pre_commit_event(HookId::CommitNameChanges, event.clone());
    Ok(())
}
