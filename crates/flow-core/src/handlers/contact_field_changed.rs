//! `contact_field_changed`
use std::collections::BTreeMap;

use log::{debug, warn};

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::hook::{payloads, CommitHook, HookId, SessionEvents};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, FieldsUpdate};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::ContactFieldChanged, apply_contact_field_changed);
    builder.register_hook(CommitFieldChanges);
}

/// Reducción: last write wins por (sesión, key de campo). Cambios de campos
/// distintos de una misma sesión, o de sesiones que comparten contacto, se
/// combinan en una sola fila.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitFieldChanges;

impl CommitHook for CommitFieldChanges {
    fn id(&self) -> HookId {
        HookId::CommitFieldChanges
    }

    fn apply(&self,
             _ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             _cache: &dyn CachePool,
             _org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        // sesiones que comparten contacto se combinan en orden de batch
        let mut merged: BTreeMap<_, BTreeMap<String, Option<String>>> = BTreeMap::new();
        for s in sessions {
            let changes = payloads(&s.events, EventType::ContactFieldChanged, |k| match k {
                EventKind::ContactFieldChanged { field, value } => Some((field, value)),
                _ => None,
            })?;
            if changes.is_empty() {
                continue;
            }
            let values = merged.entry(s.session.contact_id).or_default();
            for (field, value) in changes {
                values.insert(field.key.clone(), value.clone());
            }
        }
        let updates: Vec<FieldsUpdate> = merged.into_iter()
                                               .map(|(contact_id, values)| FieldsUpdate { contact_id, values })
                                               .collect();
        if updates.is_empty() {
            return Ok(());
        }
        let rows = tx.update_contact_fields(&updates)?;
        debug!("commit_field_changes:done contacts={} rows={rows}", updates.len());
        Ok(())
    }
}

fn apply_contact_field_changed(_ctx: &CommitContext,
                               _tx: &mut dyn BatchWrites,
                               _cache: &dyn CachePool,
                               org: &OrgAssets,
                               session: &mut Session,
                               event: &Event)
                               -> Result<(), EffectError> {
    let EventKind::ContactFieldChanged { field, value } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::ContactFieldChanged,
                                                    found: event.event_type() });
    };
    // el campo pudo borrarse mientras la sesión corría
    if org.field(&field.key).is_none() {
        warn!("ignoring change to unknown field contact_uuid={} session_id={} field={}",
              session.contact_uuid,
              session.id,
              field.key);
        return Ok(());
    }
    debug!("changing contact field contact_uuid={} session_id={} field={} value={:?}",
           session.contact_uuid,
           session.id,
           field.key,
           value);
    session.add_pre_commit_event(HookId::CommitFieldChanges, event.clone());
    Ok(())
}
