//! `contact_groups_changed`
use std::collections::BTreeMap;

use log::{debug, warn};

use crate::assets::{GroupId, OrgAssets};
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::hook::{payloads, CommitHook, HookId, SessionEvents};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, GroupMembership};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::ContactGroupsChanged, apply_contact_groups_changed);
    builder.register_hook(CommitGroupChanges);
}

/// Hook de membresías.
///
/// Reducción: se aplican todos los eventos de la sesión en orden (dentro de
/// un evento, altas antes que bajas); el estado final por (contacto, grupo)
/// decide si la fila entra en el INSERT o en el DELETE. Como mucho dos
/// sentencias por batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitGroupChanges;

impl CommitHook for CommitGroupChanges {
    fn id(&self) -> HookId {
        HookId::CommitGroupChanges
    }

    fn apply(&self,
             _ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             _cache: &dyn CachePool,
             org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        let mut adds = Vec::new();
        let mut removes = Vec::new();
        for s in sessions {
            let changes = payloads(&s.events, EventType::ContactGroupsChanged, |k| match k {
                EventKind::ContactGroupsChanged { groups_added, groups_removed } => Some((groups_added, groups_removed)),
                _ => None,
            })?;
            // true = miembro al final de la sesión
            let mut membership: BTreeMap<GroupId, bool> = BTreeMap::new();
            for (added, removed) in changes {
                for g in added.iter().filter_map(|r| org.group(&r.uuid)) {
                    membership.insert(g.id, true);
                }
                for g in removed.iter().filter_map(|r| org.group(&r.uuid)) {
                    membership.insert(g.id, false);
                }
            }
            for (group_id, member) in membership {
                let row = GroupMembership { contact_id: s.session.contact_id,
                                            group_id };
                if member {
                    adds.push(row);
                } else {
                    removes.push(row);
                }
            }
        }
        if !adds.is_empty() {
            let rows = tx.add_group_memberships(&adds)?;
            debug!("commit_group_changes:added requested={} rows={rows}", adds.len());
        }
        if !removes.is_empty() {
            let rows = tx.remove_group_memberships(&removes)?;
            debug!("commit_group_changes:removed requested={} rows={rows}", removes.len());
        }
        Ok(())
    }
}

fn apply_contact_groups_changed(_ctx: &CommitContext,
                                _tx: &mut dyn BatchWrites,
                                _cache: &dyn CachePool,
                                org: &OrgAssets,
                                session: &mut Session,
                                event: &Event)
                                -> Result<(), EffectError> {
    let EventKind::ContactGroupsChanged { groups_added, groups_removed } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::ContactGroupsChanged,
                                                    found: event.event_type() });
    };
    for r in groups_added.iter().chain(groups_removed) {
        if org.group(&r.uuid).is_none() {
            warn!("ignoring unknown group contact_uuid={} session_id={} group_uuid={} group_name={}",
                  session.contact_uuid,
                  session.id,
                  r.uuid,
                  r.name);
        }
    }
    debug!("changing contact groups contact_uuid={} session_id={} added={} removed={}",
           session.contact_uuid,
           session.id,
           groups_added.len(),
           groups_removed.len());
    session.add_pre_commit_event(HookId::CommitGroupChanges, event.clone());
    Ok(())
}
