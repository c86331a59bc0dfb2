//! `msg_created`: inserción del mensaje dentro del batch y encolado para envío
//! una vez confirmado el commit.
use log::debug;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType, MsgOut};
use crate::hook::{payloads, CommitHook, HookId, SessionEvents};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, NewMessage, QueuedMessage};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::MsgCreated, apply_msg_created);
    builder.register_hook(CommitMessages);
    builder.register_hook(QueueMessages);
}

fn msgs<'e>(events: &'e [Event]) -> Result<Vec<&'e MsgOut>, EffectError> {
    payloads(events, EventType::MsgCreated, |k| match k {
        EventKind::MsgCreated { msg } => Some(msg),
        _ => None,
    })
}

/// Inserta los mensajes salientes.
///
/// Reducción: ninguna, append-only. Cada evento es un mensaje y todos se
/// insertan, en orden, en una única sentencia.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitMessages;

impl CommitHook for CommitMessages {
    fn id(&self) -> HookId {
        HookId::CommitMessages
    }

    fn apply(&self,
             _ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             _cache: &dyn CachePool,
             org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        let mut rows = Vec::new();
        for s in sessions {
            for (event, msg) in s.events.iter().zip(msgs(&s.events)?) {
                rows.push(NewMessage { uuid: msg.uuid,
                                       org_id: org.org_id(),
                                       contact_id: s.session.contact_id,
                                       urn: msg.urn.clone(),
                                       text: msg.text.clone(),
                                       created_on: event.created_on });
            }
        }
        if rows.is_empty() {
            return Ok(());
        }
        let n = tx.insert_messages(&rows)?;
        debug!("commit_messages:done inserted={n}");
        Ok(())
    }
}

/// Encola en la cache los mensajes ya confirmados (hook post-commit).
///
/// Reducción: ninguna, append-only. Una conexión y un push por batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueMessages;

impl CommitHook for QueueMessages {
    fn id(&self) -> HookId {
        HookId::QueueMessages
    }

    fn apply(&self,
             _ctx: &CommitContext,
             _tx: &mut dyn BatchWrites,
             cache: &dyn CachePool,
             org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        let mut queued = Vec::new();
        for s in sessions {
            for msg in msgs(&s.events)? {
                queued.push(QueuedMessage { uuid: msg.uuid,
                                            contact_id: s.session.contact_id,
                                            contact_uuid: s.session.contact_uuid,
                                            urn: msg.urn.clone(),
                                            text: msg.text.clone() });
            }
        }
        if queued.is_empty() {
            return Ok(());
        }
        cache.queue_messages(org.org_id(), &queued)?;
        debug!("queue_messages:done org_id={} queued={}", org.org_id(), queued.len());
        Ok(())
    }
}

fn apply_msg_created(_ctx: &CommitContext,
                     _tx: &mut dyn BatchWrites,
                     _cache: &dyn CachePool,
                     _org: &OrgAssets,
                     session: &mut Session,
                     event: &Event)
                     -> Result<(), EffectError> {
    let EventKind::MsgCreated { msg } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::MsgCreated,
                                                    found: event.event_type() });
    };
    if msg.text.is_empty() {
        return Err(EffectError::Invalid(format!("msg {} has no text", msg.uuid)));
    }
    debug!("msg created contact_uuid={} session_id={} msg_uuid={} text={}",
           session.contact_uuid,
           session.id,
           msg.uuid,
           msg.text);
    session.add_pre_commit_event(HookId::CommitMessages, event.clone());
    session.add_post_commit_event(HookId::QueueMessages, event.clone());
    Ok(())
}
