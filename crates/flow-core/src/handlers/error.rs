//! `error`: sólo se registra en el log.
use log::warn;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::Error, apply_error);
}

fn apply_error(_ctx: &CommitContext,
               _tx: &mut dyn BatchWrites,
               _cache: &dyn CachePool,
               _org: &OrgAssets,
               session: &mut Session,
               event: &Event)
               -> Result<(), EffectError> {
    let EventKind::Error { text } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::Error,
                                                    found: event.event_type() });
    };
    warn!("flow error event contact_uuid={} session_id={} text={text}",
          session.contact_uuid,
          session.id);
    Ok(())
}
