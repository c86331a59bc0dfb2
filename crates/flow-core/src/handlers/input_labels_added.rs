//! `input_labels_added`: efecto inmediato sobre la transacción del batch.
//!
//! El mensaje de entrada ya existe antes de que la sesión se reanude, así que
//! no hace falta diferir: las etiquetas se escriben en el momento del despacho
//! y quedan dentro de la misma frontera atómica que los hooks.
use log::{debug, warn};

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, MessageLabel};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::InputLabelsAdded, apply_input_labels_added);
}

fn apply_input_labels_added(_ctx: &CommitContext,
                            tx: &mut dyn BatchWrites,
                            _cache: &dyn CachePool,
                            org: &OrgAssets,
                            session: &mut Session,
                            event: &Event)
                            -> Result<(), EffectError> {
    let EventKind::InputLabelsAdded { input_uuid, labels } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::InputLabelsAdded,
                                                    found: event.event_type() });
    };
    let mut rows = Vec::with_capacity(labels.len());
    for l in labels {
        match org.label(&l.uuid) {
            Some(asset) => rows.push(MessageLabel { msg_uuid: *input_uuid,
                                                    label_id: asset.id }),
            None => warn!("ignoring unknown label session_id={} label_uuid={} label_name={}",
                          session.id,
                          l.uuid,
                          l.name),
        }
    }
    if rows.is_empty() {
        return Ok(());
    }
    let n = tx.add_message_labels(&rows)?;
    debug!("input labels added contact_uuid={} session_id={} input_uuid={input_uuid} rows={n}",
           session.contact_uuid,
           session.id);
    Ok(())
}
