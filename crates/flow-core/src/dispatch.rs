//! Despacho de un evento a su handler.

use log::trace;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::CoreError;
use crate::event::Event;
use crate::registry::HandlerRegistry;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool};

/// Resuelve el handler por tipo de evento y lo invoca de forma síncrona.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r HandlerRegistry,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Un tipo sin handler es un error de configuración; un fallo del handler
    /// se devuelve con el tipo de evento y la sesión.
    pub fn dispatch(&self,
                    ctx: &CommitContext,
                    tx: &mut dyn BatchWrites,
                    cache: &dyn CachePool,
                    org: &OrgAssets,
                    session: &mut Session,
                    event: &Event)
                    -> Result<(), CoreError> {
        let event_type = event.event_type();
        let session_id = session.id;
        let handler = self.registry.lookup(event_type)?;
        trace!("dispatch session_id={session_id} event_type={event_type} event_uuid={}", event.uuid);
        handler(ctx, tx, cache, org, session, event).map_err(|source| CoreError::Handler { event_type,
                                                                                           session_id,
                                                                                           source })
    }
}
