//! Registro de handlers por tipo de evento y de hooks por `HookId`.
//!
//! Se construye una vez en el arranque con `RegistryBuilder` (cada módulo de
//! `handlers` registra lo suyo) y luego se congela en un `HandlerRegistry` de
//! sólo lectura, que se pasa por referencia al committer. Al no mutarse tras
//! `build`, las búsquedas no necesitan locks.
use std::collections::HashMap;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::{CoreError, EffectError};
use crate::event::{Event, EventType};
use crate::hook::{CommitHook, HookId};
use crate::session::Session;
use crate::store::{BatchWrites, CachePool};

/// Firma de un handler: aplica el evento sobre la transacción o lo difiere en
/// la sesión.
pub type HandlerFn = dyn Fn(&CommitContext, &mut dyn BatchWrites, &dyn CachePool, &OrgAssets, &mut Session, &Event)
                        -> Result<(), EffectError>
                     + Send
                     + Sync;

#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<EventType, Box<HandlerFn>>,
    hooks: HashMap<HookId, Box<dyn CommitHook>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra `handler` para `event_type`; un segundo registro del mismo
    /// tipo devuelve `CoreError::DuplicateHandler`.
    pub fn try_register<F>(&mut self, event_type: EventType, handler: F) -> Result<(), CoreError>
        where F: Fn(&CommitContext, &mut dyn BatchWrites, &dyn CachePool, &OrgAssets, &mut Session, &Event)
                    -> Result<(), EffectError>
                 + Send
                 + Sync
                 + 'static
    {
        if self.handlers.contains_key(&event_type) {
            return Err(CoreError::DuplicateHandler(event_type));
        }
        self.handlers.insert(event_type, Box::new(handler));
        Ok(())
    }

    /// Como `try_register`, pero un duplicado aborta el proceso: es un error
    /// de programación que debe verse en el arranque.
    pub fn register<F>(&mut self, event_type: EventType, handler: F)
        where F: Fn(&CommitContext, &mut dyn BatchWrites, &dyn CachePool, &OrgAssets, &mut Session, &Event)
                    -> Result<(), EffectError>
                 + Send
                 + Sync
                 + 'static
    {
        if let Err(e) = self.try_register(event_type, handler) {
            panic!("{e}");
        }
    }

    pub fn try_register_hook<H: CommitHook + 'static>(&mut self, hook: H) -> Result<(), CoreError> {
        let id = hook.id();
        if self.hooks.contains_key(&id) {
            return Err(CoreError::DuplicateHook(id));
        }
        self.hooks.insert(id, Box::new(hook));
        Ok(())
    }

    pub fn register_hook<H: CommitHook + 'static>(&mut self, hook: H) {
        if let Err(e) = self.try_register_hook(hook) {
            panic!("{e}");
        }
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry { handlers: self.handlers,
                          hooks: self.hooks }
    }
}

/// Registro congelado.
pub struct HandlerRegistry {
    handlers: HashMap<EventType, Box<HandlerFn>>,
    hooks: HashMap<HookId, Box<dyn CommitHook>>,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registro con todos los handlers y hooks de `crate::handlers`.
    pub fn standard() -> Self {
        let mut builder = RegistryBuilder::new();
        crate::handlers::register_all(&mut builder);
        builder.build()
    }

    pub fn lookup(&self, event_type: EventType) -> Result<&HandlerFn, CoreError> {
        self.handlers
            .get(&event_type)
            .map(|h| h.as_ref())
            .ok_or(CoreError::MissingHandler(event_type))
    }

    pub fn hook(&self, id: HookId) -> Result<&dyn CommitHook, CoreError> {
        self.hooks.get(&id).map(|h| h.as_ref()).ok_or(CoreError::MissingHook(id))
    }

    pub fn has_handler(&self, event_type: EventType) -> bool {
        self.handlers.contains_key(&event_type)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort();
        let mut hooks: Vec<_> = self.hooks.keys().collect();
        hooks.sort();
        f.debug_struct("HandlerRegistry")
         .field("handlers", &types)
         .field("hooks", &hooks)
         .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &CommitContext,
            _: &mut dyn BatchWrites,
            _: &dyn CachePool,
            _: &OrgAssets,
            _: &mut Session,
            _: &Event)
            -> Result<(), EffectError> {
        Ok(())
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut b = RegistryBuilder::new();
        b.try_register(EventType::Error, noop).expect("first registration");
        assert_eq!(b.try_register(EventType::Error, noop), Err(CoreError::DuplicateHandler(EventType::Error)));
    }

    #[test]
    #[should_panic(expected = "handler already registered for event type error")]
    fn register_panics_on_duplicate() {
        let mut b = RegistryBuilder::new();
        b.register(EventType::Error, noop);
        b.register(EventType::Error, noop);
    }

    #[test]
    fn lookup_missing_type_is_an_error() {
        let registry = RegistryBuilder::new().build();
        assert!(matches!(registry.lookup(EventType::MsgCreated), Err(CoreError::MissingHandler(EventType::MsgCreated))));
        assert!(matches!(registry.hook(HookId::CommitMessages), Err(CoreError::MissingHook(HookId::CommitMessages))));
    }

    #[test]
    fn standard_registry_covers_every_event_type() {
        let registry = HandlerRegistry::standard();
        for t in EventType::ALL {
            assert!(registry.has_handler(t), "missing handler for {t}");
        }
        for h in [HookId::CommitNameChanges,
                  HookId::CommitLanguageChanges,
                  HookId::CommitFieldChanges,
                  HookId::CommitGroupChanges,
                  HookId::CommitMessages,
                  HookId::QueueMessages]
        {
            assert!(registry.hook(h).is_ok(), "missing hook {h}");
        }
    }
}
