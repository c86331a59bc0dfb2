//! Errores del pipeline de commit.
//!
//! Tres niveles:
//! - `StoreError`: fallo de un backend (SQL o cache), independiente del motor.
//! - `EffectError`: lo que devuelve un handler o un hook.
//! - `CoreError`: error de un batch completo, con el contexto de qué falló.

use thiserror::Error;

use crate::batch::BatchPhase;
use crate::event::EventType;
use crate::hook::HookId;
use crate::session::{OrgId, SessionId};

/// Clases de fallo de un store, sin acoplar a Diesel ni a Redis.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Conflictos de serialización y caídas de conexión pueden reintentarse
    /// (siempre a nivel de batch completo).
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::SerializationConflict | StoreError::Unavailable(_))
    }
}

/// Error devuelto por un handler o un hook.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EffectError {
    #[error("unexpected payload: expected {expected}, found {found}")]
    UnexpectedPayload { expected: EventType, found: EventType },
    #[error("invalid event: {0}")]
    Invalid(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error de un batch. Cualquier variante implica que nada del batch quedó
/// persistido.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error("handler already registered for event type {0}")]
    DuplicateHandler(EventType),
    #[error("hook {0} already registered")]
    DuplicateHook(HookId),
    #[error("no handler registered for event type {0}")]
    MissingHandler(EventType),
    #[error("no hook registered for {0}")]
    MissingHook(HookId),
    #[error("batch mixes sessions of org {expected} and org {found}")]
    MixedOrgs { expected: OrgId, found: OrgId },
    #[error("handler for {event_type} failed in session {session_id}: {source}")]
    Handler {
        event_type: EventType,
        session_id: SessionId,
        #[source]
        source: EffectError,
    },
    #[error("hook {hook} failed: {source}")]
    Hook {
        hook: HookId,
        #[source]
        source: EffectError,
    },
    #[error("resource error: {0}")]
    Resource(#[source] StoreError),
    #[error("batch cancelled during {phase}")]
    Cancelled { phase: BatchPhase },
}

impl CoreError {
    /// Indica si reintentar el batch completo tiene sentido.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Resource(e) => e.is_retryable(),
            CoreError::Handler { source: EffectError::Store(e), .. } => e.is_retryable(),
            CoreError::Hook { source: EffectError::Store(e), .. } => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CoreError::Resource(StoreError::Unavailable("pool".into())).is_retryable());
        assert!(CoreError::Hook { hook: HookId::CommitNameChanges,
                                  source: EffectError::Store(StoreError::SerializationConflict) }.is_retryable());
        assert!(!CoreError::Hook { hook: HookId::CommitMessages,
                                   source: EffectError::Store(StoreError::ForeignKeyViolation("fk".into())) }.is_retryable());
        assert!(!CoreError::MissingHandler(EventType::MsgCreated).is_retryable());
    }

    #[test]
    fn handler_error_mentions_event_and_session() {
        let err = CoreError::Handler { event_type: EventType::ContactNameChanged,
                                       session_id: SessionId(42),
                                       source: EffectError::Invalid("empty".into()) };
        let msg = err.to_string();
        assert!(msg.contains("contact_name_changed"), "msg={msg}");
        assert!(msg.contains("42"), "msg={msg}");
    }
}
