use flow_core::CoreError;
use flow_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Batch fallido: {0}")]
    Batch(#[from] CoreError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch inválido: {0}")]
    BatchFile(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{EventType, StoreError};

    #[test]
    fn batch_variant_keeps_core_message() {
        let err: RuntimeError = CoreError::MissingHandler(EventType::MsgCreated).into();
        assert_eq!(err.to_string(), "Batch fallido: no handler registered for event type msg_created");
    }

    #[test]
    fn persistence_variant_format() {
        let err: RuntimeError = PersistenceError::Config("DATABASE_URL no definido".into()).into();
        assert_eq!(err.to_string(),
                   "Error de persistencia: configuration error: DATABASE_URL no definido");
        let core = RuntimeError::Batch(CoreError::Resource(StoreError::SerializationConflict));
        assert!(matches!(core, RuntimeError::Batch(ref e) if e.is_retryable()));
    }
}
