//! Errores de persistencia.
//! Mapea errores de Diesel / r2d2 / Redis a variantes semánticas y luego a las
//! clases de `StoreError` que entiende el core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use flow_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl PersistenceError {
    /// Determina si un error es transitorio (recomendado reintentar con
    /// backoff). Algunos mensajes de desconexión llegan como `Unknown` con
    /// texto; se hace best-effort string match sin acoplar a SQLSTATE.
    pub fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::SerializationConflict => true,
            PersistenceError::TransientIo(_) => true,
            PersistenceError::Unknown(msg) => {
                let m = msg.to_lowercase();
                m.contains("deadlock detected")
                || m.contains("could not serialize access due to concurrent update")
                || m.contains("terminating connection due to administrator command")
                || m.contains("connection closed")
                || m.contains("connection refused")
                || m.contains("timeout")
            }
            _ => false,
        }
    }
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Unknown(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::AlreadyInTransaction => Self::Unknown("already in transaction".into()),
            DieselError::RollbackErrorOnCommit { rollback_error,
                                                 commit_error, } => {
                Self::Unknown(format!("rollback={rollback_error}; commit={commit_error}"))
            }
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            DieselError::InvalidCString(e) => Self::Unknown(format!("invalid cstring: {e}")),
            DieselError::RollbackTransaction => Self::Unknown("rollback transaction".into()),
            DieselError::NotInTransaction => Self::Unknown("not in transaction".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<redis::RedisError> for PersistenceError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            Self::TransientIo(format!("redis: {err}"))
        } else {
            Self::Cache(err.to_string())
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        let retryable = err.is_retryable();
        match err {
            PersistenceError::UniqueViolation(m) => StoreError::UniqueViolation(m),
            PersistenceError::CheckViolation(m) => StoreError::CheckViolation(m),
            PersistenceError::ForeignKeyViolation(m) => StoreError::ForeignKeyViolation(m),
            PersistenceError::SerializationConflict => StoreError::SerializationConflict,
            PersistenceError::TransientIo(m) => StoreError::Unavailable(m),
            PersistenceError::Unknown(m) if retryable => StoreError::Unavailable(m),
            other => StoreError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_keeps_violation_class() {
        let e: StoreError = PersistenceError::ForeignKeyViolation("msgs_msg_contact_id_fkey".into()).into();
        assert_eq!(e, StoreError::ForeignKeyViolation("msgs_msg_contact_id_fkey".into()));
        assert!(!e.is_retryable());
    }

    #[test]
    fn transient_errors_stay_retryable_across_layers() {
        let deadlock = PersistenceError::Unknown("ERROR: deadlock detected".into());
        assert!(deadlock.is_retryable());
        assert!(StoreError::from(deadlock).is_retryable());
        assert!(StoreError::from(PersistenceError::TransientIo("pool timed out".into())).is_retryable());
        assert!(!StoreError::from(PersistenceError::Config("DATABASE_URL".into())).is_retryable());
    }

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        assert!(matches!(PersistenceError::from(DieselError::NotFound), PersistenceError::NotFound));
    }
}
