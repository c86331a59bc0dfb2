//! Frontera de persistencia del pipeline.
//!
//! - `BatchWrites`: operaciones bulk disponibles dentro de la transacción del
//!   batch. Cada método es una sola sentencia, sin importar cuántas filas.
//! - `CachePool`: store clave-valor rápido (cola de envío de mensajes). Las
//!   conexiones se adquieren y liberan por operación.
//! - `Backend`: abre la transacción única del batch y expone la cache.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::assets::{GroupId, LabelId};
use crate::errors::{CoreError, StoreError};
use crate::session::{ContactId, OrgId};

mod memory;

pub use memory::{InMemoryBackend, InMemoryCache, MemoryContact, MemoryState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameUpdate {
    pub contact_id: ContactId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageUpdate {
    pub contact_id: ContactId,
    /// `None` deja al contacto sin idioma.
    pub language: Option<String>,
}

/// Cambios de campos de un contacto; `None` elimina el campo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsUpdate {
    pub contact_id: ContactId,
    pub values: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupMembership {
    pub contact_id: ContactId,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub uuid: Uuid,
    pub org_id: OrgId,
    pub contact_id: ContactId,
    pub urn: Option<String>,
    pub text: String,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MessageLabel {
    pub msg_uuid: Uuid,
    pub label_id: LabelId,
}

/// Mensaje listo para la cola de envío.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub uuid: Uuid,
    pub contact_id: ContactId,
    pub contact_uuid: Uuid,
    pub urn: Option<String>,
    pub text: String,
}

/// Escrituras bulk sobre la transacción del batch. Devuelven filas afectadas.
pub trait BatchWrites {
    fn update_contact_names(&mut self, updates: &[NameUpdate]) -> Result<usize, StoreError>;
    fn update_contact_languages(&mut self, updates: &[LanguageUpdate]) -> Result<usize, StoreError>;
    fn update_contact_fields(&mut self, updates: &[FieldsUpdate]) -> Result<usize, StoreError>;
    fn add_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError>;
    fn remove_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError>;
    fn insert_messages(&mut self, msgs: &[NewMessage]) -> Result<usize, StoreError>;
    fn add_message_labels(&mut self, labels: &[MessageLabel]) -> Result<usize, StoreError>;
}

/// Pool de conexiones al store clave-valor.
pub trait CachePool: Send + Sync {
    /// Encola mensajes salientes de `org_id` para su envío.
    fn queue_messages(&self, org_id: OrgId, msgs: &[QueuedMessage]) -> Result<(), StoreError>;
}

/// Backend transaccional de un batch.
///
/// Contrato de `transaction`:
/// - Si `f` devuelve `Ok`, se hace commit; si el commit falla se devuelve
///   `CoreError::Resource`.
/// - Si `f` devuelve `Err`, se hace rollback y se devuelve ese mismo error.
/// - Si no se puede adquirir conexión, `CoreError::Resource` sin llamar a `f`.
pub trait Backend {
    fn cache(&self) -> &dyn CachePool;

    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
        where F: FnOnce(&mut dyn BatchWrites) -> Result<T, CoreError>;
}
