//! Backend en memoria, con las mismas garantías transaccionales que Postgres.
//!
//! Cada transacción trabaja sobre una copia del estado; sólo se publica si el
//! closure termina bien. Se usa para tests y para ejecutar el pipeline sin base
//! de datos.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use uuid::Uuid;

use super::{Backend, BatchWrites, CachePool, FieldsUpdate, GroupMembership, LanguageUpdate, MessageLabel, NameUpdate,
            NewMessage, QueuedMessage};
use crate::assets::{GroupId, LabelId};
use crate::errors::{CoreError, StoreError};
use crate::session::{ContactId, OrgId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryContact {
    pub name: Option<String>,
    pub language: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// Estado completo del store en memoria.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub contacts: BTreeMap<ContactId, MemoryContact>,
    pub memberships: BTreeSet<(ContactId, GroupId)>,
    pub messages: Vec<NewMessage>,
    pub message_labels: BTreeSet<(Uuid, LabelId)>,
    /// Sentencias bulk ejecutadas y confirmadas.
    pub statements: usize,
}

struct MemoryTx {
    state: MemoryState,
}

impl MemoryTx {
    fn require_contact(&self, id: ContactId) -> Result<(), StoreError> {
        if self.state.contacts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!("contact {id} does not exist")))
        }
    }
}

// Postgres no define qué fila gana en un UPDATE ... FROM con ids repetidos.
fn unique_contacts(ids: impl Iterator<Item = ContactId>) -> Result<(), StoreError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::Other(format!("contact {id} updated twice in one statement")));
        }
    }
    Ok(())
}

impl BatchWrites for MemoryTx {
    fn update_contact_names(&mut self, updates: &[NameUpdate]) -> Result<usize, StoreError> {
        unique_contacts(updates.iter().map(|u| u.contact_id))?;
        self.state.statements += 1;
        let mut n = 0;
        for u in updates {
            if let Some(c) = self.state.contacts.get_mut(&u.contact_id) {
                c.name = Some(u.name.clone());
                n += 1;
            }
        }
        Ok(n)
    }

    fn update_contact_languages(&mut self, updates: &[LanguageUpdate]) -> Result<usize, StoreError> {
        unique_contacts(updates.iter().map(|u| u.contact_id))?;
        self.state.statements += 1;
        let mut n = 0;
        for u in updates {
            if let Some(c) = self.state.contacts.get_mut(&u.contact_id) {
                c.language = u.language.clone();
                n += 1;
            }
        }
        Ok(n)
    }

    fn update_contact_fields(&mut self, updates: &[FieldsUpdate]) -> Result<usize, StoreError> {
        unique_contacts(updates.iter().map(|u| u.contact_id))?;
        self.state.statements += 1;
        let mut n = 0;
        for u in updates {
            if let Some(c) = self.state.contacts.get_mut(&u.contact_id) {
                for (key, value) in &u.values {
                    match value {
                        Some(v) => {
                            c.fields.insert(key.clone(), v.clone());
                        }
                        None => {
                            c.fields.remove(key);
                        }
                    }
                }
                n += 1;
            }
        }
        Ok(n)
    }

    fn add_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError> {
        self.state.statements += 1;
        let mut n = 0;
        for r in rows {
            self.require_contact(r.contact_id)?;
            if self.state.memberships.insert((r.contact_id, r.group_id)) {
                n += 1;
            }
        }
        Ok(n)
    }

    fn remove_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError> {
        self.state.statements += 1;
        Ok(rows.iter()
               .filter(|r| self.state.memberships.remove(&(r.contact_id, r.group_id)))
               .count())
    }

    fn insert_messages(&mut self, msgs: &[NewMessage]) -> Result<usize, StoreError> {
        self.state.statements += 1;
        for m in msgs {
            self.require_contact(m.contact_id)?;
            if self.state.messages.iter().any(|e| e.uuid == m.uuid) {
                return Err(StoreError::UniqueViolation(format!("msg {} already exists", m.uuid)));
            }
            self.state.messages.push(m.clone());
        }
        Ok(msgs.len())
    }

    fn add_message_labels(&mut self, labels: &[MessageLabel]) -> Result<usize, StoreError> {
        self.state.statements += 1;
        let mut n = 0;
        for l in labels {
            // mismo comportamiento que el JOIN en SQL: mensajes desconocidos se ignoran
            let known = self.state.messages.iter().any(|m| m.uuid == l.msg_uuid);
            if known && self.state.message_labels.insert((l.msg_uuid, l.label_id)) {
                n += 1;
            }
        }
        Ok(n)
    }
}

/// Cola de envío en memoria.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    queues: Mutex<BTreeMap<OrgId, Vec<QueuedMessage>>>,
    failing: AtomicBool,
}

impl InMemoryCache {
    /// Hace fallar las siguientes operaciones (simula caída del store).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn queued(&self, org_id: OrgId) -> Vec<QueuedMessage> {
        lock(&self.queues).get(&org_id).cloned().unwrap_or_default()
    }
}

impl CachePool for InMemoryCache {
    fn queue_messages(&self, org_id: OrgId, msgs: &[QueuedMessage]) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory cache marked failing".into()));
        }
        lock(&self.queues).entry(org_id).or_default().extend_from_slice(msgs);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    cache: InMemoryCache,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend con los contactos dados ya existentes (sin nombre).
    pub fn with_contacts(ids: impl IntoIterator<Item = ContactId>) -> Self {
        let backend = Self::new();
        {
            let mut state = lock(&backend.state);
            for id in ids {
                state.contacts.insert(id, MemoryContact::default());
            }
        }
        backend
    }

    /// Simula que no se puede adquirir conexión.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MemoryState {
        lock(&self.state).clone()
    }

    pub fn contact(&self, id: ContactId) -> Option<MemoryContact> {
        lock(&self.state).contacts.get(&id).cloned()
    }

    pub fn memory_cache(&self) -> &InMemoryCache {
        &self.cache
    }
}

impl Backend for InMemoryBackend {
    fn cache(&self) -> &dyn CachePool {
        &self.cache
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
        where F: FnOnce(&mut dyn BatchWrites) -> Result<T, CoreError>
    {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CoreError::Resource(StoreError::Unavailable("in-memory backend marked unavailable".into())));
        }
        let mut guard = lock(&self.state);
        let mut tx = MemoryTx { state: guard.clone() };
        match f(&mut tx) {
            Ok(out) => {
                *guard = tx.state;
                debug!("memory_tx:commit statements={}", guard.statements);
                Ok(out)
            }
            Err(e) => {
                debug!("memory_tx:rollback err={e}");
                Err(e)
            }
        }
    }
}

// Un panic dentro de un test no debe envenenar el resto: se recupera el estado.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
