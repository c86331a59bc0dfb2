//! Sentencias bulk de un batch.
//!
//! Cada método ejecuta exactamente una sentencia. Las filas viajan como arrays
//! paralelos (`$1::bigint[]`, `$2::text[]`, ...) que se expanden con `unnest`,
//! así la sentencia tiene la misma forma para 1 o para 10.000 filas.

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Jsonb, Nullable, Text, Timestamptz, Uuid as SqlUuid};
use log::debug;
use serde_json::{Map, Value};
use uuid::Uuid;

use flow_core::store::{FieldsUpdate, GroupMembership, LanguageUpdate, MessageLabel, NameUpdate, NewMessage};
use flow_core::{BatchWrites, StoreError};

use crate::error::PersistenceError;

const UPDATE_CONTACT_NAMES_SQL: &str = r#"
    UPDATE contacts_contact c
       SET name = r.name,
           modified_on = NOW()
      FROM unnest($1::bigint[], $2::text[]) AS r(id, name)
     WHERE c.id = r.id
"#;

const UPDATE_CONTACT_LANGUAGES_SQL: &str = r#"
    UPDATE contacts_contact c
       SET language = r.language,
           modified_on = NOW()
      FROM unnest($1::bigint[], $2::text[]) AS r(id, language)
     WHERE c.id = r.id
"#;

// valores null en `changes` borran la key
const UPDATE_CONTACT_FIELDS_SQL: &str = r#"
    UPDATE contacts_contact c
       SET fields = jsonb_strip_nulls(c.fields || r.changes),
           modified_on = NOW()
      FROM unnest($1::bigint[], $2::jsonb[]) AS r(id, changes)
     WHERE c.id = r.id
"#;

const ADD_GROUP_MEMBERSHIPS_SQL: &str = r#"
    INSERT INTO contacts_contactgroup_contacts (contact_id, contactgroup_id)
    SELECT r.contact_id, r.group_id
      FROM unnest($1::bigint[], $2::bigint[]) AS r(contact_id, group_id)
        ON CONFLICT (contactgroup_id, contact_id) DO NOTHING
"#;

const REMOVE_GROUP_MEMBERSHIPS_SQL: &str = r#"
    DELETE FROM contacts_contactgroup_contacts g
     USING unnest($1::bigint[], $2::bigint[]) AS r(contact_id, group_id)
     WHERE g.contact_id = r.contact_id
       AND g.contactgroup_id = r.group_id
"#;

const INSERT_MESSAGES_SQL: &str = r#"
    INSERT INTO msgs_msg (uuid, org_id, contact_id, urn, text, direction, status, created_on, modified_on)
    SELECT r.uuid, r.org_id, r.contact_id, r.urn, r.text, 'O', 'Q', r.created_on, NOW()
      FROM unnest($1::uuid[], $2::bigint[], $3::bigint[], $4::text[], $5::text[], $6::timestamptz[])
        AS r(uuid, org_id, contact_id, urn, text, created_on)
"#;

// mensajes inexistentes quedan fuera por el JOIN
const ADD_MESSAGE_LABELS_SQL: &str = r#"
    INSERT INTO msgs_msg_labels (msg_id, label_id)
    SELECT m.id, r.label_id
      FROM unnest($1::uuid[], $2::bigint[]) AS r(msg_uuid, label_id)
      JOIN msgs_msg m ON m.uuid = r.msg_uuid
        ON CONFLICT (msg_id, label_id) DO NOTHING
"#;

fn store_err(e: diesel::result::Error) -> StoreError {
    PersistenceError::from(e).into()
}

/// `BatchWrites` sobre la conexión de la transacción en curso.
pub struct PgWrites<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgWrites<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl BatchWrites for PgWrites<'_> {
    fn update_contact_names(&mut self, updates: &[NameUpdate]) -> Result<usize, StoreError> {
        let ids: Vec<i64> = updates.iter().map(|u| u.contact_id.0).collect();
        let names: Vec<&str> = updates.iter().map(|u| u.name.as_str()).collect();
        let n = diesel::sql_query(UPDATE_CONTACT_NAMES_SQL).bind::<Array<BigInt>, _>(ids)
                                                           .bind::<Array<Text>, _>(names)
                                                           .execute(&mut *self.conn)
                                                           .map_err(store_err)?;
        debug!("pg:update_contact_names rows={n}");
        Ok(n)
    }

    fn update_contact_languages(&mut self, updates: &[LanguageUpdate]) -> Result<usize, StoreError> {
        let ids: Vec<i64> = updates.iter().map(|u| u.contact_id.0).collect();
        let languages: Vec<Option<&str>> = updates.iter().map(|u| u.language.as_deref()).collect();
        let n = diesel::sql_query(UPDATE_CONTACT_LANGUAGES_SQL).bind::<Array<BigInt>, _>(ids)
                                                               .bind::<Array<Nullable<Text>>, _>(languages)
                                                               .execute(&mut *self.conn)
                                                               .map_err(store_err)?;
        debug!("pg:update_contact_languages rows={n}");
        Ok(n)
    }

    fn update_contact_fields(&mut self, updates: &[FieldsUpdate]) -> Result<usize, StoreError> {
        let ids: Vec<i64> = updates.iter().map(|u| u.contact_id.0).collect();
        let changes: Vec<Value> = updates.iter()
                                         .map(|u| {
                                             let obj: Map<String, Value> =
                                                 u.values
                                                  .iter()
                                                  .map(|(k, v)| (k.clone(), v.clone().map_or(Value::Null, Value::String)))
                                                  .collect();
                                             Value::Object(obj)
                                         })
                                         .collect();
        let n = diesel::sql_query(UPDATE_CONTACT_FIELDS_SQL).bind::<Array<BigInt>, _>(ids)
                                                            .bind::<Array<Jsonb>, _>(changes)
                                                            .execute(&mut *self.conn)
                                                            .map_err(store_err)?;
        debug!("pg:update_contact_fields rows={n}");
        Ok(n)
    }

    fn add_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError> {
        let (contacts, groups) = membership_columns(rows);
        let n = diesel::sql_query(ADD_GROUP_MEMBERSHIPS_SQL).bind::<Array<BigInt>, _>(contacts)
                                                            .bind::<Array<BigInt>, _>(groups)
                                                            .execute(&mut *self.conn)
                                                            .map_err(store_err)?;
        debug!("pg:add_group_memberships requested={} rows={n}", rows.len());
        Ok(n)
    }

    fn remove_group_memberships(&mut self, rows: &[GroupMembership]) -> Result<usize, StoreError> {
        let (contacts, groups) = membership_columns(rows);
        let n = diesel::sql_query(REMOVE_GROUP_MEMBERSHIPS_SQL).bind::<Array<BigInt>, _>(contacts)
                                                               .bind::<Array<BigInt>, _>(groups)
                                                               .execute(&mut *self.conn)
                                                               .map_err(store_err)?;
        debug!("pg:remove_group_memberships requested={} rows={n}", rows.len());
        Ok(n)
    }

    fn insert_messages(&mut self, msgs: &[NewMessage]) -> Result<usize, StoreError> {
        let uuids: Vec<Uuid> = msgs.iter().map(|m| m.uuid).collect();
        let orgs: Vec<i64> = msgs.iter().map(|m| m.org_id.0).collect();
        let contacts: Vec<i64> = msgs.iter().map(|m| m.contact_id.0).collect();
        let urns: Vec<Option<&str>> = msgs.iter().map(|m| m.urn.as_deref()).collect();
        let texts: Vec<&str> = msgs.iter().map(|m| m.text.as_str()).collect();
        let created: Vec<DateTime<Utc>> = msgs.iter().map(|m| m.created_on).collect();
        let n = diesel::sql_query(INSERT_MESSAGES_SQL).bind::<Array<SqlUuid>, _>(uuids)
                                                      .bind::<Array<BigInt>, _>(orgs)
                                                      .bind::<Array<BigInt>, _>(contacts)
                                                      .bind::<Array<Nullable<Text>>, _>(urns)
                                                      .bind::<Array<Text>, _>(texts)
                                                      .bind::<Array<Timestamptz>, _>(created)
                                                      .execute(&mut *self.conn)
                                                      .map_err(store_err)?;
        debug!("pg:insert_messages rows={n}");
        Ok(n)
    }

    fn add_message_labels(&mut self, labels: &[MessageLabel]) -> Result<usize, StoreError> {
        let msgs: Vec<Uuid> = labels.iter().map(|l| l.msg_uuid).collect();
        let label_ids: Vec<i64> = labels.iter().map(|l| l.label_id.0).collect();
        let n = diesel::sql_query(ADD_MESSAGE_LABELS_SQL).bind::<Array<SqlUuid>, _>(msgs)
                                                         .bind::<Array<BigInt>, _>(label_ids)
                                                         .execute(&mut *self.conn)
                                                         .map_err(store_err)?;
        debug!("pg:add_message_labels requested={} rows={n}", labels.len());
        Ok(n)
    }
}

fn membership_columns(rows: &[GroupMembership]) -> (Vec<i64>, Vec<i64>) {
    rows.iter().map(|r| (r.contact_id.0, r.group_id.0)).unzip()
}
