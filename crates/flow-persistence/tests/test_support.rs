#![allow(dead_code)]

use diesel::pg::PgConnection;
use diesel::prelude::*;
use flow_core::{ContactId, GroupAsset, GroupId, LabelAsset, LabelId, OrgId};
use flow_persistence::config::DbConfig;
use flow_persistence::pg::{build_pool, PgPool};
use flow_persistence::schema::{contacts_contact, contacts_contactfield, contacts_contactgroup, msgs_label, msgs_msg,
                               orgs_org};
use once_cell::sync::Lazy;
use uuid::Uuid;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env().ok()?;
    match build_pool(&cfg.url, 1, 10) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub fn with_pool<F, R>(f: F) -> Option<R>
    where F: FnOnce(&PgPool) -> R
{
    TEST_POOL.as_ref().map(f)
}

/// Cada test trabaja sobre una org propia para no pisarse con otros.
pub fn new_org(conn: &mut PgConnection) -> OrgId {
    let id: i64 = diesel::insert_into(orgs_org::table).values(orgs_org::name.eq("test org"))
                                                      .returning(orgs_org::id)
                                                      .get_result(conn)
                                                      .expect("insert org");
    OrgId(id)
}

pub fn new_contact(conn: &mut PgConnection, org: OrgId) -> (ContactId, Uuid) {
    let uuid = Uuid::new_v4();
    let id: i64 = diesel::insert_into(contacts_contact::table).values((contacts_contact::uuid.eq(uuid),
                                                                       contacts_contact::org_id.eq(org.0)))
                                                              .returning(contacts_contact::id)
                                                              .get_result(conn)
                                                              .expect("insert contact");
    (ContactId(id), uuid)
}

pub fn new_group(conn: &mut PgConnection, org: OrgId, name: &str) -> GroupAsset {
    let uuid = Uuid::new_v4();
    let id: i64 = diesel::insert_into(contacts_contactgroup::table).values((contacts_contactgroup::uuid.eq(uuid),
                                                                            contacts_contactgroup::org_id.eq(org.0),
                                                                            contacts_contactgroup::name.eq(name)))
                                                                   .returning(contacts_contactgroup::id)
                                                                   .get_result(conn)
                                                                   .expect("insert group");
    GroupAsset { id: GroupId(id),
                 uuid,
                 name: name.into() }
}

pub fn new_label(conn: &mut PgConnection, org: OrgId, name: &str) -> LabelAsset {
    let uuid = Uuid::new_v4();
    let id: i64 = diesel::insert_into(msgs_label::table).values((msgs_label::uuid.eq(uuid),
                                                                 msgs_label::org_id.eq(org.0),
                                                                 msgs_label::name.eq(name)))
                                                        .returning(msgs_label::id)
                                                        .get_result(conn)
                                                        .expect("insert label");
    LabelAsset { id: LabelId(id),
                 uuid,
                 name: name.into() }
}

pub fn new_field(conn: &mut PgConnection, org: OrgId, key: &str) {
    diesel::insert_into(contacts_contactfield::table).values((contacts_contactfield::org_id.eq(org.0),
                                                              contacts_contactfield::key.eq(key),
                                                              contacts_contactfield::label.eq(key)))
                                                     .execute(conn)
                                                     .expect("insert field");
}

pub fn contact_name(conn: &mut PgConnection, id: ContactId) -> Option<String> {
    contacts_contact::table.find(id.0)
                           .select(contacts_contact::name)
                           .first(conn)
                           .expect("load contact")
}

pub fn contact_language(conn: &mut PgConnection, id: ContactId) -> Option<String> {
    contacts_contact::table.find(id.0)
                           .select(contacts_contact::language)
                           .first(conn)
                           .expect("load contact")
}

pub fn contact_fields(conn: &mut PgConnection, id: ContactId) -> serde_json::Value {
    contacts_contact::table.find(id.0)
                           .select(contacts_contact::fields)
                           .first(conn)
                           .expect("load contact")
}

pub fn message_count(conn: &mut PgConnection, contact: ContactId) -> i64 {
    msgs_msg::table.filter(msgs_msg::contact_id.eq(contact.0))
                   .count()
                   .get_result(conn)
                   .expect("count msgs")
}
