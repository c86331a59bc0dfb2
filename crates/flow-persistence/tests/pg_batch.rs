use diesel::prelude::*;
use flow_core::event::{FieldRef, GroupRef, LabelRef, MsgOut};
use flow_core::{BatchCommitter, CommitContext, ContactId, CoreError, EffectError, EventKind, HandlerRegistry, HookId,
                InMemoryCache, OrgId, Session, SessionId, StoreError};
use flow_persistence::pg::{PgBackend, PoolProvider};
use flow_persistence::schema::{contacts_contactgroup_contacts, msgs_msg, msgs_msg_labels};
use uuid::Uuid;

mod test_support;
use test_support::*;

fn session(id: i64, org: OrgId, contact: (ContactId, Uuid)) -> Session {
    Session::new(SessionId(id), org, contact.0, contact.1)
}

fn name(n: &str) -> EventKind {
    EventKind::ContactNameChanged { name: n.into() }
}

#[test]
fn renames_from_two_sessions_commit_and_third_is_untouched() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let mut conn = pool.get().expect("conn");
    let org = new_org(&mut conn);
    let (alice, bob, carol) = (new_contact(&mut conn, org), new_contact(&mut conn, org), new_contact(&mut conn, org));

    let backend = PgBackend::new(PoolProvider { pool: pool.clone() }, InMemoryCache::default());
    let registry = HandlerRegistry::standard();
    let assets = backend.org_assets(org).expect("assets");
    let mut sessions = vec![session(1, org, alice).with_events([name("Alice")]),
                            session(2, org, bob).with_events([name("X"), name("Bob")]),
                            session(3, org, carol)];
    let outcome = BatchCommitter::new(&registry, &backend).process_batch(&CommitContext::new(), &assets, &mut sessions)
                                                          .expect("batch");

    assert_eq!(outcome.hooks_applied, vec![HookId::CommitNameChanges]);
    assert_eq!(contact_name(&mut conn, alice.0), Some("Alice".into()));
    assert_eq!(contact_name(&mut conn, bob.0), Some("Bob".into()));
    assert_eq!(contact_name(&mut conn, carol.0), None);
}

#[test]
fn foreign_key_failure_rolls_back_name_changes() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let mut conn = pool.get().expect("conn");
    let org = new_org(&mut conn);
    let alice = new_contact(&mut conn, org);
    let ghost = (ContactId(i64::MAX), Uuid::new_v4());

    let backend = PgBackend::new(PoolProvider { pool: pool.clone() }, InMemoryCache::default());
    let registry = HandlerRegistry::standard();
    let assets = backend.org_assets(org).expect("assets");
    let msg = EventKind::MsgCreated { msg: MsgOut { uuid: Uuid::new_v4(),
                                                    urn: None,
                                                    text: "hola".into() } };
    let mut sessions = vec![session(1, org, alice).with_events([name("Alice")]),
                            session(2, org, ghost).with_events([msg])];
    let err = BatchCommitter::new(&registry, &backend).process_batch(&CommitContext::new(), &assets, &mut sessions)
                                                      .expect_err("fk violation");

    assert!(matches!(err,
                     CoreError::Hook { hook: HookId::CommitMessages,
                                       source: EffectError::Store(StoreError::ForeignKeyViolation(_)) }),
            "unexpected error {err:?}");
    assert_eq!(contact_name(&mut conn, alice.0), None);
    assert!(backend.cache_pool().queued(org).is_empty());
}

#[test]
fn groups_fields_language_and_messages_in_one_batch() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let mut conn = pool.get().expect("conn");
    let org = new_org(&mut conn);
    let contact = new_contact(&mut conn, org);
    let vip = new_group(&mut conn, org, "VIP");
    let testers = new_group(&mut conn, org, "Testers");
    new_field(&mut conn, org, "age");

    let backend = PgBackend::new(PoolProvider { pool: pool.clone() }, InMemoryCache::default());
    let registry = HandlerRegistry::standard();
    let assets = backend.org_assets(org).expect("assets");
    assert_eq!(assets.group(&vip.uuid), Some(&vip));

    let gref = |g: &flow_core::GroupAsset| GroupRef { uuid: g.uuid,
                                                      name: g.name.clone() };
    let msg_uuid = Uuid::new_v4();
    let mut sessions =
        vec![session(1, org, contact).with_events([EventKind::ContactGroupsChanged { groups_added: vec![gref(&vip),
                                                                                                       gref(&testers)],
                                                                                     groups_removed: vec![] },
                                                   EventKind::ContactGroupsChanged { groups_added: vec![],
                                                                                     groups_removed: vec![gref(&testers)] },
                                                   EventKind::ContactFieldChanged { field: FieldRef { key: "age".into(),
                                                                                                      name: "Age".into() },
                                                                                    value: Some("33".into()) },
                                                   EventKind::ContactLanguageChanged { language: "spa".into() },
                                                   EventKind::MsgCreated { msg: MsgOut { uuid: msg_uuid,
                                                                                         urn: Some("tel:+1555".into()),
                                                                                         text: "bienvenido".into() } }])];
    let outcome = BatchCommitter::new(&registry, &backend).process_batch(&CommitContext::new(), &assets, &mut sessions)
                                                          .expect("batch");
    assert_eq!(outcome.post_commit_hooks_applied, vec![HookId::QueueMessages]);

    let groups: Vec<i64> = contacts_contactgroup_contacts::table
        .filter(contacts_contactgroup_contacts::contact_id.eq(contact.0 .0))
        .select(contacts_contactgroup_contacts::contactgroup_id)
        .load(&mut conn)
        .expect("memberships");
    assert_eq!(groups, vec![vip.id.0]);
    assert_eq!(contact_fields(&mut conn, contact.0)["age"], "33");
    assert_eq!(contact_language(&mut conn, contact.0), Some("spa".into()));
    assert_eq!(message_count(&mut conn, contact.0), 1);
    let queued = backend.cache_pool().queued(org);
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].uuid, msg_uuid);
}

#[test]
fn input_labels_join_existing_messages() {
    let Some(pool) = with_pool(|p| p.clone()) else {
        eprintln!("skip (no DATABASE_URL)");
        return;
    };
    let mut conn = pool.get().expect("conn");
    let org = new_org(&mut conn);
    let contact = new_contact(&mut conn, org);
    let label = new_label(&mut conn, org, "Urgent");
    let input_uuid = Uuid::new_v4();
    let input_id: i64 = diesel::insert_into(msgs_msg::table).values((msgs_msg::uuid.eq(input_uuid),
                                                                     msgs_msg::org_id.eq(org.0),
                                                                     msgs_msg::contact_id.eq(contact.0 .0),
                                                                     msgs_msg::text.eq("ayuda"),
                                                                     msgs_msg::direction.eq("I"),
                                                                     msgs_msg::status.eq("H"),
                                                                     msgs_msg::created_on.eq(chrono::Utc::now())))
                                                            .returning(msgs_msg::id)
                                                            .get_result(&mut conn)
                                                            .expect("insert input msg");

    let backend = PgBackend::new(PoolProvider { pool: pool.clone() }, InMemoryCache::default());
    let registry = HandlerRegistry::standard();
    let assets = backend.org_assets(org).expect("assets");
    let labels = vec![LabelRef { uuid: label.uuid,
                                 name: label.name.clone() }];
    // el segundo evento apunta a un mensaje inexistente y no escribe nada
    let mut sessions = vec![session(1, org, contact).with_events([EventKind::InputLabelsAdded { input_uuid,
                                                                                               labels: labels.clone() },
                                                                  EventKind::InputLabelsAdded { input_uuid:
                                                                                                    Uuid::new_v4(),
                                                                                                labels }])];
    BatchCommitter::new(&registry, &backend).process_batch(&CommitContext::new(), &assets, &mut sessions)
                                            .expect("batch");

    let rows: Vec<(i64, i64)> = msgs_msg_labels::table.select((msgs_msg_labels::msg_id, msgs_msg_labels::label_id))
                                                      .filter(msgs_msg_labels::label_id.eq(label.id.0))
                                                      .load(&mut conn)
                                                      .expect("labels");
    assert_eq!(rows, vec![(input_id, label.id.0)]);
}
