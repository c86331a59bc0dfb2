//! Cola de mensajes en Redis (requiere REDIS_URL).

use flow_core::store::QueuedMessage;
use flow_core::{CachePool, ContactId, OrgId};
use flow_persistence::{build_cache_pool, CacheConfig, RedisCachePool};
use uuid::Uuid;

fn cache() -> Option<RedisCachePool> {
    let cfg = CacheConfig::from_env().ok()?;
    let pool = build_cache_pool(&cfg.url, 2).expect("redis pool");
    Some(RedisCachePool::new(pool, format!("test-{}", Uuid::new_v4())))
}

fn queued(text: &str) -> QueuedMessage {
    QueuedMessage { uuid: Uuid::new_v4(),
                    contact_id: ContactId(1),
                    contact_uuid: Uuid::new_v4(),
                    urn: Some("tel:+1555".into()),
                    text: text.into() }
}

#[test]
fn messages_are_pushed_in_order_under_org_key() {
    let Some(cache) = cache() else {
        eprintln!("skip (no REDIS_URL)");
        return;
    };
    let org = OrgId(42);
    let msgs = vec![queued("uno"), queued("dos")];
    cache.queue_messages(org, &msgs).expect("push");
    cache.queue_messages(org, &[queued("tres")]).expect("push");

    assert_eq!(cache.queue_len(org).expect("len"), 3);
    let texts: Vec<_> = cache.queued(org).expect("range").into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["uno", "dos", "tres"]);
    assert_eq!(cache.queue_len(OrgId(43)).expect("len"), 0);
    cache.clear_queue(org).expect("cleanup");
}

#[test]
fn empty_push_touches_nothing() {
    let Some(cache) = cache() else {
        eprintln!("skip (no REDIS_URL)");
        return;
    };
    cache.queue_messages(OrgId(7), &[]).expect("noop");
    assert_eq!(cache.queue_len(OrgId(7)).expect("len"), 0);
}

#[test]
fn queue_key_uses_prefix_and_org() {
    let Some(cache) = cache() else {
        eprintln!("skip (no REDIS_URL)");
        return;
    };
    assert!(cache.queue_key(OrgId(5)).ends_with(":5"));
}
