//! Cola de envío de mensajes sobre Redis.
//!
//! Las conexiones salen de un pool r2d2 de `redis::Client` y se devuelven al
//! pool al terminar cada operación. Cada mensaje es un JSON en una lista por
//! org (`{prefix}:{org_id}`), en el orden en que se confirmaron.

use log::debug;
use r2d2::Pool;

use flow_core::store::QueuedMessage;
use flow_core::{CachePool, OrgId, StoreError};

use crate::config::CacheConfig;
use crate::error::PersistenceError;

pub type RedisPool = Pool<redis::Client>;

pub fn build_cache_pool(url: &str, max_size: u32) -> Result<RedisPool, PersistenceError> {
    let client = redis::Client::open(url).map_err(|e| PersistenceError::Config(format!("redis url: {e}")))?;
    Pool::builder().max_size(max_size.max(1))
                   .build(client)
                   .map_err(|e| PersistenceError::TransientIo(format!("redis pool build: {e}")))
}

pub struct RedisCachePool {
    pool: RedisPool,
    prefix: String,
}

impl RedisCachePool {
    pub fn new(pool: RedisPool, prefix: impl Into<String>) -> Self {
        Self { pool,
               prefix: prefix.into() }
    }

    pub fn from_env() -> Result<Self, PersistenceError> {
        let cfg = CacheConfig::from_env()?;
        let pool = build_cache_pool(&cfg.url, cfg.max_connections)?;
        Ok(Self::new(pool, cfg.queue_prefix))
    }

    pub fn queue_key(&self, org_id: OrgId) -> String {
        format!("{}:{org_id}", self.prefix)
    }

    fn connection(&self) -> Result<r2d2::PooledConnection<redis::Client>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("redis pool error: {e}")))
    }

    /// Largo actual de la cola de `org_id`.
    pub fn queue_len(&self, org_id: OrgId) -> Result<usize, PersistenceError> {
        let mut conn = self.connection()?;
        let len: usize = redis::cmd("LLEN").arg(self.queue_key(org_id)).query(&mut *conn)?;
        Ok(len)
    }

    /// Mensajes encolados para `org_id`, del más viejo al más nuevo.
    pub fn queued(&self, org_id: OrgId) -> Result<Vec<QueuedMessage>, PersistenceError> {
        let mut conn = self.connection()?;
        let raw: Vec<String> = redis::cmd("LRANGE").arg(self.queue_key(org_id))
                                                   .arg(0)
                                                   .arg(-1)
                                                   .query(&mut *conn)?;
        raw.iter()
           .map(|s| serde_json::from_str(s).map_err(|e| PersistenceError::Cache(format!("decode queued msg: {e}"))))
           .collect()
    }

    pub fn clear_queue(&self, org_id: OrgId) -> Result<(), PersistenceError> {
        let mut conn = self.connection()?;
        redis::cmd("DEL").arg(self.queue_key(org_id)).query::<()>(&mut *conn)?;
        Ok(())
    }
}

impl CachePool for RedisCachePool {
    fn queue_messages(&self, org_id: OrgId, msgs: &[QueuedMessage]) -> Result<(), StoreError> {
        if msgs.is_empty() {
            return Ok(());
        }
        let payloads = msgs.iter()
                           .map(serde_json::to_string)
                           .collect::<Result<Vec<_>, _>>()
                           .map_err(|e| StoreError::Other(format!("encode queued msg: {e}")))?;
        let key = self.queue_key(org_id);
        let mut conn = self.connection()?;
        let len: i64 = redis::cmd("RPUSH").arg(&key)
                                          .arg(payloads.as_slice())
                                          .query(&mut *conn)
                                          .map_err(PersistenceError::from)?;
        debug!("redis:queue_messages key={key} pushed={} len={len}", msgs.len());
        Ok(())
    }
}
