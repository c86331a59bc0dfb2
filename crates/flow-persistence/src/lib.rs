//! flow-persistence
//!
//! Backend Postgres (Diesel) y cache Redis para el pipeline de `flow-core`.
//!
//! Módulos:
//! - `pg`: pool r2d2, `PgBackend` (transacción única por batch) y las
//!   sentencias bulk de `PgWrites`.
//! - `cache`: `RedisCachePool`, cola de envío de mensajes.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `retry`: reintento con backoff de un batch completo.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod cache;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod retry;
pub mod schema;

pub use cache::{build_cache_pool, RedisCachePool, RedisPool};
pub use config::{init_dotenv, CacheConfig, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_dev_pool_from_env, build_pool, load_org_assets, ConnectionProvider, PgBackend, PgPool, PgWrites,
             PoolProvider};
pub use retry::{with_retry, Retryable};
