//! Backend Postgres (Diesel) del pipeline de commit.
//!
//! - `PgBackend`: abre una transacción `read_write` por batch sobre una
//!   conexión del pool; el closure del core recibe un `PgWrites` con las
//!   sentencias bulk. Error en el closure o en el commit => rollback.
//! - `PgWrites`: una sentencia SQL por llamada, con forma fija (`unnest` de
//!   arrays) sin importar cuántas filas traiga el batch.
//! - `load_org_assets`: lectura de grupos, etiquetas y campos activos.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};

use flow_core::{Backend, BatchWrites, CachePool, CoreError, StoreError};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

mod assets;
mod writes;

pub use assets::load_org_assets;
pub use writes::PgWrites;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// El pool se construye con `min_idle` (mínimo de conexiones inactivas) y
/// `max_size` (límite superior total). Al construirlo se corren las
/// migraciones pendientes.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o un
/// proveedor que falle a voluntad en tests.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Error interno de la transacción: el de un hook o el de Diesel. Diesel
/// exige `From<diesel::result::Error>` para el tipo de error de `run`.
enum TxError {
    Core(CoreError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Db(e)
    }
}

/// `Backend` del core sobre Postgres + una `CachePool`.
pub struct PgBackend<P: ConnectionProvider, C: CachePool> {
    provider: P,
    cache: C,
}

impl<P: ConnectionProvider, C: CachePool> PgBackend<P, C> {
    pub fn new(provider: P, cache: C) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache_pool(&self) -> &C {
        &self.cache
    }

    /// Assets de `org_id`, leídos con una conexión propia (fuera del batch).
    pub fn org_assets(&self, org_id: flow_core::OrgId) -> Result<flow_core::OrgAssets, PersistenceError> {
        let mut conn = self.provider.connection()?;
        load_org_assets(&mut conn, org_id)
    }
}

impl<P: ConnectionProvider, C: CachePool> Backend for PgBackend<P, C> {
    fn cache(&self) -> &dyn CachePool {
        &self.cache
    }

    fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
        where F: FnOnce(&mut dyn BatchWrites) -> Result<T, CoreError>
    {
        let mut conn = self.provider
                           .connection()
                           .map_err(|e| CoreError::Resource(StoreError::from(e)))?;
        debug!("pg_tx:start");
        let res = conn.build_transaction().read_write().run(|tx_conn| {
                                                             let mut writes = PgWrites::new(tx_conn);
                                                             f(&mut writes).map_err(TxError::Core)
                                                         });
        match res {
            Ok(out) => {
                debug!("pg_tx:commit");
                Ok(out)
            }
            Err(TxError::Core(e)) => {
                debug!("pg_tx:rollback err={e}");
                Err(e)
            }
            Err(TxError::Db(e)) => {
                let err = PersistenceError::from(e);
                warn!("pg_tx:db_error err={err}");
                Err(CoreError::Resource(err.into()))
            }
        }
    }
}

/// Límites del pool Postgres del committer: al menos una conexión y
/// `min <= max`. Un batch usa una sola conexión durante su transacción.
fn pool_bounds(min_size: u32, max_size: u32) -> (u32, u32) {
    let max = max_size.max(1);
    let min = min_size.clamp(1, max);
    if min != min_size.max(1) {
        warn!("build_pool:bounds DATABASE_MIN_CONNECTIONS={min_size} > DATABASE_MAX_CONNECTIONS={max}, usando min={min}");
    }
    (min, max)
}

/// Pool r2d2 para el committer, con el esquema de contactos y mensajes ya
/// migrado antes de devolverlo.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let (min, max) = pool_bounds(min_size, max_size);
    let pool = r2d2::Pool::builder().min_idle(Some(min))
                                    .max_size(max)
                                    .build(ConnectionManager::<PgConnection>::new(database_url))
                                    .map_err(|e| PersistenceError::TransientIo(format!("commit pool build: {e}")))?;
    let mut conn = pool.get()
                       .map_err(|e| PersistenceError::TransientIo(format!("commit pool migrations: {e}")))?;
    let applied = run_pending_migrations(&mut conn)?;
    debug!("build_pool:ready min={min} max={max} migrations_applied={applied}");
    drop(conn);
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración (DATABASE_URL,
/// tamaños) y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
