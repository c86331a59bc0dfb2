use flow_core::{BatchCommitter, BatchOutcome, CachePool, CommitContext, HandlerRegistry, OrgAssets, OrgId, Session};
use flow_persistence::{build_dev_pool_from_env, init_dotenv, with_retry, PgBackend, PoolProvider, RedisCachePool};
use log::info;

use crate::errors::RuntimeError;

/// Registro estándar + backend Postgres, listo para procesar batches.
pub struct Runtime<C: CachePool = RedisCachePool> {
    registry: HandlerRegistry,
    backend: PgBackend<PoolProvider, C>,
}

impl Runtime<RedisCachePool> {
    /// Pool Postgres (ya migrado) y cola Redis desde `.env` / entorno.
    pub fn from_env() -> Result<Self, RuntimeError> {
        init_dotenv();
        let pool = build_dev_pool_from_env()?;
        let cache = RedisCachePool::from_env()?;
        Ok(Self::new(PoolProvider { pool }, cache))
    }
}

impl<C: CachePool> Runtime<C> {
    pub fn new(provider: PoolProvider, cache: C) -> Self {
        Self { registry: HandlerRegistry::standard(),
               backend: PgBackend::new(provider, cache) }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &PgBackend<PoolProvider, C> {
        &self.backend
    }

    pub fn org_assets(&self, org_id: OrgId) -> Result<OrgAssets, RuntimeError> {
        Ok(with_retry(|| self.backend.org_assets(org_id))?)
    }

    /// Procesa `sessions` como un batch. Los assets salen de la org de la
    /// primera sesión; un error reintentable repite el batch completo.
    pub fn process_batch(&self, ctx: &CommitContext, sessions: &mut [Session]) -> Result<BatchOutcome, RuntimeError> {
        let Some(org_id) = sessions.first().map(|s| s.org_id) else {
            return Ok(BatchOutcome::default());
        };
        let org = self.org_assets(org_id)?;
        let committer = BatchCommitter::new(&self.registry, &self.backend);
        let outcome = with_retry(|| committer.process_batch(ctx, &org, sessions))?;
        info!("runtime:batch_done org_id={org_id} sessions={} hooks={} post_commit_failures={}",
              outcome.sessions,
              outcome.hooks_applied.len(),
              outcome.post_commit_failures.len());
        Ok(outcome)
    }
}
