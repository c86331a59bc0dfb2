//! `BatchCommitter`: despacho, agrupación y commit atómico de un batch.
//!
//! Fases: `Collecting -> Dispatching -> Grouping -> Committing ->
//! {Committed | RolledBack}`.
//!
//! - Antes de abrir la transacción se valida que todas las sesiones sean de la
//!   misma org y que cada evento tenga handler, para no dejar estado a medias.
//! - Despacho, agrupación y hooks corren en secuencia sobre una única
//!   transacción; cualquier error la revierte completa.
//! - Los hooks post-commit corren después del commit en una transacción aparte;
//!   sus fallos se registran pero ya no pueden deshacer el batch.
use std::fmt;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::dispatch::Dispatcher;
use crate::errors::CoreError;
use crate::hook::{group_by_hook, CommitHook, HookGrouping, HookId, SessionEvents};
use crate::registry::HandlerRegistry;
use crate::session::{HookQueue, Session};
use crate::store::{Backend, BatchWrites, CachePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Collecting,
    Dispatching,
    Grouping,
    Committing,
    Committed,
    RolledBack,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchPhase::Collecting => "collecting",
            BatchPhase::Dispatching => "dispatching",
            BatchPhase::Grouping => "grouping",
            BatchPhase::Committing => "committing",
            BatchPhase::Committed => "committed",
            BatchPhase::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// Resultado observable de un batch confirmado.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub sessions: usize,
    pub events_dispatched: usize,
    /// Hooks aplicados dentro de la transacción, en orden de ejecución.
    pub hooks_applied: Vec<HookId>,
    pub post_commit_hooks_applied: Vec<HookId>,
    /// Hooks post-commit que fallaron (el batch ya estaba confirmado).
    pub post_commit_failures: Vec<(HookId, String)>,
}

pub struct BatchCommitter<'a, B: Backend> {
    registry: &'a HandlerRegistry,
    backend: &'a B,
}

impl<'a, B: Backend> BatchCommitter<'a, B> {
    pub fn new(registry: &'a HandlerRegistry, backend: &'a B) -> Self {
        Self { registry, backend }
    }

    /// Despacha y confirma `sessions` como una unidad atómica.
    ///
    /// Las colas de un intento anterior se descartan al empezar, así que un
    /// batch fallido puede volver a procesarse completo.
    pub fn process_batch(&self,
                         ctx: &CommitContext,
                         org: &OrgAssets,
                         sessions: &mut [Session])
                         -> Result<BatchOutcome, CoreError> {
        let total_events: usize = sessions.iter().map(|s| s.events().len()).sum();
        info!("process_batch:start org_id={} sessions={} events={total_events}",
              org.org_id(),
              sessions.len());
        if sessions.is_empty() {
            return Ok(BatchOutcome::default());
        }

        self.validate(org, sessions)?;
        for s in sessions.iter_mut() {
            s.clear_queues();
        }
        ensure_active(ctx, BatchPhase::Dispatching)?;

        let cache = self.backend.cache();
        let committed = self.backend.transaction(|tx| {
                                        let dispatched = self.dispatch_all(ctx, tx, cache, org, sessions)?;

                                        debug!("process_batch:phase={}", BatchPhase::Grouping);
                                        let queues: Vec<HookQueue> =
                                            sessions.iter_mut().map(Session::take_pre_commit_events).collect();
                                        let grouping = group_by_hook(sessions, queues);

                                        debug!("process_batch:phase={} hooks={}", BatchPhase::Committing, grouping.len());
                                        let applied = self.apply_hooks(ctx, tx, cache, org, &grouping)?;
                                        ensure_active(ctx, BatchPhase::Committing)?;
                                        Ok((dispatched, applied))
                                    });

        let (events_dispatched, hooks_applied) = match committed {
            Ok(r) => r,
            Err(e) => {
                warn!("process_batch:{} org_id={} err={e}", BatchPhase::RolledBack, org.org_id());
                for s in sessions.iter_mut() {
                    s.clear_queues();
                }
                return Err(e);
            }
        };
        info!("process_batch:{} org_id={} events={events_dispatched} hooks={}",
              BatchPhase::Committed,
              org.org_id(),
              hooks_applied.len());

        let mut outcome = BatchOutcome { sessions: sessions.len(),
                                         events_dispatched,
                                         hooks_applied,
                                         ..Default::default() };
        self.run_post_commit(ctx, org, sessions, &mut outcome);
        Ok(outcome)
    }

    /// Chequeos previos a cualquier trabajo transaccional.
    fn validate(&self, org: &OrgAssets, sessions: &[Session]) -> Result<(), CoreError> {
        for s in sessions {
            if s.org_id != org.org_id() {
                return Err(CoreError::MixedOrgs { expected: org.org_id(),
                                                  found: s.org_id });
            }
            for e in s.events() {
                self.registry.lookup(e.event_type())?;
            }
        }
        Ok(())
    }

    fn dispatch_all(&self,
                    ctx: &CommitContext,
                    tx: &mut dyn BatchWrites,
                    cache: &dyn CachePool,
                    org: &OrgAssets,
                    sessions: &mut [Session])
                    -> Result<usize, CoreError> {
        let dispatcher = Dispatcher::new(self.registry);
        let mut count = 0;
        for session in sessions.iter_mut() {
            ensure_active(ctx, BatchPhase::Dispatching)?;
            let events = session.events().to_vec();
            for event in &events {
                dispatcher.dispatch(ctx, tx, cache, org, session, event)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Resuelve todos los hooks antes de aplicar el primero: un hook sin
    /// registrar no debe dejar aplicados a los demás.
    fn resolve<'g, 's>(&self,
                       grouping: &'g HookGrouping<'s>)
                       -> Result<Vec<(&'a dyn CommitHook, &'g [SessionEvents<'s>])>, CoreError> {
        grouping.iter()
                .map(|(id, sessions)| self.registry.hook(id).map(|h| (h, sessions)))
                .collect()
    }

    fn apply_hooks(&self,
                   ctx: &CommitContext,
                   tx: &mut dyn BatchWrites,
                   cache: &dyn CachePool,
                   org: &OrgAssets,
                   grouping: &HookGrouping<'_>)
                   -> Result<Vec<HookId>, CoreError> {
        let mut applied = Vec::with_capacity(grouping.len());
        for (hook, sessions) in self.resolve(grouping)? {
            ensure_active(ctx, BatchPhase::Committing)?;
            let id = hook.id();
            debug!("apply_hook:start hook={id} sessions={}", sessions.len());
            hook.apply(ctx, tx, cache, org, sessions)
                .map_err(|source| CoreError::Hook { hook: id, source })?;
            applied.push(id);
        }
        Ok(applied)
    }

    fn run_post_commit(&self, ctx: &CommitContext, org: &OrgAssets, sessions: &mut [Session], outcome: &mut BatchOutcome) {
        let queues: Vec<HookQueue> = sessions.iter_mut().map(Session::take_post_commit_events).collect();
        let grouping = group_by_hook(sessions, queues);
        if grouping.is_empty() {
            return;
        }
        let cache = self.backend.cache();
        let mut applied = Vec::new();
        let mut failures = Vec::new();
        let res = self.backend.transaction(|tx| {
                                  for (id, hook_sessions) in grouping.iter() {
                                      let result = self.registry
                                                       .hook(id)
                                                       .and_then(|hook| {
                                                           hook.apply(ctx, tx, cache, org, hook_sessions)
                                                               .map_err(|source| CoreError::Hook { hook: id, source })
                                                       });
                                      match result {
                                          Ok(()) => applied.push(id),
                                          Err(e) => {
                                              error!("post_commit:hook_failed hook={id} err={e}");
                                              failures.push((id, e.to_string()));
                                          }
                                      }
                                  }
                                  Ok(())
                              });
        if let Err(e) = res {
            error!("post_commit:transaction_failed err={e}");
            for id in grouping.hook_ids() {
                if !applied.contains(&id) && !failures.iter().any(|(f, _)| *f == id) {
                    failures.push((id, e.to_string()));
                }
            }
            applied.clear();
        }
        outcome.post_commit_hooks_applied = applied;
        outcome.post_commit_failures = failures;
    }
}

fn ensure_active(ctx: &CommitContext, phase: BatchPhase) -> Result<(), CoreError> {
    if ctx.is_cancelled() {
        return Err(CoreError::Cancelled { phase });
    }
    Ok(())
}
