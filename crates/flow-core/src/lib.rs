//! flow-core: pipeline de commit por eventos.
//!
//! Cada sesión de flujo produce eventos tipados durante un turno. Al final del
//! turno el `BatchCommitter`:
//! - despacha cada evento a su handler registrado (efecto inmediato o diferido),
//! - agrupa los eventos diferidos de todas las sesiones por hook,
//! - ejecuta cada hook una sola vez dentro de una única transacción.
//!
//! El crate no conoce ningún motor de base de datos: los efectos pasan por los
//! traits de `store` (`BatchWrites`, `CachePool`, `Backend`). La implementación
//! Postgres vive en `flow-persistence`; aquí sólo existe el backend en memoria.
pub mod assets;
pub mod batch;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod event;
pub mod handlers;
pub mod hook;
pub mod registry;
pub mod session;
pub mod store;

pub use assets::{FieldAsset, GroupAsset, GroupId, LabelAsset, LabelId, OrgAssets};
pub use batch::{BatchCommitter, BatchOutcome, BatchPhase};
pub use context::CommitContext;
pub use dispatch::Dispatcher;
pub use errors::{CoreError, EffectError, StoreError};
pub use event::{Event, EventKind, EventType};
pub use hook::{group_by_hook, CommitHook, HookGrouping, HookId, SessionEvents};
pub use registry::{HandlerRegistry, RegistryBuilder};
pub use session::{ContactId, OrgId, Session, SessionId};
pub use store::{Backend, BatchWrites, CachePool, InMemoryBackend, InMemoryCache};
