//! flowcommit
//!
//! Punto de entrada de la aplicación: arma el registro estándar de handlers,
//! el backend Postgres y la cola Redis, y procesa batches de sesiones.
//!
//! - `runtime`: `Runtime`, que carga los assets de la org y corre el batch con
//!   reintento de batch completo.
//! - `batch_file`: lectura de batches en JSON (lo que consume `flow-cli`).
//! - `errors`: `RuntimeError`.

pub mod batch_file;
pub mod errors;
pub mod runtime;

pub use batch_file::{load_sessions, parse_sessions};
pub use errors::RuntimeError;
pub use runtime::Runtime;

pub use flow_core as core;
pub use flow_persistence as persistence;
