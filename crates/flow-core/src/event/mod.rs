//! Eventos emitidos por las sesiones.

mod types;

pub use types::{Event, EventKind, EventType, FieldRef, GroupRef, LabelRef, MsgOut};
