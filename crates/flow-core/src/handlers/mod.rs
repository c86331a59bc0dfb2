//! Handlers de eventos y sus hooks de commit.
//!
//! Cada submódulo cubre un tipo de evento y expone `register`, que da de alta
//! su handler y, si difiere efectos, su hook. `register_all` es el único punto
//! que hay que tocar al agregar un tipo nuevo.
use crate::registry::RegistryBuilder;

pub mod contact_field_changed;
pub mod contact_groups_changed;
pub mod contact_language_changed;
pub mod contact_name_changed;
pub mod error;
pub mod input_labels_added;
pub mod msg_created;

pub use contact_field_changed::CommitFieldChanges;
pub use contact_groups_changed::CommitGroupChanges;
pub use contact_language_changed::CommitLanguageChanges;
pub use contact_name_changed::CommitNameChanges;
pub use msg_created::{CommitMessages, QueueMessages};

pub fn register_all(builder: &mut RegistryBuilder) {
    contact_name_changed::register(builder);
    contact_language_changed::register(builder);
    contact_field_changed::register(builder);
    contact_groups_changed::register(builder);
    msg_created::register(builder);
    input_labels_added::register(builder);
    error::register(builder);
}
