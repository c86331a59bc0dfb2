//! Wrapper para correr migraciones embebidas.
//!
//! Las migraciones viven en `migrations/` de este crate. Al construir el pool
//! se ejecutan una vez; `flow-cli migrate` las corre de forma explícita.

use crate::error::PersistenceError;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Corre las migraciones pendientes y devuelve cuántas se aplicaron.
pub fn run_pending_migrations(conn: &mut PgConnection) -> Result<usize, PersistenceError> {
    let applied = conn.run_pending_migrations(MIGRATIONS)
                      .map_err(|e| PersistenceError::Unknown(format!("migration error: {e}")))?;
    if !applied.is_empty() {
        info!("migrations:applied count={}", applied.len());
    }
    Ok(applied.len())
}
