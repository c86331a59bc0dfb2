//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` / `REDIS_URL` y parámetros opcionales de pool.

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

fn required(key: &str) -> Result<String, PersistenceError> {
    env::var(key).map_err(|_| PersistenceError::Config(format!("{key} no definido")))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        Ok(Self { url: required("DATABASE_URL")?,
                  min_connections: parsed_or("DATABASE_MIN_CONNECTIONS", 2),
                  max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 16) })
    }
}

/// Configuración del store clave-valor (cola de mensajes).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub max_connections: u32,
    /// Prefijo de las claves de cola: `{prefix}:{org_id}`.
    pub queue_prefix: String,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        Ok(Self { url: required("REDIS_URL")?,
                  max_connections: parsed_or("REDIS_MAX_CONNECTIONS", 8),
                  queue_prefix: env::var("MSG_QUEUE_PREFIX").unwrap_or_else(|_| "msgs".to_string()) })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_or_falls_back_on_garbage() {
        env::set_var("FLOW_TEST_POOL_SIZE", "not-a-number");
        assert_eq!(parsed_or("FLOW_TEST_POOL_SIZE", 7u32), 7);
        env::set_var("FLOW_TEST_POOL_SIZE", "3");
        assert_eq!(parsed_or("FLOW_TEST_POOL_SIZE", 7u32), 3);
    }

    #[test]
    fn missing_required_value_is_a_config_error() {
        let err = required("FLOW_TEST_SURELY_UNSET_VAR").expect_err("unset");
        assert!(matches!(err, PersistenceError::Config(ref m) if m.contains("FLOW_TEST_SURELY_UNSET_VAR")));
    }
}
