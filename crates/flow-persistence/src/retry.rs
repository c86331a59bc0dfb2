//! Retry simple con backoff muy pequeño para un batch completo.
//!
//! Política:
//! - Intentos: hasta 3 reintentos tras el primer fallo.
//! - Backoff: 15ms, 30ms, 45ms.
//! - Logs: se emite `warn!` por intento.
//!
//! El core no reintenta nada; quien llama envuelve `process_batch` completo.

use std::time::Duration;

use log::warn;

use flow_core::CoreError;

use crate::error::PersistenceError;

const MAX_RETRIES: u32 = 3;

/// Errores que saben si vale la pena repetir la unidad de trabajo.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for CoreError {
    fn is_retryable(&self) -> bool {
        CoreError::is_retryable(self)
    }
}

impl Retryable for PersistenceError {
    fn is_retryable(&self) -> bool {
        PersistenceError::is_retryable(self)
    }
}

pub fn with_retry<F, T, E>(mut f: F) -> Result<T, E>
    where F: FnMut() -> Result<T, E>,
          E: Retryable + std::fmt::Display
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < MAX_RETRIES => {
                let delay_ms = 15 * u64::from(attempts + 1);
                warn!("retryable error (attempt {}): {e} -> sleeping {delay_ms}ms", attempts + 1);
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}
