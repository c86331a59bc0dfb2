//! Batches en JSON: un array de sesiones, cada una con sus eventos del turno.
//!
//! ```json
//! [{"id": 1, "org_id": 1, "contact_id": 10, "contact_uuid": "...",
//!   "events": [{"uuid": "...", "created_on": "...", "type": "contact_name_changed", "name": "Ann"}]}]
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flow_core::Session;
use log::debug;

use crate::errors::RuntimeError;

pub fn parse_sessions(raw: &str) -> Result<Vec<Session>, RuntimeError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_sessions(path: &Path) -> Result<Vec<Session>, RuntimeError> {
    let reader = BufReader::new(File::open(path)?);
    let sessions: Vec<Session> = serde_json::from_reader(reader)?;
    debug!("load_sessions:done path={} sessions={}", path.display(), sessions.len());
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{EventType, SessionId};

    #[test]
    fn parses_sessions_with_and_without_events() {
        let raw = r#"[
            {"id": 1, "org_id": 1, "contact_id": 10, "contact_uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d01",
             "events": [
                {"uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d02", "created_on": "2024-05-02T10:00:00Z",
                 "type": "contact_name_changed", "name": "Ann"},
                {"uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d03", "created_on": "2024-05-02T10:00:01Z",
                 "type": "msg_created", "msg": {"uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d04", "text": "hola"}}
             ]},
            {"id": 2, "org_id": 1, "contact_id": 20, "contact_uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d05"}
        ]"#;
        let sessions = parse_sessions(raw).expect("valid batch");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, SessionId(1));
        let types: Vec<_> = sessions[0].events().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec![EventType::ContactNameChanged, EventType::MsgCreated]);
        assert!(sessions[1].events().is_empty());
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let raw = r#"[{"id": 1, "org_id": 1, "contact_id": 10, "contact_uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d01",
                       "events": [{"uuid": "5f1d2c1e-8d6e-4a34-9d0b-6a7f1b2c3d02", "created_on": "2024-05-02T10:00:00Z",
                                   "type": "contact_urns_changed"}]}]"#;
        assert!(matches!(parse_sessions(raw), Err(RuntimeError::BatchFile(_))));
    }
}
