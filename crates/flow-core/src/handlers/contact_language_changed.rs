//! `contact_language_changed`
use std::collections::BTreeMap;

use log::debug;

use crate::assets::OrgAssets;
use crate::context::CommitContext;
use crate::errors::EffectError;
use crate::event::{Event, EventKind, EventType};
use crate::hook::{payloads, CommitHook, HookId, SessionEvents};
use crate::registry::RegistryBuilder;
use crate::session::Session;
use crate::store::{BatchWrites, CachePool, LanguageUpdate};

pub fn register(builder: &mut RegistryBuilder) {
    builder.register(EventType::ContactLanguageChanged, apply_contact_language_changed);
    builder.register_hook(CommitLanguageChanges);
}

/// Reducción: last write wins por sesión. Idioma vacío deja al contacto sin
/// idioma.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitLanguageChanges;

impl CommitHook for CommitLanguageChanges {
    fn id(&self) -> HookId {
        HookId::CommitLanguageChanges
    }

    fn apply(&self,
             _ctx: &CommitContext,
             tx: &mut dyn BatchWrites,
             _cache: &dyn CachePool,
             _org: &OrgAssets,
             sessions: &[SessionEvents<'_>])
             -> Result<(), EffectError> {
        // sesiones que comparten contacto: gana la última
        let mut latest = BTreeMap::new();
        for s in sessions {
            let langs = payloads(&s.events, EventType::ContactLanguageChanged, |k| match k {
                EventKind::ContactLanguageChanged { language } => Some(language),
                _ => None,
            })?;
            if let Some(last) = langs.last() {
                let language = if last.is_empty() { None } else { Some((*last).clone()) };
                latest.insert(s.session.contact_id, language);
            }
        }
        let updates: Vec<LanguageUpdate> = latest.into_iter()
                                                 .map(|(contact_id, language)| LanguageUpdate { contact_id, language })
                                                 .collect();
        if updates.is_empty() {
            return Ok(());
        }
        let rows = tx.update_contact_languages(&updates)?;
        debug!("commit_language_changes:done contacts={} rows={rows}", updates.len());
        Ok(())
    }
}

fn apply_contact_language_changed(_ctx: &CommitContext,
                                  _tx: &mut dyn BatchWrites,
                                  _cache: &dyn CachePool,
                                  _org: &OrgAssets,
                                  session: &mut Session,
                                  event: &Event)
                                  -> Result<(), EffectError> {
    let EventKind::ContactLanguageChanged { language } = &event.kind else {
        return Err(EffectError::UnexpectedPayload { expected: EventType::ContactLanguageChanged,
                                                    found: event.event_type() });
    };
    if !language.is_empty() && language.chars().count() != 3 {
        return Err(EffectError::Invalid(format!("language must be an ISO 639-3 code, got {language:?}")));
    }
    debug!("changing contact language contact_uuid={} session_id={} language={language}",
           session.contact_uuid,
           session.id);
    session.add_pre_commit_event(HookId::CommitLanguageChanges, event.clone());
    Ok(())
}
