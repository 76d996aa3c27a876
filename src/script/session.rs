//! Экспорт и импорт сессии сценария
//!
//! Сессия хранит текст сценария, имена ролей и выбор голосов. Для ядра это
//! просто входные данные разборщика.

use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::config::VoiceBindings;
use crate::error::{Result, SlidecastError};
use crate::script::SpeakerBindings;

/// Текущая версия формата
pub const SESSION_VERSION: u32 = 1;

/// Сохраняемая сессия сценария
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSession {
    pub version: u32,
    pub script: String,
    pub bindings: SpeakerBindings,
    #[serde(default)]
    pub voices: VoiceBindings,
    pub exported_at: DateTime<Utc>,
}

impl ScriptSession {
    pub fn new(script: impl Into<String>, bindings: SpeakerBindings, voices: VoiceBindings) -> Self {
        Self {
            version: SESSION_VERSION,
            script: script.into(),
            bindings,
            voices,
            exported_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(json)?;
        if session.version > SESSION_VERSION {
            return Err(SlidecastError::InvalidFormat(format!(
                "session version {} is newer than supported version {}",
                session.version, SESSION_VERSION
            )));
        }
        session.bindings.validate()?;
        Ok(session)
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), self.to_json()?).await?;
        log::info!("Saved script session to {}", path.as_ref().display());
        Ok(())
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }
}
