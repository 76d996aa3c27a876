//! Модуль для кэширования готовой дорожки
//!
//! Дорожка действительна, пока не изменились текст сценария, имена ведущих
//! и выбранные голоса. Отпечаток этих входных данных (md5) служит ключом
//! как в памяти, так и на диске (`<ключ>.wav` + `<ключ>.json`).

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::config::VoiceBindings;
use crate::error::{Result, SlidecastError};
use crate::media::pcm;
use crate::script::{Segment, SpeakerBindings};
use crate::tts::sequencer::RenderedTrack;

/// Отпечаток входных данных озвучивания
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderFingerprint(String);

impl RenderFingerprint {
    pub fn compute(script: &str, bindings: &SpeakerBindings, voices: &VoiceBindings) -> Self {
        let mut hasher = md5::Context::new();
        for part in [
            script,
            bindings.primary_name.as_str(),
            bindings.secondary_name.as_str(),
            voices.primary.as_str(),
            voices.secondary.as_str(),
        ] {
            hasher.consume(part.as_bytes());
            // разделитель, чтобы "ab"+"c" и "a"+"bc" не совпадали
            hasher.consume([0u8]);
        }
        Self(format!("{:x}", hasher.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Таймлайн, сохраняемый рядом с WAV
#[derive(Debug, Serialize, Deserialize)]
struct CachedTimeline {
    fingerprint: RenderFingerprint,
    units: usize,
    segments: Vec<Segment>,
}

/// Кэш последней готовой дорожки
#[derive(Debug, Default)]
pub struct RenderCache {
    entry: Option<(RenderFingerprint, RenderedTrack)>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Дорожка для отпечатка; при несовпадении кэш сбрасывается
    pub fn get(&mut self, fingerprint: &RenderFingerprint) -> Option<&RenderedTrack> {
        if matches!(&self.entry, Some((key, _)) if key != fingerprint) {
            log::debug!("Render inputs changed, invalidating cached track");
            self.invalidate();
        }
        self.entry.as_ref().map(|(_, track)| track)
    }

    pub fn store(&mut self, fingerprint: RenderFingerprint, track: RenderedTrack) {
        self.entry = Some((fingerprint, track));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Записать дорожку на диск; возвращает путь к WAV
    pub async fn persist(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some((fingerprint, track)) = &self.entry else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(dir).await?;
        let (wav_path, json_path) = paths(dir, fingerprint);
        let timeline = CachedTimeline {
            fingerprint: fingerprint.clone(),
            units: track.units,
            segments: track.segments.clone(),
        };
        tokio::fs::write(&json_path, serde_json::to_vec_pretty(&timeline)?).await?;
        track.save_wav(&wav_path).await?;

        log::info!("Persisted rendered track to {}", wav_path.display());
        Ok(Some(wav_path))
    }

    /// Загрузить ранее сохраненную дорожку и поместить ее в кэш
    ///
    /// `Ok(None)`, если для отпечатка ничего не сохранено.
    pub async fn load(&mut self, dir: &Path, fingerprint: &RenderFingerprint) -> Result<Option<&RenderedTrack>> {
        let (wav_path, json_path) = paths(dir, fingerprint);
        if !tokio::fs::try_exists(&wav_path).await? || !tokio::fs::try_exists(&json_path).await? {
            return Ok(None);
        }

        let timeline: CachedTimeline = serde_json::from_slice(&tokio::fs::read(&json_path).await?)?;
        if &timeline.fingerprint != fingerprint {
            return Err(SlidecastError::InvalidFormat(format!(
                "cached timeline {} belongs to another render",
                json_path.display()
            )));
        }
        let audio = pcm::decode_wav(&tokio::fs::read(&wav_path).await?)?;

        log::info!("Loaded cached track from {}", wav_path.display());
        self.store(
            fingerprint.clone(),
            RenderedTrack {
                audio,
                segments: timeline.segments,
                units: timeline.units,
            },
        );
        Ok(self.entry.as_ref().map(|(_, track)| track))
    }
}

fn paths(dir: &Path, fingerprint: &RenderFingerprint) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}.wav", fingerprint.as_str())),
        dir.join(format!("{}.json", fingerprint.as_str())),
    )
}
