//! Основной файл библиотеки slidecast-sync
//!
//! Библиотека превращает сценарий диалога двух ведущих с маркерами слайдов
//! в одну аудиодорожку и знает для каждого предложения, кто его произнес,
//! какой слайд был активен и когда оно звучит.
//!
//! ```text
//! текст -> разбор -> объединение -> синтез по одному -> склейка -> синхронизация
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod notification;
pub mod progress;
pub mod script;
pub mod tts;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub use crate::config::{EstimateConfig, RetryConfig, SlidecastConfig, TtsModel, VoiceBindings};
pub use crate::error::{FailureKind, Result, SlidecastError, SynthesisError};
pub use crate::media::{GeneratedAudio, PlaybackPosition, PlaybackSynchronizer, TimingBasis};
pub use crate::script::session::ScriptSession;
pub use crate::script::{Segment, Speaker, SpeakerBindings};
pub use crate::tts::{RenderedTrack, RunOutcome, SpeechProvider};

use crate::progress::{DefaultProgressReporter, ProcessStep, ProgressObserver, ProgressReporter, ProgressTracker};
use crate::tts::{OpenAiSpeechProvider, RenderCache, RenderFingerprint, Sequencer, SynthesisClient};

/// Основная структура для работы с библиотекой
pub struct SlidecastSync {
    config: SlidecastConfig,
    sequencer: Sequencer,
    progress_tracker: Option<ProgressTracker>,
    cache: Mutex<RenderCache>,
}

impl SlidecastSync {
    /// Создать экземпляр с произвольным провайдером речи
    pub fn new(config: SlidecastConfig, provider: Arc<dyn SpeechProvider>) -> Result<Self> {
        config.validate()?;
        let client = SynthesisClient::new(provider, config.retry.clone());
        let sequencer = Sequencer::new(client, config.pacing_delay(), config.sample_rate);
        Ok(Self {
            config,
            sequencer,
            progress_tracker: None,
            cache: Mutex::new(RenderCache::new()),
        })
    }

    /// Создать экземпляр с провайдером OpenAI
    pub fn with_openai(config: SlidecastConfig) -> Result<Self> {
        let provider = OpenAiSpeechProvider::from_config(&config)?;
        Self::new(config, Arc::new(provider))
    }

    /// Создать экземпляр с репортером прогресса
    pub fn with_progress_reporter(
        config: SlidecastConfig,
        provider: Arc<dyn SpeechProvider>,
        reporter: Box<dyn ProgressReporter>,
    ) -> Result<Self> {
        let mut sync = Self::new(config, provider)?;
        sync.progress_tracker = Some(ProgressTracker::with_reporter(reporter));
        Ok(sync)
    }

    /// Добавить наблюдателя прогресса
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let tracker = self
            .progress_tracker
            .get_or_insert_with(|| ProgressTracker::with_reporter(Box::new(DefaultProgressReporter::new())));
        // трекер всегда создается с репортером
        tracker.add_observer(observer).unwrap_or(0)
    }

    pub fn config(&self) -> &SlidecastConfig {
        &self.config
    }

    /// Сменить имена ведущих и голоса, например после импорта сессии
    pub fn apply_session(&mut self, session: &ScriptSession) -> Result<()> {
        session.bindings.validate()?;
        self.config.bindings = session.bindings.clone();
        self.config.voices = session.voices.clone();
        Ok(())
    }

    /// Сессия для экспорта текущего сценария
    pub fn session(&self, script: &str) -> ScriptSession {
        ScriptSession::new(script, self.config.bindings.clone(), self.config.voices.clone())
    }

    /// Разобрать сценарий с оценочными временами
    pub fn segment(&self, script: &str) -> Vec<Segment> {
        crate::script::parse_script(script, &self.config.bindings, &self.config.estimate)
    }

    /// Синхронизатор для сегментов с оценочными временами
    ///
    /// Если длительность реального аудио известна, время воспроизведения
    /// масштабируется к оценке.
    pub fn estimated_synchronizer<'a>(
        &self,
        segments: &'a [Segment],
        actual_duration: Option<f64>,
    ) -> PlaybackSynchronizer<'a> {
        PlaybackSynchronizer::new(segments, TimingBasis::Estimated, actual_duration)
    }

    pub fn fingerprint(&self, script: &str) -> RenderFingerprint {
        RenderFingerprint::compute(script, &self.config.bindings, &self.config.voices)
    }

    /// Озвучить сценарий целиком
    ///
    /// Если сценарий, имена и голоса не менялись с прошлого успешного
    /// запуска, возвращается закэшированная дорожка без запросов.
    pub async fn render(&self, script: &str) -> Result<RunOutcome> {
        let fingerprint = self.fingerprint(script);
        if let Some(track) = self.cache.lock().await.get(&fingerprint) {
            log::info!("Using cached track {}", fingerprint.as_str());
            return Ok(RunOutcome::Completed(track.clone()));
        }

        log::info!("Starting narration of {} characters", script.chars().count());
        let tracker = self.progress_tracker.as_ref();
        if let Some(t) = tracker {
            t.reset();
            t.update_step_progress(0.0, Some("Разбор сценария".to_string()));
        }

        let segments = self.segment(script);
        if let Some(t) = tracker {
            t.update_step_progress(100.0, Some(format!("Найдено предложений: {}", segments.len())));
        }

        let outcome = self.sequencer.run(&segments, &self.config.voices, tracker).await?;
        if let RunOutcome::Completed(track) = &outcome {
            self.cache.lock().await.store(fingerprint, track.clone());
        }
        Ok(outcome)
    }

    /// Отменить текущий запуск
    pub fn cancel(&self) {
        self.sequencer.generations().supersede();
    }

    /// Сохранить последнюю дорожку в каталог
    pub async fn persist_render(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        self.cache.lock().await.persist(dir.as_ref()).await
    }

    /// Загрузить ранее сохраненную дорожку для этого сценария
    pub async fn restore_render(&self, script: &str, dir: impl AsRef<Path>) -> Result<Option<RenderedTrack>> {
        let fingerprint = self.fingerprint(script);
        let mut cache = self.cache.lock().await;
        Ok(cache.load(dir.as_ref(), &fingerprint).await?.cloned())
    }

    /// Текущий этап, если прогресс отслеживается
    pub fn current_step(&self) -> Option<ProcessStep> {
        self.progress_tracker.as_ref().map(ProgressTracker::current_step)
    }
}
