//! Клиент синтеза с повторными попытками
//!
//! Один вызов [`SynthesisClient::synthesize`] синтезирует одну реплику. Временные
//! ошибки (лимит запросов, недоступность сервиса) повторяются с
//! экспоненциальной задержкой и случайной добавкой, остальные сразу
//! возвращаются вызывающему. Если передан билет запуска и запуск устарел
//! за время паузы, новых запросов не будет.

use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use crate::config::RetryConfig;
use crate::error::SynthesisError;
use crate::media::{DecoderPool, GeneratedAudio};
use crate::tts::provider::{SpeechProvider, SpeechRequest};
use crate::tts::sequencer::GenerationTicket;

/// Результат синтеза одной реплики
#[derive(Debug, Clone)]
pub struct SynthesizedUnit {
    pub audio: GeneratedAudio,
    /// Точная длительность в секундах
    pub duration: f64,
    /// Сколько запросов понадобилось
    pub attempts: u32,
}

/// Обертка над провайдером с политикой повторов
#[derive(Clone)]
pub struct SynthesisClient {
    provider: Arc<dyn SpeechProvider>,
    retry: RetryConfig,
    decoders: DecoderPool,
}

impl SynthesisClient {
    pub fn new(provider: Arc<dyn SpeechProvider>, retry: RetryConfig) -> Self {
        Self {
            provider,
            retry,
            decoders: DecoderPool::new(),
        }
    }

    pub fn decoders(&self) -> &DecoderPool {
        &self.decoders
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Синтезировать текст выбранным голосом
    ///
    /// Билет проверяется после каждой паузы перед повтором.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        ticket: Option<&GenerationTicket>,
    ) -> Result<SynthesizedUnit, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let request = SpeechRequest {
            text: text.to_string(),
            voice: voice.to_string(),
        };
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            log::debug!(
                "Synthesis attempt {}/{} via {} ({} chars, voice {})",
                attempts,
                max_attempts,
                self.provider.name(),
                request.text.chars().count(),
                request.voice
            );

            match self.attempt(&request).await {
                Ok(audio) => {
                    let duration = audio.duration();
                    return Ok(SynthesizedUnit { audio, duration, attempts });
                }
                Err(err) if err.is_transient() => {
                    if attempts >= max_attempts {
                        log::error!("Synthesis failed after {} attempts: {}", attempts, err);
                        return Err(SynthesisError::RetriesExhausted {
                            attempts,
                            last: Box::new(err),
                        });
                    }
                    let delay = self.retry_delay(attempts - 1);
                    log::warn!("Transient synthesis error ({}), retrying in {:?}", err, delay);
                    tokio::time::sleep(delay).await;
                    if let Some(stale) = ticket.filter(|t| !t.is_current()) {
                        log::info!("Run #{} superseded during backoff, stopping retries", stale.id());
                        return Err(SynthesisError::Superseded);
                    }
                }
                Err(err) => {
                    log::error!("Synthesis failed: {}", err);
                    return Err(err);
                }
            }
        }
    }

    /// Одна попытка; контекст декодирования живет ровно до ее конца
    async fn attempt(&self, request: &SpeechRequest) -> Result<GeneratedAudio, SynthesisError> {
        let mut context = self.decoders.acquire();
        let payload = self.provider.synthesize(request).await?;
        let audio = context.decode(&payload.bytes, payload.format)?;
        if audio.is_empty() {
            return Err(SynthesisError::NoAudioReturned);
        }
        Ok(audio)
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.retry.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.retry.max_jitter_ms)
        } else {
            0
        };
        self.retry.backoff(attempt) + Duration::from_millis(jitter)
    }
}
