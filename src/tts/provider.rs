//! Контракт внешнего провайдера синтеза речи

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use crate::error::SynthesisError;
use crate::media::AudioFormat;

/// Запрос на синтез одной реплики одним голосом
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

/// Закодированное аудио из ответа провайдера
#[derive(Debug, Clone)]
pub struct SpeechPayload {
    pub bytes: Bytes,
    pub format: AudioFormat,
}

/// Категория ошибки провайдера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Квота или лимит запросов исчерпаны
    RateLimited,
    /// Сервис временно недоступен
    Unavailable,
    /// Вместо аудио пришел текст
    TextResponse,
    /// Ответ без аудио
    EmptyAudio,
    Other,
}

/// Ошибка провайдера
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for SynthesisError {
    fn from(err: ProviderError) -> Self {
        match err.kind {
            ProviderErrorKind::RateLimited => SynthesisError::RateLimited(err.message),
            ProviderErrorKind::Unavailable => SynthesisError::ProviderUnavailable(err.message),
            ProviderErrorKind::TextResponse => SynthesisError::UnexpectedTextResponse(err.message),
            ProviderErrorKind::EmptyAudio => SynthesisError::NoAudioReturned,
            ProviderErrorKind::Other => SynthesisError::Provider(err.message),
        }
    }
}

/// Внешний сервис синтеза речи
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Выполнить ровно один запрос синтеза
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechPayload, ProviderError>;

    /// Название для логов
    fn name(&self) -> &str {
        "speech-provider"
    }
}
