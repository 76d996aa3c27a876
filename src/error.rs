//! Модуль обработки ошибок библиотеки slidecast-sync
//!
//! Ошибки разделены на два уровня: [`SynthesisError`] описывает сбой одного
//! запроса синтеза, [`SlidecastError`] описывает сбой операции целиком.

use thiserror::Error;

/// Ошибка синтеза одного фрагмента речи
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// Провайдер сообщил о превышении квоты или лимита запросов
    #[error("rate limited by speech provider: {0}")]
    RateLimited(String),

    /// Провайдер временно недоступен
    #[error("speech provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Провайдер не вернул аудио
    #[error("speech provider returned no audio")]
    NoAudioReturned,

    /// Провайдер вернул текст вместо аудио
    #[error("speech provider returned text instead of audio: {0}")]
    UnexpectedTextResponse(String),

    /// Текст для синтеза пуст
    #[error("cannot synthesize empty text")]
    EmptyText,

    /// Полученные данные не удалось декодировать
    #[error("failed to decode provider audio: {0}")]
    Decode(String),

    /// Любая другая ошибка провайдера
    #[error("speech provider error: {0}")]
    Provider(String),

    /// Запуск устарел во время ожидания перед повтором
    #[error("synthesis abandoned: run was superseded")]
    Superseded,

    /// Исчерпан лимит повторных попыток
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SynthesisError>,
    },
}

impl SynthesisError {
    /// Имеет ли смысл повторить запрос после паузы
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ProviderUnavailable(_))
    }

    /// Вызвана ли ошибка (прямо или после исчерпания попыток) лимитом запросов
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::RetriesExhausted { last, .. } => last.is_rate_limited(),
            _ => false,
        }
    }
}

/// Категория сбоя, которую видит пользователь
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Превышена квота: уменьшить нагрузку или сменить ключ
    QuotaExceeded,
    /// Прочие сбои: повторить позже
    Generic,
}

/// Ошибки библиотеки slidecast-sync
#[derive(Debug, Error)]
pub enum SlidecastError {
    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка чтения или записи WAV
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ошибка синтеза одного из фрагментов
    #[error("speech synthesis failed for unit {unit}: {source}")]
    Synthesis {
        unit: usize,
        #[source]
        source: SynthesisError,
    },

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Неверный формат
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Классификация сбоя для пользователя
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Synthesis { source, .. } if source.is_rate_limited() => FailureKind::QuotaExceeded,
            _ => FailureKind::Generic,
        }
    }
}

impl From<&str> for SlidecastError {
    fn from(s: &str) -> Self {
        SlidecastError::Other(anyhow::anyhow!(s.to_string()))
    }
}

impl From<String> for SlidecastError {
    fn from(s: String) -> Self {
        SlidecastError::Other(anyhow::anyhow!(s))
    }
}

/// Тип Result для библиотеки slidecast-sync
pub type Result<T> = std::result::Result<T, SlidecastError>;
