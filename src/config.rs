//! Модуль конфигурации библиотеки slidecast-sync
//!
//! Этот модуль содержит структуры и перечисления для настройки библиотеки.

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SlidecastError};
use crate::script::{Speaker, SpeakerBindings};

/// Модель TTS для использования с OpenAI-совместимым API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TtsModel {
    /// Стандартная модель
    #[default]
    Standard,
    /// Модель высокого качества
    HighDefinition,
    /// Произвольное имя модели
    Custom(String),
}

impl TtsModel {
    /// Получить строковое представление модели
    pub fn as_str(&self) -> &str {
        match self {
            Self::Standard => "tts-1",
            Self::HighDefinition => "tts-1-hd",
            Self::Custom(name) => name,
        }
    }
}

/// Голоса провайдера для каждой из двух ролей
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceBindings {
    pub primary: String,
    pub secondary: String,
}

impl Default for VoiceBindings {
    fn default() -> Self {
        Self {
            primary: "nova".to_string(),
            secondary: "onyx".to_string(),
        }
    }
}

impl VoiceBindings {
    /// Голос для роли
    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Primary => &self.primary,
            Speaker::Secondary => &self.secondary,
        }
    }
}

/// Политика повторных запросов к провайдеру
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Максимальное количество попыток на один фрагмент
    pub max_attempts: u32,
    /// Базовая задержка, удваивается с каждой попыткой
    pub base_delay_ms: u64,
    /// Верхняя граница случайной добавки к задержке
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Задержка перед повтором без случайной добавки
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Параметры оценки длительности реплики до синтеза
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EstimateConfig {
    /// Минимальная длительность одного предложения в секундах
    pub min_segment_seconds: f64,
    /// Скорость чтения, символов в секунду
    pub chars_per_second: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            min_segment_seconds: 1.5,
            chars_per_second: 13.0,
        }
    }
}

impl EstimateConfig {
    /// Оценка длительности текста
    pub fn estimate(&self, text: &str) -> f64 {
        let chars = text.chars().count() as f64;
        (chars / self.chars_per_second).max(self.min_segment_seconds)
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidecastConfig {
    /// API ключ провайдера речи
    pub api_key: String,
    /// Базовый URL OpenAI-совместимого API
    pub base_url: String,
    /// Модель TTS
    pub tts_model: TtsModel,
    /// Голоса для ролей
    pub voices: VoiceBindings,
    /// Имена ведущих в тексте сценария
    pub bindings: SpeakerBindings,
    /// Повторные попытки
    pub retry: RetryConfig,
    /// Пауза между последовательными запросами синтеза
    pub pacing_delay_ms: u64,
    /// Оценка длительности до синтеза
    pub estimate: EstimateConfig,
    /// Частота дискретизации провайдера
    pub sample_rate: u32,
    /// Таймаут одного HTTP запроса
    pub request_timeout_secs: u64,
}

impl Default for SlidecastConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            tts_model: TtsModel::default(),
            voices: VoiceBindings::default(),
            bindings: SpeakerBindings::default(),
            retry: RetryConfig::default(),
            pacing_delay_ms: 1000,
            estimate: EstimateConfig::default(),
            sample_rate: 24_000,
            request_timeout_secs: 60,
        }
    }
}

impl SlidecastConfig {
    /// Загрузить конфигурацию из JSON, недостающие поля берутся по умолчанию
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Пауза между запросами
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Проверить согласованность настроек
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(SlidecastError::Configuration("retry.max_attempts must be at least 1".to_string()));
        }
        if !(self.estimate.chars_per_second > 0.0) {
            return Err(SlidecastError::Configuration("estimate.chars_per_second must be positive".to_string()));
        }
        if !(self.estimate.min_segment_seconds > 0.0) {
            return Err(SlidecastError::Configuration("estimate.min_segment_seconds must be positive".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(SlidecastError::Configuration("sample_rate must be positive".to_string()));
        }
        if self.voices.primary.trim().is_empty() || self.voices.secondary.trim().is_empty() {
            return Err(SlidecastError::Configuration("both speaker voices must be set".to_string()));
        }
        self.bindings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(0), Duration::from_secs(1));
        assert_eq!(retry.backoff(1), Duration::from_secs(2));
        assert_eq!(retry.backoff(3), Duration::from_secs(8));
        assert_eq!(retry.backoff(9), Duration::from_secs(512));
    }

    #[test]
    fn test_estimate_floor() {
        let estimate = EstimateConfig::default();
        assert_eq!(estimate.estimate("Hi."), 1.5);
        let long = "a".repeat(130);
        assert!((estimate.estimate(&long) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SlidecastConfig::from_json_str(r#"{"api_key": "sk-test", "pacing_delay_ms": 250}"#).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.pacing_delay(), Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.sample_rate, 24_000);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = SlidecastConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(SlidecastError::Configuration(_))));
    }
}
