//! Модуль для работы со сценарием
//!
//! Сценарий представляет собой текст с маркерами слайдов `[SLIDE n]` и строками вида
//! `Имя: реплика`. Из него строится упорядоченная последовательность
//! [`Segment`], по одному на предложение.

pub mod lexer;
pub mod merger;
pub mod parser;
pub mod session;

use serde::{Deserialize, Serialize};
use crate::error::{Result, SlidecastError};

pub use merger::{merge_segments, MergedSegment};
pub use parser::{parse_script, ScriptParser, Segments};

/// Ключевые слова ролей, которые распознаются всегда
pub const PRIMARY_KEYWORD: &str = "Primary";
pub const SECONDARY_KEYWORD: &str = "Secondary";

/// Роль говорящего
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    Primary,
    Secondary,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_KEYWORD,
            Self::Secondary => SECONDARY_KEYWORD,
        }
    }
}

/// Отображаемые имена, привязанные к ролям
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerBindings {
    pub primary_name: String,
    pub secondary_name: String,
}

impl Default for SpeakerBindings {
    fn default() -> Self {
        Self::new("Host", "Expert")
    }
}

impl SpeakerBindings {
    pub fn new(primary_name: impl Into<String>, secondary_name: impl Into<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            secondary_name: secondary_name.into(),
        }
    }

    /// Найти роль по метке из текста (без учета регистра)
    pub fn resolve(&self, label: &str) -> Option<Speaker> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        if label.eq_ignore_ascii_case(PRIMARY_KEYWORD) || label.to_lowercase() == self.primary_name.trim().to_lowercase() {
            Some(Speaker::Primary)
        } else if label.eq_ignore_ascii_case(SECONDARY_KEYWORD)
            || label.to_lowercase() == self.secondary_name.trim().to_lowercase()
        {
            Some(Speaker::Secondary)
        } else {
            None
        }
    }

    /// Отображаемое имя роли
    pub fn name_of(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Primary => &self.primary_name,
            Speaker::Secondary => &self.secondary_name,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let primary = self.primary_name.trim();
        let secondary = self.secondary_name.trim();
        if primary.is_empty() || secondary.is_empty() {
            return Err(SlidecastError::Configuration("speaker names must not be empty".to_string()));
        }
        if primary.to_lowercase() == secondary.to_lowercase() {
            return Err(SlidecastError::Configuration(format!(
                "both speakers are bound to the same name: {}",
                primary
            )));
        }
        // имя одной роли не может совпадать с ключевым словом другой
        if primary.eq_ignore_ascii_case(SECONDARY_KEYWORD) || secondary.eq_ignore_ascii_case(PRIMARY_KEYWORD) {
            return Err(SlidecastError::Configuration(format!(
                "speaker name collides with the other role's keyword: {} / {}",
                primary, secondary
            )));
        }
        Ok(())
    }
}

/// Одно предложение сценария с привязкой к роли, слайду и времени
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Непрозрачный идентификатор
    pub id: String,
    /// Индекс слайда, начиная с нуля
    pub slide_index: usize,
    pub speaker: Speaker,
    pub text: String,
    /// Начало в секундах
    pub start_time: f64,
    /// Конец в секундах
    pub end_time: f64,
}

impl Segment {
    pub fn new(slide_index: usize, speaker: Speaker, text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slide_index,
            speaker,
            text: text.into(),
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Попадает ли момент времени в полуинтервал [start, end)
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

/// Суммарная длительность последовательности (конец последнего сегмента)
pub fn total_duration(segments: &[Segment]) -> f64 {
    segments.last().map(|s| s.end_time).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_labels() {
        let bindings = SpeakerBindings::new("Host", "Expert");
        assert_eq!(bindings.resolve("Host"), Some(Speaker::Primary));
        assert_eq!(bindings.resolve("host "), Some(Speaker::Primary));
        assert_eq!(bindings.resolve("EXPERT"), Some(Speaker::Secondary));
        assert_eq!(bindings.resolve("primary"), Some(Speaker::Primary));
        assert_eq!(bindings.resolve("Secondary"), Some(Speaker::Secondary));
        assert_eq!(bindings.resolve("Guest"), None);
        assert_eq!(bindings.resolve(""), None);
    }

    #[test]
    fn test_bindings_validation() {
        assert!(SpeakerBindings::new("Анна", "Борис").validate().is_ok());
        assert!(SpeakerBindings::new("Host", "host").validate().is_err());
        assert!(SpeakerBindings::new("Host", "  ").validate().is_err());
        assert!(SpeakerBindings::new("Secondary", "Expert").validate().is_err());
        assert!(SpeakerBindings::new("Host", "PRIMARY").validate().is_err());
        assert!(SpeakerBindings::new("Primary", "Secondary").validate().is_ok());
    }
}
