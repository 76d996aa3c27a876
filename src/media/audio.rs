//! Модуль для работы с аудио
//!
//! Этот модуль содержит буфер сгенерированного аудио и склейку фрагментов.

use std::ops::Range;
use crate::error::{Result, SlidecastError};

/// Аудио, полученное от провайдера или собранное из фрагментов
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    /// Сэмплы PCM (f32, диапазон [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Частота дискретизации
    pub sample_rate: u32,
    /// Количество каналов
    pub channels: u16,
}

impl GeneratedAudio {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Количество кадров (сэмплов на канал)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Длительность в секундах
    pub fn duration(&self) -> f64 {
        duration_in_seconds(self.frames(), self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Длительность по количеству сэмплов и частоте дискретизации
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    sample_count as f64 / sample_rate as f64
}

/// Склеивает моно-фрагменты одной частоты подряд, без пауз и кроссфейда
///
/// Возвращает итоговый буфер и диапазон сэмплов каждого фрагмента в нем.
pub fn concatenate(fragments: Vec<GeneratedAudio>) -> Result<(GeneratedAudio, Vec<Range<usize>>)> {
    let Some(first) = fragments.first() else {
        return Err(SlidecastError::AudioProcessing("nothing to concatenate".to_string()));
    };
    let sample_rate = first.sample_rate;

    for (i, fragment) in fragments.iter().enumerate() {
        if fragment.channels != 1 {
            return Err(SlidecastError::AudioProcessing(format!(
                "fragment {} has {} channels, expected mono",
                i, fragment.channels
            )));
        }
        if fragment.sample_rate != sample_rate {
            return Err(SlidecastError::AudioProcessing(format!(
                "fragment {} has sample rate {} Hz, expected {} Hz",
                i, fragment.sample_rate, sample_rate
            )));
        }
    }

    let total: usize = fragments.iter().map(|f| f.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    let mut ranges = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let start = samples.len();
        samples.extend_from_slice(&fragment.samples);
        ranges.push(start..samples.len());
    }

    log::debug!(
        "Concatenated {} fragments into {} samples ({:.3}s)",
        ranges.len(),
        samples.len(),
        duration_in_seconds(samples.len(), sample_rate)
    );
    Ok((GeneratedAudio::mono(samples, sample_rate), ranges))
}
