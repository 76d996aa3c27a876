//! Модуль для синхронизации воспроизведения со слайдами
//!
//! По текущему времени воспроизведения находит активный сегмент и его слайд.

use crate::script::{total_duration, Segment};

/// Происхождение времен сегментов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingBasis {
    /// Оценка по длине текста, до синтеза
    Estimated,
    /// Точные времена по реальному аудио
    Exact,
}

/// Активная позиция воспроизведения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub index: usize,
    pub slide_index: usize,
}

/// Поиск сегмента по времени без коррекции
///
/// `None` до начала воспроизведения; после конца возвращается последний сегмент.
pub fn locate(t: f64, segments: &[Segment]) -> Option<PlaybackPosition> {
    let first = segments.first()?;
    if t.is_nan() || t < 0.0 || t < first.start_time {
        return None;
    }
    // number of segments that start at or before t
    let started = segments.partition_point(|s| s.start_time <= t);
    let mut index = started.saturating_sub(1);
    let last = segments.len() - 1;
    if t >= segments[last].end_time {
        index = last;
    }
    Some(PlaybackPosition {
        index,
        slide_index: segments[index].slide_index,
    })
}

/// Синхронизатор воспроизведения
///
/// Если времена сегментов оценочные, а длительность реального аудио
/// известна и отличается от суммы оценок, время воспроизведения линейно
/// масштабируется: `t * estimated_total / actual_duration`. Это
/// приближение: оно сохраняет плавность интерфейса, но не точность.
#[derive(Debug, Clone)]
pub struct PlaybackSynchronizer<'a> {
    segments: &'a [Segment],
    scale: f64,
}

impl<'a> PlaybackSynchronizer<'a> {
    pub fn new(segments: &'a [Segment], basis: TimingBasis, actual_duration: Option<f64>) -> Self {
        let estimated_total = total_duration(segments);
        let scale = match (basis, actual_duration) {
            (TimingBasis::Estimated, Some(actual))
                if actual > 0.0 && estimated_total > 0.0 && (actual - estimated_total).abs() > f64::EPSILON =>
            {
                estimated_total / actual
            }
            _ => 1.0,
        };
        Self { segments, scale }
    }

    /// Коэффициент, на который умножается время воспроизведения
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position_at(&self, t: f64) -> Option<PlaybackPosition> {
        locate(t * self.scale, self.segments)
    }
}
