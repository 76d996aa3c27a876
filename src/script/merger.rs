//! Модуль для объединения соседних сегментов перед синтезом
//!
//! Подряд идущие сегменты одного говорящего на одном слайде склеиваются в
//! один запрос к провайдеру. Это жадный однопроходный алгоритм: он не ищет
//! глобально оптимального разбиения, а лишь сокращает число запросов.

use std::ops::Range;
use crate::script::{Segment, Speaker};

/// Группа соседних сегментов, синтезируемая одним запросом
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSegment {
    pub slide_index: usize,
    pub speaker: Speaker,
    /// Тексты участников через пробел
    pub text: String,
    /// Индексы исходных сегментов
    pub members: Range<usize>,
    /// Длина текста каждого участника в символах
    pub weights: Vec<usize>,
    /// Начало первого участника по оценке
    pub start_time: f64,
    /// Конец последнего участника по оценке
    pub end_time: f64,
}

impl MergedSegment {
    fn start(index: usize, segment: &Segment) -> Self {
        Self {
            slide_index: segment.slide_index,
            speaker: segment.speaker,
            text: segment.text.clone(),
            members: index..index + 1,
            weights: vec![segment.text.chars().count()],
            start_time: segment.start_time,
            end_time: segment.end_time,
        }
    }

    fn accepts(&self, segment: &Segment) -> bool {
        self.speaker == segment.speaker && self.slide_index == segment.slide_index
    }

    fn absorb(&mut self, segment: &Segment) {
        self.text.push(' ');
        self.text.push_str(&segment.text);
        self.members.end += 1;
        self.weights.push(segment.text.chars().count());
        self.end_time = segment.end_time;
    }

    /// Представить группу как обычный сегмент
    pub fn to_segment(&self) -> Segment {
        Segment::new(self.slide_index, self.speaker, self.text.clone(), self.start_time, self.end_time)
    }
}

/// Объединить сегменты
pub fn merge_segments(segments: &[Segment]) -> Vec<MergedSegment> {
    let mut merged: Vec<MergedSegment> = Vec::new();
    let mut running: Option<MergedSegment> = None;

    for (index, segment) in segments.iter().enumerate() {
        if let Some(current) = running.as_mut() {
            if current.accepts(segment) {
                current.absorb(segment);
                continue;
            }
        }
        if let Some(done) = running.replace(MergedSegment::start(index, segment)) {
            merged.push(done);
        }
    }
    merged.extend(running);

    log::debug!("Merged {} segments into {} synthesis units", segments.len(), merged.len());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EstimateConfig;
    use crate::script::{parse_script, SpeakerBindings};

    fn segments(text: &str) -> Vec<Segment> {
        parse_script(text, &SpeakerBindings::new("Host", "Expert"), &EstimateConfig::default())
    }

    #[test]
    fn test_scenario_merges_into_three_units() {
        let segments = segments("[SLIDE 1]\nHost: Hello. Welcome.\nExpert: Hi there.\n[SLIDE 2]\nHost: Let's continue.");
        let merged = merge_segments(&segments);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "Hello. Welcome.");
        assert_eq!(merged[0].members, 0..2);
        assert_eq!(merged[0].weights, vec![6, 8]);
        assert_eq!(merged[1].speaker, Speaker::Secondary);
        assert_eq!(merged[1].members, 2..3);
        assert_eq!((merged[2].slide_index, merged[2].speaker), (1, Speaker::Primary));
        assert_eq!(merged[0].start_time, 0.0);
        assert_eq!(merged[0].end_time, segments[1].end_time);
    }

    #[test]
    fn test_slide_change_breaks_run() {
        let segments = segments("Host: One. [SLIDE 2] Two. Three.");
        let merged = merge_segments(&segments);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].text, "Two. Three.");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let segments = segments("Host: A. B.\nExpert: C.\nHost: D.\n[SLIDE 2]\nHost: E. F.\nExpert: G.");
        let merged = merge_segments(&segments);
        let as_segments: Vec<Segment> = merged.iter().map(MergedSegment::to_segment).collect();
        let remerged = merge_segments(&as_segments);
        assert_eq!(remerged.len(), merged.len());
        for (a, b) in merged.iter().zip(&remerged) {
            assert_eq!((a.slide_index, a.speaker, &a.text), (b.slide_index, b.speaker, &b.text));
        }
    }

    #[test]
    fn test_merge_preserves_order_and_never_grows() {
        let segments = segments("Host: A. B.\nExpert: C. D.\nHost: E.\nExpert: F.");
        let merged = merge_segments(&segments);
        assert!(merged.len() <= segments.len());
        let mut next = 0;
        for unit in &merged {
            assert_eq!(unit.members.start, next);
            next = unit.members.end;
        }
        assert_eq!(next, segments.len());
        let joined: Vec<String> = merged.iter().map(|m| m.text.clone()).collect();
        assert_eq!(joined, vec!["A. B.", "C. D.", "E.", "F."]);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_segments(&[]).is_empty());
    }
}
