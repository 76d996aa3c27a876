//! Модуль для разбора сценария в последовательность сегментов
//!
//! Разбор детерминирован: один и тот же текст с теми же именами ролей дает
//! ту же последовательность (кроме идентификаторов сегментов). Времена
//! сегментов на этом этапе являются оценками по длине текста.

use std::collections::VecDeque;
use std::vec::IntoIter;
use crate::config::EstimateConfig;
use crate::script::lexer::{tokenize, Token};
use crate::script::{Segment, Speaker, SpeakerBindings};

/// ASCII и полноширинные знаки конца предложения
const ASCII_TERMINATORS: &[char] = &['.', '!', '?'];
const WIDE_TERMINATORS: &[char] = &['。', '！', '？', '…', '．'];
/// Закрывающие кавычки и скобки остаются с предложением
const CLOSERS: &[char] = &['"', '\'', ')', ']', '»', '”', '’', '」', '』', '）'];

/// Разборщик сценария
#[derive(Debug, Clone)]
pub struct ScriptParser<'a> {
    text: &'a str,
    bindings: SpeakerBindings,
    estimate: EstimateConfig,
}

impl<'a> ScriptParser<'a> {
    pub fn new(text: &'a str, bindings: SpeakerBindings) -> Self {
        Self::with_estimate(text, bindings, EstimateConfig::default())
    }

    pub fn with_estimate(text: &'a str, bindings: SpeakerBindings, estimate: EstimateConfig) -> Self {
        Self { text, bindings, estimate }
    }

    /// Ленивый итератор по сегментам; каждый вызов начинает разбор заново
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            tokens: tokenize(self.text, &self.bindings).into_iter(),
            pending: VecDeque::new(),
            slide_index: 0,
            speaker: None,
            cursor: 0.0,
            estimate: &self.estimate,
        }
    }
}

/// Итератор сегментов сценария
pub struct Segments<'p> {
    tokens: IntoIter<Token<'p>>,
    pending: VecDeque<String>,
    slide_index: usize,
    speaker: Option<Speaker>,
    cursor: f64,
    estimate: &'p EstimateConfig,
}

impl<'p> Segments<'p> {
    fn accept(&mut self, token: Token<'p>) {
        match token {
            Token::SlideMarker { page } => {
                let index = page.max(1) - 1;
                if index < self.slide_index {
                    log::warn!(
                        "Slide marker {} goes backwards from slide {}, keeping slide {}",
                        page,
                        self.slide_index + 1,
                        self.slide_index + 1
                    );
                }
                self.slide_index = self.slide_index.max(index);
            }
            Token::SpeakerLabel { speaker, content } => {
                self.speaker = Some(speaker);
                self.pending.extend(split_sentences(content));
            }
            Token::TextLine(content) => {
                if self.speaker.is_some() {
                    self.pending.extend(split_sentences(content));
                } else {
                    log::debug!("Discarding text before the first speaker label: {}", content);
                }
            }
        }
    }
}

impl<'p> Iterator for Segments<'p> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                // pending is only filled once a speaker has been seen
                let speaker = self.speaker?;
                let start = self.cursor;
                let end = start + self.estimate.estimate(&text);
                self.cursor = end;
                return Some(Segment::new(self.slide_index, speaker, text, start, end));
            }
            let token = self.tokens.next()?;
            self.accept(token);
        }
    }
}

/// Разобрать сценарий целиком
pub fn parse_script(text: &str, bindings: &SpeakerBindings, estimate: &EstimateConfig) -> Vec<Segment> {
    let parser = ScriptParser::with_estimate(text, bindings.clone(), estimate.clone());
    let segments: Vec<Segment> = parser.segments().collect();
    log::debug!("Parsed script into {} segments", segments.len());
    segments
}

/// Разбить реплику на предложения
///
/// ASCII-знаки завершают предложение, только если за ними идет пробел или
/// конец строки (`3.14` и `e.g.x` не режутся). Полноширинные знаки
/// завершают предложение всегда.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        let mut wide = WIDE_TERMINATORS.contains(&c);
        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || CLOSERS.contains(&chars[j].1)) {
            wide |= WIDE_TERMINATORS.contains(&chars[j].1);
            j += 1;
        }

        let at_end = j == chars.len();
        if at_end || wide || chars[j].1.is_whitespace() {
            let end = if at_end { text.len() } else { chars[j].0 };
            push_sentence(&mut sentences, &text[start..end]);
            start = end;
        }
        i = j;
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn is_terminator(c: char) -> bool {
    ASCII_TERMINATORS.contains(&c) || WIDE_TERMINATORS.contains(&c)
}

/// Убирает разметку выделения и нормализует пробелы
fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let cleaned = raw.replace(['*', '`'], "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<&str>>().join(" ");
    if !cleaned.is_empty() {
        sentences.push(cleaned);
    }
}
