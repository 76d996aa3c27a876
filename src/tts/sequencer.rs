//! Последовательный синтез всего сценария
//!
//! Реплики объединяются в фрагменты, фрагменты синтезируются строго по
//! одному с паузой между запросами, затем аудио склеивается в одну дорожку,
//! а точные времена возвращаются каждому предложению.
//!
//! Каждый запуск получает номер поколения. Новый запуск (или явная отмена)
//! делает предыдущий устаревшим: после ближайшего ожидания он завершается
//! с [`RunOutcome::Superseded`] и выбрасывает накопленное аудио.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use crate::config::VoiceBindings;
use crate::error::{Result, SlidecastError, SynthesisError};
use crate::media::audio::duration_in_seconds;
use crate::media::{concatenate, pcm, GeneratedAudio, PlaybackSynchronizer, TimingBasis};
use crate::progress::{ProcessStep, ProgressTracker};
use crate::script::{merge_segments, Segment};
use crate::tts::client::SynthesisClient;

/// Счетчик поколений запусков
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Начать новое поколение; все выданные ранее билеты устаревают
    pub fn begin(&self) -> GenerationTicket {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationTicket {
            current: self.current.clone(),
            id,
        }
    }

    /// Отменить текущий запуск, не начиная нового
    pub fn supersede(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Билет одного запуска
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    current: Arc<AtomicU64>,
    id: u64,
}

impl GenerationTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

/// Готовая дорожка с точными временами предложений
#[derive(Debug, Clone)]
pub struct RenderedTrack {
    pub audio: GeneratedAudio,
    pub segments: Vec<Segment>,
    /// Сколько запросов синтеза было выполнено
    pub units: usize,
}

impl RenderedTrack {
    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    /// Дорожка в каноническом WAV
    pub fn wav_bytes(&self) -> Result<Vec<u8>> {
        pcm::encode_wav(&self.audio)
    }

    pub async fn save_wav<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        pcm::write_wav_file(path, &self.audio).await
    }

    /// Синхронизатор по точным временам
    pub fn synchronizer(&self) -> PlaybackSynchronizer<'_> {
        PlaybackSynchronizer::new(&self.segments, TimingBasis::Exact, Some(self.duration()))
    }
}

/// Итог запуска
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RenderedTrack),
    /// Запуск вытеснен более новым или отменен
    Superseded,
}

impl RunOutcome {
    pub fn into_track(self) -> Option<RenderedTrack> {
        match self {
            Self::Completed(track) => Some(track),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

pub struct Sequencer {
    client: SynthesisClient,
    pacing_delay: Duration,
    /// Частота пустой дорожки, когда синтезировать нечего
    sample_rate: u32,
    generations: GenerationCounter,
}

impl Sequencer {
    pub fn new(client: SynthesisClient, pacing_delay: Duration, sample_rate: u32) -> Self {
        Self {
            client,
            pacing_delay,
            sample_rate,
            generations: GenerationCounter::new(),
        }
    }

    pub fn client(&self) -> &SynthesisClient {
        &self.client
    }

    /// Общий счетчик поколений; через него можно отменить запуск извне
    pub fn generations(&self) -> GenerationCounter {
        self.generations.clone()
    }

    /// Синтезировать сегменты в одну дорожку
    ///
    /// Любая ошибка фрагмента прерывает запуск целиком, частичное аудио
    /// не возвращается.
    pub async fn run(
        &self,
        segments: &[Segment],
        voices: &VoiceBindings,
        tracker: Option<&ProgressTracker>,
    ) -> Result<RunOutcome> {
        let ticket = self.generations.begin();
        log::info!("Starting synthesis run #{} for {} segments", ticket.id(), segments.len());

        if let Some(t) = tracker {
            t.set_step(ProcessStep::SegmentMerging);
        }
        let units = merge_segments(segments);
        let pending = units.iter().filter(|u| !u.text.trim().is_empty()).count();
        if let Some(t) = tracker {
            t.update_step_progress(100.0, Some(format!("Фрагментов для синтеза: {}", pending)));
            t.set_step(ProcessStep::SpeechSynthesis);
        }

        let mut fragments: Vec<GeneratedAudio> = Vec::with_capacity(pending);
        let mut fragment_of_unit: Vec<Option<usize>> = vec![None; units.len()];

        for (index, unit) in units.iter().enumerate() {
            if unit.text.trim().is_empty() {
                log::debug!("Skipping empty unit {}", index);
                continue;
            }

            if !fragments.is_empty() && !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
                if !ticket.is_current() {
                    return Ok(superseded(&ticket));
                }
            }

            let voice = voices.voice_for(unit.speaker);
            log::debug!(
                "Synthesizing unit {}/{} (slide {}, {:?}, voice {})",
                index + 1,
                units.len(),
                unit.slide_index,
                unit.speaker,
                voice
            );
            let result = self.client.synthesize(&unit.text, voice, Some(&ticket)).await;
            if !ticket.is_current() || matches!(result, Err(SynthesisError::Superseded)) {
                return Ok(superseded(&ticket));
            }

            let synthesized = result.map_err(|source| {
                log::error!("Synthesis run #{} failed at unit {}: {}", ticket.id(), index, source);
                SlidecastError::Synthesis { unit: index, source }
            })?;

            fragment_of_unit[index] = Some(fragments.len());
            fragments.push(synthesized.audio);

            if let Some(t) = tracker {
                let done = fragments.len();
                t.update_step_progress(
                    done as f32 / pending.max(1) as f32 * 100.0,
                    Some(format!("Синтез речи: {}/{} фрагментов", done, pending)),
                );
            }
        }

        if let Some(t) = tracker {
            t.set_step(ProcessStep::AudioAssembly);
        }

        let issued = fragments.len();
        let (audio, ranges) = if fragments.is_empty() {
            (GeneratedAudio::mono(Vec::new(), self.sample_rate), Vec::new())
        } else {
            concatenate(fragments)?
        };

        let rate = audio.sample_rate;
        let mut timed = Vec::with_capacity(segments.len());
        let mut cursor = 0usize;
        for (unit, fragment) in units.iter().zip(&fragment_of_unit) {
            // пропущенный фрагмент занимает нулевой интервал в текущей точке
            let range = fragment
                .and_then(|f| ranges.get(f).cloned())
                .unwrap_or(cursor..cursor);
            cursor = range.end;

            let start = duration_in_seconds(range.start, rate);
            let end = duration_in_seconds(range.end, rate);
            for (member, (from, to)) in unit.members.clone().zip(split_span(start, end, &unit.weights)) {
                let mut segment = segments[member].clone();
                segment.start_time = from;
                segment.end_time = to;
                timed.push(segment);
            }
        }

        let track = RenderedTrack {
            audio,
            segments: timed,
            units: issued,
        };
        if let Some(t) = tracker {
            t.complete();
        }
        log::info!(
            "Synthesis run #{} completed: {} requests, {:.2}s of audio",
            ticket.id(),
            issued,
            track.duration()
        );
        Ok(RunOutcome::Completed(track))
    }
}

fn superseded(ticket: &GenerationTicket) -> RunOutcome {
    log::info!("Synthesis run #{} superseded, discarding partial audio", ticket.id());
    RunOutcome::Superseded
}

/// Делит интервал между участниками пропорционально их длине в символах
///
/// Границы считаются по накопленной доле, поэтому последний участник
/// заканчивается ровно в `end`.
pub(crate) fn split_span(start: f64, end: f64, weights: &[usize]) -> Vec<(f64, f64)> {
    let total: usize = weights.iter().sum();
    let count = weights.len();
    let span = end - start;

    let mut bounds = Vec::with_capacity(count);
    let mut cumulative = 0usize;
    let mut from = start;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        let to = if i + 1 == count {
            end
        } else if total == 0 {
            start + span * (i + 1) as f64 / count as f64
        } else {
            start + span * cumulative as f64 / total as f64
        };
        bounds.push((from, to));
        from = to;
    }
    bounds
}
