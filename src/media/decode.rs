//! Декодирование аудио, полученного от провайдера
//!
//! Каждая попытка синтеза берет собственный [`DecodeContext`] из
//! [`DecoderPool`]. Контекст освобождается при выходе из области видимости,
//! поэтому ни ошибка, ни повтор не оставляют открытых контекстов.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::error::SynthesisError;
use crate::media::audio::GeneratedAudio;
use crate::media::pcm;

/// Формат данных, которые вернул провайдер
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    /// Сырой PCM 16 бит little-endian без заголовка
    Pcm16 { sample_rate: u32, channels: u16 },
}

#[derive(Debug, Default)]
struct PoolStats {
    open: AtomicUsize,
    acquired: AtomicUsize,
}

/// Источник контекстов декодирования
#[derive(Debug, Clone, Default)]
pub struct DecoderPool {
    stats: Arc<PoolStats>,
}

impl DecoderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Выдать новый контекст
    pub fn acquire(&self) -> DecodeContext {
        self.stats.open.fetch_add(1, Ordering::SeqCst);
        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        DecodeContext {
            stats: self.stats.clone(),
            scratch: Vec::new(),
        }
    }

    /// Сколько контекстов сейчас не освобождено
    pub fn open_contexts(&self) -> usize {
        self.stats.open.load(Ordering::SeqCst)
    }

    /// Сколько контекстов выдано за все время
    pub fn total_acquired(&self) -> usize {
        self.stats.acquired.load(Ordering::SeqCst)
    }
}

/// Контекст декодирования одной попытки синтеза
#[derive(Debug)]
pub struct DecodeContext {
    stats: Arc<PoolStats>,
    /// Чередующиеся сэмплы до сведения в моно
    scratch: Vec<f32>,
}

impl DecodeContext {
    /// Декодировать ответ провайдера в моно f32
    pub fn decode(&mut self, bytes: &[u8], format: AudioFormat) -> Result<GeneratedAudio, SynthesisError> {
        if bytes.is_empty() {
            return Err(SynthesisError::NoAudioReturned);
        }

        self.scratch.clear();
        let (sample_rate, channels) = match format {
            AudioFormat::Wav => self.decode_wav(bytes)?,
            AudioFormat::Mp3 => self.decode_compressed(bytes, "mp3")?,
            AudioFormat::Pcm16 { sample_rate, channels } => {
                self.decode_raw_pcm(bytes)?;
                (sample_rate, channels)
            }
        };

        if sample_rate == 0 {
            return Err(SynthesisError::Decode("audio has zero sample rate".to_string()));
        }
        let samples = downmix(&self.scratch, channels);
        log::debug!(
            "Decoded {} bytes of {:?} into {} samples at {} Hz",
            bytes.len(),
            format,
            samples.len(),
            sample_rate
        );
        Ok(GeneratedAudio::mono(samples, sample_rate))
    }

    fn decode_wav(&mut self, bytes: &[u8]) -> Result<(u32, u16), SynthesisError> {
        let audio = pcm::decode_wav(bytes).map_err(|e| SynthesisError::Decode(e.to_string()))?;
        self.scratch.extend_from_slice(&audio.samples);
        Ok((audio.sample_rate, audio.channels))
    }

    fn decode_raw_pcm(&mut self, bytes: &[u8]) -> Result<(), SynthesisError> {
        if bytes.len() % 2 != 0 {
            return Err(SynthesisError::Decode(format!(
                "raw PCM payload has odd length {}",
                bytes.len()
            )));
        }
        self.scratch.extend(
            bytes
                .chunks_exact(2)
                .map(|pair| pcm::i16_to_f32(i16::from_le_bytes([pair[0], pair[1]]))),
        );
        Ok(())
    }

    fn decode_compressed(&mut self, bytes: &[u8], extension: &str) -> Result<(u32, u16), SynthesisError> {
        let cursor = Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension);

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| SynthesisError::Decode(format!("unrecognized audio format: {}", e)))?;

        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SynthesisError::Decode("no audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| SynthesisError::Decode(format!("failed to create decoder: {}", e)))?;

        while let Ok(packet) = format.next_packet() {
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    if sample_rate == 0 {
                        sample_rate = spec.rate;
                    }
                    if channels == 0 {
                        channels = spec.channels.count() as u16;
                    }
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    self.scratch.extend_from_slice(buffer.samples());
                }
                Err(e) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                }
            }
        }

        Ok((sample_rate, channels.max(1)))
    }
}

impl Drop for DecodeContext {
    fn drop(&mut self) {
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Сводит чередующиеся каналы в моно усреднением
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_released_on_drop() {
        let pool = DecoderPool::new();
        {
            let _a = pool.acquire();
            let _b = pool.acquire();
            assert_eq!(pool.open_contexts(), 2);
        }
        assert_eq!(pool.open_contexts(), 0);
        assert_eq!(pool.total_acquired(), 2);
    }

    #[test]
    fn test_decode_raw_pcm_stereo() {
        let pool = DecoderPool::new();
        let mut ctx = pool.acquire();
        let mut bytes = Vec::new();
        for value in [16384i16, 0, -16384, -16384] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let audio = ctx
            .decode(&bytes, AudioFormat::Pcm16 { sample_rate: 8_000, channels: 2 })
            .unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 8_000);
        assert_eq!(audio.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_decode_wav_payload() {
        let source = GeneratedAudio::mono(vec![0.0, 0.5, -0.5], 24_000);
        let bytes = pcm::encode_wav(&source).unwrap();
        let mut ctx = DecoderPool::new().acquire();
        let audio = ctx.decode(&bytes, AudioFormat::Wav).unwrap();
        assert_eq!(audio.samples.len(), 3);
        assert_eq!(audio.sample_rate, 24_000);
    }

    #[test]
    fn test_empty_and_garbage_payloads() {
        let mut ctx = DecoderPool::new().acquire();
        assert!(matches!(ctx.decode(&[], AudioFormat::Wav), Err(SynthesisError::NoAudioReturned)));
        assert!(matches!(ctx.decode(b"not audio", AudioFormat::Wav), Err(SynthesisError::Decode(_))));
        assert!(matches!(
            ctx.decode(&[1, 2, 3], AudioFormat::Pcm16 { sample_rate: 24_000, channels: 1 }),
            Err(SynthesisError::Decode(_))
        ));
    }
}
