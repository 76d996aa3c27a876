//! PCM-кодек и WAV-контейнер
//!
//! Итоговая дорожка записывается в канонический WAV: 44 байта заголовка
//! (`RIFF`/`WAVE`/`fmt `/`data`), PCM 16 бит, little-endian.

use std::io::Cursor;
use std::path::Path;
use hound::{SampleFormat, WavReader};
use crate::error::{Result, SlidecastError};
use crate::media::audio::GeneratedAudio;

/// Размер канонического заголовка WAV
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT_TAG: u16 = 1;

/// f32 -> i16: отрицательные значения масштабируются на 32768, положительные на 32767
pub fn f32_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0).round() as i16
    } else {
        (s * 32767.0).round() as i16
    }
}

/// i16 -> f32
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Размер блока `data` в байтах
///
/// Поле размера RIFF 32-битное, поэтому вместе с заголовком данные должны
/// уместиться в `u32`.
pub fn wav_data_len(sample_count: usize) -> Result<u32> {
    sample_count
        .checked_mul(usize::from(BITS_PER_SAMPLE / 8))
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(|| {
            SlidecastError::AudioProcessing(format!(
                "audio too long for a WAV container: {} samples",
                sample_count
            ))
        })
}

/// Кодирует аудио в канонический WAV (16 бит)
pub fn encode_wav(audio: &GeneratedAudio) -> Result<Vec<u8>> {
    let channels = audio.channels.max(1);
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = audio.sample_rate * block_align as u32;
    let data_len = wav_data_len(audio.samples.len())?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&audio.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &audio.samples {
        out.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
    Ok(out)
}

/// Декодирует WAV из памяти в f32-сэмплы
///
/// Поддерживаются 16-битный PCM и 32-битный float; каналы не сводятся.
pub fn decode_wav(bytes: &[u8]) -> Result<GeneratedAudio> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(i16_to_f32))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(SlidecastError::InvalidFormat(format!(
                "unsupported WAV sample format: {:?}, {} bits",
                format, bits
            )))
        }
    };

    Ok(GeneratedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Записывает аудио в WAV-файл
pub async fn write_wav_file<P: AsRef<Path>>(path: P, audio: &GeneratedAudio) -> Result<()> {
    let bytes = encode_wav(audio)?;
    tokio::fs::write(path.as_ref(), &bytes).await?;
    log::info!(
        "Saved WAV file: {} ({} samples, {} Hz)",
        path.as_ref().display(),
        audio.samples.len(),
        audio.sample_rate
    );
    Ok(())
}
