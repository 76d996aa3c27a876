//! Модуль для работы с аудио и синхронизацией воспроизведения
//!
//! Склейка фрагментов, PCM-кодек, декодирование ответов провайдера и поиск
//! активного сегмента по времени.

pub mod audio;
pub mod decode;
pub mod pcm;
pub mod sync;

pub use audio::{concatenate, GeneratedAudio};
pub use decode::{AudioFormat, DecodeContext, DecoderPool};
pub use sync::{locate, PlaybackPosition, PlaybackSynchronizer, TimingBasis};
