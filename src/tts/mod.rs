//! Модуль для работы с TTS
//!
//! Провайдер речи, клиент с повторными попытками, последовательный
//! синтез всех реплик сценария и кэш готовой дорожки.

pub mod cache;
pub mod client;
pub mod openai;
pub mod provider;
pub mod sequencer;

pub use cache::{RenderCache, RenderFingerprint};
pub use client::{SynthesisClient, SynthesizedUnit};
pub use openai::OpenAiSpeechProvider;
pub use provider::{ProviderError, ProviderErrorKind, SpeechPayload, SpeechProvider, SpeechRequest};
pub use sequencer::{GenerationCounter, GenerationTicket, RenderedTrack, RunOutcome, Sequencer};
