//! Модуль для интеграции с OpenAI API
//!
//! Провайдер речи поверх `POST {base_url}/audio/speech`. Ответ запрашивается
//! в WAV, статусы и типы содержимого переводятся в [`ProviderErrorKind`].

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use crate::config::{SlidecastConfig, TtsModel};
use crate::error::{Result, SlidecastError};
use crate::media::AudioFormat;
use crate::tts::provider::{ProviderError, ProviderErrorKind, SpeechPayload, SpeechProvider, SpeechRequest};

/// Провайдер OpenAI-совместимого API синтеза речи
pub struct OpenAiSpeechProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: TtsModel,
    /// Частота для ответов в сыром PCM
    sample_rate: u32,
}

impl OpenAiSpeechProvider {
    pub fn from_config(config: &SlidecastConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            log::error!("OpenAI API key is empty");
            return Err(SlidecastError::Configuration(
                "OpenAI API key is required for speech synthesis".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;

        log::info!("TTS Configuration:");
        log::info!("  Endpoint: {}", config.base_url);
        log::info!("  Model: {}", config.tts_model.as_str());
        log::info!("  Voices: {} / {}", config.voices.primary, config.voices.secondary);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.tts_model.clone(),
            sample_rate: config.sample_rate,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> std::result::Result<SpeechPayload, ProviderError> {
        log::debug!("Sending TTS request to {} (voice {})", self.endpoint(), request.voice);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model.as_str(),
                "voice": request.voice,
                "input": request.text,
                "response_format": "wav",
            }))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("OpenAI API error (status {}): {}", status, body);
            return Err(classify_status(status, body));
        }

        if is_text_content(&content_type) {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(ProviderErrorKind::TextResponse, body));
        }

        let bytes = response.bytes().await.map_err(classify_transport)?;
        if bytes.is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::EmptyAudio, "empty response body"));
        }

        Ok(SpeechPayload {
            bytes,
            format: format_for(&content_type, self.sample_rate),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimited,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ProviderErrorKind::Unavailable
        }
        _ => ProviderErrorKind::Other,
    };
    ProviderError::new(kind, format!("{}: {}", status, body))
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::new(ProviderErrorKind::Unavailable, err.to_string())
    } else {
        ProviderError::new(ProviderErrorKind::Other, err.to_string())
    }
}

fn is_text_content(content_type: &str) -> bool {
    content_type.starts_with("text/") || content_type.contains("json")
}

fn format_for(content_type: &str, sample_rate: u32) -> AudioFormat {
    if content_type.contains("mpeg") || content_type.contains("mp3") {
        AudioFormat::Mp3
    } else if content_type.contains("pcm") || content_type.contains("l16") {
        AudioFormat::Pcm16 { sample_rate, channels: 1 }
    } else {
        AudioFormat::Wav
    }
}
