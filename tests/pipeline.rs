use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_test::{assert_err, assert_ok};
use slidecast_sync::media::{pcm, AudioFormat};
use slidecast_sync::notification::MemoryProgressObserver;
use slidecast_sync::tts::{ProviderError, ProviderErrorKind, SpeechPayload, SpeechRequest};
use slidecast_sync::{
    FailureKind, GeneratedAudio, RunOutcome, ScriptSession, SlidecastConfig, SlidecastError, SlidecastSync,
    SpeakerBindings, SpeechProvider,
};

const SCRIPT: &str = "\
[SLIDE 1]
**Host:** Hello. Welcome to the show.
Expert: Hi there!
[SLIDE 2]
Host: Let's continue.
It gets better.
[SLIDE 3]
Expert: Bye.";

const RATE: u32 = 8_000;

/// Отвечает WAV-файлами длиной 10 мс на символ
#[derive(Default)]
struct WavProvider {
    calls: AtomicUsize,
    failures: Mutex<VecDeque<ProviderError>>,
}

impl WavProvider {
    fn failing(errors: Vec<ProviderError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: Mutex::new(errors.into()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechProvider for WavProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let frames = request.text.chars().count() * (RATE as usize / 100);
        let audio = GeneratedAudio::mono(vec![0.25; frames], RATE);
        Ok(SpeechPayload {
            bytes: Bytes::from(pcm::encode_wav(&audio).expect("test audio fits in WAV")),
            format: AudioFormat::Wav,
        })
    }
}

fn config() -> SlidecastConfig {
    SlidecastConfig {
        bindings: SpeakerBindings::new("Host", "Expert"),
        sample_rate: RATE,
        ..SlidecastConfig::default()
    }
}

fn chars(text: &str) -> f64 {
    text.chars().count() as f64
}

#[tokio::test(start_paused = true)]
async fn renders_script_into_one_synchronized_track() {
    let provider = Arc::new(WavProvider::default());
    let mut sync = SlidecastSync::new(config(), provider.clone()).unwrap();
    let observer = MemoryProgressObserver::new();
    sync.add_observer(Box::new(observer.clone()));

    let estimated = sync.segment(SCRIPT);
    assert_eq!(estimated.len(), 6);
    assert_eq!(estimated[0].start_time, 0.0);

    let outcome = assert_ok!(sync.render(SCRIPT).await);
    let track = match outcome {
        RunOutcome::Completed(track) => track,
        RunOutcome::Superseded => panic!("run was superseded"),
    };

    // одинаковые говорящий и слайд склеиваются: 4 запроса на 6 предложений
    assert_eq!(provider.calls(), 4);
    assert_eq!(track.units, 4);
    assert_eq!(track.segments.len(), 6);

    let expected_total: f64 = ["Hello. Welcome to the show.", "Hi there!", "Let's continue. It gets better.", "Bye."]
        .iter()
        .map(|t| chars(t) / 100.0)
        .sum();
    assert!((track.duration() - expected_total).abs() < 1e-9);
    assert_eq!(track.segments.last().map(|s| s.end_time), Some(track.duration()));
    for pair in track.segments.windows(2) {
        assert_eq!(pair[0].end_time, pair[1].start_time);
        assert!(pair[0].slide_index <= pair[1].slide_index);
    }

    let sync_exact = track.synchronizer();
    for (i, segment) in track.segments.iter().enumerate() {
        let middle = (segment.start_time + segment.end_time) / 2.0;
        let position = sync_exact.position_at(middle).unwrap();
        assert_eq!(position.index, i);
        assert_eq!(position.slide_index, segment.slide_index);
    }

    let wav = assert_ok!(track.wav_bytes());
    assert_eq!(wav.len(), pcm::WAV_HEADER_LEN + track.audio.samples.len() * 2);

    let history = observer.history();
    assert!(!history.is_empty());
    assert_eq!(history.last().map(|p| p.total_progress), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn unchanged_inputs_reuse_the_cached_track() {
    let provider = Arc::new(WavProvider::default());
    let sync = SlidecastSync::new(config(), provider.clone()).unwrap();

    assert_ok!(sync.render(SCRIPT).await);
    assert_eq!(provider.calls(), 4);
    assert_ok!(sync.render(SCRIPT).await);
    assert_eq!(provider.calls(), 4);

    // любое изменение текста требует нового синтеза
    assert_ok!(sync.render(&SCRIPT.replace("Bye.", "Goodbye.")).await);
    assert_eq!(provider.calls(), 8);
}

#[tokio::test(start_paused = true)]
async fn persisted_track_is_restored_by_a_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(WavProvider::default());

    let first = SlidecastSync::new(config(), provider.clone()).unwrap();
    let rendered = first.render(SCRIPT).await.unwrap().into_track().unwrap();
    assert!(first.persist_render(dir.path()).await.unwrap().is_some());

    let second = SlidecastSync::new(config(), provider.clone()).unwrap();
    let restored = second.restore_render(SCRIPT, dir.path()).await.unwrap().unwrap();
    assert_eq!(restored.segments.len(), rendered.segments.len());
    for (a, b) in restored.segments.iter().zip(&rendered.segments) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.text, b.text);
        assert!((a.start_time - b.start_time).abs() < 1e-9);
        assert!((a.end_time - b.end_time).abs() < 1e-9);
    }
    assert_eq!(restored.audio.samples.len(), rendered.audio.samples.len());

    assert_ok!(second.render(SCRIPT).await);
    assert_eq!(provider.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_transparently() {
    let provider = Arc::new(WavProvider::failing(vec![
        ProviderError::new(ProviderErrorKind::RateLimited, "429"),
        ProviderError::new(ProviderErrorKind::Unavailable, "503"),
    ]));
    let sync = SlidecastSync::new(config(), provider.clone()).unwrap();
    let track = sync.render(SCRIPT).await.unwrap().into_track().unwrap();
    assert_eq!(track.units, 4);
    assert_eq!(provider.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_is_reported_as_quota_failure() {
    let errors = (0..10)
        .map(|_| ProviderError::new(ProviderErrorKind::RateLimited, "RESOURCE_EXHAUSTED"))
        .collect();
    let provider = Arc::new(WavProvider::failing(errors));
    let sync = SlidecastSync::new(config(), provider.clone()).unwrap();

    let err = assert_err!(sync.render(SCRIPT).await);
    assert!(matches!(err, SlidecastError::Synthesis { unit: 0, .. }));
    assert_eq!(err.failure_kind(), FailureKind::QuotaExceeded);
    assert_eq!(provider.calls(), 10);
}

#[tokio::test]
async fn session_round_trip_rebinds_speakers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let provider = Arc::new(WavProvider::default());

    let mut named = config();
    named.bindings = SpeakerBindings::new("Anna", "Boris");
    let source = SlidecastSync::new(named, provider.clone()).unwrap();
    let script = "[SLIDE 1]\nAnna: Hi.\nBoris: Hello.";
    source.session(script).save(&path).await.unwrap();

    let mut target = SlidecastSync::new(config(), provider).unwrap();
    assert!(target.segment(script).is_empty());

    let session = ScriptSession::load(&path).await.unwrap();
    target.apply_session(&session).unwrap();
    let segments = target.segment(&session.script);
    assert_eq!(segments.len(), 2);
    assert_eq!(target.config().bindings.primary_name, "Anna");
}

#[test]
fn estimated_timeline_is_scaled_to_real_audio() {
    let sync = SlidecastSync::new(config(), Arc::new(WavProvider::default())).unwrap();
    let segments = sync.segment(SCRIPT);
    let estimated_total = segments.last().unwrap().end_time;

    let scaled = sync.estimated_synchronizer(&segments, Some(estimated_total * 2.0));
    assert_eq!(scaled.position_at(estimated_total * 2.0 - 0.01).map(|p| p.index), Some(5));
    assert_eq!(scaled.position_at(0.0).map(|p| p.index), Some(0));
    assert_eq!(scaled.position_at(-1.0), None);
}

#[test]
fn invalid_configuration_is_rejected() {
    let mut bad = config();
    bad.bindings = SpeakerBindings::new("Host", "host");
    assert!(matches!(
        SlidecastSync::new(bad, Arc::new(WavProvider::default())),
        Err(SlidecastError::Configuration(_))
    ));
}
