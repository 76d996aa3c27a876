//! Пример озвучивания сценария через OpenAI API
//!
//! ```text
//! OPENAI_API_KEY=... cargo run --example narrate -- script.txt out.wav
//! ```

use slidecast_sync::notification::ConsoleProgressObserver;
use slidecast_sync::{FailureKind, RunOutcome, SlidecastConfig, SlidecastSync, SpeakerBindings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Инициализируем логирование
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let script_path = args.next().ok_or("usage: narrate <script.txt> [out.wav]")?;
    let output_path = args.next().unwrap_or_else(|| "narration.wav".to_string());

    let config = SlidecastConfig {
        api_key: std::env::var("OPENAI_API_KEY")?,
        bindings: SpeakerBindings::new(
            std::env::var("PRIMARY_NAME").unwrap_or_else(|_| "Host".to_string()),
            std::env::var("SECONDARY_NAME").unwrap_or_else(|_| "Expert".to_string()),
        ),
        ..SlidecastConfig::default()
    };

    let script = tokio::fs::read_to_string(&script_path).await?;

    let mut sync = SlidecastSync::with_openai(config)?;
    sync.add_observer(Box::new(ConsoleProgressObserver::with_prefix("[narrate] ")));

    let segments = sync.segment(&script);
    println!("Предложений: {}, слайдов: {}", segments.len(), segments.last().map_or(0, |s| s.slide_index + 1));

    match sync.render(&script).await {
        Ok(RunOutcome::Completed(track)) => {
            track.save_wav(&output_path).await?;
            println!("Готово: {} ({:.1} с)", output_path, track.duration());
            for segment in &track.segments {
                println!(
                    "{:>7.2} - {:>7.2}  слайд {:<3} {:<10} {}",
                    segment.start_time,
                    segment.end_time,
                    segment.slide_index + 1,
                    sync.config().bindings.name_of(segment.speaker),
                    segment.text
                );
            }
        }
        Ok(RunOutcome::Superseded) => println!("Запуск отменен"),
        Err(e) if e.failure_kind() == FailureKind::QuotaExceeded => {
            eprintln!("Превышена квота API, попробуйте позже или смените ключ: {}", e);
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
