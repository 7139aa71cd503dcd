//! shelfcall application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the voice alert controller over the host speech and tone adapters
//! 4. Run the requested command

mod cli;
mod demo;
mod feed;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use shelfcall_alerts::{Clock, PlaybackOutcome, SystemClock, TickOutcome, VoiceAlertController};
use shelfcall_audio::{LoggingSynthesizer, LoggingToneGenerator};
use shelfcall_core::config::ShelfcallConfig;
use shelfcall_core::events::AlertEvent;
use shelfcall_core::types::Priority;

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Build the tracing filter: RUST_LOG wins, then the resolved level.
fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Forward engine events to the log until the channel closes.
async fn event_logger(mut rx: tokio::sync::broadcast::Receiver<AlertEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                AlertEvent::AnnouncementFailed { reason, .. } => {
                    tracing::warn!(event = event.event_name(), alert_id = ?event.alert_id(), %reason, "Alert event");
                }
                AlertEvent::TickSkipped { reason, .. } => {
                    tracing::debug!(event = event.event_name(), ?reason, "Alert event");
                }
                _ => {
                    tracing::info!(event = event.event_name(), alert_id = ?event.alert_id(), "Alert event");
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

fn build_controller(
    config: &ShelfcallConfig,
    clock: Arc<dyn Clock>,
) -> AppResult<VoiceAlertController> {
    let settings = config.alert_settings()?;
    let controller = VoiceAlertController::with_clock(
        settings,
        Arc::new(LoggingSynthesizer::new()),
        Arc::new(LoggingToneGenerator),
        clock,
    )?;
    Ok(controller)
}

fn load_alerts(
    controller: &VoiceAlertController,
    alerts: Option<std::path::PathBuf>,
    demo: bool,
) -> AppResult<()> {
    if demo {
        for alert in demo::sample_alerts() {
            controller.add_alert(alert)?;
        }
        tracing::info!("Sample alerts loaded");
    }
    if let Some(path) = alerts {
        for alert in feed::load(&path)? {
            controller.add_alert(alert)?;
        }
    }
    tracing::info!(
        pending = controller.pending_count(),
        critical = controller.critical_pending_count(),
        "Alerts queued"
    );
    Ok(())
}

/// Run a single tick. Returns the announcement's outcome, or `None` when the
/// tick was skipped.
async fn run_once(controller: &VoiceAlertController) -> AppResult<Option<PlaybackOutcome>> {
    match controller.tick_now() {
        TickOutcome::Dispatched(ticket) => {
            let outcome = ticket.wait().await;
            tracing::info!(?outcome, "Tick finished");
            Ok(Some(outcome))
        }
        TickOutcome::Skipped(reason) => {
            tracing::info!(?reason, "Tick skipped");
            Ok(None)
        }
        TickOutcome::Failed(e) => Err(e.into()),
    }
}

async fn run(
    config: &ShelfcallConfig,
    alerts: Option<std::path::PathBuf>,
    demo: bool,
    poll_minutes: Option<u32>,
    once: bool,
    clock: Arc<dyn Clock>,
) -> AppResult<()> {
    let mut config = config.clone();
    if let Some(minutes) = poll_minutes {
        config.voice.poll_interval_minutes = minutes;
    }
    let controller = build_controller(&config, clock)?;
    tokio::spawn(event_logger(controller.subscribe()));
    load_alerts(&controller, alerts, demo)?;

    if once {
        let result = run_once(&controller).await;
        controller.shutdown();
        return result.map(|_| ());
    }

    controller.start();
    tracing::info!("Voice alerts running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    controller.shutdown();
    Ok(())
}

async fn say(config: &ShelfcallConfig, message: &str) -> AppResult<()> {
    let controller = build_controller(config, Arc::new(SystemClock))?;
    let ticket = controller.test_play(message)?;
    match ticket.wait().await {
        PlaybackOutcome::Completed { .. } => Ok(()),
        PlaybackOutcome::Failed(reason) => Err(reason.into()),
        PlaybackOutcome::Cancelled => Err("announcement was cancelled".into()),
    }
}

fn tone(config: &ShelfcallConfig, priority: Priority) -> AppResult<()> {
    let controller = build_controller(config, Arc::new(SystemClock))?;
    controller.preview_tone(priority)?;
    Ok(())
}

fn list_voices(config: &ShelfcallConfig) -> AppResult<()> {
    let controller = build_controller(config, Arc::new(SystemClock))?;
    for voice in controller.available_voices() {
        println!("{}\t{}", voice.name, voice.language);
    }
    Ok(())
}

fn print_config(config: &ShelfcallConfig, path: &std::path::Path, write: bool) -> AppResult<()> {
    config.alert_settings()?;
    if write {
        config.save(path)?;
    }
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config. Loaded before tracing so the file can set the log level.
    let config_file = args.resolve_config_path();
    let loaded = ShelfcallConfig::load(&config_file);
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ShelfcallConfig::default(),
    };

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt().with_env_filter(env_filter(&level)).init();

    tracing::info!("Starting shelfcall v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid configuration, using defaults");
        }
        Err(_) => tracing::info!(path = %config_file.display(), "No configuration file, using defaults"),
    }

    let result = match args.command() {
        Command::Run {
            alerts,
            demo,
            poll_minutes,
            once,
        } => {
            run(
                &config,
                alerts,
                demo,
                poll_minutes,
                once,
                Arc::new(SystemClock),
            )
            .await
        }
        Command::Say { message } => say(&config, &message).await,
        Command::Tone { priority } => tone(&config, priority),
        Command::Voices => list_voices(&config),
        Command::Config { write } => print_config(&config, &config_file, write),
    };
    if let Err(ref e) = result {
        tracing::error!(error = %e, "shelfcall failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfcall_alerts::ManualClock;

    fn at(hour: u32) -> Arc<dyn Clock> {
        Arc::new(ManualClock::at(hour, 0))
    }

    #[test]
    fn test_build_controller_from_defaults() {
        let controller = build_controller(&ShelfcallConfig::default(), at(10)).unwrap();
        assert_eq!(controller.pending_count(), 0);
        assert!(controller.is_speech_available());
        assert_eq!(controller.settings().poll_interval_minutes, 15);
    }

    #[test]
    fn test_build_controller_rejects_invalid_config() {
        let mut config = ShelfcallConfig::default();
        config.voice.speed = 4.0;
        assert!(build_controller(&config, at(10)).is_err());
    }

    #[test]
    fn test_print_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        print_config(&ShelfcallConfig::default(), &path, true).unwrap();

        let loaded = ShelfcallConfig::load(&path).unwrap();
        assert_eq!(loaded.voice.max_repeats, 3);
        assert_eq!(loaded.voice.active_hours.start, "08:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_say_speaks_through_logging_synthesizer() {
        say(&ShelfcallConfig::default(), "hello").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_announces_top_demo_alert() {
        let controller = build_controller(&ShelfcallConfig::default(), at(10)).unwrap();
        load_alerts(&controller, None, true).unwrap();
        assert_eq!(controller.pending_count(), 5);

        let outcome = run_once(&controller).await.unwrap();
        assert_eq!(outcome, Some(PlaybackOutcome::Completed { repeat_count: 1 }));
        assert_eq!(controller.pending_count(), 4);
        let masks = controller
            .alerts()
            .into_iter()
            .find(|a| a.subject == "N95 Masks")
            .unwrap();
        assert!(masks.has_been_played);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_skips_outside_active_hours() {
        let controller = build_controller(&ShelfcallConfig::default(), at(22)).unwrap();
        load_alerts(&controller, None, true).unwrap();

        assert_eq!(run_once(&controller).await.unwrap(), None);
        assert_eq!(controller.pending_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_with_demo() {
        run(&ShelfcallConfig::default(), None, true, None, true, at(10))
            .await
            .unwrap();
    }
}
