use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use tactile_tutor::{
    ClipPlayer, Config, DetectionService, DirectoryFrameSource, FrameSource, HttpDetectionClient,
    Language, Narrator, SessionCommand, SessionController, SessionEvent, SpeakerPlayer,
};

/// Tutor - camera-driven tactile shape teaching client
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection service URL (overrides config)
    #[arg(long, env = "TUTOR_SERVER")]
    server: Option<String>,

    /// Frame spool directory (overrides config)
    #[arg(long, env = "TUTOR_FRAMES")]
    frames: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize and play one line of text
    Speak {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the narration pipeline.")]
        text: String,
        /// Language code (en or si)
        #[arg(short, long, default_value = "en")]
        language: String,
    },
    /// Single-shot object detection on the next available frame
    DetectOnce,
    /// Play a short test clip through the speaker
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,tactile_tutor=info",
        1 => "info,tactile_tutor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.service.base_url = server;
    }
    if let Some(frames) = cli.frames {
        config.capture.frames_dir = frames;
    }

    let service = Arc::new(HttpDetectionClient::new(
        &config.service.base_url,
        std::time::Duration::from_secs(config.service.request_timeout_secs),
    )?);

    if let Some(command) = cli.command {
        return match command {
            Command::Speak { text, language } => speak(&*service, &text, &language).await,
            Command::DetectOnce => detect_once(&config, &*service).await,
            Command::TestSpeaker => test_speaker(&*service).await,
        };
    }

    tracing::info!(
        server = %config.service.base_url,
        frames = %config.capture.frames_dir.display(),
        "starting tutor session"
    );

    let frames = Arc::new(DirectoryFrameSource::open(&config.capture.frames_dir)?);
    let narrator = Narrator::spawn(SpeakerPlayer::new()?);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller =
        SessionController::new(service, frames, narrator, &config, events_tx.clone());

    controller.announce_startup().await;
    print_key_help();

    // Keyboard commands: one key per line on stdin
    let keyboard_tx = events_tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(command) = parse_key(&line) else {
                continue;
            };
            if keyboard_tx.send(SessionEvent::Command(command)).is_err() {
                break;
            }
        }
    });

    tokio::select! {
        () = controller.run(events_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    Ok(())
}

/// Map a line of keyboard input to a session command
fn parse_key(line: &str) -> Option<SessionCommand> {
    match line.trim().to_lowercase().as_str() {
        "e" => Some(SessionCommand::SelectLanguage(Language::English)),
        "s" => Some(SessionCommand::SelectLanguage(Language::Sinhala)),
        "f" => Some(SessionCommand::StartDetection),
        "t" => Some(SessionCommand::StartFeatures),
        "q" => Some(SessionCommand::Reset),
        _ => None,
    }
}

fn print_key_help() {
    println!("Keys: E=English  S=Sinhala  F=start detection  T=start features  Q=reset  (Ctrl-C quits)");
}

async fn speak(service: &dyn DetectionService, text: &str, language: &str) -> anyhow::Result<()> {
    let clip = service.narrate(text, language).await?;
    let player = SpeakerPlayer::new()?;
    player.play(&clip).await?;
    Ok(())
}

async fn detect_once(config: &Config, service: &dyn DetectionService) -> anyhow::Result<()> {
    let frames = DirectoryFrameSource::open(&config.capture.frames_dir)?;
    let frame = frames
        .capture()
        .await
        .ok_or_else(|| anyhow::anyhow!("no frame available"))?;

    let detection = service.detect_object_once(&frame.jpeg).await?;
    println!("Detected: {}", detection.object.replace('_', " "));

    if let Some(clip) = detection.clip {
        let player = SpeakerPlayer::new()?;
        player.play(&clip).await?;
    }
    Ok(())
}

async fn test_speaker(service: &dyn DetectionService) -> anyhow::Result<()> {
    speak(service, "The speaker is working.", "en").await
}
