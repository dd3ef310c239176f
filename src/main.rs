use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scribecast::audio::wav::WavSource;
use scribecast::chat::ChatClient;
use scribecast::cli::Cli;
use scribecast::config::Config;
use scribecast::error::ScribecastError;
use scribecast::runtime::{INVALID_HANDLE, StreamRuntime};
use scribecast::server::SubscriberServer;
use scribecast::server::protocol::Outbound;
use scribecast::stt::whisper::{WhisperConfig, WhisperEngine};
use scribecast::stt::{MockEngine, SpeechEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = load_config(cli.config.as_deref())?.with_env_overrides();
    cli.apply_to(&mut config);
    config.validate()?;

    let runtime = Arc::new(StreamRuntime::new(&config));
    let engine = build_engine(&cli, &config)?;
    let model = engine.name().to_string();

    let handle = runtime.init(engine);
    if handle == INVALID_HANDLE {
        return Err(ScribecastError::NoFreeSlot).with_context(|| {
            format!(
                "could not claim an inference context for '{}' (rebuild with --features whisper, or run with --mock)",
                model
            )
        });
    }
    info!(model = %model, handle, version = %scribecast::version_string(), "decode context ready");

    let session = runtime.session();
    let chat = Arc::new(ChatClient::new(config.chat.clone())?);
    let server =
        SubscriberServer::bind(&config.server.bind, Arc::clone(&session), chat).await?;

    // The console is just another subscriber: it joins the hub and prints
    // whatever the network peers would see.
    let (console_tx, mut console_rx) = tokio::sync::mpsc::unbounded_channel();
    session.hub.join(console_tx);
    let quiet = cli.quiet;
    tokio::spawn(async move {
        while let Some(message) = console_rx.recv().await {
            if quiet {
                continue;
            }
            match message {
                Outbound::Transcribe { content } => println!("{} {}", "»".cyan(), content),
                Outbound::Prompt { content } => println!("{} {}", "?".yellow(), content),
                Outbound::Response { content } => println!("{} {}", "«".green(), content),
            }
        }
    });

    let _producer = match &cli.input {
        Some(path) => {
            let source = if path.as_os_str() == "-" {
                WavSource::from_stdin(config.audio.sample_rate)?
            } else {
                WavSource::from_path(path, config.audio.sample_rate)?
            };
            info!(
                duration_secs = source.duration().as_secs_f32(),
                paced = !cli.fast,
                "streaming input audio"
            );
            let runtime = Arc::clone(&runtime);
            Some(source.stream_with(!cli.fast, move |chunk| {
                runtime.set_audio(handle, chunk);
            }))
        }
        None => {
            info!("no input file; audio arrives via the binding surface only");
            None
        }
    };

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            server.stop().await;
        }
    }

    runtime.free(handle);
    runtime.shutdown();
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => match Config::default_path() {
            Some(default) => Config::load_or_default(&default)
                .with_context(|| format!("failed to load config from {}", default.display())),
            None => Ok(Config::default()),
        },
    }
}

fn build_engine(cli: &Cli, config: &Config) -> Result<Box<dyn SpeechEngine>> {
    if cli.mock {
        return Ok(Box::new(
            MockEngine::new("mock").with_fallback(&["this is the scribecast demo engine"]),
        ));
    }

    let engine = WhisperEngine::new(WhisperConfig {
        model_path: config.stt.model.clone().into(),
        language: config.stt.language.clone(),
        threads: None,
    })
    .with_context(|| format!("failed to load decode model '{}'", config.stt.model))?;
    Ok(Box::new(engine))
}
