use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tyspeak_core::{aws, RelayConfig, SpeechRequest, SpeechResponse};

#[derive(Parser, Debug)]
#[command(name = "tyspeak")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synthesize text with Polly, store it in S3 and announce it on SQS")]
struct Args {
    /// Settings file (defaults to ~/.tyspeak/settings.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Text to synthesize
    #[arg(long, requires = "voice", conflicts_with = "event")]
    text: Option<String>,

    /// Voice id, e.g. Joanna
    #[arg(long, requires = "text", conflicts_with = "event")]
    voice: Option<String>,

    /// Full request as JSON: {"text": "...", "voice": "..."}. Read from stdin
    /// when neither this nor --text/--voice is given.
    #[arg(long, value_name = "JSON")]
    event: Option<String>,
}

fn main() -> Result<()> {
    setup_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();

    let config = RelayConfig::load(args.config.as_deref())?;
    info!(
        "CLI startup: bucket={}, queue_url={}, profile={:?}",
        config.bucket_name, config.queue_url, config.aws.profile
    );

    let request = read_request(args.text, args.voice, args.event).await?;
    let handler = aws::build_handler(config).await;

    match handler.handle(request).await {
        Ok(response) => {
            print_response(&response)?;
            Ok(())
        }
        Err(e) => {
            print_response(&SpeechResponse::failure())?;
            error!(kind = %e.kind(), "{e}");
            Err(e.into())
        }
    }
}

async fn read_request(
    text: Option<String>,
    voice: Option<String>,
    event: Option<String>,
) -> Result<SpeechRequest> {
    if let (Some(text), Some(voice)) = (text, voice) {
        return Ok(SpeechRequest { text, voice });
    }

    let json = match event {
        Some(event) => event,
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read request from stdin")?;
            input
        }
    };

    serde_json::from_str(&json).context("Request must be {\"text\": ..., \"voice\": ...}")
}

fn print_response(response: &SpeechResponse) -> Result<()> {
    println!("{}", serde_json::to_string(response)?);
    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::fmt;

    // stdout carries the response, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .init();
}
