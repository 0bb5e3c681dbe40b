use std::env;
use std::path::PathBuf;
use tyspeak_core::{aws, RelayConfig};
use tyspeak_subprocess::run_subprocess;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout is the reply channel
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut settings_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        if args[i].as_str() == "--settings-path" {
            i += 1;
            if i < args.len() {
                settings_path = Some(PathBuf::from(&args[i]));
            }
        }
        i += 1;
    }

    let config = RelayConfig::load(settings_path.as_deref())?;
    let handler = aws::build_handler(config).await;
    run_subprocess(handler).await
}
